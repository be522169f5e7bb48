//! Sled implementation of [`DocumentStore`].
//!
//! One tree per collection, keyed by the document id, with CBOR encoded
//! values. Two index trees hold the uniqueness constraints: one business
//! contract per agency and one work contract per (agency, business) pair.
//! Both are claimed with compare-and-swap so concurrent creators cannot both
//! win.

use std::sync::Arc;

use sled::{Db, Tree};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::documents::{
    BusinessContract, MembershipOp, Party, ReferenceList, WorkContract, WorkContractOp,
};
use crate::error::StoreError;
use crate::store::{DocumentStore, StoreResult};
use crate::types::{PartyKind, PartyRef, RecordId};
use crate::utils;

#[derive(Clone)]
pub struct SledStore {
    instance: Arc<Db>,
    agencies: Tree,
    businesses: Tree,
    workers: Tree,
    business_contracts: Tree,
    work_contracts: Tree,
    business_contract_by_agency: Tree,
    work_contract_by_pair: Tree,
}

impl SledStore {
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        info!(
            path = %config.path.display(),
            temporary = config.temporary,
            "Opening document store"
        );
        let db = config.to_sled().open()?;
        Self::new(Arc::new(db))
    }

    pub fn new(instance: Arc<Db>) -> StoreResult<Self> {
        Ok(Self {
            agencies: instance.open_tree("agencies")?,
            businesses: instance.open_tree("businesses")?,
            workers: instance.open_tree("workers")?,
            business_contracts: instance.open_tree("business_contracts")?,
            work_contracts: instance.open_tree("work_contracts")?,
            business_contract_by_agency: instance.open_tree("business_contract_by_agency")?,
            work_contract_by_pair: instance.open_tree("work_contract_by_pair")?,
            instance,
        })
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.instance.flush()?;
        Ok(())
    }

    fn parties(&self, kind: PartyKind) -> &Tree {
        match kind {
            PartyKind::Agency => &self.agencies,
            PartyKind::Business => &self.businesses,
            PartyKind::Worker => &self.workers,
        }
    }
}

fn encode<T: minicbor::Encode<()>>(doc: &T) -> StoreResult<Vec<u8>> {
    minicbor::to_vec(doc).map_err(|e| StoreError::Encode(e.to_string()))
}

fn load<T>(tree: &Tree, key: &[u8]) -> StoreResult<Option<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    match tree.get(key)? {
        Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
        None => Ok(None),
    }
}

fn load_all<T>(tree: &Tree) -> StoreResult<Vec<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    let mut docs = vec![];
    for entry in tree.iter() {
        let (_, bytes) = entry?;
        docs.push(minicbor::decode(&bytes)?);
    }
    Ok(docs)
}

// Atomic read-modify-write. sled retries the closure until its compare-and-swap
// lands, so `apply` may run more than once and must only touch the document.
fn modify<T, F>(tree: &Tree, key: &[u8], mut apply: F) -> StoreResult<Option<T>>
where
    T: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()>,
    F: FnMut(&mut T),
{
    let mut failure: Option<StoreError> = None;

    let updated = tree.update_and_fetch(key, |current| {
        let bytes = current?;
        let encoded = minicbor::decode::<T>(bytes)
            .map_err(StoreError::from)
            .and_then(|mut doc| {
                apply(&mut doc);
                encode(&doc)
            });
        match encoded {
            Ok(next) => {
                failure = None;
                Some(next)
            }
            Err(e) => {
                // leave the stored bytes untouched
                failure = Some(e);
                Some(bytes.to_vec())
            }
        }
    })?;

    if let Some(e) = failure {
        return Err(e);
    }
    match updated {
        Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
        None => Ok(None),
    }
}

impl DocumentStore for SledStore {
    async fn insert_party(&self, party: &Party) -> StoreResult<()> {
        self.parties(party.kind)
            .insert(party.id.as_str().as_bytes(), encode(party)?)?;
        debug!(party = %party.id, kind = %party.kind, "Inserted party");
        Ok(())
    }

    async fn get_party(&self, party: &PartyRef) -> StoreResult<Option<Party>> {
        load(self.parties(party.kind()), party.id().as_str().as_bytes())
    }

    async fn find_party(&self, id: &RecordId) -> StoreResult<Option<Party>> {
        for kind in [PartyKind::Business, PartyKind::Worker, PartyKind::Agency] {
            if let Some(party) = load(self.parties(kind), id.as_str().as_bytes())? {
                return Ok(Some(party));
            }
        }
        Ok(None)
    }

    async fn list_parties(&self, kind: PartyKind) -> StoreResult<Vec<Party>> {
        load_all(self.parties(kind))
    }

    async fn delete_party(&self, party: &PartyRef) -> StoreResult<bool> {
        let removed = self
            .parties(party.kind())
            .remove(party.id().as_str().as_bytes())?;
        debug!(party = %party, found = removed.is_some(), "Deleted party");
        Ok(removed.is_some())
    }

    async fn add_reference(
        &self,
        party: &PartyRef,
        list: ReferenceList,
        contract: &RecordId,
    ) -> StoreResult<bool> {
        let updated = modify(
            self.parties(party.kind()),
            party.id().as_str().as_bytes(),
            |doc: &mut Party| {
                doc.add_reference(list, contract);
            },
        )?;
        debug!(party = %party, contract = %contract, found = updated.is_some(), "Added trace");
        Ok(updated.is_some())
    }

    async fn remove_reference(
        &self,
        party: &PartyRef,
        list: ReferenceList,
        contract: &RecordId,
    ) -> StoreResult<bool> {
        let updated = modify(
            self.parties(party.kind()),
            party.id().as_str().as_bytes(),
            |doc: &mut Party| {
                doc.remove_reference(list, contract);
            },
        )?;
        debug!(party = %party, contract = %contract, found = updated.is_some(), "Removed trace");
        Ok(updated.is_some())
    }

    async fn insert_business_contract(&self, contract: &BusinessContract) -> StoreResult<bool> {
        let claimed = self.business_contract_by_agency.compare_and_swap(
            contract.agency.as_str().as_bytes(),
            None as Option<&[u8]>,
            Some(contract.id.as_str().as_bytes()),
        )?;
        if claimed.is_err() {
            return Ok(false);
        }

        let stored = encode(contract).and_then(|bytes| {
            self.business_contracts
                .insert(contract.id.as_str().as_bytes(), bytes)
                .map_err(StoreError::from)
        });
        if let Err(e) = stored {
            self.business_contract_by_agency
                .remove(contract.agency.as_str().as_bytes())?;
            return Err(e);
        }
        Ok(true)
    }

    async fn get_business_contract(&self, id: &RecordId) -> StoreResult<Option<BusinessContract>> {
        load(&self.business_contracts, id.as_str().as_bytes())
    }

    async fn find_business_contract_by_agency(
        &self,
        agency: &RecordId,
    ) -> StoreResult<Option<BusinessContract>> {
        match self
            .business_contract_by_agency
            .get(agency.as_str().as_bytes())?
        {
            Some(id) => load(&self.business_contracts, &id),
            None => Ok(None),
        }
    }

    async fn update_business_contract(
        &self,
        id: &RecordId,
        op: &MembershipOp,
    ) -> StoreResult<Option<BusinessContract>> {
        modify(
            &self.business_contracts,
            id.as_str().as_bytes(),
            |doc: &mut BusinessContract| doc.apply(op),
        )
    }

    async fn list_business_contracts(&self) -> StoreResult<Vec<BusinessContract>> {
        load_all(&self.business_contracts)
    }

    async fn insert_work_contract(&self, contract: &WorkContract) -> StoreResult<bool> {
        let pair = utils::pair_digest(contract.agency.as_str(), contract.business.as_str());
        let claimed = self.work_contract_by_pair.compare_and_swap(
            pair.as_bytes(),
            None as Option<&[u8]>,
            Some(contract.id.as_str().as_bytes()),
        )?;
        if claimed.is_err() {
            return Ok(false);
        }

        let stored = encode(contract).and_then(|bytes| {
            self.work_contracts
                .insert(contract.id.as_str().as_bytes(), bytes)
                .map_err(StoreError::from)
        });
        if let Err(e) = stored {
            self.work_contract_by_pair.remove(pair.as_bytes())?;
            return Err(e);
        }
        Ok(true)
    }

    async fn get_work_contract(&self, id: &RecordId) -> StoreResult<Option<WorkContract>> {
        load(&self.work_contracts, id.as_str().as_bytes())
    }

    async fn find_work_contract_by_pair(
        &self,
        agency: &RecordId,
        business: &RecordId,
    ) -> StoreResult<Option<WorkContract>> {
        let pair = utils::pair_digest(agency.as_str(), business.as_str());
        match self.work_contract_by_pair.get(pair.as_bytes())? {
            Some(id) => load(&self.work_contracts, &id),
            None => Ok(None),
        }
    }

    async fn update_work_contract(
        &self,
        id: &RecordId,
        op: &WorkContractOp,
    ) -> StoreResult<Option<WorkContract>> {
        modify(
            &self.work_contracts,
            id.as_str().as_bytes(),
            |doc: &mut WorkContract| {
                doc.apply(op);
            },
        )
    }

    async fn delete_work_contract(&self, id: &RecordId) -> StoreResult<bool> {
        let Some(bytes) = self.work_contracts.remove(id.as_str().as_bytes())? else {
            return Ok(false);
        };
        let contract: WorkContract = minicbor::decode(&bytes)?;
        let pair = utils::pair_digest(contract.agency.as_str(), contract.business.as_str());
        // only release the pair if it still points at this document
        let _ = self.work_contract_by_pair.compare_and_swap(
            pair.as_bytes(),
            Some(id.as_str().as_bytes()),
            None as Option<&[u8]>,
        )?;
        Ok(true)
    }

    async fn list_work_contracts(&self) -> StoreResult<Vec<WorkContract>> {
        load_all(&self.work_contracts)
    }
}
