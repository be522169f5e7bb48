//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use keikkakaveri::{
    ContractError, DocumentStore, SledStore, StoreConfig, StoreError,
    accounts::AccountService,
    business_contract::BusinessContractService,
    documents::{BusinessContract, MembershipOp, Party, ReferenceList, WorkContract, WorkContractOp},
    types::{PartyKind, PartyRef, RecordId, TimeStamp, ValidityPeriod},
    work_contract::WorkContractService,
};
use tempfile::{TempDir, tempdir};

/// Sled uses file-based locking, so every test gets its own database under a
/// temp directory that is cleaned up when the returned guard drops.
pub fn sled_store(name: &str) -> anyhow::Result<(TempDir, Arc<SledStore>)> {
    let temp_dir = tempdir()?;
    let config = StoreConfig {
        path: temp_dir.path().join(format!("{name}.db")),
        ..StoreConfig::default()
    };
    let store = SledStore::open(&config)?;
    Ok((temp_dir, Arc::new(store)))
}

pub struct Marketplace<S> {
    pub store: Arc<S>,
    pub accounts: AccountService<S>,
    pub business_contracts: BusinessContractService<S>,
    pub work_contracts: WorkContractService<S>,
}

impl<S: DocumentStore> Marketplace<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            accounts: AccountService::new(store.clone()),
            business_contracts: BusinessContractService::new(store.clone()),
            work_contracts: WorkContractService::new(store.clone()),
            store,
        }
    }

    pub async fn party(&self, party: &Party) -> Party {
        self.accounts.get(&party.party_ref()).await.unwrap()
    }

    pub async fn business_contract(&self, id: &RecordId) -> BusinessContract {
        self.store.get_business_contract(id).await.unwrap().unwrap()
    }

    pub async fn work_contract(&self, id: &RecordId) -> WorkContract {
        self.store.get_work_contract(id).await.unwrap().unwrap()
    }
}

/// An agency with its business contract, plus a business and a worker that
/// have not affiliated yet.
pub struct Parties {
    pub agency: Party,
    pub business: Party,
    pub worker: Party,
    pub business_contract: RecordId,
}

pub async fn onboard<S: DocumentStore>(market: &Marketplace<S>) -> Parties {
    let agency = market
        .accounts
        .register(PartyKind::Agency, "Keikka Oy")
        .await
        .unwrap();
    let business = market
        .accounts
        .register(PartyKind::Business, "Kahvila Helmi")
        .await
        .unwrap();
    let worker = market
        .accounts
        .register(PartyKind::Worker, "Aino")
        .await
        .unwrap();
    let business_contract = agency.business_contracts[0].clone();

    Parties {
        agency,
        business,
        worker,
        business_contract,
    }
}

/// Onboards and makes both the business and the worker affiliated with the agency.
pub async fn affiliated<S: DocumentStore>(market: &Marketplace<S>) -> Parties {
    let parties = onboard(market).await;
    let agency = parties.agency.party_ref();
    for member in [&parties.business, &parties.worker] {
        market
            .business_contracts
            .agency_add_member(&agency, &parties.business_contract, &member.id)
            .await
            .unwrap();
    }
    parties
}

pub fn period() -> ValidityPeriod {
    ValidityPeriod::new(
        TimeStamp::new_with(2026, 6, 1, 8, 0, 0),
        TimeStamp::new_with(2026, 8, 31, 16, 0, 0),
    )
    .unwrap()
}

pub fn is_not_found<T: std::fmt::Debug>(result: &Result<T, ContractError>) -> bool {
    matches!(result, Err(ContractError::NotFound { .. }))
}

/// Store wrapper that fails chosen operations and records trace removals.
pub struct FaultyStore {
    inner: Arc<SledStore>,
    pub fail_work_contract_insert: AtomicBool,
    pub fail_business_contract_insert: AtomicBool,
    pub fail_business_contract_update: AtomicBool,
    /// lookups miss, as if a concurrent creator had not committed yet
    pub hide_business_contract_owners: AtomicBool,
    pub hide_work_contract_pairs: AtomicBool,
    pub fail_trace_removal_for: Mutex<HashSet<RecordId>>,
    pub fail_trace_link_for: Mutex<HashSet<RecordId>>,
    pub removed_traces: Mutex<Vec<(PartyRef, RecordId)>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<SledStore>) -> Self {
        Self {
            inner,
            fail_work_contract_insert: AtomicBool::new(false),
            fail_business_contract_insert: AtomicBool::new(false),
            fail_business_contract_update: AtomicBool::new(false),
            hide_business_contract_owners: AtomicBool::new(false),
            hide_work_contract_pairs: AtomicBool::new(false),
            fail_trace_removal_for: Mutex::new(HashSet::new()),
            fail_trace_link_for: Mutex::new(HashSet::new()),
            removed_traces: Mutex::new(vec![]),
        }
    }

    pub fn removed(&self) -> Vec<(PartyRef, RecordId)> {
        self.removed_traces.lock().unwrap().clone()
    }
}

fn injected(what: &str) -> StoreError {
    StoreError::Unavailable(format!("injected {what} failure"))
}

impl DocumentStore for FaultyStore {
    async fn insert_party(&self, party: &Party) -> Result<(), StoreError> {
        self.inner.insert_party(party).await
    }

    async fn get_party(&self, party: &PartyRef) -> Result<Option<Party>, StoreError> {
        self.inner.get_party(party).await
    }

    async fn find_party(&self, id: &RecordId) -> Result<Option<Party>, StoreError> {
        self.inner.find_party(id).await
    }

    async fn list_parties(&self, kind: PartyKind) -> Result<Vec<Party>, StoreError> {
        self.inner.list_parties(kind).await
    }

    async fn delete_party(&self, party: &PartyRef) -> Result<bool, StoreError> {
        self.inner.delete_party(party).await
    }

    async fn add_reference(
        &self,
        party: &PartyRef,
        list: ReferenceList,
        contract: &RecordId,
    ) -> Result<bool, StoreError> {
        if self.fail_trace_link_for.lock().unwrap().contains(party.id()) {
            return Err(injected("trace link"));
        }
        self.inner.add_reference(party, list, contract).await
    }

    async fn remove_reference(
        &self,
        party: &PartyRef,
        list: ReferenceList,
        contract: &RecordId,
    ) -> Result<bool, StoreError> {
        self.removed_traces
            .lock()
            .unwrap()
            .push((party.clone(), contract.clone()));
        if self.fail_trace_removal_for.lock().unwrap().contains(party.id()) {
            return Err(injected("trace removal"));
        }
        self.inner.remove_reference(party, list, contract).await
    }

    async fn insert_business_contract(
        &self,
        contract: &BusinessContract,
    ) -> Result<bool, StoreError> {
        if self.fail_business_contract_insert.load(Ordering::SeqCst) {
            return Err(injected("business contract save"));
        }
        self.inner.insert_business_contract(contract).await
    }

    async fn get_business_contract(
        &self,
        id: &RecordId,
    ) -> Result<Option<BusinessContract>, StoreError> {
        self.inner.get_business_contract(id).await
    }

    async fn find_business_contract_by_agency(
        &self,
        agency: &RecordId,
    ) -> Result<Option<BusinessContract>, StoreError> {
        if self.hide_business_contract_owners.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_business_contract_by_agency(agency).await
    }

    async fn update_business_contract(
        &self,
        id: &RecordId,
        op: &MembershipOp,
    ) -> Result<Option<BusinessContract>, StoreError> {
        if self.fail_business_contract_update.load(Ordering::SeqCst) {
            return Err(injected("business contract update"));
        }
        self.inner.update_business_contract(id, op).await
    }

    async fn list_business_contracts(&self) -> Result<Vec<BusinessContract>, StoreError> {
        self.inner.list_business_contracts().await
    }

    async fn insert_work_contract(&self, contract: &WorkContract) -> Result<bool, StoreError> {
        if self.fail_work_contract_insert.load(Ordering::SeqCst) {
            return Err(injected("work contract save"));
        }
        self.inner.insert_work_contract(contract).await
    }

    async fn get_work_contract(&self, id: &RecordId) -> Result<Option<WorkContract>, StoreError> {
        self.inner.get_work_contract(id).await
    }

    async fn find_work_contract_by_pair(
        &self,
        agency: &RecordId,
        business: &RecordId,
    ) -> Result<Option<WorkContract>, StoreError> {
        if self.hide_work_contract_pairs.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_work_contract_by_pair(agency, business).await
    }

    async fn update_work_contract(
        &self,
        id: &RecordId,
        op: &WorkContractOp,
    ) -> Result<Option<WorkContract>, StoreError> {
        self.inner.update_work_contract(id, op).await
    }

    async fn delete_work_contract(&self, id: &RecordId) -> Result<bool, StoreError> {
        self.inner.delete_work_contract(id).await
    }

    async fn list_work_contracts(&self) -> Result<Vec<WorkContract>, StoreError> {
        self.inner.list_work_contracts().await
    }
}
