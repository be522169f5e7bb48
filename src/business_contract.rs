//! Service layer API for business contract operations
use std::sync::Arc;

use tracing::info;

use crate::documents::{BusinessContract, DocumentRef, MembershipOp, ReferenceList};
use crate::error::ContractError;
use crate::mutation::ReferenceMutation;
use crate::store::DocumentStore;
use crate::traces;
use crate::types::{MemberKind, PartyRef, RecordId};

/// What a caller is allowed to see of a business contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusinessContractView {
    /// the owning agency sees the whole roster
    Full(BusinessContract),
    /// members only learn which agency they are affiliated with
    Summary { id: RecordId, agency: RecordId },
}

pub struct BusinessContractService<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> BusinessContractService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Load a business contract or fail with NotFound
    async fn load(&self, id: &RecordId) -> Result<BusinessContract, ContractError> {
        self.store
            .get_business_contract(id)
            .await?
            .ok_or_else(|| ContractError::not_found("business contract", id))
    }

    /// Load a business contract the actor owns
    async fn load_owned(
        &self,
        actor: &PartyRef,
        id: &RecordId,
    ) -> Result<BusinessContract, ContractError> {
        let contract = self.load(id).await?;
        if !actor.is_agency(&contract.agency) {
            return Err(ContractError::Forbidden(format!(
                "{actor} does not own business contract {id}"
            )));
        }
        Ok(contract)
    }

    /// Resolve a target user to a business or a worker, in that order
    async fn resolve_member(
        &self,
        target: &RecordId,
    ) -> Result<(MemberKind, PartyRef), ContractError> {
        self.store
            .find_party(target)
            .await?
            .map(|party| party.party_ref())
            .and_then(|party| party.member_kind().map(|kind| (kind, party)))
            .ok_or_else(|| ContractError::not_found("business or worker", target))
    }

    /// Create the business contract of an agency and link it to the agency
    pub async fn create(&self, agency: &RecordId) -> Result<DocumentRef, ContractError> {
        let owner = PartyRef::Agency(agency.clone());
        if self.store.get_party(&owner).await?.is_none() {
            return Err(ContractError::not_found("agency", agency));
        }
        if self
            .store
            .find_business_contract_by_agency(agency)
            .await?
            .is_some()
        {
            return Err(ContractError::Conflict(format!(
                "agency {agency} already has a business contract"
            )));
        }

        let contract = BusinessContract::new(agency.clone());
        let links = ReferenceMutation::link(contract.id.clone(), ReferenceList::BusinessContracts)
            .party(owner);
        links.apply(self.store.as_ref()).await?;

        // the unique agency index settles concurrent creators
        match self.store.insert_business_contract(&contract).await {
            Ok(true) => {}
            Ok(false) => {
                let cause = ContractError::Conflict(format!(
                    "agency {agency} already has a business contract"
                ));
                return Err(links.rollback(self.store.as_ref(), cause).await);
            }
            Err(e) => return Err(links.rollback(self.store.as_ref(), e.into()).await),
        }

        info!(agency = %agency, contract = %contract.id, "Created business contract");
        Ok(DocumentRef::new("businesscontracts", contract.id))
    }

    /// A business or worker asks to affiliate with the agency owning the contract
    pub async fn request_affiliation(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
    ) -> Result<BusinessContract, ContractError> {
        let Some(kind) = actor.member_kind() else {
            return Err(ContractError::Forbidden(
                "only businesses and workers can request an affiliation".into(),
            ));
        };

        let contract = self.load(contract_id).await?;
        if contract.made_contracts.contains(kind, actor.id()) {
            return Err(ContractError::Conflict(format!(
                "{actor} is already in business contract {contract_id}"
            )));
        }

        // a pending requester already carries the trace and keeps it on failure
        let mut links =
            ReferenceMutation::link(contract_id.clone(), ReferenceList::BusinessContracts);
        if !contract.is_linked(actor) {
            links = links.party(actor.clone());
        }
        links.apply(self.store.as_ref()).await?;

        let op = MembershipOp::Request {
            kind,
            id: actor.id().clone(),
        };
        match self.store.update_business_contract(contract_id, &op).await {
            Ok(Some(updated)) => Ok(updated),
            Ok(None) => {
                let cause = ContractError::not_found("business contract", contract_id);
                Err(links.rollback(self.store.as_ref(), cause).await)
            }
            Err(e) => Err(links.rollback(self.store.as_ref(), e.into()).await),
        }
    }

    /// The agency adds a business or worker directly to its made contracts
    pub async fn agency_add_member(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
        target: &RecordId,
    ) -> Result<BusinessContract, ContractError> {
        let contract = self.load_owned(actor, contract_id).await?;
        let (kind, member) = self.resolve_member(target).await?;
        let linked = contract.is_linked(&member);
        self.promote(contract_id, kind, member, linked).await
    }

    /// The agency accepts a pending affiliation request
    pub async fn accept(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
        target: &RecordId,
    ) -> Result<BusinessContract, ContractError> {
        let contract = self.load_owned(actor, contract_id).await?;
        let (kind, member) = self.resolve_member(target).await?;

        if !contract.request_contracts.contains(kind, target) {
            return Err(ContractError::not_found("affiliation request", target));
        }
        self.promote(contract_id, kind, member, true).await
    }

    /// The agency declines a pending affiliation request
    pub async fn decline(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
        target: &RecordId,
    ) -> Result<BusinessContract, ContractError> {
        self.load_owned(actor, contract_id).await?;
        let (kind, member) = self.resolve_member(target).await?;

        let op = MembershipOp::Withdraw {
            kind,
            id: target.clone(),
        };
        let updated = self
            .store
            .update_business_contract(contract_id, &op)
            .await?
            .ok_or_else(|| ContractError::not_found("business contract", contract_id))?;

        // a made member keeps the trace, only a dropped requester loses it
        if !updated.is_linked(&member) {
            let links =
                ReferenceMutation::link(contract_id.clone(), ReferenceList::BusinessContracts)
                    .party(member.clone());
            let report = links.revert(self.store.as_ref()).await;
            if let Some(e) = traces::left_behind(contract_id, &[report]) {
                return Err(e);
            }
        }

        info!(contract = %contract_id, member = %member, "Declined affiliation");
        Ok(updated)
    }

    // pull from requests, add to made contracts and record the trace on the member.
    // A member that is already linked keeps its trace when the update fails.
    async fn promote(
        &self,
        contract_id: &RecordId,
        kind: MemberKind,
        member: PartyRef,
        linked: bool,
    ) -> Result<BusinessContract, ContractError> {
        let mut links =
            ReferenceMutation::link(contract_id.clone(), ReferenceList::BusinessContracts);
        if !linked {
            links = links.party(member.clone());
        }
        links.apply(self.store.as_ref()).await?;

        let op = MembershipOp::Promote {
            kind,
            id: member.id().clone(),
        };
        let updated = match self.store.update_business_contract(contract_id, &op).await {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                let cause = ContractError::not_found("business contract", contract_id);
                return Err(links.rollback(self.store.as_ref(), cause).await);
            }
            Err(e) => return Err(links.rollback(self.store.as_ref(), e.into()).await),
        };

        info!(contract = %contract_id, member = %member, "Affiliation made");
        Ok(updated)
    }

    /// Read a business contract as the given actor
    pub async fn read(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
    ) -> Result<BusinessContractView, ContractError> {
        let contract = self.load(contract_id).await?;

        if actor.is_agency(&contract.agency) {
            return Ok(BusinessContractView::Full(contract));
        }
        if contract.has_member(actor) {
            return Ok(BusinessContractView::Summary {
                id: contract.id,
                agency: contract.agency,
            });
        }
        Err(ContractError::Forbidden(format!(
            "{actor} is not in business contract {contract_id}"
        )))
    }

    /// Whether the actor owns the contract or has an accepted affiliation in it
    pub async fn user_in_business_contract(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
    ) -> Result<bool, ContractError> {
        Ok(self.load(contract_id).await?.has_member(actor))
    }
}

