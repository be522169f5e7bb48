//! Service layer API for work contract operations
use std::sync::Arc;

use tracing::{info, warn};

use crate::documents::{
    DocumentRef, ReferenceList, RosterOp, Side, SubContract, WorkContract, WorkContractOp,
};
use crate::error::ContractError;
use crate::mutation::ReferenceMutation;
use crate::store::DocumentStore;
use crate::traces::{self, TraceReport, TraceTargets};
use crate::types::{MemberKind, PartyRef, RecordId, ValidityPeriod};

/// What a caller is allowed to see of a work contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkContractView {
    /// agency side
    Full(WorkContract),
    /// business side, pending workers removed from every sub-contract
    Redacted(WorkContract),
    /// worker side, only the sub-contract the worker is part of
    SubContract {
        work_contract: RecordId,
        sub_contract: SubContract,
    },
}

pub struct WorkContractService<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> WorkContractService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Load a work contract or fail with NotFound
    async fn load(&self, id: &RecordId) -> Result<WorkContract, ContractError> {
        self.store
            .get_work_contract(id)
            .await?
            .ok_or_else(|| ContractError::not_found("work contract", id))
    }

    /// Load a work contract and check the sub-contract exists in it
    async fn load_with_sub(
        &self,
        id: &RecordId,
        sub_contract: &RecordId,
    ) -> Result<WorkContract, ContractError> {
        let contract = self.load(id).await?;
        if contract.sub_contract(sub_contract).is_none() {
            return Err(ContractError::not_found("sub-contract", sub_contract));
        }
        Ok(contract)
    }

    /// Apply a roster change to one sub-contract
    async fn update_roster(
        &self,
        id: &RecordId,
        sub_contract: &RecordId,
        op: RosterOp,
    ) -> Result<WorkContract, ContractError> {
        let op = WorkContractOp::Roster {
            sub_contract: sub_contract.clone(),
            op,
        };
        let updated = self
            .store
            .update_work_contract(id, &op)
            .await?
            .ok_or_else(|| ContractError::not_found("work contract", id))?;
        if updated.sub_contract(sub_contract).is_none() {
            return Err(ContractError::not_found("sub-contract", sub_contract));
        }
        Ok(updated)
    }

    /// Business, agency, or a worker in one of its sub-contracts
    pub async fn check_user_in_work_contract(
        &self,
        actor: &PartyRef,
        contract: &WorkContract,
    ) -> Result<bool, ContractError> {
        match actor {
            PartyRef::Business(id) => Ok(*id == contract.business),
            PartyRef::Agency(id) => Ok(*id == contract.agency),
            PartyRef::Worker(_) => {
                let Some(worker) = self.store.get_party(actor).await? else {
                    return Ok(false);
                };
                Ok(contract
                    .contracts
                    .iter()
                    .any(|sub| worker.work_contracts.contains(&sub.id)))
            }
        }
    }

    /// The agency opens a work contract with a business it has a made business contract with
    pub async fn create(
        &self,
        actor: &PartyRef,
        business: &RecordId,
    ) -> Result<DocumentRef, ContractError> {
        let PartyRef::Agency(agency) = actor else {
            return Err(ContractError::Forbidden(
                "only agencies can create work contracts".into(),
            ));
        };

        let affiliated = self
            .store
            .find_business_contract_by_agency(agency)
            .await?
            .is_some_and(|bc| bc.made_contracts.contains(MemberKind::Business, business));
        if !affiliated {
            return Err(ContractError::Forbidden(format!(
                "no business contract between {agency} and {business}"
            )));
        }
        if self
            .store
            .find_work_contract_by_pair(agency, business)
            .await?
            .is_some()
        {
            return Err(ContractError::Conflict(format!(
                "work contract between {agency} and {business} already exists"
            )));
        }

        let contract = WorkContract::new(agency.clone(), business.clone());
        let links = ReferenceMutation::link(contract.id.clone(), ReferenceList::WorkContracts)
            .party(PartyRef::Business(business.clone()))
            .party(PartyRef::Agency(agency.clone()));
        links.apply(self.store.as_ref()).await?;

        // the pair index is the final say on uniqueness
        match self.store.insert_work_contract(&contract).await {
            Ok(true) => {}
            Ok(false) => {
                let cause = ContractError::Conflict(format!(
                    "work contract between {agency} and {business} already exists"
                ));
                return Err(links.rollback(self.store.as_ref(), cause).await);
            }
            Err(e) => return Err(links.rollback(self.store.as_ref(), e.into()).await),
        }

        info!(
            agency = %agency,
            business = %business,
            contract = %contract.id,
            "Created work contract"
        );
        Ok(DocumentRef::new("workcontracts", contract.id))
    }

    /// Append an empty sub-contract
    pub async fn add_sub_contract(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
        worker_count: u32,
        validity_period: ValidityPeriod,
    ) -> Result<SubContract, ContractError> {
        if matches!(actor, PartyRef::Worker(_)) {
            return Err(ContractError::Forbidden(
                "workers cannot add sub-contracts".into(),
            ));
        }
        if worker_count == 0 {
            return Err(ContractError::MalformedInput(
                "worker count must be positive".into(),
            ));
        }

        let contract = self.load(contract_id).await?;
        if !self.check_user_in_work_contract(actor, &contract).await? {
            return Err(ContractError::Forbidden(format!(
                "{actor} is not in work contract {contract_id}"
            )));
        }

        let sub = SubContract::new(worker_count, validity_period);
        self.store
            .update_work_contract(contract_id, &WorkContractOp::AppendSubContract(sub.clone()))
            .await?
            .ok_or_else(|| ContractError::not_found("work contract", contract_id))?;

        info!(contract = %contract_id, sub_contract = %sub.id, "Added sub-contract");
        Ok(sub)
    }

    /// A worker affiliated with the agency asks to join a sub-contract
    pub async fn worker_requests_join(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
        sub_contract: &RecordId,
    ) -> Result<WorkContract, ContractError> {
        let PartyRef::Worker(worker_id) = actor else {
            return Err(ContractError::Forbidden(
                "only workers can join sub-contracts".into(),
            ));
        };

        let contract = self.load_with_sub(contract_id, sub_contract).await?;

        let affiliated = self
            .store
            .find_business_contract_by_agency(&contract.agency)
            .await?
            .is_some_and(|bc| bc.made_contracts.contains(MemberKind::Worker, worker_id));
        if !affiliated {
            return Err(ContractError::not_found(
                "business contract with agency and worker",
                worker_id,
            ));
        }

        let worker = self
            .store
            .get_party(actor)
            .await?
            .ok_or_else(|| ContractError::not_found("worker", worker_id))?;
        if worker.work_contracts.contains(sub_contract) {
            return Err(ContractError::Forbidden(format!(
                "{worker_id} is already linked to sub-contract {sub_contract}"
            )));
        }

        let links = ReferenceMutation::link(sub_contract.clone(), ReferenceList::WorkContracts)
            .party(actor.clone());
        links.apply(self.store.as_ref()).await?;

        match self
            .update_roster(contract_id, sub_contract, RosterOp::Request(worker_id.clone()))
            .await
        {
            Ok(updated) => Ok(updated),
            Err(cause) => Err(links.rollback(self.store.as_ref(), cause).await),
        }
    }

    /// Agency or business confirms its side of a sub-contract
    pub async fn accept_work_contract(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
        sub_contract: &RecordId,
    ) -> Result<WorkContract, ContractError> {
        let contract = self.load_with_sub(contract_id, sub_contract).await?;

        let side = if actor.is_agency(&contract.agency) {
            Side::Agency
        } else if actor.is_business(&contract.business) {
            Side::Business
        } else {
            return Err(ContractError::Forbidden(format!(
                "{actor} cannot confirm work contract {contract_id}"
            )));
        };

        let updated = self
            .update_roster(contract_id, sub_contract, RosterOp::Confirm(side))
            .await?;
        info!(
            contract = %contract_id,
            sub_contract = %sub_contract,
            side = ?side,
            "Confirmed sub-contract"
        );
        Ok(updated)
    }

    /// The agency moves requested workers to the accepted pool
    pub async fn accept_workers(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
        sub_contract: &RecordId,
        workers: Vec<RecordId>,
    ) -> Result<WorkContract, ContractError> {
        self.require_agency(actor, contract_id, sub_contract).await?;
        let updated = self
            .update_roster(contract_id, sub_contract, RosterOp::Accept(workers))
            .await?;
        info!(contract = %contract_id, sub_contract = %sub_contract, "Accepted workers");
        Ok(updated)
    }

    /// The agency moves accepted workers back to the requested pool
    pub async fn revert_workers(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
        sub_contract: &RecordId,
        workers: Vec<RecordId>,
    ) -> Result<WorkContract, ContractError> {
        self.require_agency(actor, contract_id, sub_contract).await?;
        self.update_roster(contract_id, sub_contract, RosterOp::Revert(workers))
            .await
    }

    /// Agency or business removes workers from both pools of a sub-contract
    pub async fn decline_workers(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
        sub_contract: &RecordId,
        workers: Vec<RecordId>,
    ) -> Result<WorkContract, ContractError> {
        let contract = self.load_with_sub(contract_id, sub_contract).await?;
        if !actor.is_agency(&contract.agency) && !actor.is_business(&contract.business) {
            return Err(ContractError::Forbidden(format!(
                "{actor} cannot decline workers of work contract {contract_id}"
            )));
        }

        let present: Vec<RecordId> = contract
            .sub_contract(sub_contract)
            .map(|sub| workers.iter().filter(|w| sub.has_worker(w)).cloned().collect())
            .unwrap_or_default();

        let updated = self
            .update_roster(contract_id, sub_contract, RosterOp::Decline(workers))
            .await?;

        // declined workers drop their trace of the sub-contract
        let mut reports = vec![];
        for worker in present {
            let report = traces::remove_traces(
                self.store.as_ref(),
                &TraceTargets::worker(worker),
                ReferenceList::WorkContracts,
                sub_contract,
            )
            .await;
            reports.push(report);
        }
        if let Some(e) = traces::left_behind(sub_contract, &reports) {
            return Err(e);
        }

        info!(contract = %contract_id, sub_contract = %sub_contract, "Declined workers");
        Ok(updated)
    }

    /// Remove every trace of the contract, then the contract itself
    pub async fn delete(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
    ) -> Result<(), ContractError> {
        let contract = self.load(contract_id).await?;
        if !actor.is_agency(&contract.agency) {
            return Err(ContractError::Forbidden(format!(
                "{actor} cannot delete work contract {contract_id}"
            )));
        }

        let mut reports: Vec<TraceReport> = vec![];
        reports.push(
            traces::remove_traces(
                self.store.as_ref(),
                &TraceTargets::business_and_agency(
                    contract.business.clone(),
                    contract.agency.clone(),
                ),
                ReferenceList::WorkContracts,
                contract_id,
            )
            .await,
        );
        for sub in &contract.contracts {
            for worker in sub.request_workers.iter().chain(&sub.accepted_workers) {
                let report = traces::remove_traces(
                    self.store.as_ref(),
                    &TraceTargets::worker(worker.clone()),
                    ReferenceList::WorkContracts,
                    &sub.id,
                )
                .await;
                reports.push(report);
            }
        }

        if let Some(e) = traces::left_behind(contract_id, &reports) {
            warn!(contract = %contract_id, "Keeping work contract, trace removal incomplete");
            return Err(e);
        }

        if !self.store.delete_work_contract(contract_id).await? {
            return Err(ContractError::not_found("work contract", contract_id));
        }
        info!(contract = %contract_id, "Deleted work contract");
        Ok(())
    }

    /// Read a work contract as the given actor
    pub async fn read(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
    ) -> Result<WorkContractView, ContractError> {
        let contract = self.load(contract_id).await?;

        match actor {
            PartyRef::Agency(id) if *id == contract.agency => Ok(WorkContractView::Full(contract)),
            PartyRef::Business(id) if *id == contract.business => {
                Ok(WorkContractView::Redacted(contract.without_requests()))
            }
            PartyRef::Worker(id) => {
                let worker = self
                    .store
                    .get_party(actor)
                    .await?
                    .ok_or_else(|| ContractError::not_found("worker", id))?;
                contract
                    .contracts
                    .iter()
                    .find(|sub| worker.work_contracts.contains(&sub.id))
                    .map(|sub| WorkContractView::SubContract {
                        work_contract: contract.id.clone(),
                        sub_contract: sub.clone(),
                    })
                    .ok_or_else(|| {
                        ContractError::Forbidden(format!(
                            "{actor} is not in work contract {contract_id}"
                        ))
                    })
            }
            _ => Err(ContractError::Forbidden(format!(
                "{actor} is not in work contract {contract_id}"
            ))),
        }
    }

    async fn require_agency(
        &self,
        actor: &PartyRef,
        contract_id: &RecordId,
        sub_contract: &RecordId,
    ) -> Result<WorkContract, ContractError> {
        let contract = self.load_with_sub(contract_id, sub_contract).await?;
        if !actor.is_agency(&contract.agency) {
            return Err(ContractError::Forbidden(format!(
                "only the agency of work contract {contract_id} can change its workers"
            )));
        }
        Ok(contract)
    }
}
