//! Trace links that one contract transition adds to party documents.
//!
//! Linking touches several documents without a transaction. A
//! [`ReferenceMutation`] applies its links in order and, when one of them
//! fails, removes the links it already added before reporting the failure.

use tracing::{debug, warn};

use crate::documents::ReferenceList;
use crate::error::ContractError;
use crate::store::DocumentStore;
use crate::traces::{self, TraceReport, TraceTargets};
use crate::types::{PartyRef, RecordId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMutation {
    contract: RecordId,
    list: ReferenceList,
    parties: Vec<PartyRef>,
}

impl ReferenceMutation {
    pub fn link(contract: RecordId, list: ReferenceList) -> Self {
        Self {
            contract,
            list,
            parties: vec![],
        }
    }

    pub fn party(mut self, party: PartyRef) -> Self {
        self.parties.push(party);
        self
    }

    /// Adds every link. On the first failure the applied links are removed again.
    pub async fn apply<S: DocumentStore>(&self, store: &S) -> Result<(), ContractError> {
        let mut applied = vec![];

        for party in &self.parties {
            let outcome = store.add_reference(party, self.list, &self.contract).await;
            let cause = match outcome {
                Ok(true) => {
                    debug!(party = %party, contract = %self.contract, "Linked trace");
                    applied.push(party.clone());
                    continue;
                }
                Ok(false) => ContractError::not_found("party", party.id()),
                Err(e) => ContractError::from(e),
            };

            warn!(
                party = %party,
                contract = %self.contract,
                error = %cause,
                "Linking failed, removing applied traces"
            );
            let report = self.remove(store, &applied).await;
            return Err(self.rollback_outcome(report, cause));
        }

        Ok(())
    }

    /// Removes every link of this mutation.
    pub async fn revert<S: DocumentStore>(&self, store: &S) -> TraceReport {
        self.remove(store, &self.parties).await
    }

    /// Reverts the links, then picks the error the caller sees: `cause` when the
    /// revert was complete, the error of [`traces::left_behind`] otherwise.
    pub async fn rollback<S: DocumentStore>(&self, store: &S, cause: ContractError) -> ContractError {
        warn!(contract = %self.contract, error = %cause, "Rolling back trace links");
        let report = self.revert(store).await;
        self.rollback_outcome(report, cause)
    }

    async fn remove<S: DocumentStore>(&self, store: &S, parties: &[PartyRef]) -> TraceReport {
        let targets = parties
            .iter()
            .fold(TraceTargets::default(), |targets, party| targets.with(party));
        traces::remove_traces(store, &targets, self.list, &self.contract).await
    }

    fn rollback_outcome(&self, report: TraceReport, cause: ContractError) -> ContractError {
        traces::left_behind(&self.contract, &[report]).unwrap_or(cause)
    }
}
