//! Removal of contract traces from party documents.
//!
//! Used when a multi-document operation has to be rolled back and before a
//! contract document is deleted.

use tracing::{error, warn};

use crate::documents::ReferenceList;
use crate::error::ContractError;
use crate::store::DocumentStore;
use crate::types::{PartyRef, RecordId};

/// Parties whose trace of a contract should be removed. `None` skips the party.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceTargets {
    pub worker: Option<RecordId>,
    pub business: Option<RecordId>,
    pub agency: Option<RecordId>,
}

impl TraceTargets {
    pub fn worker(id: RecordId) -> Self {
        Self {
            worker: Some(id),
            ..Self::default()
        }
    }

    pub fn business_and_agency(business: RecordId, agency: RecordId) -> Self {
        Self {
            worker: None,
            business: Some(business),
            agency: Some(agency),
        }
    }

    pub fn with(mut self, party: &PartyRef) -> Self {
        match party {
            PartyRef::Worker(id) => self.worker = Some(id.clone()),
            PartyRef::Business(id) => self.business = Some(id.clone()),
            PartyRef::Agency(id) => self.agency = Some(id.clone()),
        }
        self
    }

    fn parties(&self) -> Vec<PartyRef> {
        let mut parties = vec![];
        if let Some(id) = &self.worker {
            parties.push(PartyRef::Worker(id.clone()));
        }
        if let Some(id) = &self.business {
            parties.push(PartyRef::Business(id.clone()));
        }
        if let Some(id) = &self.agency {
            parties.push(PartyRef::Agency(id.clone()));
        }
        parties
    }
}

/// Per-party outcome of [`remove_traces`]. `None` means the party was not targeted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceReport {
    pub worker_trace_removed: Option<bool>,
    pub business_trace_removed: Option<bool>,
    pub agency_trace_removed: Option<bool>,
    failed: Vec<PartyRef>,
}

impl TraceReport {
    fn record(&mut self, party: &PartyRef, removed: bool) {
        let slot = match party {
            PartyRef::Worker(_) => &mut self.worker_trace_removed,
            PartyRef::Business(_) => &mut self.business_trace_removed,
            PartyRef::Agency(_) => &mut self.agency_trace_removed,
        };
        *slot = Some(removed);
        if !removed {
            self.failed.push(party.clone());
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Some removal failed and no targeted party had its trace removed.
    pub fn is_total_failure(&self) -> bool {
        let removed = [
            self.worker_trace_removed,
            self.business_trace_removed,
            self.agency_trace_removed,
        ];
        !self.failed.is_empty() && removed.iter().flatten().all(|removed| !removed)
    }

    pub fn failed_parties(&self) -> &[PartyRef] {
        &self.failed
    }
}

/// Error for the traces one or more removal passes left behind, `None` when
/// every removal went through. When not a single trace came off the caller
/// gets [`ContractError::RollbackFailed`], otherwise
/// [`ContractError::PartialRollback`].
pub fn left_behind(contract: &RecordId, reports: &[TraceReport]) -> Option<ContractError> {
    let failed: Vec<PartyRef> = reports
        .iter()
        .flat_map(|r| r.failed_parties().iter().cloned())
        .collect();
    if failed.is_empty() {
        return None;
    }

    let contract = contract.to_string();
    if reports.iter().all(TraceReport::is_total_failure) {
        Some(ContractError::RollbackFailed { contract, failed })
    } else {
        Some(ContractError::PartialRollback { contract, failed })
    }
}

/// Pulls `contract` from the `list` of every targeted party, one after the other.
///
/// A store failure for one party is recorded and the remaining parties are
/// still attempted.
pub async fn remove_traces<S: DocumentStore>(
    store: &S,
    targets: &TraceTargets,
    list: ReferenceList,
    contract: &RecordId,
) -> TraceReport {
    let mut report = TraceReport::default();

    for party in targets.parties() {
        let removed = match store.remove_reference(&party, list, contract).await {
            Ok(found) => found,
            Err(e) => {
                warn!(party = %party, contract = %contract, error = %e, "Trace removal failed");
                false
            }
        };
        report.record(&party, removed);
    }

    if !report.is_complete() {
        error!(
            contract = %contract,
            failed = ?report.failed_parties(),
            "Traces left behind, manual reconciliation needed"
        );
    }
    report
}
