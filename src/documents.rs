//! Party and contract documents together with the state transitions applied to them
use crate::types::{MemberKind, PartyKind, PartyRef, Prefix, RecordId, TimeStamp, ValidityPeriod};
use chrono::Utc;

/// Agency, Business or Worker account document.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Party {
    #[n(0)]
    pub id: RecordId,
    #[n(1)]
    pub kind: PartyKind,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub business_contracts: Vec<RecordId>, // traces into BusinessContract documents
    #[n(4)]
    pub work_contracts: Vec<RecordId>, // WorkContract ids, or SubContract ids for workers
    #[n(5)]
    pub created_at: TimeStamp<Utc>,
}

/// Which trace list of a [`Party`] an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceList {
    BusinessContracts,
    WorkContracts,
}

impl Party {
    pub fn new(kind: PartyKind, name: String) -> Self {
        Self {
            id: RecordId::generate(kind.prefix()),
            kind,
            name,
            business_contracts: vec![],
            work_contracts: vec![],
            created_at: TimeStamp::new(),
        }
    }

    pub fn party_ref(&self) -> PartyRef {
        PartyRef::new(self.kind, self.id.clone())
    }

    pub fn references(&self, list: ReferenceList) -> &[RecordId] {
        match list {
            ReferenceList::BusinessContracts => &self.business_contracts,
            ReferenceList::WorkContracts => &self.work_contracts,
        }
    }

    /// Set-add. Returns false when the trace was already present.
    pub fn add_reference(&mut self, list: ReferenceList, contract: &RecordId) -> bool {
        let refs = self.references_mut(list);
        if refs.contains(contract) {
            return false;
        }
        refs.push(contract.clone());
        true
    }

    /// Set-remove. Returns false when there was nothing to pull.
    pub fn remove_reference(&mut self, list: ReferenceList, contract: &RecordId) -> bool {
        let refs = self.references_mut(list);
        let before = refs.len();
        refs.retain(|r| r != contract);
        refs.len() != before
    }

    fn references_mut(&mut self, list: ReferenceList) -> &mut Vec<RecordId> {
        match list {
            ReferenceList::BusinessContracts => &mut self.business_contracts,
            ReferenceList::WorkContracts => &mut self.work_contracts,
        }
    }
}

/// Id and location of a freshly created document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: RecordId,
    pub location: String,
}

impl DocumentRef {
    pub fn new(collection: &str, id: RecordId) -> Self {
        let location = format!("/{collection}/{id}");
        Self { id, location }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Memberships {
    #[n(0)]
    pub businesses: Vec<RecordId>,
    #[n(1)]
    pub workers: Vec<RecordId>,
}

impl Memberships {
    pub fn of(&self, kind: MemberKind) -> &[RecordId] {
        match kind {
            MemberKind::Business => &self.businesses,
            MemberKind::Worker => &self.workers,
        }
    }

    pub fn contains(&self, kind: MemberKind, id: &RecordId) -> bool {
        self.of(kind).contains(id)
    }

    fn add(&mut self, kind: MemberKind, id: &RecordId) {
        let list = self.of_mut(kind);
        if !list.contains(id) {
            list.push(id.clone());
        }
    }

    fn pull(&mut self, kind: MemberKind, id: &RecordId) {
        self.of_mut(kind).retain(|m| m != id);
    }

    fn of_mut(&mut self, kind: MemberKind) -> &mut Vec<RecordId> {
        match kind {
            MemberKind::Business => &mut self.businesses,
            MemberKind::Worker => &mut self.workers,
        }
    }
}

/// An agency's roster of requested and made affiliations.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct BusinessContract {
    #[n(0)]
    pub id: RecordId,
    #[n(1)]
    pub agency: RecordId,
    #[n(2)]
    pub request_contracts: Memberships,
    #[n(3)]
    pub made_contracts: Memberships,
    #[n(4)]
    pub created_at: TimeStamp<Utc>,
}

/// Atomic change to a [`BusinessContract`] roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipOp {
    /// add to the requests unless already made
    Request { kind: MemberKind, id: RecordId },
    /// pull from the requests and add to the made contracts
    Promote { kind: MemberKind, id: RecordId },
    /// pull from the requests only
    Withdraw { kind: MemberKind, id: RecordId },
}

impl BusinessContract {
    pub fn new(agency: RecordId) -> Self {
        Self {
            id: RecordId::generate(Prefix::BusinessContract),
            agency,
            request_contracts: Memberships::default(),
            made_contracts: Memberships::default(),
            created_at: TimeStamp::new(),
        }
    }

    /// Owner or accepted member. Pending requests do not count.
    pub fn has_member(&self, party: &PartyRef) -> bool {
        match party {
            PartyRef::Agency(id) => *id == self.agency,
            PartyRef::Business(id) => self.made_contracts.contains(MemberKind::Business, id),
            PartyRef::Worker(id) => self.made_contracts.contains(MemberKind::Worker, id),
        }
    }

    /// Owner, accepted member or pending requester. Everyone here must carry the trace.
    pub fn is_linked(&self, party: &PartyRef) -> bool {
        match party.member_kind() {
            Some(kind) => {
                self.request_contracts.contains(kind, party.id())
                    || self.made_contracts.contains(kind, party.id())
            }
            None => party.is_agency(&self.agency),
        }
    }

    pub fn apply(&mut self, op: &MembershipOp) {
        match op {
            MembershipOp::Request { kind, id } => {
                if !self.made_contracts.contains(*kind, id) {
                    self.request_contracts.add(*kind, id);
                }
            }
            MembershipOp::Promote { kind, id } => {
                self.request_contracts.pull(*kind, id);
                self.made_contracts.add(*kind, id);
            }
            MembershipOp::Withdraw { kind, id } => {
                self.request_contracts.pull(*kind, id);
            }
        }
    }

    /// Every member or requester of the roster.
    pub fn linked_parties(&self) -> Vec<PartyRef> {
        let mut parties = vec![PartyRef::Agency(self.agency.clone())];
        for roster in [&self.request_contracts, &self.made_contracts] {
            parties.extend(roster.businesses.iter().cloned().map(PartyRef::Business));
            parties.extend(roster.workers.iter().cloned().map(PartyRef::Worker));
        }
        parties
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Agency,
    Business,
}

/// A single staffing engagement inside a [`WorkContract`].
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct SubContract {
    #[n(0)]
    pub id: RecordId,
    #[n(1)]
    pub worker_count: u32,
    #[n(2)]
    pub validity_period: ValidityPeriod,
    #[n(3)]
    pub accepted_agency: bool,
    #[n(4)]
    pub accepted_business: bool,
    #[n(5)]
    pub request_workers: Vec<RecordId>,
    #[n(6)]
    pub accepted_workers: Vec<RecordId>,
}

/// Atomic change to the worker pools and confirmations of a [`SubContract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterOp {
    Request(RecordId),
    Accept(Vec<RecordId>),
    Revert(Vec<RecordId>),
    Decline(Vec<RecordId>),
    Confirm(Side),
}

impl SubContract {
    pub fn new(worker_count: u32, validity_period: ValidityPeriod) -> Self {
        Self {
            id: RecordId::generate(Prefix::SubContract),
            worker_count,
            validity_period,
            accepted_agency: false,
            accepted_business: false,
            request_workers: vec![],
            accepted_workers: vec![],
        }
    }

    pub fn has_worker(&self, worker: &RecordId) -> bool {
        self.request_workers.contains(worker) || self.accepted_workers.contains(worker)
    }

    pub fn apply(&mut self, op: &RosterOp) {
        match op {
            RosterOp::Request(worker) => {
                if !self.has_worker(worker) {
                    self.request_workers.push(worker.clone());
                }
            }
            RosterOp::Accept(workers) => {
                move_present(&mut self.request_workers, &mut self.accepted_workers, workers);
                self.accepted_business = false;
            }
            RosterOp::Revert(workers) => {
                move_present(&mut self.accepted_workers, &mut self.request_workers, workers);
                self.accepted_business = false;
            }
            RosterOp::Decline(workers) => {
                self.request_workers.retain(|w| !workers.contains(w));
                self.accepted_workers.retain(|w| !workers.contains(w));
                self.accepted_agency = false;
                self.accepted_business = false;
            }
            RosterOp::Confirm(Side::Agency) => self.accepted_agency = true,
            RosterOp::Confirm(Side::Business) => self.accepted_business = true,
        }
    }
}

// moves the ids found in `from` to `to`, ignoring ids that are not there
fn move_present(from: &mut Vec<RecordId>, to: &mut Vec<RecordId>, ids: &[RecordId]) {
    for id in ids {
        if let Some(pos) = from.iter().position(|w| w == id) {
            let moved = from.remove(pos);
            if !to.contains(&moved) {
                to.push(moved);
            }
        }
    }
}

/// Sub-contracts negotiated between one agency and one business.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct WorkContract {
    #[n(0)]
    pub id: RecordId,
    #[n(1)]
    pub agency: RecordId,
    #[n(2)]
    pub business: RecordId,
    #[n(3)]
    pub contracts: Vec<SubContract>,
    #[n(4)]
    pub created_at: TimeStamp<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkContractOp {
    AppendSubContract(SubContract),
    Roster { sub_contract: RecordId, op: RosterOp },
}

impl WorkContract {
    pub fn new(agency: RecordId, business: RecordId) -> Self {
        Self {
            id: RecordId::generate(Prefix::WorkContract),
            agency,
            business,
            contracts: vec![],
            created_at: TimeStamp::new(),
        }
    }

    pub fn sub_contract(&self, id: &RecordId) -> Option<&SubContract> {
        self.contracts.iter().find(|c| c.id == *id)
    }

    /// Returns false when the targeted sub-contract does not exist.
    pub fn apply(&mut self, op: &WorkContractOp) -> bool {
        match op {
            WorkContractOp::AppendSubContract(sub) => {
                self.contracts.push(sub.clone());
                true
            }
            WorkContractOp::Roster { sub_contract, op } => {
                match self.contracts.iter_mut().find(|c| c.id == *sub_contract) {
                    Some(sub) => {
                        sub.apply(op);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Copy with every pending worker pool emptied.
    pub fn without_requests(&self) -> Self {
        let mut redacted = self.clone();
        for sub in redacted.contracts.iter_mut() {
            sub.request_workers.clear();
        }
        redacted
    }
}
