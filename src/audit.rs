//! Reference symmetry audit.
//!
//! A contract id must sit in a party's trace list exactly when the party is a
//! member of that contract. The audit walks every document and reports each
//! place where the two sides disagree.

use std::collections::{HashMap, HashSet};

use crate::documents::{BusinessContract, Party, WorkContract};
use crate::error::ContractError;
use crate::store::DocumentStore;
use crate::types::{PartyKind, PartyRef, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dangling {
    /// the party lists a contract it is not a member of
    OrphanTrace,
    /// the contract lists a member whose party document lacks the trace
    MissingTrace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub party: PartyRef,
    pub contract: RecordId,
    pub kind: Dangling,
}

pub async fn audit<S: DocumentStore>(store: &S) -> Result<Vec<DanglingReference>, ContractError> {
    let mut parties: HashMap<PartyRef, Party> = HashMap::new();
    for kind in [PartyKind::Agency, PartyKind::Business, PartyKind::Worker] {
        for party in store.list_parties(kind).await? {
            parties.insert(party.party_ref(), party);
        }
    }
    let business_contracts = store.list_business_contracts().await?;
    let work_contracts = store.list_work_contracts().await?;

    let mut found = vec![];
    audit_business_contracts(&parties, &business_contracts, &mut found);
    audit_work_contracts(&parties, &work_contracts, &mut found);
    Ok(found)
}

fn audit_business_contracts(
    parties: &HashMap<PartyRef, Party>,
    contracts: &[BusinessContract],
    found: &mut Vec<DanglingReference>,
) {
    let by_id: HashMap<&RecordId, &BusinessContract> =
        contracts.iter().map(|c| (&c.id, c)).collect();

    for contract in contracts {
        for member in contract.linked_parties() {
            let traced = parties
                .get(&member)
                .is_some_and(|p| p.business_contracts.contains(&contract.id));
            if !traced {
                found.push(DanglingReference {
                    party: member,
                    contract: contract.id.clone(),
                    kind: Dangling::MissingTrace,
                });
            }
        }
    }

    for (party_ref, party) in parties {
        for trace in &party.business_contracts {
            let linked = by_id
                .get(trace)
                .is_some_and(|contract| contract.is_linked(party_ref));
            if !linked {
                found.push(DanglingReference {
                    party: party_ref.clone(),
                    contract: trace.clone(),
                    kind: Dangling::OrphanTrace,
                });
            }
        }
    }
}

fn audit_work_contracts(
    parties: &HashMap<PartyRef, Party>,
    contracts: &[WorkContract],
    found: &mut Vec<DanglingReference>,
) {
    // agencies and businesses trace the work contract, workers trace the sub-contract
    let mut expected: HashSet<(PartyRef, RecordId)> = HashSet::new();
    for contract in contracts {
        expected.insert((PartyRef::Agency(contract.agency.clone()), contract.id.clone()));
        expected.insert((
            PartyRef::Business(contract.business.clone()),
            contract.id.clone(),
        ));
        for sub in &contract.contracts {
            for worker in sub.request_workers.iter().chain(&sub.accepted_workers) {
                expected.insert((PartyRef::Worker(worker.clone()), sub.id.clone()));
            }
        }
    }

    for (party, contract) in &expected {
        let traced = parties
            .get(party)
            .is_some_and(|p| p.work_contracts.contains(contract));
        if !traced {
            found.push(DanglingReference {
                party: party.clone(),
                contract: contract.clone(),
                kind: Dangling::MissingTrace,
            });
        }
    }

    for (party_ref, party) in parties {
        for trace in &party.work_contracts {
            if !expected.contains(&(party_ref.clone(), trace.clone())) {
                found.push(DanglingReference {
                    party: party_ref.clone(),
                    contract: trace.clone(),
                    kind: Dangling::OrphanTrace,
                });
            }
        }
    }
}
