//! Party onboarding.
use std::sync::Arc;

use tracing::{info, warn};

use crate::business_contract::BusinessContractService;
use crate::documents::Party;
use crate::error::ContractError;
use crate::store::DocumentStore;
use crate::types::{PartyKind, PartyRef};

pub struct AccountService<S> {
    store: Arc<S>,
    business_contracts: BusinessContractService<S>,
}

impl<S: DocumentStore> AccountService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            business_contracts: BusinessContractService::new(store.clone()),
            store,
        }
    }

    /// Register a party. Agencies get their business contract right away.
    pub async fn register(&self, kind: PartyKind, name: &str) -> Result<Party, ContractError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ContractError::MalformedInput("name must not be empty".into()));
        }

        let party = Party::new(kind, name.to_owned());
        self.store.insert_party(&party).await?;
        info!(party = %party.id, kind = %kind, "Registered party");

        if kind == PartyKind::Agency {
            // an agency without its business contract is not registered
            if let Err(e) = self.business_contracts.create(&party.id).await {
                warn!(party = %party.id, error = %e, "Business contract failed, removing agency");
                self.store.delete_party(&party.party_ref()).await?;
                return Err(e);
            }
            return self.get(&party.party_ref()).await;
        }
        Ok(party)
    }

    pub async fn get(&self, party: &PartyRef) -> Result<Party, ContractError> {
        self.store
            .get_party(party)
            .await?
            .ok_or_else(|| ContractError::not_found("party", party.id()))
    }
}
