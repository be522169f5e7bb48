use crate::types::PartyRef;

/// Failures raised by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to decode document: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("failed to encode document: {0}")]
    Encode(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ContractError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
    #[error("traces of {contract} left behind in {}", display_parties(.failed))]
    PartialRollback {
        contract: String,
        failed: Vec<PartyRef>,
    },
    #[error("no trace of {contract} could be removed from {}", display_parties(.failed))]
    RollbackFailed {
        contract: String,
        failed: Vec<PartyRef>,
    },
}

impl ContractError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ContractError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// HTTP status the routing layer answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            ContractError::MalformedInput(_) => 400,
            ContractError::Forbidden(_) => 403,
            ContractError::NotFound { .. } => 404,
            ContractError::Conflict(_) => 409,
            ContractError::Persistence(_)
            | ContractError::PartialRollback { .. }
            | ContractError::RollbackFailed { .. } => 500,
        }
    }
}

fn display_parties(parties: &[PartyRef]) -> String {
    parties
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{name} is not a valid {expected}: {value}")]
    InvalidVar {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}
