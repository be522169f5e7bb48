//! Contract reconciliation engine of the Keikkakaveri staffing marketplace.
//!
//! Agencies, businesses and workers agree on business contracts (an agency's
//! roster of affiliations) and work contracts (sub-contracts staffed with
//! workers). Every party document keeps a trace of the contracts it belongs
//! to and the services here keep both sides in sync.

pub mod accounts;
pub mod audit;
pub mod business_contract;
pub mod config;
pub mod documents;
pub mod error;
pub mod mutation;
pub mod sled_store;
pub mod store;
pub mod traces;
pub mod types;
pub mod utils;
pub mod work_contract;

pub use config::StoreConfig;
pub use error::{ContractError, StoreError};
pub use sled_store::SledStore;
pub use store::DocumentStore;
