//! Document persistence capability consumed by the contract engines.
//!
//! All operations are async. Array mutations are passed as values
//! ([`MembershipOp`], [`WorkContractOp`]) and applied by the store as one
//! atomic read-modify-write on the targeted document.

use crate::documents::{
    BusinessContract, MembershipOp, Party, ReferenceList, WorkContract, WorkContractOp,
};
use crate::error::StoreError;
use crate::types::{PartyKind, PartyRef, RecordId};

pub type StoreResult<T> = Result<T, StoreError>;

pub trait DocumentStore: Send + Sync {
    // -----------------------------------------------------------------------
    // Parties
    // -----------------------------------------------------------------------

    fn insert_party(&self, party: &Party) -> impl Future<Output = StoreResult<()>> + Send;
    fn get_party(&self, party: &PartyRef) -> impl Future<Output = StoreResult<Option<Party>>> + Send;
    /// Resolves an id across the party collections: Business, then Worker, then Agency.
    fn find_party(&self, id: &RecordId) -> impl Future<Output = StoreResult<Option<Party>>> + Send;
    fn list_parties(&self, kind: PartyKind) -> impl Future<Output = StoreResult<Vec<Party>>> + Send;
    /// Returns false when the party did not exist.
    fn delete_party(&self, party: &PartyRef) -> impl Future<Output = StoreResult<bool>> + Send;
    /// Set-add of a trace. Returns false when the party does not exist.
    fn add_reference(
        &self,
        party: &PartyRef,
        list: ReferenceList,
        contract: &RecordId,
    ) -> impl Future<Output = StoreResult<bool>> + Send;
    /// Set-remove of a trace. Returns false when the party does not exist.
    fn remove_reference(
        &self,
        party: &PartyRef,
        list: ReferenceList,
        contract: &RecordId,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    // -----------------------------------------------------------------------
    // Business contracts
    // -----------------------------------------------------------------------

    /// Returns false when the agency already owns a business contract.
    fn insert_business_contract(
        &self,
        contract: &BusinessContract,
    ) -> impl Future<Output = StoreResult<bool>> + Send;
    fn get_business_contract(
        &self,
        id: &RecordId,
    ) -> impl Future<Output = StoreResult<Option<BusinessContract>>> + Send;
    fn find_business_contract_by_agency(
        &self,
        agency: &RecordId,
    ) -> impl Future<Output = StoreResult<Option<BusinessContract>>> + Send;
    fn update_business_contract(
        &self,
        id: &RecordId,
        op: &MembershipOp,
    ) -> impl Future<Output = StoreResult<Option<BusinessContract>>> + Send;
    fn list_business_contracts(
        &self,
    ) -> impl Future<Output = StoreResult<Vec<BusinessContract>>> + Send;

    // -----------------------------------------------------------------------
    // Work contracts
    // -----------------------------------------------------------------------

    /// Returns false when the (agency, business) pair already has a work contract.
    fn insert_work_contract(
        &self,
        contract: &WorkContract,
    ) -> impl Future<Output = StoreResult<bool>> + Send;
    fn get_work_contract(
        &self,
        id: &RecordId,
    ) -> impl Future<Output = StoreResult<Option<WorkContract>>> + Send;
    fn find_work_contract_by_pair(
        &self,
        agency: &RecordId,
        business: &RecordId,
    ) -> impl Future<Output = StoreResult<Option<WorkContract>>> + Send;
    fn update_work_contract(
        &self,
        id: &RecordId,
        op: &WorkContractOp,
    ) -> impl Future<Output = StoreResult<Option<WorkContract>>> + Send;
    /// Deletes the document and releases its pair. Returns false when it did not exist.
    fn delete_work_contract(&self, id: &RecordId) -> impl Future<Output = StoreResult<bool>> + Send;
    fn list_work_contracts(&self) -> impl Future<Output = StoreResult<Vec<WorkContract>>> + Send;
}
