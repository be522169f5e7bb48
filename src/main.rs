//! Walks an agency, a business and a worker through a full contract round.

use std::sync::Arc;

use anyhow::Context;
use keikkakaveri::{
    SledStore, StoreConfig,
    accounts::AccountService,
    audit,
    business_contract::BusinessContractService,
    types::{PartyKind, TimeStamp, ValidityPeriod},
    work_contract::{WorkContractService, WorkContractView},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("keikkakaveri=info".parse()?),
        )
        .init();

    let config = StoreConfig::from_env().context("invalid store configuration")?;
    let store = Arc::new(SledStore::open(&config)?);

    let accounts = AccountService::new(store.clone());
    let business_contracts = BusinessContractService::new(store.clone());
    let work_contracts = WorkContractService::new(store.clone());

    let agency = accounts.register(PartyKind::Agency, "Keikka Oy").await?;
    let business = accounts.register(PartyKind::Business, "Kahvila Helmi").await?;
    let worker = accounts.register(PartyKind::Worker, "Aino").await?;
    let agency_ref = agency.party_ref();
    let bc_id = agency
        .business_contracts
        .first()
        .cloned()
        .context("Agency was registered without a business contract")?;

    // affiliate both parties with the agency
    business_contracts
        .request_affiliation(&business.party_ref(), &bc_id)
        .await?;
    business_contracts
        .accept(&agency_ref, &bc_id, &business.id)
        .await?;
    business_contracts
        .request_affiliation(&worker.party_ref(), &bc_id)
        .await?;
    business_contracts
        .accept(&agency_ref, &bc_id, &worker.id)
        .await?;

    // staff one sub-contract
    let created = work_contracts.create(&agency_ref, &business.id).await?;
    let period = ValidityPeriod::new(
        TimeStamp::new_with(2026, 6, 1, 8, 0, 0),
        TimeStamp::new_with(2026, 8, 31, 16, 0, 0),
    )?;
    let sub = work_contracts
        .add_sub_contract(&business.party_ref(), &created.id, 2, period)
        .await?;
    work_contracts
        .worker_requests_join(&worker.party_ref(), &created.id, &sub.id)
        .await?;
    work_contracts
        .accept_workers(&agency_ref, &created.id, &sub.id, vec![worker.id.clone()])
        .await?;
    work_contracts
        .accept_work_contract(&agency_ref, &created.id, &sub.id)
        .await?;
    work_contracts
        .accept_work_contract(&business.party_ref(), &created.id, &sub.id)
        .await?;

    if let WorkContractView::Full(contract) =
        work_contracts.read(&agency_ref, &created.id).await?
    {
        tracing::info!(location = %created.location, ?contract, "Work contract staffed");
    }

    let dangling = audit::audit(store.as_ref()).await?;
    tracing::info!(dangling = dangling.len(), "Audit finished");

    store.flush()?;
    Ok(())
}
