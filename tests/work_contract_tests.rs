//! Work contract scenarios against a sled-backed store.

mod common;

use common::{Marketplace, affiliated, is_not_found, onboard, period, sled_store};
use keikkakaveri::{
    ContractError, DocumentStore, audit,
    types::{PartyKind, Prefix, RecordId},
    work_contract::WorkContractView,
};

#[tokio::test]
async fn affiliate_staff_and_accept_worker() -> anyhow::Result<()> {
    let (_dir, store) = sled_store("affiliate_staff_and_accept")?;
    let market = Marketplace::new(store);
    let parties = onboard(&market).await;
    let agency = parties.agency.party_ref();
    let bc = &parties.business_contract;

    // worker asks, agency accepts
    market
        .business_contracts
        .request_affiliation(&parties.worker.party_ref(), bc)
        .await?;
    let contract = market
        .business_contracts
        .accept(&agency, bc, &parties.worker.id)
        .await?;
    assert_eq!(contract.made_contracts.workers, vec![parties.worker.id.clone()]);
    assert!(contract.request_contracts.workers.is_empty());
    assert!(market.party(&parties.worker).await.business_contracts.contains(bc));

    market
        .business_contracts
        .agency_add_member(&agency, bc, &parties.business.id)
        .await?;

    let created = market
        .work_contracts
        .create(&agency, &parties.business.id)
        .await?;
    assert!(created.location.ends_with(created.id.as_str()));

    let sub = market
        .work_contracts
        .add_sub_contract(&parties.business.party_ref(), &created.id, 2, period())
        .await?;
    assert!(!sub.accepted_agency && !sub.accepted_business);

    market
        .work_contracts
        .worker_requests_join(&parties.worker.party_ref(), &created.id, &sub.id)
        .await?;
    market
        .work_contracts
        .accept_work_contract(&parties.business.party_ref(), &created.id, &sub.id)
        .await?;

    let contract = market
        .work_contracts
        .accept_workers(&agency, &created.id, &sub.id, vec![parties.worker.id.clone()])
        .await?;

    let sub = contract.sub_contract(&sub.id).unwrap();
    assert_eq!(sub.accepted_workers, vec![parties.worker.id.clone()]);
    assert!(sub.request_workers.is_empty());
    assert!(!sub.accepted_business);

    assert!(market.party(&parties.worker).await.work_contracts.contains(&sub.id));
    assert!(market.party(&parties.business).await.work_contracts.contains(&created.id));
    assert!(market.party(&parties.agency).await.work_contracts.contains(&created.id));
    assert!(audit::audit(market.store.as_ref()).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn declining_an_accepted_worker_resets_both_sides() -> anyhow::Result<()> {
    let (_dir, store) = sled_store("decline_accepted_worker")?;
    let market = Marketplace::new(store);
    let parties = affiliated(&market).await;
    let agency = parties.agency.party_ref();
    let business = parties.business.party_ref();

    let created = market.work_contracts.create(&agency, &parties.business.id).await?;
    let sub = market
        .work_contracts
        .add_sub_contract(&business, &created.id, 1, period())
        .await?;
    market
        .work_contracts
        .worker_requests_join(&parties.worker.party_ref(), &created.id, &sub.id)
        .await?;
    market
        .work_contracts
        .accept_workers(&agency, &created.id, &sub.id, vec![parties.worker.id.clone()])
        .await?;
    market
        .work_contracts
        .accept_work_contract(&agency, &created.id, &sub.id)
        .await?;
    market
        .work_contracts
        .accept_work_contract(&business, &created.id, &sub.id)
        .await?;

    let contract = market.work_contract(&created.id).await;
    let before = contract.sub_contract(&sub.id).unwrap();
    assert!(before.accepted_agency && before.accepted_business);
    assert!(before.request_workers.is_empty());

    let contract = market
        .work_contracts
        .decline_workers(&business, &created.id, &sub.id, vec![parties.worker.id.clone()])
        .await?;

    let after = contract.sub_contract(&sub.id).unwrap();
    assert!(after.accepted_workers.is_empty());
    assert!(after.request_workers.is_empty());
    assert!(!after.accepted_agency);
    assert!(!after.accepted_business);
    assert!(!market.party(&parties.worker).await.work_contracts.contains(&sub.id));
    assert!(audit::audit(market.store.as_ref()).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn revert_moves_workers_back_and_needs_business_again() -> anyhow::Result<()> {
    let (_dir, store) = sled_store("revert_workers")?;
    let market = Marketplace::new(store);
    let parties = affiliated(&market).await;
    let agency = parties.agency.party_ref();

    let created = market.work_contracts.create(&agency, &parties.business.id).await?;
    let sub = market
        .work_contracts
        .add_sub_contract(&agency, &created.id, 1, period())
        .await?;
    market
        .work_contracts
        .worker_requests_join(&parties.worker.party_ref(), &created.id, &sub.id)
        .await?;
    market
        .work_contracts
        .accept_workers(&agency, &created.id, &sub.id, vec![parties.worker.id.clone()])
        .await?;
    market
        .work_contracts
        .accept_work_contract(&parties.business.party_ref(), &created.id, &sub.id)
        .await?;

    let contract = market
        .work_contracts
        .revert_workers(&agency, &created.id, &sub.id, vec![parties.worker.id.clone()])
        .await?;

    let sub = contract.sub_contract(&sub.id).unwrap();
    assert_eq!(sub.request_workers, vec![parties.worker.id.clone()]);
    assert!(sub.accepted_workers.is_empty());
    assert!(!sub.accepted_business);

    Ok(())
}

#[tokio::test]
async fn create_requires_a_made_business_contract() -> anyhow::Result<()> {
    let (_dir, store) = sled_store("create_requires_affiliation")?;
    let market = Marketplace::new(store);
    let parties = onboard(&market).await;
    let agency = parties.agency.party_ref();

    // a pending request is not enough
    market
        .business_contracts
        .request_affiliation(&parties.business.party_ref(), &parties.business_contract)
        .await?;
    let result = market.work_contracts.create(&agency, &parties.business.id).await;
    assert!(matches!(result, Err(ContractError::Forbidden(_))));

    let result = market
        .work_contracts
        .create(&parties.business.party_ref(), &parties.business.id)
        .await;
    assert!(matches!(result, Err(ContractError::Forbidden(_))));

    assert!(market.party(&parties.agency).await.work_contracts.is_empty());
    Ok(())
}

#[tokio::test]
async fn second_work_contract_for_a_pair_is_a_conflict() -> anyhow::Result<()> {
    let (_dir, store) = sled_store("second_work_contract")?;
    let market = Marketplace::new(store);
    let parties = affiliated(&market).await;
    let agency = parties.agency.party_ref();

    let first = market.work_contracts.create(&agency, &parties.business.id).await?;
    let result = market.work_contracts.create(&agency, &parties.business.id).await;

    assert!(matches!(result, Err(ContractError::Conflict(_))));
    assert_eq!(
        market.party(&parties.business).await.work_contracts,
        vec![first.id.clone()]
    );
    assert_eq!(
        market.party(&parties.agency).await.work_contracts,
        vec![first.id]
    );
    Ok(())
}

#[tokio::test]
async fn join_needs_affiliation_with_the_agency() -> anyhow::Result<()> {
    let (_dir, store) = sled_store("join_needs_affiliation")?;
    let market = Marketplace::new(store);
    let parties = affiliated(&market).await;
    let agency = parties.agency.party_ref();

    let created = market.work_contracts.create(&agency, &parties.business.id).await?;
    let sub = market
        .work_contracts
        .add_sub_contract(&agency, &created.id, 3, period())
        .await?;

    let outsider = market
        .accounts
        .register(PartyKind::Worker, "Eero")
        .await?;
    let result = market
        .work_contracts
        .worker_requests_join(&outsider.party_ref(), &created.id, &sub.id)
        .await;
    assert!(is_not_found(&result));
    assert!(market.party(&outsider).await.work_contracts.is_empty());

    Ok(())
}

#[tokio::test]
async fn joining_twice_is_forbidden() -> anyhow::Result<()> {
    let (_dir, store) = sled_store("join_twice")?;
    let market = Marketplace::new(store);
    let parties = affiliated(&market).await;
    let agency = parties.agency.party_ref();
    let worker = parties.worker.party_ref();

    let created = market.work_contracts.create(&agency, &parties.business.id).await?;
    let sub = market
        .work_contracts
        .add_sub_contract(&agency, &created.id, 3, period())
        .await?;

    market
        .work_contracts
        .worker_requests_join(&worker, &created.id, &sub.id)
        .await?;
    let result = market
        .work_contracts
        .worker_requests_join(&worker, &created.id, &sub.id)
        .await;
    assert!(matches!(result, Err(ContractError::Forbidden(_))));

    let unknown_sub = RecordId::generate(Prefix::SubContract);
    let result = market
        .work_contracts
        .worker_requests_join(&worker, &created.id, &unknown_sub)
        .await;
    assert!(is_not_found(&result));

    Ok(())
}

#[tokio::test]
async fn sub_contract_input_is_validated() -> anyhow::Result<()> {
    let (_dir, store) = sled_store("sub_contract_validation")?;
    let market = Marketplace::new(store);
    let parties = affiliated(&market).await;
    let agency = parties.agency.party_ref();

    let created = market.work_contracts.create(&agency, &parties.business.id).await?;

    let result = market
        .work_contracts
        .add_sub_contract(&agency, &created.id, 0, period())
        .await;
    assert!(matches!(result, Err(ContractError::MalformedInput(_))));

    let result = market
        .work_contracts
        .add_sub_contract(&parties.worker.party_ref(), &created.id, 1, period())
        .await;
    assert!(matches!(result, Err(ContractError::Forbidden(_))));

    let stranger = market
        .accounts
        .register(PartyKind::Business, "Muu Kahvila")
        .await?;
    let result = market
        .work_contracts
        .add_sub_contract(&stranger.party_ref(), &created.id, 1, period())
        .await;
    assert!(matches!(result, Err(ContractError::Forbidden(_))));

    Ok(())
}

#[tokio::test]
async fn only_the_agency_moves_workers() -> anyhow::Result<()> {
    let (_dir, store) = sled_store("agency_moves_workers")?;
    let market = Marketplace::new(store);
    let parties = affiliated(&market).await;
    let agency = parties.agency.party_ref();

    let created = market.work_contracts.create(&agency, &parties.business.id).await?;
    let sub = market
        .work_contracts
        .add_sub_contract(&agency, &created.id, 1, period())
        .await?;

    let result = market
        .work_contracts
        .accept_workers(
            &parties.business.party_ref(),
            &created.id,
            &sub.id,
            vec![parties.worker.id.clone()],
        )
        .await;
    assert!(matches!(result, Err(ContractError::Forbidden(_))));

    let result = market
        .work_contracts
        .accept_work_contract(&parties.worker.party_ref(), &created.id, &sub.id)
        .await;
    assert!(matches!(result, Err(ContractError::Forbidden(_))));

    Ok(())
}

#[tokio::test]
async fn read_is_projected_per_viewer() -> anyhow::Result<()> {
    let (_dir, store) = sled_store("work_contract_read")?;
    let market = Marketplace::new(store);
    let parties = affiliated(&market).await;
    let agency = parties.agency.party_ref();

    let created = market.work_contracts.create(&agency, &parties.business.id).await?;
    let sub = market
        .work_contracts
        .add_sub_contract(&agency, &created.id, 2, period())
        .await?;
    market
        .work_contracts
        .worker_requests_join(&parties.worker.party_ref(), &created.id, &sub.id)
        .await?;

    match market.work_contracts.read(&agency, &created.id).await? {
        WorkContractView::Full(contract) => {
            let sub = contract.sub_contract(&sub.id).unwrap();
            assert_eq!(sub.request_workers, vec![parties.worker.id.clone()]);
        }
        other => panic!("agency should see the full contract, got {other:?}"),
    }

    match market
        .work_contracts
        .read(&parties.business.party_ref(), &created.id)
        .await?
    {
        WorkContractView::Redacted(contract) => {
            assert!(contract.sub_contract(&sub.id).unwrap().request_workers.is_empty());
        }
        other => panic!("business should see a redacted contract, got {other:?}"),
    }

    match market
        .work_contracts
        .read(&parties.worker.party_ref(), &created.id)
        .await?
    {
        WorkContractView::SubContract {
            work_contract,
            sub_contract,
        } => {
            assert_eq!(work_contract, created.id);
            assert_eq!(sub_contract.id, sub.id);
        }
        other => panic!("worker should see a single sub-contract, got {other:?}"),
    }

    let outsider = market.accounts.register(PartyKind::Worker, "Eero").await?;
    let result = market
        .work_contracts
        .read(&outsider.party_ref(), &created.id)
        .await;
    assert!(matches!(result, Err(ContractError::Forbidden(_))));

    Ok(())
}

#[tokio::test]
async fn delete_removes_every_trace_first() -> anyhow::Result<()> {
    let (_dir, store) = sled_store("delete_work_contract")?;
    let market = Marketplace::new(store);
    let parties = affiliated(&market).await;
    let agency = parties.agency.party_ref();

    let created = market.work_contracts.create(&agency, &parties.business.id).await?;
    let sub = market
        .work_contracts
        .add_sub_contract(&agency, &created.id, 2, period())
        .await?;
    market
        .work_contracts
        .worker_requests_join(&parties.worker.party_ref(), &created.id, &sub.id)
        .await?;

    let result = market
        .work_contracts
        .delete(&parties.business.party_ref(), &created.id)
        .await;
    assert!(matches!(result, Err(ContractError::Forbidden(_))));

    market.work_contracts.delete(&agency, &created.id).await?;

    assert!(market.store.get_work_contract(&created.id).await?.is_none());
    assert!(market.party(&parties.agency).await.work_contracts.is_empty());
    assert!(market.party(&parties.business).await.work_contracts.is_empty());
    assert!(market.party(&parties.worker).await.work_contracts.is_empty());
    assert!(audit::audit(market.store.as_ref()).await?.is_empty());

    // the pair is free again
    market.work_contracts.create(&agency, &parties.business.id).await?;
    Ok(())
}
