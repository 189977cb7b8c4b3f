mod common;

use account_operator::*;
use auth_zanzibar::{AuthorizationEngineClient, InMemoryAuthorizationEngine, TupleKey};
use common::*;
use config_engine::AuthorizationConfig;
use error_common::ErrorKind;
use std::sync::Arc;

struct Fixture {
    world: World,
    engine: Arc<InMemoryAuthorizationEngine>,
    store_id: String,
    sync: RelationshipSynchronizer,
    accounts: (Account, Account, Account),
}

async fn fixture() -> Fixture {
    let world = World::new();
    let accounts = world.standard_tree();
    let engine = Arc::new(InMemoryAuthorizationEngine::new());
    let store_id = engine.create_store("acme").await.unwrap().id;
    let sync = RelationshipSynchronizer::new(world.resolver(), engine.clone(), AuthorizationConfig::default());
    Fixture {
        world,
        engine,
        store_id,
        sync,
        accounts,
    }
}

#[tokio::test]
async fn test_root_account_without_creator_writes_nothing() {
    let f = fixture().await;
    let (acme, _, _) = &f.accounts;

    let outcome = f.sync.process(acme, &ReconcileContext::default()).await.unwrap();
    assert!(!outcome.is_requeue());
    assert_eq!(f.engine.write_calls(), 0);
}

#[tokio::test]
async fn test_nested_account_with_creator_writes_two_tuples() {
    let f = fixture().await;
    let (_, _, dev) = &f.accounts;

    f.sync.process(dev, &ReconcileContext::default()).await.unwrap();
    assert_eq!(f.engine.write_calls(), 2);

    let mut expected = vec![
        TupleKey::new("account:dev", "parent", "account:team-a"),
        TupleKey::new("account:dev", "owner", "user:bob"),
    ];
    expected.sort();
    assert_eq!(f.engine.tuples(&f.store_id), expected);
}

#[tokio::test]
async fn test_store_resolved_through_first_level_ancestor() {
    let f = fixture().await;
    let (acme, team, dev) = &f.accounts;
    let ctx = ReconcileContext::default();

    for account in [acme, team, dev] {
        assert_eq!(f.sync.store_id_for(account, &ctx).await.unwrap(), f.store_id);
    }
}

#[tokio::test]
async fn test_duplicates_are_success() {
    let f = fixture().await;
    let (_, _, dev) = &f.accounts;
    let ctx = ReconcileContext::default();

    f.sync.process(dev, &ctx).await.unwrap();
    let outcome = f.sync.process(dev, &ctx).await.unwrap();
    assert!(!outcome.is_requeue());
    assert_eq!(f.engine.tuples(&f.store_id).len(), 2);
}

#[tokio::test]
async fn test_ready_generation_short_circuits() {
    let f = fixture().await;
    let (_, _, dev) = &f.accounts;
    let mut dev = dev.clone();
    let mut ready = Condition::new(CONDITION_RELATIONSHIPS_READY, ConditionStatus::True);
    ready.observed_generation = dev.metadata.generation;
    dev.status.get_or_insert_with(AccountStatus::default).conditions.push(ready);

    f.sync.process(&dev, &ReconcileContext::default()).await.unwrap();
    assert_eq!(f.engine.write_calls(), 0);

    dev.metadata.generation = Some(2);
    f.sync.process(&dev, &ReconcileContext::default()).await.unwrap();
    assert_eq!(f.engine.write_calls(), 2);
}

#[tokio::test]
async fn test_service_account_creator_is_normalized() {
    let f = fixture().await;
    let (acme, _, _) = &f.accounts;
    let mut acme = acme.clone();
    acme.spec.creator = Some("system:serviceaccount:acme:deployer".to_string());

    f.sync.process(&acme, &ReconcileContext::default()).await.unwrap();
    assert_eq!(
        f.engine.tuples(&f.store_id),
        vec![TupleKey::new("account:acme", "owner", "user:system.serviceaccount.acme.deployer")]
    );
}

#[tokio::test]
async fn test_missing_store_is_an_engine_error() {
    let world = World::new();
    let (_, _, dev) = world.standard_tree();
    let engine = Arc::new(InMemoryAuthorizationEngine::new());
    let sync = RelationshipSynchronizer::new(world.resolver(), engine, AuthorizationConfig::default());

    let err = sync.process(&dev, &ReconcileContext::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationEngine);
    assert!(err.retry() && err.alert());
}

#[tokio::test]
async fn test_engine_failure_aborts() {
    let f = fixture().await;
    let (_, _, dev) = &f.accounts;
    f.engine.fail_writes(Some("unavailable"));

    let err = f.sync.process(dev, &ReconcileContext::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationEngine);
    assert_eq!(f.engine.write_calls(), 1);
}

#[tokio::test]
async fn test_finalize_deletes_symmetrically() {
    let f = fixture().await;
    let (_, _, dev) = &f.accounts;
    let ctx = ReconcileContext::default();

    f.sync.process(dev, &ctx).await.unwrap();
    f.sync.finalize(dev, &ctx).await.unwrap();
    assert!(f.engine.tuples(&f.store_id).is_empty());

    // already gone
    f.sync.finalize(dev, &ctx).await.unwrap();
    assert_eq!(f.sync.finalizers(), vec![RELATIONSHIP_FINALIZER]);
    assert!(f.world.store.write_count() == 0);
}
