mod common;

use account_operator::*;
use common::*;
use error_common::ErrorKind;
use resource_store::{ObjectKey, ResourceStore};
use serde_json::json;

fn reconciler(world: &World) -> ExtensionReconciler {
    ExtensionReconciler::new(world.router.clone(), world.resolver())
}

fn gate(world: &World) -> ExtensionReadinessGate {
    ExtensionReadinessGate::new(world.router.clone(), world.resolver())
}

/// Tree of `depth` accounts where level `i` declares `i + 1` extensions;
/// returns the isolation unit owned by the deepest account
fn chain(world: &World, depth: usize) -> IsolationUnit {
    world.owned_namespace(ROOT_NAMESPACE, None);
    let mut namespace = ROOT_NAMESPACE.to_string();
    for level in 0..depth {
        let name = format!("level-{level}");
        let mut node = account(&name, &namespace, None);
        node.spec.extensions = (0..=level).map(|i| widget(&format!("{name}-{i}"))).collect();
        world.put_account(&node);
        let owned = format!("{name}-ns");
        world.owned_namespace(&owned, Some((&name, &namespace)));
        namespace = owned;
    }
    IsolationUnit::Namespace(namespace)
}

#[tokio::test]
async fn test_collect_extensions_oldest_ancestor_first() {
    for depth in [0usize, 1, 4] {
        let world = World::new();
        let unit = chain(&world, depth);
        let collector = ExtensionCollector::new(world.resolver());

        let collected = collector.collect_extensions(&unit).await.unwrap();
        assert_eq!(collected.len(), (1..=depth).sum::<usize>());

        let names: Vec<String> = collected
            .iter()
            .map(|e| e.metadata.as_ref().unwrap()["name"].as_str().unwrap().to_string())
            .collect();
        let expected: Vec<String> = (0..depth)
            .flat_map(|level| (0..=level).map(move |i| format!("level-{level}-{i}")))
            .collect();
        assert_eq!(names, expected);
    }
}

#[tokio::test]
async fn test_own_extensions_come_last() {
    let world = World::new();
    let (mut acme, team, mut dev) = world.standard_tree();
    acme.spec.extensions = vec![widget("from-acme")];
    world.put_account(&acme);
    dev.spec.extensions = vec![widget("from-dev")];

    let collector = ExtensionCollector::new(world.resolver());
    let all = collector.extensions_for(&dev, &ReconcileContext::default()).await.unwrap();
    let names: Vec<&str> = all
        .iter()
        .map(|e| e.metadata.as_ref().unwrap()["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["from-acme", "from-dev"]);
    assert!(team.spec.extensions.is_empty());
}

#[tokio::test]
async fn test_process_renders_and_is_idempotent() {
    let world = World::new();
    let (mut acme, _, dev) = world.standard_tree();
    acme.spec.extensions = vec![extension(
        "example.io/v1",
        "Widget",
        json!({ "name": "{{ .Account.metadata.name }}-settings", "labels": { "tier": "gold" } }),
        json!({ "owner": "{{ .Account.spec.creator | upper }}", "replicas": 2, "nested": { "who": "{{ .Account.spec.creator }}" } }),
    )];
    world.put_account(&acme);
    let reconciler = reconciler(&world);
    let ctx = ReconcileContext::default();

    let outcome = reconciler.process(&dev, &ctx).await.unwrap();
    assert!(!outcome.is_requeue());

    let created = world.get(widget_kind(), Some("dev-ns"), "dev-settings").await.unwrap();
    assert_eq!(created["spec"]["owner"], "BOB");
    assert_eq!(created["spec"]["replicas"], 2);
    assert_eq!(created["spec"]["nested"]["who"], "bob");
    assert_eq!(created["metadata"]["labels"]["tier"], "gold");

    let writes = world.store.write_count();
    reconciler.process(&dev, &ctx).await.unwrap();
    assert_eq!(world.store.write_count(), writes);
}

#[tokio::test]
async fn test_process_corrects_drift() {
    let world = World::new();
    let (_, _, mut dev) = world.standard_tree();
    dev.spec.extensions = vec![widget("settings")];
    let reconciler = reconciler(&world);
    let ctx = ReconcileContext::default();
    reconciler.process(&dev, &ctx).await.unwrap();

    let key = ObjectKey::new(widget_kind(), Some("dev-ns"), "settings");
    let mut drifted = world.store.get(&key).await.unwrap();
    drifted.data["spec"]["owner"] = json!("mallory");
    world.store.update(&key.kind, &drifted).await.unwrap();

    reconciler.process(&dev, &ctx).await.unwrap();
    let fixed = world.get(widget_kind(), Some("dev-ns"), "settings").await.unwrap();
    assert_eq!(fixed["spec"]["owner"], "BOB");
}

#[tokio::test]
async fn test_cluster_scoped_target_defaults_name_to_kind() {
    let world = World::new();
    let (_, _, mut dev) = world.standard_tree();
    dev.spec.extensions = vec![extension("example.io/v1", "Tenant", json!(null), json!({ "size": "small" }))];

    reconciler(&world).process(&dev, &ReconcileContext::default()).await.unwrap();
    let created = world.get(tenant_kind(), None, "tenant").await.unwrap();
    assert_eq!(created["spec"]["size"], "small");
    assert!(created["metadata"].get("namespace").is_none());
}

#[tokio::test]
async fn test_unresolved_namespace_requeues() {
    let world = World::new();
    let (_, _, mut dev) = world.standard_tree();
    dev.spec.extensions = vec![widget("settings")];
    dev.status = None;

    let writes = world.store.write_count();
    let outcome = reconciler(&world).process(&dev, &ReconcileContext::default()).await.unwrap();
    assert!(outcome.is_requeue());
    assert_eq!(world.store.write_count(), writes);
}

#[tokio::test]
async fn test_missing_namespace_requeues_without_error() {
    let world = World::new();
    let (_, _, mut dev) = world.standard_tree();
    dev.spec.extensions = vec![widget("settings")];
    if let Some(status) = dev.status.as_mut() {
        status.namespace = Some("not-created-yet".to_string());
    }

    let writes = world.store.write_count();
    let outcome = reconciler(&world).process(&dev, &ReconcileContext::default()).await.unwrap();
    assert!(outcome.is_requeue());
    assert_eq!(world.store.write_count(), writes);
}

#[tokio::test]
async fn test_foreign_namespace_is_an_ownership_conflict() {
    let world = World::new();
    let (_, _, mut dev) = world.standard_tree();
    dev.spec.extensions = vec![widget("settings")];
    if let Some(status) = dev.status.as_mut() {
        status.namespace = Some("team-a-ns".to_string());
    }

    let err = reconciler(&world).process(&dev, &ReconcileContext::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OwnershipConflict);
    assert!(!err.retry());
    assert!(err.alert());
    assert!(err.context().unwrap().to_string().contains("dev"));
}

#[tokio::test]
async fn test_broken_template_is_reported() {
    let world = World::new();
    let (_, _, mut dev) = world.standard_tree();
    dev.spec.extensions = vec![extension(
        "example.io/v1",
        "Widget",
        json!({ "name": "settings" }),
        json!({ "owner": "{{ if .Account.spec.creator }}unterminated" }),
    )];

    let err = reconciler(&world).process(&dev, &ReconcileContext::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Template);
    assert!(err.retry() && err.alert());
}

#[tokio::test]
async fn test_finalize_deletes_and_tolerates_missing() {
    let world = World::new();
    let (_, _, mut dev) = world.standard_tree();
    dev.spec.extensions = vec![widget("settings")];
    let reconciler = reconciler(&world);
    let ctx = ReconcileContext::default();

    reconciler.process(&dev, &ctx).await.unwrap();
    assert!(world.get(widget_kind(), Some("dev-ns"), "settings").await.is_some());

    reconciler.finalize(&dev, &ctx).await.unwrap();
    assert!(world.get(widget_kind(), Some("dev-ns"), "settings").await.is_none());
    reconciler.finalize(&dev, &ctx).await.unwrap();
    assert_eq!(reconciler.finalizers(), vec![EXTENSION_FINALIZER]);
}

async fn set_widget_status(world: &World, name: &str, status: serde_json::Value) {
    let key = ObjectKey::new(widget_kind(), Some("dev-ns"), name);
    let mut object = world.store.get(&key).await.unwrap();
    object.data["status"] = status;
    world.store.update(&key.kind, &object).await.unwrap();
}

#[tokio::test]
async fn test_readiness_gate() {
    let world = World::new();
    let (_, _, mut dev) = world.standard_tree();
    let mut gated = widget("gated");
    gated.ready_condition_type = Some("Ready".to_string());
    dev.spec.extensions = vec![widget("ungated"), gated];
    let gate = gate(&world);
    let ctx = ReconcileContext::default();

    // missing target
    assert!(gate.process(&dev, &ctx).await.unwrap().is_requeue());

    reconciler(&world).process(&dev, &ctx).await.unwrap();
    // no status yet counts as not declared
    assert!(!gate.process(&dev, &ctx).await.unwrap().is_requeue());

    set_widget_status(&world, "gated", json!({ "conditions": [{ "type": "Ready", "status": "False", "reason": "Provisioning" }] })).await;
    assert!(gate.process(&dev, &ctx).await.unwrap().is_requeue());

    set_widget_status(&world, "gated", json!({ "conditions": [{ "type": "Ready", "status": "Unknown" }] })).await;
    assert!(!gate.process(&dev, &ctx).await.unwrap().is_requeue());

    set_widget_status(&world, "gated", json!({ "conditions": [{ "type": "Ready", "status": "True" }] })).await;
    assert!(!gate.process(&dev, &ctx).await.unwrap().is_requeue());

    assert!(!gate.finalize(&dev, &ctx).await.unwrap().is_requeue());
    assert!(gate.finalizers().is_empty());
}

#[tokio::test]
async fn test_readiness_gate_polls_at_configured_interval() {
    let world = World::new();
    let (_, _, mut dev) = world.standard_tree();
    let mut gated = widget("gated");
    gated.ready_condition_type = Some("Ready".to_string());
    dev.spec.extensions = vec![gated];

    let interval = config_engine::ReconcileConfig::default().requeue_after();
    let gate = gate(&world).with_poll_interval(interval);
    let outcome = gate.process(&dev, &ReconcileContext::default()).await.unwrap();
    assert!(outcome.is_requeue());
    assert_eq!(outcome.requeue_delay(), Some(interval));
}

#[tokio::test]
async fn test_subroutines_run_together() {
    let world = World::new();
    let (_, _, mut dev) = world.standard_tree();
    let mut gated = widget("gated");
    gated.ready_condition_type = Some("Ready".to_string());
    dev.spec.extensions = vec![gated];

    let reconciler = reconciler(&world);
    let gate = gate(&world);
    let steps: Vec<&dyn Subroutine<Account>> = vec![&reconciler, &gate];
    let sink = error_common::TracingErrorSink::new();

    let outcome = process_all(&steps, &dev, &ReconcileContext::default(), &sink).await.unwrap();
    assert!(!outcome.is_requeue());
    assert!(world.get(widget_kind(), Some("dev-ns"), "gated").await.is_some());

    finalize_all(&steps, &dev, &ReconcileContext::default(), &sink).await.unwrap();
    assert!(world.get(widget_kind(), Some("dev-ns"), "gated").await.is_none());
}
