#![allow(dead_code)]

use account_operator::*;
use config_engine::HierarchyConfig;
use resource_store::{gvk_from_api_version, to_dynamic, InMemoryClusterRouter, InMemoryStore, ObjectKey};
use serde_json::{json, Value};
use std::sync::Arc;

pub const ROOT_NAMESPACE: &str = "platform-mesh-system";

pub fn widget_kind() -> resource_store::GroupVersionKind {
    gvk_from_api_version("example.io/v1", "Widget")
}

pub fn tenant_kind() -> resource_store::GroupVersionKind {
    gvk_from_api_version("example.io/v1", "Tenant")
}

/// Register every kind the tests touch on `store`
pub fn register_kinds(store: &InMemoryStore, accounts_namespaced: bool) {
    let multicluster = config_engine::MultiClusterConfig::default();
    store.register_kind(&namespace_kind(), false);
    store.register_kind(&gvk_of::<Account>(), accounts_namespaced);
    store.register_kind(&gvk_of::<Store>(), true);
    store.register_kind(&gvk_of::<AuthorizationModel>(), true);
    store.register_status_subresource(&gvk_of::<Store>());
    store.register_status_subresource(&gvk_of::<AuthorizationModel>());
    store.register_kind(
        &workspace_kind(&multicluster.workspace_group, &multicluster.workspace_version),
        false,
    );
    store.register_kind(&logical_cluster_kind(), false);
    store.register_kind(&widget_kind(), true);
    store.register_kind(&tenant_kind(), false);
}

pub struct World {
    pub router: Arc<InMemoryClusterRouter>,
    pub store: Arc<InMemoryStore>,
    pub config: HierarchyConfig,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(HierarchyConfig::default())
    }

    pub fn with_config(config: HierarchyConfig) -> Self {
        let router = Arc::new(InMemoryClusterRouter::new());
        let store = router.root();
        register_kinds(&store, true);
        Self { router, store, config }
    }

    pub fn resolver(&self) -> Arc<HierarchyResolver> {
        Arc::new(HierarchyResolver::new(self.router.clone(), self.config.clone()))
    }

    /// Namespace labelled as owned by `owner` (name, namespace)
    pub fn owned_namespace(&self, name: &str, owner: Option<(&str, &str)>) {
        let mut object = ObjectKey::cluster_scoped(namespace_kind(), name).new_object();
        if let Some((owner, owner_namespace)) = owner {
            object.metadata.labels = Some(
                [
                    (self.config.owner_label.clone(), owner.to_string()),
                    (self.config.owner_namespace_label.clone(), owner_namespace.to_string()),
                ]
                .into_iter()
                .collect(),
            );
        }
        self.store.seed(object).unwrap();
    }

    pub fn put_account(&self, account: &Account) {
        self.store.seed(to_dynamic(account).unwrap()).unwrap();
    }

    /// `platform-mesh-system/acme` -> `acme-ns/team-a` -> `team-a-ns/dev`,
    /// each account owning the `<name>-ns` namespace
    pub fn standard_tree(&self) -> (Account, Account, Account) {
        self.owned_namespace(ROOT_NAMESPACE, None);
        let acme = account("acme", ROOT_NAMESPACE, None);
        self.owned_namespace("acme-ns", Some(("acme", ROOT_NAMESPACE)));
        let team = account("team-a", "acme-ns", None);
        self.owned_namespace("team-a-ns", Some(("team-a", "acme-ns")));
        let dev = account("dev", "team-a-ns", Some("bob"));
        self.owned_namespace("dev-ns", Some(("dev", "team-a-ns")));
        for a in [&acme, &team, &dev] {
            self.put_account(a);
        }
        (acme, team, dev)
    }

    pub async fn get(&self, kind: resource_store::GroupVersionKind, namespace: Option<&str>, name: &str) -> Option<Value> {
        let key = ObjectKey::new(kind, namespace, name);
        resource_store::get_opt(self.store.as_ref(), &key)
            .await
            .unwrap()
            .map(|o| serde_json::to_value(o).unwrap())
    }
}

pub fn account(name: &str, namespace: &str, creator: Option<&str>) -> Account {
    let mut account = Account::new(
        name,
        AccountSpec {
            creator: creator.map(str::to_string),
            ..AccountSpec::default()
        },
    );
    account.metadata.namespace = Some(namespace.to_string());
    account.metadata.generation = Some(1);
    account.status = Some(AccountStatus {
        namespace: Some(format!("{name}-ns")),
        ..AccountStatus::default()
    });
    account
}

pub fn extension(api_version: &str, kind: &str, metadata: Value, spec: Value) -> Extension {
    Extension {
        api_version: api_version.to_string(),
        kind: kind.to_string(),
        metadata: metadata.as_object().cloned(),
        spec_go_template: spec.as_object().cloned(),
        ready_condition_type: None,
    }
}

pub fn widget(name: &str) -> Extension {
    extension(
        "example.io/v1",
        "Widget",
        json!({ "name": name }),
        json!({ "owner": "{{ .Account.spec.creator | upper }}", "replicas": 2 }),
    )
}
