//! Custom resources managed by the operator

use chrono::{DateTime, Utc};
use kube::core::GroupVersionKind;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{CustomResource, CustomResourceExt, Resource};
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const GROUP: &str = "core.platform-mesh.io";
pub const VERSION: &str = "v1alpha1";

pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_RELATIONSHIPS_READY: &str = "Relationships_Ready";

/// Role of an account in the tenant tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// First-level account living in the platform root
    Org,
    #[default]
    Account,
}

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "core.platform-mesh.io",
    version = "v1alpha1",
    kind = "Account",
    namespaced,
    status = "AccountStatus",
    shortname = "acc",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct AccountSpec {
    #[serde(rename = "type")]
    pub account_type: AccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Explicit isolation unit; generated when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    /// Child resources propagated to this account and every descendant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Extension>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    /// Resolved isolation unit; immutable once set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_reconcile_time: Option<DateTime<Utc>>,
}

/// Declarative template for a child resource.
///
/// String leaves of `metadata` and `specGoTemplate` are templates rendered
/// against the account; other values are copied as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub spec_go_template: Option<Map<String, Value>>,
    /// Condition type that must not be `False` on the created object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_condition_type: Option<String>,
}

fn preserve_unknown_fields(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..SchemaObject::default()
    };
    schema
        .extensions
        .insert("x-kubernetes-preserve-unknown-fields".to_string(), Value::Bool(true));
    Schema::Object(schema)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Status condition, tolerant of partially filled conditions on foreign objects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Condition {
    pub fn new(type_: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            type_: type_.into(),
            status,
            ..Self::default()
        }
    }
}

pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// `type_` is `True` and was observed at `generation`
pub fn is_condition_true(conditions: &[Condition], type_: &str, generation: Option<i64>) -> bool {
    find_condition(conditions, type_)
        .map(|c| c.status == ConditionStatus::True && (generation.is_none() || c.observed_generation == generation))
        .unwrap_or(false)
}

impl Account {
    /// Isolation unit recorded in status
    pub fn resolved_namespace(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.namespace.as_deref())
            .filter(|ns| !ns.is_empty())
    }

    pub fn conditions(&self) -> &[Condition] {
        self.status.as_ref().map(|s| s.conditions.as_slice()).unwrap_or_default()
    }

    /// Creator identity, if declared
    pub fn creator(&self) -> Option<&str> {
        self.spec.creator.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// Reference to an `AuthorizationModel` or `Store` object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectReference {
    pub name: String,
    /// Defaults to the namespace of the referencing object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ObjectReference {
    pub fn namespace_or<'a>(&'a self, default: Option<&'a str>) -> Option<&'a str> {
        self.namespace.as_deref().or(default)
    }
}

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "core.platform-mesh.io",
    version = "v1alpha1",
    kind = "Store",
    namespaced,
    status = "StoreStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct StoreSpec {
    pub core_module: ObjectReference,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_model_id: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// A model fragment contributed to a store
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "core.platform-mesh.io",
    version = "v1alpha1",
    kind = "AuthorizationModel",
    namespaced,
    status = "AuthorizationModelStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationModelSpec {
    pub store_ref: ObjectReference,
    /// Module source in the modular model language
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationModelStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Account CRD for the deployment mode.
///
/// Multi-cluster deployments give every account its own logical cluster and
/// address accounts by name within it, so the CRD is installed cluster-scoped
/// there.
pub fn account_crd(cluster_scoped: bool) -> CustomResourceDefinition {
    let mut crd = Account::crd();
    if cluster_scoped {
        crd.spec.scope = "Cluster".to_string();
    }
    crd
}

/// Kind of a statically typed resource
pub fn gvk_of<K: Resource<DynamicType = ()>>() -> GroupVersionKind {
    GroupVersionKind::gvk(&K::group(&()), &K::version(&()), &K::kind(&()))
}

pub fn namespace_kind() -> GroupVersionKind {
    gvk_of::<k8s_openapi::api::core::v1::Namespace>()
}

pub fn workspace_kind(group: &str, version: &str) -> GroupVersionKind {
    GroupVersionKind::gvk(group, version, "Workspace")
}

pub fn logical_cluster_kind() -> GroupVersionKind {
    GroupVersionKind::gvk("core.kcp.io", "v1alpha1", "LogicalCluster")
}
