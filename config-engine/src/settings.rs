//! Operator configuration sections

use logger_redacted::LoggerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_OWNER_LABEL: &str = "account.core.platform-mesh.io/owner";
pub const DEFAULT_OWNER_NAMESPACE_LABEL: &str = "account.core.platform-mesh.io/owner-namespace";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    pub hierarchy: HierarchyConfig,
    pub authorization: AuthorizationConfig,
    pub reconcile: ReconcileConfig,
    pub logging: LoggerConfig,
}

/// How the tenant tree is discovered from isolation-unit metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    pub owner_label: String,
    pub owner_namespace_label: String,
    /// Namespace whose accounts are first-level (organizations)
    pub root_namespace: String,
    /// Upper bound on ancestor hops in one walk
    pub max_depth: usize,
    pub multicluster: MultiClusterConfig,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            owner_label: DEFAULT_OWNER_LABEL.to_string(),
            owner_namespace_label: DEFAULT_OWNER_NAMESPACE_LABEL.to_string(),
            root_namespace: "platform-mesh-system".to_string(),
            max_depth: 32,
            multicluster: MultiClusterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiClusterConfig {
    pub enabled: bool,
    /// Logical cluster of the platform root workspace
    pub root_cluster: String,
    /// Workspace annotation naming the owning account
    pub owner_annotation: String,
    /// Annotation naming the logical cluster an object lives in
    pub cluster_annotation: String,
    /// Annotation carrying the human readable workspace path
    pub path_annotation: String,
    pub workspace_group: String,
    pub workspace_version: String,
}

impl Default for MultiClusterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            root_cluster: "root".to_string(),
            owner_annotation: DEFAULT_OWNER_LABEL.to_string(),
            cluster_annotation: "kcp.io/cluster".to_string(),
            path_annotation: "kcp.io/path".to_string(),
            workspace_group: "tenancy.kcp.io".to_string(),
            workspace_version: "v1alpha1".to_string(),
        }
    }
}

/// Authorization engine endpoint and tuple vocabulary
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
    pub object_type: String,
    pub user_type: String,
    pub parent_relation: String,
    pub owner_relation: String,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            api_url: "http://openfga:8080".to_string(),
            api_token: None,
            request_timeout_secs: 10,
            object_type: "account".to_string(),
            user_type: "user".to_string(),
            parent_relation: "parent".to_string(),
            owner_relation: "owner".to_string(),
        }
    }
}

impl AuthorizationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for AuthorizationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("object_type", &self.object_type)
            .field("user_type", &self.user_type)
            .field("parent_relation", &self.parent_relation)
            .field("owner_relation", &self.owner_relation)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Poll interval for pending readiness checks
    pub requeue_after_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { requeue_after_secs: 10 }
    }
}

impl ReconcileConfig {
    pub fn requeue_after(&self) -> Duration {
        Duration::from_secs(self.requeue_after_secs)
    }
}
