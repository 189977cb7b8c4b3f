//! Tenant tree discovery from isolation-unit ownership metadata.
//!
//! Single-cluster: an account lives in its parent's namespace, and that
//! namespace carries owner labels naming the parent.
//!
//! Multi-cluster: an account lives in its parent's logical cluster. The
//! `Workspace` backing that cluster is visible from the root view and is
//! annotated with the owning account and the cluster the owner lives in.

use config_engine::HierarchyConfig;
use kube::core::DynamicObject;
use kube::ResourceExt;
use resource_store::{
    from_dynamic, get_opt, ClusterContext, ClusterRouter, ListOptions, ObjectKey, ResourceStore, StoreError,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::api::{gvk_of, namespace_kind, workspace_kind, Account};

#[derive(Error, Debug)]
pub enum HierarchyError {
    #[error("namespace {namespace} is owned by account '{actual}', not '{expected}'")]
    WrongOwner {
        namespace: String,
        expected: String,
        actual: String,
    },

    #[error("namespace {namespace} is owned by an account in namespace '{actual}', not '{expected}'")]
    WrongOwnerNamespace {
        namespace: String,
        expected: String,
        actual: String,
    },

    #[error("isolation unit {unit} names parent {parent} which could not be found")]
    MissingParent { unit: String, parent: String },

    #[error("hierarchy above {unit} is deeper than {max_depth} levels")]
    DepthExceeded { unit: String, max_depth: usize },

    #[error("{object} has no '{annotation}' annotation")]
    MissingAnnotation { object: String, annotation: String },

    #[error("invalid account: {0}")]
    InvalidAccount(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HierarchyError {
    pub fn is_ownership_conflict(&self) -> bool {
        matches!(self, HierarchyError::WrongOwner { .. } | HierarchyError::WrongOwnerNamespace { .. })
    }
}

/// Where an account lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsolationUnit {
    Namespace(String),
    Cluster(ClusterContext),
}

impl IsolationUnit {
    /// Unit an account lives in; `cluster` is the context it was read from
    pub fn of_account(account: &Account, cluster: Option<&ClusterContext>) -> Result<Self, HierarchyError> {
        match (cluster, account.namespace()) {
            (Some(cluster), _) => Ok(IsolationUnit::Cluster(cluster.clone())),
            (None, Some(namespace)) => Ok(IsolationUnit::Namespace(namespace)),
            (None, None) => Err(HierarchyError::InvalidAccount(format!(
                "account {} has neither a namespace nor a cluster context",
                account.name_any()
            ))),
        }
    }

    pub fn cluster(&self) -> Option<&ClusterContext> {
        match self {
            IsolationUnit::Cluster(cluster) => Some(cluster),
            IsolationUnit::Namespace(_) => None,
        }
    }
}

impl fmt::Display for IsolationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationUnit::Namespace(namespace) => write!(f, "namespace {namespace}"),
            IsolationUnit::Cluster(cluster) => write!(f, "cluster {cluster}"),
        }
    }
}

/// An ancestor account together with the cluster it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct ParentAccount {
    pub account: Account,
    pub cluster: Option<ClusterContext>,
}

impl ParentAccount {
    /// Unit the parent itself lives in, where the walk continues
    pub fn unit(&self) -> Result<IsolationUnit, HierarchyError> {
        IsolationUnit::of_account(&self.account, self.cluster.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParentLookup {
    Parent(ParentAccount),
    NoParent,
}

pub struct HierarchyResolver {
    router: Arc<dyn ClusterRouter>,
    config: HierarchyConfig,
}

impl HierarchyResolver {
    pub fn new(router: Arc<dyn ClusterRouter>, config: HierarchyConfig) -> Self {
        Self { router, config }
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Account owning `unit`, or `NoParent` above the top of the tree
    #[instrument(skip_all, fields(unit = %unit))]
    pub async fn resolve_parent(&self, unit: &IsolationUnit) -> Result<ParentLookup, HierarchyError> {
        match unit {
            IsolationUnit::Namespace(namespace) => self.parent_of_namespace(namespace).await,
            IsolationUnit::Cluster(cluster) => self.parent_of_cluster(cluster).await,
        }
    }

    async fn parent_of_namespace(&self, namespace: &str) -> Result<ParentLookup, HierarchyError> {
        let store = self.router.store_for(None)?;
        let key = ObjectKey::cluster_scoped(namespace_kind(), namespace);
        let Some(unit) = get_opt(store.as_ref(), &key).await? else {
            debug!(namespace, "Namespace not found");
            return Ok(ParentLookup::NoParent);
        };

        let labels = unit.metadata.labels.unwrap_or_default();
        let (Some(owner), Some(owner_namespace)) = (
            non_empty(&labels, &self.config.owner_label),
            non_empty(&labels, &self.config.owner_namespace_label),
        ) else {
            return Ok(ParentLookup::NoParent);
        };

        let parent_key = ObjectKey::new(gvk_of::<Account>(), Some(owner_namespace), owner);
        let account = self.fetch_parent(store.as_ref(), &parent_key, namespace).await?;
        Ok(ParentLookup::Parent(ParentAccount { account, cluster: None }))
    }

    async fn parent_of_cluster(&self, cluster: &ClusterContext) -> Result<ParentLookup, HierarchyError> {
        let settings = &self.config.multicluster;
        let root = self.router.store_for(None)?;
        let workspaces = root
            .list(
                &workspace_kind(&settings.workspace_group, &settings.workspace_version),
                &ListOptions::default(),
            )
            .await?;

        let Some(workspace) = workspaces.iter().find(|w| backing_cluster(w) == Some(cluster.as_str())) else {
            debug!(%cluster, "No workspace is backed by cluster");
            return Ok(ParentLookup::NoParent);
        };

        let annotations = workspace.metadata.annotations.clone().unwrap_or_default();
        let (Some(owner), Some(owner_cluster)) = (
            non_empty(&annotations, &settings.owner_annotation),
            non_empty(&annotations, &settings.cluster_annotation),
        ) else {
            return Ok(ParentLookup::NoParent);
        };

        let parent_cluster = ClusterContext::new(owner_cluster);
        let store = self.router.store_for(Some(&parent_cluster))?;
        let parent_key = ObjectKey::cluster_scoped(gvk_of::<Account>(), owner);
        let account = self.fetch_parent(store.as_ref(), &parent_key, cluster.as_str()).await?;
        Ok(ParentLookup::Parent(ParentAccount {
            account,
            cluster: Some(parent_cluster),
        }))
    }

    async fn fetch_parent(
        &self,
        store: &dyn ResourceStore,
        key: &ObjectKey,
        unit: &str,
    ) -> Result<Account, HierarchyError> {
        match store.get(key).await {
            Ok(object) => Ok(from_dynamic(&object)?),
            Err(e) if e.is_not_found() => Err(HierarchyError::MissingParent {
                unit: unit.to_string(),
                parent: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Every ancestor of `unit`, nearest first, bounded by the configured depth
    pub async fn ancestors(&self, unit: &IsolationUnit) -> Result<Vec<ParentAccount>, HierarchyError> {
        let mut chain = Vec::new();
        let mut current = unit.clone();
        loop {
            match self.resolve_parent(&current).await? {
                ParentLookup::NoParent => return Ok(chain),
                ParentLookup::Parent(parent) => {
                    if chain.len() >= self.config.max_depth {
                        return Err(HierarchyError::DepthExceeded {
                            unit: unit.to_string(),
                            max_depth: self.config.max_depth,
                        });
                    }
                    current = parent.unit()?;
                    chain.push(parent);
                }
            }
        }
    }

    /// Check that `namespace` is labelled as owned by `account`
    pub async fn verify_ownership(
        &self,
        account: &Account,
        namespace: &str,
        cluster: Option<&ClusterContext>,
    ) -> Result<(), HierarchyError> {
        let store = self.router.store_for(cluster)?;
        let unit = store
            .get(&ObjectKey::cluster_scoped(namespace_kind(), namespace))
            .await?;
        check_ownership(&self.config, account, &unit)
    }
}

/// Compare the owner labels of `unit` against `account`
pub fn check_ownership(config: &HierarchyConfig, account: &Account, unit: &DynamicObject) -> Result<(), HierarchyError> {
    let labels = unit.metadata.labels.clone().unwrap_or_default();
    let namespace = unit.name_any();

    let owner = labels.get(&config.owner_label).cloned().unwrap_or_default();
    if owner != account.name_any() {
        return Err(HierarchyError::WrongOwner {
            namespace,
            expected: account.name_any(),
            actual: owner,
        });
    }

    let owner_namespace = labels.get(&config.owner_namespace_label).cloned().unwrap_or_default();
    let expected_namespace = account.namespace().unwrap_or_default();
    if owner_namespace != expected_namespace {
        return Err(HierarchyError::WrongOwnerNamespace {
            namespace,
            expected: expected_namespace,
            actual: owner_namespace,
        });
    }
    Ok(())
}

fn non_empty<'a>(values: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    values.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn backing_cluster(workspace: &DynamicObject) -> Option<&str> {
    workspace.data.pointer("/spec/cluster").and_then(|v| v.as_str())
}
