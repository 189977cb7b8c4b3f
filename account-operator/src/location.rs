//! Where an account's own workspace lives in a multi-cluster deployment

use config_engine::MultiClusterConfig;
use kube::ResourceExt;
use resource_store::{get_opt, ClusterContext, ClusterRouter, ObjectKey};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::api::{logical_cluster_kind, workspace_kind, Account, AccountType};
use crate::error::Result;
use crate::hierarchy::HierarchyError;

/// Name of the `LogicalCluster` object describing a cluster from inside it
const LOGICAL_CLUSTER_NAME: &str = "cluster";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLocation {
    pub name: String,
    /// Cluster backing the account's workspace
    pub generated_cluster_id: String,
    /// Cluster the Account object itself lives in
    pub origin_cluster_id: String,
    pub path: String,
    pub url: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationLookup {
    Found(AccountLocation),
    /// Workspace missing or not scheduled onto a cluster yet
    Pending,
}

pub struct AccountLocationResolver {
    router: Arc<dyn ClusterRouter>,
    config: MultiClusterConfig,
}

impl AccountLocationResolver {
    pub fn new(router: Arc<dyn ClusterRouter>, config: MultiClusterConfig) -> Self {
        Self { router, config }
    }

    #[instrument(skip_all, fields(account = %account.name_any(), cluster = %cluster))]
    pub async fn resolve_location(&self, account: &Account, cluster: &ClusterContext) -> Result<LocationLookup> {
        let store = self.router.store_for(Some(cluster))?;
        let name = account.name_any();

        let workspace_key = ObjectKey::cluster_scoped(
            workspace_kind(&self.config.workspace_group, &self.config.workspace_version),
            name.clone(),
        );
        let Some(workspace) = get_opt(store.as_ref(), &workspace_key).await? else {
            debug!("Workspace not created yet");
            return Ok(LocationLookup::Pending);
        };
        let Some(generated) = workspace
            .data
            .pointer("/spec/cluster")
            .and_then(|v| v.as_str())
            .filter(|c| !c.is_empty())
        else {
            debug!("Workspace not scheduled yet");
            return Ok(LocationLookup::Pending);
        };
        let url = workspace
            .data
            .pointer("/spec/URL")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let logical_cluster = store
            .get(&ObjectKey::cluster_scoped(logical_cluster_kind(), LOGICAL_CLUSTER_NAME))
            .await?;
        let parent_path = logical_cluster
            .annotations()
            .get(&self.config.path_annotation)
            .ok_or_else(|| HierarchyError::MissingAnnotation {
                object: format!("LogicalCluster {LOGICAL_CLUSTER_NAME} in {cluster}"),
                annotation: self.config.path_annotation.clone(),
            })?;

        Ok(LocationLookup::Found(AccountLocation {
            path: format!("{parent_path}:{name}"),
            name,
            generated_cluster_id: generated.to_string(),
            origin_cluster_id: cluster.to_string(),
            url: url.to_string(),
            account_type: account.spec.account_type,
        }))
    }
}
