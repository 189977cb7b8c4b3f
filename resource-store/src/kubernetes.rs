//! Store implementation backed by a Kubernetes-compatible API server

use async_trait::async_trait;
use dashmap::DashMap;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::discovery::{self, ApiCapabilities, Scope};
use kube::{Client, Config};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::models::{ClusterContext, ListOptions, ObjectKey};
use crate::router::ClusterRouter;
use crate::store::ResourceStore;

fn map_kube_error(err: kube::Error, kind: &str, name: &str) -> StoreError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => StoreError::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        },
        kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists" => StoreError::AlreadyExists {
            kind: kind.to_string(),
            name: name.to_string(),
        },
        kube::Error::Api(resp) if resp.code == 409 => StoreError::Conflict(format!("{kind} {name}: {}", resp.message)),
        kube::Error::Discovery(e) => StoreError::UnknownKind(format!("{kind}: {e}")),
        other => StoreError::Transport(other.to_string()),
    }
}

fn gvk_key(kind: &GroupVersionKind) -> String {
    format!("{}/{}/{}", kind.group, kind.version, kind.kind)
}

/// [`ResourceStore`] over a `kube::Client`, resolving kinds through discovery.
/// Each kind is discovered once per store.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    kinds: Arc<DashMap<String, (ApiResource, ApiCapabilities)>>,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            kinds: Arc::new(DashMap::new()),
        }
    }

    async fn resolve(&self, kind: &GroupVersionKind) -> Result<(ApiResource, ApiCapabilities)> {
        let key = gvk_key(kind);
        if let Some(known) = self.kinds.get(&key) {
            return Ok(known.value().clone());
        }
        let resolved = discovery::pinned_kind(&self.client, kind)
            .await
            .map_err(|e| map_kube_error(e, &kind.kind, ""))?;
        debug!(kind = %key, "Kind discovered");
        self.kinds.insert(key, resolved.clone());
        Ok(resolved)
    }

    fn api(&self, resource: &ApiResource, caps: &ApiCapabilities, namespace: Option<&str>) -> Api<DynamicObject> {
        match (&caps.scope, namespace) {
            (Scope::Namespaced, Some(ns)) => Api::namespaced_with(self.client.clone(), ns, resource),
            _ => Api::all_with(self.client.clone(), resource),
        }
    }

    fn name_of(object: &DynamicObject) -> Result<&str> {
        object
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| StoreError::InvalidObject("object has no name".to_string()))
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get(&self, key: &ObjectKey) -> Result<DynamicObject> {
        let (resource, caps) = self.resolve(&key.kind).await?;
        self.api(&resource, &caps, key.namespace.as_deref())
            .get(&key.name)
            .await
            .map_err(|e| map_kube_error(e, &key.kind.kind, &key.name))
    }

    async fn list(&self, kind: &GroupVersionKind, options: &ListOptions) -> Result<Vec<DynamicObject>> {
        let (resource, caps) = self.resolve(kind).await?;
        let mut params = ListParams::default();
        if let Some(labels) = &options.label_selector {
            params = params.labels(labels);
        }
        if let Some(fields) = &options.field_selector {
            params = params.fields(fields);
        }
        let list = self
            .api(&resource, &caps, options.namespace.as_deref())
            .list(&params)
            .await
            .map_err(|e| map_kube_error(e, &kind.kind, ""))?;
        Ok(list.items)
    }

    async fn create(&self, kind: &GroupVersionKind, object: &DynamicObject) -> Result<DynamicObject> {
        let (resource, caps) = self.resolve(kind).await?;
        let name = Self::name_of(object)?;
        debug!(kind = %kind.kind, name, "Creating object");
        self.api(&resource, &caps, object.metadata.namespace.as_deref())
            .create(&PostParams::default(), object)
            .await
            .map_err(|e| map_kube_error(e, &kind.kind, name))
    }

    async fn update(&self, kind: &GroupVersionKind, object: &DynamicObject) -> Result<DynamicObject> {
        let (resource, caps) = self.resolve(kind).await?;
        let name = Self::name_of(object)?;
        debug!(kind = %kind.kind, name, "Replacing object");
        self.api(&resource, &caps, object.metadata.namespace.as_deref())
            .replace(name, &PostParams::default(), object)
            .await
            .map_err(|e| map_kube_error(e, &kind.kind, name))
    }

    async fn update_status(&self, kind: &GroupVersionKind, object: &DynamicObject) -> Result<DynamicObject> {
        let (resource, caps) = self.resolve(kind).await?;
        let name = Self::name_of(object)?;
        let status = object.data.get("status").cloned().unwrap_or_default();
        debug!(kind = %kind.kind, name, "Patching status");
        self.api(&resource, &caps, object.metadata.namespace.as_deref())
            .patch_status(name, &PatchParams::default(), &Patch::Merge(json!({ "status": status })))
            .await
            .map_err(|e| map_kube_error(e, &kind.kind, name))
    }

    async fn delete(&self, key: &ObjectKey) -> Result<()> {
        let (resource, caps) = self.resolve(&key.kind).await?;
        self.api(&resource, &caps, key.namespace.as_deref())
            .delete(&key.name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| map_kube_error(e, &key.kind.kind, &key.name))
    }

    async fn is_namespaced(&self, kind: &GroupVersionKind) -> Result<bool> {
        let (_, caps) = self.resolve(kind).await?;
        Ok(matches!(caps.scope, Scope::Namespaced))
    }
}

/// Routes cluster contexts to `/clusters/<id>` on the configured server,
/// the addressing scheme of kcp-style multi-cluster control planes. One
/// store, and so one client, is kept per cluster.
pub struct KubeClusterRouter {
    base: Config,
    stores: DashMap<String, Arc<KubeStore>>,
}

impl KubeClusterRouter {
    pub fn new(base: Config) -> Self {
        Self {
            base,
            stores: DashMap::new(),
        }
    }

    /// Use the ambient kubeconfig or in-cluster configuration
    pub async fn infer() -> Result<Self> {
        let base = Config::infer()
            .await
            .map_err(|e| StoreError::Transport(format!("failed to infer kube config: {e}")))?;
        Ok(Self::new(base))
    }

    fn config_for(&self, cluster: Option<&ClusterContext>) -> Result<Config> {
        let mut config = self.base.clone();
        if let Some(cluster) = cluster {
            let url = cluster_url(&self.base.cluster_url.to_string(), cluster.as_str());
            config.cluster_url = match url.parse() {
                Ok(uri) => uri,
                Err(_) => return Err(StoreError::Transport(format!("invalid cluster url '{url}'"))),
            };
        }
        Ok(config)
    }
}

impl ClusterRouter for KubeClusterRouter {
    fn store_for(&self, cluster: Option<&ClusterContext>) -> Result<Arc<dyn ResourceStore>> {
        let id = cluster.map(ClusterContext::as_str).unwrap_or_default().to_string();
        if let Some(store) = self.stores.get(&id) {
            let store: Arc<dyn ResourceStore> = store.value().clone();
            return Ok(store);
        }
        let config = self.config_for(cluster)?;
        let client = Client::try_from(config).map_err(|e| StoreError::Transport(e.to_string()))?;
        let store: Arc<dyn ResourceStore> = self
            .stores
            .entry(id)
            .or_insert_with(|| Arc::new(KubeStore::new(client)))
            .value()
            .clone();
        Ok(store)
    }
}

/// Replace any `/clusters/...` suffix of `base` with `/clusters/<cluster>`
pub fn cluster_url(base: &str, cluster: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    let root = match trimmed.find("/clusters/") {
        Some(index) => &trimmed[..index],
        None => trimmed,
    };
    format!("{root}/clusters/{cluster}")
}
