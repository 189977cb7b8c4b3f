//! In-memory store for tests and offline tooling

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use kube::core::{DynamicObject, GroupVersionKind};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::models::{api_version_of, ClusterContext, ListOptions, ObjectKey};
use crate::router::ClusterRouter;
use crate::store::ResourceStore;

fn kind_key(kind: &GroupVersionKind) -> String {
    format!("{}|{}", api_version_of(kind), kind.kind)
}

fn object_key(kind: &GroupVersionKind, namespace: Option<&str>, name: &str) -> String {
    format!("{}|{}|{}", kind_key(kind), namespace.unwrap_or_default(), name)
}

/// Store backed by a concurrent map. Kinds must be registered with their
/// scope before use, mirroring discovery on a real server.
#[derive(Default)]
pub struct InMemoryStore {
    objects: DashMap<String, DynamicObject>,
    namespaced: DashSet<String>,
    cluster_scoped: DashSet<String>,
    status_subresource: DashSet<String>,
    resource_version: AtomicU64,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_kind(&self, kind: &GroupVersionKind, namespaced: bool) {
        let key = kind_key(kind);
        if namespaced {
            self.namespaced.insert(key);
        } else {
            self.cluster_scoped.insert(key);
        }
    }

    /// Serve `status` of `kind` separately: `update` keeps the stored status
    /// and only `update_status` changes it
    pub fn register_status_subresource(&self, kind: &GroupVersionKind) {
        self.status_subresource.insert(kind_key(kind));
    }

    /// Put an object without counting it as a write
    pub fn seed(&self, object: DynamicObject) -> Result<()> {
        let key = ObjectKey::of(&object)
            .ok_or_else(|| StoreError::InvalidObject("object has no name or type".to_string()))?;
        self.objects
            .insert(object_key(&key.kind, key.namespace.as_deref(), &key.name), object);
        Ok(())
    }

    /// Number of create, update and delete calls served
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn ensure_known(&self, kind: &GroupVersionKind) -> Result<()> {
        let key = kind_key(kind);
        if self.namespaced.contains(&key) || self.cluster_scoped.contains(&key) {
            Ok(())
        } else {
            Err(StoreError::UnknownKind(key))
        }
    }

    fn stamp(&self, object: &mut DynamicObject) {
        let version = self.resource_version.fetch_add(1, Ordering::SeqCst) + 1;
        object.metadata.resource_version = Some(version.to_string());
    }

    fn identity(kind: &GroupVersionKind, object: &DynamicObject) -> Result<String> {
        let name = object
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| StoreError::InvalidObject("object has no name".to_string()))?;
        Ok(object_key(kind, object.metadata.namespace.as_deref(), name))
    }

    fn check_version(id: &str, stored: &DynamicObject, incoming: &DynamicObject) -> Result<()> {
        if let Some(expected) = &incoming.metadata.resource_version {
            if stored.metadata.resource_version.as_ref() != Some(expected) {
                return Err(StoreError::Conflict(id.to_string()));
            }
        }
        Ok(())
    }
}

fn set_status(data: &mut serde_json::Value, status: Option<serde_json::Value>) {
    if data.is_null() {
        *data = serde_json::Value::Object(serde_json::Map::new());
    }
    if let Some(fields) = data.as_object_mut() {
        match status {
            Some(status) => fields.insert("status".to_string(), status),
            None => fields.remove("status"),
        };
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get(&self, key: &ObjectKey) -> Result<DynamicObject> {
        self.ensure_known(&key.kind)?;
        self.objects
            .get(&object_key(&key.kind, key.namespace.as_deref(), &key.name))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                kind: key.kind.kind.clone(),
                name: key.name.clone(),
            })
    }

    async fn list(&self, kind: &GroupVersionKind, options: &ListOptions) -> Result<Vec<DynamicObject>> {
        self.ensure_known(kind)?;
        let label_selector = Selector::parse(options.label_selector.as_deref())?;
        let field_selector = Selector::parse(options.field_selector.as_deref())?;
        let prefix = format!("{}|", kind_key(kind));

        let mut items = Vec::new();
        for entry in self.objects.iter() {
            if !entry.key().starts_with(&prefix) {
                continue;
            }
            let object = entry.value();
            if let Some(ns) = &options.namespace {
                if object.metadata.namespace.as_deref() != Some(ns.as_str()) {
                    continue;
                }
            }
            if !label_selector.matches(|k| object.metadata.labels.as_ref().and_then(|l| l.get(k)).cloned()) {
                continue;
            }
            let value = serde_json::to_value(object)?;
            if !field_selector.matches(|path| lookup_path(&value, path)) {
                continue;
            }
            items.push(object.clone());
        }
        items.sort_by(|a, b| {
            (a.metadata.namespace.as_deref(), a.metadata.name.as_deref())
                .cmp(&(b.metadata.namespace.as_deref(), b.metadata.name.as_deref()))
        });
        Ok(items)
    }

    async fn create(&self, kind: &GroupVersionKind, object: &DynamicObject) -> Result<DynamicObject> {
        self.ensure_known(kind)?;
        let id = Self::identity(kind, object)?;
        if self.objects.contains_key(&id) {
            return Err(StoreError::AlreadyExists {
                kind: kind.kind.clone(),
                name: object.metadata.name.clone().unwrap_or_default(),
            });
        }
        let mut stored = object.clone();
        self.stamp(&mut stored);
        self.objects.insert(id, stored.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn update(&self, kind: &GroupVersionKind, object: &DynamicObject) -> Result<DynamicObject> {
        self.ensure_known(kind)?;
        let id = Self::identity(kind, object)?;
        let mut entry = self.objects.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            kind: kind.kind.clone(),
            name: object.metadata.name.clone().unwrap_or_default(),
        })?;
        Self::check_version(&id, entry.value(), object)?;
        let mut stored = object.clone();
        if self.status_subresource.contains(&kind_key(kind)) {
            set_status(&mut stored.data, entry.data.get("status").cloned());
        }
        self.stamp(&mut stored);
        *entry = stored.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn update_status(&self, kind: &GroupVersionKind, object: &DynamicObject) -> Result<DynamicObject> {
        self.ensure_known(kind)?;
        let id = Self::identity(kind, object)?;
        let mut entry = self.objects.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            kind: kind.kind.clone(),
            name: object.metadata.name.clone().unwrap_or_default(),
        })?;
        Self::check_version(&id, entry.value(), object)?;
        let mut stored = entry.value().clone();
        set_status(&mut stored.data, object.data.get("status").cloned());
        self.stamp(&mut stored);
        *entry = stored.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<()> {
        self.ensure_known(&key.kind)?;
        let id = object_key(&key.kind, key.namespace.as_deref(), &key.name);
        match self.objects.remove(&id) {
            Some(_) => {
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(StoreError::NotFound {
                kind: key.kind.kind.clone(),
                name: key.name.clone(),
            }),
        }
    }

    async fn is_namespaced(&self, kind: &GroupVersionKind) -> Result<bool> {
        self.ensure_known(kind)?;
        Ok(self.namespaced.contains(&kind_key(kind)))
    }
}

/// Minimal equality-based selector: `a=b`, `a==b`, `a!=b`, `a`
struct Selector {
    terms: Vec<(String, Op)>,
}

enum Op {
    Exists,
    Equals(String),
    NotEquals(String),
}

impl Selector {
    fn parse(raw: Option<&str>) -> Result<Self> {
        let mut terms = Vec::new();
        for term in raw.unwrap_or_default().split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let parsed = if let Some((k, v)) = term.split_once("!=") {
                (k.trim().to_string(), Op::NotEquals(v.trim().to_string()))
            } else if let Some((k, v)) = term.split_once("==") {
                (k.trim().to_string(), Op::Equals(v.trim().to_string()))
            } else if let Some((k, v)) = term.split_once('=') {
                (k.trim().to_string(), Op::Equals(v.trim().to_string()))
            } else {
                (term.to_string(), Op::Exists)
            };
            if parsed.0.is_empty() {
                return Err(StoreError::InvalidObject(format!("invalid selector term '{term}'")));
            }
            terms.push(parsed);
        }
        Ok(Self { terms })
    }

    fn matches(&self, lookup: impl Fn(&str) -> Option<String>) -> bool {
        self.terms.iter().all(|(key, op)| {
            let actual = lookup(key);
            match op {
                Op::Exists => actual.is_some(),
                Op::Equals(v) => actual.as_deref() == Some(v.as_str()),
                Op::NotEquals(v) => actual.as_deref() != Some(v.as_str()),
            }
        })
    }
}

fn lookup_path(value: &serde_json::Value, path: &str) -> Option<String> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    match current {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Cluster router over in-memory stores; `None` addresses the root view
#[derive(Default)]
pub struct InMemoryClusterRouter {
    root: Arc<InMemoryStore>,
    clusters: DashMap<String, Arc<InMemoryStore>>,
}

impl InMemoryClusterRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Arc<InMemoryStore> {
        self.root.clone()
    }

    /// Store of one logical cluster, created on first use
    pub fn cluster(&self, id: &str) -> Arc<InMemoryStore> {
        self.clusters
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(InMemoryStore::new()))
            .clone()
    }
}

impl ClusterRouter for InMemoryClusterRouter {
    fn store_for(&self, cluster: Option<&ClusterContext>) -> Result<Arc<dyn ResourceStore>> {
        let store: Arc<dyn ResourceStore> = match cluster {
            Some(ctx) => self.cluster(ctx.as_str()),
            None => self.root(),
        };
        Ok(store)
    }
}
