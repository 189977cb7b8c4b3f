use crate::{error::ZanzibarError, models::*, schema::AuthorizationModel};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Client interface for a relationship-based authorization engine
#[async_trait]
pub trait AuthorizationEngineClient: Send + Sync {
    /// All stores known to the engine
    async fn list_stores(&self) -> Result<Vec<StoreInfo>, ZanzibarError>;

    async fn create_store(&self, name: &str) -> Result<StoreInfo, ZanzibarError>;

    /// Write a model to a store, returning the new model id
    async fn write_authorization_model(
        &self,
        store_id: &str,
        model: &AuthorizationModel,
    ) -> Result<String, ZanzibarError>;

    /// Apply writes and deletes atomically.
    ///
    /// Writing an existing tuple or deleting a missing one fails with
    /// [`ZanzibarError::Duplicate`].
    async fn write(&self, store_id: &str, request: WriteRequest) -> Result<(), ZanzibarError>;
}

/// Find a store by name
pub async fn find_store(
    client: &dyn AuthorizationEngineClient,
    name: &str,
) -> Result<Option<StoreInfo>, ZanzibarError> {
    Ok(client.list_stores().await?.into_iter().find(|s| s.name == name))
}

/// In-memory engine for testing and development
pub struct InMemoryAuthorizationEngine {
    stores: Arc<DashMap<String, String>>,
    tuples: Arc<DashMap<String, DashSet<TupleKey>>>,
    models: Arc<DashMap<String, Vec<(String, AuthorizationModel)>>>,
    write_calls: AtomicUsize,
    next_id: AtomicUsize,
    failure: Mutex<Option<String>>,
}

impl InMemoryAuthorizationEngine {
    pub fn new() -> Self {
        Self {
            stores: Arc::new(DashMap::new()),
            tuples: Arc::new(DashMap::new()),
            models: Arc::new(DashMap::new()),
            write_calls: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
            failure: Mutex::new(None),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{:04}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn ensure_store(&self, store_id: &str) -> Result<(), ZanzibarError> {
        if self.stores.contains_key(store_id) {
            Ok(())
        } else {
            Err(ZanzibarError::StoreNotFound(store_id.to_string()))
        }
    }

    /// Tuples currently held by a store, sorted
    pub fn tuples(&self, store_id: &str) -> Vec<TupleKey> {
        let mut tuples: Vec<TupleKey> = self
            .tuples
            .get(store_id)
            .map(|set| set.iter().map(|t| t.clone()).collect())
            .unwrap_or_default();
        tuples.sort();
        tuples
    }

    pub fn contains(&self, store_id: &str, tuple: &TupleKey) -> bool {
        self.tuples.get(store_id).map(|set| set.contains(tuple)).unwrap_or(false)
    }

    /// Models written to a store, oldest first
    pub fn models(&self, store_id: &str) -> Vec<(String, AuthorizationModel)> {
        self.models.get(store_id).map(|m| m.clone()).unwrap_or_default()
    }

    /// Number of `write` calls received, including failed ones
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent `write` fail with an engine error until cleared
    pub fn fail_writes(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_string);
    }
}

impl Default for InMemoryAuthorizationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthorizationEngineClient for InMemoryAuthorizationEngine {
    async fn list_stores(&self) -> Result<Vec<StoreInfo>, ZanzibarError> {
        let mut stores: Vec<StoreInfo> = self
            .stores
            .iter()
            .map(|entry| StoreInfo {
                id: entry.key().clone(),
                name: entry.value().clone(),
            })
            .collect();
        stores.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stores)
    }

    async fn create_store(&self, name: &str) -> Result<StoreInfo, ZanzibarError> {
        let id = self.next_id("store");
        self.stores.insert(id.clone(), name.to_string());
        self.tuples.insert(id.clone(), DashSet::new());
        Ok(StoreInfo {
            id,
            name: name.to_string(),
        })
    }

    async fn write_authorization_model(
        &self,
        store_id: &str,
        model: &AuthorizationModel,
    ) -> Result<String, ZanzibarError> {
        self.ensure_store(store_id)?;
        let id = self.next_id("model");
        self.models
            .entry(store_id.to_string())
            .or_default()
            .push((id.clone(), model.clone()));
        Ok(id)
    }

    async fn write(&self, store_id: &str, request: WriteRequest) -> Result<(), ZanzibarError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failure.lock().clone() {
            return Err(ZanzibarError::Engine {
                status: 500,
                code: "internal_error".to_string(),
                message,
            });
        }
        self.ensure_store(store_id)?;
        if request.is_empty() {
            return Err(ZanzibarError::InvalidTuple("write request is empty".to_string()));
        }

        let set = self.tuples.entry(store_id.to_string()).or_default();
        // Validate the whole batch before applying so a rejected request changes nothing
        if let Some(existing) = request.writes.iter().find(|t| set.contains(*t)) {
            return Err(ZanzibarError::Duplicate(format!("tuple {existing} already exists")));
        }
        if let Some(missing) = request.deletes.iter().find(|t| !set.contains(*t)) {
            return Err(ZanzibarError::Duplicate(format!("tuple {missing} does not exist")));
        }
        for tuple in request.writes {
            set.insert(tuple);
        }
        for tuple in &request.deletes {
            set.remove(tuple);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_write_is_rejected() {
        let engine = InMemoryAuthorizationEngine::new();
        let store = engine.create_store("org-a").await.unwrap();
        let tuple = TupleKey::new("account:team-1", "parent", "account:org-a");

        engine.write(&store.id, WriteRequest::write(tuple.clone())).await.unwrap();
        let err = engine.write(&store.id, WriteRequest::write(tuple.clone())).await.unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(engine.tuples(&store.id), vec![tuple]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_rejected() {
        let engine = InMemoryAuthorizationEngine::new();
        let store = engine.create_store("org-a").await.unwrap();
        let tuple = TupleKey::new("account:team-1", "owner", "user:bob");

        let err = engine.write(&store.id, WriteRequest::delete(tuple)).await.unwrap_err();
        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn test_rejected_batch_changes_nothing() {
        let engine = InMemoryAuthorizationEngine::new();
        let store = engine.create_store("org-a").await.unwrap();
        let existing = TupleKey::new("account:a", "owner", "user:bob");
        engine.write(&store.id, WriteRequest::write(existing.clone())).await.unwrap();

        let request = WriteRequest {
            writes: vec![TupleKey::new("account:b", "owner", "user:bob"), existing.clone()],
            deletes: Vec::new(),
        };
        assert!(engine.write(&store.id, request).await.is_err());
        assert_eq!(engine.tuples(&store.id), vec![existing]);
    }

    #[tokio::test]
    async fn test_unknown_store() {
        let engine = InMemoryAuthorizationEngine::new();
        let tuple = TupleKey::new("account:a", "owner", "user:bob");
        let err = engine.write("missing", WriteRequest::write(tuple)).await.unwrap_err();
        assert!(matches!(err, ZanzibarError::StoreNotFound(_)));
    }

    #[tokio::test]
    async fn test_find_store_by_name() {
        let engine = InMemoryAuthorizationEngine::new();
        engine.create_store("org-a").await.unwrap();
        let b = engine.create_store("org-b").await.unwrap();

        let found = find_store(&engine, "org-b").await.unwrap();
        assert_eq!(found, Some(b));
        assert_eq!(find_store(&engine, "org-c").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let engine = InMemoryAuthorizationEngine::new();
        let store = engine.create_store("org-a").await.unwrap();
        engine.fail_writes(Some("unavailable"));

        let tuple = TupleKey::new("account:a", "owner", "user:bob");
        let err = engine.write(&store.id, WriteRequest::write(tuple)).await.unwrap_err();
        assert!(matches!(err, ZanzibarError::Engine { status: 500, .. }));
        assert_eq!(engine.write_calls(), 1);
    }
}
