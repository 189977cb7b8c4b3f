use async_trait::async_trait;
use kube::core::{DynamicObject, GroupVersionKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::models::{ListOptions, ObjectKey, OperationResult};

/// Synchronous-per-call access to a declarative resource store.
///
/// Objects are untyped so callers can address kinds chosen at runtime.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch one object; a missing object is [`StoreError::NotFound`]
    async fn get(&self, key: &ObjectKey) -> Result<DynamicObject>;

    async fn list(&self, kind: &GroupVersionKind, options: &ListOptions) -> Result<Vec<DynamicObject>>;

    async fn create(&self, kind: &GroupVersionKind, object: &DynamicObject) -> Result<DynamicObject>;

    /// Replace an existing object. Kinds with a status subresource keep
    /// their stored status.
    async fn update(&self, kind: &GroupVersionKind, object: &DynamicObject) -> Result<DynamicObject>;

    /// Write only the `status` of an existing object
    async fn update_status(&self, kind: &GroupVersionKind, object: &DynamicObject) -> Result<DynamicObject>;

    /// Delete one object; a missing object is [`StoreError::NotFound`]
    async fn delete(&self, key: &ObjectKey) -> Result<()>;

    async fn is_namespaced(&self, kind: &GroupVersionKind) -> Result<bool>;
}

/// Fetch `key`, mapping a missing object to `None`
pub async fn get_opt(store: &dyn ResourceStore, key: &ObjectKey) -> Result<Option<DynamicObject>> {
    match store.get(key).await {
        Ok(object) => Ok(Some(object)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Create the object at `key` or update the existing one, applying `mutate`
/// in both cases. When the mutation leaves an existing object unchanged no
/// write is issued.
pub async fn create_or_update<F, E>(store: &dyn ResourceStore, key: &ObjectKey, mutate: F) -> std::result::Result<OperationResult, E>
where
    F: FnOnce(&mut DynamicObject) -> std::result::Result<(), E>,
    E: From<StoreError>,
{
    match store.get(key).await {
        Ok(existing) => {
            let mut desired = existing.clone();
            mutate(&mut desired)?;
            pin_identity(&mut desired, key);

            let before = serde_json::to_value(&existing).map_err(StoreError::from)?;
            let after = serde_json::to_value(&desired).map_err(StoreError::from)?;
            if before == after {
                debug!(object = %key, "Object unchanged");
                return Ok(OperationResult::Unchanged);
            }
            store.update(&key.kind, &desired).await?;
            debug!(object = %key, "Object updated");
            Ok(OperationResult::Updated)
        }
        Err(e) if e.is_not_found() => {
            let mut desired = key.new_object();
            mutate(&mut desired)?;
            pin_identity(&mut desired, key);
            store.create(&key.kind, &desired).await?;
            debug!(object = %key, "Object created");
            Ok(OperationResult::Created)
        }
        Err(e) => Err(e.into()),
    }
}

// The mutation may not move the object.
fn pin_identity(object: &mut DynamicObject, key: &ObjectKey) {
    object.metadata.name = Some(key.name.clone());
    object.metadata.namespace = key.namespace.clone();
    let fresh = key.new_object();
    object.types = fresh.types;
}

/// Decode an untyped object into a typed resource
pub fn from_dynamic<K: DeserializeOwned>(object: &DynamicObject) -> Result<K> {
    let value = serde_json::to_value(object)?;
    Ok(serde_json::from_value(value)?)
}

/// Encode a typed resource as an untyped object
pub fn to_dynamic<K: Serialize>(resource: &K) -> Result<DynamicObject> {
    let value = serde_json::to_value(resource)?;
    Ok(serde_json::from_value(value)?)
}

/// Fetch and decode a typed resource
pub async fn get_typed<K: DeserializeOwned>(store: &dyn ResourceStore, key: &ObjectKey) -> Result<K> {
    let object = store.get(key).await?;
    from_dynamic(&object)
}

/// List and decode typed resources
pub async fn list_typed<K: DeserializeOwned>(
    store: &dyn ResourceStore,
    kind: &GroupVersionKind,
    options: &ListOptions,
) -> Result<Vec<K>> {
    store
        .list(kind, options)
        .await?
        .iter()
        .map(from_dynamic)
        .collect()
}
