//! Declarative resource store access for the account operator
//!
//! Operators address kinds chosen at runtime (extension targets, workspaces,
//! namespaces), so everything here works on untyped `DynamicObject`s:
//!
//! - [`ResourceStore`]: get/list/create/update/delete/is-namespaced
//! - [`create_or_update`]: idempotent convergence that skips no-op writes
//! - [`ClusterRouter`]: selects the store view for a cluster context
//! - [`KubeStore`] / [`KubeClusterRouter`]: API-server backed implementation
//! - [`InMemoryStore`] / [`InMemoryClusterRouter`]: for tests and offline tools
//!
//! # Example
//!
//! ```rust
//! use resource_store::{create_or_update, gvk_from_api_version, InMemoryStore, ObjectKey, OperationResult, StoreError};
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//! let kind = gvk_from_api_version("v1", "ConfigMap");
//! store.register_kind(&kind, true);
//!
//! let key = ObjectKey::new(kind, Some("team-1"), "settings");
//! let result = create_or_update(&store, &key, |obj| {
//!     obj.data["data"] = serde_json::json!({ "tier": "gold" });
//!     Ok::<_, StoreError>(())
//! })
//! .await
//! .unwrap();
//! assert_eq!(result, OperationResult::Created);
//! # });
//! ```

pub mod error;
pub mod models;
pub mod store;
pub mod router;
pub mod memory;
pub mod kubernetes;

pub use error::*;
pub use models::*;
pub use store::*;
pub use router::*;
pub use memory::{InMemoryClusterRouter, InMemoryStore};
pub use kubernetes::{KubeClusterRouter, KubeStore};

pub use kube::core::{DynamicObject, GroupVersionKind};
