//! Hierarchical account operator
//!
//! Accounts form a tree: each account lives in the isolation unit (namespace
//! or logical cluster) owned by its parent. The components here are the
//! reconcile steps an external scheduler drives for every `Account` and
//! `Store` object:
//!
//! - [`ExtensionReconciler`]: materializes inherited Extension templates
//! - [`ExtensionReadinessGate`]: waits for those objects to report ready
//! - [`RelationshipSynchronizer`]: mirrors the tree into the authorization engine
//! - [`ModelCompiler`]: merges model fragments into one published model
//!
//! They share a [`HierarchyResolver`] for walking the tree, and
//! [`AccountLocationResolver`] reports where an account's workspace lives in
//! multi-cluster mode.
//!
//! # Example
//!
//! ```rust
//! use account_operator::{IsolationUnit, TemplateRenderer};
//! use serde_json::json;
//!
//! let renderer = TemplateRenderer::new();
//! let context = json!({ "Account": { "spec": { "creator": "alice" } } });
//! let owner = renderer
//!     .render_str("{{ .Account.spec.creator | upper }}", &context, "spec.owner")
//!     .unwrap();
//! assert_eq!(owner, "ALICE");
//! assert_eq!(IsolationUnit::Namespace("org-a".into()).to_string(), "namespace org-a");
//! ```

pub mod api;
pub mod error;
pub mod hierarchy;
pub mod extensions;
pub mod relationships;
pub mod model;
pub mod location;
pub mod subroutine;

pub use api::*;
pub use error::{Error, Result};
pub use hierarchy::{HierarchyError, HierarchyResolver, IsolationUnit, ParentAccount, ParentLookup};
pub use extensions::{
    ExtensionCollector, ExtensionReadinessGate, ExtensionReconciler, TemplateError, TemplateRenderer,
};
pub use relationships::RelationshipSynchronizer;
pub use model::ModelCompiler;
pub use location::{AccountLocation, AccountLocationResolver, LocationLookup};
pub use subroutine::*;
