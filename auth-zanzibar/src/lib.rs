//! Relationship-based authorization for the account operator
//!
//! This crate talks to a Zanzibar-style engine (OpenFGA wire format) and
//! builds the models it evaluates:
//! - Relationship tuples and batched writes
//! - Store discovery and creation
//! - An HTTP client plus an in-memory engine for tests
//! - A compiler that merges modular model sources into one model
//!
//! # Core Concepts
//!
//! - **Object**: A protected resource, e.g. `account:team-1`
//! - **User**: Who holds the relation, e.g. `user:bob` or `account:org-a`
//! - **Relation**: The relationship name, e.g. `owner` or `parent`
//! - **Tuple**: "user has relation to object"
//!
//! # Example
//!
//! ```rust
//! use auth_zanzibar::{compile_modules, ModuleFile};
//!
//! let core = ModuleFile::new(
//!     "core.fga",
//!     "module core\n\ntype user\n\ntype account\n  relations\n    define owner: [user]\n",
//! );
//! let model = compile_modules(&[core]).unwrap();
//! assert_eq!(model.type_definitions.len(), 2);
//! ```

pub mod models;
pub mod repository;
pub mod openfga;
pub mod schema;
pub mod compiler;
pub mod error;

pub use models::*;
pub use repository::*;
pub use openfga::OpenFgaClient;
pub use schema::*;
pub use compiler::{compile_modules, validate_model, ModuleFile};
pub use error::*;
