//! Configuration for the account operator
//!
//! Sources are layered with `figment`, later ones overriding earlier ones:
//!
//! 1. Built-in defaults ([`OperatorConfig::default`])
//! 2. An optional YAML file
//! 3. Environment variables prefixed with [`ENV_PREFIX`]
//!
//! # Example
//!
//! ```yaml
//! hierarchy:
//!   root_namespace: platform-mesh-system
//!   max_depth: 16
//! authorization:
//!   api_url: http://openfga.platform-mesh-system:8080
//!   parent_relation: parent
//!   owner_relation: owner
//! logging:
//!   format: pretty
//! ```
//!
//! ```rust,no_run
//! use config_engine::OperatorConfig;
//! use std::path::Path;
//!
//! let config = OperatorConfig::load(Some(Path::new("operator.yaml"))).expect("config");
//! println!("walking at most {} levels", config.hierarchy.max_depth);
//! ```

pub mod settings;
pub mod providers;
pub mod validation;
pub mod error;

pub use settings::*;
pub use providers::*;
pub use error::*;
