//! Common error handling utilities for the account operator
//!
//! Every subroutine (hierarchy walks, extension reconciliation, relationship
//! synchronization, model compilation) reports its result to the external
//! scheduler in the same shape: an [`Outcome`] telling whether to requeue, or
//! an [`OperatorError`] carrying two independent flags.
//!
//! - **retry**: the scheduler should call again later
//! - **alert**: the failure needs operator attention and is forwarded to an
//!   [`ErrorSink`]
//!
//! # Error Categories
//!
//! - **HierarchyInconsistency**: ownership labels point at a missing tenant
//! - **OwnershipConflict**: an isolation unit is claimed by another tenant
//! - **Template**: malformed or unevaluable extension templates
//! - **ModelCompile**: authorization model fragments that do not compile
//! - **AuthorizationEngine**: failures returned by the authorization engine
//! - **Transport**: declarative store failures
//!
//! # Example
//!
//! ```rust
//! use error_common::{ErrorKind, OperatorError, Outcome};
//!
//! fn check(ready: bool) -> Result<Outcome, OperatorError> {
//!     if !ready {
//!         return Ok(Outcome::requeue());
//!     }
//!     Err(OperatorError::new(ErrorKind::Template, "unterminated action"))
//! }
//!
//! let err = check(true).unwrap_err();
//! assert!(err.retry() && err.alert());
//! ```

pub mod types;
pub mod context;
pub mod reporting;

pub use types::*;
pub use context::*;
pub use reporting::*;
