use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::ErrorContext;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Category of a reconcile failure.
///
/// Each category has default `retry`/`alert` flags; see [`ErrorKind::flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Ownership labels point at a tenant that does not exist, or a walk
    /// exceeded its depth bound.
    HierarchyInconsistency,
    /// An isolation unit is owned by a different tenant.
    OwnershipConflict,
    /// A template could not be parsed, executed or written.
    Template,
    /// Authorization model fragments failed to compile.
    ModelCompile,
    /// The authorization engine rejected or failed a request.
    AuthorizationEngine,
    /// The declarative store could not be reached or failed the request.
    Transport,
    /// Invalid operator configuration.
    Configuration,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Default `(retry, alert)` flags for the category.
    pub fn flags(self) -> (bool, bool) {
        match self {
            ErrorKind::OwnershipConflict | ErrorKind::Configuration => (false, true),
            ErrorKind::HierarchyInconsistency
            | ErrorKind::Template
            | ErrorKind::ModelCompile
            | ErrorKind::AuthorizationEngine
            | ErrorKind::Transport
            | ErrorKind::Internal => (true, true),
        }
    }

    /// Stable code used as condition reason and in structured logs.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::HierarchyInconsistency => "HierarchyInconsistency",
            ErrorKind::OwnershipConflict => "OwnershipConflict",
            ErrorKind::Template => "TemplateError",
            ErrorKind::ModelCompile => "ModelCompileError",
            ErrorKind::AuthorizationEngine => "AuthorizationEngineError",
            ErrorKind::Transport => "TransportError",
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned from `process`/`finalize`.
///
/// `retry` and `alert` are independent: an ownership conflict is alerted but
/// never retried, while a transport failure is both.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct OperatorError {
    kind: ErrorKind,
    message: String,
    retry: bool,
    alert: bool,
    context: Option<ErrorContext>,
    #[source]
    source: Option<BoxError>,
}

impl OperatorError {
    /// Create an error with the default flags of `kind`.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let (retry, alert) = kind.flags();
        Self {
            kind,
            message: message.into(),
            retry,
            alert,
            context: None,
            source: None,
        }
    }

    /// Wrap an underlying error, keeping it as the `source()`.
    pub fn from_source<E>(kind: ErrorKind, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut err = Self::new(kind, source.to_string());
        err.source = Some(Box::new(source));
        err
    }

    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_alert(mut self, alert: bool) -> Self {
        self.alert = alert;
        self
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn retry(&self) -> bool {
        self.retry
    }

    pub fn alert(&self) -> bool {
        self.alert
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        self.context.as_ref()
    }
}

impl From<anyhow::Error> for OperatorError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(ErrorKind::Internal, format!("{err:#}"))
    }
}

/// Successful result of a subroutine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    requeue: bool,
    requeue_after: Option<Duration>,
}

impl Outcome {
    /// Nothing left to do until the object changes.
    pub fn done() -> Self {
        Self::default()
    }

    /// Expected transient state (a target not created yet, a dependency not
    /// ready); call again without raising an error.
    pub fn requeue() -> Self {
        Self {
            requeue: true,
            requeue_after: None,
        }
    }

    pub fn requeue_after(after: Duration) -> Self {
        Self {
            requeue: true,
            requeue_after: Some(after),
        }
    }

    pub fn is_requeue(&self) -> bool {
        self.requeue
    }

    pub fn requeue_delay(&self) -> Option<Duration> {
        self.requeue_after
    }
}

/// Result type alias for subroutine calls
pub type Result<T> = std::result::Result<T, OperatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags_follow_taxonomy() {
        let conflict = OperatorError::new(ErrorKind::OwnershipConflict, "owned by b");
        assert!(!conflict.retry());
        assert!(conflict.alert());

        let transport = OperatorError::new(ErrorKind::Transport, "connection reset");
        assert!(transport.retry());
        assert!(transport.alert());
    }

    #[test]
    fn test_flags_can_be_overridden() {
        let err = OperatorError::new(ErrorKind::Template, "bad")
            .with_alert(false)
            .with_retry(false);
        assert!(!err.alert());
        assert!(!err.retry());
    }

    #[test]
    fn test_display_includes_code() {
        let err = OperatorError::new(ErrorKind::ModelCompile, "duplicate type 'account'");
        assert_eq!(err.to_string(), "ModelCompileError: duplicate type 'account'");
    }

    #[test]
    fn test_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = OperatorError::from_source(ErrorKind::Transport, io);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_outcome_constructors() {
        assert!(!Outcome::done().is_requeue());
        assert!(Outcome::requeue().is_requeue());
        let later = Outcome::requeue_after(Duration::from_secs(30));
        assert_eq!(later.requeue_delay(), Some(Duration::from_secs(30)));
    }
}
