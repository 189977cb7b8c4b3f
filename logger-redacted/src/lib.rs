pub mod redactor;
pub mod macros;
pub mod config;

pub use redactor::*;
pub use config::*;

use lazy_static::lazy_static;
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Structured logging for the account operator
///
/// Installs a `tracing` subscriber with an `EnvFilter` (honouring `RUST_LOG`,
/// falling back to [`LoggerConfig::log_level`]) and either a JSON or a pretty
/// formatter. Text that may carry credentials, such as authorization-engine
/// error bodies, goes through [`redact`] before it is logged.
///
/// # Example
///
/// ```rust,no_run
/// use logger_redacted::{init_logging, LoggerConfig, LogFormat};
///
/// let config = LoggerConfig {
///     format: LogFormat::Pretty,
///     ..LoggerConfig::default()
/// };
/// init_logging(&config).expect("logging");
/// tracing::info!(account = "team-1", "reconciling");
/// ```
#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Logger initialization failed: {0}")]
    Init(String),
}

lazy_static! {
    static ref DEFAULT_REDACTOR: CredentialRedactor = CredentialRedactor::default();
}

/// Redact `text` with the default redaction rules
pub fn redact(text: &str) -> String {
    DEFAULT_REDACTOR.redact(text)
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| LoggerError::InvalidFilter {
            filter: config.log_level.clone(),
            reason: e.to_string(),
        })?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(config.with_target))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(config.with_target))
            .try_init(),
    };

    result.map_err(|e| LoggerError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_redact_masks_tokens() {
        let out = redact("POST /stores failed: token=abc123");
        assert_eq!(out, "POST /stores failed: token=[REDACTED]");
    }

    #[test]
    fn test_invalid_filter_is_reported() {
        // Only exercised when RUST_LOG is unset, as in CI.
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggerConfig {
            log_level: "account_operator=loud".to_string(),
            ..LoggerConfig::default()
        };
        let err = init_logging(&config).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidFilter { .. }));
    }
}
