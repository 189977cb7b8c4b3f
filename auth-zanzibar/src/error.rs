use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZanzibarError {
    /// The engine refused a write because the tuple already exists (or, for
    /// deletes, does not exist). Callers converging on a desired state treat
    /// this as success.
    #[error("Duplicate or invalid tuple write: {0}")]
    Duplicate(String),

    #[error("Invalid tuple: {0}")]
    InvalidTuple(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Schema validation failed: {0}")]
    SchemaValidationFailed(String),

    #[error("Store not found: {0}")]
    StoreNotFound(String),

    #[error("Authorization engine returned {status} ({code}): {message}")]
    Engine { status: u16, code: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ZanzibarError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ZanzibarError::Duplicate(_))
    }

    /// Errors produced while compiling model sources
    pub fn is_schema_error(&self) -> bool {
        matches!(self, ZanzibarError::InvalidSchema(_) | ZanzibarError::SchemaValidationFailed(_))
    }
}

impl From<reqwest::Error> for ZanzibarError {
    fn from(err: reqwest::Error) -> Self {
        ZanzibarError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ZanzibarError>;
