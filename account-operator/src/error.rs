use auth_zanzibar::ZanzibarError;
use error_common::{ErrorKind, OperatorError};
use resource_store::StoreError;
use thiserror::Error;

use crate::extensions::template::TemplateError;
use crate::hierarchy::HierarchyError;

/// Failure inside one subroutine call
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] ZanzibarError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Hierarchy(e) if e.is_ownership_conflict() => ErrorKind::OwnershipConflict,
            Error::Hierarchy(HierarchyError::Store(_)) | Error::Store(_) => ErrorKind::Transport,
            Error::Hierarchy(_) => ErrorKind::HierarchyInconsistency,
            Error::Template(_) => ErrorKind::Template,
            Error::Engine(e) if e.is_schema_error() => ErrorKind::ModelCompile,
            Error::Engine(_) => ErrorKind::AuthorizationEngine,
        }
    }
}

impl From<Error> for OperatorError {
    fn from(err: Error) -> Self {
        let kind = err.kind();
        OperatorError::from_source(kind, err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
