//! Application-level errors (wraps domain and store errors)

use thiserror::Error;

use crate::domain::{DomainError, InvalidOperation, NodeId};
use crate::infrastructure::StoreError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    pub fn not_found(id: NodeId) -> Self {
        DomainError::NotFound(id).into()
    }

    pub fn invalid(op: InvalidOperation) -> Self {
        DomainError::InvalidOperation(op).into()
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        DomainError::validation(field, message).into()
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        DomainError::consistency(message).into()
    }

    /// Only transient store failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApplicationError::Store(e) if e.is_transient())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApplicationError::Domain(DomainError::NotFound(_)))
    }
}

impl From<InvalidOperation> for ApplicationError {
    fn from(op: InvalidOperation) -> Self {
        Self::invalid(op)
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
