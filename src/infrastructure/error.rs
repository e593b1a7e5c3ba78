//! Store-level errors

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::NodeId;

/// Failures raised by a node store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode store {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("cannot encode store: {0}")]
    Encode(String),

    #[error("duplicate node id: {0}")]
    Duplicate(NodeId),

    #[error("bound overflow while updating node {0}")]
    Overflow(NodeId),

    #[error("transaction error: {0}")]
    Transaction(String),

    /// Temporary failure; the whole logical operation may be retried.
    #[error("transient store failure: {0}")]
    Transient(String),
}

impl StoreError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
