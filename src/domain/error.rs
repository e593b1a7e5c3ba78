//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::NodeId;

/// Domain errors represent business logic violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("invalid operation: {0}")]
    InvalidOperation(#[from] InvalidOperation),

    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("hierarchy corrupted: {0}")]
    Consistency(String),
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency(message.into())
    }
}

/// Caller errors on structural operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidOperation {
    #[error("the sentinel root cannot be {0}")]
    RootImmutable(&'static str),

    #[error("node {0} cannot become its own parent")]
    SelfParent(NodeId),

    #[error("node {id} is already a child of {parent}")]
    SameParent { id: NodeId, parent: NodeId },

    #[error("node {id} cannot move into its own subtree (target {target})")]
    IntoOwnSubtree { id: NodeId, target: NodeId },

    #[error("{0}")]
    Incompatible(String),
}
