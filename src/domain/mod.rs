//! Domain layer: nodes, predicates and pure hierarchy algorithms
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod error;
pub mod filter;
pub mod forest;
pub mod invariants;
pub mod node;
pub mod text;

pub use error::{DomainError, InvalidOperation};
pub use filter::{Bound, CmpOp, Filter, Update};
pub use forest::{build as build_forest, Forest, ForestNode, ParentLinked, TreeDisplay};
pub use invariants::ConsistencyReport;
pub use node::{Node, NodeId, Payload};

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
