//! Application layer: hierarchy engine, consumer façade and services
//!
//! This layer orchestrates domain logic and depends on the node store trait.

pub mod bootstrap;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod services;

pub use engine::{HierarchyEngine, NodeQuery, Page};
pub use error::{ApplicationError, ApplicationResult};
pub use hierarchy::{Hierarchy, HierarchyHooks, NoHooks};
