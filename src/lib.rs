//! Nested-set (interval) hierarchy index.
//!
//! Every node of a hierarchy carries a `[left, right]` interval; containment
//! of intervals mirrors ancestry, so subtree and ancestor queries are single
//! range scans. The [`application::HierarchyEngine`] keeps the intervals
//! consistent across insert, move and delete; the folder and taxonomy
//! services are its two consumers.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::{
    ApplicationError, ApplicationResult, Hierarchy, HierarchyEngine, HierarchyHooks, NoHooks,
    NodeQuery, Page,
};
pub use config::{EngineSettings, Settings};
pub use domain::{Filter, Forest, ForestNode, Node, NodeId, Payload};
pub use infrastructure::{FileStore, MemoryStore, NodeStore};
