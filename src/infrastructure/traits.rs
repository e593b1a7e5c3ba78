//! Node store boundary
//!
//! The hierarchy engine only talks to persistence through this trait, so
//! engines can be tested against an in-memory store and run against a
//! durable one.

use crate::domain::{Filter, Node, NodeId, Payload, Update};
use crate::infrastructure::error::StoreResult;

/// Durable record storage for the nodes of one hierarchy instance.
///
/// Reads take `&self`, writes `&mut self`; callers serialize writers.
/// Outside a transaction every write is individually atomic. Between
/// [`begin`](NodeStore::begin) and [`commit`](NodeStore::commit) writes are
/// staged and [`rollback`](NodeStore::rollback) restores the state seen at
/// `begin`.
pub trait NodeStore<P: Payload>: Send + Sync {
    /// Point lookup.
    fn find_by_id(&self, id: NodeId) -> StoreResult<Option<Node<P>>>;

    /// All nodes matching `filter`, ordered by ascending `left`.
    fn find_where(&self, filter: &Filter) -> StoreResult<Vec<Node<P>>>;

    fn count_where(&self, filter: &Filter) -> StoreResult<usize>;

    /// Insert a new node. Fails on a duplicate id.
    fn insert_one(&mut self, node: Node<P>) -> StoreResult<Node<P>>;

    /// Apply `update` to every matching node, all or nothing. Returns the
    /// number of nodes modified.
    fn update_many(&mut self, filter: &Filter, update: &Update) -> StoreResult<usize>;

    /// Replace the payload of one node. Returns `false` if it does not exist.
    fn update_payload(&mut self, id: NodeId, payload: P) -> StoreResult<bool>;

    /// Delete every matching node. Returns the number deleted.
    fn delete_many(&mut self, filter: &Filter) -> StoreResult<usize>;

    fn begin(&mut self) -> StoreResult<()>;

    fn commit(&mut self) -> StoreResult<()>;

    fn rollback(&mut self) -> StoreResult<()>;

    fn in_transaction(&self) -> bool;
}
