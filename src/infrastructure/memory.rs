//! In-process node store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::trace;

use crate::domain::{Filter, Node, NodeId, Payload, Update};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::traits::NodeStore;

/// Deterministic write-failure schedule for exercising rollback and retry.
///
/// Writes number `skip .. skip + times` (0-based, counted across the
/// injector's lifetime) fail; all others succeed.
#[derive(Debug)]
pub struct FaultInjector {
    skip: usize,
    times: usize,
    transient: bool,
    writes: AtomicUsize,
}

impl FaultInjector {
    /// Fail `times` writes with a retryable error after `skip` successful ones.
    pub fn transient(skip: usize, times: usize) -> Arc<Self> {
        Arc::new(Self {
            skip,
            times,
            transient: true,
            writes: AtomicUsize::new(0),
        })
    }

    /// Fail `times` writes with a non-retryable I/O error after `skip` successful ones.
    pub fn permanent(skip: usize, times: usize) -> Arc<Self> {
        Arc::new(Self {
            skip,
            times,
            transient: false,
            writes: AtomicUsize::new(0),
        })
    }

    /// Writes attempted so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn on_write(&self) -> StoreResult<()> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst);
        if n < self.skip || n >= self.skip + self.times {
            return Ok(());
        }
        if self.transient {
            Err(StoreError::Transient(format!("injected failure on write {n}")))
        } else {
            Err(StoreError::io(
                format!("injected failure on write {n}"),
                std::io::Error::other("injected"),
            ))
        }
    }
}

/// Node store backed by a hash map, with snapshot-based transactions.
#[derive(Debug)]
pub struct MemoryStore<P> {
    nodes: HashMap<NodeId, Node<P>>,
    snapshot: Option<HashMap<NodeId, Node<P>>>,
    faults: Option<Arc<FaultInjector>>,
}

impl<P> Default for MemoryStore<P> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            snapshot: None,
            faults: None,
        }
    }
}

impl<P: Payload> MemoryStore<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with existing records, taken as-is without validation.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node<P>>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
            ..Self::default()
        }
    }

    pub fn with_faults(mut self, faults: Arc<FaultInjector>) -> Self {
        self.faults = Some(faults);
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All records ordered by `left`, consuming the store.
    pub fn into_nodes(self) -> Vec<Node<P>> {
        let mut nodes: Vec<_> = self.nodes.into_values().collect();
        nodes.sort_by_key(|n| n.left);
        nodes
    }

    fn check_fault(&self) -> StoreResult<()> {
        match &self.faults {
            Some(faults) => faults.on_write(),
            None => Ok(()),
        }
    }
}

impl<P: Payload> NodeStore<P> for MemoryStore<P> {
    fn find_by_id(&self, id: NodeId) -> StoreResult<Option<Node<P>>> {
        Ok(self.nodes.get(&id).cloned())
    }

    fn find_where(&self, filter: &Filter) -> StoreResult<Vec<Node<P>>> {
        let mut found: Vec<Node<P>> = self
            .nodes
            .values()
            .filter(|n| filter.matches(*n))
            .cloned()
            .collect();
        found.sort_by_key(|n| n.left);
        Ok(found)
    }

    fn count_where(&self, filter: &Filter) -> StoreResult<usize> {
        Ok(self.nodes.values().filter(|n| filter.matches(*n)).count())
    }

    fn insert_one(&mut self, node: Node<P>) -> StoreResult<Node<P>> {
        self.check_fault()?;
        if self.nodes.contains_key(&node.id) {
            return Err(StoreError::Duplicate(node.id));
        }
        self.nodes.insert(node.id, node.clone());
        Ok(node)
    }

    fn update_many(&mut self, filter: &Filter, update: &Update) -> StoreResult<usize> {
        self.check_fault()?;
        // Stage every change first so a failing node leaves the store untouched.
        let mut staged = Vec::new();
        for node in self.nodes.values().filter(|n| filter.matches(*n)) {
            let mut changed = node.clone();
            update
                .apply(&mut changed)
                .ok_or(StoreError::Overflow(node.id))?;
            if matches!(update, Update::SetParent(_)) {
                changed.updated_at = Utc::now();
            }
            staged.push(changed);
        }
        let count = staged.len();
        for node in staged {
            self.nodes.insert(node.id, node);
        }
        trace!(?filter, ?update, count, "update_many");
        Ok(count)
    }

    fn update_payload(&mut self, id: NodeId, payload: P) -> StoreResult<bool> {
        self.check_fault()?;
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.payload = payload;
                node.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_many(&mut self, filter: &Filter) -> StoreResult<usize> {
        self.check_fault()?;
        let before = self.nodes.len();
        self.nodes.retain(|_, n| !filter.matches(n));
        Ok(before - self.nodes.len())
    }

    fn begin(&mut self) -> StoreResult<()> {
        if self.snapshot.is_some() {
            return Err(StoreError::Transaction(
                "transaction already in progress".into(),
            ));
        }
        self.snapshot = Some(self.nodes.clone());
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| StoreError::Transaction("commit without begin".into()))
    }

    fn rollback(&mut self) -> StoreResult<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| StoreError::Transaction("rollback without begin".into()))?;
        self.nodes = snapshot;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }
}
