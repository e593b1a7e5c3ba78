//! Consumer façade over the engine: one hierarchy instance plus its hooks.

use tracing::debug;

use crate::application::engine::{HierarchyEngine, NodeQuery, Page};
use crate::application::ApplicationResult;
use crate::config::EngineSettings;
use crate::domain::{build_forest, ConsistencyReport, Forest, Node, NodeId, Payload};
use crate::infrastructure::NodeStore;

/// Per-payload validation and cascade points.
///
/// Every hook runs inside the engine's critical section, so checks against
/// the store (e.g. key uniqueness) cannot race with other writers. An error
/// from any hook aborts and rolls back the operation.
pub trait HierarchyHooks<P: Payload>: Send + Sync {
    /// Validate and complete a payload before it is inserted under `parent`.
    fn prepare_create(
        &self,
        _store: &dyn NodeStore<P>,
        _parent: &Node<P>,
        payload: P,
    ) -> ApplicationResult<P> {
        Ok(payload)
    }

    /// Validate and complete a payload replacing the one of `current`.
    fn prepare_update(
        &self,
        _store: &dyn NodeStore<P>,
        _current: &Node<P>,
        payload: P,
    ) -> ApplicationResult<P> {
        Ok(payload)
    }

    /// Compatibility check before `node` is moved under `new_parent`.
    fn validate_move(&self, _node: &Node<P>, _new_parent: &Node<P>) -> ApplicationResult<()> {
        Ok(())
    }

    /// Cascade removal of records referring to removed nodes.
    fn after_remove(&self, _removed: &[Node<P>]) -> ApplicationResult<()> {
        Ok(())
    }
}

/// Hooks that accept everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<P: Payload> HierarchyHooks<P> for NoHooks {}

/// One hierarchy instance as seen by its consumer.
#[derive(Debug)]
pub struct Hierarchy<P, S, H> {
    engine: HierarchyEngine<P, S>,
    hooks: H,
}

impl<P, S, H> Hierarchy<P, S, H>
where
    P: Payload,
    S: NodeStore<P>,
    H: HierarchyHooks<P>,
{
    pub fn open(
        name: impl Into<String>,
        store: S,
        settings: EngineSettings,
        hooks: H,
    ) -> ApplicationResult<Self> {
        Ok(Self {
            engine: HierarchyEngine::open(name, store, settings)?,
            hooks,
        })
    }

    pub fn engine(&self) -> &HierarchyEngine<P, S> {
        &self.engine
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn create_under_parent(&self, parent: Option<NodeId>, payload: P) -> ApplicationResult<Node<P>> {
        self.engine.insert_child_with(parent, |store, parent| {
            self.hooks.prepare_create(store, parent, payload.clone())
        })
    }

    /// Always `true` on success; every refusal is an error.
    pub fn relocate(&self, id: NodeId, new_parent: Option<NodeId>) -> ApplicationResult<bool> {
        self.engine
            .move_subtree_with(id, new_parent, |node, target| {
                self.hooks.validate_move(node, target)
            })?;
        Ok(true)
    }

    pub fn remove(&self, id: NodeId) -> ApplicationResult<usize> {
        self.engine
            .delete_subtree_with(id, |removed| self.hooks.after_remove(removed))
    }

    pub fn update(&self, id: NodeId, payload: P) -> ApplicationResult<Node<P>> {
        self.engine.update_payload_with(id, |store, current| {
            self.hooks.prepare_update(store, current, payload.clone())
        })
    }

    /// Update with a payload derived from the current record.
    pub fn update_with<F>(&self, id: NodeId, mut derive: F) -> ApplicationResult<Node<P>>
    where
        F: FnMut(&Node<P>) -> ApplicationResult<P>,
    {
        self.engine.update_payload_with(id, |store, current| {
            let payload = derive(current)?;
            self.hooks.prepare_update(store, current, payload)
        })
    }

    pub fn get(&self, id: NodeId) -> ApplicationResult<Node<P>> {
        self.engine.get(id)
    }

    pub fn children(&self, id: Option<NodeId>) -> ApplicationResult<Vec<Node<P>>> {
        self.engine.list_children(id)
    }

    pub fn descendants(&self, id: Option<NodeId>) -> ApplicationResult<Vec<Node<P>>> {
        self.engine.list_descendants(id)
    }

    /// Ancestors of `id`, root first.
    pub fn ancestor_path(&self, id: NodeId) -> ApplicationResult<Vec<Node<P>>> {
        self.engine.list_ancestors(id)
    }

    pub fn path_to_node(&self, id: NodeId) -> ApplicationResult<Vec<Node<P>>> {
        self.engine.path_to_node(id)
    }

    pub fn query(&self, query: &NodeQuery) -> ApplicationResult<Page<Node<P>>> {
        self.engine.query(query)
    }

    /// Nested view of all non-root nodes, or of the subtree rooted at `root`.
    pub fn as_forest(&self, root: Option<NodeId>) -> ApplicationResult<Forest<Node<P>>> {
        let nodes = match root {
            Some(id) => {
                // The sentinel is recognized by its bounds, whatever its id.
                let mut nodes = self.engine.list_subtree(id)?;
                nodes.retain(|n| !n.is_root());
                nodes
            }
            None => self.engine.list_descendants(None)?,
        };
        debug!("as_forest: {} nodes", nodes.len());
        Ok(build_forest(&nodes))
    }

    pub fn verify(&self) -> ApplicationResult<ConsistencyReport> {
        self.engine.verify()
    }
}
