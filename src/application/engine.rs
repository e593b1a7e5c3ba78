//! Hierarchy engine: interval-preserving insert, move and delete.
//!
//! The engine owns its store behind a read/write lock. Every structural
//! mutation holds the write lock and runs in one store transaction, so readers
//! only ever observe committed, fully renumbered states. Two engines over
//! different stores share nothing.

use std::marker::PhantomData;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, error, instrument, warn};

use crate::application::bootstrap;
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::EngineSettings;
use crate::domain::invariants;
use crate::domain::{
    CmpOp, ConsistencyReport, Filter, InvalidOperation, Node, NodeId, Payload, Update,
};
use crate::infrastructure::NodeStore;

/// Paginated listing request. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeQuery {
    /// Scope node; `None` is the root
    pub parent: Option<NodeId>,
    /// Whole subtree below `parent` instead of direct children only
    pub genealogy: bool,
    pub search: Option<String>,
    pub tag: Option<String>,
    pub include_ids: Vec<NodeId>,
    pub exclude_ids: Vec<NodeId>,
    pub page: usize,
    pub limit: usize,
}

impl Default for NodeQuery {
    fn default() -> Self {
        Self {
            parent: None,
            genealogy: false,
            search: None,
            tag: None,
            include_ids: Vec::new(),
            exclude_ids: Vec::new(),
            page: 1,
            limit: 10,
        }
    }
}

impl NodeQuery {
    pub fn children_of(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            ..Self::default()
        }
    }

    pub fn genealogy_of(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            genealogy: true,
            ..Self::default()
        }
    }

    fn validate(&self) -> ApplicationResult<()> {
        if self.page == 0 {
            return Err(ApplicationError::validation("page", "must be at least 1"));
        }
        if self.limit == 0 {
            return Err(ApplicationError::validation("limit", "must be at least 1"));
        }
        Ok(())
    }
}

/// One page of a listing plus the number of matches over all pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    pub fn pages(&self) -> usize {
        self.total.div_ceil(self.limit.max(1))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Nested-set engine over one hierarchy instance.
pub struct HierarchyEngine<P, S> {
    name: String,
    store: RwLock<S>,
    settings: EngineSettings,
    payload: PhantomData<fn() -> P>,
}

impl<P, S> std::fmt::Debug for HierarchyEngine<P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchyEngine")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<P: Payload, S: NodeStore<P>> HierarchyEngine<P, S> {
    /// Wrap `store` and bootstrap its sentinel root.
    pub fn open(
        name: impl Into<String>,
        store: S,
        settings: EngineSettings,
    ) -> ApplicationResult<Self> {
        let engine = Self {
            name: name.into(),
            store: RwLock::new(store),
            settings,
            payload: PhantomData,
        };
        engine.ensure_root()?;
        Ok(engine)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Give the store back, e.g. to inspect it after a test.
    pub fn into_store(self) -> S {
        self.store.into_inner()
    }

    /// Create the sentinel root if missing; report a corrupted one.
    #[instrument(level = "debug", skip(self), fields(engine = %self.name))]
    pub fn ensure_root(&self) -> ApplicationResult<Node<P>> {
        if let Some(root) = bootstrap::inspect_root(&*self.store.read())? {
            return Ok(root);
        }
        self.mutate("ensure_root", |store| bootstrap::ensure_root(store))
    }

    // -------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------

    /// Append a new node as the rightmost child of `parent` (root if `None`).
    pub fn insert_child(&self, parent: Option<NodeId>, payload: P) -> ApplicationResult<Node<P>> {
        self.insert_child_with(parent, |_, _| Ok(payload.clone()))
    }

    /// Like [`insert_child`](Self::insert_child), with the payload produced
    /// inside the critical section from the resolved parent.
    #[instrument(level = "debug", skip(self, prepare), fields(engine = %self.name))]
    pub fn insert_child_with<F>(&self, parent: Option<NodeId>, mut prepare: F) -> ApplicationResult<Node<P>>
    where
        F: FnMut(&S, &Node<P>) -> ApplicationResult<P>,
    {
        self.mutate("insert_child", |store| {
            let parent = Self::resolve_parent(store, parent)?;
            let payload = prepare(store, &parent)?;
            let r = parent.right;

            let lefts = store.update_many(&Filter::left(CmpOp::Ge, r), &Update::shift_left(2))?;
            let rights = store.update_many(&Filter::right(CmpOp::Ge, r), &Update::shift_right(2))?;
            debug!("insert_child: opened gap at {r}, shifted {lefts} lefts and {rights} rights");

            let now = Utc::now();
            let node = store.insert_one(Node {
                id: NodeId::new(),
                parent: Some(parent.id),
                left: r,
                right: r + 1,
                created_at: now,
                updated_at: now,
                payload,
            })?;
            debug!("insert_child: created {} under {}", node, parent.id);
            Ok(node)
        })
    }

    /// Relocate the subtree of `id` to be the rightmost child of `new_parent`
    /// (root if `None`).
    pub fn move_subtree(&self, id: NodeId, new_parent: Option<NodeId>) -> ApplicationResult<()> {
        self.move_subtree_with(id, new_parent, |_, _| Ok(()))
    }

    /// Like [`move_subtree`](Self::move_subtree), with an extra compatibility
    /// check on the resolved node and target run before anything is written.
    #[instrument(level = "debug", skip(self, check), fields(engine = %self.name))]
    pub fn move_subtree_with<F>(
        &self,
        id: NodeId,
        new_parent: Option<NodeId>,
        mut check: F,
    ) -> ApplicationResult<()>
    where
        F: FnMut(&Node<P>, &Node<P>) -> ApplicationResult<()>,
    {
        if new_parent == Some(id) {
            return Err(InvalidOperation::SelfParent(id).into());
        }
        self.mutate("move_subtree", |store| {
            let node = Self::resolve(store, id)?;
            if node.is_root() {
                return Err(InvalidOperation::RootImmutable("moved").into());
            }
            let target = Self::resolve_parent(store, new_parent)?;
            if node.parent == Some(target.id) {
                return Err(InvalidOperation::SameParent {
                    id,
                    parent: target.id,
                }
                .into());
            }
            if node.contains(&target) {
                return Err(InvalidOperation::IntoOwnSubtree {
                    id,
                    target: target.id,
                }
                .into());
            }
            check(&node, &target)?;

            let width = node.width();
            let old_right = node.right;
            let new_left = target.right;
            let (distance, origin) = relocation(node.left, new_left, width);
            let delta = width as i64;

            let opened_l = store.update_many(&Filter::left(CmpOp::Ge, new_left), &Update::shift_left(delta))?;
            let opened_r = store.update_many(&Filter::right(CmpOp::Ge, new_left), &Update::shift_right(delta))?;
            debug!("move_subtree: opened gap of {width} at {new_left} ({opened_l} lefts, {opened_r} rights)");

            let moved = store.update_many(
                &Filter::left_in(origin, origin + width),
                &Update::ShiftBoth(distance),
            )?;
            if moved as u64 != node.subtree_size() {
                return Err(ApplicationError::consistency(format!(
                    "relocated {moved} nodes but subtree of {} holds {}",
                    node.id,
                    node.subtree_size()
                )));
            }
            store.update_many(&Filter::Id(node.id), &Update::SetParent(Some(target.id)))?;

            let closed_l = store.update_many(&Filter::left(CmpOp::Gt, old_right), &Update::shift_left(-delta))?;
            let closed_r = store.update_many(&Filter::right(CmpOp::Gt, old_right), &Update::shift_right(-delta))?;
            debug!(
                "move_subtree: moved {moved} nodes by {distance}, closed gap after {old_right} ({closed_l} lefts, {closed_r} rights)"
            );
            Ok(())
        })
    }

    /// Remove `id` and all its descendants. Returns the number removed.
    pub fn delete_subtree(&self, id: NodeId) -> ApplicationResult<usize> {
        self.delete_subtree_with(id, |_| Ok(()))
    }

    /// Like [`delete_subtree`](Self::delete_subtree); `on_removed` sees the
    /// removed records before commit and can abort the removal.
    #[instrument(level = "debug", skip(self, on_removed), fields(engine = %self.name))]
    pub fn delete_subtree_with<F>(&self, id: NodeId, mut on_removed: F) -> ApplicationResult<usize>
    where
        F: FnMut(&[Node<P>]) -> ApplicationResult<()>,
    {
        self.mutate("delete_subtree", |store| {
            let node = Self::resolve(store, id)?;
            if node.is_root() {
                return Err(InvalidOperation::RootImmutable("deleted").into());
            }
            let width = node.width() as i64;
            let subtree = Filter::subtree_of(node.left, node.right);
            let removed = store.find_where(&subtree)?;
            let deleted = store.delete_many(&subtree)?;
            if deleted as u64 != node.subtree_size() {
                return Err(ApplicationError::consistency(format!(
                    "deleted {deleted} nodes but subtree of {} holds {}",
                    node.id,
                    node.subtree_size()
                )));
            }

            let lefts = store.update_many(&Filter::left(CmpOp::Gt, node.right), &Update::shift_left(-width))?;
            let rights = store.update_many(&Filter::right(CmpOp::Gt, node.right), &Update::shift_right(-width))?;
            debug!("delete_subtree: removed {deleted}, compacted {lefts} lefts and {rights} rights");

            on_removed(&removed)?;
            Ok(deleted)
        })
    }

    /// Replace the payload of a non-root node.
    pub fn update_payload(&self, id: NodeId, payload: P) -> ApplicationResult<Node<P>> {
        self.update_payload_with(id, |_, _| Ok(payload.clone()))
    }

    /// Like [`update_payload`](Self::update_payload), with the new payload
    /// derived from the current record inside the critical section.
    #[instrument(level = "debug", skip(self, prepare), fields(engine = %self.name))]
    pub fn update_payload_with<F>(&self, id: NodeId, mut prepare: F) -> ApplicationResult<Node<P>>
    where
        F: FnMut(&S, &Node<P>) -> ApplicationResult<P>,
    {
        self.mutate("update_payload", |store| {
            let current = Self::resolve(store, id)?;
            if current.is_root() {
                return Err(InvalidOperation::RootImmutable("updated").into());
            }
            let payload = prepare(store, &current)?;
            if !store.update_payload(id, payload)? {
                return Err(ApplicationError::not_found(id));
            }
            Self::resolve(store, id)
        })
    }

    // -------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------

    pub fn root(&self) -> ApplicationResult<Node<P>> {
        Self::resolve_root(&*self.store.read())
    }

    /// Point lookup of a non-root node.
    pub fn get(&self, id: NodeId) -> ApplicationResult<Node<P>> {
        let node = Self::resolve(&*self.store.read(), id)?;
        if node.is_root() {
            return Err(ApplicationError::not_found(id));
        }
        Ok(node)
    }

    /// Direct children of `parent` (root if `None`), ordered by `left`.
    pub fn list_children(&self, parent: Option<NodeId>) -> ApplicationResult<Vec<Node<P>>> {
        let store = self.store.read();
        let parent = Self::resolve_parent(&*store, parent)?;
        Ok(store.find_where(&Filter::Parent(Some(parent.id)).and(Filter::not_root()))?)
    }

    /// Every node strictly below `id` (root if `None`).
    pub fn list_descendants(&self, id: Option<NodeId>) -> ApplicationResult<Vec<Node<P>>> {
        let store = self.store.read();
        let node = Self::resolve_parent(&*store, id)?;
        Ok(store.find_where(&Filter::descendants_of(node.left, node.right))?)
    }

    /// Every node strictly above `id`, root first.
    pub fn list_ancestors(&self, id: NodeId) -> ApplicationResult<Vec<Node<P>>> {
        let store = self.store.read();
        let node = Self::resolve(&*store, id)?;
        Ok(store.find_where(&Filter::ancestors_of(node.left, node.right))?)
    }

    /// `id` followed by its descendants.
    pub fn list_subtree(&self, id: NodeId) -> ApplicationResult<Vec<Node<P>>> {
        let store = self.store.read();
        let node = Self::resolve(&*store, id)?;
        Ok(store.find_where(&Filter::subtree_of(node.left, node.right))?)
    }

    /// Root-to-node path including the node itself.
    pub fn path_to_node(&self, id: NodeId) -> ApplicationResult<Vec<Node<P>>> {
        let store = self.store.read();
        let node = Self::resolve(&*store, id)?;
        let mut path = store.find_where(&Filter::ancestors_of(node.left, node.right))?;
        path.push(node);
        Ok(path)
    }

    /// Non-root nodes matching `extra`, ordered by `left`.
    pub fn find(&self, extra: Filter) -> ApplicationResult<Vec<Node<P>>> {
        Ok(self.store.read().find_where(&Filter::not_root().and(extra))?)
    }

    pub fn count(&self, extra: Filter) -> ApplicationResult<usize> {
        Ok(self.store.read().count_where(&Filter::not_root().and(extra))?)
    }

    #[instrument(level = "debug", skip(self), fields(engine = %self.name))]
    pub fn query(&self, query: &NodeQuery) -> ApplicationResult<Page<Node<P>>> {
        query.validate()?;
        let store = self.store.read();
        let parent = Self::resolve_parent(&*store, query.parent)?;

        let mut filter = Filter::not_root();
        filter = if query.genealogy {
            filter.and(Filter::descendants_of(parent.left, parent.right))
        } else {
            filter.and(Filter::Parent(Some(parent.id)))
        };
        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            filter = filter.and(Filter::Search(search.to_string()));
        }
        if let Some(tag) = &query.tag {
            filter = filter.and(Filter::Tag(tag.clone()));
        }
        if !query.include_ids.is_empty() {
            filter = filter.and(Filter::IdIn(query.include_ids.clone()));
        }
        if !query.exclude_ids.is_empty() {
            filter = filter.and(Filter::IdNotIn(query.exclude_ids.clone()));
        }

        let matches = store.find_where(&filter)?;
        let total = matches.len();
        let items = matches
            .into_iter()
            .skip((query.page - 1).saturating_mul(query.limit))
            .take(query.limit)
            .collect();
        debug!("query: {total} matches");
        Ok(Page {
            items,
            total,
            page: query.page,
            limit: query.limit,
        })
    }

    /// All records including the root, ordered by `left`.
    pub fn snapshot(&self) -> ApplicationResult<Vec<Node<P>>> {
        Ok(self.store.read().find_where(&Filter::All)?)
    }

    /// Full structural check of the stored hierarchy.
    #[instrument(level = "debug", skip(self), fields(engine = %self.name))]
    pub fn verify(&self) -> ApplicationResult<ConsistencyReport> {
        Self::verify_store(&*self.store.read())
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn verify_store(store: &S) -> ApplicationResult<ConsistencyReport> {
        let nodes = store.find_where(&Filter::All)?;
        Ok(invariants::check(&nodes)?)
    }

    fn resolve(store: &S, id: NodeId) -> ApplicationResult<Node<P>> {
        let node = store
            .find_by_id(id)?
            .ok_or_else(|| ApplicationError::not_found(id))?;
        if !node.has_valid_bounds() {
            return Err(ApplicationError::consistency(format!(
                "node {} has malformed bounds [{}, {}]",
                node.id, node.left, node.right
            )));
        }
        Ok(node)
    }

    fn resolve_root(store: &S) -> ApplicationResult<Node<P>> {
        let mut roots = store.find_where(&Filter::left(CmpOp::Eq, 0))?;
        match roots.len() {
            1 => Ok(roots.remove(0)),
            0 => Err(ApplicationError::consistency("hierarchy has no root")),
            n => Err(ApplicationError::consistency(format!(
                "{n} nodes claim left = 0"
            ))),
        }
    }

    fn resolve_parent(store: &S, id: Option<NodeId>) -> ApplicationResult<Node<P>> {
        match id {
            Some(id) => Self::resolve(store, id),
            None => Self::resolve_root(store),
        }
    }

    /// Run `body` as one transaction under the write lock, re-running the
    /// whole operation after transient store failures.
    fn mutate<T, F>(&self, op: &'static str, mut body: F) -> ApplicationResult<T>
    where
        F: FnMut(&mut S) -> ApplicationResult<T>,
    {
        let mut attempt = 0;
        loop {
            let result = {
                let mut store = self.store.write();
                self.transaction(&mut *store, &mut body)
            };
            match result {
                Err(e) if e.is_transient() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    warn!(
                        "{op} on {}: transient failure, retry {attempt}/{}: {e}",
                        self.name, self.settings.max_retries
                    );
                }
                other => return other,
            }
        }
    }

    fn transaction<T, F>(&self, store: &mut S, body: &mut F) -> ApplicationResult<T>
    where
        F: FnMut(&mut S) -> ApplicationResult<T>,
    {
        store.begin()?;
        let result = body(store).and_then(|value| {
            if self.settings.verify_after_write {
                Self::verify_store(store)?;
            }
            Ok(value)
        });
        match result {
            Ok(value) => {
                store.commit()?;
                Ok(value)
            }
            Err(e) => {
                if store.in_transaction() {
                    if let Err(rollback) = store.rollback() {
                        error!("{}: rollback failed: {rollback}", self.name);
                    }
                }
                Err(e)
            }
        }
    }
}

/// Shift applied to the moving subtree and the `left` at which it starts once
/// the destination gap is open.
fn relocation(left: u64, new_left: u64, width: u64) -> (i64, u64) {
    let distance = new_left as i64 - left as i64;
    if distance < 0 {
        (distance - width as i64, left + width)
    } else {
        (distance, left)
    }
}
