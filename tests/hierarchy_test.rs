//! Tests for the Hierarchy façade: forest views and consumer hooks

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use nestset::application::{ApplicationError, ApplicationResult, Hierarchy, HierarchyHooks, NoHooks};
use nestset::config::EngineSettings;
use nestset::domain::{DomainError, InvalidOperation, Node, NodeId, Payload};
use nestset::infrastructure::{MemoryStore, NodeStore};
use nestset::util::testing::init_test_setup;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Label {
    text: String,
    group: String,
}

impl Label {
    fn new(text: &str, group: &str) -> Self {
        Self {
            text: text.to_string(),
            group: group.to_string(),
        }
    }
}

impl Payload for Label {
    fn root() -> Self {
        Label::new("root", "")
    }

    fn label(&self) -> &str {
        &self.text
    }

    fn key(&self) -> Option<&str> {
        Some(&self.text)
    }

    fn tag(&self) -> Option<&str> {
        Some(&self.group)
    }
}

/// Unique labels, moves only within a group, counts removals.
#[derive(Default)]
struct StrictHooks {
    removed: AtomicUsize,
}

impl HierarchyHooks<Label> for StrictHooks {
    fn prepare_create(
        &self,
        store: &dyn NodeStore<Label>,
        _parent: &Node<Label>,
        mut payload: Label,
    ) -> ApplicationResult<Label> {
        payload.text = payload.text.trim().to_string();
        let taken = store.count_where(&nestset::domain::Filter::Key(payload.text.clone()))?;
        if taken > 0 {
            return Err(ApplicationError::validation("text", "already in use"));
        }
        Ok(payload)
    }

    fn validate_move(&self, node: &Node<Label>, new_parent: &Node<Label>) -> ApplicationResult<()> {
        if !new_parent.is_root() && new_parent.payload.group != node.payload.group {
            return Err(InvalidOperation::Incompatible("groups differ".into()).into());
        }
        Ok(())
    }

    fn after_remove(&self, removed: &[Node<Label>]) -> ApplicationResult<()> {
        self.removed.fetch_add(removed.len(), Ordering::SeqCst);
        Ok(())
    }
}

fn plain() -> Hierarchy<Label, MemoryStore<Label>, NoHooks> {
    init_test_setup();
    Hierarchy::open("plain", MemoryStore::new(), EngineSettings::default(), NoHooks).unwrap()
}

fn strict() -> Hierarchy<Label, MemoryStore<Label>, StrictHooks> {
    init_test_setup();
    Hierarchy::open(
        "strict",
        MemoryStore::new(),
        EngineSettings::default(),
        StrictHooks::default(),
    )
    .unwrap()
}

fn texts(nodes: &[nestset::ForestNode<Node<Label>>]) -> Vec<&str> {
    nodes.iter().map(|f| f.item.payload.text.as_str()).collect()
}

#[test]
fn given_nested_nodes_when_building_forest_then_root_is_excluded_and_order_kept() {
    // Arrange
    let h = plain();
    let a = h.create_under_parent(None, Label::new("A", "x")).unwrap();
    h.create_under_parent(Some(a.id), Label::new("B", "x")).unwrap();
    h.create_under_parent(Some(a.id), Label::new("C", "x")).unwrap();
    h.create_under_parent(None, Label::new("D", "x")).unwrap();

    // Act
    let forest = h.as_forest(None).unwrap();

    // Assert
    assert_eq!(texts(&forest), vec!["A", "D"]);
    assert_eq!(texts(&forest[0].children), vec!["B", "C"]);
    assert!(forest.iter().flat_map(|f| f.iter()).all(|n| !n.item.is_root()));
    assert_eq!(forest.iter().map(|f| f.size()).sum::<usize>(), 4);
}

#[test]
fn given_subtree_root_when_building_forest_then_returns_single_tree() {
    // Arrange
    let h = plain();
    let a = h.create_under_parent(None, Label::new("A", "x")).unwrap();
    let b = h.create_under_parent(Some(a.id), Label::new("B", "x")).unwrap();
    h.create_under_parent(Some(b.id), Label::new("B1", "x")).unwrap();
    h.create_under_parent(None, Label::new("D", "x")).unwrap();

    // Act
    let forest = h.as_forest(Some(b.id)).unwrap();

    // Assert
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].item.id, b.id);
    assert_eq!(texts(&forest[0].children), vec!["B1"]);
    assert_eq!(forest[0].depth(), 2);
}

#[test]
fn given_root_id_when_building_forest_then_same_as_whole_hierarchy() {
    let h = plain();
    h.create_under_parent(None, Label::new("A", "x")).unwrap();

    let whole = h.as_forest(None).unwrap();
    let from_root = h.as_forest(Some(NodeId::ROOT)).unwrap();

    assert_eq!(whole, from_root);
}

#[test]
fn given_forest_after_move_when_rebuilding_then_reflects_new_parent() {
    let h = plain();
    let a = h.create_under_parent(None, Label::new("A", "x")).unwrap();
    let b = h.create_under_parent(None, Label::new("B", "x")).unwrap();

    assert!(h.relocate(a.id, Some(b.id)).unwrap());

    let forest = h.as_forest(None).unwrap();
    assert_eq!(texts(&forest), vec!["B"]);
    assert_eq!(texts(&forest[0].children), vec!["A"]);
    assert!(forest[0].find(a.id).is_some());
}

#[test]
fn given_duplicate_key_when_creating_then_hook_rejects_and_store_is_unchanged() {
    // Arrange
    let h = strict();
    h.create_under_parent(None, Label::new("A", "x")).unwrap();
    let before = h.engine().snapshot().unwrap();

    // Act
    let err = h.create_under_parent(None, Label::new(" A ", "x")).unwrap_err();

    // Assert
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::Validation { field: "text", .. })
    ));
    assert_eq!(h.engine().snapshot().unwrap(), before);
}

#[test]
fn given_incompatible_target_when_relocating_then_hook_rejects() {
    let h = strict();
    let a = h.create_under_parent(None, Label::new("A", "x")).unwrap();
    let b = h.create_under_parent(None, Label::new("B", "y")).unwrap();

    let err = h.relocate(a.id, Some(b.id)).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidOperation(InvalidOperation::Incompatible(_)))
    ));
    assert_eq!(h.get(a.id).unwrap().parent, Some(NodeId::ROOT));
    h.verify().unwrap();
}

#[test]
fn given_structural_error_when_relocating_then_reported_before_hook() {
    let h = strict();
    let a = h.create_under_parent(None, Label::new("A", "x")).unwrap();
    let a1 = h.create_under_parent(Some(a.id), Label::new("A1", "y")).unwrap();

    let err = h.relocate(a.id, Some(a1.id)).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidOperation(
            InvalidOperation::IntoOwnSubtree { .. }
        ))
    ));
}

#[test]
fn given_subtree_when_removing_then_hook_sees_every_removed_node() {
    let h = strict();
    let a = h.create_under_parent(None, Label::new("A", "x")).unwrap();
    h.create_under_parent(Some(a.id), Label::new("A1", "x")).unwrap();
    h.create_under_parent(Some(a.id), Label::new("A2", "x")).unwrap();

    let removed = h.remove(a.id).unwrap();

    assert_eq!(removed, 3);
    assert_eq!(h.hooks().removed.load(Ordering::SeqCst), 3);
    assert!(h.descendants(None).unwrap().is_empty());
}

#[test]
fn given_nested_node_when_reading_paths_then_ancestors_exclude_node_and_path_includes_it() {
    let h = plain();
    let a = h.create_under_parent(None, Label::new("A", "x")).unwrap();
    let b = h.create_under_parent(Some(a.id), Label::new("B", "x")).unwrap();

    let ancestors: Vec<NodeId> = h.ancestor_path(b.id).unwrap().iter().map(|n| n.id).collect();
    let path: Vec<NodeId> = h.path_to_node(b.id).unwrap().iter().map(|n| n.id).collect();

    assert_eq!(ancestors, vec![NodeId::ROOT, a.id]);
    assert_eq!(path, vec![NodeId::ROOT, a.id, b.id]);
}

#[test]
fn given_update_with_when_deriving_from_current_then_bounds_unchanged() {
    let h = plain();
    let a = h.create_under_parent(None, Label::new("A", "x")).unwrap();

    let updated = h
        .update_with(a.id, |current| {
            Ok(Label::new(&format!("{}!", current.payload.text), &current.payload.group))
        })
        .unwrap();

    assert_eq!(updated.payload.text, "A!");
    assert_eq!((updated.left, updated.right), (a.left, a.right));
}

#[test]
fn given_root_with_custom_id_when_building_forest_from_it_then_root_is_excluded() {
    // Arrange: a store bootstrapped elsewhere, its root not the nil id
    init_test_setup();
    let now = chrono::Utc::now();
    let root = Node {
        id: NodeId::new(),
        parent: None,
        left: 0,
        right: 1,
        created_at: now,
        updated_at: now,
        payload: Label::root(),
    };
    let h = Hierarchy::open(
        "imported",
        MemoryStore::from_nodes([root.clone()]),
        EngineSettings::default(),
        NoHooks,
    )
    .unwrap();
    let a = h.create_under_parent(None, Label::new("A", "x")).unwrap();
    h.create_under_parent(Some(a.id), Label::new("B", "x")).unwrap();

    // Act
    let forest = h.as_forest(Some(root.id)).unwrap();

    // Assert
    assert_eq!(texts(&forest), vec!["A"]);
    assert_eq!(texts(&forest[0].children), vec!["B"]);
    assert_eq!(forest, h.as_forest(None).unwrap());
}
