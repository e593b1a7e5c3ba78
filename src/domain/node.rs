//! Hierarchy nodes: identifiers, interval bounds and the payload contract.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable node identifier, assigned at creation and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Well-known id of the sentinel root of every hierarchy instance.
    pub const ROOT: NodeId = NodeId(Uuid::nil());

    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Consumer-defined node content. Opaque to the engine except for the
/// accessors the store predicates need.
pub trait Payload:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Payload given to the sentinel root when it is bootstrapped.
    fn root() -> Self;

    /// Human readable label, used by text search and tree rendering.
    fn label(&self) -> &str;

    /// Unique key within one hierarchy (e.g. a slug), if the consumer has one.
    fn key(&self) -> Option<&str> {
        None
    }

    /// Classification tag (e.g. a post type), if the consumer has one.
    fn tag(&self) -> Option<&str> {
        None
    }
}

/// One entry of a hierarchy, carrying its interval bounds.
///
/// `parent` is a denormalized index for child listings; containment and
/// ordering are always derived from `left`/`right`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<P> {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    pub left: u64,
    pub right: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payload: P,
}

impl<P> Node<P> {
    pub fn is_root(&self) -> bool {
        self.left == 0
    }

    /// `right - left + 1`, twice the number of nodes in the subtree.
    pub fn width(&self) -> u64 {
        self.right - self.left + 1
    }

    /// Number of nodes in the subtree, the node itself included.
    pub fn subtree_size(&self) -> u64 {
        self.width() / 2
    }

    pub fn is_leaf(&self) -> bool {
        self.right == self.left + 1
    }

    /// Strict interval containment: `other` lies inside this node's subtree.
    pub fn contains(&self, other: &Node<P>) -> bool {
        self.left < other.left && other.right < self.right
    }

    pub fn is_descendant_of(&self, other: &Node<P>) -> bool {
        other.contains(self)
    }

    pub fn is_ancestor_of(&self, other: &Node<P>) -> bool {
        self.contains(other)
    }

    /// Bounds are well formed: `left < right` and the span is odd.
    pub fn has_valid_bounds(&self) -> bool {
        self.left < self.right && (self.right - self.left) % 2 == 1
    }
}

impl<P: Payload> fmt::Display for Node<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {}]", self.payload.label(), self.left, self.right)
    }
}
