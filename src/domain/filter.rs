//! Predicate and update language understood by every node store.

use serde::{Deserialize, Serialize};

use crate::domain::node::{Node, NodeId, Payload};

/// One of the two interval bounds of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    Left,
    Right,
}

impl Bound {
    pub fn of<P>(&self, node: &Node<P>) -> u64 {
        match self {
            Bound::Left => node.left,
            Bound::Right => node.right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    fn holds(&self, lhs: u64, rhs: u64) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }
}

/// Store-side selection predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Id(NodeId),
    IdIn(Vec<NodeId>),
    IdNotIn(Vec<NodeId>),
    Parent(Option<NodeId>),
    Cmp { bound: Bound, op: CmpOp, value: u64 },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    /// Case-insensitive substring match on the payload label.
    Search(String),
    /// Exact match on the payload key.
    Key(String),
    /// Exact match on the payload tag.
    Tag(String),
}

impl Filter {
    pub fn left(op: CmpOp, value: u64) -> Self {
        Filter::Cmp {
            bound: Bound::Left,
            op,
            value,
        }
    }

    pub fn right(op: CmpOp, value: u64) -> Self {
        Filter::Cmp {
            bound: Bound::Right,
            op,
            value,
        }
    }

    /// Everything except the sentinel root.
    pub fn not_root() -> Self {
        Filter::left(CmpOp::Ne, 0)
    }

    /// `left` in the half-open range `[from, to)`.
    pub fn left_in(from: u64, to: u64) -> Self {
        Filter::And(vec![Filter::left(CmpOp::Ge, from), Filter::left(CmpOp::Lt, to)])
    }

    /// Strict descendants of a node with the given bounds.
    pub fn descendants_of(left: u64, right: u64) -> Self {
        Filter::And(vec![
            Filter::left(CmpOp::Gt, left),
            Filter::right(CmpOp::Lt, right),
        ])
    }

    /// Strict ancestors of a node with the given bounds.
    pub fn ancestors_of(left: u64, right: u64) -> Self {
        Filter::And(vec![
            Filter::left(CmpOp::Lt, left),
            Filter::right(CmpOp::Gt, right),
        ])
    }

    /// The node with the given bounds plus all its descendants.
    pub fn subtree_of(left: u64, right: u64) -> Self {
        Filter::And(vec![
            Filter::left(CmpOp::Ge, left),
            Filter::left(CmpOp::Le, right),
        ])
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::All => other,
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    pub fn matches<P: Payload>(&self, node: &Node<P>) -> bool {
        match self {
            Filter::All => true,
            Filter::Id(id) => node.id == *id,
            Filter::IdIn(ids) => ids.contains(&node.id),
            Filter::IdNotIn(ids) => !ids.contains(&node.id),
            Filter::Parent(parent) => node.parent == *parent,
            Filter::Cmp { bound, op, value } => op.holds(bound.of(node), *value),
            Filter::And(parts) => parts.iter().all(|f| f.matches(node)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(node)),
            Filter::Not(inner) => !inner.matches(node),
            Filter::Search(needle) => node
                .payload
                .label()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Filter::Key(key) => node.payload.key() == Some(key.as_str()),
            Filter::Tag(tag) => node.payload.tag() == Some(tag.as_str()),
        }
    }
}

/// Store-side bulk modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Add `delta` to one bound.
    Shift { bound: Bound, delta: i64 },
    /// Add `delta` to both bounds.
    ShiftBoth(i64),
    SetParent(Option<NodeId>),
}

impl Update {
    pub fn shift_left(delta: i64) -> Self {
        Update::Shift {
            bound: Bound::Left,
            delta,
        }
    }

    pub fn shift_right(delta: i64) -> Self {
        Update::Shift {
            bound: Bound::Right,
            delta,
        }
    }

    /// Applies the update in place. Returns `None` when a bound would leave
    /// the `u64` range; the node is left untouched in that case.
    pub fn apply<P>(&self, node: &mut Node<P>) -> Option<()> {
        match self {
            Update::Shift { bound, delta } => {
                let shifted = bound.of(node).checked_add_signed(*delta)?;
                match bound {
                    Bound::Left => node.left = shifted,
                    Bound::Right => node.right = shifted,
                }
            }
            Update::ShiftBoth(delta) => {
                let left = node.left.checked_add_signed(*delta)?;
                let right = node.right.checked_add_signed(*delta)?;
                node.left = left;
                node.right = right;
            }
            Update::SetParent(parent) => node.parent = *parent,
        }
        Some(())
    }
}
