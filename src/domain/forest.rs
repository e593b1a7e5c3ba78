//! Tree builder: adjacency list to nested forest.
//!
//! Independent of the interval encoding: works on any parent-linked record
//! set. Pure, no I/O.

use std::collections::HashMap;
use std::fmt;

use termtree::Tree;

use crate::domain::node::{Node, NodeId};

/// A record that knows its own id and the id of its parent.
pub trait ParentLinked {
    fn node_id(&self) -> NodeId;
    fn parent_id(&self) -> Option<NodeId>;
}

impl<P> ParentLinked for Node<P> {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn parent_id(&self) -> Option<NodeId> {
        self.parent
    }
}

/// One subtree of a forest.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestNode<T> {
    pub item: T,
    pub children: Vec<ForestNode<T>>,
}

/// Ordered list of root-level subtrees.
pub type Forest<T> = Vec<ForestNode<T>>;

/// Builds a forest from a flat, parent-linked list.
///
/// Records whose parent is `None`, absent from the input, or the record
/// itself become roots. Children keep input order. For duplicate ids the
/// first occurrence wins. Records that only reach each other through a
/// parent cycle are unreachable from any root and are dropped.
pub fn build<T: ParentLinked + Clone>(items: &[T]) -> Forest<T> {
    let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        index.entry(item.node_id()).or_insert(i);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    let mut roots = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if index.get(&item.node_id()) != Some(&i) {
            continue;
        }
        match item.parent_id().and_then(|p| index.get(&p).copied()) {
            Some(p) if p != i => children[p].push(i),
            _ => roots.push(i),
        }
    }

    // Iterative post-order assembly, the tree may be arbitrarily deep.
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&r| (r, false)).collect();
    let mut built: Vec<ForestNode<T>> = Vec::with_capacity(roots.len());
    while let Some((idx, visited)) = stack.pop() {
        if visited {
            let kids = built.split_off(built.len() - children[idx].len());
            built.push(ForestNode {
                item: items[idx].clone(),
                children: kids,
            });
        } else {
            stack.push((idx, true));
            for &child in children[idx].iter().rev() {
                stack.push((child, false));
            }
        }
    }
    built
}

impl<T> ForestNode<T> {
    pub fn leaf(item: T) -> Self {
        Self {
            item,
            children: Vec::new(),
        }
    }

    /// Number of records in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(ForestNode::size).sum::<usize>()
    }

    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ForestNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// Pre-order traversal.
    pub fn iter(&self) -> PreOrder<'_, T> {
        PreOrder { stack: vec![self] }
    }

    pub fn to_tree_with<F>(&self, render: &F) -> Tree<String>
    where
        F: Fn(&T) -> String,
    {
        let leaves: Vec<_> = self.children.iter().map(|c| c.to_tree_with(render)).collect();
        Tree::new(render(&self.item)).with_leaves(leaves)
    }
}

impl<T: ParentLinked> ForestNode<T> {
    pub fn find(&self, id: NodeId) -> Option<&ForestNode<T>> {
        let mut stack = vec![self];
        while let Some(current) = stack.pop() {
            if current.item.node_id() == id {
                return Some(current);
            }
            stack.extend(current.children.iter().rev());
        }
        None
    }
}

pub struct PreOrder<'a, T> {
    stack: Vec<&'a ForestNode<T>>,
}

impl<'a, T> Iterator for PreOrder<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        // Push children in reverse order for left-to-right traversal
        self.stack.extend(current.children.iter().rev());
        Some(&current.item)
    }
}

/// Rendering of forests as text trees.
pub trait TreeDisplay {
    fn to_tree_string(&self) -> Tree<String>;
}

impl<T: fmt::Display> TreeDisplay for ForestNode<T> {
    fn to_tree_string(&self) -> Tree<String> {
        self.to_tree_with(&|item: &T| item.to_string())
    }
}
