//! Full consistency check of one hierarchy instance.
//!
//! Bounds are the single source of truth: the stored `parent` of every node
//! is compared against the parent re-derived from interval containment.

use crate::domain::error::DomainError;
use crate::domain::node::Node;

/// Summary of a hierarchy that passed [`check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Number of nodes, sentinel root included.
    pub nodes: usize,
    /// Deepest level below the root (0 for a root-only hierarchy).
    pub depth: usize,
}

/// Verify the interval invariants over the complete node set.
pub fn check<P>(nodes: &[Node<P>]) -> Result<ConsistencyReport, DomainError> {
    let mut sorted: Vec<&Node<P>> = nodes.iter().collect();
    sorted.sort_by_key(|n| n.left);

    let roots = sorted.iter().filter(|n| n.left == 0).count();
    if roots != 1 {
        return Err(DomainError::consistency(format!(
            "expected exactly one root with left = 0, found {roots}"
        )));
    }
    let root = sorted[0];
    if root.parent.is_some() {
        return Err(DomainError::consistency(format!(
            "root {} has a parent",
            root.id
        )));
    }

    let n = sorted.len() as u64;
    if root.right != 2 * n - 1 {
        return Err(DomainError::consistency(format!(
            "root right is {} but {} nodes require {}",
            root.right,
            n,
            2 * n - 1
        )));
    }

    // With every bound in 0..2n used exactly once and intervals properly
    // nested, each subtree width equals twice its node count.
    let mut seen = vec![false; (2 * n) as usize];
    for node in &sorted {
        if !node.has_valid_bounds() {
            return Err(DomainError::consistency(format!(
                "node {} has malformed bounds [{}, {}]",
                node.id, node.left, node.right
            )));
        }
        for bound in [node.left, node.right] {
            let slot = seen.get_mut(bound as usize).ok_or_else(|| {
                DomainError::consistency(format!(
                    "node {} bound {} outside 0..{}",
                    node.id,
                    bound,
                    2 * n
                ))
            })?;
            if *slot {
                return Err(DomainError::consistency(format!(
                    "bound {} used twice (node {})",
                    bound, node.id
                )));
            }
            *slot = true;
        }
    }

    let mut open: Vec<&Node<P>> = vec![root];
    let mut depth = 0;
    for node in sorted.iter().skip(1) {
        while open.last().is_some_and(|top| top.right < node.left) {
            open.pop();
        }
        let Some(parent) = open.last() else {
            return Err(DomainError::consistency(format!(
                "node {} lies outside the root interval",
                node.id
            )));
        };
        if node.right > parent.right {
            return Err(DomainError::consistency(format!(
                "node {} [{}, {}] overlaps {} [{}, {}]",
                node.id, node.left, node.right, parent.id, parent.left, parent.right
            )));
        }
        if node.parent != Some(parent.id) {
            return Err(DomainError::consistency(format!(
                "node {} stores parent {:?} but its bounds place it under {}",
                node.id, node.parent, parent.id
            )));
        }
        open.push(node);
        depth = depth.max(open.len() - 1);
    }

    Ok(ConsistencyReport {
        nodes: sorted.len(),
        depth,
    })
}
