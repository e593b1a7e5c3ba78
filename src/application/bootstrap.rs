//! Root bootstrapper: exactly one sentinel root per hierarchy instance.

use chrono::Utc;
use tracing::{debug, info};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{CmpOp, Filter, Node, NodeId, Payload};
use crate::infrastructure::NodeStore;

/// Check the sentinel root without writing.
///
/// Returns `Ok(None)` when the hierarchy is empty and needs bootstrapping.
/// A second `left = 0` node, a root with a parent, or a root whose interval
/// does not cover every stored node is reported as corruption.
pub fn inspect_root<P: Payload, S: NodeStore<P> + ?Sized>(
    store: &S,
) -> ApplicationResult<Option<Node<P>>> {
    let roots = store.find_where(&Filter::left(CmpOp::Eq, 0))?;
    let total = store.count_where(&Filter::All)?;
    match roots.as_slice() {
        [] if total == 0 => Ok(None),
        [] => Err(ApplicationError::consistency(format!(
            "{total} nodes stored but no root with left = 0"
        ))),
        [root] => {
            if root.parent.is_some() || !root.has_valid_bounds() {
                return Err(ApplicationError::consistency(format!(
                    "root {} is malformed: parent {:?}, bounds [{}, {}]",
                    root.id, root.parent, root.left, root.right
                )));
            }
            let expected = 2 * total as u64 - 1;
            if root.right != expected {
                return Err(ApplicationError::consistency(format!(
                    "root right is {} but {} stored nodes require {}",
                    root.right, total, expected
                )));
            }
            Ok(Some(root.clone()))
        }
        many => Err(ApplicationError::consistency(format!(
            "{} nodes claim left = 0",
            many.len()
        ))),
    }
}

/// Create the sentinel root if the hierarchy is empty. Idempotent.
pub fn ensure_root<P: Payload, S: NodeStore<P> + ?Sized>(store: &mut S) -> ApplicationResult<Node<P>> {
    if let Some(root) = inspect_root(&*store)? {
        debug!("root already present: {}", root.id);
        return Ok(root);
    }
    let now = Utc::now();
    let root = store.insert_one(Node {
        id: NodeId::ROOT,
        parent: None,
        left: 0,
        right: 1,
        created_at: now,
        updated_at: now,
        payload: P::root(),
    })?;
    info!("bootstrapped sentinel root {}", root.id);
    Ok(root)
}
