//! Read-side queries over one container's chain.

use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::model::{ChainKind, ContainerId, Node, NodeId};
use crate::verify::trace_chain;

fn single_end<'a>(
    kind: ChainKind,
    container: ContainerId,
    members: &'a [Node],
    side: &str,
    pick: impl Fn(&Node) -> bool,
) -> Result<Option<&'a Node>> {
    let mut ends = members.iter().filter(|&n| pick(n));
    let first = ends.next();
    let extra = ends.count();
    if extra == 0 {
        Ok(first)
    } else {
        Err(EngineError::integrity(
            kind,
            container,
            format!("{} nodes claim to be the {side}", extra + 1),
        ))
    }
}

/// The member with no left neighbor, or `None` for an empty container.
///
/// # Errors
///
/// Returns `IntegrityViolation` if several members claim the head.
pub fn find_head(kind: ChainKind, container: ContainerId, members: &[Node]) -> Result<Option<&Node>> {
    single_end(kind, container, members, "head", Node::is_head)
}

/// The member with no right neighbor, or `None` for an empty container.
///
/// # Errors
///
/// Returns `IntegrityViolation` if several members claim the tail.
pub fn find_tail(kind: ChainKind, container: ContainerId, members: &[Node]) -> Result<Option<&Node>> {
    single_end(kind, container, members, "tail", Node::is_tail)
}

/// Fail unless `target` lives in the same container as `node`.
///
/// # Errors
///
/// Returns `CrossContainerViolation` when the containers differ.
pub fn assert_same_container(kind: ChainKind, node: &Node, target: &Node) -> Result<()> {
    if node.container_id == target.container_id {
        Ok(())
    } else {
        Err(EngineError::CrossContainerViolation {
            kind,
            node: node.id,
            node_container: node.container_id,
            target: target.id,
            target_container: target.container_id,
        })
    }
}

/// Arrange `members` head to tail.
///
/// Refuses to guess: any broken invariant aborts with `IntegrityViolation`
/// instead of returning a partial or repaired order.
///
/// # Errors
///
/// Returns `IntegrityViolation` when the members do not form one chain.
pub fn order_chain(kind: ChainKind, container: ContainerId, members: Vec<Node>) -> Result<Vec<Node>> {
    let trace = trace_chain(&members, &HashMap::new());
    if let Some(first) = trace.violations.first() {
        return Err(EngineError::integrity(kind, container, first.to_string()));
    }

    let mut by_id: HashMap<NodeId, Node> = members.into_iter().map(|n| (n.id, n)).collect();
    Ok(trace
        .order
        .iter()
        .filter_map(|id| by_id.remove(id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn node(id: i64, container: i64, left: Option<i64>, right: Option<i64>) -> Node {
        Node {
            id: NodeId(id),
            container_id: ContainerId(container),
            name: format!("n{id}"),
            left: left.map(NodeId),
            right: right.map(NodeId),
            created_at_us: 0,
            assignee: None,
        }
    }

    #[test]
    fn empty_container_has_no_ends() {
        let kind = ChainKind::Task;
        assert!(find_head(kind, ContainerId(1), &[]).expect("head").is_none());
        assert!(find_tail(kind, ContainerId(1), &[]).expect("tail").is_none());
    }

    #[test]
    fn ends_of_a_three_node_chain() {
        let members = vec![
            node(1, 1, None, Some(2)),
            node(2, 1, Some(1), Some(3)),
            node(3, 1, Some(2), None),
        ];
        let kind = ChainKind::TaskState;
        assert_eq!(find_head(kind, ContainerId(1), &members).expect("head").map(|n| n.id), Some(NodeId(1)));
        assert_eq!(find_tail(kind, ContainerId(1), &members).expect("tail").map(|n| n.id), Some(NodeId(3)));
    }

    #[test]
    fn forked_chain_is_integrity_violation() {
        let members = vec![node(1, 1, None, None), node(2, 1, None, None)];
        let err = find_head(ChainKind::Task, ContainerId(1), &members).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IntegrityViolation);
    }

    #[test]
    fn same_container_guard() {
        let a = node(1, 1, None, None);
        let b = node(2, 2, None, None);
        assert!(assert_same_container(ChainKind::Task, &a, &a).is_ok());
        let err = assert_same_container(ChainKind::Task, &a, &b).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CrossContainerViolation);
        assert_eq!(
            err.to_string(),
            "task 1 is in task state 1 but target 2 is in 2"
        );
    }

    #[test]
    fn order_follows_links() {
        let members = vec![
            node(1, 1, Some(3), None),
            node(2, 1, None, Some(3)),
            node(3, 1, Some(2), Some(1)),
        ];
        let ordered = order_chain(ChainKind::Task, ContainerId(1), members).expect("order");
        let ids: Vec<i64> = ordered.iter().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn order_refuses_orphans() {
        let members = vec![node(1, 1, None, None), node(2, 1, Some(2), Some(2))];
        let err = order_chain(ChainKind::Task, ContainerId(1), members).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IntegrityViolation);
    }
}
