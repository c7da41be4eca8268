//! Chain integrity checks.
//!
//! [`trace_chain`] walks one container's chain from its head and reports
//! every way the node set deviates from a single, symmetric, acyclic
//! head-to-tail path. Ordered reads use it to refuse corrupted chains;
//! [`verify_store`] runs it over every container for `cb verify`.

use std::collections::{HashMap, HashSet};
use std::fmt;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::nodes::NodeStore;
use crate::error::Result;
use crate::model::{ChainKind, ContainerId, Node, NodeId};

/// Which neighbor reference a violation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// One broken invariant within a single container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum ChainViolation {
    /// Members exist but none lacks a left neighbor.
    MissingHead,
    MultipleHeads { heads: Vec<NodeId> },
    /// Members exist but none lacks a right neighbor.
    MissingTail,
    MultipleTails { tails: Vec<NodeId> },
    /// `node.side` names a node that does not exist.
    DanglingLink { node: NodeId, side: Side, target: NodeId },
    /// `node.side` names a node that lives in another container.
    ForeignLink {
        node: NodeId,
        side: Side,
        target: NodeId,
        target_container: ContainerId,
    },
    /// `node.side == target` but `target` does not point back.
    AsymmetricLink { node: NodeId, side: Side, target: NodeId },
    /// Following right links from the head revisits `at`.
    Cycle { at: NodeId },
    /// Members never reached from the head.
    Unreachable { nodes: Vec<NodeId> },
}

impl fmt::Display for ChainViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHead => f.write_str("no head node"),
            Self::MultipleHeads { heads } => write!(f, "multiple heads {}", join_ids(heads)),
            Self::MissingTail => f.write_str("no tail node"),
            Self::MultipleTails { tails } => write!(f, "multiple tails {}", join_ids(tails)),
            Self::DanglingLink { node, side, target } => {
                write!(f, "node {node} {side} link points at missing node {target}")
            }
            Self::ForeignLink {
                node,
                side,
                target,
                target_container,
            } => write!(
                f,
                "node {node} {side} link points at node {target} in container {target_container}"
            ),
            Self::AsymmetricLink { node, side, target } => {
                write!(f, "node {node} {side} link to {target} is not reciprocated")
            }
            Self::Cycle { at } => write!(f, "cycle through node {at}"),
            Self::Unreachable { nodes } => {
                write!(f, "nodes {} unreachable from head", join_ids(nodes))
            }
        }
    }
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of walking one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainTrace {
    /// Ids visited from the head, in order, stopping at the first repeat.
    pub order: Vec<NodeId>,
    pub violations: Vec<ChainViolation>,
}

impl ChainTrace {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Walk `members` (all nodes whose container is `container`) and collect
/// violations.
///
/// `elsewhere` maps ids of nodes outside this container to their container,
/// which distinguishes foreign links from dangling ones. Pass an empty map
/// when that distinction does not matter.
#[must_use]
pub fn trace_chain<'a, I>(members: I, elsewhere: &HashMap<NodeId, ContainerId>) -> ChainTrace
where
    I: IntoIterator<Item = &'a Node>,
{
    let mut by_id: HashMap<NodeId, &Node> = HashMap::new();
    let mut ids: Vec<NodeId> = Vec::new();
    for node in members {
        by_id.insert(node.id, node);
        ids.push(node.id);
    }
    ids.sort_unstable();

    let mut trace = ChainTrace::default();
    if ids.is_empty() {
        return trace;
    }

    for id in &ids {
        let node = by_id[id];
        for (side, link) in [(Side::Left, node.left), (Side::Right, node.right)] {
            let Some(target) = link else { continue };
            match by_id.get(&target) {
                Some(other) => {
                    let back = match side {
                        Side::Left => other.right,
                        Side::Right => other.left,
                    };
                    if back != Some(node.id) {
                        trace.violations.push(ChainViolation::AsymmetricLink {
                            node: node.id,
                            side,
                            target,
                        });
                    }
                }
                None => match elsewhere.get(&target) {
                    Some(&target_container) => trace.violations.push(ChainViolation::ForeignLink {
                        node: node.id,
                        side,
                        target,
                        target_container,
                    }),
                    None => trace.violations.push(ChainViolation::DanglingLink {
                        node: node.id,
                        side,
                        target,
                    }),
                },
            }
        }
    }

    let heads: Vec<NodeId> = ids.iter().copied().filter(|id| by_id[id].left.is_none()).collect();
    let tails: Vec<NodeId> = ids.iter().copied().filter(|id| by_id[id].right.is_none()).collect();
    match heads.len() {
        0 => trace.violations.push(ChainViolation::MissingHead),
        1 => {}
        _ => trace.violations.push(ChainViolation::MultipleHeads {
            heads: heads.clone(),
        }),
    }
    match tails.len() {
        0 => trace.violations.push(ChainViolation::MissingTail),
        1 => {}
        _ => trace
            .violations
            .push(ChainViolation::MultipleTails { tails }),
    }

    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut cursor = heads.first().copied();
    while let Some(id) = cursor {
        if !seen.insert(id) {
            trace.violations.push(ChainViolation::Cycle { at: id });
            break;
        }
        trace.order.push(id);
        cursor = by_id[&id].right.filter(|next| by_id.contains_key(next));
    }

    let unreachable: Vec<NodeId> = ids.iter().copied().filter(|id| !seen.contains(id)).collect();
    if !unreachable.is_empty() {
        trace
            .violations
            .push(ChainViolation::Unreachable { nodes: unreachable });
    }

    trace
}

/// Violations of the chain invariants among one container's members.
#[must_use]
pub fn check_chain(members: &[Node], elsewhere: &HashMap<NodeId, ContainerId>) -> Vec<ChainViolation> {
    trace_chain(members, elsewhere).violations
}

/// Verification outcome for one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainCheck {
    pub kind: ChainKind,
    pub container: ContainerId,
    pub length: usize,
    pub violations: Vec<ChainViolation>,
}

/// Aggregate verification report across both chain kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub chains: Vec<ChainCheck>,
}

impl VerifyReport {
    /// Return `true` when every chain passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.chains.iter().all(|c| c.violations.is_empty())
    }

    /// Chains with at least one violation.
    pub fn failures(&self) -> impl Iterator<Item = &ChainCheck> {
        self.chains.iter().filter(|c| !c.violations.is_empty())
    }

    /// Report as a JSON value for machine output.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "ok": self.is_ok(),
            "chains": self.chains.len(),
            "failures": self.failures().collect::<Vec<_>>(),
        })
    }
}

/// Check every container of both kinds.
///
/// # Errors
///
/// Returns a storage error if reading the store fails.
pub fn verify_store(conn: &Connection) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();

    for kind in ChainKind::ALL {
        let store = NodeStore::new(conn, kind);
        let mut by_container: HashMap<ContainerId, Vec<Node>> = HashMap::new();
        let mut index: HashMap<NodeId, ContainerId> = HashMap::new();
        for container in store.container_ids()? {
            let members = store.members(container)?;
            for node in &members {
                index.insert(node.id, container);
            }
            by_container.insert(container, members);
        }

        let mut containers: Vec<ContainerId> = by_container.keys().copied().collect();
        containers.sort_unstable();
        for container in containers {
            let members = &by_container[&container];
            let elsewhere: HashMap<NodeId, ContainerId> = index
                .iter()
                .filter(|(_, c)| **c != container)
                .map(|(id, c)| (*id, *c))
                .collect();
            let violations = check_chain(members, &elsewhere);
            if !violations.is_empty() {
                tracing::warn!(
                    kind = %kind,
                    container = %container,
                    violations = violations.len(),
                    "chain failed verification"
                );
            }
            report.chains.push(ChainCheck {
                kind,
                container,
                length: members.len(),
                violations,
            });
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, left: Option<i64>, right: Option<i64>) -> Node {
        Node {
            id: NodeId(id),
            container_id: ContainerId(1),
            name: format!("n{id}"),
            left: left.map(NodeId),
            right: right.map(NodeId),
            created_at_us: 0,
            assignee: None,
        }
    }

    fn ids(raw: &[i64]) -> Vec<NodeId> {
        raw.iter().copied().map(NodeId).collect()
    }

    #[test]
    fn empty_container_is_valid() {
        let trace = trace_chain(std::iter::empty::<&Node>(), &HashMap::new());
        assert!(trace.is_ok());
        assert!(trace.order.is_empty());
    }

    #[test]
    fn well_formed_chain_orders_by_links_not_ids() {
        let members = [node(1, Some(3), None), node(2, None, Some(3)), node(3, Some(2), Some(1))];
        let trace = trace_chain(&members, &HashMap::new());
        assert!(trace.is_ok(), "{:?}", trace.violations);
        assert_eq!(trace.order, ids(&[2, 3, 1]));
    }

    #[test]
    fn two_heads_are_reported() {
        let members = [node(1, None, None), node(2, None, None)];
        let trace = trace_chain(&members, &HashMap::new());
        assert!(trace.violations.contains(&ChainViolation::MultipleHeads {
            heads: ids(&[1, 2])
        }));
        assert!(trace.violations.contains(&ChainViolation::MultipleTails {
            tails: ids(&[1, 2])
        }));
        assert!(trace.violations.contains(&ChainViolation::Unreachable { nodes: ids(&[2]) }));
    }

    #[test]
    fn asymmetric_pointer_is_reported() {
        let members = [node(1, None, Some(2)), node(2, None, None)];
        let trace = trace_chain(&members, &HashMap::new());
        assert!(trace.violations.contains(&ChainViolation::AsymmetricLink {
            node: NodeId(1),
            side: Side::Right,
            target: NodeId(2),
        }));
    }

    #[test]
    fn cycle_without_head_is_reported() {
        let members = [node(1, Some(2), Some(2)), node(2, Some(1), Some(1))];
        let trace = trace_chain(&members, &HashMap::new());
        assert!(trace.violations.contains(&ChainViolation::MissingHead));
        assert!(trace.violations.contains(&ChainViolation::MissingTail));
        assert!(trace.order.is_empty());
    }

    #[test]
    fn cycle_behind_head_is_reported() {
        let members = [node(1, None, Some(2)), node(2, Some(1), Some(3)), node(3, Some(2), Some(2))];
        let trace = trace_chain(&members, &HashMap::new());
        assert!(trace.violations.contains(&ChainViolation::Cycle { at: NodeId(2) }));
    }

    #[test]
    fn foreign_and_dangling_links_are_distinguished() {
        let members = [node(1, Some(8), Some(9))];
        let elsewhere = HashMap::from([(NodeId(8), ContainerId(4))]);
        let trace = trace_chain(&members, &elsewhere);
        assert!(trace.violations.contains(&ChainViolation::ForeignLink {
            node: NodeId(1),
            side: Side::Left,
            target: NodeId(8),
            target_container: ContainerId(4),
        }));
        assert!(trace.violations.contains(&ChainViolation::DanglingLink {
            node: NodeId(1),
            side: Side::Right,
            target: NodeId(9),
        }));
    }

    #[test]
    fn violations_render_readably() {
        let v = ChainViolation::AsymmetricLink {
            node: NodeId(4),
            side: Side::Right,
            target: NodeId(5),
        };
        assert_eq!(v.to_string(), "node 4 right link to 5 is not reciprocated");
    }
}
