//! In-transaction arena of nodes being rewired.

use std::collections::{BTreeSet, HashMap};

use crate::db::nodes::NodeStore;
use crate::error::{EngineError, Missing, Result};
use crate::model::{ChainKind, ContainerId, Node, NodeId};
use crate::verify;

/// Nodes read inside one transaction, keyed by id.
///
/// Every pointer change lands on the single arena copy, so a node reached
/// by two roles (old right neighbor and new left neighbor, say) is never
/// written from a stale snapshot. Only nodes marked dirty are flushed.
#[derive(Debug)]
pub struct WorkingSet {
    kind: ChainKind,
    nodes: HashMap<NodeId, Node>,
    dirty: BTreeSet<NodeId>,
}

impl WorkingSet {
    #[must_use]
    pub fn new(kind: ChainKind) -> Self {
        Self {
            kind,
            nodes: HashMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Load every member of `container` into the arena.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub fn load_container(&mut self, store: &NodeStore<'_>, container: ContainerId) -> Result<()> {
        self.extend(store.members(container)?);
        Ok(())
    }

    /// Add nodes that are not already present. Arena copies win so pending
    /// edits are never overwritten.
    pub fn extend(&mut self, nodes: impl IntoIterator<Item = Node>) {
        for node in nodes {
            self.nodes.entry(node.id).or_insert(node);
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ChainKind {
        self.kind
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Borrow a node that must be present.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is not in the arena.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(&id)
            .ok_or(EngineError::NotFound(Missing::Node(self.kind, id)))
    }

    /// Follow a neighbor reference held by `from`. A reference that leaves
    /// the arena means the chain is dangling or crosses containers.
    pub(crate) fn linked(&self, from: NodeId, to: NodeId) -> Result<&Node> {
        let origin = self.node(from)?;
        match self.nodes.get(&to) {
            Some(node) if node.container_id == origin.container_id => Ok(node),
            Some(node) => Err(EngineError::integrity(
                self.kind,
                origin.container_id,
                format!(
                    "node {from} links to node {to} in container {}",
                    node.container_id
                ),
            )),
            None => Err(EngineError::integrity(
                self.kind,
                origin.container_id,
                format!("node {from} links to missing node {to}"),
            )),
        }
    }

    /// Members of `container` currently in the arena, ordered by id.
    #[must_use]
    pub fn members(&self, container: ContainerId) -> Vec<&Node> {
        let mut members: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| n.container_id == container)
            .collect();
        members.sort_unstable_by_key(|n| n.id);
        members
    }

    fn end_of(
        &self,
        container: ContainerId,
        excluding: Option<NodeId>,
        side: &str,
        pick: impl Fn(&Node) -> bool,
    ) -> Result<Option<NodeId>> {
        let ends: Vec<NodeId> = self
            .members(container)
            .into_iter()
            .filter(|n| Some(n.id) != excluding && pick(*n))
            .map(|n| n.id)
            .collect();
        match ends.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            many => Err(EngineError::integrity(
                self.kind,
                container,
                format!(
                    "{} nodes claim to be the {side}: {}",
                    many.len(),
                    many.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
                ),
            )),
        }
    }

    /// Current head of `container`, ignoring `excluding`.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityViolation` if more than one candidate exists.
    pub fn head_of(&self, container: ContainerId, excluding: Option<NodeId>) -> Result<Option<NodeId>> {
        self.end_of(container, excluding, "head", Node::is_head)
    }

    /// Current tail of `container`, ignoring `excluding`.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityViolation` if more than one candidate exists.
    pub fn tail_of(&self, container: ContainerId, excluding: Option<NodeId>) -> Result<Option<NodeId>> {
        self.end_of(container, excluding, "tail", Node::is_tail)
    }

    fn edit(&mut self, id: NodeId) -> Result<&mut Node> {
        let kind = self.kind;
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(EngineError::NotFound(Missing::Node(kind, id)))?;
        self.dirty.insert(id);
        Ok(node)
    }

    pub(crate) fn set_left(&mut self, id: NodeId, left: Option<NodeId>) -> Result<()> {
        self.edit(id)?.left = left;
        Ok(())
    }

    pub(crate) fn set_right(&mut self, id: NodeId, right: Option<NodeId>) -> Result<()> {
        self.edit(id)?.right = right;
        Ok(())
    }

    pub(crate) fn set_container(&mut self, id: NodeId, container: ContainerId) -> Result<()> {
        self.edit(id)?.container_id = container;
        Ok(())
    }

    /// Drop a node from the arena; it will not be flushed.
    pub(crate) fn forget(&mut self, id: NodeId) -> Option<Node> {
        self.dirty.remove(&id);
        self.nodes.remove(&id)
    }

    /// Ids with pending edits, ascending.
    pub fn dirty_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.dirty.iter().copied()
    }

    /// Fail unless `container`'s arena members form one valid chain.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityViolation` naming the first violation found.
    pub fn check(&self, container: ContainerId) -> Result<()> {
        let elsewhere: HashMap<NodeId, ContainerId> = self
            .nodes
            .values()
            .filter(|n| n.container_id != container)
            .map(|n| (n.id, n.container_id))
            .collect();
        let violations = verify::trace_chain(self.members(container), &elsewhere).violations;
        match violations.first() {
            None => Ok(()),
            Some(first) => Err(EngineError::integrity(self.kind, container, first.to_string())),
        }
    }

    /// Write every dirty node through `store` and clear the dirty set.
    ///
    /// # Errors
    ///
    /// Returns the first storage error; the caller's transaction then rolls
    /// back.
    pub fn flush(&mut self, store: &NodeStore<'_>) -> Result<usize> {
        let dirty = std::mem::take(&mut self.dirty);
        for id in &dirty {
            store.save_links(self.node(*id)?)?;
        }
        tracing::debug!(kind = %self.kind, written = dirty.len(), "flushed working set");
        Ok(dirty.len())
    }
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
    fn head_and_tail_skip_the_excluded_node() {
        let mut ws = WorkingSet::new(ChainKind::Task);
        ws.extend([node(1, 1, None, Some(2)), node(2, 1, Some(1), None)]);

        assert_eq!(ws.head_of(ContainerId(1), None).expect("head"), Some(NodeId(1)));
        assert_eq!(ws.head_of(ContainerId(1), Some(NodeId(1))).expect("head"), None);
        assert_eq!(ws.tail_of(ContainerId(1), None).expect("tail"), Some(NodeId(2)));
        assert_eq!(ws.tail_of(ContainerId(9), None).expect("tail"), None);
    }

    #[test]
    fn two_heads_are_an_integrity_violation() {
        let mut ws = WorkingSet::new(ChainKind::Task);
        ws.extend([node(1, 1, None, None), node(2, 1, None, None)]);
        let err = ws.head_of(ContainerId(1), None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IntegrityViolation);
    }

    #[test]
    fn extend_keeps_pending_edits() {
        let mut ws = WorkingSet::new(ChainKind::Task);
        ws.extend([node(1, 1, None, None)]);
        ws.set_right(NodeId(1), Some(NodeId(5))).expect("edit");
        ws.extend([node(1, 1, None, None)]);
        assert_eq!(ws.node(NodeId(1)).expect("node").right, Some(NodeId(5)));
        assert_eq!(ws.dirty_ids().collect::<Vec<_>>(), vec![NodeId(1)]);
    }

    #[test]
    fn linked_rejects_dangling_and_foreign_targets() {
        let mut ws = WorkingSet::new(ChainKind::Task);
        ws.extend([node(1, 1, None, Some(2)), node(2, 7, None, None)]);
        assert_eq!(
            ws.linked(NodeId(1), NodeId(2)).unwrap_err().code(),
            ErrorCode::IntegrityViolation
        );
        assert_eq!(
            ws.linked(NodeId(1), NodeId(3)).unwrap_err().code(),
            ErrorCode::IntegrityViolation
        );
    }

    #[test]
    fn forget_drops_node_and_pending_edit() {
        let mut ws = WorkingSet::new(ChainKind::Task);
        ws.extend([node(1, 1, None, None)]);
        ws.set_left(NodeId(1), None).expect("edit");
        assert!(ws.forget(NodeId(1)).is_some());
        assert!(ws.get(NodeId(1)).is_none());
        assert_eq!(ws.dirty_ids().count(), 0);
    }
}
