//! Pointer stitching: append, detach, move, remove.
//!
//! All functions edit a [`WorkingSet`] that already holds every member of
//! the containers involved. Nothing here touches storage; the caller
//! flushes the arena and commits, or drops the transaction on error.

use serde::Serialize;

use super::locate::assert_same_container;
use super::working::WorkingSet;
use crate::error::{EngineError, Missing, Result};
use crate::model::{Node, NodeId};

/// What a move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// The node already sat after the requested target.
    Unchanged,
    Moved {
        old_left: Option<NodeId>,
        new_left: Option<NodeId>,
    },
}

impl MoveOutcome {
    #[must_use]
    pub const fn changed(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Link a detached node in as the new tail of its container.
///
/// # Errors
///
/// Returns `InvalidOperation` if the node still has neighbors, or
/// `IntegrityViolation` if the container has several tails.
pub fn append(ws: &mut WorkingSet, id: NodeId) -> Result<()> {
    let node = ws.node(id)?;
    if node.left.is_some() || node.right.is_some() {
        return Err(EngineError::invalid(format!(
            "{} {id} is already linked",
            ws.kind().node_label()
        )));
    }
    let container = node.container_id;

    if let Some(tail) = ws.tail_of(container, Some(id))? {
        ws.set_right(tail, Some(id))?;
        ws.set_left(id, Some(tail))?;
    }
    Ok(())
}

/// Unlink a node, joining its old neighbors to each other. The node ends up
/// with no neighbors but keeps its container.
///
/// # Errors
///
/// Returns `IntegrityViolation` if a neighbor is missing, foreign, or does
/// not point back.
pub fn detach(ws: &mut WorkingSet, id: NodeId) -> Result<()> {
    let Node {
        left,
        right,
        container_id,
        ..
    } = ws.node(id)?.clone();

    if let Some(l) = left {
        if ws.linked(id, l)?.right != Some(id) {
            return Err(EngineError::integrity(
                ws.kind(),
                container_id,
                format!("left neighbor {l} of node {id} does not link back"),
            ));
        }
    }
    if let Some(r) = right {
        if ws.linked(id, r)?.left != Some(id) {
            return Err(EngineError::integrity(
                ws.kind(),
                container_id,
                format!("right neighbor {r} of node {id} does not link back"),
            ));
        }
    }

    if let Some(l) = left {
        ws.set_right(l, right)?;
    }
    if let Some(r) = right {
        ws.set_left(r, left)?;
    }
    ws.set_left(id, None)?;
    ws.set_right(id, None)?;
    Ok(())
}

/// Reposition `id` directly after `target`, or at the head when `target` is
/// `None`.
///
/// The target, when given, must already be in the arena; load it first so a
/// foreign target is reported as a cross-container move.
///
/// # Errors
///
/// - `InvalidOperation` when `target` is the node itself
/// - `NotFound` when `target` is not in the arena
/// - `CrossContainerViolation` when `target` is in another container
/// - `IntegrityViolation` when the existing chain is corrupt
pub fn move_after(ws: &mut WorkingSet, id: NodeId, target: Option<NodeId>) -> Result<MoveOutcome> {
    let kind = ws.kind();
    let node = ws.node(id)?;
    let old_left = node.left;
    let container = node.container_id;

    if old_left == target {
        return Ok(MoveOutcome::Unchanged);
    }
    if target == Some(id) {
        return Err(EngineError::invalid(format!(
            "cannot move {} {id} after itself",
            kind.node_label()
        )));
    }

    let target_right = match target {
        Some(t) => {
            let target_node = ws.node(t)?;
            assert_same_container(kind, node, target_node)?;
            target_node.right
        }
        None => ws.head_of(container, Some(id))?,
    };
    if target_right == Some(id) {
        return Err(EngineError::integrity(
            kind,
            container,
            format!("node {id} is right of its target but does not link back"),
        ));
    }

    detach(ws, id)?;

    ws.set_left(id, target)?;
    ws.set_right(id, target_right)?;
    if let Some(t) = target {
        ws.set_right(t, Some(id))?;
    }
    if let Some(r) = target_right {
        ws.set_left(r, Some(id))?;
    }

    Ok(MoveOutcome::Moved {
        old_left,
        new_left: target,
    })
}

/// Detach `id` and drop it from the arena, returning its final state.
///
/// # Errors
///
/// Same as [`detach`].
pub fn remove(ws: &mut WorkingSet, id: NodeId) -> Result<Node> {
    detach(ws, id)?;
    ws.forget(id)
        .ok_or(EngineError::NotFound(Missing::Node(ws.kind(), id)))
}
