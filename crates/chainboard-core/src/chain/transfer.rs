//! Moving a node between containers.

use serde::Serialize;

use super::mutate::{append, detach};
use super::working::WorkingSet;
use crate::error::Result;
use crate::model::{ContainerId, NodeId};

/// What a transfer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    /// The node was already in the destination.
    Unchanged,
    Transferred { from: ContainerId, to: ContainerId },
}

/// Detach `id` from its chain, rehome it, and append it to the tail of
/// `dest`.
///
/// The arena must already hold every member of both containers. Destination
/// existence and name uniqueness are the caller's checks.
///
/// # Errors
///
/// Returns `IntegrityViolation` if either chain is corrupt.
pub fn transfer(ws: &mut WorkingSet, id: NodeId, dest: ContainerId) -> Result<TransferOutcome> {
    let from = ws.node(id)?.container_id;
    if from == dest {
        return Ok(TransferOutcome::Unchanged);
    }

    detach(ws, id)?;
    ws.set_container(id, dest)?;
    append(ws, id)?;

    Ok(TransferOutcome::Transferred { from, to: dest })
}
