//! Handlers shared by `cb state` and `cb task`; both drive the same chain
//! operations with a different [`ChainKind`].

use super::Context;
use crate::output::{pretty_section, render_mode};
use anyhow::{Context as _, Result};
use chainboard_core::{Board, ChainKind, ContainerId, MoveOutcome, Node, NodeId, TransferOutcome};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};

/// Arguments for `move`: where the node should land.
#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Id of the node to move.
    pub id: i64,

    /// Place the node directly after this sibling.
    #[arg(long, value_name = "ID", conflicts_with = "front", required_unless_present = "front")]
    pub after: Option<i64>,

    /// Place the node at the head of its container.
    #[arg(long)]
    pub front: bool,
}

impl MoveArgs {
    const fn target(&self) -> Option<NodeId> {
        match self.after {
            Some(id) if !self.front => Some(NodeId(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct MoveReport {
    kind: ChainKind,
    id: NodeId,
    changed: bool,
    old_left: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

#[derive(Debug, Serialize)]
struct TransferReport {
    kind: ChainKind,
    id: NodeId,
    changed: bool,
    from: ContainerId,
    to: ContainerId,
}

fn neighbor(id: Option<NodeId>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}

fn write_rows(w: &mut dyn Write, nodes: &[Node]) -> io::Result<()> {
    for node in nodes {
        writeln!(w, "{}\t{}", node.id, node.name)?;
    }
    Ok(())
}

/// Numbered listing used by pretty output.
pub fn write_numbered(w: &mut dyn Write, nodes: &[Node]) -> io::Result<()> {
    if nodes.is_empty() {
        return writeln!(w, "  (empty)");
    }
    for (pos, node) in nodes.iter().enumerate() {
        writeln!(w, "  {:>3}. [{}] {}", pos + 1, node.id, node.name)?;
    }
    Ok(())
}

pub fn add(
    ctx: &Context,
    board: &mut Board,
    kind: ChainKind,
    container: ContainerId,
    name: &str,
) -> Result<()> {
    let actor = ctx.actor()?;
    let node = board.create_and_append(&actor, kind, container, name)?;
    ctx.report(&node, |n, w| {
        writeln!(
            w,
            "✓ Created {kind} {} \"{}\" in {} {}",
            n.id,
            n.name,
            kind.container_label(),
            n.container_id
        )
    })
}

pub fn list(ctx: &Context, board: &Board, kind: ChainKind, container: ContainerId) -> Result<()> {
    let nodes = board
        .list_in_order(kind, container)
        .with_context(|| format!("list {kind}s of {} {container}", kind.container_label()))?;
    render_mode(ctx.output, &nodes, |n, w| write_rows(w, n), |n, w| {
        pretty_section(
            w,
            &format!("{}s in {} {container}", kind.node_label(), kind.container_label()),
        )?;
        write_numbered(w, n)
    })
}

pub fn rename(ctx: &Context, board: &mut Board, kind: ChainKind, id: i64, name: &str) -> Result<()> {
    let actor = ctx.actor()?;
    let node = board.rename(&actor, kind, NodeId(id), name)?;
    ctx.report(&node, |n, w| {
        writeln!(w, "✓ Renamed {kind} {} to \"{}\"", n.id, n.name)
    })
}

pub fn move_node(ctx: &Context, board: &mut Board, kind: ChainKind, args: &MoveArgs) -> Result<()> {
    let actor = ctx.actor()?;
    let id = NodeId(args.id);
    let placement = board.move_after(&actor, kind, id, args.target())?;
    let node = &placement.node;
    let report = MoveReport {
        kind,
        id,
        changed: placement.changed(),
        old_left: match placement.outcome {
            MoveOutcome::Moved { old_left, .. } => old_left,
            MoveOutcome::Unchanged => node.left,
        },
        left: node.left,
        right: node.right,
    };
    ctx.report(&report, |r, w| {
        if r.changed {
            writeln!(
                w,
                "✓ Moved {kind} {} (now between {} and {})",
                r.id,
                neighbor(r.left),
                neighbor(r.right)
            )
        } else {
            writeln!(w, "{kind} {} is already there", r.id)
        }
    })
}

pub fn transfer(
    ctx: &Context,
    board: &mut Board,
    kind: ChainKind,
    id: i64,
    dest: ContainerId,
) -> Result<()> {
    let actor = ctx.actor()?;
    let id = NodeId(id);
    let outcome = board.transfer_container(&actor, kind, id, dest)?;
    let report = match outcome {
        TransferOutcome::Transferred { from, to } => TransferReport {
            kind,
            id,
            changed: true,
            from,
            to,
        },
        TransferOutcome::Unchanged => TransferReport {
            kind,
            id,
            changed: false,
            from: dest,
            to: dest,
        },
    };
    let label = kind.container_label();
    ctx.report(&report, |r, w| {
        if r.changed {
            writeln!(w, "✓ Transferred {kind} {} from {label} {} to {label} {}", r.id, r.from, r.to)
        } else {
            writeln!(w, "{kind} {} is already in {label} {}", r.id, r.to)
        }
    })
}

pub fn remove(ctx: &Context, board: &mut Board, kind: ChainKind, id: i64) -> Result<()> {
    let actor = ctx.actor()?;
    let node = board.remove(&actor, kind, NodeId(id))?;
    ctx.report(&node, |n, w| {
        writeln!(w, "✓ Removed {kind} {} \"{}\"", n.id, n.name)
    })
}
