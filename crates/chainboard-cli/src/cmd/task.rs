//! `cb task`: the ordered cards of a task state.

use super::Context;
use super::chain::{self, MoveArgs};
use crate::output::{pretty_section, render_mode};
use anyhow::Result;
use chainboard_core::{Actor, Board, ChainKind, ContainerId, Node, NodeId};
use clap::Subcommand;
use std::io::{self, Write};

const KIND: ChainKind = ChainKind::Task;

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Append a task to the bottom of a task state.
    Add {
        /// Task state id.
        #[arg(long)]
        state: i64,
        /// Task name, unique within the task state ignoring case.
        name: String,
    },
    /// List the tasks of a task state in order, or every task assigned to
    /// someone.
    #[command(alias = "ls")]
    List {
        /// Task state id.
        #[arg(long, conflicts_with = "assignee", required_unless_present = "assignee")]
        state: Option<i64>,
        /// List tasks assigned to this actor instead.
        #[arg(long, value_name = "ACTOR")]
        assignee: Option<String>,
    },
    /// Rename a task without moving it.
    Rename {
        /// Task id.
        id: i64,
        /// New name.
        name: String,
    },
    /// Reorder a task within its task state.
    Move(MoveArgs),
    /// Move a task to the bottom of another task state.
    Transfer {
        /// Task id.
        id: i64,
        /// Destination task state id.
        #[arg(long, value_name = "STATE")]
        to: i64,
    },
    /// Assign a task to an actor, or clear its assignee.
    Assign {
        /// Task id.
        id: i64,
        /// Actor name to assign.
        #[arg(long, value_name = "ACTOR", conflicts_with = "clear", required_unless_present = "clear")]
        to: Option<String>,
        /// Remove the current assignee.
        #[arg(long)]
        clear: bool,
    },
    /// Remove a task.
    #[command(alias = "remove")]
    Rm {
        /// Task id.
        id: i64,
    },
}

/// Dispatch a `cb task` subcommand.
///
/// # Errors
///
/// Returns an error when the board cannot be opened, no actor is available
/// for a mutation, or the engine rejects the operation.
pub fn run_task(command: &TaskCommand, ctx: &Context) -> Result<()> {
    let mut board = ctx.open_board()?;
    match command {
        TaskCommand::Add { state, name } => {
            chain::add(ctx, &mut board, KIND, ContainerId(*state), name)
        }
        TaskCommand::List {
            state: Some(state), ..
        } => chain::list(ctx, &board, KIND, ContainerId(*state)),
        TaskCommand::List { assignee, .. } => {
            list_assigned(ctx, &board, assignee.as_deref().unwrap_or_default())
        }
        TaskCommand::Rename { id, name } => chain::rename(ctx, &mut board, KIND, *id, name),
        TaskCommand::Move(args) => chain::move_node(ctx, &mut board, KIND, args),
        TaskCommand::Transfer { id, to } => {
            chain::transfer(ctx, &mut board, KIND, *id, ContainerId(*to))
        }
        TaskCommand::Assign { id, to, clear } => {
            assign(ctx, &mut board, *id, if *clear { None } else { to.as_deref() })
        }
        TaskCommand::Rm { id } => chain::remove(ctx, &mut board, KIND, *id),
    }
}

fn assign(ctx: &Context, board: &mut Board, id: i64, to: Option<&str>) -> Result<()> {
    let actor = ctx.actor()?;
    let assignee = to.map(Actor::new).transpose()?;
    let node = board.assign(&actor, NodeId(id), assignee.as_ref())?;
    ctx.report(&node, |n, w| match &n.assignee {
        Some(name) => writeln!(w, "✓ Assigned task {} \"{}\" to {name}", n.id, n.name),
        None => writeln!(w, "✓ Task {} \"{}\" is unassigned", n.id, n.name),
    })
}

fn write_assigned_rows(w: &mut dyn Write, nodes: &[Node]) -> io::Result<()> {
    for node in nodes {
        writeln!(w, "{}\t{}\t{}", node.id, node.container_id, node.name)?;
    }
    Ok(())
}

fn list_assigned(ctx: &Context, board: &Board, name: &str) -> Result<()> {
    let assignee = Actor::new(name)?;
    let nodes = board.assigned_tasks(&assignee)?;
    render_mode(ctx.output, &nodes, |n, w| write_assigned_rows(w, n), |n, w| {
        pretty_section(w, &format!("tasks assigned to {assignee}"))?;
        if n.is_empty() {
            return writeln!(w, "  (none)");
        }
        for node in n {
            writeln!(w, "  [{}] {} (task state {})", node.id, node.name, node.container_id)?;
        }
        Ok(())
    })
}
