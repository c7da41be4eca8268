//! `cb state`: the ordered columns of a project.

use super::Context;
use super::chain::{self, MoveArgs};
use anyhow::Result;
use chainboard_core::{ChainKind, ContainerId};
use clap::Subcommand;

const KIND: ChainKind = ChainKind::TaskState;

#[derive(Subcommand, Debug)]
pub enum StateCommand {
    /// Append a task state to the end of a project's columns.
    Add {
        /// Project id.
        #[arg(long)]
        project: i64,
        /// Task state name, unique within the project ignoring case.
        name: String,
    },
    /// List a project's task states in column order.
    #[command(alias = "ls")]
    List {
        /// Project id.
        #[arg(long)]
        project: i64,
    },
    /// Rename a task state without moving it.
    Rename {
        /// Task state id.
        id: i64,
        /// New name.
        name: String,
    },
    /// Reorder a task state within its project.
    Move(MoveArgs),
    /// Remove a task state and every task in it.
    #[command(alias = "remove")]
    Rm {
        /// Task state id.
        id: i64,
    },
}

/// Dispatch a `cb state` subcommand.
///
/// # Errors
///
/// Returns an error when the board cannot be opened, no actor is available
/// for a mutation, or the engine rejects the operation.
pub fn run_state(command: &StateCommand, ctx: &Context) -> Result<()> {
    let mut board = ctx.open_board()?;
    match command {
        StateCommand::Add { project, name } => {
            chain::add(ctx, &mut board, KIND, ContainerId(*project), name)
        }
        StateCommand::List { project } => chain::list(ctx, &board, KIND, ContainerId(*project)),
        StateCommand::Rename { id, name } => chain::rename(ctx, &mut board, KIND, *id, name),
        StateCommand::Move(args) => chain::move_node(ctx, &mut board, KIND, args),
        StateCommand::Rm { id } => chain::remove(ctx, &mut board, KIND, *id),
    }
}
