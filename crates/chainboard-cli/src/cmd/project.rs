//! `cb project`: create, list, rename, and delete projects.

use super::Context;
use crate::output::{pretty_section, render_mode};
use anyhow::Result;
use chainboard_core::{ContainerId, Project};
use clap::Subcommand;
use std::io::Write;

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project.
    Add {
        /// Project name, unique across the board ignoring case.
        name: String,
    },
    /// List projects by id.
    #[command(alias = "ls")]
    List,
    /// Rename a project.
    Rename {
        /// Project id.
        id: i64,
        /// New name.
        name: String,
    },
    /// Delete a project with all of its task states and tasks.
    #[command(alias = "remove")]
    Rm {
        /// Project id.
        id: i64,
    },
}

fn write_row(w: &mut dyn Write, project: &Project) -> std::io::Result<()> {
    writeln!(w, "{}\t{}", project.id, project.name)
}

/// Dispatch a `cb project` subcommand.
///
/// # Errors
///
/// Returns an error when the board cannot be opened, no actor is available
/// for a mutation, or the engine rejects the operation.
pub fn run_project(command: &ProjectCommand, ctx: &Context) -> Result<()> {
    let mut board = ctx.open_board()?;
    match command {
        ProjectCommand::Add { name } => {
            let actor = ctx.actor()?;
            let project = board.create_project(&actor, name)?;
            ctx.report(&project, |p, w| {
                writeln!(w, "✓ Created project {} \"{}\"", p.id, p.name)
            })
        }
        ProjectCommand::List => {
            let projects = board.list_projects()?;
            render_mode(
                ctx.output,
                &projects,
                |projects, w| {
                    for project in projects {
                        write_row(w, project)?;
                    }
                    Ok(())
                },
                |projects, w| {
                    pretty_section(w, "Projects")?;
                    if projects.is_empty() {
                        writeln!(w, "(none)")?;
                    }
                    for project in projects {
                        writeln!(w, "{:>5}  {}", project.id.0, project.name)?;
                    }
                    Ok(())
                },
            )
        }
        ProjectCommand::Rename { id, name } => {
            let actor = ctx.actor()?;
            let project = board.rename_project(&actor, ContainerId(*id), name)?;
            ctx.report(&project, |p, w| {
                writeln!(w, "✓ Renamed project {} to \"{}\"", p.id, p.name)
            })
        }
        ProjectCommand::Rm { id } => {
            let actor = ctx.actor()?;
            let project = board.delete_project(&actor, ContainerId(*id))?;
            ctx.report(&project, |p, w| {
                writeln!(w, "✓ Deleted project {} \"{}\"", p.id, p.name)
            })
        }
    }
}
