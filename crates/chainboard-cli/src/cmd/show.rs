//! `cb show`: a project's whole board, columns and cards in chain order.

use super::Context;
use super::chain::write_numbered;
use crate::output::{pretty_kv, pretty_rule, render_mode};
use anyhow::Result;
use chainboard_core::{BoardSnapshot, ContainerId};
use clap::Args;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Project id.
    pub project: i64,
}

fn write_text(snapshot: &BoardSnapshot, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}\t{}", snapshot.project.id, snapshot.project.name)?;
    for column in &snapshot.columns {
        writeln!(w, "{}\t{}", column.state.id, column.state.name)?;
        for task in &column.tasks {
            writeln!(w, "\t{}\t{}", task.id, task.name)?;
        }
    }
    Ok(())
}

fn write_pretty(snapshot: &BoardSnapshot, w: &mut dyn Write) -> io::Result<()> {
    pretty_kv(w, "Project", format!("{} [{}]", snapshot.project.name, snapshot.project.id))?;
    let tasks: usize = snapshot.columns.iter().map(|c| c.tasks.len()).sum();
    pretty_kv(
        w,
        "Size",
        format!("{} states, {tasks} tasks", snapshot.columns.len()),
    )?;
    for column in &snapshot.columns {
        writeln!(w)?;
        writeln!(w, "{} [{}]", column.state.name, column.state.id)?;
        pretty_rule(w)?;
        write_numbered(w, &column.tasks)?;
    }
    Ok(())
}

/// Execute `cb show`.
///
/// # Errors
///
/// Returns an error if the project does not exist or a chain fails its
/// integrity check while being read.
pub fn run_show(args: &ShowArgs, ctx: &Context) -> Result<()> {
    let board = ctx.open_board()?;
    let snapshot = board.board_snapshot(ContainerId(args.project))?;
    render_mode(
        ctx.output,
        &snapshot,
        |s, w| write_text(s, w),
        |s, w| write_pretty(s, w),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainboard_core::{Column, Node, NodeId, Project};

    fn node(id: i64, container: i64, name: &str) -> Node {
        Node {
            id: NodeId(id),
            container_id: ContainerId(container),
            name: name.into(),
            left: None,
            right: None,
            created_at_us: 0,
            assignee: None,
        }
    }

    fn snapshot() -> BoardSnapshot {
        BoardSnapshot {
            project: Project {
                id: ContainerId(1),
                name: "Site".into(),
                created_at_us: 0,
            },
            columns: vec![
                Column {
                    state: node(1, 1, "Todo"),
                    tasks: vec![node(1, 1, "Copy")],
                },
                Column {
                    state: node(2, 1, "Done"),
                    tasks: vec![],
                },
            ],
        }
    }

    #[test]
    fn text_rows_indent_tasks_under_states() {
        let mut buf = Vec::new();
        write_text(&snapshot(), &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "1\tSite\n1\tTodo\n\t1\tCopy\n2\tDone\n"
        );
    }

    #[test]
    fn pretty_output_summarizes_board() {
        let mut buf = Vec::new();
        write_pretty(&snapshot(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Site [1]"));
        assert!(text.contains("2 states, 1 tasks"));
        assert!(text.contains("    1. [1] Copy"));
        assert!(text.contains("  (empty)"));
    }
}
