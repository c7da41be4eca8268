//! `cb history`: the audit trail of one task state or task.

use super::Context;
use crate::output::{pretty_section, render_mode};
use anyhow::Result;
use chainboard_core::model::ChangeType;
use chainboard_core::{ChainKind, HistoryEntry, NodeId};
use chrono::{DateTime, Local, Utc};
use clap::Args;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Which chain the id belongs to: `state` or `task`.
    pub kind: ChainKind,
    /// Node id. History is kept after the node is removed.
    pub id: i64,
}

fn micros_to_local_datetime(us: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(us)
        .map(|ts| {
            ts.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| us.to_string())
}

/// One-line description of a history row.
fn describe(entry: &HistoryEntry) -> String {
    let old = entry.old_value.as_deref().unwrap_or("-");
    let new = entry.new_value.as_deref().unwrap_or("-");
    match entry.field {
        Some(field) => format!("{} {field}: {old} -> {new}", entry.change),
        None => match entry.change {
            ChangeType::Create => format!("create \"{new}\""),
            ChangeType::Delete => format!("delete \"{old}\""),
            ChangeType::Edit => entry.change.to_string(),
        },
    }
}

fn write_text(entries: &[HistoryEntry], w: &mut dyn Write) -> io::Result<()> {
    for entry in entries {
        writeln!(
            w,
            "{}\t{}\t{}",
            entry.changed_at_us,
            entry.actor,
            describe(entry)
        )?;
    }
    Ok(())
}

/// Execute `cb history`.
///
/// # Errors
///
/// Returns an error if the node never existed or the query fails.
pub fn run_history(args: &HistoryArgs, ctx: &Context) -> Result<()> {
    let board = ctx.open_board()?;
    let entries = board.history(args.kind, NodeId(args.id))?;
    let kind = args.kind;
    render_mode(
        ctx.output,
        &entries,
        |e, w| write_text(e, w),
        |e, w| {
            pretty_section(w, &format!("History of {kind} {}", args.id))?;
            for entry in e {
                writeln!(
                    w,
                    "{}  {:<12} {}",
                    micros_to_local_datetime(entry.changed_at_us),
                    entry.actor,
                    describe(entry)
                )?;
            }
            Ok(())
        },
    )
}
