//! Audit trail storage.
//!
//! Rows are keyed by `(kind, node_id)` without a foreign key, so the trail of
//! a removed node survives its deletion.

use rusqlite::{Connection, Row, params};

use crate::error::Result;
use crate::model::{ChainKind, ChangeType, HistoryEntry, HistoryField, NodeId};

/// A history row that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistory<'a> {
    pub kind: ChainKind,
    pub node_id: NodeId,
    pub actor: &'a str,
    pub change: ChangeType,
    pub field: Option<HistoryField>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Append one audit row.
///
/// # Errors
///
/// Returns a storage error if the insert fails.
pub fn record(conn: &Connection, entry: &NewHistory<'_>, now_us: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO node_history (
            kind, node_id, actor, change_type, field_name, old_value, new_value, changed_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.kind.as_str(),
            entry.node_id.0,
            entry.actor,
            entry.change.as_str(),
            entry.field.map(HistoryField::as_str),
            entry.old_value,
            entry.new_value,
            now_us,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn conversion_error(col: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(err))
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let kind: String = row.get(1)?;
    let change: String = row.get(4)?;
    let field: Option<String> = row.get(5)?;

    Ok(HistoryEntry {
        id: row.get(0)?,
        kind: kind.parse().map_err(|e| conversion_error(1, e))?,
        node_id: NodeId(row.get(2)?),
        actor: row.get(3)?,
        change: change.parse().map_err(|e| conversion_error(4, e))?,
        field: field
            .map(|f| f.parse::<HistoryField>())
            .transpose()
            .map_err(|e| conversion_error(5, e))?,
        old_value: row.get(6)?,
        new_value: row.get(7)?,
        changed_at_us: row.get(8)?,
    })
}

/// Audit rows for one node, oldest first.
///
/// # Errors
///
/// Returns a storage error if the query fails or a row cannot be decoded.
pub fn list_for_node(conn: &Connection, kind: ChainKind, node_id: NodeId) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, node_id, actor, change_type, field_name, old_value, new_value, changed_at_us
         FROM node_history
         WHERE kind = ?1 AND node_id = ?2
         ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![kind.as_str(), node_id.0], entry_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
