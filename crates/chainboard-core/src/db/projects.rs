//! Project rows: the unordered top-level containers of task states.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{EngineError, Missing, Result};
use crate::model::{ChainKind, ContainerId, Project, ProjectId};

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: ContainerId(row.get(0)?),
        name: row.get(1)?,
        created_at_us: row.get(2)?,
    })
}

fn missing(id: ProjectId) -> EngineError {
    EngineError::NotFound(Missing::Container(ChainKind::TaskState, id))
}

/// Insert a project row and return it.
///
/// # Errors
///
/// Returns a storage error if the insert fails.
pub fn insert_project(conn: &Connection, name: &str, now_us: i64) -> Result<Project> {
    conn.execute(
        "INSERT INTO projects (name, created_at_us) VALUES (?1, ?2)",
        params![name, now_us],
    )?;
    Ok(Project {
        id: ContainerId(conn.last_insert_rowid()),
        name: name.to_string(),
        created_at_us: now_us,
    })
}

/// Load one project by id.
///
/// # Errors
///
/// Returns `NotFound` or a storage error.
pub fn get_project(conn: &Connection, id: ProjectId) -> Result<Project> {
    conn.query_row(
        "SELECT id, name, created_at_us FROM projects WHERE id = ?1",
        params![id.0],
        project_from_row,
    )
    .optional()?
    .ok_or_else(|| missing(id))
}

/// All projects ordered by id.
///
/// # Errors
///
/// Returns a storage error if the query fails.
pub fn list_projects(conn: &Connection) -> Result<Vec<Project>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at_us FROM projects ORDER BY id")?;
    let rows = stmt
        .query_map([], project_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Set a project's name.
///
/// # Errors
///
/// Returns `NotFound` or a storage error.
pub fn rename_project(conn: &Connection, id: ProjectId, name: &str) -> Result<()> {
    let changed = conn.execute(
        "UPDATE projects SET name = ?1 WHERE id = ?2",
        params![name, id.0],
    )?;
    if changed == 1 { Ok(()) } else { Err(missing(id)) }
}

/// Delete a project. Its task states and their tasks go with it through
/// `ON DELETE CASCADE`; whole chains vanish, so nothing needs restitching.
///
/// # Errors
///
/// Returns `NotFound` or a storage error.
pub fn delete_project(conn: &Connection, id: ProjectId) -> Result<()> {
    let changed = conn.execute("DELETE FROM projects WHERE id = ?1", params![id.0])?;
    if changed == 1 { Ok(()) } else { Err(missing(id)) }
}
