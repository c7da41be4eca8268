//! Per-node CRUD over the two chain tables.
//!
//! [`NodeStore`] is the persistence gateway the engine talks to. It knows
//! nothing about ordering rules: it loads and saves individual rows by id and
//! lists a container's members. Callers are expected to hold a transaction
//! (a `rusqlite::Transaction` derefs to the `Connection` taken here).

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{EngineError, Missing, Result};
use crate::model::{ChainKind, ContainerId, Node, NodeId};

/// Gateway for one chain kind.
#[derive(Clone, Copy)]
pub struct NodeStore<'conn> {
    conn: &'conn Connection,
    kind: ChainKind,
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        id: NodeId(row.get(0)?),
        container_id: ContainerId(row.get(1)?),
        name: row.get(2)?,
        left: row.get::<_, Option<i64>>(3)?.map(NodeId),
        right: row.get::<_, Option<i64>>(4)?.map(NodeId),
        created_at_us: row.get(5)?,
        assignee: row.get(6)?,
    })
}

impl<'conn> NodeStore<'conn> {
    #[must_use]
    pub const fn new(conn: &'conn Connection, kind: ChainKind) -> Self {
        Self { conn, kind }
    }

    #[must_use]
    pub const fn kind(&self) -> ChainKind {
        self.kind
    }

    fn select_sql(&self, filter: &str) -> String {
        format!(
            "SELECT id, {container}, name, left_id, right_id, created_at_us, {assignee}
             FROM {table} {filter}",
            container = self.kind.container_column(),
            assignee = self.kind.assignee_column().unwrap_or("NULL"),
            table = self.kind.table(),
        )
    }

    /// Load one node, or `None` if the id does not exist.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub fn load(&self, id: NodeId) -> Result<Option<Node>> {
        let node = self
            .conn
            .query_row(&self.select_sql("WHERE id = ?1"), params![id.0], node_from_row)
            .optional()?;
        Ok(node)
    }

    /// Load one node, failing with `NotFound` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a storage error.
    pub fn require(&self, id: NodeId) -> Result<Node> {
        self.load(id)?
            .ok_or(EngineError::NotFound(Missing::Node(self.kind, id)))
    }

    /// All nodes in `container`, ordered by id (not by chain position).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub fn members(&self, container: ContainerId) -> Result<Vec<Node>> {
        let sql = self.select_sql(&format!(
            "WHERE {} = ?1 ORDER BY id",
            self.kind.container_column()
        ));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![container.0], node_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Whether the container row (project or task state) exists.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub fn container_exists(&self, container: ContainerId) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)",
            self.kind.container_table()
        );
        let exists = self
            .conn
            .query_row(&sql, params![container.0], |row| row.get(0))?;
        Ok(exists)
    }

    /// Fail with `NotFound` unless the container exists.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a storage error.
    pub fn require_container(&self, container: ContainerId) -> Result<()> {
        if self.container_exists(container)? {
            Ok(())
        } else {
            Err(EngineError::NotFound(Missing::Container(self.kind, container)))
        }
    }

    /// Ids of every container of this kind, including empty ones.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub fn container_ids(&self) -> Result<Vec<ContainerId>> {
        let sql = format!("SELECT id FROM {} ORDER BY id", self.kind.container_table());
        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0).map(ContainerId))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Insert a detached node (both neighbor references NULL).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the insert fails.
    pub fn insert(&self, container: ContainerId, name: &str, now_us: i64) -> Result<Node> {
        let sql = format!(
            "INSERT INTO {table} ({container}, name, left_id, right_id, created_at_us)
             VALUES (?1, ?2, NULL, NULL, ?3)",
            table = self.kind.table(),
            container = self.kind.container_column(),
        );
        self.conn.execute(&sql, params![container.0, name, now_us])?;
        Ok(Node {
            id: NodeId(self.conn.last_insert_rowid()),
            container_id: container,
            name: name.to_string(),
            left: None,
            right: None,
            created_at_us: now_us,
            assignee: None,
        })
    }

    /// Persist a node's container and neighbor references.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the row vanished, or a storage error.
    pub fn save_links(&self, node: &Node) -> Result<()> {
        let sql = format!(
            "UPDATE {table} SET {container} = ?1, left_id = ?2, right_id = ?3 WHERE id = ?4",
            table = self.kind.table(),
            container = self.kind.container_column(),
        );
        let changed = self.conn.execute(
            &sql,
            params![
                node.container_id.0,
                node.left.map(|id| id.0),
                node.right.map(|id| id.0),
                node.id.0
            ],
        )?;
        self.expect_one(changed, node.id)
    }

    /// Persist a new name. Ordering is untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the row vanished, or a storage error.
    pub fn rename(&self, id: NodeId, name: &str) -> Result<()> {
        let sql = format!("UPDATE {} SET name = ?1 WHERE id = ?2", self.kind.table());
        let changed = self.conn.execute(&sql, params![name, id.0])?;
        self.expect_one(changed, id)
    }

    /// Persist a new assignee, or clear it with `None`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for a kind that cannot be assigned,
    /// `NotFound` if the row vanished, or a storage error.
    pub fn set_assignee(&self, id: NodeId, assignee: Option<&str>) -> Result<()> {
        let column = self.assignable_column()?;
        let sql = format!("UPDATE {} SET {column} = ?1 WHERE id = ?2", self.kind.table());
        let changed = self.conn.execute(&sql, params![assignee, id.0])?;
        self.expect_one(changed, id)
    }

    /// Every node assigned to `assignee`, ordered by container then id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for a kind that cannot be assigned, or a
    /// storage error.
    pub fn assigned_to(&self, assignee: &str) -> Result<Vec<Node>> {
        let column = self.assignable_column()?;
        let sql = self.select_sql(&format!(
            "WHERE {column} = ?1 ORDER BY {}, id",
            self.kind.container_column()
        ));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![assignee], node_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn assignable_column(&self) -> Result<&'static str> {
        self.kind.assignee_column().ok_or_else(|| {
            EngineError::invalid(format!("a {} cannot be assigned", self.kind.node_label()))
        })
    }

    /// Delete a node's row. Neighbors must already be restitched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the row vanished, or a storage error.
    pub fn delete(&self, id: NodeId) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", self.kind.table());
        let changed = self.conn.execute(&sql, params![id.0])?;
        self.expect_one(changed, id)
    }

    fn expect_one(&self, changed: usize, id: NodeId) -> Result<()> {
        if changed == 1 {
            Ok(())
        } else {
            Err(EngineError::NotFound(Missing::Node(self.kind, id)))
        }
    }
}
