//! The [`Board`] facade: every public operation on projects, task states,
//! and tasks.
//!
//! # Transactions
//!
//! Each mutation runs as one `BEGIN IMMEDIATE` transaction:
//!
//! 1. permission check (no I/O)
//! 2. name validation (no I/O)
//! 3. load the node and every member of the containers involved into a
//!    [`WorkingSet`]
//! 4. guards (not found, cross container, name conflict, self reference)
//! 5. plan pointer changes on the arena
//! 6. verify every touched container
//! 7. flush dirty nodes, write the audit row, commit
//!
//! Any error drops the transaction, which rolls back. Nothing partial is
//! ever visible to another connection. Reads run on a deferred transaction so
//! multi-query reads see one WAL snapshot.

use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::access::{Action, Actor, AllowAll, Permissions, Scope};
use crate::chain::{self, MoveOutcome, TransferOutcome, WorkingSet};
use crate::db::history::{self, NewHistory};
use crate::db::nodes::NodeStore;
use crate::db::{self, now_us, projects};
use crate::error::{EngineError, Result};
use crate::model::{
    BoardSnapshot, ChainKind, ChangeType, Column, ContainerId, HistoryEntry, HistoryField, Node,
    NodeId, Project, ProjectId,
};
use crate::naming::{ensure_unique, same_name, validate_name};
use crate::verify::{self, VerifyReport};

/// A handle on one board database.
///
/// `Board` owns its connection. Give each thread its own `Board`; SQLite's
/// write lock serialises their mutations.
pub struct Board {
    conn: Connection,
    permissions: Box<dyn Permissions>,
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board").finish_non_exhaustive()
    }
}

/// What [`Board::move_after`] did, and where the node sits once the move
/// committed. Both are read in the move's own transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub outcome: MoveOutcome,
    pub node: Node,
}

impl Placement {
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.outcome.changed()
    }
}

fn position_value(left: Option<NodeId>) -> Option<String> {
    left.map(|id| id.to_string())
}

impl Board {
    /// Open (or create) the board database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path, busy_timeout: Duration) -> anyhow::Result<Self> {
        let conn = db::open_store(path, busy_timeout)
            .with_context(|| format!("open board at {}", path.display()))?;
        Ok(Self::from_connection(conn))
    }

    /// A private in-memory board.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::from_connection(db::open_in_memory()?))
    }

    /// Wrap an already-migrated connection.
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            permissions: Box::new(AllowAll),
        }
    }

    /// Replace the permission policy.
    #[must_use]
    pub fn with_permissions(mut self, permissions: impl Permissions + 'static) -> Self {
        self.permissions = Box::new(permissions);
        self
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    fn authorize(&self, actor: &Actor, action: Action, scope: Scope) -> Result<()> {
        self.permissions.check(actor, action, scope).inspect_err(|_| {
            warn!(actor = %actor, action = %action, ?scope, "permission denied");
        })
    }

    fn write<T>(&mut self, op: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = op(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    fn read<T>(&self, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = op(&*tx)?;
        tx.finish()?;
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    /// Create a project with a unique (case-insensitive) name.
    ///
    /// # Errors
    ///
    /// `PermissionDenied`, `InvalidOperation` for a blank name,
    /// `NameConflict`, or a storage error.
    pub fn create_project(&mut self, actor: &Actor, name: &str) -> Result<Project> {
        self.authorize(actor, Action::Create, Scope::Project(None))?;
        let name = validate_name(name)?;

        let project = self.write(|tx| {
            if projects::list_projects(tx)?
                .iter()
                .any(|p| same_name(&p.name, &name))
            {
                return Err(EngineError::ProjectNameConflict(name.clone()));
            }
            projects::insert_project(tx, &name, now_us())
        })?;
        info!(project = %project.id, name = %project.name, actor = %actor, "created project");
        Ok(project)
    }

    /// Rename a project.
    ///
    /// # Errors
    ///
    /// `PermissionDenied`, `InvalidOperation`, `NotFound`, `NameConflict`,
    /// or a storage error.
    pub fn rename_project(&mut self, actor: &Actor, id: ProjectId, name: &str) -> Result<Project> {
        self.authorize(actor, Action::Rename, Scope::Project(Some(id)))?;
        let name = validate_name(name)?;

        let project = self.write(|tx| {
            let mut project = projects::get_project(tx, id)?;
            if projects::list_projects(tx)?
                .iter()
                .any(|p| p.id != id && same_name(&p.name, &name))
            {
                return Err(EngineError::ProjectNameConflict(name.clone()));
            }
            projects::rename_project(tx, id, &name)?;
            project.name.clone_from(&name);
            Ok(project)
        })?;
        info!(project = %id, name = %project.name, actor = %actor, "renamed project");
        Ok(project)
    }

    /// Delete a project with all of its task states and tasks.
    ///
    /// # Errors
    ///
    /// `PermissionDenied`, `NotFound`, or a storage error.
    pub fn delete_project(&mut self, actor: &Actor, id: ProjectId) -> Result<Project> {
        self.authorize(actor, Action::Remove, Scope::Project(Some(id)))?;

        let (project, states, tasks) = self.write(|tx| {
            let project = projects::get_project(tx, id)?;
            let state_store = NodeStore::new(tx, ChainKind::TaskState);
            let task_store = NodeStore::new(tx, ChainKind::Task);
            let states = state_store.members(id)?;
            let mut tasks = 0_usize;
            for state in &states {
                for task in task_store.members(state.id.into())? {
                    record_delete(tx, actor, ChainKind::Task, &task)?;
                    tasks += 1;
                }
                record_delete(tx, actor, ChainKind::TaskState, state)?;
            }
            projects::delete_project(tx, id)?;
            Ok((project, states.len(), tasks))
        })?;
        warn!(project = %id, states, tasks, actor = %actor, "deleted project");
        Ok(project)
    }

    /// All projects, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.read(projects::list_projects)
    }

    /// One project by id.
    ///
    /// # Errors
    ///
    /// `NotFound` or a storage error.
    pub fn get_project(&self, id: ProjectId) -> Result<Project> {
        self.read(|conn| projects::get_project(conn, id))
    }

    // -----------------------------------------------------------------------
    // Chain mutations
    // -----------------------------------------------------------------------

    /// Create a node named `name` at the tail of `container`.
    ///
    /// # Errors
    ///
    /// `PermissionDenied`, `InvalidOperation` for a blank name, `NotFound`
    /// for a missing container, `NameConflict`, `IntegrityViolation`, or a
    /// storage error.
    pub fn create_and_append(
        &mut self,
        actor: &Actor,
        kind: ChainKind,
        container: ContainerId,
        name: &str,
    ) -> Result<Node> {
        self.authorize(actor, Action::Create, Scope::Container { kind, container })?;
        let name = validate_name(name)?;

        let node = self.write(|tx| {
            let store = NodeStore::new(tx, kind);
            store.require_container(container)?;

            let mut ws = WorkingSet::new(kind);
            ws.load_container(&store, container)?;
            ensure_unique(kind, container, ws.members(container), &name, None)?;

            let now = now_us();
            let inserted = store.insert(container, &name, now)?;
            let id = inserted.id;
            ws.extend([inserted]);
            chain::append(&mut ws, id)?;
            ws.check(container)?;
            ws.flush(&store)?;

            history::record(
                tx,
                &NewHistory {
                    kind,
                    node_id: id,
                    actor: actor.name(),
                    change: ChangeType::Create,
                    field: None,
                    old_value: None,
                    new_value: Some(name.clone()),
                },
                now,
            )?;
            Ok(ws.node(id)?.clone())
        })?;
        info!(
            kind = %kind,
            id = %node.id,
            container = %container,
            actor = %actor,
            "appended"
        );
        Ok(node)
    }

    /// Rename a node. Ordering is untouched.
    ///
    /// # Errors
    ///
    /// `PermissionDenied`, `InvalidOperation`, `NotFound`, `NameConflict`,
    /// or a storage error.
    pub fn rename(&mut self, actor: &Actor, kind: ChainKind, id: NodeId, name: &str) -> Result<Node> {
        self.authorize(actor, Action::Rename, Scope::Node { kind, id })?;
        let name = validate_name(name)?;

        let (node, changed) = self.write(|tx| {
            let store = NodeStore::new(tx, kind);
            let mut node = store.require(id)?;
            if node.name == name {
                return Ok((node, false));
            }
            let members = store.members(node.container_id)?;
            ensure_unique(kind, node.container_id, &members, &name, Some(id))?;

            store.rename(id, &name)?;
            history::record(
                tx,
                &NewHistory {
                    kind,
                    node_id: id,
                    actor: actor.name(),
                    change: ChangeType::Edit,
                    field: Some(HistoryField::Name),
                    old_value: Some(node.name.clone()),
                    new_value: Some(name.clone()),
                },
                now_us(),
            )?;
            node.name.clone_from(&name);
            Ok((node, true))
        })?;
        if changed {
            info!(kind = %kind, id = %id, actor = %actor, "renamed");
        } else {
            debug!(kind = %kind, id = %id, "rename to same name");
        }
        Ok(node)
    }

    /// Place `id` directly after `after`, or at the head when `after` is
    /// `None`.
    ///
    /// Moving a node to where it already is returns
    /// [`MoveOutcome::Unchanged`] and writes nothing. The returned
    /// [`Placement`] carries the node as committed by this call.
    ///
    /// # Errors
    ///
    /// `PermissionDenied`, `NotFound`, `InvalidOperation` (self target),
    /// `CrossContainerViolation`, `IntegrityViolation`, `LockContention`, or
    /// a storage error.
    pub fn move_after(
        &mut self,
        actor: &Actor,
        kind: ChainKind,
        id: NodeId,
        after: Option<NodeId>,
    ) -> Result<Placement> {
        self.authorize(actor, Action::Move, Scope::Node { kind, id })?;

        let placement = self.write(|tx| {
            let store = NodeStore::new(tx, kind);
            let node = store.require(id)?;
            let container = node.container_id;

            let mut ws = WorkingSet::new(kind);
            ws.extend([node]);
            ws.load_container(&store, container)?;
            if let Some(target) = after.filter(|t| *t != id && ws.get(*t).is_none()) {
                // Not a member here: load it so a foreign target is reported
                // as such rather than as missing.
                ws.extend(store.load(target)?);
            }

            let outcome = chain::move_after(&mut ws, id, after)?;
            if let MoveOutcome::Moved { old_left, new_left } = outcome {
                ws.check(container)?;
                ws.flush(&store)?;
                history::record(
                    tx,
                    &NewHistory {
                        kind,
                        node_id: id,
                        actor: actor.name(),
                        change: ChangeType::Edit,
                        field: Some(HistoryField::Position),
                        old_value: position_value(old_left),
                        new_value: position_value(new_left),
                    },
                    now_us(),
                )?;
            }
            Ok(Placement {
                outcome,
                node: ws.node(id)?.clone(),
            })
        })?;

        match placement.outcome {
            MoveOutcome::Moved { old_left, new_left } => info!(
                kind = %kind,
                id = %id,
                ?old_left,
                ?new_left,
                actor = %actor,
                "moved"
            ),
            MoveOutcome::Unchanged => debug!(kind = %kind, id = %id, "move is a no-op"),
        }
        Ok(placement)
    }

    /// Delete a node, joining its neighbors. Removing a task state also
    /// removes its tasks.
    ///
    /// # Errors
    ///
    /// `PermissionDenied`, `NotFound`, `IntegrityViolation`, or a storage
    /// error.
    pub fn remove(&mut self, actor: &Actor, kind: ChainKind, id: NodeId) -> Result<Node> {
        self.authorize(actor, Action::Remove, Scope::Node { kind, id })?;

        let removed = self.write(|tx| {
            let store = NodeStore::new(tx, kind);
            let node = store.require(id)?;
            let container = node.container_id;

            let mut ws = WorkingSet::new(kind);
            ws.extend([node]);
            ws.load_container(&store, container)?;

            let removed = chain::remove(&mut ws, id)?;
            ws.check(container)?;
            ws.flush(&store)?;

            if kind == ChainKind::TaskState {
                for task in NodeStore::new(tx, ChainKind::Task).members(id.into())? {
                    record_delete(tx, actor, ChainKind::Task, &task)?;
                }
            }
            store.delete(id)?;
            record_delete(tx, actor, kind, &removed)?;
            Ok(removed)
        })?;
        warn!(kind = %kind, id = %id, name = %removed.name, actor = %actor, "removed");
        Ok(removed)
    }

    /// Move `id` to the tail of another container.
    ///
    /// The permission policy sees both the node and the destination
    /// container.
    ///
    /// # Errors
    ///
    /// `PermissionDenied`, `NotFound` for the node or destination,
    /// `NameConflict` in the destination, `IntegrityViolation`, or a storage
    /// error.
    pub fn transfer_container(
        &mut self,
        actor: &Actor,
        kind: ChainKind,
        id: NodeId,
        dest: ContainerId,
    ) -> Result<TransferOutcome> {
        self.authorize(actor, Action::Transfer, Scope::Node { kind, id })?;
        self.authorize(
            actor,
            Action::Transfer,
            Scope::Container {
                kind,
                container: dest,
            },
        )?;

        let outcome = self.write(|tx| {
            let store = NodeStore::new(tx, kind);
            let node = store.require(id)?;
            store.require_container(dest)?;
            let from = node.container_id;
            if from == dest {
                return Ok(TransferOutcome::Unchanged);
            }

            let mut ws = WorkingSet::new(kind);
            ws.extend([node]);
            ws.load_container(&store, from)?;
            ws.load_container(&store, dest)?;
            let name = ws.node(id)?.name.clone();
            ensure_unique(kind, dest, ws.members(dest), &name, Some(id))?;

            let outcome = chain::transfer(&mut ws, id, dest)?;
            ws.check(from)?;
            ws.check(dest)?;
            ws.flush(&store)?;
            history::record(
                tx,
                &NewHistory {
                    kind,
                    node_id: id,
                    actor: actor.name(),
                    change: ChangeType::Edit,
                    field: Some(HistoryField::Container),
                    old_value: Some(from.to_string()),
                    new_value: Some(dest.to_string()),
                },
                now_us(),
            )?;
            Ok(outcome)
        })?;

        match outcome {
            TransferOutcome::Transferred { from, to } => info!(
                kind = %kind,
                id = %id,
                from = %from,
                to = %to,
                actor = %actor,
                "transferred"
            ),
            TransferOutcome::Unchanged => {
                debug!(kind = %kind, id = %id, "transfer to own container is a no-op");
            }
        }
        Ok(outcome)
    }

    /// Assign a task to `assignee`, or unassign it with `None`.
    ///
    /// Assigning the current assignee again writes nothing.
    ///
    /// # Errors
    ///
    /// `PermissionDenied`, `NotFound`, or a storage error.
    pub fn assign(&mut self, actor: &Actor, id: NodeId, assignee: Option<&Actor>) -> Result<Node> {
        let kind = ChainKind::Task;
        self.authorize(actor, Action::Assign, Scope::Node { kind, id })?;
        let assignee = assignee.map(Actor::name);

        let (node, changed) = self.write(|tx| {
            let store = NodeStore::new(tx, kind);
            let mut node = store.require(id)?;
            if node.assignee.as_deref() == assignee {
                return Ok((node, false));
            }

            store.set_assignee(id, assignee)?;
            history::record(
                tx,
                &NewHistory {
                    kind,
                    node_id: id,
                    actor: actor.name(),
                    change: ChangeType::Edit,
                    field: Some(HistoryField::Assignee),
                    old_value: node.assignee.take(),
                    new_value: assignee.map(str::to_string),
                },
                now_us(),
            )?;
            node.assignee = assignee.map(str::to_string);
            Ok((node, true))
        })?;
        if changed {
            info!(id = %id, assignee = ?node.assignee, actor = %actor, "assigned");
        } else {
            debug!(id = %id, "assignee unchanged");
        }
        Ok(node)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Tasks assigned to `assignee`, grouped by task state.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub fn assigned_tasks(&self, assignee: &Actor) -> Result<Vec<Node>> {
        self.read(|conn| NodeStore::new(conn, ChainKind::Task).assigned_to(assignee.name()))
    }

    /// One node by id.
    ///
    /// # Errors
    ///
    /// `NotFound` or a storage error.
    pub fn get(&self, kind: ChainKind, id: NodeId) -> Result<Node> {
        self.read(|conn| NodeStore::new(conn, kind).require(id))
    }

    /// Members of `container`, head to tail.
    ///
    /// Each call re-reads from the head.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing container, `IntegrityViolation` for a
    /// corrupt chain, or a storage error.
    pub fn list_in_order(&self, kind: ChainKind, container: ContainerId) -> Result<Vec<Node>> {
        self.read(|conn| ordered_members(conn, kind, container))
    }

    /// The head of `container`, if it has any members.
    ///
    /// # Errors
    ///
    /// `NotFound`, `IntegrityViolation` when several heads exist, or a
    /// storage error.
    pub fn head(&self, kind: ChainKind, container: ContainerId) -> Result<Option<Node>> {
        self.read(|conn| {
            let store = NodeStore::new(conn, kind);
            store.require_container(container)?;
            let members = store.members(container)?;
            Ok(chain::find_head(kind, container, &members)?.cloned())
        })
    }

    /// The tail of `container`, if it has any members.
    ///
    /// # Errors
    ///
    /// `NotFound`, `IntegrityViolation` when several tails exist, or a
    /// storage error.
    pub fn tail(&self, kind: ChainKind, container: ContainerId) -> Result<Option<Node>> {
        self.read(|conn| {
            let store = NodeStore::new(conn, kind);
            store.require_container(container)?;
            let members = store.members(container)?;
            Ok(chain::find_tail(kind, container, &members)?.cloned())
        })
    }

    /// A project with its task states and their tasks, all in chain order.
    ///
    /// # Errors
    ///
    /// `NotFound`, `IntegrityViolation`, or a storage error.
    pub fn board_snapshot(&self, project: ProjectId) -> Result<BoardSnapshot> {
        self.read(|conn| {
            let project = projects::get_project(conn, project)?;
            let columns = ordered_members(conn, ChainKind::TaskState, project.id)?
                .into_iter()
                .map(|state| {
                    let tasks = ordered_members(conn, ChainKind::Task, state.id.into())?;
                    Ok(Column { state, tasks })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(BoardSnapshot { project, columns })
        })
    }

    /// Audit trail of one node, oldest first. Survives the node's removal.
    ///
    /// # Errors
    ///
    /// `NotFound` when the node never existed, or a storage error.
    pub fn history(&self, kind: ChainKind, id: NodeId) -> Result<Vec<HistoryEntry>> {
        self.read(|conn| {
            let entries = history::list_for_node(conn, kind, id)?;
            if entries.is_empty() {
                NodeStore::new(conn, kind).require(id)?;
            }
            Ok(entries)
        })
    }

    /// Check every chain in the store.
    ///
    /// # Errors
    ///
    /// Returns a storage error if reading fails. Violations are reported in
    /// the returned [`VerifyReport`], not as errors.
    pub fn verify(&self) -> Result<VerifyReport> {
        self.read(verify::verify_store)
    }
}

fn ordered_members(conn: &Connection, kind: ChainKind, container: ContainerId) -> Result<Vec<Node>> {
    let store = NodeStore::new(conn, kind);
    store.require_container(container)?;
    chain::order_chain(kind, container, store.members(container)?)
}

fn record_delete(tx: &Connection, actor: &Actor, kind: ChainKind, node: &Node) -> Result<()> {
    history::record(
        tx,
        &NewHistory {
            kind,
            node_id: node.id,
            actor: actor.name(),
            change: ChangeType::Delete,
            field: None,
            old_value: Some(node.name.clone()),
            new_value: None,
        },
        now_us(),
    )?;
    Ok(())
}
