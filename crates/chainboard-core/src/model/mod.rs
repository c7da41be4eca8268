//! Plain value records shared by the engine, the store, and callers.

pub mod history;
pub mod node;

use serde::{Deserialize, Serialize};

pub use history::{ChangeType, HistoryEntry, HistoryField};
pub use node::{ChainKind, ContainerId, Node, NodeId, ParseEnumError};

/// Identity of a project; projects are the containers of task states.
pub type ProjectId = ContainerId;

/// A project row. Projects are not ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub created_at_us: i64,
}

/// A task state with its tasks, both in chain order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub state: Node,
    pub tasks: Vec<Node>,
}

/// Read model of a whole project board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub project: Project,
    pub columns: Vec<Column>,
}
