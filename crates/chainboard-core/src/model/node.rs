use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Stable identity of an orderable node (a task state or a task).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

/// Identity of the collection a node's order is scoped to: a project for
/// task states, a task state for tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<NodeId> for ContainerId {
    /// A task state is itself the container of its tasks.
    fn from(id: NodeId) -> Self {
        Self(id.0)
    }
}

/// The two chains the engine maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    /// Kanban columns ordered inside a project.
    TaskState,
    /// Cards ordered inside a task state.
    Task,
}

impl ChainKind {
    pub const ALL: [Self; 2] = [Self::TaskState, Self::Task];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskState => "task_state",
            Self::Task => "task",
        }
    }

    pub const fn node_label(self) -> &'static str {
        match self {
            Self::TaskState => "task state",
            Self::Task => "task",
        }
    }

    pub const fn container_label(self) -> &'static str {
        match self {
            Self::TaskState => "project",
            Self::Task => "task state",
        }
    }

    pub(crate) const fn table(self) -> &'static str {
        match self {
            Self::TaskState => "task_states",
            Self::Task => "tasks",
        }
    }

    pub(crate) const fn container_column(self) -> &'static str {
        match self {
            Self::TaskState => "project_id",
            Self::Task => "task_state_id",
        }
    }

    /// Table holding the containers of this kind.
    pub(crate) const fn container_table(self) -> &'static str {
        match self {
            Self::TaskState => "projects",
            Self::Task => "task_states",
        }
    }

    /// Column holding the assignee. Only tasks can be assigned.
    pub(crate) const fn assignee_column(self) -> Option<&'static str> {
        match self {
            Self::TaskState => None,
            Self::Task => Some("assignee"),
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.node_label())
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl FromStr for ChainKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "task_state" | "state" | "column" => Ok(Self::TaskState),
            "task" => Ok(Self::Task),
            _ => Err(ParseEnumError {
                expected: "chain kind",
                got: s.to_string(),
            }),
        }
    }
}

/// One element of an intrusive doubly-linked chain.
///
/// `left` and `right` are non-owning back-references by id. Absent `left`
/// marks the head; absent `right` marks the tail. Only the position mutator
/// rewrites them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub container_id: ContainerId,
    pub name: String,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub created_at_us: i64,
    /// Actor name a task is assigned to. Always `None` for task states.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

impl Node {
    #[must_use]
    pub const fn is_head(&self) -> bool {
        self.left.is_none()
    }

    #[must_use]
    pub const fn is_tail(&self) -> bool {
        self.right.is_none()
    }
}
