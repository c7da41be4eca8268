use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::node::{ChainKind, NodeId, ParseEnumError};

/// Change categories recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Edit,
    Delete,
}

impl ChangeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            _ => Err(ParseEnumError {
                expected: "change type",
                got: s.to_string(),
            }),
        }
    }
}

/// Which attribute an `edit` touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryField {
    Name,
    Position,
    Container,
    Assignee,
}

impl HistoryField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Position => "position",
            Self::Container => "container",
            Self::Assignee => "assignee",
        }
    }
}

impl fmt::Display for HistoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryField {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "position" => Ok(Self::Position),
            "container" => Ok(Self::Container),
            "assignee" => Ok(Self::Assignee),
            _ => Err(ParseEnumError {
                expected: "history field",
                got: s.to_string(),
            }),
        }
    }
}

/// A single audit row written after a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub kind: ChainKind,
    pub node_id: NodeId,
    pub actor: String,
    pub change: ChangeType,
    pub field: Option<HistoryField>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at_us: i64,
}
