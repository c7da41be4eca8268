//! Caller identity and the permission seam.
//!
//! Every mutating [`Board`](crate::engine::Board) call takes an explicit
//! [`Actor`]. There is no ambient "current user"; the CLI resolves one from
//! flags, environment, or config and passes it down.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::model::{ChainKind, ContainerId, NodeId};

/// Who is making a change. Recorded on every history row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor {
    name: String,
}

impl Actor {
    /// Build an actor from a non-blank name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if `name` is blank.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(EngineError::invalid("actor name must not be blank"));
        }
        Ok(Self {
            name: trimmed.to_string(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Mutations subject to a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Rename,
    Move,
    Transfer,
    Assign,
    Remove,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Rename => "rename",
            Self::Move => "move",
            Self::Transfer => "transfer",
            Self::Assign => "assign",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an action applies to. Known before anything is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// A project, or the project list when creating one.
    Project(Option<ContainerId>),
    /// A container receiving a new or transferred node.
    Container {
        kind: ChainKind,
        container: ContainerId,
    },
    Node {
        kind: ChainKind,
        id: NodeId,
    },
}

/// Permission check consulted before any mutation reads or writes.
///
/// Implementations return `Err(EngineError::PermissionDenied(..))` to refuse.
pub trait Permissions: Send + Sync {
    /// Decide whether `actor` may perform `action` on `scope`.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when the action is refused.
    fn check(&self, actor: &Actor, action: Action, scope: Scope) -> Result<()>;
}

/// Grants everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Permissions for AllowAll {
    fn check(&self, _actor: &Actor, _action: Action, _scope: Scope) -> Result<()> {
        Ok(())
    }
}

/// Grants only the listed actions. Useful for tests and for restricted
/// front ends.
#[derive(Debug, Clone, Default)]
pub struct AllowOnly {
    allowed: Vec<Action>,
}

impl AllowOnly {
    #[must_use]
    pub fn new(allowed: impl IntoIterator<Item = Action>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

impl Permissions for AllowOnly {
    fn check(&self, actor: &Actor, action: Action, _scope: Scope) -> Result<()> {
        if self.allowed.contains(&action) {
            Ok(())
        } else {
            Err(EngineError::PermissionDenied(format!(
                "{actor} may not {action}"
            )))
        }
    }
}
