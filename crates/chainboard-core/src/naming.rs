//! Name validation for projects, task states, and tasks.
//!
//! Names are trimmed before storage. Uniqueness is scoped to one container
//! and compared case-insensitively, so "Done" and "done" collide. The
//! `lower(name)` unique indexes in the schema back this up, but only for
//! ASCII; the check here uses full Unicode lowercasing.

use crate::error::{EngineError, Result};
use crate::model::{ChainKind, ContainerId, Node, NodeId};

/// Upper bound on a stored name, in characters.
pub const MAX_NAME_CHARS: usize = 200;

/// Trim `raw` and reject blank or oversized names.
///
/// # Errors
///
/// Returns `InvalidOperation` for a blank name or one longer than
/// [`MAX_NAME_CHARS`].
pub fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(EngineError::invalid("name must not be blank"));
    }
    let chars = name.chars().count();
    if chars > MAX_NAME_CHARS {
        return Err(EngineError::invalid(format!(
            "name is {chars} characters; the limit is {MAX_NAME_CHARS}"
        )));
    }
    Ok(name.to_string())
}

/// Case-insensitive name equality.
#[must_use]
pub fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Fail if another member of `container` already uses `name`.
///
/// `except` is the node being renamed or transferred; its own current name
/// never conflicts.
///
/// # Errors
///
/// Returns `NameConflict` naming the container.
pub fn ensure_unique<'a>(
    kind: ChainKind,
    container: ContainerId,
    members: impl IntoIterator<Item = &'a Node>,
    name: &str,
    except: Option<NodeId>,
) -> Result<()> {
    let clash = members
        .into_iter()
        .any(|n| Some(n.id) != except && same_name(&n.name, name));
    if clash {
        tracing::debug!(kind = %kind, container = %container, name, "name conflict");
        Err(EngineError::NameConflict {
            kind,
            container,
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn named(id: i64, name: &str) -> Node {
        Node {
            id: NodeId(id),
            container_id: ContainerId(1),
            name: name.to_string(),
            left: None,
            right: None,
            created_at_us: 0,
            assignee: None,
        }
    }

    #[test]
    fn names_are_trimmed() {
        assert_eq!(validate_name("  In review \n").expect("valid"), "In review");
    }

    #[test]
    fn blank_names_are_invalid() {
        for raw in ["", "   ", "\t\n"] {
            let err = validate_name(raw).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidOperation, "{raw:?}");
        }
    }

    #[test]
    fn oversized_names_are_invalid() {
        let long = "x".repeat(MAX_NAME_CHARS + 1);
        assert!(validate_name(&long).is_err());
        assert!(validate_name(&"é".repeat(MAX_NAME_CHARS)).is_ok());
    }

    #[test]
    fn uniqueness_ignores_case() {
        let members = [named(1, "Todo"), named(2, "Doing")];
        let err = ensure_unique(ChainKind::TaskState, ContainerId(1), &members, "TODO", None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NameConflict);
        assert_eq!(err.to_string(), "task state \"TODO\" already exists in project 1");

        assert!(same_name("ÄRGER", "ärger"));
    }

    #[test]
    fn renaming_to_own_name_is_allowed() {
        let members = [named(1, "Todo"), named(2, "Doing")];
        assert!(
            ensure_unique(ChainKind::TaskState, ContainerId(1), &members, "todo", Some(NodeId(1)))
                .is_ok()
        );
        assert!(
            ensure_unique(ChainKind::TaskState, ContainerId(1), &members, "doing", Some(NodeId(1)))
                .is_err()
        );
    }
}
