use std::fmt;

use crate::model::{ChainKind, ContainerId, NodeId};

/// Machine-readable error codes for callers that translate engine failures
/// into structured responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotFound,
    InvalidOperation,
    CrossContainerViolation,
    NameConflict,
    PermissionDenied,
    IntegrityViolation,
    LockContention,
    StorageFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotFound => "E2001",
            Self::InvalidOperation => "E2002",
            Self::CrossContainerViolation => "E2003",
            Self::NameConflict => "E2004",
            Self::PermissionDenied => "E2005",
            Self::IntegrityViolation => "E3001",
            Self::LockContention => "E5002",
            Self::StorageFailure => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotFound => "Referenced node or container not found",
            Self::InvalidOperation => "Invalid operation",
            Self::CrossContainerViolation => "Target belongs to a different container",
            Self::NameConflict => "Name already used in this container",
            Self::PermissionDenied => "Permission denied",
            Self::IntegrityViolation => "Chain integrity violation",
            Self::LockContention => "Lock contention",
            Self::StorageFailure => "Storage failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotFound => Some("Check the id with a `list` command."),
            Self::InvalidOperation => None,
            Self::CrossContainerViolation => {
                Some("Move within one container, or use `transfer` to change containers.")
            }
            Self::NameConflict => Some("Pick a name not already used in the same container."),
            Self::PermissionDenied => None,
            Self::IntegrityViolation => {
                Some("Run `cb verify` to locate the corrupted chain; nothing was written.")
            }
            Self::LockContention => Some("Retry after the other writer commits."),
            Self::StorageFailure => Some("Check disk space and database file permissions."),
        }
    }

    /// Snake-case identifier used in JSON error payloads.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidOperation => "invalid_operation",
            Self::CrossContainerViolation => "cross_container_violation",
            Self::NameConflict => "name_conflict",
            Self::PermissionDenied => "permission_denied",
            Self::IntegrityViolation => "integrity_violation",
            Self::LockContention => "lock_contention",
            Self::StorageFailure => "storage_failure",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// What a [`EngineError::NotFound`] was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Node(ChainKind, NodeId),
    Container(ChainKind, ContainerId),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(kind, id) => write!(f, "{} {id}", kind.node_label()),
            Self::Container(kind, id) => write!(f, "{} {id}", kind.container_label()),
        }
    }
}

/// Errors surfaced by the ordering engine and its store.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(Missing),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error(
        "{kind} {node} is in {label} {node_container} but target {target} is in {target_container}",
        label = .kind.container_label()
    )]
    CrossContainerViolation {
        kind: ChainKind,
        node: NodeId,
        node_container: ContainerId,
        target: NodeId,
        target_container: ContainerId,
    },

    #[error("{kind} \"{name}\" already exists in {label} {container}", label = .kind.container_label())]
    NameConflict {
        kind: ChainKind,
        container: ContainerId,
        name: String,
    },

    #[error("project \"{0}\" already exists")]
    ProjectNameConflict(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("integrity violation in {label} {container}: {detail}", label = .kind.container_label())]
    IntegrityViolation {
        kind: ChainKind,
        container: ContainerId,
        detail: String,
    },

    #[error("database is locked by another writer")]
    LockContention(#[source] rusqlite::Error),

    #[error("storage error: {0}")]
    Storage(#[source] rusqlite::Error),
}

impl EngineError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::InvalidOperation(_) => ErrorCode::InvalidOperation,
            Self::CrossContainerViolation { .. } => ErrorCode::CrossContainerViolation,
            Self::NameConflict { .. } | Self::ProjectNameConflict(_) => ErrorCode::NameConflict,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::IntegrityViolation { .. } => ErrorCode::IntegrityViolation,
            Self::LockContention(_) => ErrorCode::LockContention,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }

    /// Remediation hint for this error, when one exists.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidOperation(detail.into())
    }

    pub(crate) fn integrity(
        kind: ChainKind,
        container: ContainerId,
        detail: impl Into<String>,
    ) -> Self {
        let detail = detail.into();
        tracing::error!(
            kind = %kind,
            container = %container,
            detail = %detail,
            "chain integrity violation"
        );
        Self::IntegrityViolation {
            kind,
            container,
            detail,
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
                Self::LockContention(err)
            }
            _ => Self::Storage(err),
        }
    }
}

/// Convenience alias used throughout the engine.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::{EngineError, ErrorCode, Missing};
    use crate::model::{ChainKind, ContainerId, NodeId};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotFound,
            ErrorCode::InvalidOperation,
            ErrorCode::CrossContainerViolation,
            ErrorCode::NameConflict,
            ErrorCode::PermissionDenied,
            ErrorCode::IntegrityViolation,
            ErrorCode::LockContention,
            ErrorCode::StorageFailure,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::CrossContainerViolation.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn not_found_names_the_missing_thing() {
        let err = EngineError::NotFound(Missing::Node(ChainKind::Task, NodeId(42)));
        assert_eq!(err.to_string(), "task 42 not found");
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = EngineError::NotFound(Missing::Container(ChainKind::TaskState, ContainerId(7)));
        assert_eq!(err.to_string(), "project 7 not found");
    }

    #[test]
    fn busy_sqlite_errors_classify_as_lock_contention() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        let err = EngineError::from(busy);
        assert_eq!(err.code(), ErrorCode::LockContention);
        assert!(err.hint().is_some());

        let other = EngineError::from(rusqlite::Error::InvalidQuery);
        assert_eq!(other.code(), ErrorCode::StorageFailure);
    }
}
