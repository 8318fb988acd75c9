//! Replication Error Types
//!
//! Transient errors (fetch, timeout, apply) are recorded on the status record
//! and retried after a backoff. Fatal errors stop the coordinator for that
//! type only; sibling coordinators keep running.

use std::fmt;

use crate::rpc::RpcError;

/// Replication error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationError {
    /// Error kind
    pub kind: ReplicationErrorKind,
    /// Error message
    pub message: String,
}

/// Replication error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationErrorKind {
    /// Fetch from the source failed (network, no leader, unreachable)
    Fetch,

    /// Fetch exceeded its deadline
    Timeout,

    /// Source datacenter does not serve this type
    SourceUnsupported,

    /// Local apply failed for a whole batch
    Apply,

    /// One or more entities failed to apply and were skipped
    ApplyConflict,

    /// Type is not known to this build
    UnknownType,

    /// Replication was disabled while the coordinator ran
    Disabled,

    /// Configuration is invalid
    Configuration,

    /// Illegal coordinator state transition attempted
    IllegalTransition,
}

impl ReplicationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicationErrorKind::Fetch => "fetch",
            ReplicationErrorKind::Timeout => "timeout",
            ReplicationErrorKind::SourceUnsupported => "source_unsupported",
            ReplicationErrorKind::Apply => "apply",
            ReplicationErrorKind::ApplyConflict => "apply_conflict",
            ReplicationErrorKind::UnknownType => "unknown_type",
            ReplicationErrorKind::Disabled => "disabled",
            ReplicationErrorKind::Configuration => "configuration",
            ReplicationErrorKind::IllegalTransition => "illegal_transition",
        }
    }
}

impl ReplicationError {
    /// Create a new replication error.
    pub fn new(kind: ReplicationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorKind::Fetch, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorKind::Timeout, message)
    }

    pub fn source_unsupported(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorKind::SourceUnsupported, message)
    }

    pub fn apply(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorKind::Apply, message)
    }

    pub fn apply_conflict(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorKind::ApplyConflict, message)
    }

    pub fn unknown_type(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorKind::UnknownType, message)
    }

    pub fn disabled(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorKind::Disabled, message)
    }

    /// Create a configuration error.
    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorKind::Configuration, message)
    }

    /// Create an illegal transition error.
    pub fn illegal_transition(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorKind::IllegalTransition, message)
    }

    /// Fatal errors stop the coordinator instead of backing off.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ReplicationErrorKind::UnknownType
                | ReplicationErrorKind::Disabled
                | ReplicationErrorKind::Configuration
                | ReplicationErrorKind::IllegalTransition
        )
    }
}

impl fmt::Display for ReplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReplicationError({:?}): {}", self.kind, self.message)
    }
}

impl std::error::Error for ReplicationError {}

impl From<RpcError> for ReplicationError {
    fn from(err: RpcError) -> Self {
        let message = err.to_string();
        match err {
            RpcError::UnsupportedType(_) => Self::source_unsupported(message),
            RpcError::ReplicationDisabled(_) => Self::disabled(message),
            RpcError::Timeout(_) => Self::timeout(message),
            other if other.is_retryable() => Self::fetch(message),
            // A request the source rejects as malformed fails the same way every round.
            _ => Self::configuration_error(message),
        }
    }
}

/// Result type for replication operations
pub type ReplicationResult<T> = Result<T, ReplicationError>;
