//! # RPC Errors
//!
//! Errors surfaced synchronously to the calling request path.

use thiserror::Error;

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors raised while classifying, routing or sending an RPC
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// Nested query options contradict each other
    #[error("Invalid query options: {0}")]
    InvalidQueryOptions(String),

    /// No known route to the requested datacenter
    #[error("No path to datacenter {0:?}")]
    NoPathToDatacenter(String),

    /// Transport failed before a response arrived
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote server does not know the requested replicated type
    #[error("Remote does not support {0}")]
    UnsupportedType(String),

    /// The call exceeded its deadline
    #[error("RPC timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The remote datacenter has replication of this type turned off
    #[error("Replication disabled at {0}")]
    ReplicationDisabled(String),
}

impl RpcError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NoPathToDatacenter(_) | Self::Transport(_) | Self::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_retryable_errors() {
        assert!(RpcError::Transport("reset".into()).is_retryable());
        assert!(RpcError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!RpcError::InvalidQueryOptions("x".into()).is_retryable());
        assert!(!RpcError::UnsupportedType("roles".into()).is_retryable());
        assert!(!RpcError::ReplicationDisabled("dc1".into()).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = RpcError::NoPathToDatacenter("dc9".into());
        assert_eq!(err.to_string(), "No path to datacenter \"dc9\"");
    }
}
