//! Observable events
//!
//! Every log line names one of these.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Replication configuration loaded from disk
    ConfigLoaded,
    /// Replication configuration applied
    ConfigReloaded,

    // Coordinator lifecycle
    /// Coordinator loop started for a type
    ReplicationStart,
    /// Coordinator loop exited
    ReplicationStop,
    /// Coordinator did not stop within the grace period and was aborted
    ReplicationAborted,
    /// Coordinator changed state
    ReplicationStateChange,
    /// Source datacenter changed; replicated index restarted from zero
    ReplicationSourceChanged,

    // Rounds
    /// Round applied changes
    ReplicationRoundComplete,
    /// Fetch from the source failed
    ReplicationFetchFailed,
    /// Waiting before the next attempt
    ReplicationBackoff,
    /// Source returned an index below the replicated index
    ReplicationIndexRegressed,
    /// An entity could not be applied and was skipped
    ReplicationApplyConflict,
    /// Applying a batch failed
    ReplicationApplyFailed,
    /// Entity dropped before apply (tenancy gone, local, uncommitted)
    ReplicationEntitySkipped,
    /// Fatal error, coordinator stopped
    ReplicationHalted,

    // RPC
    /// Request forwarded to another datacenter
    RpcForwarded,

    // HTTP
    /// Status endpoint listening
    HttpServerStart,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ConfigReloaded => "CONFIG_RELOADED",
            Event::ReplicationStart => "REPLICATION_START",
            Event::ReplicationStop => "REPLICATION_STOP",
            Event::ReplicationAborted => "REPLICATION_ABORTED",
            Event::ReplicationStateChange => "REPLICATION_STATE_CHANGE",
            Event::ReplicationSourceChanged => "REPLICATION_SOURCE_CHANGED",
            Event::ReplicationRoundComplete => "REPLICATION_ROUND_COMPLETE",
            Event::ReplicationFetchFailed => "REPLICATION_FETCH_FAILED",
            Event::ReplicationBackoff => "REPLICATION_BACKOFF",
            Event::ReplicationIndexRegressed => "REPLICATION_INDEX_REGRESSED",
            Event::ReplicationApplyConflict => "REPLICATION_APPLY_CONFLICT",
            Event::ReplicationApplyFailed => "REPLICATION_APPLY_FAILED",
            Event::ReplicationEntitySkipped => "REPLICATION_ENTITY_SKIPPED",
            Event::ReplicationHalted => "REPLICATION_HALTED",
            Event::RpcForwarded => "RPC_FORWARDED",
            Event::HttpServerStart => "HTTP_SERVER_START",
        }
    }

    /// Severity the event is logged at.
    pub fn severity(&self) -> Severity {
        match self {
            Event::ReplicationHalted | Event::ReplicationAborted => Severity::Error,
            Event::ReplicationFetchFailed
            | Event::ReplicationIndexRegressed
            | Event::ReplicationSourceChanged
            | Event::ReplicationApplyConflict
            | Event::ReplicationApplyFailed => Severity::Warn,
            Event::ReplicationBackoff
            | Event::ReplicationEntitySkipped
            | Event::ReplicationRoundComplete
            | Event::RpcForwarded => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
