//! Replication status records
//!
//! Each coordinator owns the sending side of a `watch` channel holding its
//! [`ReplicationStatus`]. Updates go through `send_modify`, so the replicated
//! index and the timestamp that accompanies it change in one critical
//! section. Readers clone the latest value and never block the coordinator.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::errors::ReplicationError;
use super::state::CoordinatorState;
use crate::structs::ReplicatedType;

/// Externally visible health of one replicated type.
///
/// Fields added after the first release carry serde defaults so older
/// serialized records still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationStatus {
    /// Configuration says replication should run.
    pub enabled: bool,
    /// A coordinator loop is alive.
    pub running: bool,
    pub source_datacenter: String,
    /// Highest source index applied locally. Never decreases.
    pub replicated_index: u64,
    #[serde(rename = "LastSuccess", alias = "LastSuccessTimestamp", default)]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(rename = "LastError", alias = "LastErrorTimestamp", default)]
    pub last_error: Option<DateTime<Utc>>,

    #[serde(default)]
    pub replication_type: Option<ReplicatedType>,
    #[serde(default)]
    pub state: CoordinatorState,
    #[serde(default)]
    pub last_error_message: String,
    #[serde(default)]
    pub consecutive_failures: u32,
}

impl ReplicationStatus {
    pub fn new(ty: ReplicatedType) -> Self {
        Self {
            replication_type: Some(ty),
            ..Self::default()
        }
    }

    /// Record an applied round. The index only moves forward.
    pub fn record_success(&mut self, source_index: u64, at: DateTime<Utc>) {
        self.replicated_index = self.replicated_index.max(source_index);
        self.last_success = Some(at);
        self.consecutive_failures = 0;
    }

    /// Record a failed round. The replicated index is left untouched.
    pub fn record_error(&mut self, err: &ReplicationError, at: DateTime<Utc>) {
        self.last_error = Some(at);
        self.last_error_message = err.message.clone();
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}

/// Read-only fan-in of every coordinator's status.
#[derive(Debug, Default)]
pub struct ReplicationStatusTracker {
    entries: RwLock<BTreeMap<ReplicatedType, watch::Receiver<ReplicationStatus>>>,
}

impl ReplicationStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the status published by `sender`, replacing any previous entry.
    pub fn register(&self, ty: ReplicatedType, sender: &watch::Sender<ReplicationStatus>) {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.insert(ty, sender.subscribe());
    }

    pub fn get(&self, ty: ReplicatedType) -> Option<ReplicationStatus> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries.get(&ty).map(|rx| rx.borrow().clone())
    }

    /// Copies of every tracked status, in type order.
    pub fn snapshot(&self) -> Vec<ReplicationStatus> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries.values().map(|rx| rx.borrow().clone()).collect()
    }

    pub fn tracked_types(&self) -> Vec<ReplicatedType> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_success_never_regresses_index() {
        let mut status = ReplicationStatus::new(ReplicatedType::Policies);
        status.record_success(15, ts(1));
        status.record_success(12, ts(2));
        assert_eq!(status.replicated_index, 15);
        assert_eq!(status.last_success, Some(ts(2)));
    }

    #[test]
    fn test_error_keeps_index() {
        let mut status = ReplicationStatus::new(ReplicatedType::Roles);
        status.record_success(10, ts(1));
        status.record_error(&ReplicationError::fetch("unreachable"), ts(2));
        status.record_error(&ReplicationError::fetch("unreachable"), ts(3));
        assert_eq!(status.replicated_index, 10);
        assert_eq!(status.last_error, Some(ts(3)));
        assert_eq!(status.last_success, Some(ts(1)));
        assert_eq!(status.consecutive_failures, 2);

        status.record_success(11, ts(4));
        assert_eq!(status.consecutive_failures, 0);
    }

    #[test]
    fn test_pascal_case_wire_format() {
        let mut status = ReplicationStatus::new(ReplicatedType::ConfigEntries);
        status.source_datacenter = "dc1".into();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["SourceDatacenter"], "dc1");
        assert_eq!(json["ReplicationType"], "config-entries");
        assert_eq!(json["State"], "Disabled");
        assert!(json.get("LastSuccess").is_some());
    }

    #[test]
    fn test_old_record_deserializes() {
        let json = r#"{
            "Enabled": true,
            "Running": false,
            "SourceDatacenter": "dc1",
            "ReplicatedIndex": 42,
            "LastSuccessTimestamp": "2024-01-01T00:00:00Z"
        }"#;
        let status: ReplicationStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.replicated_index, 42);
        assert!(status.last_success.is_some());
        assert!(status.last_error.is_none());
        assert_eq!(status.replication_type, None);
        assert_eq!(status.state, CoordinatorState::Disabled);
    }

    #[test]
    fn test_tracker_sees_updates() {
        let tracker = ReplicationStatusTracker::new();
        let (tx, _rx) = watch::channel(ReplicationStatus::new(ReplicatedType::Intentions));
        tracker.register(ReplicatedType::Intentions, &tx);

        tx.send_modify(|s| s.record_success(7, ts(1)));

        let status = tracker.get(ReplicatedType::Intentions).unwrap();
        assert_eq!(status.replicated_index, 7);
        assert!(tracker.get(ReplicatedType::Tokens).is_none());
        assert_eq!(tracker.snapshot().len(), 1);
        assert_eq!(tracker.tracked_types(), vec![ReplicatedType::Intentions]);
    }
}
