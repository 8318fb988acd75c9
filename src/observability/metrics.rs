//! Replication counters
//!
//! Counters only, monotonic, reset on process start. Relaxed ordering; the
//! snapshot is not a consistent cut across counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by every coordinator in a process.
#[derive(Debug, Default)]
pub struct ReplicationMetrics {
    rounds: AtomicU64,
    fetch_errors: AtomicU64,
    entities_applied: AtomicU64,
    entities_deleted: AtomicU64,
    entities_unchanged: AtomicU64,
    entities_skipped: AtomicU64,
    apply_conflicts: AtomicU64,
    index_regressions: AtomicU64,
}

/// Point-in-time copy of [`ReplicationMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub rounds: u64,
    pub fetch_errors: u64,
    pub entities_applied: u64,
    pub entities_deleted: u64,
    pub entities_unchanged: u64,
    pub entities_skipped: u64,
    pub apply_conflicts: u64,
    pub index_regressions: u64,
}

impl ReplicationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_rounds(&self) {
        self.rounds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fetch_errors(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_applied(&self, count: u64) {
        self.entities_applied.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_deleted(&self, count: u64) {
        self.entities_deleted.fetch_add(count, Ordering::Relaxed);
    }

    /// Entities dropped because the local copy was already the same.
    pub fn add_unchanged(&self, count: u64) {
        self.entities_unchanged.fetch_add(count, Ordering::Relaxed);
    }

    /// Entities dropped before apply (tenancy, local-only, uncommitted).
    pub fn add_skipped(&self, count: u64) {
        self.entities_skipped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_conflicts(&self, count: u64) {
        self.apply_conflicts.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_index_regressions(&self) {
        self.index_regressions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rounds: self.rounds.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
            entities_applied: self.entities_applied.load(Ordering::Relaxed),
            entities_deleted: self.entities_deleted.load(Ordering::Relaxed),
            entities_unchanged: self.entities_unchanged.load(Ordering::Relaxed),
            entities_skipped: self.entities_skipped.load(Ordering::Relaxed),
            apply_conflicts: self.apply_conflicts.load(Ordering::Relaxed),
            index_regressions: self.index_regressions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_metrics_are_zero() {
        assert_eq!(ReplicationMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = ReplicationMetrics::new();
        metrics.increment_rounds();
        metrics.increment_rounds();
        metrics.add_applied(3);
        metrics.add_unchanged(2);
        metrics.increment_index_regressions();

        let snap = metrics.snapshot();
        assert_eq!(snap.rounds, 2);
        assert_eq!(snap.entities_applied, 3);
        assert_eq!(snap.entities_unchanged, 2);
        assert_eq!(snap.index_regressions, 1);
        assert_eq!(snap.fetch_errors, 0);
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(ReplicationMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..250 {
                        m.increment_fetch_errors();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().fetch_errors, 1000);
    }
}
