//! Replication Coordinator Tests
//!
//! - Applied rounds advance the replicated index and success timestamp together
//! - Failed fetches back off, never decreasing, capped, index untouched
//! - The replicated index never decreases
//! - Conflicting records are skipped or abort the round, per policy
//! - Stop cancels an in-flight fetch and aborts a stuck apply

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use dcsync::observability::ReplicationMetrics;
use dcsync::replication::{
    ApplyConflictPolicy, CoordinatorSettings, CoordinatorState, DefaultTenancy, FetchResponse,
    LocalReader, MemoryStateStore, ReplicationConfig, ReplicationCoordinator, ReplicationError,
    ReplicationErrorKind, ReplicationFetcher, ReplicationResult, ReplicationStatus, RoundOutcome,
    StateApplier, TenancyOracle,
};
use dcsync::structs::{AclPolicy, Entity, OpTag, RaftIndex, ReplicatedType, TenancyScope};

// =============================================================================
// Helpers
// =============================================================================

/// Fetcher that replays scripted responses and records every call.
#[derive(Default)]
struct ScriptedSource {
    responses: Mutex<VecDeque<ReplicationResult<FetchResponse>>>,
    /// Once the script is exhausted, keep failing instead of hanging.
    fail_when_empty: bool,
    calls: Mutex<Vec<(Instant, u64)>>,
}

impl ScriptedSource {
    fn failing() -> Self {
        Self {
            fail_when_empty: true,
            ..Self::default()
        }
    }

    fn push(&self, response: ReplicationResult<FetchResponse>) {
        self.responses.lock().unwrap().push_back(response);
    }

    fn calls(&self) -> Vec<(Instant, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ReplicationFetcher for ScriptedSource {
    async fn fetch(
        &self,
        _ty: ReplicatedType,
        after_index: u64,
        _max_wait: Duration,
    ) -> ReplicationResult<FetchResponse> {
        self.calls.lock().unwrap().push((Instant::now(), after_index));
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None if self.fail_when_empty => Err(ReplicationError::fetch("connection refused")),
            None => std::future::pending().await,
        }
    }
}

fn policy(id: &str, rules: &str, modify_index: u64) -> Entity {
    let mut p = AclPolicy::new(id, format!("{}-name", id), rules);
    p.raft_index = RaftIndex::new(modify_index, modify_index);
    Entity::Policy(p)
}

fn delta(entities: Vec<Entity>, source_index: u64) -> ReplicationResult<FetchResponse> {
    Ok(FetchResponse {
        entities,
        deleted: Vec::new(),
        source_index,
    })
}

fn settings(policy: ApplyConflictPolicy) -> CoordinatorSettings {
    let mut config = ReplicationConfig::secondary("dc2", "dc1");
    config.conflict_policy = policy;
    CoordinatorSettings::for_type(&config, ReplicatedType::Policies).unwrap()
}

fn status_at(index: u64) -> Arc<watch::Sender<ReplicationStatus>> {
    let mut status = ReplicationStatus::new(ReplicatedType::Policies);
    status.replicated_index = index;
    let (sender, _) = watch::channel(status);
    Arc::new(sender)
}

struct Fixture<F, S, T> {
    coordinator: ReplicationCoordinator<F, S, T>,
    status: Arc<watch::Sender<ReplicationStatus>>,
    metrics: Arc<ReplicationMetrics>,
}

fn fixture<F, S, T>(
    settings: CoordinatorSettings,
    source: Arc<F>,
    store: Arc<S>,
    tenancy: Arc<T>,
    starting_index: u64,
) -> Fixture<F, S, T>
where
    F: ReplicationFetcher,
    S: StateApplier + LocalReader,
    T: TenancyOracle,
{
    let status = status_at(starting_index);
    let metrics = Arc::new(ReplicationMetrics::new());
    let coordinator = ReplicationCoordinator::new(
        settings,
        source,
        store,
        tenancy,
        Arc::clone(&status),
        Arc::clone(&metrics),
    );
    Fixture {
        coordinator,
        status,
        metrics,
    }
}

// =============================================================================
// Progress
// =============================================================================

/// Starting at 10, a three-record delta at 15 lands and moves the index to 15.
#[tokio::test]
async fn test_delta_advances_index_and_success_only() {
    let source = Arc::new(ScriptedSource::default());
    let store = Arc::new(MemoryStateStore::new());
    source.push(delta(
        vec![policy("a", "r", 11), policy("b", "r", 13), policy("c", "r", 15)],
        15,
    ));

    let mut f = fixture(
        settings(ApplyConflictPolicy::SkipEntity),
        Arc::clone(&source),
        Arc::clone(&store),
        Arc::new(DefaultTenancy),
        10,
    );
    let before = f.status.borrow().clone();
    assert!(before.last_success.is_none());

    let outcome = f.coordinator.run_round().await.unwrap();
    assert!(matches!(
        outcome,
        RoundOutcome::Applied {
            source_index: 15,
            upserted: 3,
            ..
        }
    ));

    let after = f.status.borrow().clone();
    assert_eq!(after.replicated_index, 15);
    assert!(after.last_success.is_some());
    assert_eq!(after.last_error, before.last_error);
    assert_eq!(store.len(), 3);
    assert_eq!(source.calls()[0].1, 10);
}

/// Index after every round is at least the index before it.
#[tokio::test]
async fn test_replicated_index_is_monotonic() {
    let source = Arc::new(ScriptedSource::default());
    source.push(delta(vec![policy("a", "r1", 5)], 5));
    source.push(delta(vec![policy("a", "r2", 9)], 9));
    source.push(delta(vec![policy("a", "r3", 7)], 7));
    source.push(Err(ReplicationError::fetch("leader lost")));
    source.push(delta(vec![], 9));
    source.push(delta(vec![policy("b", "r1", 12)], 12));

    let mut f = fixture(
        settings(ApplyConflictPolicy::SkipEntity),
        Arc::clone(&source),
        Arc::new(MemoryStateStore::new()),
        Arc::new(DefaultTenancy),
        0,
    );

    let mut previous = 0;
    let mut seen = Vec::new();
    for _ in 0..6 {
        let _ = f.coordinator.run_round().await;
        let index = f.coordinator.replicated_index();
        assert!(index >= previous, "index went from {} to {}", previous, index);
        previous = index;
        seen.push(index);
    }
    assert_eq!(seen, vec![5, 9, 9, 9, 9, 12]);
}

/// A response below the replicated index is informational only.
#[tokio::test]
async fn test_index_regression_applies_nothing() {
    let source = Arc::new(ScriptedSource::default());
    let store = Arc::new(MemoryStateStore::new());
    source.push(delta(vec![policy("rolled-back", "r", 40)], 40));

    let mut f = fixture(
        settings(ApplyConflictPolicy::SkipEntity),
        source,
        Arc::clone(&store),
        Arc::new(DefaultTenancy),
        50,
    );

    let outcome = f.coordinator.run_round().await.unwrap();
    assert_eq!(
        outcome,
        RoundOutcome::Regressed {
            source_index: 40,
            replicated_index: 50,
        }
    );
    assert!(store.is_empty());
    assert_eq!(f.coordinator.replicated_index(), 50);
    assert!(f.status.borrow().last_error.is_none());
    assert_eq!(f.metrics.snapshot().index_regressions, 1);
}

/// An index earned against one source says nothing about another.
#[tokio::test]
async fn test_index_from_previous_source_is_discarded() {
    let status = status_at(50);
    status.send_modify(|s| {
        s.source_datacenter = "dc9".to_string();
        s.consecutive_failures = 3;
    });

    let source = Arc::new(ScriptedSource::default());
    source.push(delta(vec![policy("a", "r", 5)], 5));
    let mut coordinator = ReplicationCoordinator::new(
        settings(ApplyConflictPolicy::SkipEntity),
        Arc::clone(&source),
        Arc::new(MemoryStateStore::new()),
        Arc::new(DefaultTenancy),
        Arc::clone(&status),
        Arc::new(ReplicationMetrics::new()),
    );

    let current = status.borrow().clone();
    assert_eq!(current.source_datacenter, "dc1");
    assert_eq!(current.replicated_index, 0);
    assert_eq!(current.consecutive_failures, 0);

    let outcome = coordinator.run_round().await.unwrap();
    assert!(matches!(outcome, RoundOutcome::Applied { upserted: 1, .. }));
    assert_eq!(coordinator.replicated_index(), 5);
    assert_eq!(source.calls()[0].1, 0);
}

/// Rebuilding against the same source keeps the index.
#[tokio::test]
async fn test_index_kept_for_same_source() {
    let status = status_at(50);
    status.send_modify(|s| s.source_datacenter = "dc1".to_string());

    let coordinator = ReplicationCoordinator::new(
        settings(ApplyConflictPolicy::SkipEntity),
        Arc::new(ScriptedSource::default()),
        Arc::new(MemoryStateStore::new()),
        Arc::new(DefaultTenancy),
        Arc::clone(&status),
        Arc::new(ReplicationMetrics::new()),
    );
    assert_eq!(coordinator.replicated_index(), 50);
}

/// Records whose namespace is gone at the destination are skipped.
#[tokio::test]
async fn test_records_in_missing_tenancy_are_skipped() {
    struct NoTeamB;

    impl TenancyOracle for NoTeamB {
        fn partition_exists(&self, _partition: &str) -> ReplicationResult<bool> {
            Ok(true)
        }
        fn namespace_exists(&self, _partition: &str, namespace: &str) -> ReplicationResult<bool> {
            Ok(namespace != "team-b")
        }
        fn partition_marked_for_deletion(&self, _partition: &str) -> ReplicationResult<bool> {
            Ok(false)
        }
        fn namespace_marked_for_deletion(&self, _: &str, _: &str) -> ReplicationResult<bool> {
            Ok(false)
        }
    }

    let mut scoped = AclPolicy::new("scoped", "scoped", "r");
    scoped.tenancy = TenancyScope::new("default", "team-b");
    scoped.raft_index = RaftIndex::new(3, 3);

    let source = Arc::new(ScriptedSource::default());
    let store = Arc::new(MemoryStateStore::new());
    source.push(delta(vec![Entity::Policy(scoped), policy("plain", "r", 4)], 4));

    let mut f = fixture(
        settings(ApplyConflictPolicy::SkipEntity),
        source,
        Arc::clone(&store),
        Arc::new(NoTeamB),
        0,
    );

    let outcome = f.coordinator.run_round().await.unwrap();
    assert!(matches!(
        outcome,
        RoundOutcome::Applied {
            upserted: 1,
            skipped: 1,
            ..
        }
    ));
    assert!(store.get(ReplicatedType::Policies, "scoped").is_none());
    assert_eq!(f.coordinator.replicated_index(), 4);
    assert_eq!(f.metrics.snapshot().entities_skipped, 1);
}

// =============================================================================
// Apply conflicts
// =============================================================================

#[tokio::test]
async fn test_skip_policy_applies_the_rest_and_holds_index() {
    let source = Arc::new(ScriptedSource::default());
    let store = Arc::new(MemoryStateStore::new());
    store.reject_id("bad");

    let response = delta(
        vec![policy("good-1", "r", 11), policy("bad", "r", 12), policy("good-2", "r", 13)],
        20,
    );
    source.push(response.clone());
    source.push(response);

    let mut f = fixture(
        settings(ApplyConflictPolicy::SkipEntity),
        Arc::clone(&source),
        Arc::clone(&store),
        Arc::new(DefaultTenancy),
        10,
    );

    let err = f.coordinator.run_round().await.unwrap_err();
    assert_eq!(err.kind, ReplicationErrorKind::ApplyConflict);
    assert!(!err.is_fatal());
    assert!(store.get(ReplicatedType::Policies, "good-1").is_some());
    assert!(store.get(ReplicatedType::Policies, "good-2").is_some());
    assert!(store.get(ReplicatedType::Policies, "bad").is_none());
    assert_eq!(f.coordinator.replicated_index(), 10);
    assert!(f.status.borrow().last_error.is_some());
    assert_eq!(f.metrics.snapshot().apply_conflicts, 1);

    // The skipped record is presented again and lands once accepted.
    store.accept_id("bad");
    let outcome = f.coordinator.run_round().await.unwrap();
    assert!(matches!(
        outcome,
        RoundOutcome::Applied {
            upserted: 1,
            unchanged: 2,
            ..
        }
    ));
    assert_eq!(f.coordinator.replicated_index(), 20);
    assert_eq!(source.calls()[1].1, 10);
}

#[tokio::test]
async fn test_abort_policy_fails_round_without_partial_apply() {
    let source = Arc::new(ScriptedSource::default());
    let store = Arc::new(MemoryStateStore::new());
    store.reject_id("bad");
    source.push(delta(vec![policy("good", "r", 11), policy("bad", "r", 12)], 20));

    let mut f = fixture(
        settings(ApplyConflictPolicy::AbortBatch),
        source,
        Arc::clone(&store),
        Arc::new(DefaultTenancy),
        10,
    );

    let err = f.coordinator.run_round().await.unwrap_err();
    assert_eq!(err.kind, ReplicationErrorKind::Apply);
    assert!(store.is_empty());
    assert_eq!(f.coordinator.replicated_index(), 10);
    assert_eq!(store.batches(), vec![(OpTag::Set, 2)]);
}

// =============================================================================
// Backoff
// =============================================================================

/// Three network failures: retry intervals never shrink, stay within
/// [1s, 30s], and every failure stamps `LastError` without touching the index.
#[tokio::test(start_paused = true)]
async fn test_fetch_failures_back_off() {
    let source = Arc::new(ScriptedSource::failing());
    let f = fixture(
        settings(ApplyConflictPolicy::SkipEntity),
        Arc::clone(&source),
        Arc::new(MemoryStateStore::new()),
        Arc::new(DefaultTenancy),
        10,
    );
    assert!(f.status.borrow().last_error.is_none());
    let started = chrono::Utc::now();
    let mut rx = f.status.subscribe();
    let handle = f.coordinator.spawn();

    for failures in 1..=3 {
        let status = rx
            .wait_for(|s| s.consecutive_failures >= failures)
            .await
            .unwrap()
            .clone();
        assert_eq!(status.consecutive_failures, failures);
        assert_eq!(status.replicated_index, 10);
        assert_eq!(status.state, CoordinatorState::BackingOff);
        assert_eq!(status.last_error_message, "connection refused");
        let stamp = status
            .last_error
            .unwrap_or_else(|| panic!("failure {} left LastError unset", failures));
        assert!(stamp >= started);

        // The loop is sleeping out its backoff; clear the stamp so the next
        // failure has to write it again.
        f.status.send_modify(|s| s.last_error = None);
    }
    let status = rx
        .wait_for(|s| s.consecutive_failures >= 4)
        .await
        .unwrap()
        .clone();
    assert!(status.last_error.is_some());
    assert!(handle.stop(Duration::from_secs(5)).await);

    let calls = source.calls();
    assert!(calls.len() >= 4);
    assert!(calls.iter().all(|(_, after)| *after == 10));

    let intervals: Vec<Duration> = calls
        .windows(2)
        .take(3)
        .map(|w| w[1].0.duration_since(w[0].0))
        .collect();
    for interval in &intervals {
        assert!(*interval >= Duration::from_secs(1));
        assert!(*interval <= Duration::from_secs(30));
    }
    assert!(intervals.windows(2).all(|w| w[0] <= w[1]), "{:?}", intervals);

    let status = f.status.borrow().clone();
    assert!(!status.running);
    assert_eq!(status.state, CoordinatorState::Stopped);
    assert!(f.metrics.snapshot().fetch_errors >= 4);
}

/// Recovery after failures resets the backoff and the failure count.
#[tokio::test(start_paused = true)]
async fn test_success_after_failures_resets() {
    let source = Arc::new(ScriptedSource::default());
    source.push(Err(ReplicationError::fetch("no leader")));
    source.push(Err(ReplicationError::fetch("no leader")));
    source.push(delta(vec![policy("a", "r", 12)], 12));

    let f = fixture(
        settings(ApplyConflictPolicy::SkipEntity),
        source,
        Arc::new(MemoryStateStore::new()),
        Arc::new(DefaultTenancy),
        10,
    );
    let mut rx = f.status.subscribe();
    let handle = f.coordinator.spawn();

    let status = rx
        .wait_for(|s| s.replicated_index == 12)
        .await
        .unwrap()
        .clone();
    assert_eq!(status.consecutive_failures, 0);
    assert_eq!(status.state, CoordinatorState::Running);
    assert!(status.last_error.is_some());
    assert!(status.last_success.is_some());

    assert!(handle.stop(Duration::from_secs(5)).await);
}

/// A fatal error stops this coordinator and marks it not running.
#[tokio::test(start_paused = true)]
async fn test_fatal_error_stops_coordinator() {
    let source = Arc::new(ScriptedSource::default());
    source.push(Err(ReplicationError::disabled("replication disabled at source")));

    let f = fixture(
        settings(ApplyConflictPolicy::SkipEntity),
        Arc::clone(&source),
        Arc::new(MemoryStateStore::new()),
        Arc::new(DefaultTenancy),
        3,
    );
    let mut rx = f.status.subscribe();
    let handle = f.coordinator.spawn();

    let status = rx
        .wait_for(|s| s.state == CoordinatorState::Stopped)
        .await
        .unwrap()
        .clone();
    assert!(!status.running);
    assert_eq!(status.replicated_index, 3);
    assert!(status.last_error_message.contains("disabled"));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls().len(), 1);
    assert!(handle.is_finished());
}

// =============================================================================
// Shutdown
// =============================================================================

/// A blocking fetch is cancelled by stop well within the grace period.
#[tokio::test(start_paused = true)]
async fn test_stop_cancels_blocking_fetch() {
    let source = Arc::new(ScriptedSource::default());
    let f = fixture(
        settings(ApplyConflictPolicy::SkipEntity),
        Arc::clone(&source),
        Arc::new(MemoryStateStore::new()),
        Arc::new(DefaultTenancy),
        7,
    );
    let handle = f.coordinator.spawn();

    while source.calls().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let started = Instant::now();
    assert!(handle.stop(Duration::from_secs(5)).await);
    assert!(started.elapsed() < Duration::from_secs(5));

    let status = f.status.borrow().clone();
    assert!(!status.running);
    assert_eq!(status.replicated_index, 7);
}

/// An apply that never finishes is aborted once the grace period runs out.
#[tokio::test(start_paused = true)]
async fn test_stuck_apply_is_aborted_after_grace() {
    struct Stuck {
        entered: Mutex<bool>,
    }

    impl StateApplier for Stuck {
        async fn apply(&self, _entities: Vec<Entity>, _op: OpTag) -> ReplicationResult<u64> {
            *self.entered.lock().unwrap() = true;
            std::future::pending().await
        }
    }

    impl LocalReader for Stuck {
        async fn lookup(&self, _ty: ReplicatedType, _id: &str) -> ReplicationResult<Option<Entity>> {
            Ok(None)
        }
    }

    let source = Arc::new(ScriptedSource::default());
    source.push(delta(vec![policy("a", "r", 2)], 2));
    let store = Arc::new(Stuck {
        entered: Mutex::new(false),
    });

    let f = fixture(
        settings(ApplyConflictPolicy::SkipEntity),
        source,
        Arc::clone(&store),
        Arc::new(DefaultTenancy),
        0,
    );
    let handle = f.coordinator.spawn();

    while !*store.entered.lock().unwrap() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!handle.stop(Duration::from_secs(1)).await);

    let status = f.status.borrow().clone();
    assert!(!status.running);
    assert_eq!(status.state, CoordinatorState::Stopped);
    assert_eq!(status.replicated_index, 0);
}
