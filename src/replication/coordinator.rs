//! Replication Coordinator
//!
//! One coordinator keeps one replicated type of this datacenter converged
//! with the source datacenter. Its loop is strictly sequential:
//!
//! 1. wait for the rate limit
//! 2. fetch everything above the replicated index (cancellable)
//! 3. apply deletions, then changed records, in source index order
//! 4. advance the replicated index and the success timestamp together
//!
//! A failed round records the error and backs off; a fatal one stops the
//! loop. Only the fetch is cancelled on stop. An apply in progress finishes
//! unless the handle's grace period runs out, in which case the task is
//! aborted without advancing the index.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, timeout, Instant};

use super::backoff::Backoff;
use super::config::{ApplyConflictPolicy, ReplicationConfig};
use super::errors::{ReplicationError, ReplicationResult};
use super::interfaces::{FetchResponse, LocalReader, ReplicationFetcher, StateApplier, TenancyOracle};
use super::state::CoordinatorState;
use super::status::ReplicationStatus;
use crate::observability::{log_event, Event, ReplicationMetrics};
use crate::rpc::JITTER_FRACTION;
use crate::structs::{Entity, OpTag, ReplicatedType};

/// Per-type settings derived from [`ReplicationConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorSettings {
    pub replicated_type: ReplicatedType,
    pub source_datacenter: String,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    pub backoff_jitter: f64,
    pub blocking_max_wait: Duration,
    pub round_interval: Duration,
    pub batch_size: usize,
    pub conflict_policy: ApplyConflictPolicy,
}

impl CoordinatorSettings {
    /// Settings for `ty`, or `None` when the type should not replicate.
    pub fn for_type(config: &ReplicationConfig, ty: ReplicatedType) -> Option<Self> {
        if !config.is_type_enabled(ty) {
            return None;
        }
        let source = config.source_datacenter()?;
        Some(Self {
            replicated_type: ty,
            source_datacenter: source.to_string(),
            backoff_min: config.backoff_min(),
            backoff_max: config.backoff_max(),
            backoff_jitter: config.backoff_jitter,
            blocking_max_wait: config.blocking_max_wait(),
            round_interval: config.round_interval(),
            batch_size: config.batch_size.max(1),
            conflict_policy: config.conflict_policy,
        })
    }

    /// Deadline for one fetch: the blocking wait, the server's jitter
    /// allowance on top of it, and one minimum backoff of slack.
    pub fn fetch_deadline(&self) -> Duration {
        self.blocking_max_wait + self.blocking_max_wait / JITTER_FRACTION + self.backoff_min
    }
}

/// Result of one successful round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The response was applied and the replicated index advanced.
    Applied {
        source_index: u64,
        upserted: usize,
        deleted: usize,
        unchanged: usize,
        skipped: usize,
    },
    /// The source answered below the replicated index; nothing was applied.
    Regressed { source_index: u64, replicated_index: u64 },
}

pub struct ReplicationCoordinator<F, S, T> {
    settings: CoordinatorSettings,
    fetcher: Arc<F>,
    store: Arc<S>,
    tenancy: Arc<T>,
    status: Arc<watch::Sender<ReplicationStatus>>,
    metrics: Arc<ReplicationMetrics>,
    backoff: Backoff,
    state: CoordinatorState,
}

impl<F, S, T> ReplicationCoordinator<F, S, T>
where
    F: ReplicationFetcher,
    S: StateApplier + LocalReader,
    T: TenancyOracle,
{
    /// Build a coordinator publishing to `status`.
    ///
    /// The replicated index already in `status` is where fetching resumes.
    pub fn new(
        settings: CoordinatorSettings,
        fetcher: Arc<F>,
        store: Arc<S>,
        tenancy: Arc<T>,
        status: Arc<watch::Sender<ReplicationStatus>>,
        metrics: Arc<ReplicationMetrics>,
    ) -> Self {
        let backoff = Backoff::new(
            settings.backoff_min,
            settings.backoff_max,
            settings.backoff_jitter,
        );
        let state = status.borrow().state;
        let mut abandoned = None;
        status.send_modify(|s| {
            // Indices are per source; one from another datacenter means nothing here.
            if !s.source_datacenter.is_empty()
                && s.source_datacenter != settings.source_datacenter
            {
                abandoned = Some((s.source_datacenter.clone(), s.replicated_index));
                s.replicated_index = 0;
                s.consecutive_failures = 0;
            }
            s.replication_type = Some(settings.replicated_type);
            s.source_datacenter = settings.source_datacenter.clone();
            s.enabled = true;
        });
        if let Some((previous, index)) = abandoned {
            let index = index.to_string();
            log_event(
                Event::ReplicationSourceChanged,
                &[
                    ("replication_type", settings.replicated_type.as_str()),
                    ("source_datacenter", settings.source_datacenter.as_str()),
                    ("previous_source", previous.as_str()),
                    ("abandoned_index", index.as_str()),
                ],
            );
        }
        Self {
            settings,
            fetcher,
            store,
            tenancy,
            status,
            metrics,
            backoff,
            state,
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn status(&self) -> ReplicationStatus {
        self.status.borrow().clone()
    }

    pub fn replicated_index(&self) -> u64 {
        self.status.borrow().replicated_index
    }

    /// Fetch and apply once, recording the result on the status record.
    pub async fn run_round(&mut self) -> ReplicationResult<RoundOutcome> {
        let result = match self.fetch().await {
            Ok(response) => self.apply_response(response).await,
            Err(err) => Err(err),
        };
        self.finish_round(&result);
        result
    }

    /// Run until `stop` turns true or its sender is dropped.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        if let Err(err) = self.set_state(CoordinatorState::Starting) {
            let now = Utc::now();
            self.status.send_modify(|s| s.record_error(&err, now));
            self.halt(&err);
            return;
        }
        self.status.send_modify(|s| s.running = true);
        self.log(Event::ReplicationStart, &[]);

        let mut next_round = Instant::now();
        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                _ = sleep_until(next_round) => {}
                _ = stop.changed() => break,
            }
            next_round = Instant::now() + self.settings.round_interval;

            let fetched = tokio::select! {
                _ = stop.changed() => break,
                fetched = self.fetch() => fetched,
            };
            let result = match fetched {
                Ok(response) => self.apply_response(response).await,
                Err(err) => Err(err),
            };
            self.finish_round(&result);

            let wait = match self.after_round(result) {
                Ok(wait) => wait,
                Err(err) => {
                    self.halt(&err);
                    break;
                }
            };
            if let Some(delay) = wait {
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = stop.changed() => break,
                }
            }
        }

        if let Err(err) = self.set_state(CoordinatorState::Stopped) {
            self.halt(&err);
        }
        self.status.send_modify(|s| s.running = false);
        self.log(Event::ReplicationStop, &[]);
    }

    /// Spawn the loop on the current runtime.
    pub fn spawn(self) -> CoordinatorHandle {
        let (stop, stop_rx) = watch::channel(false);
        let replicated_type = self.settings.replicated_type;
        let status = Arc::clone(&self.status);
        let join = tokio::spawn(self.run(stop_rx));
        CoordinatorHandle {
            replicated_type,
            stop,
            join,
            status,
        }
    }

    /// State change and wait after a round. `Err` stops the loop.
    fn after_round(
        &mut self,
        result: ReplicationResult<RoundOutcome>,
    ) -> ReplicationResult<Option<Duration>> {
        match result {
            Ok(RoundOutcome::Applied { .. }) => {
                self.backoff.reset();
                self.set_state(CoordinatorState::Running)?;
                Ok(None)
            }
            Ok(RoundOutcome::Regressed { .. }) => {
                self.set_state(CoordinatorState::Running)?;
                Ok(Some(self.backoff.min()))
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                self.set_state(CoordinatorState::BackingOff)?;
                let delay = self.backoff.next_delay();
                let delay_ms = delay.as_millis().to_string();
                let attempts = self.backoff.attempts().to_string();
                self.log(
                    Event::ReplicationBackoff,
                    &[
                        ("delay_ms", delay_ms.as_str()),
                        ("attempt", attempts.as_str()),
                        ("error", err.message.as_str()),
                    ],
                );
                Ok(Some(delay))
            }
        }
    }

    async fn fetch(&self) -> ReplicationResult<FetchResponse> {
        let ty = self.settings.replicated_type;
        let after = self.replicated_index();
        let deadline = self.settings.fetch_deadline();

        let result = match timeout(
            deadline,
            self.fetcher.fetch(ty, after, self.settings.blocking_max_wait),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ReplicationError::timeout(format!(
                "fetch of {} above {} exceeded {:?}",
                ty, after, deadline
            ))),
        };

        if let Err(err) = &result {
            self.metrics.increment_fetch_errors();
            let after = after.to_string();
            self.log(
                Event::ReplicationFetchFailed,
                &[
                    ("after_index", after.as_str()),
                    ("kind", err.kind.as_str()),
                    ("error", err.message.as_str()),
                ],
            );
        }
        result
    }

    async fn apply_response(&self, response: FetchResponse) -> ReplicationResult<RoundOutcome> {
        let ty = self.settings.replicated_type;
        let replicated_index = self.replicated_index();
        let source_index = response.source_index;

        if source_index < replicated_index {
            self.metrics.increment_index_regressions();
            let source = source_index.to_string();
            let replicated = replicated_index.to_string();
            self.log(
                Event::ReplicationIndexRegressed,
                &[
                    ("source_index", source.as_str()),
                    ("replicated_index", replicated.as_str()),
                ],
            );
            return Ok(RoundOutcome::Regressed {
                source_index,
                replicated_index,
            });
        }

        let mut doomed = Vec::new();
        for id in &response.deleted {
            if let Some(local) = self.store.lookup(ty, id).await? {
                doomed.push(local);
            }
        }

        let mut changed = Vec::new();
        let mut unchanged = 0;
        let mut skipped = 0;
        for entity in response.entities {
            if entity.replicated_type() != ty {
                return Err(ReplicationError::unknown_type(format!(
                    "source returned {} while replicating {}",
                    entity.replicated_type(),
                    ty
                )));
            }
            if let Some(reason) = self.skip_reason(&entity)? {
                skipped += 1;
                let id = entity.id();
                self.log(
                    Event::ReplicationEntitySkipped,
                    &[("id", id.as_str()), ("reason", reason)],
                );
                continue;
            }
            if let Some(local) = self.store.lookup(ty, &entity.id()).await? {
                if local.is_same(&entity) {
                    unchanged += 1;
                    continue;
                }
            }
            changed.push(entity);
        }
        changed.sort_by_key(|e| e.raft_index().modify_index);

        let delete_failures = self.apply_batches(&doomed, OpTag::Delete).await?;
        let upsert_failures = self.apply_batches(&changed, OpTag::Set).await?;

        let deleted = doomed.len() - delete_failures;
        let upserted = changed.len() - upsert_failures;
        self.metrics.add_deleted(deleted as u64);
        self.metrics.add_applied(upserted as u64);
        self.metrics.add_unchanged(unchanged as u64);
        self.metrics.add_skipped(skipped as u64);

        let failures = delete_failures + upsert_failures;
        if failures > 0 {
            self.metrics.add_conflicts(failures as u64);
            return Err(ReplicationError::apply_conflict(format!(
                "{} {} record(s) skipped, holding index at {}",
                failures, ty, replicated_index
            )));
        }

        Ok(RoundOutcome::Applied {
            source_index,
            upserted,
            deleted,
            unchanged,
            skipped,
        })
    }

    /// Apply in chunks of `batch_size`. Returns the number of records that
    /// were skipped under [`ApplyConflictPolicy::SkipEntity`].
    async fn apply_batches(&self, entities: &[Entity], op: OpTag) -> ReplicationResult<usize> {
        let mut failed = 0;
        for chunk in entities.chunks(self.settings.batch_size) {
            let err = match self.store.apply(chunk.to_vec(), op).await {
                Ok(_) => continue,
                Err(err) => err,
            };

            let size = chunk.len().to_string();
            self.log(
                Event::ReplicationApplyFailed,
                &[
                    ("op", op.as_str()),
                    ("batch_size", size.as_str()),
                    ("error", err.message.as_str()),
                ],
            );
            if self.settings.conflict_policy == ApplyConflictPolicy::AbortBatch {
                return Err(err);
            }

            for entity in chunk {
                if let Err(err) = self.store.apply(vec![entity.clone()], op).await {
                    failed += 1;
                    let id = entity.id();
                    self.log(
                        Event::ReplicationApplyConflict,
                        &[
                            ("op", op.as_str()),
                            ("id", id.as_str()),
                            ("error", err.message.as_str()),
                        ],
                    );
                }
            }
        }
        Ok(failed)
    }

    fn skip_reason(&self, entity: &Entity) -> ReplicationResult<Option<&'static str>> {
        if !entity.is_replicable() {
            return Ok(Some("local"));
        }
        if !entity.raft_index().is_committed() {
            return Ok(Some("uncommitted"));
        }
        if let Some(scope) = entity.tenancy() {
            if !self.tenancy.accepts(scope)? {
                return Ok(Some("tenancy"));
            }
        }
        Ok(None)
    }

    fn finish_round(&self, result: &ReplicationResult<RoundOutcome>) {
        self.metrics.increment_rounds();
        let now = Utc::now();
        match result {
            Ok(RoundOutcome::Applied {
                source_index,
                upserted,
                deleted,
                ..
            }) => {
                let index = *source_index;
                self.status.send_modify(|s| s.record_success(index, now));
                if upserted + deleted > 0 {
                    let index = index.to_string();
                    let upserted = upserted.to_string();
                    let deleted = deleted.to_string();
                    self.log(
                        Event::ReplicationRoundComplete,
                        &[
                            ("replicated_index", index.as_str()),
                            ("upserted", upserted.as_str()),
                            ("deleted", deleted.as_str()),
                        ],
                    );
                }
            }
            Ok(RoundOutcome::Regressed { .. }) => {}
            Err(err) => self.status.send_modify(|s| s.record_error(err, now)),
        }
    }

    fn set_state(&mut self, next: CoordinatorState) -> ReplicationResult<()> {
        let previous = self.state;
        if previous == next {
            return Ok(());
        }
        self.state = previous.transition_to(next)?;
        self.status.send_modify(|s| s.state = next);
        self.log(
            Event::ReplicationStateChange,
            &[("from", previous.as_str()), ("to", next.as_str())],
        );
        Ok(())
    }

    fn halt(&self, err: &ReplicationError) {
        self.log(
            Event::ReplicationHalted,
            &[("kind", err.kind.as_str()), ("error", err.message.as_str())],
        );
    }

    fn log(&self, event: Event, extra: &[(&str, &str)]) {
        let mut fields = vec![
            ("replication_type", self.settings.replicated_type.as_str()),
            ("source_datacenter", self.settings.source_datacenter.as_str()),
        ];
        fields.extend_from_slice(extra);
        log_event(event, &fields);
    }
}

/// Control over a spawned coordinator loop.
#[derive(Debug)]
pub struct CoordinatorHandle {
    replicated_type: ReplicatedType,
    stop: watch::Sender<bool>,
    join: JoinHandle<()>,
    status: Arc<watch::Sender<ReplicationStatus>>,
}

impl CoordinatorHandle {
    pub fn replicated_type(&self) -> ReplicatedType {
        self.replicated_type
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signal the loop to stop and wait up to `grace` for it to exit.
    ///
    /// Past the grace period the task is aborted. Returns whether the loop
    /// exited on its own.
    pub async fn stop(mut self, grace: Duration) -> bool {
        // Fails only if the loop already exited and dropped its receiver.
        let _ = self.stop.send(true);

        let graceful = match timeout(grace, &mut self.join).await {
            Ok(Ok(())) => return true,
            Ok(Err(_)) => true,
            Err(_) => {
                self.join.abort();
                let _ = (&mut self.join).await;
                let grace_ms = grace.as_millis().to_string();
                log_event(
                    Event::ReplicationAborted,
                    &[
                        ("replication_type", self.replicated_type.as_str()),
                        ("grace_ms", grace_ms.as_str()),
                    ],
                );
                false
            }
        };

        self.status.send_modify(|s| {
            s.running = false;
            s.state = CoordinatorState::Stopped;
        });
        graceful
    }
}
