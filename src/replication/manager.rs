//! Replication Manager
//!
//! Owns one coordinator per enabled type. Reloads and shutdown are
//! serialized by one async mutex, and a coordinator is always stopped
//! before its replacement is spawned, so at most one loop per type runs at
//! any time. Status senders outlive coordinators: a restarted coordinator
//! resumes from the replicated index its predecessor reached.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};

use super::config::ReplicationConfig;
use super::coordinator::{CoordinatorHandle, CoordinatorSettings, ReplicationCoordinator};
use super::errors::ReplicationResult;
use super::interfaces::{LocalReader, ReplicationFetcher, StateApplier, TenancyOracle};
use super::state::CoordinatorState;
use super::status::{ReplicationStatus, ReplicationStatusTracker};
use crate::observability::{log_event, Event, ReplicationMetrics};
use crate::structs::ReplicatedType;

/// Grace period used by `shutdown` before any configuration was loaded.
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct RunningCoordinator {
    settings: CoordinatorSettings,
    handle: CoordinatorHandle,
}

#[derive(Default)]
struct ManagerInner {
    config: Option<ReplicationConfig>,
    running: BTreeMap<ReplicatedType, RunningCoordinator>,
    statuses: BTreeMap<ReplicatedType, Arc<watch::Sender<ReplicationStatus>>>,
}

pub struct ReplicationManager<F, S, T> {
    fetcher: Arc<F>,
    store: Arc<S>,
    tenancy: Arc<T>,
    tracker: Arc<ReplicationStatusTracker>,
    metrics: Arc<ReplicationMetrics>,
    inner: Mutex<ManagerInner>,
}

impl<F, S, T> ReplicationManager<F, S, T>
where
    F: ReplicationFetcher,
    S: StateApplier + LocalReader,
    T: TenancyOracle,
{
    /// Create a manager with nothing running. Call [`reload`](Self::reload)
    /// to start replicating.
    pub fn new(fetcher: Arc<F>, store: Arc<S>, tenancy: Arc<T>) -> Self {
        Self {
            fetcher,
            store,
            tenancy,
            tracker: Arc::new(ReplicationStatusTracker::new()),
            metrics: Arc::new(ReplicationMetrics::new()),
            inner: Mutex::new(ManagerInner::default()),
        }
    }

    pub fn tracker(&self) -> Arc<ReplicationStatusTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn metrics(&self) -> Arc<ReplicationMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Configuration applied by the last successful reload.
    pub async fn config(&self) -> Option<ReplicationConfig> {
        self.inner.lock().await.config.clone()
    }

    /// Types with a live coordinator loop.
    pub async fn running_types(&self) -> Vec<ReplicatedType> {
        let inner = self.inner.lock().await;
        inner
            .running
            .iter()
            .filter(|(_, running)| !running.handle.is_finished())
            .map(|(ty, _)| *ty)
            .collect()
    }

    /// Apply `config`: start newly enabled types, restart types whose
    /// settings changed or whose loop exited, stop disabled ones.
    ///
    /// An invalid configuration is rejected before anything changes.
    pub async fn reload(&self, config: ReplicationConfig) -> ReplicationResult<()> {
        config.validate()?;

        let mut inner = self.inner.lock().await;
        let grace = config.shutdown_grace();

        for ty in ReplicatedType::ALL {
            let desired = CoordinatorSettings::for_type(&config, ty);

            if let Some(current) = inner.running.get(&ty) {
                if desired.as_ref() == Some(&current.settings) && !current.handle.is_finished() {
                    continue;
                }
            }
            if let Some(current) = inner.running.remove(&ty) {
                current.handle.stop(grace).await;
            }

            match desired {
                Some(settings) => {
                    let status = self.status_sender(&mut inner, ty);
                    let coordinator = ReplicationCoordinator::new(
                        settings.clone(),
                        Arc::clone(&self.fetcher),
                        Arc::clone(&self.store),
                        Arc::clone(&self.tenancy),
                        status,
                        Arc::clone(&self.metrics),
                    );
                    let handle = coordinator.spawn();
                    inner
                        .running
                        .insert(ty, RunningCoordinator { settings, handle });
                }
                None => {
                    if let Some(status) = inner.statuses.get(&ty) {
                        status.send_modify(|s| {
                            s.enabled = false;
                            s.running = false;
                            s.state = CoordinatorState::Disabled;
                        });
                    }
                }
            }
        }

        let types: Vec<&str> = inner.running.keys().map(|ty| ty.as_str()).collect();
        let types = types.join(",");
        log_event(
            Event::ConfigReloaded,
            &[
                ("datacenter", config.datacenter.as_str()),
                ("source_datacenter", config.source_datacenter().unwrap_or("")),
                ("replicated_types", types.as_str()),
            ],
        );
        inner.config = Some(config);
        Ok(())
    }

    /// Stop every coordinator. Statuses stay tracked with `Running=false`.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        let grace = inner
            .config
            .as_ref()
            .map(ReplicationConfig::shutdown_grace)
            .unwrap_or(DEFAULT_SHUTDOWN_GRACE);

        let running = std::mem::take(&mut inner.running);
        for (_, coordinator) in running {
            coordinator.handle.stop(grace).await;
        }
    }

    fn status_sender(
        &self,
        inner: &mut ManagerInner,
        ty: ReplicatedType,
    ) -> Arc<watch::Sender<ReplicationStatus>> {
        let tracker = &self.tracker;
        let sender = inner.statuses.entry(ty).or_insert_with(|| {
            let (sender, _) = watch::channel(ReplicationStatus::new(ty));
            tracker.register(ty, &sender);
            Arc::new(sender)
        });
        Arc::clone(sender)
    }
}
