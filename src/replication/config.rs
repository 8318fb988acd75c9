//! Replication Configuration
//!
//! Loaded from a JSON file at startup and again on every reload. Replication
//! for a type runs only when a primary datacenter is configured, it differs
//! from the local datacenter, and the type is enabled.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{ReplicationError, ReplicationResult};
use crate::observability::{log_event, Event};
use crate::structs::ReplicatedType;

/// What to do when a batch fails to apply locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyConflictPolicy {
    /// Retry entity by entity and skip the ones that still fail.
    #[default]
    #[serde(rename = "skip")]
    SkipEntity,
    /// Fail the whole round and retry after a backoff.
    #[serde(rename = "abort")]
    AbortBatch,
}

/// Replication configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Local datacenter name.
    pub datacenter: String,

    /// Authoritative datacenter. Unset or equal to `datacenter` means this
    /// datacenter is the source and nothing replicates.
    #[serde(default)]
    pub primary_datacenter: Option<String>,

    #[serde(default = "default_enabled_types")]
    pub enabled_types: Vec<ReplicatedType>,

    /// Also replicate ACL tokens.
    #[serde(default)]
    pub token_replication: bool,

    /// Token attached to every fetch.
    #[serde(default)]
    pub replication_token: String,

    #[serde(default = "default_backoff_min_ms")]
    pub backoff_min_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Jitter as a fraction of the base delay, in `[0, 1]`.
    #[serde(default = "default_backoff_jitter")]
    pub backoff_jitter: f64,

    /// Upper bound for one blocking fetch.
    #[serde(default = "default_blocking_max_wait_ms")]
    pub blocking_max_wait_ms: u64,

    /// Rounds per second per coordinator.
    #[serde(default = "default_replication_rate")]
    pub replication_rate: f64,

    /// Maximum entities per apply call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    #[serde(default)]
    pub conflict_policy: ApplyConflictPolicy,
}

fn default_enabled_types() -> Vec<ReplicatedType> {
    vec![
        ReplicatedType::Policies,
        ReplicatedType::Roles,
        ReplicatedType::ConfigEntries,
        ReplicatedType::Intentions,
        ReplicatedType::FederationStates,
    ]
}

fn default_backoff_min_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_backoff_jitter() -> f64 {
    0.25
}

fn default_blocking_max_wait_ms() -> u64 {
    300_000
}

fn default_replication_rate() -> f64 {
    1.0
}

fn default_batch_size() -> usize {
    100
}

fn default_shutdown_grace_ms() -> u64 {
    5_000
}

impl ReplicationConfig {
    /// Configuration with defaults and no source, so nothing replicates.
    pub fn new(datacenter: impl Into<String>) -> Self {
        Self {
            datacenter: datacenter.into(),
            primary_datacenter: None,
            enabled_types: default_enabled_types(),
            token_replication: false,
            replication_token: String::new(),
            backoff_min_ms: default_backoff_min_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            backoff_jitter: default_backoff_jitter(),
            blocking_max_wait_ms: default_blocking_max_wait_ms(),
            replication_rate: default_replication_rate(),
            batch_size: default_batch_size(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            conflict_policy: ApplyConflictPolicy::default(),
        }
    }

    /// Secondary datacenter replicating from `primary`.
    pub fn secondary(datacenter: impl Into<String>, primary: impl Into<String>) -> Self {
        Self {
            primary_datacenter: Some(primary.into()),
            ..Self::new(datacenter)
        }
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ReplicationResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReplicationError::configuration_error(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_json(&content)?;

        let path = path.display().to_string();
        log_event(
            Event::ConfigLoaded,
            &[
                ("path", path.as_str()),
                ("datacenter", config.datacenter.as_str()),
            ],
        );
        Ok(config)
    }

    pub fn from_json(json: &str) -> ReplicationResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            ReplicationError::configuration_error(format!("Invalid configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ReplicationResult<()> {
        if self.datacenter.trim().is_empty() {
            return Err(ReplicationError::configuration_error(
                "datacenter must not be empty",
            ));
        }
        if let Some(primary) = &self.primary_datacenter {
            if primary.trim().is_empty() {
                return Err(ReplicationError::configuration_error(
                    "primary_datacenter must not be empty when set",
                ));
            }
        }
        if self.backoff_min_ms == 0 {
            return Err(ReplicationError::configuration_error(
                "backoff_min_ms must be greater than zero",
            ));
        }
        if self.backoff_max_ms < self.backoff_min_ms {
            return Err(ReplicationError::configuration_error(format!(
                "backoff_max_ms ({}) is below backoff_min_ms ({})",
                self.backoff_max_ms, self.backoff_min_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.backoff_jitter) {
            return Err(ReplicationError::configuration_error(format!(
                "backoff_jitter must be within [0, 1], got {}",
                self.backoff_jitter
            )));
        }
        if !(self.replication_rate.is_finite() && self.replication_rate > 0.0) {
            return Err(ReplicationError::configuration_error(format!(
                "replication_rate must be positive, got {}",
                self.replication_rate
            )));
        }
        if self.batch_size == 0 {
            return Err(ReplicationError::configuration_error(
                "batch_size must be greater than zero",
            ));
        }
        if self.blocking_max_wait_ms == 0 {
            return Err(ReplicationError::configuration_error(
                "blocking_max_wait_ms must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Datacenter to replicate from, if this one is a secondary.
    pub fn source_datacenter(&self) -> Option<&str> {
        match self.primary_datacenter.as_deref() {
            Some(primary) if primary != self.datacenter => Some(primary),
            _ => None,
        }
    }

    /// Whether a coordinator should run for `ty`.
    pub fn is_type_enabled(&self, ty: ReplicatedType) -> bool {
        if self.source_datacenter().is_none() {
            return false;
        }
        if ty == ReplicatedType::Tokens {
            return self.token_replication;
        }
        self.enabled_types.contains(&ty)
    }

    pub fn backoff_min(&self) -> Duration {
        Duration::from_millis(self.backoff_min_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn blocking_max_wait(&self) -> Duration {
        Duration::from_millis(self.blocking_max_wait_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Minimum spacing between two fetches of one coordinator.
    pub fn round_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.replication_rate)
    }
}
