//! Nested request options
//!
//! Read requests carry [`QueryOptions`], writes carry a [`WriteRequest`].
//! The capability traits in `info` delegate to these records; the records
//! themselves know nothing about the message they are nested in.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::errors::{RpcError, RpcResult};

/// Divisor for the extra hold granted to blocking queries so that many
/// callers blocked on the same index do not all return at once.
pub const JITTER_FRACTION: u32 = 16;

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Options for read requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct QueryOptions {
    /// ACL token secret
    pub token: String,
    /// Block until the result index exceeds this value; zero means do not block
    pub min_query_index: u64,
    /// Caller's maximum blocking time
    #[serde(with = "duration_ms")]
    pub max_query_time: Duration,
    /// Any server may answer, not only the leader
    pub allow_stale: bool,
    /// Leader must confirm leadership before answering
    pub require_consistent: bool,
    /// Upper bound on staleness for stale reads; zero means unbounded
    #[serde(with = "duration_ms")]
    pub max_stale_duration: Duration,
    /// Server-side result filter expression
    pub filter: String,
}

impl QueryOptions {
    /// Whether this is a blocking query.
    pub fn is_blocking(&self) -> bool {
        self.min_query_index > 0
    }

    pub fn allow_stale_read(&self) -> bool {
        self.allow_stale
    }

    pub fn token_secret(&self) -> &str {
        &self.token
    }

    pub fn set_token_secret(&mut self, secret: &str) {
        self.token = secret.to_string();
    }

    /// Reject option combinations that have no meaning.
    pub fn validate(&self) -> RpcResult<()> {
        if self.allow_stale && self.require_consistent {
            return Err(RpcError::InvalidQueryOptions(
                "stale and consistent reads are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }

    /// Time the server may hold this query open.
    ///
    /// `min_wait` applies when the caller gave no wait, `max_wait` caps the
    /// caller's wait. A `JITTER_FRACTION` share is added on top.
    pub fn blocking_timeout(&self, min_wait: Duration, max_wait: Duration) -> Duration {
        let wait = if self.max_query_time.is_zero() {
            min_wait
        } else {
            self.max_query_time.min(max_wait)
        };
        wait + wait / JITTER_FRACTION
    }

    /// Whether a query that started at `start` has outlived its hold time.
    pub fn has_timed_out(
        &self,
        start: Instant,
        rpc_hold_timeout: Duration,
        min_wait: Duration,
        max_wait: Duration,
    ) -> RpcResult<bool> {
        self.timed_out_after(start.elapsed(), rpc_hold_timeout, min_wait, max_wait)
    }

    /// [`has_timed_out`](Self::has_timed_out) with the elapsed time given.
    pub fn timed_out_after(
        &self,
        elapsed: Duration,
        rpc_hold_timeout: Duration,
        min_wait: Duration,
        max_wait: Duration,
    ) -> RpcResult<bool> {
        self.validate()?;
        let mut limit = rpc_hold_timeout;
        if self.is_blocking() {
            limit += self.blocking_timeout(min_wait, max_wait);
        }
        Ok(elapsed > limit)
    }
}

/// Options for write requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct WriteRequest {
    /// ACL token secret
    pub token: String,
}

impl WriteRequest {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token_secret(&self) -> &str {
        &self.token
    }

    pub fn set_token_secret(&mut self, secret: &str) {
        self.token = secret.to_string();
    }

    /// Writes never block, so only the hold timeout applies.
    pub fn has_timed_out(
        &self,
        start: Instant,
        rpc_hold_timeout: Duration,
        _min_wait: Duration,
        _max_wait: Duration,
    ) -> RpcResult<bool> {
        Ok(start.elapsed() > rpc_hold_timeout)
    }
}

/// Datacenter a request targets, as a nested record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TargetDatacenter {
    pub datacenter: String,
}

impl TargetDatacenter {
    pub fn new(datacenter: impl Into<String>) -> Self {
        Self {
            datacenter: datacenter.into(),
        }
    }
}

/// Metadata returned with every read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct QueryMeta {
    /// Index of the data returned; callers block above it next time
    pub index: u64,
    /// Time since the answering server last heard from the leader
    #[serde(with = "duration_ms")]
    pub last_contact: Duration,
    pub known_leader: bool,
    /// "leader", "stale" or "consistent"
    pub consistency_level: String,
}
