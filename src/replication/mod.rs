//! Replication Subsystem
//!
//! Secondary datacenters copy ACL and configuration state from the primary
//! datacenter, one coordinator per replicated type:
//!
//! - Fetches are blocking reads above the last replicated index
//! - Records equivalent to the local copy are never re-applied
//! - The replicated index never decreases
//! - At most one fetch/apply cycle per type is in flight
//! - Transient failures back off with jitter; fatal ones stop only the
//!   affected type
//!
//! Replication is asynchronous and eventually consistent. Nothing here
//! coordinates writes across datacenters.

mod backoff;
mod config;
mod coordinator;
mod errors;
mod fetcher;
mod interfaces;
mod manager;
mod memory;
mod state;
mod status;

pub use backoff::Backoff;
pub use config::{ApplyConflictPolicy, ReplicationConfig};
pub use coordinator::{CoordinatorHandle, CoordinatorSettings, ReplicationCoordinator, RoundOutcome};
pub use errors::{ReplicationError, ReplicationErrorKind, ReplicationResult};
pub use fetcher::RpcReplicationFetcher;
pub use interfaces::{
    DefaultTenancy, FetchResponse, LocalReader, ReplicationFetcher, StateApplier, TenancyOracle,
};
pub use manager::ReplicationManager;
pub use memory::MemoryStateStore;
pub use state::CoordinatorState;
pub use status::{ReplicationStatus, ReplicationStatusTracker};
