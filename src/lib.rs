//! dcsync - cross-datacenter replication of ACL and configuration state
//!
//! - `structs`: replicated records and their index bookkeeping
//! - `rpc`: per-request consistency, routing and token propagation
//! - `replication`: coordinators that keep secondaries converged
//! - `observability`: structured logs and counters
//! - `http_server`: read-only status endpoint

pub mod http_server;
pub mod observability;
pub mod replication;
pub mod rpc;
pub mod structs;
