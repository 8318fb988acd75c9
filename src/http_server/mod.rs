//! # HTTP Server Module
//!
//! Read-only status surface for replication.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/v1/replication/status` - Every tracked replication status
//! - `/v1/replication/status/:type` - One type, 404 if unknown or untracked
//! - `/v1/replication/metrics` - Replication counters

pub mod config;
pub mod replication_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use replication_routes::{replication_routes, ReplicationApiState};
pub use server::HttpServer;
