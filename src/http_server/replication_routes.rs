//! Replication HTTP Routes
//!
//! Read-only views over the status tracker and the replication counters.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::observability::{MetricsSnapshot, ReplicationMetrics};
use crate::replication::{ReplicationStatus, ReplicationStatusTracker};
use crate::structs::ReplicatedType;

/// State shared by the replication handlers
#[derive(Clone)]
pub struct ReplicationApiState {
    pub tracker: Arc<ReplicationStatusTracker>,
    pub metrics: Arc<ReplicationMetrics>,
}

impl ReplicationApiState {
    pub fn new(tracker: Arc<ReplicationStatusTracker>, metrics: Arc<ReplicationMetrics>) -> Self {
        Self { tracker, metrics }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn not_found(message: String) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message,
            code: StatusCode::NOT_FOUND.as_u16(),
        }),
    )
}

/// Create replication routes
pub fn replication_routes(state: ReplicationApiState) -> Router {
    Router::new()
        .route("/status", get(list_status_handler))
        .route("/status/:replicated_type", get(get_status_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn list_status_handler(
    State(state): State<ReplicationApiState>,
) -> Json<Vec<ReplicationStatus>> {
    Json(state.tracker.snapshot())
}

async fn get_status_handler(
    State(state): State<ReplicationApiState>,
    Path(replicated_type): Path<String>,
) -> Result<Json<ReplicationStatus>, ApiError> {
    let ty: ReplicatedType = replicated_type
        .parse()
        .map_err(|e: crate::structs::UnknownReplicatedType| not_found(e.to_string()))?;

    state
        .tracker
        .get(ty)
        .map(Json)
        .ok_or_else(|| not_found(format!("{} is not replicated here", ty)))
}

async fn metrics_handler(State(state): State<ReplicationApiState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
