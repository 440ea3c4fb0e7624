//! Health check handlers
//!
//! Endpoints for liveness and readiness probes.

use axum::{extract::State, http::StatusCode, Json};
use ops_service::dto::{HealthResponse, ReadinessResponse};
use ops_service::OpsService;

use crate::state::AppState;

/// Basic health check (liveness probe)
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Readiness check: documents load and the database, if any, answers
///
/// GET /health/ready
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let documents_valid = OpsService::new(state.service_context()).documents_valid().await;

    let db_healthy = match state.pool() {
        Some(pool) => Some(pool.acquire().await.is_ok()),
        None => None,
    };

    let response = ReadinessResponse::ready(documents_valid, db_healthy);
    let status = if documents_valid && db_healthy != Some(false) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
