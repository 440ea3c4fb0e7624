//! Route definitions
//!
//! Ops routes are mounted under /api/v1; health probes sit at the root.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{health, ops};
use crate::state::AppState;

/// Create the main API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .merge(health_routes())
}

/// Health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

/// API v1 routes
fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/ops/plan", post(ops::create_plan))
        .route("/ops/apply", post(ops::apply_changes))
        .route("/ops/plans", get(ops::list_plans))
}
