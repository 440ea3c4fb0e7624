//! Middleware stack for the API server
//!
//! Every request gets an `x-request-id` (generated unless supplied), a
//! tracing span carrying it, and an upper bound on its duration.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header::HeaderName, Request, StatusCode},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, MakeSpan, TraceLayer},
};
use tracing::{Level, Span};

use crate::state::AppState;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Default bound for one request; an apply may open a pull request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Span factory tagging each request with its ID
#[derive(Debug, Clone, Copy, Default)]
pub struct OpsRequestSpan;

impl MakeSpan<Body> for OpsRequestSpan {
    fn make_span(&mut self, request: &Request<Body>) -> Span {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");

        tracing::info_span!(
            "ops_request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %request_id,
        )
    }
}

fn trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, OpsRequestSpan> {
    TraceLayer::new_for_http()
        .make_span_with(OpsRequestSpan)
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO))
        .on_failure(DefaultOnFailure::new().level(Level::ERROR))
}

/// Apply the middleware stack with the default timeout
pub fn apply_middleware(router: Router<AppState>) -> Router<AppState> {
    apply_middleware_with_timeout(router, DEFAULT_REQUEST_TIMEOUT)
}

/// Apply the middleware stack; timed-out requests get 503
pub fn apply_middleware_with_timeout(
    router: Router<AppState>,
    timeout: Duration,
) -> Router<AppState> {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(trace_layer())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::SERVICE_UNAVAILABLE,
                timeout,
            )),
    )
}
