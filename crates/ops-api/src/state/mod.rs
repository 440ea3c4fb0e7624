//! Application state
//!
//! Holds the shared state for the Axum application: the service context,
//! the API credential, and the database pool probed by readiness checks.

use std::sync::Arc;

use ops_common::ApiToken;
use ops_db::PgPool;
use ops_service::ServiceContext;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Service context containing all dependencies
    service_context: Arc<ServiceContext>,
    /// Bearer credential for plan and apply
    api_token: ApiToken,
    /// Target database pool, when one is configured
    pool: Option<PgPool>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service_context: ServiceContext, api_token: ApiToken) -> Self {
        Self {
            service_context: Arc::new(service_context),
            api_token,
            pool: None,
        }
    }

    /// Attach the database pool used for readiness probes
    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Get the service context
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Get the configured API token
    pub fn api_token(&self) -> &ApiToken {
        &self.api_token
    }

    /// Get the database pool, if configured
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service_context", &self.service_context)
            .field("api_token", &self.api_token)
            .field("pool", &self.pool.is_some())
            .finish()
    }
}
