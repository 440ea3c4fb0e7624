//! Server setup and initialization
//!
//! Provides the main application builder and server runner.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use ops_common::{ApiToken, AppConfig, AppError};
use ops_db::{create_pool, ensure_schema, PgMigrationRunner, PgPlanStore, PgSchemaInspector};
use ops_providers::{
    GitHubClient, GitHubClientConfig, ProcessEnvironment, StorageApiClient, StorageClientConfig,
};
use ops_service::{OpsSettings, ServiceContextBuilder};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::middleware::apply_middleware;
use crate::routes::create_router;
use crate::state::AppState;

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let router = create_router();
    let router = apply_middleware(router);
    router.with_state(state)
}

/// Initialize all backends and create AppState
///
/// Unconfigured backends are left out of the context; the affected scopes
/// then report audit failures instead of blocking startup.
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    let settings = OpsSettings::from(&config.ops);
    let mut builder = ServiceContextBuilder::new()
        .environment(Arc::new(ProcessEnvironment))
        .settings(settings.clone());

    let mut pool = None;
    if let Some(database) = &config.database {
        let db_config = ops_db::DatabaseConfig {
            url: database.url.clone(),
            max_connections: database.max_connections,
            min_connections: database.min_connections,
            ..Default::default()
        };
        let db_pool = create_pool(&db_config).map_err(|e| AppError::Database(e.to_string()))?;

        builder = builder
            .inspector(Arc::new(PgSchemaInspector::new(db_pool.clone())))
            .migration_runner(Arc::new(PgMigrationRunner::new(db_pool.clone())));

        // Bookkeeping tables back both direct apply history and plan history.
        match ensure_schema(&db_pool).await {
            Ok(()) if settings.persist_plans => {
                builder = builder.plan_store(Arc::new(PgPlanStore::new(db_pool.clone())));
            }
            Ok(()) => {}
            Err(e) => warn!(error = %e, "Ops bookkeeping schema unavailable; plans will not be persisted"),
        }

        info!("Target database configured");
        pool = Some(db_pool);
    } else {
        warn!("DATABASE_URL not set; database audits will report a failure");
    }

    if let Some(storage) = &config.storage {
        let client = StorageApiClient::new(StorageClientConfig::new(
            storage.url.clone(),
            storage.service_key.clone(),
        ))?;
        builder = builder.storage(Arc::new(client));
        info!("Storage API configured");
    }

    if let Some(github) = &config.github {
        let client = GitHubClient::new(
            GitHubClientConfig::new(
                github.token.clone(),
                github.owner.clone(),
                github.repo.clone(),
                github.base_branch.clone(),
            )
            .with_api_url(github.api_url.clone()),
        )?;
        builder = builder.vcs(Arc::new(client));
        info!(owner = %github.owner, repo = %github.repo, "GitHub pull requests enabled");
    }

    let service_context = builder.build().map_err(|e| AppError::Config(e.to_string()))?;

    let state = AppState::new(service_context, ApiToken::new(config.ops.api_token.clone()));
    Ok(match pool {
        Some(pool) => state.with_pool(pool),
        None => state,
    })
}

/// Run the HTTP server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let address = config.api.address();
    let addr: SocketAddr = address
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid listen address {}: {}", address, e)))?;

    let state = create_app_state(config).await?;
    let app = create_app(state);

    run_server(app, addr).await
}
