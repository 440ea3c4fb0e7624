//! # ops-common
//!
//! Shared utilities including configuration, error handling, API credentials, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::ApiToken;
pub use config::{
    AppConfig, AppSettings, ConfigError, DatabaseConfig, Environment, GithubConfig, OpsConfig,
    ServerConfig, StorageApiConfig,
};
pub use error::{AppError, AppResult, ErrorResponse};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
