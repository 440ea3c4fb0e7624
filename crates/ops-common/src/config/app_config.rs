//! Application configuration structs
//!
//! Loads configuration from environment variables and an optional `.env` file.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ServerConfig,
    /// Target database; auditing the database scope needs it
    pub database: Option<DatabaseConfig>,
    /// Storage provider API; auditing buckets needs it
    pub storage: Option<StorageApiConfig>,
    /// Version-control identity; absent means migrations stay local
    pub github: Option<GithubConfig>,
    pub ops: OpsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Storage provider API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageApiConfig {
    pub url: String,
    pub service_key: String,
}

/// GitHub repository identity used for migration pull requests
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
}

/// Reconciliation engine settings
#[derive(Debug, Clone, Deserialize)]
pub struct OpsConfig {
    /// Directory holding the desired-state and change-policy documents
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    /// Directory generated migration files are written to
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    /// Global direct-apply capability flag; off unless set explicitly
    #[serde(default)]
    pub allow_direct_apply: bool,
    /// Bearer credential guarding plan and apply
    pub api_token: String,
    /// Persist generated plans when a database is configured
    #[serde(default)]
    pub persist_plans: bool,
}

// Default value functions
fn default_app_name() -> String {
    "ops-control-plane".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_base_branch() -> String {
    "main".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("./ops")
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("./migrations")
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database = var("DATABASE_URL").map(|url| DatabaseConfig {
            url,
            max_connections: var("DATABASE_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_max_connections),
            min_connections: var("DATABASE_MIN_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_min_connections),
        });

        let storage = match (var("STORAGE_API_URL"), var("STORAGE_SERVICE_KEY")) {
            (Some(url), Some(service_key)) => Some(StorageApiConfig { url, service_key }),
            (Some(_), None) => return Err(ConfigError::MissingVar("STORAGE_SERVICE_KEY")),
            _ => None,
        };

        let github = match var("GITHUB_TOKEN") {
            Some(token) => {
                let repository = var("GITHUB_REPOSITORY")
                    .ok_or(ConfigError::MissingVar("GITHUB_REPOSITORY"))?;
                let (owner, repo) = repository
                    .split_once('/')
                    .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
                    .ok_or_else(|| {
                        ConfigError::InvalidValue("GITHUB_REPOSITORY", repository.clone())
                    })?;
                Some(GithubConfig {
                    token,
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    base_branch: var("GITHUB_BASE_BRANCH").unwrap_or_else(default_base_branch),
                    api_url: var("GITHUB_API_URL").unwrap_or_else(default_github_api_url),
                })
            }
            None => None,
        };

        Ok(Self {
            app: AppSettings {
                name: var("APP_NAME").unwrap_or_else(default_app_name),
                env: var("APP_ENV")
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            api: ServerConfig {
                host: var("API_HOST").unwrap_or_else(default_host),
                port: var("API_PORT")
                    .and_then(|s| s.parse().ok())
                    .ok_or(ConfigError::MissingVar("API_PORT"))?,
            },
            database,
            storage,
            github,
            ops: OpsConfig {
                config_dir: var("OPS_CONFIG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_config_dir),
                migrations_dir: var("OPS_MIGRATIONS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_migrations_dir),
                allow_direct_apply: parse_flag("OPS_ALLOW_DIRECT_APPLY", var("OPS_ALLOW_DIRECT_APPLY"))?,
                api_token: var("OPS_API_TOKEN").ok_or(ConfigError::MissingVar("OPS_API_TOKEN"))?,
                persist_plans: parse_flag("OPS_PERSIST_PLANS", var("OPS_PERSIST_PLANS"))?,
            },
        })
    }
}

/// Parse an explicit boolean flag; unset means false
fn parse_flag(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(false),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue(name, other.to_string())),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
