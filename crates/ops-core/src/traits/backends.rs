//! Backend traits (ports) - the live infrastructure the engine talks to
//!
//! Auditors only use the read side of these traits; every mutating method is
//! reserved for the apply orchestrator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::documents::BucketSpec;
use crate::error::DomainError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, DomainError>;

// ============================================================================
// Database
// ============================================================================

/// Read-only schema introspection
#[async_trait]
pub trait DatabaseInspector: Send + Sync {
    /// Check table existence with a zero-row select
    async fn table_exists(&self, table: &str) -> BackendResult<bool>;

    /// Column names of an existing table
    async fn table_columns(&self, table: &str) -> BackendResult<Vec<String>>;

    /// Whether row-level security is enabled on a table
    async fn rls_enabled(&self, table: &str) -> BackendResult<bool>;

    /// Names of row-level-security policies defined on a table
    async fn table_policies(&self, table: &str) -> BackendResult<Vec<String>>;
}

/// Privileged migration execution
#[async_trait]
pub trait MigrationRunner: Send + Sync {
    /// Execute a migration body atomically
    async fn run_migration(&self, name: &str, sql: &str) -> BackendResult<()>;
}

// ============================================================================
// Storage
// ============================================================================

/// Bucket as reported by the storage provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveBucket {
    pub name: String,
    pub public: bool,
    #[serde(default)]
    pub file_size_limit: Option<u64>,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// List all buckets
    async fn list_buckets(&self) -> BackendResult<Vec<LiveBucket>>;

    /// Create a bucket; returns `DomainError::AlreadyExists` when it is present
    async fn create_bucket(&self, bucket: &BucketSpec) -> BackendResult<()>;

    /// Update visibility and limits of an existing bucket
    async fn update_bucket(&self, bucket: &BucketSpec) -> BackendResult<()>;
}

// ============================================================================
// Environment
// ============================================================================

/// Source of process configuration values
pub trait EnvironmentSource: Send + Sync {
    /// Value of a variable, `None` when unset
    fn var(&self, name: &str) -> Option<String>;
}

// ============================================================================
// Version control
// ============================================================================

/// Request to publish a migration file for review
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPullRequest {
    pub branch: String,
    pub file_path: String,
    pub content: String,
    pub commit_message: String,
    pub title: String,
    pub body: String,
}

/// Opened pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
    pub branch: String,
}

#[async_trait]
pub trait VcsHost: Send + Sync {
    /// Branch from the default head, commit the file, open a pull request.
    ///
    /// Any failing step is reported as `DomainError::VcsError`.
    async fn open_migration_pr(&self, request: &MigrationPullRequest)
        -> BackendResult<PullRequest>;
}

// ============================================================================
// Plan history
// ============================================================================

/// Persisted plan for audit history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub requires_approval: bool,
    pub change_count: i32,
    pub plan: serde_json::Value,
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Persist a generated plan
    async fn save_plan(&self, record: &PlanRecord) -> BackendResult<()>;

    /// Most recent plans, newest first
    async fn recent_plans(&self, limit: i64) -> BackendResult<Vec<PlanRecord>>;
}
