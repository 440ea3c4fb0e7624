//! # ops-core
//!
//! Domain layer of the ops control plane: detected changes, planned changes,
//! apply outcomes, the declarative desired-state and change-policy documents,
//! and the port traits live backends implement.
//! This crate has zero dependencies on infrastructure (database, HTTP, etc.).

pub mod documents;
pub mod entities;
pub mod error;
pub mod sql;
pub mod traits;

// Re-export commonly used types at crate root
pub use documents::{
    BucketSpec, ChangePolicy, ColumnSpec, DatabaseSpec, DesiredState, DocumentError,
    EnvironmentSpec, IndexKind, IndexSpec, PaymentSpec, PolicyAction, PolicyCommand, PolicyRule,
    RiskLevel, RlsPolicySpec, StorageSpec, TableSpec,
};
pub use entities::{
    ApplyEntry, ApplyGroup, ApplyMethod, ApplyOutcome, AuditScope, Change, ChangeAction,
    ChangeType, PlanMode, PlannedChange, Scope, Severity,
};
pub use error::DomainError;
pub use traits::{
    BackendResult, DatabaseInspector, EnvironmentSource, LiveBucket, MigrationPullRequest,
    MigrationRunner, PlanRecord, PlanStore, PullRequest, StorageBackend, VcsHost,
};
