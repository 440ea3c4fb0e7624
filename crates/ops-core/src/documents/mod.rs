//! Declarative documents - desired state and change policy

mod change_policy;
mod desired_state;

use thiserror::Error;

pub use change_policy::{ChangePolicy, PolicyAction, PolicyRule, RiskLevel};
pub use desired_state::{
    BucketSpec, ColumnSpec, DatabaseSpec, DesiredState, EnvironmentSpec, IndexKind, IndexSpec,
    PaymentSpec, PolicyCommand, RlsPolicySpec, StorageSpec, TableSpec,
};

/// Errors raised while loading or validating a declarative document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("{document} document not found in {dir}")]
    Missing { document: &'static str, dir: String },

    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid {kind} name: {name:?}")]
    InvalidIdentifier { kind: &'static str, name: String },

    #[error("Duplicate {kind}: {name}")]
    Duplicate { kind: &'static str, name: String },

    #[error("Invalid column {column} on {table}: {reason}")]
    InvalidColumn {
        table: String,
        column: String,
        reason: String,
    },

    #[error("Invalid index {index} on {table}: {reason}")]
    InvalidIndex {
        table: String,
        index: String,
        reason: String,
    },

    #[error("Invalid policy {policy:?} on {table}: {reason}")]
    InvalidPolicy {
        table: String,
        policy: String,
        reason: String,
    },
}
