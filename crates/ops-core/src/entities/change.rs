//! Change entity - one detected discrepancy between desired and live state

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Infrastructure scope a change belongs to.
///
/// Storage-provider changes are folded into the database scope; the apply
/// orchestrator separates them again by change type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Database,
    Environment,
    Payment,
}

impl Scope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Environment => "environment",
            Self::Payment => "payment",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auditable scope selector used by the plan trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditScope {
    Database,
    Storage,
    Environment,
    Payment,
}

impl AuditScope {
    /// All scopes, in audit order
    pub const ALL: [AuditScope; 4] = [
        AuditScope::Database,
        AuditScope::Storage,
        AuditScope::Environment,
        AuditScope::Payment,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Storage => "storage",
            Self::Environment => "environment",
            Self::Payment => "payment",
        }
    }

    /// Scope carried by changes this auditor emits
    #[must_use]
    pub fn change_scope(self) -> Scope {
        match self {
            Self::Database | Self::Storage => Scope::Database,
            Self::Environment => Scope::Environment,
            Self::Payment => Scope::Payment,
        }
    }
}

impl fmt::Display for AuditScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of drift detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    CreateTable,
    AddColumn,
    CreateIndex,
    EnableRls,
    CreatePolicy,
    CreateBucket,
    UpdateBucket,
    SetEnvVar,
    VerifyPrice,
    VerifyStripe,
    VerifyIndex,
    /// Diagnostic emitted when a scope's backend could not be audited
    AuditFailure,
}

impl ChangeType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateTable => "create_table",
            Self::AddColumn => "add_column",
            Self::CreateIndex => "create_index",
            Self::EnableRls => "enable_rls",
            Self::CreatePolicy => "create_policy",
            Self::CreateBucket => "create_bucket",
            Self::UpdateBucket => "update_bucket",
            Self::SetEnvVar => "set_env_var",
            Self::VerifyPrice => "verify_price",
            Self::VerifyStripe => "verify_stripe",
            Self::VerifyIndex => "verify_index",
            Self::AuditFailure => "audit_failure",
        }
    }

    /// Bucket changes are applied through the storage provider, not SQL
    #[inline]
    #[must_use]
    pub fn is_bucket(self) -> bool {
        matches!(self, Self::CreateBucket | Self::UpdateBucket)
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity assigned by the auditor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What resolving the change involves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Create,
    Update,
    Verify,
    Manual,
}

/// Change entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub id: String,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub scope: Scope,
    pub severity: Severity,
    pub description: String,
    pub desired: Value,
    /// Observed state, `None` when the target is absent
    pub current: Option<Value>,
    pub action: ChangeAction,
}

impl Change {
    /// Create a new change whose ID is derived from scope, type and target
    #[must_use]
    pub fn new(
        scope: Scope,
        change_type: ChangeType,
        target: &str,
        severity: Severity,
        action: ChangeAction,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Self::derive_id(scope, change_type, target),
            change_type,
            scope,
            severity,
            description: description.into(),
            desired: Value::Null,
            current: None,
            action,
        }
    }

    /// Stable change ID: `{scope}.{type}.{target}`
    #[must_use]
    pub fn derive_id(scope: Scope, change_type: ChangeType, target: &str) -> String {
        format!("{scope}.{change_type}.{target}")
    }

    #[must_use]
    pub fn with_desired(mut self, desired: Value) -> Self {
        self.desired = desired;
        self
    }

    #[must_use]
    pub fn with_current(mut self, current: Value) -> Self {
        self.current = Some(current);
        self
    }

    /// Target portion of the ID (table, bucket, variable name, ...)
    #[must_use]
    pub fn target(&self) -> &str {
        let prefix_len = self.scope.as_str().len() + self.change_type.as_str().len() + 2;
        self.id.get(prefix_len..).unwrap_or(&self.id)
    }

    /// Name of the variable or resource a human must act on, if recorded
    #[must_use]
    pub fn resource_name(&self) -> Option<&str> {
        self.desired.get("name").and_then(Value::as_str)
    }
}
