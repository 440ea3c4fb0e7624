//! Apply outcome - what happened to each selected change

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::change::{Change, ChangeType, Scope};

/// Group a change is applied in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyGroup {
    Database,
    Storage,
    Environment,
    Payment,
    /// Requested change ID that did not resolve to a detected change
    Unknown,
}

impl ApplyGroup {
    /// Resolve the group a change is applied in
    #[must_use]
    pub fn of(change: &Change) -> Self {
        match change.scope {
            Scope::Database if change.change_type.is_bucket() => Self::Storage,
            Scope::Database => Self::Database,
            Scope::Environment => Self::Environment,
            Scope::Payment => Self::Payment,
        }
    }

    /// Best-effort group for a raw change ID
    #[must_use]
    pub fn from_change_id(id: &str) -> Self {
        let mut parts = id.splitn(3, '.');
        match (parts.next(), parts.next()) {
            (Some("database"), Some(kind))
                if kind == ChangeType::CreateBucket.as_str()
                    || kind == ChangeType::UpdateBucket.as_str() =>
            {
                Self::Storage
            }
            (Some("database"), Some(_)) => Self::Database,
            (Some("environment"), Some(_)) => Self::Environment,
            (Some("payment"), Some(_)) => Self::Payment,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Storage => "storage",
            Self::Environment => "environment",
            Self::Payment => "payment",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ApplyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy used to apply a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMethod {
    DirectApply,
    GithubPr,
    LocalMigrationFile,
    Manual,
}

/// One entry of an apply outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyEntry {
    pub scope: ApplyGroup,
    pub method: ApplyMethod,
    pub change_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub manual_action_required: bool,
    /// Variable or price name a human needs to provide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl ApplyEntry {
    #[must_use]
    pub fn new(scope: ApplyGroup, method: ApplyMethod, change_ids: Vec<String>) -> Self {
        Self {
            scope,
            method,
            change_ids,
            pr_url: None,
            branch: None,
            migration_file: None,
            note: None,
            error: None,
            manual_action_required: false,
            resource: None,
        }
    }

    /// Entry for a change a human has to carry out
    #[must_use]
    pub fn manual(scope: ApplyGroup, change: &Change) -> Self {
        let mut entry = Self::new(scope, ApplyMethod::Manual, vec![change.id.clone()]);
        entry.manual_action_required = true;
        entry.resource = change.resource_name().map(str::to_string);
        entry.note = Some(change.description.clone());
        entry
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    #[must_use]
    pub fn with_migration_file(mut self, path: impl Into<String>) -> Self {
        self.migration_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_pull_request(mut self, url: impl Into<String>, branch: impl Into<String>) -> Self {
        self.pr_url = Some(url.into());
        self.branch = Some(branch.into());
        self
    }
}

/// Result of one apply invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub timestamp: DateTime<Utc>,
    pub applied: Vec<ApplyEntry>,
    pub failed: Vec<ApplyEntry>,
    pub skipped: Vec<ApplyEntry>,
}

impl ApplyOutcome {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            applied: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Count of change IDs per bucket: (applied, failed, skipped)
    #[must_use]
    pub fn counts(&self) -> (usize, usize, usize) {
        let count = |entries: &[ApplyEntry]| entries.iter().map(|e| e.change_ids.len()).sum();
        (count(&self.applied), count(&self.failed), count(&self.skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ChangeAction, Severity};

    #[test]
    fn test_group_of_change() {
        let bucket = Change::new(
            Scope::Database,
            ChangeType::UpdateBucket,
            "avatars",
            Severity::Low,
            ChangeAction::Update,
            "",
        );
        let table = Change::new(
            Scope::Database,
            ChangeType::CreateTable,
            "campaigns",
            Severity::High,
            ChangeAction::Create,
            "",
        );
        assert_eq!(ApplyGroup::of(&bucket), ApplyGroup::Storage);
        assert_eq!(ApplyGroup::of(&table), ApplyGroup::Database);
    }

    #[test]
    fn test_group_from_change_id() {
        assert_eq!(
            ApplyGroup::from_change_id("database.create_bucket.avatars"),
            ApplyGroup::Storage
        );
        assert_eq!(
            ApplyGroup::from_change_id("database.create_table.campaigns"),
            ApplyGroup::Database
        );
        assert_eq!(
            ApplyGroup::from_change_id("environment.set_env_var.SMTP_HOST"),
            ApplyGroup::Environment
        );
        assert_eq!(ApplyGroup::from_change_id("garbage"), ApplyGroup::Unknown);
    }

    #[test]
    fn test_counts() {
        let mut outcome = ApplyOutcome::new(Utc::now());
        outcome.applied.push(ApplyEntry::new(
            ApplyGroup::Database,
            ApplyMethod::LocalMigrationFile,
            vec!["a".into(), "b".into()],
        ));
        outcome
            .skipped
            .push(ApplyEntry::new(ApplyGroup::Environment, ApplyMethod::Manual, vec!["c".into()]));
        assert_eq!(outcome.counts(), (2, 0, 1));
    }
}
