//! Desired-state document - the declared target shape of the platform

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::DocumentError;

/// Root of the desired-state document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredState {
    #[serde(default)]
    pub database: DatabaseSpec,
    #[serde(default)]
    pub storage: StorageSpec,
    #[serde(default)]
    pub environment: EnvironmentSpec,
    #[serde(default)]
    pub payment: PaymentSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSpec {
    #[serde(default)]
    pub tables: Vec<TableSpec>,
}

/// Declared table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    pub name: String,
    #[serde(default)]
    pub rls_enabled: bool,
    #[serde(default)]
    pub required_columns: Vec<ColumnSpec>,
    /// Optional tables are never proposed for creation
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    #[serde(default)]
    pub policies: Vec<RlsPolicySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Referenced table; the foreign key targets its `id` column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    #[default]
    Btree,
    /// GIN index over `to_tsvector(language, column)`
    FullText,
    /// IVFFlat index over a pgvector column
    Vector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub kind: IndexKind,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ops: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lists: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCommand {
    #[default]
    All,
    Select,
    Insert,
    Update,
    Delete,
}

impl PolicyCommand {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// Row-level-security policy declared on a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RlsPolicySpec {
    pub name: String,
    #[serde(default)]
    pub command: PolicyCommand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSpec {
    #[serde(default)]
    pub buckets: Vec<BucketSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BucketSpec {
    pub name: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_mime_types: Option<Vec<String>>,
}

/// Environment variables keyed by category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentSpec {
    #[serde(default)]
    pub required: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub optional: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentSpec {
    #[serde(default = "default_secret_var")]
    pub secret_var: String,
    #[serde(default)]
    pub price_vars: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret_var: Option<String>,
}

impl Default for PaymentSpec {
    fn default() -> Self {
        Self {
            secret_var: default_secret_var(),
            price_vars: Vec::new(),
            webhook_secret_var: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_secret_var() -> String {
    "STRIPE_SECRET_KEY".to_string()
}

impl DesiredState {
    /// Validate names and index declarations
    pub fn validate(&self) -> Result<(), DocumentError> {
        let mut tables = BTreeSet::new();
        for table in &self.database.tables {
            check_identifier("table", &table.name, false)?;
            if !tables.insert(table.name.as_str()) {
                return Err(DocumentError::Duplicate {
                    kind: "table",
                    name: table.name.clone(),
                });
            }
            table.validate()?;
        }

        let mut buckets = BTreeSet::new();
        for bucket in &self.storage.buckets {
            check_identifier("bucket", &bucket.name, true)?;
            if !buckets.insert(bucket.name.as_str()) {
                return Err(DocumentError::Duplicate {
                    kind: "bucket",
                    name: bucket.name.clone(),
                });
            }
        }

        for name in self
            .environment
            .required
            .values()
            .chain(self.environment.optional.values())
            .flatten()
        {
            check_identifier("environment variable", name, false)?;
        }

        check_identifier("environment variable", &self.payment.secret_var, false)?;
        for name in self
            .payment
            .price_vars
            .iter()
            .chain(self.payment.webhook_secret_var.iter())
        {
            check_identifier("environment variable", name, false)?;
        }

        Ok(())
    }
}

impl TableSpec {
    fn validate(&self) -> Result<(), DocumentError> {
        for column in &self.required_columns {
            check_identifier("column", &column.name, false)?;
            if column.data_type.trim().is_empty() || contains_statement_break(&column.data_type) {
                return Err(DocumentError::InvalidColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                    reason: "type must be a single non-empty SQL type".to_string(),
                });
            }
            if column.default.as_deref().is_some_and(contains_statement_break) {
                return Err(DocumentError::InvalidColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                    reason: "default must be a single expression".to_string(),
                });
            }
            if let Some(target) = &column.references {
                check_identifier("table", target, false)?;
            }
        }

        for index in &self.indexes {
            check_identifier("index", &index.name, false)?;
            let invalid = |reason: &str| DocumentError::InvalidIndex {
                table: self.name.clone(),
                index: index.name.clone(),
                reason: reason.to_string(),
            };
            if index.columns.is_empty() {
                return Err(invalid("at least one column is required"));
            }
            for column in &index.columns {
                check_identifier("column", column, false)?;
            }
            if index.kind != IndexKind::Btree && index.columns.len() != 1 {
                return Err(invalid("full-text and vector indexes take exactly one column"));
            }
            if index.kind != IndexKind::Btree && index.unique {
                return Err(invalid("only b-tree indexes can be unique"));
            }
            if let Some(ops) = &index.ops {
                check_identifier("operator class", ops, false)?;
            }
            if index.lists == Some(0) {
                return Err(invalid("lists must be positive"));
            }
            if let Some(language) = &index.language {
                check_identifier("text search language", language, false)?;
            }
        }

        for policy in &self.policies {
            if policy.name.trim().is_empty()
                || policy.name.contains('\'')
                || policy.name.contains('"')
                || policy.name.contains("$$")
            {
                return Err(DocumentError::InvalidIdentifier {
                    kind: "policy",
                    name: policy.name.clone(),
                });
            }
            let expressions = policy.using.iter().chain(policy.check.iter());
            for expression in expressions {
                if contains_statement_break(expression) {
                    return Err(DocumentError::InvalidPolicy {
                        table: self.name.clone(),
                        policy: policy.name.clone(),
                        reason: "expressions must not contain ';' or '$$'".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn contains_statement_break(value: &str) -> bool {
    value.contains(';') || value.contains("$$")
}

fn check_identifier(kind: &'static str, name: &str, allow_dash: bool) -> Result<(), DocumentError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => chars
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || (allow_dash && c == '-')),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(DocumentError::InvalidIdentifier {
            kind,
            name: name.to_string(),
        })
    }
}
