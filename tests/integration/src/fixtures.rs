//! Test fixtures: ops documents and in-memory backends

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ops_core::{
    BackendResult, DatabaseInspector, DomainError, MigrationRunner, PlanRecord, PlanStore,
};

/// Desired state: one missing table, one bucket, one env var, one price
pub const DESIRED_STATE: &str = r#"
database:
  tables:
    - name: campaigns
      rls_enabled: true
      required_columns:
        - { name: title, type: text, nullable: false }
storage:
  buckets:
    - { name: avatars, public: true }
environment:
  required:
    email: [SMTP_HOST]
payment:
  price_vars: [STRIPE_PRICE_PRO]
"#;

/// Policy: tables need approval, bucket updates apply automatically
pub const CHANGE_POLICY: &str = r#"
database:
  create_table: { requires_approval: true, risk_level: high, action: generate_pr }
storage:
  update_bucket: { requires_approval: false, risk_level: low, action: auto_apply }
  create_bucket: { requires_approval: false, risk_level: low, action: auto_apply }
environment:
  set_env_var: { requires_approval: false, risk_level: medium, action: manual }
"#;

/// Write both documents into `dir`
pub fn write_documents(dir: &Path) -> std::io::Result<()> {
    std::fs::write(dir.join("desired-state.yaml"), DESIRED_STATE)?;
    std::fs::write(dir.join("change-policy.yaml"), CHANGE_POLICY)
}

/// Live shape of one table
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub columns: Vec<String>,
    pub rls_enabled: bool,
    pub policies: Vec<String>,
}

/// In-memory target database
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    pub tables: BTreeMap<String, MemoryTable>,
    pub migrations: Mutex<Vec<(String, String)>>,
}

impl MemoryDatabase {
    pub fn with_table(mut self, name: &str, table: MemoryTable) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }

    /// Names of migrations run so far
    pub fn migration_names(&self) -> Vec<String> {
        self.migrations
            .lock()
            .map(|m| m.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseInspector for MemoryDatabase {
    async fn table_exists(&self, table: &str) -> BackendResult<bool> {
        Ok(self.tables.contains_key(table))
    }

    async fn table_columns(&self, table: &str) -> BackendResult<Vec<String>> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn rls_enabled(&self, table: &str) -> BackendResult<bool> {
        Ok(self.tables.get(table).is_some_and(|t| t.rls_enabled))
    }

    async fn table_policies(&self, table: &str) -> BackendResult<Vec<String>> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.policies.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl MigrationRunner for MemoryDatabase {
    async fn run_migration(&self, name: &str, sql: &str) -> BackendResult<()> {
        self.migrations
            .lock()
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?
            .push((name.to_string(), sql.to_string()));
        Ok(())
    }
}

/// In-memory plan history
#[derive(Debug, Default)]
pub struct MemoryPlanStore {
    plans: Mutex<Vec<PlanRecord>>,
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn save_plan(&self, record: &PlanRecord) -> BackendResult<()> {
        self.plans
            .lock()
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?
            .push(record.clone());
        Ok(())
    }

    async fn recent_plans(&self, limit: i64) -> BackendResult<Vec<PlanRecord>> {
        let plans = self
            .plans
            .lock()
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?;
        Ok(plans.iter().rev().take(limit as usize).cloned().collect())
    }
}
