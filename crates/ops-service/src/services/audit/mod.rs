//! Scope auditors
//!
//! Auditors are read-only: they compare one scope of the desired state with
//! its live backend and emit changes in declaration order. Requested scopes
//! run concurrently; a scope whose backend fails is reported as a warning
//! plus an `audit_failure` change while the other scopes' results survive.

pub mod database;
pub mod environment;
pub mod payment;
pub mod storage;

use futures::future::{join_all, BoxFuture, FutureExt};
use ops_core::{
    AuditScope, BackendResult, Change, ChangeAction, ChangeType, DesiredState, DomainError,
    Severity,
};
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::context::ServiceContext;

/// Changes and warnings from one audit run
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub changes: Vec<Change>,
    pub warnings: Vec<String>,
}

/// Requested scopes in canonical order, deduplicated; empty means all
pub fn normalize_scopes(requested: &[AuditScope]) -> Vec<AuditScope> {
    if requested.is_empty() {
        return AuditScope::ALL.to_vec();
    }
    AuditScope::ALL
        .into_iter()
        .filter(|scope| requested.contains(scope))
        .collect()
}

/// Audit the given scopes concurrently
#[instrument(skip(ctx, desired))]
pub async fn run_audits(
    ctx: &ServiceContext,
    desired: &DesiredState,
    scopes: &[AuditScope],
) -> AuditReport {
    let scopes = normalize_scopes(scopes);
    let audits: Vec<BoxFuture<'_, BackendResult<Vec<Change>>>> = scopes
        .iter()
        .map(|scope| audit_scope(ctx, desired, *scope))
        .collect();

    let mut report = AuditReport::default();
    for (scope, result) in scopes.iter().zip(join_all(audits).await) {
        match result {
            Ok(changes) => {
                debug!(scope = %scope, count = changes.len(), "Scope audited");
                report.changes.extend(changes);
            }
            Err(err) => {
                warn!(scope = %scope, error = %err, "Scope audit failed");
                report.warnings.push(format!("{scope} audit failed: {err}"));
                report.changes.push(audit_failure(*scope, &err));
            }
        }
    }
    report
}

fn audit_scope<'a>(
    ctx: &'a ServiceContext,
    desired: &'a DesiredState,
    scope: AuditScope,
) -> BoxFuture<'a, BackendResult<Vec<Change>>> {
    match scope {
        AuditScope::Database => async move {
            if desired.database.tables.is_empty() {
                return Ok(Vec::new());
            }
            let inspector = ctx
                .inspector()
                .ok_or(DomainError::NotConfigured("database"))?;
            database::audit(&desired.database, inspector).await
        }
        .boxed(),
        AuditScope::Storage => async move {
            if desired.storage.buckets.is_empty() {
                return Ok(Vec::new());
            }
            let backend = ctx.storage().ok_or(DomainError::NotConfigured("storage"))?;
            storage::audit(&desired.storage, backend).await
        }
        .boxed(),
        AuditScope::Environment => {
            let changes = environment::audit(&desired.environment, ctx.environment());
            async move { Ok(changes) }.boxed()
        }
        AuditScope::Payment => {
            let changes = payment::audit(&desired.payment, ctx.environment());
            async move { Ok(changes) }.boxed()
        }
    }
}

/// Diagnostic change standing in for a scope that could not be audited
pub fn audit_failure(scope: AuditScope, err: &DomainError) -> Change {
    Change::new(
        scope.change_scope(),
        ChangeType::AuditFailure,
        scope.as_str(),
        Severity::High,
        ChangeAction::Manual,
        format!("The {scope} scope could not be audited: {err}"),
    )
    .with_desired(json!({ "scope": scope }))
    .with_current(json!({ "error": err.to_string() }))
}

/// Whether an environment value counts as set
pub(crate) fn is_set(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
pub(crate) mod fakes {
    //! In-memory backends for auditor and orchestrator tests

    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use ops_core::{
        BackendResult, BucketSpec, DatabaseInspector, DomainError, EnvironmentSource, LiveBucket,
        MigrationPullRequest, MigrationRunner, PlanRecord, PlanStore, PullRequest,
        StorageBackend, VcsHost,
    };

    #[derive(Debug, Clone, Default)]
    pub struct FakeTable {
        pub columns: Vec<String>,
        pub rls_enabled: bool,
        pub policies: Vec<String>,
    }

    #[derive(Default)]
    pub struct FakeDatabase {
        pub tables: BTreeMap<String, FakeTable>,
        pub fail: bool,
        pub migrations: Mutex<Vec<(String, String)>>,
        pub reject_migrations: bool,
    }

    impl FakeDatabase {
        pub fn with_table(mut self, name: &str, table: FakeTable) -> Self {
            self.tables.insert(name.to_string(), table);
            self
        }

        fn table(&self, name: &str) -> BackendResult<Option<&FakeTable>> {
            if self.fail {
                return Err(DomainError::DatabaseError("connection refused".to_string()));
            }
            Ok(self.tables.get(name))
        }
    }

    #[async_trait]
    impl DatabaseInspector for FakeDatabase {
        async fn table_exists(&self, table: &str) -> BackendResult<bool> {
            Ok(self.table(table)?.is_some())
        }

        async fn table_columns(&self, table: &str) -> BackendResult<Vec<String>> {
            Ok(self.table(table)?.map(|t| t.columns.clone()).unwrap_or_default())
        }

        async fn rls_enabled(&self, table: &str) -> BackendResult<bool> {
            Ok(self.table(table)?.is_some_and(|t| t.rls_enabled))
        }

        async fn table_policies(&self, table: &str) -> BackendResult<Vec<String>> {
            Ok(self.table(table)?.map(|t| t.policies.clone()).unwrap_or_default())
        }
    }

    #[async_trait]
    impl MigrationRunner for FakeDatabase {
        async fn run_migration(&self, name: &str, sql: &str) -> BackendResult<()> {
            if self.reject_migrations {
                return Err(DomainError::DatabaseError("syntax error".to_string()));
            }
            self.migrations
                .lock()
                .unwrap()
                .push((name.to_string(), sql.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct FakeStorage {
        pub buckets: Mutex<Vec<LiveBucket>>,
        pub fail_list: bool,
        pub fail_writes: BTreeSet<String>,
    }

    impl FakeStorage {
        pub fn with_bucket(self, name: &str, public: bool) -> Self {
            self.buckets.lock().unwrap().push(LiveBucket {
                name: name.to_string(),
                public,
                file_size_limit: None,
            });
            self
        }

        pub fn bucket(&self, name: &str) -> Option<LiveBucket> {
            self.buckets
                .lock()
                .unwrap()
                .iter()
                .find(|b| b.name == name)
                .cloned()
        }
    }

    #[async_trait]
    impl StorageBackend for FakeStorage {
        async fn list_buckets(&self) -> BackendResult<Vec<LiveBucket>> {
            if self.fail_list {
                return Err(DomainError::StorageError("503 Service Unavailable".to_string()));
            }
            Ok(self.buckets.lock().unwrap().clone())
        }

        async fn create_bucket(&self, bucket: &BucketSpec) -> BackendResult<()> {
            if self.fail_writes.contains(&bucket.name) {
                return Err(DomainError::StorageError("quota exceeded".to_string()));
            }
            let mut buckets = self.buckets.lock().unwrap();
            if buckets.iter().any(|b| b.name == bucket.name) {
                return Err(DomainError::AlreadyExists(bucket.name.clone()));
            }
            buckets.push(LiveBucket {
                name: bucket.name.clone(),
                public: bucket.public,
                file_size_limit: bucket.file_size_limit,
            });
            Ok(())
        }

        async fn update_bucket(&self, bucket: &BucketSpec) -> BackendResult<()> {
            if self.fail_writes.contains(&bucket.name) {
                return Err(DomainError::StorageError("quota exceeded".to_string()));
            }
            let mut buckets = self.buckets.lock().unwrap();
            let live = buckets
                .iter_mut()
                .find(|b| b.name == bucket.name)
                .ok_or_else(|| DomainError::StorageError("bucket not found".to_string()))?;
            live.public = bucket.public;
            live.file_size_limit = bucket.file_size_limit;
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct FakeEnv(pub BTreeMap<String, String>);

    impl FakeEnv {
        pub fn with(mut self, name: &str, value: &str) -> Self {
            self.0.insert(name.to_string(), value.to_string());
            self
        }
    }

    impl EnvironmentSource for FakeEnv {
        fn var(&self, name: &str) -> Option<String> {
            self.0.get(name).cloned()
        }
    }

    #[derive(Default)]
    pub struct FakePlanStore {
        pub plans: Mutex<Vec<PlanRecord>>,
    }

    #[async_trait]
    impl PlanStore for FakePlanStore {
        async fn save_plan(&self, record: &PlanRecord) -> BackendResult<()> {
            self.plans.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn recent_plans(&self, limit: i64) -> BackendResult<Vec<PlanRecord>> {
            let plans = self.plans.lock().unwrap();
            Ok(plans.iter().rev().take(limit as usize).cloned().collect())
        }
    }

    #[derive(Default)]
    pub struct FakeVcs {
        pub fail: bool,
        pub requests: Mutex<Vec<MigrationPullRequest>>,
    }

    #[async_trait]
    impl VcsHost for FakeVcs {
        async fn open_migration_pr(
            &self,
            request: &MigrationPullRequest,
        ) -> BackendResult<PullRequest> {
            if self.fail {
                return Err(DomainError::vcs("create_branch", "401 Bad credentials"));
            }
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            Ok(PullRequest {
                number: requests.len() as u64,
                url: format!("https://github.com/acme/app/pull/{}", requests.len()),
                branch: request.branch.clone(),
            })
        }
    }
}
