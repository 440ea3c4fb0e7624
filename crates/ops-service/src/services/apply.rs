//! Apply orchestrator
//!
//! Groups the selected changes and runs one strategy per group, in order:
//! database, storage, environment, payment. Every failure is recorded in the
//! outcome for its own group; none aborts the others. The only error that
//! stops the run is the up-front approval gate, checked before any mutation.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use ops_core::{
    ApplyEntry, ApplyGroup, ApplyMethod, ApplyOutcome, BackendResult, BucketSpec, Change,
    ChangeType, DomainError, MigrationPullRequest, PlannedChange,
};
use tracing::{error, info, instrument, warn};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::migration::MigrationScript;

const NO_LONGER_DETECTED: &str = "change no longer detected";

/// Caller options for one apply
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub generate_pr: bool,
    pub direct_apply: bool,
    pub approved_change_ids: Vec<String>,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            generate_pr: true,
            direct_apply: false,
            approved_change_ids: Vec::new(),
        }
    }
}

/// Selected changes split by apply group
#[derive(Default)]
struct Groups<'a> {
    database: Vec<&'a Change>,
    storage: Vec<&'a Change>,
    environment: Vec<&'a Change>,
    payment: Vec<&'a Change>,
}

/// Apply orchestrator
pub struct ApplyOrchestrator<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ApplyOrchestrator<'a> {
    /// Create a new ApplyOrchestrator
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Apply the requested change IDs out of a freshly computed plan.
    ///
    /// # Errors
    /// Returns `ServiceError::PolicyViolation` when direct apply is requested
    /// for changes that require approval and were not approved.
    #[instrument(skip(self, planned, requested, options), fields(requested = requested.len()))]
    pub async fn apply(
        &self,
        planned: &[PlannedChange],
        requested: &[String],
        options: &ApplyOptions,
        now: DateTime<Utc>,
    ) -> ServiceResult<ApplyOutcome> {
        let mut outcome = ApplyOutcome::new(now);

        let mut seen = BTreeSet::new();
        let mut selected = Vec::new();
        for id in requested.iter().filter(|id| seen.insert(id.as_str())) {
            match planned.iter().find(|p| p.id() == id) {
                Some(change) => selected.push(change),
                None => outcome.skipped.push(
                    ApplyEntry::new(
                        ApplyGroup::from_change_id(id),
                        ApplyMethod::Manual,
                        vec![id.clone()],
                    )
                    .with_note(NO_LONGER_DETECTED),
                ),
            }
        }

        check_approvals(&selected, options)?;

        let mut groups = Groups::default();
        for planned in selected {
            let change = &planned.change;
            if change.change_type == ChangeType::AuditFailure {
                outcome
                    .skipped
                    .push(ApplyEntry::manual(ApplyGroup::of(change), change));
                continue;
            }
            match ApplyGroup::of(change) {
                ApplyGroup::Database => groups.database.push(change),
                ApplyGroup::Storage => groups.storage.push(change),
                ApplyGroup::Environment => groups.environment.push(change),
                ApplyGroup::Payment => groups.payment.push(change),
                ApplyGroup::Unknown => {}
            }
        }

        if !groups.database.is_empty() {
            self.apply_database(&groups.database, options, now, &mut outcome)
                .await;
        }
        if !groups.storage.is_empty() {
            self.apply_storage(&groups.storage, &mut outcome).await;
        }
        for change in groups.environment {
            outcome
                .skipped
                .push(ApplyEntry::manual(ApplyGroup::Environment, change));
        }
        for change in groups.payment {
            outcome
                .skipped
                .push(ApplyEntry::manual(ApplyGroup::Payment, change));
        }

        let (applied, failed, skipped) = outcome.counts();
        info!(applied, failed, skipped, "Apply finished");
        Ok(outcome)
    }

    async fn apply_database(
        &self,
        changes: &[&Change],
        options: &ApplyOptions,
        now: DateTime<Utc>,
        outcome: &mut ApplyOutcome,
    ) {
        let script = MigrationScript::build(changes, now);
        let ids = script.change_ids.clone();
        let mut note = None;

        if options.direct_apply {
            match (self.ctx.direct_apply_enabled(), self.ctx.migration_runner()) {
                (true, Some(runner)) => {
                    info!(changes = ids.len(), "Applying database changes directly");
                    let entry = ApplyEntry::new(ApplyGroup::Database, ApplyMethod::DirectApply, ids);
                    match runner.run_migration(&script.name(), &script.body).await {
                        Ok(()) => outcome.applied.push(entry.with_note(script.name())),
                        Err(e) => {
                            error!(error = %e, "Direct database apply failed; transaction rolled back");
                            outcome.failed.push(entry.with_error(e.to_string()));
                        }
                    }
                    return;
                }
                (true, None) => {
                    warn!("Direct apply requested but no database is configured");
                    note = Some("direct apply unavailable: no database configured".to_string());
                }
                (false, _) => {
                    info!("Direct apply requested but disabled globally");
                    note = Some("direct apply disabled by OPS_ALLOW_DIRECT_APPLY".to_string());
                }
            }
        }

        let migrations_dir = self.ctx.migrations_dir();
        let path = migrations_dir.join(script.file_name());
        let path_display = path.display().to_string();
        let content = script.render_file();

        if let Err(e) = write_migration(migrations_dir, &path, &content).await {
            error!(path = %path_display, error = %e, "Failed to write migration file");
            outcome.failed.push(
                ApplyEntry::new(ApplyGroup::Database, ApplyMethod::LocalMigrationFile, ids)
                    .with_error(format!("failed to write {path_display}: {e}")),
            );
            return;
        }
        info!(path = %path_display, "Migration file written");

        let local = |note: Option<String>| {
            let mut entry =
                ApplyEntry::new(ApplyGroup::Database, ApplyMethod::LocalMigrationFile, ids.clone())
                    .with_migration_file(path_display.clone());
            entry.note = note;
            entry
        };

        if !options.generate_pr {
            outcome.applied.push(local(note));
            return;
        }
        let Some(vcs) = self.ctx.vcs() else {
            outcome.applied.push(local(Some(join_notes(
                note,
                "no GitHub token configured; migration file kept locally",
            ))));
            return;
        };

        let request = MigrationPullRequest {
            branch: format!("ops/reconcile-{}", script.timestamp()),
            file_path: repository_path(migrations_dir, &script.file_name()),
            content,
            commit_message: format!("ops: reconcile database ({} changes)", changes.len()),
            title: format!("Ops reconcile: {} database change(s)", changes.len()),
            body: pull_request_body(changes),
        };

        match vcs.open_migration_pr(&request).await {
            Ok(pr) => {
                info!(url = %pr.url, "Migration pull request opened");
                let mut entry =
                    ApplyEntry::new(ApplyGroup::Database, ApplyMethod::GithubPr, ids.clone())
                        .with_pull_request(pr.url, pr.branch)
                        .with_migration_file(path_display.clone());
                entry.note = note;
                outcome.applied.push(entry);
            }
            Err(e) => {
                warn!(error = %e, "Pull request failed; falling back to local migration file");
                outcome.applied.push(local(Some(join_notes(
                    note,
                    &format!("pull request could not be opened ({e}); migration file kept locally"),
                ))));
            }
        }
    }

    async fn apply_storage(&self, changes: &[&Change], outcome: &mut ApplyOutcome) {
        let results = join_all(changes.iter().map(|change| async move {
            (*change, self.apply_bucket(change).await)
        }))
        .await;

        for (change, result) in results {
            let entry = ApplyEntry::new(
                ApplyGroup::Storage,
                ApplyMethod::DirectApply,
                vec![change.id.clone()],
            );
            match result {
                Ok(false) => outcome.applied.push(entry),
                Ok(true) => outcome.applied.push(entry.with_note("bucket already exists")),
                Err(e) => {
                    error!(change = %change.id, error = %e, "Bucket change failed");
                    outcome.failed.push(entry.with_error(e.to_string()));
                }
            }
        }
    }

    /// Returns whether the bucket was already present
    async fn apply_bucket(&self, change: &Change) -> BackendResult<bool> {
        let storage = self
            .ctx
            .storage()
            .ok_or(DomainError::NotConfigured("storage"))?;
        let bucket: BucketSpec = serde_json::from_value(change.desired.clone())
            .map_err(|e| DomainError::InternalError(format!("invalid bucket declaration: {e}")))?;

        match change.change_type {
            ChangeType::CreateBucket => match storage.create_bucket(&bucket).await {
                Ok(()) => Ok(false),
                Err(e) if e.is_already_exists() => Ok(true),
                Err(e) => Err(e),
            },
            _ => storage.update_bucket(&bucket).await.map(|()| false),
        }
    }
}

/// Reject direct apply of unapproved changes that need approval
fn check_approvals(selected: &[&PlannedChange], options: &ApplyOptions) -> ServiceResult<()> {
    if !options.direct_apply {
        return Ok(());
    }

    let offending: Vec<String> = selected
        .iter()
        .filter(|p| p.requires_approval && !options.approved_change_ids.iter().any(|a| a == p.id()))
        .map(|p| p.id().to_string())
        .collect();

    if offending.is_empty() {
        Ok(())
    } else {
        warn!(count = offending.len(), "Direct apply rejected by policy");
        Err(ServiceError::PolicyViolation {
            change_ids: offending,
        })
    }
}

async fn write_migration(dir: &Path, path: &Path, content: &str) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(path, content).await
}

/// Path of the migration inside the repository
fn repository_path(migrations_dir: &Path, file_name: &str) -> String {
    let dir = migrations_dir.to_string_lossy().replace('\\', "/");
    let dir = dir.trim_start_matches("./").trim_matches('/');
    if dir.is_empty() || dir == "." {
        file_name.to_string()
    } else {
        format!("{dir}/{file_name}")
    }
}

fn pull_request_body(changes: &[&Change]) -> String {
    let mut body = String::from(
        "Generated by the ops control plane. Review the migration before merging.\n\n## Changes\n\n",
    );
    for change in changes {
        let _ = writeln!(
            body,
            "- **{}** `{}`: {}",
            change.severity, change.id, change.description
        );
    }
    body
}

fn join_notes(first: Option<String>, second: &str) -> String {
    match first {
        Some(first) => format!("{first}; {second}"),
        None => second.to_string(),
    }
}
