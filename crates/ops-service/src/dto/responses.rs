//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` for JSON output.

use chrono::{DateTime, Utc};
use ops_core::{ApplyGroup, ApplyMethod, ApplyOutcome, PlanRecord, PlannedChange};
use serde::Serialize;
use uuid::Uuid;

use crate::services::planner::PlanSummary;

// ============================================================================
// Plan Responses
// ============================================================================

/// Result of a plan run
#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    /// Present when the plan was persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<Uuid>,
    pub requires_approval: bool,
    pub summary: PlanSummary,
    pub changes: Vec<PlannedChange>,
    pub warnings: Vec<String>,
}

/// Stored plans, newest first
#[derive(Debug, Clone, Serialize)]
pub struct PlanHistoryResponse {
    pub plans: Vec<PlanRecord>,
}

// ============================================================================
// Apply Responses
// ============================================================================

/// Change counts per outcome bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl From<&ApplyOutcome> for ApplySummary {
    fn from(outcome: &ApplyOutcome) -> Self {
        let (applied, failed, skipped) = outcome.counts();
        Self {
            applied,
            failed,
            skipped,
        }
    }
}

/// Follow-up a human should take after an apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStepKind {
    ReviewPullRequest,
    RunMigration,
    SetEnvironmentVariables,
    VerifyPaymentConfig,
    InvestigateFailures,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextStep {
    pub kind: NextStepKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Variable or price names to provide
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub change_ids: Vec<String>,
}

impl NextStep {
    fn new(kind: NextStepKind, message: String) -> Self {
        Self {
            kind,
            message,
            url: None,
            path: None,
            names: Vec::new(),
            change_ids: Vec::new(),
        }
    }

    /// Derive guidance from an apply outcome
    pub fn from_outcome(outcome: &ApplyOutcome) -> Vec<Self> {
        let mut steps = Vec::new();

        for entry in &outcome.applied {
            match (entry.method, &entry.pr_url, &entry.migration_file) {
                (ApplyMethod::GithubPr, Some(url), _) => {
                    let mut step = Self::new(
                        NextStepKind::ReviewPullRequest,
                        format!("Review and merge the migration pull request {url}"),
                    );
                    step.url = Some(url.clone());
                    step.path.clone_from(&entry.migration_file);
                    steps.push(step);
                }
                (ApplyMethod::LocalMigrationFile, _, Some(path)) => {
                    let mut step = Self::new(
                        NextStepKind::RunMigration,
                        format!("Review and run the migration file {path}"),
                    );
                    step.path = Some(path.clone());
                    steps.push(step);
                }
                _ => {}
            }
        }

        let manual_names = |group: ApplyGroup| -> Vec<String> {
            outcome
                .skipped
                .iter()
                .filter(|e| e.scope == group && e.manual_action_required)
                .filter_map(|e| e.resource.clone())
                .collect()
        };

        let env_names = manual_names(ApplyGroup::Environment);
        if !env_names.is_empty() {
            let mut step = Self::new(
                NextStepKind::SetEnvironmentVariables,
                format!("Set environment variables: {}", env_names.join(", ")),
            );
            step.names = env_names;
            steps.push(step);
        }

        let payment_names = manual_names(ApplyGroup::Payment);
        if !payment_names.is_empty() {
            let mut step = Self::new(
                NextStepKind::VerifyPaymentConfig,
                format!(
                    "Verify payment provider configuration: {}",
                    payment_names.join(", ")
                ),
            );
            step.names = payment_names;
            steps.push(step);
        }

        let failed: Vec<String> = outcome
            .failed
            .iter()
            .flat_map(|e| e.change_ids.iter().cloned())
            .collect();
        if !failed.is_empty() {
            let mut step = Self::new(
                NextStepKind::InvestigateFailures,
                format!("{} change(s) failed to apply; see the failed entries", failed.len()),
            );
            step.change_ids = failed;
            steps.push(step);
        }

        steps
    }
}

/// Result of an apply run
#[derive(Debug, Clone, Serialize)]
pub struct ApplyResponse {
    pub outcome: ApplyOutcome,
    pub summary: ApplySummary,
    pub next_steps: Vec<NextStep>,
}

impl From<ApplyOutcome> for ApplyResponse {
    fn from(outcome: ApplyOutcome) -> Self {
        Self {
            summary: ApplySummary::from(&outcome),
            next_steps: NextStep::from_outcome(&outcome),
            outcome,
        }
    }
}

// ============================================================================
// Health Responses
// ============================================================================

/// Basic health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

/// Status of each readiness dependency
#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub documents: String,
    pub database: String,
}

impl ReadinessResponse {
    /// `database_healthy` is `None` when no database is configured
    pub fn ready(documents_valid: bool, database_healthy: Option<bool>) -> Self {
        let ready = documents_valid && database_healthy != Some(false);
        Self {
            status: if ready { "ready" } else { "not_ready" }.to_string(),
            timestamp: Utc::now(),
            checks: HealthChecks {
                documents: if documents_valid { "valid" } else { "invalid" }.to_string(),
                database: match database_healthy {
                    Some(true) => "healthy",
                    Some(false) => "unhealthy",
                    None => "not_configured",
                }
                .to_string(),
            },
        }
    }
}
