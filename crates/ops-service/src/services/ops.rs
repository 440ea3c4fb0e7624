//! Ops service - plan and apply entry points

use chrono::Utc;
use ops_core::{PlanMode, PlanRecord};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::{ApplyRequest, ApplyResponse, PlanHistoryResponse, PlanRequest, PlanResponse};

use super::apply::{ApplyOptions, ApplyOrchestrator};
use super::audit::run_audits;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::loader::load_documents;
use super::planner::plan_changes;

/// Ops service
pub struct OpsService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> OpsService<'a> {
    /// Create a new OpsService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Audit the requested scopes and annotate the changes with policy
    #[instrument(skip(self, request))]
    pub async fn plan(&self, request: PlanRequest) -> ServiceResult<PlanResponse> {
        let documents = load_documents(self.ctx.config_dir()).await?;
        let scopes = request.scopes.unwrap_or_default();
        let mode = request.mode.unwrap_or_default();

        let report = run_audits(self.ctx, &documents.desired, &scopes).await;
        let plan = plan_changes(
            report.changes,
            &documents.policy,
            mode,
            self.ctx.direct_apply_enabled(),
        );

        let mut response = PlanResponse {
            plan_id: None,
            requires_approval: plan.requires_approval,
            summary: plan.summary,
            changes: plan.changes,
            warnings: report.warnings,
        };
        match self.persist(&response).await {
            Ok(plan_id) => response.plan_id = plan_id,
            Err(warning) => response.warnings.push(warning),
        }

        info!(
            total = response.summary.total,
            requires_approval = response.requires_approval,
            warnings = response.warnings.len(),
            "Plan generated"
        );
        Ok(response)
    }

    /// Store the plan when persistence is enabled; `Err` carries a warning
    async fn persist(&self, response: &PlanResponse) -> Result<Option<Uuid>, String> {
        let Some(store) = self.ctx.plan_store() else {
            return Ok(None);
        };
        if !self.ctx.settings().persist_plans {
            return Ok(None);
        }

        let plan = serde_json::to_value(response)
            .map_err(|e| format!("plan could not be persisted: {e}"))?;
        let record = PlanRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            requires_approval: response.requires_approval,
            change_count: i32::try_from(response.changes.len()).unwrap_or(i32::MAX),
            plan,
        };

        match store.save_plan(&record).await {
            Ok(()) => Ok(Some(record.id)),
            Err(e) => {
                warn!(error = %e, "Failed to persist plan");
                Err(format!("plan could not be persisted: {e}"))
            }
        }
    }

    /// Re-audit, then apply the selected changes
    ///
    /// # Errors
    /// - `Conflict` when another apply is running
    /// - `Config` when the documents cannot be loaded
    /// - `PolicyViolation` when direct apply hits unapproved changes
    #[instrument(skip(self, request), fields(changes = request.change_ids.len()))]
    pub async fn apply(&self, request: ApplyRequest) -> ServiceResult<ApplyResponse> {
        request
            .validate()
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        let _guard = self.ctx.try_lock_apply()?;

        let documents = load_documents(self.ctx.config_dir()).await?;
        let report = run_audits(self.ctx, &documents.desired, &[]).await;
        let plan = plan_changes(
            report.changes,
            &documents.policy,
            PlanMode::Apply,
            self.ctx.direct_apply_enabled(),
        );

        let options = ApplyOptions {
            generate_pr: request.generate_pr,
            direct_apply: request.direct_apply,
            approved_change_ids: request.approved_change_ids,
        };
        let outcome = ApplyOrchestrator::new(self.ctx)
            .apply(&plan.changes, &request.change_ids, &options, Utc::now())
            .await?;

        Ok(ApplyResponse::from(outcome))
    }

    /// Most recent persisted plans
    #[instrument(skip(self))]
    pub async fn recent_plans(&self, limit: i64) -> ServiceResult<PlanHistoryResponse> {
        let store = self
            .ctx
            .plan_store()
            .ok_or(ops_core::DomainError::NotConfigured("plan store"))?;
        let plans = store.recent_plans(limit).await?;
        Ok(PlanHistoryResponse { plans })
    }

    /// Whether both documents currently load and validate
    pub async fn documents_valid(&self) -> bool {
        match load_documents(self.ctx.config_dir()).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Ops documents invalid");
                false
            }
        }
    }
}
