//! Plan, apply and plan history handlers

use axum::{extract::State, Json};
use ops_service::dto::{
    ApplyRequest, ApplyResponse, PlanHistoryQuery, PlanHistoryResponse, PlanRequest, PlanResponse,
};
use ops_service::OpsService;

use crate::extractors::{AdminToken, OptionalValidatedJson, ValidatedJson, ValidatedQuery};
use crate::response::ApiResult;
use crate::state::AppState;

/// Audit live state and return the annotated change plan
///
/// POST /api/v1/ops/plan
pub async fn create_plan(
    State(state): State<AppState>,
    _admin: AdminToken,
    OptionalValidatedJson(request): OptionalValidatedJson<PlanRequest>,
) -> ApiResult<Json<PlanResponse>> {
    let service = OpsService::new(state.service_context());
    let response = service.plan(request.unwrap_or_default()).await?;
    Ok(Json(response))
}

/// Apply the selected changes
///
/// POST /api/v1/ops/apply
pub async fn apply_changes(
    State(state): State<AppState>,
    _admin: AdminToken,
    ValidatedJson(request): ValidatedJson<ApplyRequest>,
) -> ApiResult<Json<ApplyResponse>> {
    let service = OpsService::new(state.service_context());
    let response = service.apply(request).await?;
    Ok(Json(response))
}

/// Recently persisted plans
///
/// GET /api/v1/ops/plans
pub async fn list_plans(
    State(state): State<AppState>,
    _admin: AdminToken,
    ValidatedQuery(query): ValidatedQuery<PlanHistoryQuery>,
) -> ApiResult<Json<PlanHistoryResponse>> {
    let service = OpsService::new(state.service_context());
    let response = service.recent_plans(query.limit).await?;
    Ok(Json(response))
}
