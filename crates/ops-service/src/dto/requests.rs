//! Request DTOs for API endpoints
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.

use ops_core::{AuditScope, PlanMode};
use serde::Deserialize;
use validator::Validate;

/// Plan trigger; omitted scopes mean all four
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PlanRequest {
    #[serde(default)]
    pub scopes: Option<Vec<AuditScope>>,
    #[serde(default)]
    pub mode: Option<PlanMode>,
}

/// Apply trigger
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ApplyRequest {
    #[validate(length(min = 1, message = "At least one change ID is required"))]
    pub change_ids: Vec<String>,

    #[serde(default = "default_generate_pr")]
    pub generate_pr: bool,

    #[serde(default)]
    pub direct_apply: bool,

    #[serde(default)]
    pub approved_change_ids: Vec<String>,
}

fn default_generate_pr() -> bool {
    true
}

/// Query parameters for plan history
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlanHistoryQuery {
    #[serde(default = "default_history_limit")]
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: i64,
}

impl Default for PlanHistoryQuery {
    fn default() -> Self {
        Self {
            limit: default_history_limit(),
        }
    }
}

fn default_history_limit() -> i64 {
    20
}
