//! Plan history row

use chrono::{DateTime, Utc};
use ops_core::PlanRecord;
use sqlx::FromRow;
use uuid::Uuid;

/// Row of `ops_plans`
#[derive(Debug, Clone, FromRow)]
pub struct PlanModel {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub requires_approval: bool,
    pub change_count: i32,
    pub plan: serde_json::Value,
}

impl From<PlanModel> for PlanRecord {
    fn from(model: PlanModel) -> Self {
        Self {
            id: model.id,
            created_at: model.created_at,
            requires_approval: model.requires_approval,
            change_count: model.change_count,
            plan: model.plan,
        }
    }
}
