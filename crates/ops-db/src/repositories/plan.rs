//! Plan history store

use async_trait::async_trait;
use ops_core::{BackendResult, PlanRecord, PlanStore};
use sqlx::PgPool;
use tracing::instrument;

use crate::models::PlanModel;

use super::error::map_db_error;

/// PostgreSQL implementation of PlanStore
#[derive(Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    /// Create a new PgPlanStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    #[instrument(skip(self, record), fields(plan_id = %record.id))]
    async fn save_plan(&self, record: &PlanRecord) -> BackendResult<()> {
        sqlx::query(
            r"
            INSERT INTO ops_plans (id, created_at, requires_approval, change_count, plan)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(record.id)
        .bind(record.created_at)
        .bind(record.requires_approval)
        .bind(record.change_count)
        .bind(&record.plan)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent_plans(&self, limit: i64) -> BackendResult<Vec<PlanRecord>> {
        let rows = sqlx::query_as::<_, PlanModel>(
            r"
            SELECT id, created_at, requires_approval, change_count, plan
            FROM ops_plans
            ORDER BY created_at DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(PlanRecord::from).collect())
    }
}
