//! Transactional migration runner used by direct apply

use async_trait::async_trait;
use ops_core::{BackendResult, MigrationRunner};
use sqlx::{Executor, PgPool};
use tracing::{info, instrument};

use super::error::map_db_error;

const HISTORY_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS ops_migration_history (
        name TEXT PRIMARY KEY,
        applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        statement_bytes INTEGER NOT NULL
    )
";

/// Executes generated migration bodies inside a single transaction.
///
/// A failing statement rolls back every statement of the migration, so a
/// direct apply is either fully applied or not applied at all.
#[derive(Clone)]
pub struct PgMigrationRunner {
    pool: PgPool,
}

impl PgMigrationRunner {
    /// Create a new PgMigrationRunner
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MigrationRunner for PgMigrationRunner {
    #[instrument(skip(self, sql), fields(bytes = sql.len()))]
    async fn run_migration(&self, name: &str, sql: &str) -> BackendResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Bookkeeping table is created here too; ensure_schema is optional.
        sqlx::query(HISTORY_TABLE)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        // Unprepared text goes over the simple protocol, so multiple statements are fine.
        (&mut *tx).execute(sql).await.map_err(map_db_error)?;

        sqlx::query(
            r"
            INSERT INTO ops_migration_history (name, statement_bytes)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET applied_at = now(), statement_bytes = EXCLUDED.statement_bytes
            ",
        )
        .bind(name)
        .bind(i32::try_from(sql.len()).unwrap_or(i32::MAX))
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        info!(migration = %name, "Migration applied directly");
        Ok(())
    }
}
