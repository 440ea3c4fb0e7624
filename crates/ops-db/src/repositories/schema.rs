//! Read-only schema inspection

use async_trait::async_trait;
use ops_core::sql::quote_ident;
use ops_core::{BackendResult, DatabaseInspector};
use sqlx::PgPool;
use tracing::instrument;

use super::error::{is_undefined_table, map_db_error};

/// Schema all declared tables live in
const SCHEMA: &str = "public";

/// PostgreSQL implementation of DatabaseInspector
#[derive(Clone)]
pub struct PgSchemaInspector {
    pool: PgPool,
}

impl PgSchemaInspector {
    /// Create a new PgSchemaInspector
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseInspector for PgSchemaInspector {
    #[instrument(skip(self))]
    async fn table_exists(&self, table: &str) -> BackendResult<bool> {
        let probe = format!("SELECT * FROM {}.{} LIMIT 0", quote_ident(SCHEMA), quote_ident(table));

        match sqlx::query(&probe).execute(&self.pool).await {
            Ok(_) => Ok(true),
            Err(e) if is_undefined_table(&e) => Ok(false),
            Err(e) => Err(map_db_error(e)),
        }
    }

    #[instrument(skip(self))]
    async fn table_columns(&self, table: &str) -> BackendResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r"
            SELECT column_name::text
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
            ",
        )
        .bind(SCHEMA)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn rls_enabled(&self, table: &str) -> BackendResult<bool> {
        let enabled = sqlx::query_scalar::<_, bool>(
            r"
            SELECT c.relrowsecurity
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relname = $2
            ",
        )
        .bind(SCHEMA)
        .bind(table)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(enabled.unwrap_or(false))
    }

    #[instrument(skip(self))]
    async fn table_policies(&self, table: &str) -> BackendResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r"
            SELECT policyname::text
            FROM pg_policies
            WHERE schemaname = $1 AND tablename = $2
            ORDER BY policyname
            ",
        )
        .bind(SCHEMA)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }
}
