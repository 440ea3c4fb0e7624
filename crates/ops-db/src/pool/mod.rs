//! Database connection pool

mod postgres;

pub use postgres::{create_pool, ensure_schema, DatabaseConfig};
pub use sqlx::PgPool;
