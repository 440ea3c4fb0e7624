//! PostgreSQL implementations of the database-facing ports

mod error;
mod migration;
mod plan;
mod schema;

pub use migration::PgMigrationRunner;
pub use plan::PgPlanStore;
pub use schema::PgSchemaInspector;
