//! Error handling utilities for repositories

use ops_core::DomainError;
use sqlx::Error as SqlxError;

/// PostgreSQL `undefined_table`
const UNDEFINED_TABLE: &str = "42P01";

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Check whether a query failed because the relation does not exist
pub fn is_undefined_table(e: &SqlxError) -> bool {
    e.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == UNDEFINED_TABLE)
}
