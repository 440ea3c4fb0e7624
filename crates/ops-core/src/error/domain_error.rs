//! Domain errors - failures reported by backend ports

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Backend Errors
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Version control error during {step}: {message}")]
    VcsError { step: &'static str, message: String },

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    // =========================================================================
    // Availability
    // =========================================================================
    #[error("Backend not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::StorageError(_) => "STORAGE_ERROR",
            Self::VcsError { .. } => "VCS_ERROR",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::NotConfigured(_) => "BACKEND_NOT_CONFIGURED",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if the provider reported the target as already present
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    /// Create a version control error for a named step
    pub fn vcs(step: &'static str, message: impl Into<String>) -> Self {
        Self::VcsError {
            step,
            message: message.into(),
        }
    }
}
