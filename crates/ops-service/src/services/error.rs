//! Service layer error types
//!
//! Provides a unified error type for plan and apply operations.

use ops_common::AppError;
use ops_core::{DocumentError, DomainError};
use thiserror::Error;

/// Service layer error type
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Desired-state or policy document missing or invalid; aborts the audit
    #[error("Configuration error: {0}")]
    Config(#[from] DocumentError),

    /// Direct apply requested for changes that need approval
    #[error("Approval required before direct apply: {}", change_ids.join(", "))]
    PolicyViolation { change_ids: Vec<String> },

    /// Backend failure outside the fail-soft paths
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Application error (auth, validation, etc.)
    #[error(transparent)]
    App(#[from] AppError),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict (e.g., an apply already running)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) | Self::Internal(_) => 500,
            Self::PolicyViolation { .. } => 403,
            Self::Domain(e) => AppError::status_code_for_domain(e),
            Self::App(e) => e.status_code(),
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
        }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::PolicyViolation { .. } => "POLICY_VIOLATION",
            Self::Domain(e) => e.code(),
            Self::App(e) => e.error_code(),
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Config(e) => AppError::Config(e.to_string()),
            ServiceError::PolicyViolation { change_ids } => AppError::PolicyViolation(change_ids),
            ServiceError::Domain(e) => AppError::Domain(e),
            ServiceError::App(e) => e,
            ServiceError::Validation(msg) => AppError::Validation(msg),
            ServiceError::Conflict(msg) => AppError::Conflict(msg),
            ServiceError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
