//! Bearer credential guarding the plan and apply operations
//!
//! Callers are expected to have verified administrator rights already; this
//! only checks that the request carries the configured API token.

use std::fmt;

use crate::error::AppError;

/// Configured API token
#[derive(Clone)]
pub struct ApiToken {
    token: String,
}

impl ApiToken {
    /// Create a new ApiToken
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Compare a presented credential in constant time
    pub fn verify(&self, presented: &str) -> Result<(), AppError> {
        let expected = self.token.as_bytes();
        let presented = presented.as_bytes();

        // Length is not secret; content comparison does not short-circuit.
        let mismatch = expected.len() != presented.len()
            || expected
                .iter()
                .zip(presented)
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                != 0;

        if mismatch || expected.is_empty() {
            Err(AppError::InvalidCredentials)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiToken").field("token", &"[redacted]").finish()
    }
}
