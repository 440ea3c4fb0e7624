//! Axum extractors for request handling
//!
//! Custom extractors for the admin credential and validated inputs.

mod auth;
mod validated;

pub use auth::AdminToken;
pub use validated::{OptionalValidatedJson, ValidatedJson, ValidatedQuery};
