//! Authentication extractor
//!
//! Checks the bearer token in the Authorization header against the
//! configured API token.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::response::ApiError;
use crate::state::AppState;

/// Proof that the request carried the configured API token
#[derive(Debug, Clone, Copy)]
pub struct AdminToken;

#[async_trait]
impl<S> FromRequestParts<S> for AdminToken
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::MissingAuth)?;

        let app_state = AppState::from_ref(state);
        app_state.api_token().verify(bearer.token()).map_err(|e| {
            tracing::warn!("Rejected request with invalid API token");
            ApiError::App(e)
        })?;

        Ok(AdminToken)
    }
}
