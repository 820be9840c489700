use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};

const INVALID_CREDENTIALS: &str = "Invalid authentication credentials";

/// Host user id taken from the bearer token's subject. Attempt ownership is
/// checked by the services against this id.
pub(crate) struct CurrentUser(pub(crate) String);

fn bearer(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim()).filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer(parts).ok_or(ApiError::Unauthorized(INVALID_CREDENTIALS))?;

        match security::authenticate(token, state.settings()) {
            Ok(user_id) => Ok(CurrentUser(user_id)),
            Err(err) => {
                tracing::debug!(error = %err, "Rejected session token");
                Err(ApiError::Unauthorized(INVALID_CREDENTIALS))
            }
        }
    }
}
