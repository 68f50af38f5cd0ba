//! Authentication middleware.
//!
//! When `AUTH_SECRET` is configured every request must carry
//! `Authorization: Bearer <secret>`. Otherwise requests are accepted as is.
//!
//! The caller's local tally is picked by the `X-Client-Id` header, falling
//! back to `anonymous`.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderName},
};

use crate::error::AppError;
use crate::AppState;

/// Header naming the caller's local tally.
pub static CLIENT_ID_HEADER: HeaderName = HeaderName::from_static("x-client-id");

/// Client id used when the header is absent.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Authenticated caller extracted from request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Which local tally this caller works on
    pub client_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(ref secret) = state.config.auth_secret {
            let token = parts
                .headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|header| header.strip_prefix("Bearer "));

            match token {
                Some(token) if token == secret.as_str() => {}
                Some(_) => {
                    tracing::warn!("Rejected request with wrong bearer token");
                    return Err(AppError::Unauthorized);
                }
                None => return Err(AppError::Unauthorized),
            }
        }

        let client_id = match parts.headers.get(&CLIENT_ID_HEADER) {
            Some(value) => value
                .to_str()
                .map_err(|_| AppError::BadRequest("X-Client-Id must be ASCII".to_string()))?
                .trim()
                .to_string(),
            None => ANONYMOUS_CLIENT.to_string(),
        };

        Ok(AuthUser { client_id })
    }
}
