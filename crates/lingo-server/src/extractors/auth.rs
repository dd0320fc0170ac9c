//! Auth extractor for protected routes

use crate::error::ApiError;
use crate::services::{AuthError, Claims};
use crate::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use lingo_core::Identity;

/// Authenticated caller plus the claims of the token it presented
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub identity: Identity,
    pub claims: Claims,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;

        match state.auth_service.authenticate(token).await {
            Ok((identity, claims)) => Ok(AuthUser { identity, claims }),
            Err(AuthError::Failed(detail)) => Err(ApiError::failed("Server Error", detail)),
            Err(e) => {
                tracing::debug!("Rejected bearer token: {}", e);
                Err(e.into())
            }
        }
    }
}
