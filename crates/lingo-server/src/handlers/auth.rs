//! Authentication handlers

use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::handlers::MessageOnly;
use crate::validation::{LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, Json};
use lingo_core::{AuthTokens, User};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    message: &'static str,
    user: User,
    token: String,
    token_type: String,
    expires_in: i64,
}

impl AuthResponse {
    fn new(message: &'static str, user: User, tokens: AuthTokens) -> Self {
        Self {
            message,
            user,
            token: tokens.access_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    user: User,
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = payload?;
    let registration = req.validate()?;
    info!("Registration attempt for: {}", registration.email);

    let (user, tokens) = state.auth_service.register(&registration).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new("Registration successful", user, tokens)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;
    let credentials = req.validate()?;
    info!("Login attempt for: {}", credentials.email);

    let (user, tokens) = state
        .auth_service
        .login(&credentials.email, &credentials.password)
        .await?;

    Ok(Json(AuthResponse::new("Login successful", user, tokens)))
}

pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> Json<MessageOnly> {
    state.auth_service.logout(&auth.claims);
    Json(MessageOnly {
        message: "Successfully logged out",
    })
}

pub async fn profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let user = state.auth_service.profile(&auth.identity).await?;
    Ok(Json(ProfileResponse {
        message: None,
        user,
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<Json<ProfileResponse>> {
    let Json(req) = payload?;
    let update = req.validate()?;
    info!("Profile update for: {}", auth.identity.user_id);

    let user = state
        .auth_service
        .update_profile(&auth.identity, &update)
        .await?;

    Ok(Json(ProfileResponse {
        message: Some("Profile updated successfully"),
        user,
    }))
}
