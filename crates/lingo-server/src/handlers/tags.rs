//! Tag handlers

use crate::error::{ApiError, ApiResult};
use crate::extractors::AuthUser;
use crate::handlers::Envelope;
use crate::services::TranslationError;
use crate::validation::{CreateTagRequest, ValidationErrors};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, Json};
use lingo_core::Tag;

const NAME_TAKEN: &str = "The name has already been taken.";

pub async fn index(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Envelope<Vec<Tag>>>> {
    let tags = state
        .translations
        .list_tags(&auth.identity)
        .await
        .map_err(|e| ApiError::from_translation("Failed to retrieve tags", e))?;

    Ok(Json(Envelope::new("Tags retrieved successfully", tags)))
}

pub async fn store(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<CreateTagRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<Tag>>)> {
    let Json(req) = payload?;
    let new = req.validate()?;

    let existing = state
        .translations
        .find_tag_by_name(&new.name)
        .await
        .map_err(|e| ApiError::from_translation("Failed to create tag", e))?;
    if existing.is_some() {
        return Err(ValidationErrors::single("name", NAME_TAKEN).into());
    }

    // A concurrent insert can still win the unique constraint
    let tag = match state.translations.create_tag(&auth.identity, new).await {
        Ok(tag) => tag,
        Err(TranslationError::Conflict(_)) => {
            return Err(ValidationErrors::single("name", NAME_TAKEN).into())
        }
        Err(e) => return Err(ApiError::from_translation("Failed to create tag", e)),
    };

    Ok((
        StatusCode::CREATED,
        Json(Envelope::new("Tag created successfully", tag)),
    ))
}
