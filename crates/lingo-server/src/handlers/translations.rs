//! Translation handlers

use crate::error::{ApiError, ApiResult};
use crate::extractors::AuthUser;
use crate::handlers::{Envelope, MessageOnly};
use crate::validation::{
    CreateTranslationRequest, SyncTagsRequest, UpdateTranslationRequest, ValidationErrors,
};
use crate::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use lingo_core::{LocaleExport, Page, PageRequest, SearchFilters, Translation, DEFAULT_PER_PAGE};
use serde::{Deserialize, Serialize};

const DEFAULT_EXPORT_LOCALE: &str = "en";

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    page: Option<u32>,
    per_page: Option<u32>,
}

impl ListQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.per_page.unwrap_or(DEFAULT_PER_PAGE),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    data: Vec<Translation>,
    total: usize,
}

type TranslationResponse = Json<Envelope<Translation>>;

pub async fn index(
    State(state): State<AppState>,
    auth: AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Page<Translation>>>> {
    let Query(query) = query?;
    let page = state
        .translations
        .list_all(&auth.identity, query.page_request())
        .await
        .map_err(|e| ApiError::from_translation("Failed to retrieve translations", e))?;

    Ok(Json(Envelope::new("Translations retrieved successfully", page)))
}

pub async fn latest(
    State(state): State<AppState>,
    auth: AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Page<Translation>>>> {
    let Query(query) = query?;
    let page = state
        .translations
        .latest(&auth.identity, query.page_request())
        .await
        .map_err(|e| ApiError::from_translation("Failed to retrieve translations", e))?;

    Ok(Json(Envelope::new("Translations retrieved successfully", page)))
}

pub async fn store(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<CreateTranslationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, TranslationResponse)> {
    let Json(req) = payload?;
    let new = req.validate()?;

    let translation = state
        .translations
        .create(&auth.identity, new)
        .await
        .map_err(|e| ApiError::from_translation("Failed to create translation", e))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::new("Translation created successfully", translation)),
    ))
}

pub async fn show(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<TranslationResponse> {
    let Path(id) = id?;
    let translation = state
        .translations
        .get_one(&auth.identity, id)
        .await
        .map_err(|e| ApiError::from_translation("Failed to retrieve translation", e))?;

    Ok(Json(Envelope::new("Translation retrieved successfully", translation)))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateTranslationRequest>, JsonRejection>,
) -> ApiResult<TranslationResponse> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let changes = req.validate()?;

    let translation = state
        .translations
        .update(&auth.identity, id, changes)
        .await
        .map_err(|e| ApiError::from_translation("Failed to update translation", e))?;

    Ok(Json(Envelope::new("Translation updated successfully", translation)))
}

pub async fn destroy(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<MessageOnly>> {
    let Path(id) = id?;
    state
        .translations
        .delete_one(&auth.identity, id)
        .await
        .map_err(|e| ApiError::from_translation("Failed to delete translation", e))?;

    Ok(Json(MessageOnly {
        message: "Translation deleted successfully",
    }))
}

pub async fn search(
    State(state): State<AppState>,
    auth: AuthUser,
    query: Result<Query<SearchFilters>, QueryRejection>,
) -> ApiResult<Json<Envelope<SearchResults>>> {
    let Query(filters) = query?;
    let data = state
        .translations
        .search(&auth.identity, &filters)
        .await
        .map_err(|e| ApiError::from_translation("Failed to search translations", e))?;

    let total = data.len();
    Ok(Json(Envelope::new(
        "Translations retrieved successfully",
        SearchResults { data, total },
    )))
}

/// `GET /translations/export?locale=xx`
pub async fn export(
    State(state): State<AppState>,
    auth: AuthUser,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> ApiResult<Json<LocaleExport>> {
    let Query(query) = query?;
    let locale = query
        .locale
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EXPORT_LOCALE.to_string());
    export_for(&state, &auth, &locale).await
}

/// `GET /translations/export/:locale`
pub async fn export_locale(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(locale): Path<String>,
) -> ApiResult<Json<LocaleExport>> {
    export_for(&state, &auth, &locale).await
}

async fn export_for(state: &AppState, auth: &AuthUser, locale: &str) -> ApiResult<Json<LocaleExport>> {
    let export = state
        .translations
        .export(&auth.identity, locale)
        .await
        .map_err(|e| ApiError::from_translation("Failed to export translations", e))?;
    Ok(Json(export))
}

/// Replace a translation's tag set by tag id
pub async fn manage_tags(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SyncTagsRequest>, JsonRejection>,
) -> ApiResult<TranslationResponse> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let tag_ids = req.validate()?;

    let missing = state
        .translations
        .missing_tag_ids(&tag_ids)
        .await
        .map_err(|e| ApiError::from_translation("Failed to update tags", e))?;
    if !missing.is_empty() {
        let mut errors = ValidationErrors::new();
        for (i, tag_id) in tag_ids.iter().enumerate() {
            if missing.contains(tag_id) {
                errors.add(format!("tags.{}", i), "One or more selected tags do not exist");
            }
        }
        return Err(errors.into());
    }

    let translation = state
        .translations
        .sync_tags(&auth.identity, id, &tag_ids)
        .await
        .map_err(|e| ApiError::from_translation("Failed to update tags", e))?;

    Ok(Json(Envelope::new("Tags updated successfully", translation)))
}
