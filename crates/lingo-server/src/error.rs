//! HTTP error responses

use crate::services::{AuthError, TranslationError};
use crate::validation::ValidationErrors;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("The given data was invalid.")]
    Validation(ValidationErrors),

    #[error("Resource not found.")]
    NotFound,

    #[error("Unauthenticated.")]
    Unauthorized,

    /// A failed operation with its user-facing summary
    #[error("{message}: {error}")]
    OperationFailed { message: String, error: String },

    #[error("{0}")]
    Auth(String),
}

impl ApiError {
    pub fn failed(message: impl Into<String>, error: impl ToString) -> Self {
        ApiError::OperationFailed {
            message: message.into(),
            error: error.to_string(),
        }
    }

    /// Map a service failure, keeping `message` as the summary for 500s
    pub fn from_translation(message: &str, e: TranslationError) -> Self {
        match e {
            TranslationError::NotFound(_) => ApiError::NotFound,
            TranslationError::Conflict(detail) => ApiError::failed(message, detail),
            TranslationError::OperationFailed(detail) => ApiError::failed(message, detail),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Auth(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::OperationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => json!({
                "message": "The given data was invalid.",
                "errors": errors,
            }),
            ApiError::OperationFailed { message, error } => {
                tracing::error!("{}: {}", message, error);
                json!({ "message": message, "error": error })
            }
            other => json!({ "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidToken(_) => ApiError::Unauthorized,
            AuthError::EmailTaken => ApiError::Validation(ValidationErrors::single(
                "email",
                AuthError::EmailTaken.to_string(),
            )),
            other => ApiError::Auth(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(ValidationErrors::single("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(ValidationErrors::single("query", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
