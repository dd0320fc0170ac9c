//! Error types for Lingo

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LingoError>;

#[derive(Error, Debug)]
pub enum LingoError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LingoError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LingoError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LingoError::NotFound { .. })
    }
}

impl From<serde_json::Error> for LingoError {
    fn from(e: serde_json::Error) -> Self {
        LingoError::Serialization(e.to_string())
    }
}
