//! Business logic services

pub mod auth;
pub mod cache;
pub mod search;
pub mod translation;

pub use auth::{AuthError, AuthService, Claims};
pub use cache::{CachePolicy, TranslationCache};
pub use search::SearchEngine;
pub use translation::{TranslationError, TranslationService};
