//! Storage traits for persistence

use crate::Result;
use async_trait::async_trait;
use lingo_types::{
    LocaleExport, NewTag, NewTranslation, Page, PageRequest, SearchCriteria, Tag, Translation,
    TranslationUpdate, User,
};

/// Tag store
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Create a tag; a duplicate name is a `Conflict`
    async fn create_tag(&self, tag: &NewTag) -> Result<Tag>;
    async fn get_tag(&self, id: i64) -> Result<Option<Tag>>;
    async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>>;
    /// Resolve a tag by name, creating it if absent. Safe under concurrency.
    async fn find_or_create_tag(&self, name: &str) -> Result<Tag>;
    async fn list_tags(&self) -> Result<Vec<Tag>>;
    /// Subset of `ids` that do not name an existing tag
    async fn missing_tag_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;
}

/// Translation store.
///
/// Every multi-step mutation is all-or-nothing.
#[async_trait]
pub trait TranslationStore: Send + Sync {
    /// Insert a translation and link its tags, resolved by name
    async fn create_translation(&self, new: &NewTranslation) -> Result<Translation>;
    /// Update content and, when supplied, replace the tag set (by name)
    async fn update_translation(&self, id: i64, update: &TranslationUpdate) -> Result<Translation>;
    /// Detach all tags and remove the row; returns whether a row was removed
    async fn delete_translation(&self, id: i64) -> Result<bool>;
    async fn find_translation(&self, id: i64) -> Result<Option<Translation>>;
    /// Newest first
    async fn paginate(&self, request: PageRequest) -> Result<Page<Translation>>;
    /// Insertion order
    async fn list_page(&self, request: PageRequest) -> Result<Page<Translation>>;
    /// Replace the tag set by tag id
    async fn sync_tag_ids(&self, id: i64, tag_ids: &[i64]) -> Result<Translation>;
    async fn export_locale(&self, locale: &str) -> Result<LocaleExport>;
}

/// Filtered lookup over translations
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Translation>>;
}

/// User store
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User>;
    async fn get_user(&self, id: &str) -> Result<Option<User>>;
    /// User plus stored password hash
    async fn get_user_credentials(&self, email: &str) -> Result<Option<(User, String)>>;
    /// Replace name and email, and the password hash when one is given
    async fn update_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: Option<&str>,
    ) -> Result<User>;
}
