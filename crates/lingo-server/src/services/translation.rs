//! Translation service
//!
//! Orchestrates the translation store, the search engine and the cache.
//! Every lower-level failure is re-signaled as a [`TranslationError`] so raw
//! persistence errors never cross this boundary.

use crate::services::cache::{ListOrder, TranslationCache};
use crate::services::search::SearchEngine;
use lingo_core::ports::{TagStore, TranslationStore};
use lingo_core::{
    Identity, LingoError, LocaleExport, NewTag, NewTranslation, Page, PageRequest, SearchFilters,
    Tag, Translation, TranslationUpdate,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    OperationFailed(String),
}

impl TranslationError {
    fn wrap(action: &str, e: LingoError) -> Self {
        match e {
            LingoError::NotFound { .. } => TranslationError::NotFound(e.to_string()),
            LingoError::Conflict(_) => {
                TranslationError::Conflict(format!("Failed to {}: {}", action, e))
            }
            other => {
                error!("Failed to {}: {}", action, other);
                TranslationError::OperationFailed(format!("Failed to {}: {}", action, other))
            }
        }
    }
}

pub type TranslationResult<T> = std::result::Result<T, TranslationError>;

pub struct TranslationService {
    store: Arc<dyn TranslationStore>,
    tags: Arc<dyn TagStore>,
    search: SearchEngine,
    cache: TranslationCache,
}

impl TranslationService {
    pub fn new(
        store: Arc<dyn TranslationStore>,
        tags: Arc<dyn TagStore>,
        search: SearchEngine,
        cache: TranslationCache,
    ) -> Self {
        Self {
            store,
            tags,
            search,
            cache,
        }
    }

    pub async fn create(&self, actor: &Identity, data: NewTranslation) -> TranslationResult<Translation> {
        info!(
            "Creating translation: user={}, key={}, locale={}, tags={:?}",
            actor.user_id, data.key, data.locale, data.tags
        );

        let translation = self
            .store
            .create_translation(&data)
            .await
            .map_err(|e| TranslationError::wrap("create translation", e))?;

        self.cache.forget_export(&translation.locale);
        Ok(translation)
    }

    pub async fn update(
        &self,
        actor: &Identity,
        id: i64,
        data: TranslationUpdate,
    ) -> TranslationResult<Translation> {
        info!("Updating translation: user={}, id={}", actor.user_id, id);

        let translation = self
            .store
            .update_translation(id, &data)
            .await
            .map_err(|e| TranslationError::wrap("update translation", e))?;

        self.cache.forget_export(&translation.locale);
        Ok(translation)
    }

    pub async fn search(
        &self,
        actor: &Identity,
        filters: &SearchFilters,
    ) -> TranslationResult<Vec<Translation>> {
        let criteria = filters.normalize();
        info!("Searching translations: user={}, criteria={:?}", actor.user_id, criteria);

        self.cache
            .remember(
                TranslationCache::search_key(&criteria),
                self.cache.policy().search_ttl,
                || self.search.search(&criteria),
            )
            .await
            .map_err(|e| TranslationError::wrap("search translations", e))
    }

    pub async fn export(&self, actor: &Identity, locale: &str) -> TranslationResult<LocaleExport> {
        info!("Exporting translations: user={}, locale={}", actor.user_id, locale);

        self.cache
            .remember_export(locale, || self.store.export_locale(locale))
            .await
            .map_err(|e| TranslationError::wrap("export translations", e))
    }

    /// Insertion-ordered listing
    pub async fn list_all(
        &self,
        actor: &Identity,
        request: PageRequest,
    ) -> TranslationResult<Page<Translation>> {
        info!(
            "Listing translations: user={}, page={}, per_page={}",
            actor.user_id, request.page, request.per_page
        );

        self.cache
            .remember(
                TranslationCache::page_key(ListOrder::Inserted, request),
                self.cache.policy().page_ttl,
                || self.store.list_page(request),
            )
            .await
            .map_err(|e| TranslationError::wrap("retrieve translations", e))
    }

    /// Newest-first listing
    pub async fn latest(
        &self,
        actor: &Identity,
        request: PageRequest,
    ) -> TranslationResult<Page<Translation>> {
        info!(
            "Listing latest translations: user={}, page={}, per_page={}",
            actor.user_id, request.page, request.per_page
        );

        self.cache
            .remember(
                TranslationCache::page_key(ListOrder::NewestFirst, request),
                self.cache.policy().page_ttl,
                || self.store.paginate(request),
            )
            .await
            .map_err(|e| TranslationError::wrap("retrieve translations", e))
    }

    pub async fn get_one(&self, actor: &Identity, id: i64) -> TranslationResult<Translation> {
        info!("Fetching translation: user={}, id={}", actor.user_id, id);

        self.store
            .find_translation(id)
            .await
            .map_err(|e| TranslationError::wrap("retrieve translation", e))?
            .ok_or_else(|| TranslationError::NotFound(format!("Translation not found: {}", id)))
    }

    pub async fn delete_one(&self, actor: &Identity, id: i64) -> TranslationResult<()> {
        info!("Deleting translation: user={}, id={}", actor.user_id, id);

        let translation = self.get_one(actor, id).await?;
        let deleted = self
            .store
            .delete_translation(id)
            .await
            .map_err(|e| TranslationError::wrap("delete translation", e))?;

        self.cache.forget_export(&translation.locale);

        if !deleted {
            return Err(TranslationError::NotFound(format!(
                "Translation not found: {}",
                id
            )));
        }
        Ok(())
    }

    /// Replace the tag set by tag id and return the refreshed translation
    pub async fn sync_tags(
        &self,
        actor: &Identity,
        id: i64,
        tag_ids: &[i64],
    ) -> TranslationResult<Translation> {
        info!(
            "Syncing tags: user={}, translation={}, tags={:?}",
            actor.user_id, id, tag_ids
        );

        let translation = self
            .store
            .sync_tag_ids(id, tag_ids)
            .await
            .map_err(|e| TranslationError::wrap("update tags", e))?;

        self.cache.forget_export(&translation.locale);
        Ok(translation)
    }

    pub async fn list_tags(&self, actor: &Identity) -> TranslationResult<Vec<Tag>> {
        info!("Listing tags: user={}", actor.user_id);

        self.tags
            .list_tags()
            .await
            .map_err(|e| TranslationError::wrap("retrieve tags", e))
    }

    pub async fn create_tag(&self, actor: &Identity, tag: NewTag) -> TranslationResult<Tag> {
        info!("Creating tag: user={}, name={}", actor.user_id, tag.name);

        self.tags
            .create_tag(&tag)
            .await
            .map_err(|e| TranslationError::wrap("create tag", e))
    }

    pub async fn find_tag_by_name(&self, name: &str) -> TranslationResult<Option<Tag>> {
        self.tags
            .find_tag_by_name(name)
            .await
            .map_err(|e| TranslationError::wrap("retrieve tag", e))
    }

    pub async fn missing_tag_ids(&self, ids: &[i64]) -> TranslationResult<Vec<i64>> {
        self.tags
            .missing_tag_ids(ids)
            .await
            .map_err(|e| TranslationError::wrap("retrieve tags", e))
    }
}
