//! Translation cache: key derivation, TTL policy and invalidation

use crate::storage::MemoryCache;
use dashmap::DashMap;
use lingo_core::{PageRequest, SearchCriteria};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// TTLs for each cached read
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub search_ttl: Duration,
    pub page_ttl: Duration,
    pub export_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            search_ttl: Duration::from_secs(60),
            page_ttl: Duration::from_secs(60),
            export_ttl: Duration::from_secs(86_400),
        }
    }
}

/// Listing order, part of the page cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    Inserted,
    NewestFirst,
}

pub struct TranslationCache {
    cache: Arc<MemoryCache>,
    policy: CachePolicy,
    /// Bumped on every export eviction, per locale
    export_generations: DashMap<String, u64>,
}

impl TranslationCache {
    pub fn new(cache: Arc<MemoryCache>, policy: CachePolicy) -> Self {
        Self {
            cache,
            policy,
            export_generations: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn search_key(criteria: &SearchCriteria) -> String {
        // Criteria serialize in declaration order with sorted tags
        let encoded = serde_json::to_vec(criteria).unwrap_or_default();
        format!("translations.search.{}", blake3::hash(&encoded).to_hex())
    }

    pub fn page_key(order: ListOrder, request: PageRequest) -> String {
        let prefix = match order {
            ListOrder::Inserted => "translations.page",
            ListOrder::NewestFirst => "translations.latest",
        };
        format!("{}.{}.per.{}", prefix, request.page, request.per_page)
    }

    pub fn export_key(locale: &str) -> String {
        format!("translations.export.{}", locale)
    }

    /// Return the cached value for `key`, or compute, store and return it.
    /// Errors are passed through and never cached.
    pub async fn remember<T, E, F, Fut>(&self, key: String, ttl: Duration, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.cache.get_json::<T>(&key) {
            debug!("Cache hit: {}", key);
            return Ok(value);
        }

        debug!("Cache miss: {}", key);
        let value = compute().await?;
        if let Err(e) = self.cache.set_json_with_ttl(key.clone(), &value, ttl) {
            warn!("Failed to cache {}: {}", key, e);
        }
        Ok(value)
    }

    /// Like [`remember`](Self::remember) for a locale export, except a value
    /// computed while the locale was evicted is returned but never stored.
    pub async fn remember_export<T, E, F, Fut>(&self, locale: &str, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = Self::export_key(locale);
        if let Some(value) = self.cache.get_json::<T>(&key) {
            debug!("Cache hit: {}", key);
            return Ok(value);
        }

        debug!("Cache miss: {}", key);
        let generation = self.export_generation(locale);
        let value = compute().await?;
        if self.export_generation(locale) != generation {
            debug!("Export for {} changed while loading, not caching", locale);
            return Ok(value);
        }

        if let Err(e) = self
            .cache
            .set_json_with_ttl(key.clone(), &value, self.policy.export_ttl)
        {
            warn!("Failed to cache {}: {}", key, e);
        }
        // An eviction can land between the check and the write
        if self.export_generation(locale) != generation {
            self.cache.delete(&key);
        }
        Ok(value)
    }

    fn export_generation(&self, locale: &str) -> u64 {
        self.export_generations
            .get(locale)
            .map(|generation| *generation)
            .unwrap_or(0)
    }

    /// Evict the export entry for a locale
    pub fn forget_export(&self, locale: &str) {
        *self
            .export_generations
            .entry(locale.to_string())
            .or_insert(0) += 1;

        let key = Self::export_key(locale);
        if self.cache.delete(&key) {
            debug!("Evicted {}", key);
        }
    }
}
