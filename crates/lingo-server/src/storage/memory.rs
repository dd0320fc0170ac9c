//! In-memory cache using DashMap

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// In-memory key/value cache with per-entry TTL.
///
/// Values are opaque bytes; the `*_json` helpers store serde_json payloads.
pub struct MemoryCache {
    data: Arc<DashMap<String, CacheEntry>>,
}

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }
}

impl MemoryCache {
    /// Create the cache and spawn its expiry sweeper on the current runtime
    pub fn new() -> Self {
        let cache = Self {
            data: Arc::new(DashMap::new()),
        };
        cache.start_sweeper();
        cache
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        {
            let entry = self.data.get(key)?;
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        // Only evict if no fresh value was written since the read
        self.data.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    pub fn set_with_ttl(&self, key: String, value: Vec<u8>, ttl: Duration) {
        self.data.insert(
            key,
            CacheEntry {
                value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
    }

    pub fn delete(&self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    pub fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Decode a JSON entry. An undecodable entry is evicted and reported as a miss.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get(key)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Evicting undecodable cache entry {}: {}", key, e);
                self.data.remove_if(key, |_, entry| entry.value == bytes);
                None
            }
        }
    }

    pub fn set_json_with_ttl<T: Serialize>(
        &self,
        key: String,
        value: &T,
        ttl: Duration,
    ) -> serde_json::Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.set_with_ttl(key, bytes, ttl);
        Ok(())
    }

    fn start_sweeper(&self) {
        let data = self.data.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let removed = sweep_expired(&data);
                if removed > 0 {
                    tracing::debug!("Cache sweeper removed {} expired entries", removed);
                }
            }
        });
    }
}

fn sweep_expired(data: &DashMap<String, CacheEntry>) -> usize {
    let now = Instant::now();
    let before = data.len();
    data.retain(|_, entry| !entry.is_expired(now));
    before.saturating_sub(data.len())
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}
