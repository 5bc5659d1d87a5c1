//! Whole-response page cache.
//!
//! [`PageCache`] is the injected key/value seam; [`InMemoryPageCache`] keeps
//! up to a fixed number of entries in process memory, each with its own
//! expiry. Writes to posts do not
//! touch the cache: a cached page may be stale for up to its TTL, and
//! [`PageCache::invalidate`] / [`PageCache::clear`] are the only early
//! eviction paths.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::domain::error::DomainError;

#[async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Bytes>;
    async fn set(&self, key: &str, body: Bytes, ttl: Duration);
    async fn invalidate(&self, key: &str);
    async fn clear(&self);
}

#[derive(Debug, Clone)]
struct CachedEntry {
    body: Bytes,
    expires_at: Instant,
}

impl CachedEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

pub const DEFAULT_MAX_ENTRIES: usize = 300;

#[derive(Debug)]
pub struct InMemoryPageCache {
    store: DashMap<String, CachedEntry>,
    max_entries: usize,
}

impl Default for InMemoryPageCache {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_ENTRIES)
    }
}

impl InMemoryPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_entries: usize) -> Self {
        debug!(max_entries, "initializing page cache");
        Self {
            store: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Makes room for one more key: expired entries go first, then a tenth of
    /// the remaining ones (at least one) in map order.
    fn enforce_limits(&self) {
        if self.store.len() < self.max_entries {
            return;
        }
        self.store.retain(|_, entry| !entry.is_expired());
        if self.store.len() < self.max_entries {
            return;
        }

        let evict_count = (self.store.len() / 10).max(1);
        warn!(
            entries = self.store.len(),
            evict_count, "page cache full, evicting entries"
        );
        let victims: Vec<String> = self
            .store
            .iter()
            .take(evict_count)
            .map(|entry| entry.key().clone())
            .collect();
        for key in victims {
            self.store.remove(&key);
        }
    }
}

#[async_trait]
impl PageCache for InMemoryPageCache {
    async fn get(&self, key: &str) -> Option<Bytes> {
        let hit = self.store.get(key).map(|entry| entry.clone())?;
        if hit.is_expired() {
            self.store.remove_if(key, |_, entry| entry.is_expired());
            debug!(key, "page cache entry expired");
            return None;
        }
        Some(hit.body)
    }

    async fn set(&self, key: &str, body: Bytes, ttl: Duration) {
        if !self.store.contains_key(key) {
            self.enforce_limits();
        }
        let expires_at = Instant::now() + ttl;
        self.store
            .insert(key.to_string(), CachedEntry { body, expires_at });
    }

    async fn invalidate(&self, key: &str) {
        self.store.remove(key);
    }

    async fn clear(&self) {
        self.store.clear();
        debug!("page cache cleared");
    }
}

/// A [`PageCache`] bound to the TTL its pages are stored with.
#[derive(Clone)]
pub struct ResponseCache {
    cache: Arc<dyn PageCache>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(cache: Arc<dyn PageCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub fn cache(&self) -> &Arc<dyn PageCache> {
        &self.cache
    }

    /// Returns the cached body for `key`, rendering and storing it on a miss.
    /// Failed renders are not cached.
    pub async fn get_or_render<F, Fut>(&self, key: &str, render: F) -> Result<Bytes, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, DomainError>>,
    {
        if let Some(body) = self.cache.get(key).await {
            debug!(key, "page cache hit");
            return Ok(body);
        }

        debug!(key, "page cache miss");
        let body = render().await?;
        self.cache.set(key, body.clone(), self.ttl).await;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_returns_bodies_until_cleared() {
        let cache = InMemoryPageCache::new();
        cache
            .set("index:page=1", Bytes::from_static(b"one"), Duration::from_secs(60))
            .await;

        assert_eq!(cache.get("index:page=1").await, Some(Bytes::from_static(b"one")));
        assert_eq!(cache.get("index:page=2").await, None);

        cache.clear().await;
        assert!(cache.is_empty());
        assert_eq!(cache.get("index:page=1").await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_read() {
        let cache = InMemoryPageCache::new();
        cache
            .set("index:", Bytes::from_static(b"stale"), Duration::ZERO)
            .await;

        assert_eq!(cache.get("index:").await, None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn invalidate_removes_a_single_key() {
        let cache = InMemoryPageCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("a", Bytes::from_static(b"a"), ttl).await;
        cache.set("b", Bytes::from_static(b"b"), ttl).await;

        cache.invalidate("a").await;

        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some(Bytes::from_static(b"b")));
    }

    #[tokio::test]
    async fn never_holds_more_than_max_entries() {
        let cache = InMemoryPageCache::with_limits(20);
        let ttl = Duration::from_secs(60);
        for i in 0..100 {
            cache
                .set(&format!("index:page={i}"), Bytes::from_static(b"page"), ttl)
                .await;
        }

        assert!(cache.len() <= 20);
        assert_eq!(
            cache.get("index:page=99").await,
            Some(Bytes::from_static(b"page"))
        );
    }

    #[tokio::test]
    async fn expired_entries_are_evicted_before_live_ones() {
        let cache = InMemoryPageCache::with_limits(2);
        cache.set("stale", Bytes::from_static(b"old"), Duration::ZERO).await;
        cache
            .set("live", Bytes::from_static(b"live"), Duration::from_secs(60))
            .await;

        cache
            .set("new", Bytes::from_static(b"new"), Duration::from_secs(60))
            .await;

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("live").await, Some(Bytes::from_static(b"live")));
        assert_eq!(cache.get("new").await, Some(Bytes::from_static(b"new")));
    }

    #[tokio::test]
    async fn overwriting_a_key_at_capacity_evicts_nothing() {
        let cache = InMemoryPageCache::with_limits(2);
        let ttl = Duration::from_secs(60);
        cache.set("a", Bytes::from_static(b"a"), ttl).await;
        cache.set("b", Bytes::from_static(b"b"), ttl).await;

        cache.set("a", Bytes::from_static(b"a2"), ttl).await;

        assert_eq!(cache.get("a").await, Some(Bytes::from_static(b"a2")));
        assert_eq!(cache.get("b").await, Some(Bytes::from_static(b"b")));
    }

    #[tokio::test]
    async fn renders_once_per_key_within_the_ttl() {
        let responses = ResponseCache::new(Arc::new(InMemoryPageCache::new()), Duration::from_secs(60));

        let first = responses
            .get_or_render("k", || async { Ok(Bytes::from_static(b"first")) })
            .await
            .unwrap();
        let second = responses
            .get_or_render("k", || async { Ok(Bytes::from_static(b"second")) })
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn failed_renders_are_not_cached() {
        let responses = ResponseCache::new(Arc::new(InMemoryPageCache::new()), Duration::from_secs(60));

        let failed = responses
            .get_or_render("k", || async { Err(DomainError::Internal("db down".into())) })
            .await;
        assert!(failed.is_err());

        assert_eq!(responses.cache().get("k").await, None);
    }
}
