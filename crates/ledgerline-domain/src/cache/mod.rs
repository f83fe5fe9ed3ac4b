//! Short-lived response caching for deduplicated reads.
//!
//! This module provides the read cache consulted by the single-flight
//! coordinator, built on Moka for concurrent access with bounded storage.
//!
//! # Freshness
//!
//! Every entry records when it was stored. An entry is served only while
//! `now - stored_at < ttl` (4 seconds by default). Stale entries are ignored
//! rather than deleted and are overwritten by the next successful response
//! for the same key. Moka's own TTL eviction runs behind this check to keep
//! memory bounded.
//!
//! Serving from cache is an explicit staleness tradeoff: callers that need
//! fresh data pass `no_cache` in their request options.
//!
//! # Example
//!
//! ```rust,ignore
//! use ledgerline_domain::cache::{ResponseCache, ResponseCacheConfig};
//! use ledgerline_domain::{Method, RequestKey};
//!
//! let cache = ResponseCache::new(ResponseCacheConfig::default());
//! let key = RequestKey::new(Method::Get, "/api/goals", None);
//! cache.insert(key.clone(), serde_json::json!([])).await;
//!
//! assert!(cache.get(&key).await.is_some());
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use moka::future::Cache;
use moka::notification::RemovalCause;
use serde_json::Value;
use tokio::time::Instant;

use crate::request::RequestKey;

/// Default freshness window for cached responses.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(4000);

/// Configuration for the response cache.
#[derive(Debug, Clone)]
pub struct ResponseCacheConfig {
    /// Whether cached responses are stored and served at all.
    pub enabled: bool,
    /// Maximum number of entries kept.
    pub max_capacity: u64,
    /// How long an entry is served after it was stored.
    pub ttl: Duration,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 10_000,
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl ResponseCacheConfig {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// A cached successful response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub stored_at: Instant,
    pub value: Value,
    /// Insert sequence number, matched against the URL index on eviction.
    generation: u64,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// URL -> cached keys for that URL, with the generation of each entry.
type UrlIndex = DashMap<String, HashMap<RequestKey, u64>>;

/// Response cache keyed by [`RequestKey`].
///
/// A secondary index maps each URL to the keys cached for it, so that all
/// bodies cached under one URL can be invalidated without scanning the
/// whole cache. Entries that Moka evicts (TTL or capacity) are dropped from
/// the index by an eviction listener.
pub struct ResponseCache {
    cache: Cache<RequestKey, CacheEntry>,
    config: ResponseCacheConfig,
    by_url: Arc<UrlIndex>,
    next_generation: AtomicU64,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("config", &self.config)
            .field("entry_count", &self.cache.entry_count())
            .field("url_index_size", &self.by_url.len())
            .finish()
    }
}

impl ResponseCache {
    /// Creates a new response cache with the given configuration.
    pub fn new(config: ResponseCacheConfig) -> Self {
        let by_url: Arc<UrlIndex> = Arc::new(DashMap::new());
        let index = Arc::clone(&by_url);

        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .eviction_listener(
                move |key: Arc<RequestKey>, entry: CacheEntry, cause: RemovalCause| {
                    // Replaced and explicit removals keep the index in sync themselves
                    if cause.was_evicted() {
                        unindex(&index, &key, Some(entry.generation));
                    }
                },
            )
            .build();

        Self {
            cache,
            config,
            by_url,
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ResponseCacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Stores a successful response, replacing any previous entry.
    ///
    /// Does nothing when caching is disabled.
    pub async fn insert(&self, key: RequestKey, value: Value) {
        if !self.config.enabled {
            return;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.by_url
            .entry(key.url.clone())
            .or_default()
            .insert(key.clone(), generation);

        let entry = CacheEntry {
            stored_at: Instant::now(),
            value,
            generation,
        };
        self.cache.insert(key, entry).await;
    }

    /// Returns the cached value if it is still fresh.
    ///
    /// # Metrics
    ///
    /// - `ledgerline_cache_hits_total` - Incremented on a fresh hit
    /// - `ledgerline_cache_misses_total` - Incremented on a miss or stale entry
    pub async fn get(&self, key: &RequestKey) -> Option<Value> {
        if !self.config.enabled {
            return None;
        }

        let fresh = self
            .cache
            .get(key)
            .await
            .filter(|entry| entry.is_fresh(self.config.ttl))
            .map(|entry| entry.value);

        if fresh.is_some() {
            metrics::counter!("ledgerline_cache_hits_total").increment(1);
        } else {
            metrics::counter!("ledgerline_cache_misses_total").increment(1);
        }
        fresh
    }

    /// Removes a single entry.
    pub async fn invalidate(&self, key: &RequestKey) {
        unindex(&self.by_url, key, None);
        self.cache.invalidate(key).await;
    }

    /// Removes every entry cached for `url`, whatever its method or body.
    pub async fn invalidate_url(&self, url: &str) {
        // remove() first so a concurrent insert lands in a fresh index set
        if let Some((_, keys)) = self.by_url.remove(url) {
            for key in keys.keys() {
                self.cache.invalidate(key).await;
            }
        }
    }

    /// Returns the approximate number of stored entries (fresh or not).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Number of URLs with at least one indexed entry.
    pub fn indexed_urls(&self) -> usize {
        self.by_url.len()
    }

    /// Runs pending maintenance tasks so `entry_count` is accurate.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

/// Drops `key` from the URL index, and the URL once it has no keys left.
///
/// With a generation, the key is only dropped if the index still points at
/// that entry; a newer insert for the same key stays indexed.
fn unindex(index: &UrlIndex, key: &RequestKey, generation: Option<u64>) {
    if let Entry::Occupied(mut keys) = index.entry(key.url.clone()) {
        let matches = match generation {
            Some(generation) => keys.get().get(key) == Some(&generation),
            None => true,
        };
        if matches {
            keys.get_mut().remove(key);
        }
        if keys.get().is_empty() {
            keys.remove();
        }
    }
}

/// Registers response cache metric descriptions.
pub fn register_response_cache_metrics() {
    metrics::describe_counter!(
        "ledgerline_cache_hits_total",
        "Total number of fresh response cache hits"
    );
    metrics::describe_counter!(
        "ledgerline_cache_misses_total",
        "Total number of response cache misses, including stale entries"
    );
}
