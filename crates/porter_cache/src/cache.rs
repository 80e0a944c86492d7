//! Result cache implementation.

use crate::Fingerprint;
use chrono::{DateTime, Duration, Utc};
use derive_getters::Getters;
use porter_core::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Longest TTL honoured; larger requests are clamped (ten years).
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Cache entry with value and expiration.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry {
    value: JsonValue,
    stored_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    /// Whether this entry is still valid at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.stored_at + self.ttl
    }

    /// Time left before expiry, if any.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let left = self.stored_at + self.ttl - now;
        (left > Duration::zero()).then_some(left)
    }
}

/// Configuration for the result cache.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct ResultCacheConfig {
    /// Default TTL for cached entries (seconds)
    #[serde(default = "default_ttl")]
    #[builder(default = "default_ttl()")]
    default_ttl: u64,

    /// Maximum cache size (number of entries)
    #[serde(default = "default_max_size")]
    #[builder(default = "default_max_size()")]
    max_size: usize,

    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    #[builder(default = "default_enabled()")]
    enabled: bool,
}

fn default_ttl() -> u64 {
    300 // 5 minutes
}

fn default_max_size() -> usize {
    1000
}

fn default_enabled() -> bool {
    true
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            max_size: default_max_size(),
            enabled: default_enabled(),
        }
    }
}

/// Cache for idempotent platform reads.
///
/// Expiry is evaluated against the injected clock at read time. Expired
/// entries are never returned and are dropped by the lookup that finds them;
/// there is no background sweep. When full, the least recently used entry
/// makes room.
///
/// # Example
///
/// ```
/// use porter_cache::{Fingerprint, ResultCache, ResultCacheConfig};
/// use serde_json::json;
///
/// let mut cache = ResultCache::new(ResultCacheConfig::default());
/// let key = Fingerprint::new("analysis", "github.com/org/repo");
///
/// cache.put(key.clone(), json!({"default_branch": "main"}), None);
/// assert_eq!(cache.get(&key), Some(json!({"default_branch": "main"})));
/// ```
#[derive(Debug)]
pub struct ResultCache {
    config: ResultCacheConfig,
    clock: Arc<dyn Clock>,
    entries: HashMap<Fingerprint, CacheEntry>,
    access_order: VecDeque<Fingerprint>,
}

impl ResultCache {
    /// Create a cache on the system clock.
    pub fn new(config: ResultCacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache that judges expiry against `clock`.
    pub fn with_clock(config: ResultCacheConfig, clock: Arc<dyn Clock>) -> Self {
        tracing::debug!(
            default_ttl = config.default_ttl,
            max_size = config.max_size,
            enabled = config.enabled,
            "Creating new ResultCache"
        );
        Self {
            config,
            clock,
            entries: HashMap::new(),
            access_order: VecDeque::new(),
        }
    }

    /// Store a value.
    ///
    /// # Arguments
    ///
    /// * `key` - Request fingerprint
    /// * `value` - Payload to cache
    /// * `ttl_seconds` - TTL in seconds (uses default if None)
    #[tracing::instrument(
        skip(self, value),
        fields(key = %key, cache_size = self.entries.len())
    )]
    pub fn put(&mut self, key: Fingerprint, value: JsonValue, ttl_seconds: Option<u64>) {
        if !self.config.enabled {
            tracing::debug!("Cache disabled, skipping put");
            return;
        }

        let ttl_secs = ttl_seconds
            .unwrap_or(self.config.default_ttl)
            .min(MAX_TTL_SECS);
        let ttl = Duration::seconds(ttl_secs as i64);

        if self.config.max_size == 0 {
            return;
        }
        if self.entries.len() >= self.config.max_size && !self.entries.contains_key(&key) {
            self.evict_lru();
        }

        self.touch(&key);
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: self.clock.now(),
                ttl,
            },
        );
        tracing::debug!(ttl_secs, "Inserted entry into cache");
    }

    /// Look up a fresh value.
    ///
    /// Returns None if the entry doesn't exist, is expired, or the cache is
    /// disabled.
    #[tracing::instrument(skip(self), fields(key = %key, cache_size = self.entries.len()))]
    pub fn get(&mut self, key: &Fingerprint) -> Option<JsonValue> {
        if !self.config.enabled {
            tracing::debug!("Cache disabled, returning None");
            return None;
        }

        let now = self.clock.now();
        let entry = self.entries.get(key)?;
        if !entry.is_fresh(now) {
            tracing::debug!("Cache entry expired, removing");
            self.remove(key);
            return None;
        }

        let value = entry.value.clone();
        tracing::debug!(time_remaining = ?entry.time_remaining(now), "Cache hit");
        self.touch(key);
        Some(value)
    }

    /// Drop one entry.
    pub fn remove(&mut self, key: &Fingerprint) -> Option<JsonValue> {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Remove expired entries from cache.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();

        self.entries.retain(|_, entry| entry.is_fresh(now));
        let entries = &self.entries;
        self.access_order.retain(|k| entries.contains_key(k));

        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::info!(
                removed,
                remaining = self.entries.len(),
                "Cleaned up expired cache entries"
            );
        }
        removed
    }

    /// Clear all cache entries.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        self.access_order.clear();
        tracing::info!(cleared = count, "Cleared cache");
    }

    /// Get number of stored entries, fresh or not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cache configuration.
    pub fn config(&self) -> &ResultCacheConfig {
        &self.config
    }

    fn touch(&mut self, key: &Fingerprint) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
        self.access_order.push_back(key.clone());
    }

    /// Evict least recently used entry.
    fn evict_lru(&mut self) {
        if let Some(key) = self.access_order.pop_front() {
            tracing::debug!(key = %key, "Evicting LRU entry");
            self.entries.remove(&key);
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(ResultCacheConfig::default())
    }
}
