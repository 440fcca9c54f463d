//! Response memory cache
//!
//! Two independent stores keyed by request URI: one for decoded text
//! (pages, scripts, stylesheets) and one for raw bytes (images).
//! Entries expire after a fixed window and are never invalidated by file
//! changes. Each store sits behind a single mutex; the lock is never held
//! across an `.await`, so concurrent requests for the same URI may both
//! miss and both write. The last write wins.

use hyper::body::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::StaticFilesConfig;

/// Default expiry window for cached content
pub const DEFAULT_TTL: Duration = Duration::from_millis(60_000);

/// Default bound on entries per store
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    last_access: Instant,
}

/// Time-bounded, size-bounded map from URI to content
#[derive(Debug)]
pub struct ExpiringStore<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<V: Clone> ExpiringStore<V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, uri: &str) -> Option<V> {
        self.get_at(uri, Instant::now())
    }

    /// Look up `uri` as of `now`; an expired entry is evicted and reported as a miss
    pub fn get_at(&self, uri: &str, now: Instant) -> Option<V> {
        let mut entries = self.lock();
        let entry = entries.get_mut(uri)?;
        if now.saturating_duration_since(entry.inserted_at) < self.ttl {
            entry.last_access = now;
            return Some(entry.value.clone());
        }
        entries.remove(uri);
        None
    }

    pub fn put(&self, uri: &str, value: V) {
        self.put_at(uri, value, Instant::now());
    }

    /// Insert or overwrite `uri`, stamping it with `now`
    pub fn put_at(&self, uri: &str, value: V, now: Instant) {
        if self.max_entries == 0 {
            return;
        }
        let mut entries = self.lock();
        if !entries.contains_key(uri) && entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, e| now.saturating_duration_since(e.inserted_at) < ttl);
            if entries.len() >= self.max_entries {
                let lru = entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_access)
                    .map(|(k, _)| k.clone());
                if let Some(key) = lru {
                    entries.remove(&key);
                }
            }
        }
        entries.insert(
            uri.to_string(),
            CacheEntry {
                value,
                inserted_at: now,
                last_access: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Process-wide response cache injected into the dispatcher via `AppState`
#[derive(Debug)]
pub struct ResponseCache {
    enabled: bool,
    text: ExpiringStore<Arc<str>>,
    bytes: ExpiringStore<Bytes>,
}

impl ResponseCache {
    pub fn new(enabled: bool, ttl: Duration, max_entries: usize) -> Self {
        Self {
            enabled,
            text: ExpiringStore::new(ttl, max_entries),
            bytes: ExpiringStore::new(ttl, max_entries),
        }
    }

    /// Cache that always misses and ignores writes
    pub fn disabled() -> Self {
        Self::new(false, DEFAULT_TTL, 0)
    }

    pub fn from_config(cfg: &StaticFilesConfig) -> Self {
        Self::new(
            cfg.memory_cache,
            Duration::from_millis(cfg.cache_ttl_ms),
            cfg.cache_max_entries,
        )
    }

    pub fn get_text(&self, uri: &str) -> Option<Arc<str>> {
        if !self.enabled {
            return None;
        }
        self.text.get(uri)
    }

    pub fn put_text(&self, uri: &str, content: Arc<str>) {
        if self.enabled {
            self.text.put(uri, content);
        }
    }

    pub fn get_bytes(&self, uri: &str) -> Option<Bytes> {
        if !self.enabled {
            return None;
        }
        self.bytes.get(uri)
    }

    pub fn put_bytes(&self, uri: &str, content: Bytes) {
        if self.enabled {
            self.bytes.put(uri, content);
        }
    }

    /// Total entries across both stores
    pub fn len(&self) -> usize {
        self.text.len() + self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.bytes.is_empty()
    }

    pub fn clear(&self) {
        self.text.clear();
        self.bytes.clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::disabled()
    }
}
