//! Cache Manager for markstore.
//!
//! A registry of independently named, bounded caches. Each cache evicts its
//! oldest-inserted entry when full and may expire entries after a TTL.
//! Entries can carry a staleness stamp so derived views are recomputed when
//! the tree they were computed from has changed.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Names of the caches created by [`crate::app::App`].
pub mod cache_names {
    pub const FOLDER_PATHS: &str = "folderPaths";
    pub const BOOKMARKS_WITH_PATH: &str = "bookmarksWithPath";
}

/// Type-erased value stored in a [`CacheManager`] cache.
pub type SharedValue = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    stamp: Option<u64>,
}

/// A single bounded key→value cache with insertion-order eviction.
#[derive(Debug, Clone)]
pub struct BoundedCache<V> {
    entries: IndexMap<String, CacheEntry<V>>,
    max_size: usize,
    ttl: Option<Duration>,
}

impl<V: Clone> BoundedCache<V> {
    /// Creates a cache holding at most `max_size` entries (minimum one).
    pub fn new(max_size: usize, ttl: Option<Duration>) -> Self {
        Self {
            entries: IndexMap::new(),
            max_size: max_size.max(1),
            ttl,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn is_expired(&self, entry: &CacheEntry<V>) -> bool {
        matches!(self.ttl, Some(ttl) if entry.inserted_at.elapsed() > ttl)
    }

    /// Returns the value for `key`, evicting it first if it has expired.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = self.is_expired(self.entries.get(key)?);
        if expired {
            self.entries.shift_remove(key);
            return None;
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    /// Like [`get`](Self::get), but also treats the entry as absent (and
    /// evicts it) when it was stored under a different stamp.
    pub fn get_fresh(&mut self, key: &str, stamp: u64) -> Option<V> {
        let entry = self.entries.get(key)?;
        if self.is_expired(entry) || entry.stamp != Some(stamp) {
            self.entries.shift_remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    /// Inserts `value`. Overwriting an existing key keeps its position;
    /// inserting a new key into a full cache evicts the oldest entry.
    pub fn set(&mut self, key: &str, value: V) {
        self.insert(key, value, None);
    }

    pub fn set_stamped(&mut self, key: &str, value: V, stamp: u64) {
        self.insert(key, value, Some(stamp));
    }

    fn insert(&mut self, key: &str, value: V, stamp: Option<u64>) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_size {
            self.entries.shift_remove_index(0);
        }
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                stamp,
            },
        );
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.shift_remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order, oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let before = self.entries.len();
        self.entries.retain(|_, e| e.inserted_at.elapsed() <= ttl);
        before - self.entries.len()
    }
}

/// Snapshot of one cache's occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub name: String,
    pub size: usize,
    pub max_size: usize,
    pub keys: Vec<String>,
}

/// Registry of named caches holding values of any `Send + Sync` type.
#[derive(Default)]
pub struct CacheManager {
    caches: HashMap<String, BoundedCache<SharedValue>>,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the cache `name`. Creating an existing name logs a warning
    /// and returns the existing cache untouched.
    pub fn create_cache(
        &mut self,
        name: &str,
        max_size: usize,
        ttl: Option<Duration>,
    ) -> &mut BoundedCache<SharedValue> {
        if self.caches.contains_key(name) {
            tracing::warn!(cache = name, "cache already exists");
        }
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| BoundedCache::new(max_size, ttl))
    }

    pub fn has_cache(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Typed lookup. A missing cache, missing key, expired entry, or value
    /// of another type all read as `None`.
    pub fn get<T: Any + Send + Sync>(&mut self, name: &str, key: &str) -> Option<Arc<T>> {
        let value = self.caches.get_mut(name)?.get(key)?;
        value.downcast::<T>().ok()
    }

    /// Typed lookup that also requires the entry's stamp to equal `stamp`.
    pub fn get_fresh<T: Any + Send + Sync>(
        &mut self,
        name: &str,
        key: &str,
        stamp: u64,
    ) -> Option<Arc<T>> {
        let value = self.caches.get_mut(name)?.get_fresh(key, stamp)?;
        value.downcast::<T>().ok()
    }

    /// Stores `value`. Returns false if the cache does not exist.
    pub fn set<T: Any + Send + Sync>(&mut self, name: &str, key: &str, value: Arc<T>) -> bool {
        match self.caches.get_mut(name) {
            Some(cache) => {
                cache.set(key, value);
                true
            }
            None => false,
        }
    }

    pub fn set_stamped<T: Any + Send + Sync>(
        &mut self,
        name: &str,
        key: &str,
        value: Arc<T>,
        stamp: u64,
    ) -> bool {
        match self.caches.get_mut(name) {
            Some(cache) => {
                cache.set_stamped(key, value, stamp);
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, name: &str, key: &str) -> bool {
        self.caches
            .get_mut(name)
            .map(|cache| cache.remove(key))
            .unwrap_or(false)
    }

    /// Empties one cache. Returns false if it does not exist.
    pub fn clear(&mut self, name: &str) -> bool {
        match self.caches.get_mut(name) {
            Some(cache) => {
                cache.clear();
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&mut self) {
        for cache in self.caches.values_mut() {
            cache.clear();
        }
    }

    pub fn size(&self, name: &str) -> usize {
        self.caches.get(name).map(|c| c.len()).unwrap_or(0)
    }

    pub fn stats(&self, name: &str) -> Option<CacheStats> {
        self.caches.get(name).map(|cache| CacheStats {
            name: name.to_string(),
            size: cache.len(),
            max_size: cache.max_size(),
            keys: cache.keys(),
        })
    }

    pub fn all_stats(&self) -> Vec<CacheStats> {
        let mut names: Vec<&String> = self.caches.keys().collect();
        names.sort();
        names.into_iter().filter_map(|n| self.stats(n)).collect()
    }

    /// Sweeps every TTL-bearing cache for expired entries.
    pub fn cleanup(&mut self) -> usize {
        let removed: usize = self.caches.values_mut().map(|c| c.purge_expired()).sum();
        if removed > 0 {
            tracing::debug!(removed, "expired cache entries purged");
        }
        removed
    }

    /// Drops every cache, including their definitions.
    pub fn destroy(&mut self) {
        self.caches.clear();
    }
}
