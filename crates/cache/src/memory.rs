//! Bounded in-memory tier (least-recently-used eviction)

use crate::entry::CacheEntry;
use crate::key::CacheKey;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Fixed-capacity recency-ordered map from key to entry
///
/// A capacity of zero disables the tier: inserts are dropped immediately.
pub struct MemoryStore<T> {
    inner: Option<LruCache<CacheKey, CacheEntry<T>>>,
}

impl<T> MemoryStore<T> {
    /// Create a store holding at most `capacity` entries
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    /// Look up an entry and mark it most recently used
    pub fn get_mut(&mut self, key: &CacheKey) -> Option<&mut CacheEntry<T>> {
        self.inner.as_mut()?.get_mut(key)
    }

    /// Look up an entry without touching recency
    #[must_use]
    pub fn peek(&self, key: &CacheKey) -> Option<&CacheEntry<T>> {
        self.inner.as_ref()?.peek(key)
    }

    /// Whether `key` is resident
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.as_ref().is_some_and(|lru| lru.contains(key))
    }

    /// Insert or replace an entry, evicting the least recently used one when full
    ///
    /// Returns the key of the evicted entry, if any.
    pub fn insert(&mut self, key: CacheKey, entry: CacheEntry<T>) -> Option<CacheKey> {
        let Some(lru) = self.inner.as_mut() else {
            return Some(key);
        };
        match lru.push(key, entry) {
            // push hands back the old value when the key was already present
            Some((evicted, _)) if !lru.contains(&evicted) => Some(evicted),
            _ => None,
        }
    }

    /// Drop one entry
    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry<T>> {
        self.inner.as_mut()?.pop(key)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        if let Some(lru) = self.inner.as_mut() {
            lru.clear();
        }
    }

    /// Number of resident entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, LruCache::len)
    }

    /// Whether no entries are resident
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of resident entries
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.as_ref().map_or(0, |lru| lru.cap().get())
    }
}
