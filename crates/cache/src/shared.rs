//! Thread-safe handle around [`FileCache`]

use crate::codec::{Codec, JsonCodec};
use crate::config::CacheConfig;
use crate::engine::{CacheStats, FileCache};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable, lock-protected cache for hosts that share one cache across threads
///
/// Every call takes the lock for its whole duration, so operations are
/// serialized. A lock poisoned by a panicking holder is recovered: the cache
/// holds nothing that a half-finished operation could leave unsound.
pub struct SharedFileCache<T, C = JsonCodec> {
    inner: Arc<Mutex<FileCache<T, C>>>,
}

impl<T, C> Clone for SharedFileCache<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, C> From<FileCache<T, C>> for SharedFileCache<T, C> {
    fn from(cache: FileCache<T, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }
}

impl<T, C> SharedFileCache<T, C>
where
    T: Clone,
    C: Codec<T>,
{
    /// Open a cache and wrap it
    #[must_use]
    pub fn open(config: CacheConfig) -> Self {
        FileCache::open(config).into()
    }

    /// Run `f` with exclusive access to the underlying cache
    pub fn with<R>(&self, f: impl FnOnce(&mut FileCache<T, C>) -> R) -> R {
        f(&mut self.lock())
    }

    /// See [`FileCache::get`]
    pub fn get(&self, path: impl AsRef<Path>) -> Option<T> {
        self.lock().get(path)
    }

    /// See [`FileCache::set`]
    pub fn set(&self, path: impl AsRef<Path>, data: T) {
        self.lock().set(path, data);
    }

    /// See [`FileCache::has`]
    #[must_use]
    pub fn has(&self, path: impl AsRef<Path>) -> bool {
        self.lock().has(path)
    }

    /// See [`FileCache::invalidate`]
    pub fn invalidate(&self, path: impl AsRef<Path>) {
        self.lock().invalidate(path);
    }

    /// See [`FileCache::invalidate_pattern`]
    pub fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        self.lock().invalidate_pattern(pattern)
    }

    /// See [`FileCache::clear`]
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// See [`FileCache::maintenance`]
    pub fn maintenance(&self) -> usize {
        self.lock().maintenance()
    }

    /// See [`FileCache::cached_files`]
    #[must_use]
    pub fn cached_files(&self) -> Vec<PathBuf> {
        self.lock().cached_files()
    }

    /// See [`FileCache::changed_files`]
    #[must_use]
    pub fn changed_files<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<PathBuf> {
        self.lock().changed_files(paths)
    }

    /// See [`FileCache::get_multiple`]
    pub fn get_multiple<I, P>(&self, paths: I) -> HashMap<PathBuf, T>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.lock().get_multiple(paths)
    }

    /// See [`FileCache::set_multiple`]
    pub fn set_multiple<I, P>(&self, items: I)
    where
        I: IntoIterator<Item = (P, T)>,
        P: AsRef<Path>,
    {
        self.lock().set_multiple(items);
    }

    /// See [`FileCache::stats`]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }

    fn lock(&self) -> MutexGuard<'_, FileCache<T, C>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovering file cache from a poisoned lock");
            PoisonError::into_inner(poisoned)
        })
    }
}
