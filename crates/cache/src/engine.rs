//! The cache engine: lookup, store, invalidation and maintenance
//!
//! `FileCache` is the only component that mutates the ledger, the memory tier
//! and the disk tier. Lookups go memory -> disk -> miss, and every hit is
//! re-validated against the file's current fingerprint and the entry's age.
//! All filesystem work is synchronous.

use crate::codec::{Codec, JsonCodec};
use crate::config::{CacheConfig, DEFAULT_NAMESPACE, InvalidationScope};
use crate::disk::{DiskRead, DiskStore};
use crate::entry::CacheEntry;
use crate::fingerprint::Fingerprinter;
use crate::key::{CacheKey, path_string};
use crate::ledger::Ledger;
use crate::memory::MemoryStore;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Point-in-time counters for a cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Entries resident in the memory tier
    pub memory_entries: usize,
    /// Entry files in the disk tier
    pub disk_entries: usize,
    /// Paths recorded in the ledger
    pub total_files: usize,
    /// Directory holding the ledger and entry files
    pub cache_dir: PathBuf,
}

/// Change-aware two-tier cache of values derived from files
///
/// Values are keyed by the source file's path and dropped automatically once
/// the file's fingerprint no longer matches the one recorded at store time,
/// or once they are older than the configured maximum age.
///
/// The cache is best effort: I/O failures turn into misses or memory-only
/// entries and are logged, never returned.
pub struct FileCache<T, C = JsonCodec> {
    config: CacheConfig,
    fingerprinter: Fingerprinter,
    ledger: Ledger,
    memory: MemoryStore<T>,
    disk: DiskStore<T, C>,
}

impl<T, C> FileCache<T, C>
where
    T: Clone,
    C: Codec<T>,
{
    /// Open the cache described by `config`, loading its ledger
    ///
    /// Never fails; an absent or corrupt ledger starts empty. No directory
    /// is created until the first store.
    #[must_use]
    pub fn open(config: CacheConfig) -> Self {
        if let Err(e) = config.validate() {
            tracing::warn!("{e}; using namespace '{DEFAULT_NAMESPACE}'");
        }
        let dir = config.storage_dir();
        let ledger = Ledger::load(&dir);
        tracing::debug!(
            dir = %dir.display(),
            files = ledger.len(),
            capacity = config.max_memory_entries,
            hashing = config.enable_file_hashing,
            "Opened file cache"
        );
        Self {
            fingerprinter: Fingerprinter::new(config.enable_file_hashing),
            memory: MemoryStore::new(config.max_memory_entries),
            disk: DiskStore::new(dir),
            ledger,
            config,
        }
    }

    /// The configuration the cache was opened with
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Fetch the cached value for `path` if it is still fresh
    ///
    /// A stale or expired memory copy is dropped and the disk copy consulted;
    /// a stale, expired or corrupt disk copy is deleted along with its ledger
    /// entry. A fresh disk copy is promoted into memory.
    pub fn get(&mut self, path: impl AsRef<Path>) -> Option<T> {
        let path = path.as_ref();
        let key = CacheKey::for_path(path);
        let now = Utc::now();

        let mut stale_in_memory = false;
        if let Some(entry) = self.memory.get_mut(&key) {
            if is_fresh(self.fingerprinter, &self.config, path, entry, now) {
                entry.touch(now);
                tracing::debug!(path = %path.display(), "Memory cache hit");
                return Some(entry.data.clone());
            }
            stale_in_memory = true;
        }
        if stale_in_memory {
            tracing::debug!(path = %path.display(), "Memory entry is stale");
            self.drop_from_memory(&key);
        }

        match self.disk.read(&key) {
            DiskRead::Hit(mut entry) => {
                if is_fresh(self.fingerprinter, &self.config, path, &entry, now) {
                    entry.touch(now);
                    let data = entry.data.clone();
                    let path_key = path_string(path);
                    if self.ledger.get(&path_key).is_none() {
                        // Ledger was lost or discarded; re-adopt the entry
                        tracing::debug!(path = %path.display(), "Recording unledgered disk entry");
                        self.ledger.put(path_key, entry.fingerprint.clone(), entry.created_at);
                    }
                    self.promote(key, entry);
                    tracing::debug!(path = %path.display(), "Disk cache hit");
                    Some(data)
                } else {
                    tracing::debug!(path = %path.display(), "Disk entry is stale or expired");
                    self.forget(path, &key);
                    None
                }
            }
            DiskRead::Corrupt(e) => {
                tracing::warn!(
                    path = %path.display(),
                    file = %self.disk.path(&key).display(),
                    "Removing unreadable cache entry: {e}"
                );
                self.forget(path, &key);
                None
            }
            DiskRead::Missing => {
                tracing::debug!(path = %path.display(), "Cache miss");
                None
            }
        }
    }

    /// Store `data` for `path`, fingerprinting the file as it is now
    ///
    /// If the file cannot be fingerprinted nothing is stored. A failed disk
    /// write leaves the value in memory only.
    pub fn set(&mut self, path: impl AsRef<Path>, data: T) {
        let path = path.as_ref();
        let Some(fingerprint) = self.fingerprinter.compute(path) else {
            tracing::debug!(path = %path.display(), "Cannot fingerprint file, not caching");
            return;
        };

        let key = CacheKey::for_path(path);
        let now = Utc::now();
        let entry = CacheEntry::new(data, fingerprint.clone(), now);

        if let Err(e) = self.disk.write(&key, &entry) {
            tracing::warn!(path = %path.display(), "Failed to write cache entry: {e}");
        }
        self.promote(key, entry);
        self.ledger.put(path_string(path), fingerprint, now);
    }

    /// Whether a fresh value is cached for `path`
    ///
    /// Read-only check: nothing is promoted, evicted or deleted.
    #[must_use]
    pub fn has(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let key = CacheKey::for_path(path);
        let now = Utc::now();

        if let Some(entry) = self.memory.peek(&key) {
            if is_fresh(self.fingerprinter, &self.config, path, entry, now) {
                return true;
            }
        }
        match self.disk.read(&key) {
            DiskRead::Hit(entry) => is_fresh(self.fingerprinter, &self.config, path, &entry, now),
            DiskRead::Missing | DiskRead::Corrupt(_) => false,
        }
    }

    /// Drop everything cached for `path`
    pub fn invalidate(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let key = CacheKey::for_path(path);
        self.drop_from_memory(&key);
        self.forget(path, &key);
        tracing::debug!(path = %path.display(), "Invalidated cache entry");
    }

    /// Invalidate every recorded path matching `pattern`; returns how many
    ///
    /// Paths are invalidated one after another, not atomically.
    pub fn invalidate_pattern(&mut self, pattern: &Regex) -> usize {
        let matching: Vec<String> = self
            .ledger
            .paths()
            .into_iter()
            .filter(|path| pattern.is_match(path))
            .collect();
        for path in &matching {
            self.invalidate(path);
        }
        tracing::debug!(
            pattern = %pattern,
            count = matching.len(),
            "Invalidated cache entries by pattern"
        );
        matching.len()
    }

    /// Drop every entry in both tiers and empty the ledger
    pub fn clear(&mut self) {
        self.memory.clear();
        match self.disk.remove_all() {
            Ok(removed) => tracing::debug!(removed, "Removed all cache entry files"),
            Err(e) => tracing::warn!("Failed to remove cache entry files: {e}"),
        }
        self.ledger.clear();
    }

    /// Age-based eviction; returns the number of paths invalidated
    ///
    /// Every path last stored `max_file_age` or more ago is invalidated.
    /// Entry files no ledger path accounts for (left behind by an interrupted
    /// run or a lost ledger) are deleted as well. There is no internal timer;
    /// callers schedule this.
    pub fn maintenance(&mut self) -> usize {
        let expired = self.ledger.expired(self.config.max_file_age, Utc::now());
        for path in &expired {
            self.invalidate(path);
        }

        let orphans = self.sweep_orphans();
        tracing::debug!(
            expired = expired.len(),
            orphans,
            "Cache maintenance finished"
        );
        expired.len()
    }

    /// Every path recorded in the ledger, sorted
    #[must_use]
    pub fn cached_files(&self) -> Vec<PathBuf> {
        self.ledger.paths().into_iter().map(PathBuf::from).collect()
    }

    /// The subset of `paths` whose content no longer matches the ledger
    ///
    /// Paths never cached, or that cannot be fingerprinted, count as changed.
    /// Input order is preserved.
    #[must_use]
    pub fn changed_files<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<PathBuf> {
        paths
            .iter()
            .map(AsRef::as_ref)
            .filter(|path| match self.ledger.get(&path_string(path)) {
                Some(recorded) => !self
                    .fingerprinter
                    .matches_current(path, &recorded.fingerprint),
                None => true,
            })
            .map(Path::to_path_buf)
            .collect()
    }

    /// [`get`](Self::get) for several paths; misses are absent from the map
    pub fn get_multiple<I, P>(&mut self, paths: I) -> HashMap<PathBuf, T>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut found = HashMap::new();
        for path in paths {
            let path = path.as_ref();
            if let Some(data) = self.get(path) {
                found.insert(path.to_path_buf(), data);
            }
        }
        found
    }

    /// [`set`](Self::set) for several paths
    pub fn set_multiple<I, P>(&mut self, items: I)
    where
        I: IntoIterator<Item = (P, T)>,
        P: AsRef<Path>,
    {
        for (path, data) in items {
            self.set(path, data);
        }
    }

    /// Whether the memory tier currently holds an entry for `path`
    #[must_use]
    pub fn is_resident(&self, path: impl AsRef<Path>) -> bool {
        self.memory.contains(&CacheKey::for_path(path))
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let disk_entries = match self.disk.list_entry_files() {
            Ok(files) => files.len(),
            Err(e) => {
                tracing::warn!("Failed to list cache entry files: {e}");
                0
            }
        };
        CacheStats {
            memory_entries: self.memory.len(),
            disk_entries,
            total_files: self.ledger.len(),
            cache_dir: self.disk.dir().to_path_buf(),
        }
    }

    fn promote(&mut self, key: CacheKey, entry: CacheEntry<T>) {
        if let Some(evicted) = self.memory.insert(key, entry) {
            tracing::trace!(key = %evicted, "Evicted entry from memory tier");
        }
    }

    fn drop_from_memory(&mut self, key: &CacheKey) {
        match self.config.invalidation_scope {
            InvalidationScope::ClearAll => self.memory.clear(),
            InvalidationScope::KeyOnly => {
                self.memory.remove(key);
            }
        }
    }

    /// Remove the disk copy and ledger entry for `path`
    fn forget(&mut self, path: &Path, key: &CacheKey) {
        if let Err(e) = self.disk.remove(key) {
            tracing::warn!(path = %path.display(), "Failed to remove cache entry file: {e}");
        }
        self.ledger.remove(&path_string(path));
    }

    fn sweep_orphans(&self) -> usize {
        let keys = match self.disk.list_keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Failed to list cache entry files: {e}");
                return 0;
            }
        };
        let live: HashSet<CacheKey> = self
            .ledger
            .paths()
            .iter()
            .map(CacheKey::for_path)
            .collect();

        let mut removed = 0;
        for key in keys.iter().filter(|key| !live.contains(*key)) {
            match self.disk.remove(key) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(key = %key, "Failed to remove orphaned cache entry: {e}"),
            }
        }
        removed
    }
}

/// Whether `entry` may still be served for `path` at `now`
fn is_fresh<T>(
    fingerprinter: Fingerprinter,
    config: &CacheConfig,
    path: &Path,
    entry: &CacheEntry<T>,
    now: DateTime<Utc>,
) -> bool {
    !entry.is_expired(config.max_file_age, now)
        && fingerprinter.matches_current(path, &entry.fingerprint)
}
