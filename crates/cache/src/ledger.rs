//! Metadata ledger: the last fingerprint seen for every cached path
//!
//! Stored as `file-metadata.json` next to the entry files. The in-memory map
//! is authoritative for the life of the process; each mutation rewrites the
//! whole file, and a failed write only costs ledger state across restarts.

use crate::disk::{remove_if_exists, write_atomic};
use crate::entry::older_than;
use crate::fingerprint::Fingerprint;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the ledger file inside the cache namespace directory
pub const LEDGER_FILE: &str = "file-metadata.json";

/// What the ledger remembers about one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Fingerprint recorded when the path was last stored
    #[serde(flatten)]
    pub fingerprint: Fingerprint,
    /// When the path was last stored
    pub last_analyzed: DateTime<Utc>,
}

/// Durable path -> fingerprint mapping
#[derive(Debug)]
pub struct Ledger {
    file: PathBuf,
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    /// Load the ledger from `dir`
    ///
    /// Never fails: a missing or unreadable file gives an empty ledger, and an
    /// unparsable one is deleted so the next run starts clean.
    #[must_use]
    pub fn load(dir: &Path) -> Self {
        let file = dir.join(LEDGER_FILE);
        let entries = match fs::read(&file) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(file = %file.display(), "Discarding corrupt cache ledger: {e}");
                    if let Err(e) = remove_if_exists(&file) {
                        tracing::warn!("Failed to remove corrupt ledger: {e}");
                    }
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(file = %file.display(), "Cannot read cache ledger, starting empty: {e}");
                BTreeMap::new()
            }
        };
        tracing::debug!(file = %file.display(), entries = entries.len(), "Loaded cache ledger");
        Self { file, entries }
    }

    /// Location of the ledger file
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// The entry for `path`, if it was ever stored
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&LedgerEntry> {
        self.entries.get(path)
    }

    /// Record `fingerprint` for `path`, stamped `now`, and persist
    pub fn put(&mut self, path: String, fingerprint: Fingerprint, now: DateTime<Utc>) {
        self.entries.insert(
            path,
            LedgerEntry {
                fingerprint,
                last_analyzed: now,
            },
        );
        self.save();
    }

    /// Forget `path` and persist; returns whether it was present
    pub fn remove(&mut self, path: &str) -> bool {
        let removed = self.entries.remove(path).is_some();
        if removed {
            self.save();
        }
        removed
    }

    /// Forget everything and persist
    pub fn clear(&mut self) {
        self.entries.clear();
        self.save();
    }

    /// Every recorded path, sorted
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Paths last stored `max_age` or more before `now`
    #[must_use]
    pub fn expired(&self, max_age: Duration, now: DateTime<Utc>) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| older_than(entry.last_analyzed, max_age, now))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Number of recorded paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist, logging instead of failing
    pub fn save(&self) {
        if let Err(e) = self.persist() {
            tracing::warn!(file = %self.file.display(), "Failed to persist cache ledger: {e}");
        }
    }

    /// Serialize the whole mapping and overwrite the ledger file
    pub fn persist(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.entries)
            .map_err(|e| Error::serialization(format!("Failed to serialize ledger: {e}")))?;
        write_atomic(&self.file, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fingerprint(path: &str) -> Fingerprint {
        Fingerprint {
            path: path.to_string(),
            mtime: Utc::now(),
            size: 42,
            content_hash: "cd".repeat(32),
        }
    }

    #[test]
    fn load_missing_is_empty() {
        let temp = TempDir::new().unwrap();
        let ledger = Ledger::load(temp.path());
        assert!(ledger.is_empty());
        assert!(!ledger.file().exists());
    }

    #[test]
    fn put_persists_and_reloads() {
        let temp = TempDir::new().unwrap();
        let now = Utc::now();
        {
            let mut ledger = Ledger::load(temp.path());
            ledger.put("src/a.ts".to_string(), fingerprint("src/a.ts"), now);
        }

        let ledger = Ledger::load(temp.path());
        let entry = ledger.get("src/a.ts").unwrap();
        assert_eq!(entry.fingerprint.size, 42);
        assert_eq!(entry.last_analyzed, now);
    }

    #[test]
    fn file_is_a_flat_object_keyed_by_path() {
        let temp = TempDir::new().unwrap();
        let mut ledger = Ledger::load(temp.path());
        ledger.put("src/a.ts".to_string(), fingerprint("src/a.ts"), Utc::now());

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(temp.path().join(LEDGER_FILE)).unwrap()).unwrap();
        let entry = &raw["src/a.ts"];
        assert_eq!(entry["path"], "src/a.ts");
        assert_eq!(entry["size"], 42);
        assert!(entry["mtime"].is_string());
        assert!(entry["contentHash"].is_string());
        assert!(entry["lastAnalyzed"].is_string());
    }

    #[test]
    fn remove_persists() {
        let temp = TempDir::new().unwrap();
        let mut ledger = Ledger::load(temp.path());
        ledger.put("a".to_string(), fingerprint("a"), Utc::now());
        ledger.put("b".to_string(), fingerprint("b"), Utc::now());

        assert!(ledger.remove("a"));
        assert!(!ledger.remove("a"));

        let reloaded = Ledger::load(temp.path());
        assert_eq!(reloaded.paths(), vec!["b".to_string()]);
    }

    #[test]
    fn corrupt_file_is_discarded_and_deleted() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join(LEDGER_FILE);
        fs::write(&file, "{ not json").unwrap();

        let ledger = Ledger::load(temp.path());
        assert!(ledger.is_empty());
        assert!(!file.exists());
    }

    #[test]
    fn expired_uses_last_analyzed() {
        let temp = TempDir::new().unwrap();
        let mut ledger = Ledger::load(temp.path());
        let now = Utc::now();
        ledger.put("old".to_string(), fingerprint("old"), now - chrono::Duration::hours(2));
        ledger.put("new".to_string(), fingerprint("new"), now);

        let expired = ledger.expired(Duration::from_secs(3600), now);
        assert_eq!(expired, vec!["old".to_string()]);
    }

    #[test]
    fn persist_failure_keeps_memory_state() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();

        // The ledger directory is actually a file, so every persist fails
        let mut ledger = Ledger::load(&blocker);
        ledger.put("a".to_string(), fingerprint("a"), Utc::now());
        assert!(ledger.get("a").is_some());
        assert!(ledger.persist().is_err());
    }

    #[test]
    fn clear_empties_file() {
        let temp = TempDir::new().unwrap();
        let mut ledger = Ledger::load(temp.path());
        ledger.put("a".to_string(), fingerprint("a"), Utc::now());
        ledger.clear();

        assert!(Ledger::load(temp.path()).is_empty());
    }
}
