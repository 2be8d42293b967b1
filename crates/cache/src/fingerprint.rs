//! File fingerprints for change detection
//!
//! A fingerprint is a snapshot of a file's modification time, size and,
//! when hashing is enabled, a SHA-256 of its content. Comparisons always
//! look at mtime and size first; the content hash is only consulted (and,
//! for [`Fingerprinter::matches_current`], only computed) once those agree.

use crate::key::path_string;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Comparable snapshot of a file at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    /// Path the fingerprint was taken from
    pub path: String,
    /// Last modification time
    pub mtime: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
    /// Hex SHA-256 of the content, empty when hashing was disabled
    #[serde(default)]
    pub content_hash: String,
}

impl Fingerprint {
    /// Whether this fingerprint carries a content hash
    #[must_use]
    pub fn has_content_hash(&self) -> bool {
        !self.content_hash.is_empty()
    }
}

/// Takes and compares fingerprints under a fixed hashing policy
#[derive(Debug, Clone, Copy)]
pub struct Fingerprinter {
    hashing: bool,
}

impl Fingerprinter {
    /// Create a fingerprinter; `hashing` controls whether content hashes are
    /// computed and compared
    #[must_use]
    pub const fn new(hashing: bool) -> Self {
        Self { hashing }
    }

    /// Whether content hashing is enabled
    #[must_use]
    pub const fn hashing_enabled(&self) -> bool {
        self.hashing
    }

    /// Fingerprint `path` as it is right now
    ///
    /// Returns `None` when the path cannot be stat'ed or read, or is not a
    /// regular file. Callers treat that as "cannot establish freshness".
    #[must_use]
    pub fn compute(&self, path: &Path) -> Option<Fingerprint> {
        let (mtime, size) = stat(path)?;
        let content_hash = if self.hashing {
            hash_file(path)?
        } else {
            String::new()
        };
        Some(Fingerprint {
            path: path_string(path),
            mtime,
            size,
            content_hash,
        })
    }

    /// Whether two fingerprints describe the same file state
    #[must_use]
    pub fn equal(&self, a: &Fingerprint, b: &Fingerprint) -> bool {
        if a.mtime != b.mtime || a.size != b.size {
            return false;
        }
        if self.hashing && a.has_content_hash() && b.has_content_hash() {
            return a.content_hash == b.content_hash;
        }
        true
    }

    /// Whether the file at `path` still matches `stored`
    ///
    /// Equivalent to `equal(compute(path), stored)` but the file is only read
    /// when mtime and size already agree and `stored` carries a hash.
    #[must_use]
    pub fn matches_current(&self, path: &Path, stored: &Fingerprint) -> bool {
        let Some((mtime, size)) = stat(path) else {
            return false;
        };
        if mtime != stored.mtime || size != stored.size {
            return false;
        }
        if self.hashing && stored.has_content_hash() {
            return hash_file(path).is_some_and(|hash| hash == stored.content_hash);
        }
        true
    }
}

fn stat(path: &Path) -> Option<(DateTime<Utc>, u64)> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::trace!(path = %path.display(), "stat failed: {e}");
            return None;
        }
    };
    if !metadata.is_file() {
        return None;
    }
    let mtime = metadata.modified().ok()?;
    Some((DateTime::<Utc>::from(mtime), metadata.len()))
}

fn hash_file(path: &Path) -> Option<String> {
    let mut file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!(path = %path.display(), "cannot open file for hashing: {e}");
            return None;
        }
    };
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                tracing::debug!(path = %path.display(), "read failed while hashing: {e}");
                return None;
            }
        }
    }
    Some(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use tempfile::TempDir;

    fn fingerprint(mtime_secs: i64, size: u64, hash: &str) -> Fingerprint {
        Fingerprint {
            path: "f.ts".to_string(),
            mtime: DateTime::from_timestamp(mtime_secs, 0).unwrap(),
            size,
            content_hash: hash.to_string(),
        }
    }

    #[test]
    fn compute_missing_file_is_none() {
        let temp = TempDir::new().unwrap();
        let fp = Fingerprinter::new(true);
        assert!(fp.compute(&temp.path().join("nope.ts")).is_none());
    }

    #[test]
    fn compute_directory_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(Fingerprinter::new(false).compute(temp.path()).is_none());
    }

    #[test]
    fn compute_records_size_and_hash() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.ts");
        std::fs::write(&path, "export const a = 1;").unwrap();

        let hashed = Fingerprinter::new(true).compute(&path).unwrap();
        assert_eq!(hashed.size, 19);
        assert_eq!(hashed.content_hash.len(), 64);
        assert_eq!(hashed.path, path.to_string_lossy());

        let unhashed = Fingerprinter::new(false).compute(&path).unwrap();
        assert!(unhashed.content_hash.is_empty());
        assert_eq!(unhashed.mtime, hashed.mtime);
    }

    #[test]
    fn equal_compares_mtime_and_size_first() {
        let fp = Fingerprinter::new(true);
        assert!(fp.equal(&fingerprint(10, 5, "aa"), &fingerprint(10, 5, "aa")));
        assert!(!fp.equal(&fingerprint(10, 5, "aa"), &fingerprint(11, 5, "aa")));
        assert!(!fp.equal(&fingerprint(10, 5, "aa"), &fingerprint(10, 6, "aa")));
        assert!(!fp.equal(&fingerprint(10, 5, "aa"), &fingerprint(10, 5, "bb")));
    }

    #[test]
    fn equal_ignores_hash_when_one_side_is_empty_or_disabled() {
        let hashing = Fingerprinter::new(true);
        assert!(hashing.equal(&fingerprint(10, 5, ""), &fingerprint(10, 5, "bb")));

        let plain = Fingerprinter::new(false);
        assert!(plain.equal(&fingerprint(10, 5, "aa"), &fingerprint(10, 5, "bb")));
    }

    #[test]
    fn matches_current_detects_content_change_with_same_mtime_and_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.ts");
        std::fs::write(&path, "aaaa").unwrap();
        let pinned = FileTime::from_unix_time(1_700_000_000, 0);
        filetime::set_file_mtime(&path, pinned).unwrap();

        let fp = Fingerprinter::new(true);
        let stored = fp.compute(&path).unwrap();
        assert!(fp.matches_current(&path, &stored));

        std::fs::write(&path, "bbbb").unwrap();
        filetime::set_file_mtime(&path, pinned).unwrap();
        assert!(!fp.matches_current(&path, &stored));

        // Without hashing the same edit is invisible
        let plain = Fingerprinter::new(false);
        let stored_plain = Fingerprint {
            content_hash: String::new(),
            ..stored
        };
        assert!(plain.matches_current(&path, &stored_plain));
    }

    #[test]
    fn matches_current_detects_mtime_change() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.ts");
        std::fs::write(&path, "same").unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();

        let fp = Fingerprinter::new(false);
        let stored = fp.compute(&path).unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(1_700_000_100, 0)).unwrap();
        assert!(!fp.matches_current(&path, &stored));
    }

    #[test]
    fn matches_current_false_when_file_removed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.ts");
        std::fs::write(&path, "x").unwrap();
        let fp = Fingerprinter::new(true);
        let stored = fp.compute(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(!fp.matches_current(&path, &stored));
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_value(fingerprint(10, 5, "aa")).unwrap();
        assert_eq!(json["contentHash"], "aa");
        assert_eq!(json["size"], 5);
        assert!(json["mtime"].is_string());
    }
}
