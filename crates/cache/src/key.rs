//! Cache key derivation
//!
//! A key is the lowercase hex SHA-256 of the path string. It addresses the
//! entry in the memory tier and names the entry file on disk, so it must not
//! depend on anything but the path.

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Deterministic address of a cached file (SHA-256 of its path as hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a path
    #[must_use]
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        let digest = Sha256::digest(path_string(path.as_ref()).as_bytes());
        Self(hex::encode(digest))
    }

    /// Rebuild a key from a file stem found on disk
    ///
    /// Returns `None` unless the stem is exactly 64 lowercase hex characters.
    #[must_use]
    pub fn from_hex(stem: &str) -> Option<Self> {
        let valid = stem.len() == 64
            && stem
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then(|| Self(stem.to_string()))
    }

    /// Get the hex representation
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The string form used for keys, ledger entries and pattern matching
pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
