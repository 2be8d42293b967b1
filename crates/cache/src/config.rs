//! Cache configuration
//!
//! The cache never picks a directory on its own: callers hand it a resolved
//! `cache_dir`. Everything else has a default and can be overridden either
//! through the `with_*` builders or by loading a TOML/JSON file.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Conventional directory name for front-ends that need a default
pub const DEFAULT_CACHE_DIR: &str = ".soul-cache";

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default capacity of the in-memory tier
pub const DEFAULT_MAX_MEMORY_ENTRIES: usize = 100;

/// Default entry lifetime (24 hours)
pub const DEFAULT_MAX_FILE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// How much of the memory tier is dropped when one file goes stale or is invalidated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvalidationScope {
    /// Wipe the whole memory tier; disk entries are untouched
    #[default]
    ClearAll,
    /// Drop only the affected key
    KeyOnly,
}

/// Configuration for a [`FileCache`](crate::FileCache)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Root cache directory
    pub cache_dir: PathBuf,
    /// Subdirectory of `cache_dir` holding this cache's ledger and entries
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Capacity of the in-memory tier; 0 disables it
    #[serde(default = "default_max_memory_entries")]
    pub max_memory_entries: usize,
    /// Entries older than this are treated as expired
    #[serde(default = "default_max_file_age", with = "duration_millis")]
    pub max_file_age: Duration,
    /// Include a content hash in fingerprints
    #[serde(default = "default_true")]
    pub enable_file_hashing: bool,
    /// Memory-tier invalidation granularity
    #[serde(default)]
    pub invalidation_scope: InvalidationScope,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

const fn default_max_memory_entries() -> usize {
    DEFAULT_MAX_MEMORY_ENTRIES
}

const fn default_max_file_age() -> Duration {
    DEFAULT_MAX_FILE_AGE
}

const fn default_true() -> bool {
    true
}

impl CacheConfig {
    /// Create a configuration rooted at `cache_dir` with default settings
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            namespace: default_namespace(),
            max_memory_entries: DEFAULT_MAX_MEMORY_ENTRIES,
            max_file_age: DEFAULT_MAX_FILE_AGE,
            enable_file_hashing: true,
            invalidation_scope: InvalidationScope::default(),
        }
    }

    /// Set the namespace subdirectory
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the memory-tier capacity
    #[must_use]
    pub fn with_max_memory_entries(mut self, entries: usize) -> Self {
        self.max_memory_entries = entries;
        self
    }

    /// Set the entry lifetime
    #[must_use]
    pub fn with_max_file_age(mut self, age: Duration) -> Self {
        self.max_file_age = age;
        self
    }

    /// Enable or disable content hashing in fingerprints
    #[must_use]
    pub fn with_file_hashing(mut self, enabled: bool) -> Self {
        self.enable_file_hashing = enabled;
        self
    }

    /// Set the memory-tier invalidation granularity
    #[must_use]
    pub fn with_invalidation_scope(mut self, scope: InvalidationScope) -> Self {
        self.invalidation_scope = scope;
        self
    }

    /// Directory holding the ledger and entry files
    ///
    /// Always a direct child of `cache_dir`: a namespace that is not a single
    /// plain directory name is replaced by [`DEFAULT_NAMESPACE`].
    #[must_use]
    pub fn storage_dir(&self) -> PathBuf {
        if validate_namespace(&self.namespace).is_ok() {
            self.cache_dir.join(&self.namespace)
        } else {
            self.cache_dir.join(DEFAULT_NAMESPACE)
        }
    }

    /// Check the settings that can be wrong
    pub fn validate(&self) -> Result<()> {
        validate_namespace(&self.namespace)
    }

    /// Load a configuration file; the format is picked from the extension
    /// (`.toml` or `.json`)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(Error::configuration(format!(
                "unsupported config format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::serialization(format!("Failed to parse TOML config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| Error::serialization(format!("Failed to parse JSON config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

/// Accept only a single plain directory name (no separators, `.`, `..` or roots)
pub fn validate_namespace(namespace: &str) -> Result<()> {
    let mut components = Path::new(namespace).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !namespace.contains(['/', '\\']) => Ok(()),
        _ => Err(Error::configuration(format!(
            "invalid namespace '{namespace}': must be a single directory name"
        ))),
    }
}

/// Durations are written as whole milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
