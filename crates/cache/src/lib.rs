//! Change-aware two-tier file cache
//!
//! Caches values derived from files (parsed ASTs, analysis results) and keys
//! them by the file's path. Each entry remembers the fingerprint of the file
//! it came from, and a lookup only succeeds while the file still matches it:
//! - Fingerprints combine modification time, size and an optional SHA-256
//! - A bounded LRU memory tier sits in front of one JSON file per entry on disk
//! - A metadata ledger (`file-metadata.json`) records what has been analyzed
//!
//! # Overview
//!
//! ```no_run
//! use soul_cache::{CacheConfig, FileCache};
//!
//! let mut cache: FileCache<String> = FileCache::open(CacheConfig::new(".soul-cache"));
//! let parsed = match cache.get("src/main.ts") {
//!     Some(parsed) => parsed,
//!     None => {
//!         let parsed = String::from("expensive result");
//!         cache.set("src/main.ts", parsed.clone());
//!         parsed
//!     }
//! };
//! # let _ = parsed;
//! ```
//!
//! # Failure model
//!
//! The cache is best effort. Unreadable sources, corrupt entry files and
//! failed writes degrade to misses or memory-only entries and are logged
//! through `tracing`; only [`CacheConfig::load`] returns errors.

#![expect(
    clippy::missing_errors_doc,
    reason = "Errors are only surfaced by configuration loading and the disk helpers"
)]

mod codec;
mod config;
mod disk;
mod engine;
mod entry;
mod error;
mod fingerprint;
mod key;
mod ledger;
mod memory;
mod shared;

// Re-export error types at crate root
pub use error::{Error, Result};

pub use codec::{Codec, JsonCodec};
pub use config::{
    CacheConfig, DEFAULT_CACHE_DIR, DEFAULT_MAX_FILE_AGE, DEFAULT_MAX_MEMORY_ENTRIES,
    DEFAULT_NAMESPACE, InvalidationScope, validate_namespace,
};
pub use disk::{DiskRead, DiskStore};
pub use engine::{CacheStats, FileCache};
pub use entry::CacheEntry;
pub use fingerprint::{Fingerprint, Fingerprinter};
pub use key::CacheKey;
pub use ledger::{LEDGER_FILE, Ledger, LedgerEntry};
pub use memory::MemoryStore;
pub use shared::SharedFileCache;
