//! Errors raised inside the cache
//!
//! Most cache operations never surface these: a failed read is a miss and a
//! failed write is logged and dropped. They travel between the disk store,
//! the ledger and the engine, and are returned from configuration loading.

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Failure while touching the cache directory or decoding its files
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error while touching the cache directory or a source file
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(soul_cache::io),
        help("Check file permissions and available disk space")
    )]
    Io {
        /// Source error from the filesystem
        #[source]
        source: std::io::Error,
        /// File or directory involved, when known
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write", "rename")
        operation: String,
    },

    /// Encoding or decoding of a cache entry, the ledger or a config file failed
    #[error("Cache serialization failed: {message}")]
    #[diagnostic(code(soul_cache::serialization))]
    Serialization {
        /// Decoder or encoder message
        message: String,
    },

    /// A configuration file could not be understood
    #[error("Invalid cache configuration: {message}")]
    #[diagnostic(code(soul_cache::config))]
    Configuration {
        /// What was wrong
        message: String,
    },
}

impl Error {
    /// Wrap an I/O error with the path and operation it came from
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Shorthand for [`Error::Serialization`]
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Shorthand for [`Error::Configuration`]
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Whether the error is an I/O "not found", which callers treat as absence
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
