use crate::tracing::LogLevel;
use clap::{Parser, Subcommand};
use miette::Diagnostic;
use soul_cache::DEFAULT_CACHE_DIR;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Failure while talking to the cache directory or writing output
pub const EXIT_CACHE: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(soul_cache::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Anything else (exit code 3)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(soul_cache::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new unexpected error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    /// Process exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => EXIT_CLI,
            Self::Other { .. } => EXIT_CACHE,
        }
    }
}

impl From<soul_cache::Error> for CliError {
    // Library errors only surface while resolving the configuration
    fn from(error: soul_cache::Error) -> Self {
        match error {
            soul_cache::Error::Configuration { .. } | soul_cache::Error::Serialization { .. } => {
                Self::config_with_help(
                    error.to_string(),
                    "Config files are TOML or JSON with camelCase keys such as cacheDir and \
                     maxFileAge; namespaces are single directory names",
                )
            }
            soul_cache::Error::Io { .. } => Self::config(error.to_string()),
        }
    }
}

/// Inspect and maintain a soul-cache directory
#[derive(Parser, Debug)]
#[command(name = "soul-cache")]
#[command(about = "Inspect and maintain change-aware file caches")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// Operation to run
    #[command(subcommand)]
    pub command: Commands,

    /// Root cache directory; overrides the config file
    #[arg(
        long,
        global = true,
        env = "SOUL_CACHE_DIR",
        help = "Root cache directory [default: .soul-cache]"
    )]
    pub cache_dir: Option<PathBuf>,

    /// Namespace subdirectory under the cache directory
    #[arg(long, short = 'n', global = true, help = "Cache namespace")]
    pub namespace: Option<String>,

    /// TOML or JSON settings file, applied before the other flags
    #[arg(long, short = 'c', global = true, help = "Load settings from a TOML or JSON file")]
    pub config: Option<PathBuf>,

    /// Maximum entry age in milliseconds
    #[arg(long, global = true, help = "Maximum entry age in milliseconds")]
    pub max_age_ms: Option<u64>,

    /// Skip content hashing when checking freshness
    #[arg(long, global = true, help = "Compare files by mtime and size only")]
    pub no_hashing: bool,

    /// Minimum level for log output on stderr
    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Filter directive for log output, taking precedence over `RUST_LOG` and `--level`
    #[arg(
        long,
        global = true,
        value_name = "DIRECTIVE",
        help = "Log filter directive, e.g. soul_cache=trace (overrides RUST_LOG and --level)"
    )]
    pub log_filter: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true, help = "Output logs in JSON format")]
    pub json: bool,
}

/// Cache operations exposed on the command line
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Print cache counters as JSON
    #[command(about = "Print cache counters as JSON")]
    Stats,
    /// List every cached file path
    #[command(about = "List every cached file path")]
    List,
    /// Report which of the given paths changed since they were cached
    #[command(about = "Print the given paths whose content no longer matches the cache")]
    Changed {
        /// Files to check
        #[arg(required = true, help = "Files to check")]
        paths: Vec<PathBuf>,
    },
    /// Evict entries past the maximum age
    #[command(about = "Evict entries older than the maximum age and print how many")]
    Maintenance,
    /// Drop one entry or every entry matching a pattern
    #[command(about = "Invalidate one file, or every file matching a pattern")]
    Invalidate {
        /// File whose entry should be dropped
        #[arg(
            required_unless_present = "pattern",
            conflicts_with = "pattern",
            help = "File whose entry should be dropped"
        )]
        path: Option<PathBuf>,
        /// Regular expression matched against cached paths
        #[arg(long, short = 'p', help = "Regular expression matched against cached paths")]
        pattern: Option<String>,
    },
    /// Drop every entry in the namespace
    #[command(about = "Drop every entry in the namespace")]
    Clear,
}

impl Cli {
    /// Cache directory used when neither a flag nor a config file names one
    #[must_use]
    pub fn default_cache_dir() -> PathBuf {
        PathBuf::from(DEFAULT_CACHE_DIR)
    }
}

/// Parse the process arguments, exiting with usage on error
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
