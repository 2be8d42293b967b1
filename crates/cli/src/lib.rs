//! soul-cache CLI
//!
//! Inspection and maintenance front-end for cache directories written by
//! [`soul_cache`]. The library itself never schedules maintenance; this
//! binary is what a cron job or CI step calls to do it.

/// CLI argument parsing and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Tracing and logging configuration.
pub mod tracing;

pub use cli::{Cli, CliError, Commands, EXIT_CACHE, EXIT_CLI, EXIT_OK};
pub use commands::{execute, resolve_config, run};
