//! Command implementations
//!
//! Each command opens the cache described by the global flags, performs one
//! operation and returns the text to print on stdout.

use crate::cli::{Cli, CliError, Commands};
use regex::Regex;
use soul_cache::{CacheConfig, FileCache};
use std::path::PathBuf;
use std::time::Duration;

/// Payloads are opaque to the CLI
pub type JsonCache = FileCache<serde_json::Value>;

/// Resolve the cache configuration: config file first, then flags
pub fn resolve_config(cli: &Cli) -> Result<CacheConfig, CliError> {
    let mut config = match &cli.config {
        Some(file) => CacheConfig::load(file)?,
        None => CacheConfig::new(
            cli.cache_dir
                .clone()
                .unwrap_or_else(Cli::default_cache_dir),
        ),
    };

    if let Some(dir) = &cli.cache_dir {
        config.cache_dir.clone_from(dir);
    }
    if let Some(namespace) = &cli.namespace {
        config.namespace.clone_from(namespace);
    }
    config.validate()?;
    if let Some(ms) = cli.max_age_ms {
        config.max_file_age = Duration::from_millis(ms);
    }
    if cli.no_hashing {
        config.enable_file_hashing = false;
    }

    tracing::debug!(
        dir = %config.storage_dir().display(),
        max_age_ms = config.max_file_age.as_millis(),
        hashing = config.enable_file_hashing,
        "Resolved cache configuration"
    );
    Ok(config)
}

/// Run the parsed command and return its stdout text
pub fn execute(cli: &Cli) -> Result<String, CliError> {
    let config = resolve_config(cli)?;
    let mut cache = JsonCache::open(config);
    run(&mut cache, &cli.command)
}

/// Run one command against an open cache
pub fn run(cache: &mut JsonCache, command: &Commands) -> Result<String, CliError> {
    match command {
        Commands::Stats => serde_json::to_string_pretty(&cache.stats())
            .map_err(|e| CliError::other(format!("Failed to render stats: {e}"))),
        Commands::List => Ok(lines(&cache.cached_files())),
        Commands::Changed { paths } => Ok(lines(&cache.changed_files(paths.as_slice()))),
        Commands::Maintenance => {
            let removed = cache.maintenance();
            tracing::info!(removed, "Maintenance finished");
            Ok(removed.to_string())
        }
        Commands::Invalidate {
            path: Some(path), ..
        } => {
            cache.invalidate(path);
            Ok(format!("Invalidated {}", path.display()))
        }
        Commands::Invalidate {
            pattern: Some(pattern),
            ..
        } => {
            let regex = Regex::new(pattern).map_err(|e| {
                CliError::config_with_help(
                    format!("Invalid pattern '{pattern}': {e}"),
                    "Patterns use Rust regex syntax and are matched against cached paths",
                )
            })?;
            Ok(cache.invalidate_pattern(&regex).to_string())
        }
        Commands::Invalidate { .. } => Err(CliError::config(
            "invalidate needs a path or --pattern",
        )),
        Commands::Clear => {
            let dir = cache.config().storage_dir();
            cache.clear();
            Ok(format!("Cleared {}", dir.display()))
        }
    }
}

fn lines(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::EXIT_CLI;
    use clap::Parser;
    use std::path::Path;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("soul-cache").chain(args.iter().copied())).unwrap()
    }

    fn seeded(temp: &TempDir) -> (JsonCache, PathBuf, PathBuf) {
        let a = temp.path().join("src/a.ts");
        let b = temp.path().join("lib/b.ts");
        std::fs::create_dir_all(a.parent().unwrap()).unwrap();
        std::fs::create_dir_all(b.parent().unwrap()).unwrap();
        std::fs::write(&a, "a").unwrap();
        std::fs::write(&b, "b").unwrap();

        let mut cache = JsonCache::open(CacheConfig::new(temp.path().join("cache")));
        cache.set(&a, serde_json::json!({"exports": ["a"]}));
        cache.set(&b, serde_json::json!({"exports": ["b"]}));
        (cache, a, b)
    }

    fn dir_arg(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_resolve_config_defaults() {
        let config = resolve_config(&cli(&["--cache-dir", "/tmp/soul", "stats"])).unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/soul"));
        assert_eq!(config.namespace, soul_cache::DEFAULT_NAMESPACE);
        assert!(config.enable_file_hashing);
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("cache.toml");
        std::fs::write(
            &file,
            "cacheDir = \"/from/file\"\nnamespace = \"file-ns\"\nmaxFileAge = 1000\n",
        )
        .unwrap();
        let file_arg = dir_arg(&file);

        let from_file = resolve_config(&cli(&["--config", &file_arg, "stats"])).unwrap();
        assert_eq!(from_file.cache_dir, PathBuf::from("/from/file"));
        assert_eq!(from_file.namespace, "file-ns");
        assert_eq!(from_file.max_file_age, Duration::from_millis(1000));

        let overridden = resolve_config(&cli(&[
            "--config",
            &file_arg,
            "--namespace",
            "flag-ns",
            "--max-age-ms",
            "5",
            "--no-hashing",
            "stats",
        ]))
        .unwrap();
        assert_eq!(overridden.cache_dir, PathBuf::from("/from/file"));
        assert_eq!(overridden.namespace, "flag-ns");
        assert_eq!(overridden.max_file_age, Duration::from_millis(5));
        assert!(!overridden.enable_file_hashing);
    }

    #[test]
    fn test_bad_config_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("cache.ini");
        std::fs::write(&file, "cacheDir=x").unwrap();

        let err = resolve_config(&cli(&["--config", &dir_arg(&file), "stats"])).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }

    #[test]
    fn test_namespace_must_be_a_single_component() {
        for ns in ["../escape", "..", "/etc"] {
            let err = resolve_config(&cli(&["--namespace", ns, "stats"])).unwrap_err();
            assert!(matches!(err, CliError::Config { .. }), "{ns}");
        }
    }

    #[test]
    fn test_config_file_namespace_cannot_escape_cache_dir() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("cache.toml");
        std::fs::write(&file, "cacheDir = \"/from/file\"\nnamespace = \"/etc\"\n").unwrap();

        let err = resolve_config(&cli(&["--config", &dir_arg(&file), "clear"])).unwrap_err();
        assert!(matches!(err, CliError::Config { help: Some(_), .. }));
        assert_eq!(err.exit_code(), EXIT_CLI);
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("absent.toml");

        let err = resolve_config(&cli(&["--config", &dir_arg(&file), "stats"])).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }

    #[test]
    fn test_stats_is_json() {
        let temp = TempDir::new().unwrap();
        let (mut cache, _, _) = seeded(&temp);

        let out = run(&mut cache, &Commands::Stats).unwrap();
        let stats: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(stats["totalFiles"], 2);
        assert_eq!(stats["diskEntries"], 2);
    }

    #[test]
    fn test_list_and_changed() {
        let temp = TempDir::new().unwrap();
        let (mut cache, a, b) = seeded(&temp);

        let listed = run(&mut cache, &Commands::List).unwrap();
        assert_eq!(listed.lines().count(), 2);

        std::fs::write(&b, "b changed").unwrap();
        let changed = run(
            &mut cache,
            &Commands::Changed {
                paths: vec![a, b.clone()],
            },
        )
        .unwrap();
        assert_eq!(changed, b.display().to_string());
    }

    #[test]
    fn test_invalidate_by_path_and_pattern() {
        let temp = TempDir::new().unwrap();
        let (mut cache, a, b) = seeded(&temp);

        let out = run(
            &mut cache,
            &Commands::Invalidate {
                path: Some(a.clone()),
                pattern: None,
            },
        )
        .unwrap();
        assert!(out.starts_with("Invalidated"));
        assert_eq!(cache.cached_files(), vec![b]);

        let count = run(
            &mut cache,
            &Commands::Invalidate {
                path: None,
                pattern: Some(r"/lib/".to_string()),
            },
        )
        .unwrap();
        assert_eq!(count, "1");
        assert!(cache.cached_files().is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let temp = TempDir::new().unwrap();
        let (mut cache, _, _) = seeded(&temp);

        let err = run(
            &mut cache,
            &Commands::Invalidate {
                path: None,
                pattern: Some("(unclosed".to_string()),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(cache.cached_files().len(), 2);
    }

    #[test]
    fn test_maintenance_and_clear() {
        let temp = TempDir::new().unwrap();
        let (mut cache, _, _) = seeded(&temp);

        assert_eq!(run(&mut cache, &Commands::Maintenance).unwrap(), "0");

        let out = run(&mut cache, &Commands::Clear).unwrap();
        assert!(out.starts_with("Cleared"));
        assert!(cache.cached_files().is_empty());
        assert_eq!(cache.stats().disk_entries, 0);
    }

    #[test]
    fn test_execute_against_directory() {
        let temp = TempDir::new().unwrap();
        drop(seeded(&temp));
        let cache_dir = dir_arg(&temp.path().join("cache"));

        let listed = execute(&cli(&["--cache-dir", &cache_dir, "list"])).unwrap();
        assert_eq!(listed.lines().count(), 2);

        let removed =
            execute(&cli(&["--cache-dir", &cache_dir, "--max-age-ms", "0", "maintenance"]))
                .unwrap();
        assert_eq!(removed, "2");
    }
}
