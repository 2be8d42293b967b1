// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

//! `soul-cache` binary entry point

use miette::Report;
use soul_cache_cli::tracing::{self, TracingConfig};
use soul_cache_cli::{CliError, EXIT_CLI, EXIT_OK, cli, execute};
use std::io::{self, Write};

fn main() {
    let cli = cli::parse();

    if let Err(e) = tracing::init_tracing(TracingConfig::from(&cli)) {
        eprintln!("{e:?}");
        std::process::exit(EXIT_CLI);
    }

    let code = match execute(&cli).and_then(|output| print_output(&output)) {
        Ok(()) => EXIT_OK,
        Err(error) => {
            let code = error.exit_code();
            eprintln!("{:?}", Report::new(error));
            code
        }
    };
    std::process::exit(code);
}

fn print_output(output: &str) -> Result<(), CliError> {
    if output.is_empty() {
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}")
        .and_then(|()| stdout.flush())
        .map_err(|e| CliError::other(format!("Failed to write output: {e}")))
}
