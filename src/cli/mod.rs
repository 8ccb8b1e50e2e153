//! cli
//!
//! Command-line interface layer for `mra`.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments
//! - Install logging
//! - Delegate to the command handlers and map their result to an exit code
//!
//! # Exit codes
//!
//! - `0`: every repository was processed
//! - `1`: at least one repository failed
//! - `2`: invalid configuration or arguments, nothing was processed

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::core::config::ConfigError;
use crate::core::types::TypeError;
use crate::ui::output;

/// Exit code when a repository failed.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for configuration errors.
pub const EXIT_CONFIG: u8 = 2;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> ExitCode {
    let cli = Cli::parse_args();

    if let Some(shell) = cli.completions {
        commands::completion(shell, &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

    init_logging(cli.debug, cli.quiet);

    match commands::apply(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_FAILURE),
        Err(e) => {
            output::error(format!("{e:#}"));
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Exit code for an error returned before or instead of a run.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    if error.is::<ConfigError>() || error.is::<TypeError>() {
        EXIT_CONFIG
    } else {
        EXIT_FAILURE
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins; otherwise `--debug` selects debug, `--quiet` warn and
/// the default is info.
fn init_logging(debug: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug {
            "multirepo=debug"
        } else if quiet {
            "multirepo=warn"
        } else {
            "multirepo=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
