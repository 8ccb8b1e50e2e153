//! cli::commands
//!
//! What `mra` does once its arguments are parsed.
//!
//! - [`apply`]: run the command in every repository (the default)
//! - [`plan`]: `--dry-run`, print what [`apply`] would do
//! - [`completion`]: `--completions`, print a completion script

mod apply;
mod completion;
mod plan;

pub use apply::{apply, resolve_mode, run_command};
pub use completion::completion;
pub use plan::{plan, plan_lines};
