//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Results go to stdout and problems to stderr. Quiet mode keeps errors
//! and the pull request links only.

use std::fmt::Display;

use crate::core::types::RepoSlug;
use crate::workflow::RunReport;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print the line framing the output of one repository.
pub fn banner(repo: &RepoSlug, verbosity: Verbosity) {
    print(format_banner(repo), verbosity);
}

pub fn format_banner(repo: &RepoSlug) -> String {
    format!("=== {} ===", repo)
}

/// Print the end-of-run summary.
///
/// The pull request links are printed even in quiet mode.
pub fn summary(report: &RunReport, verbosity: Verbosity) {
    for line in format_summary(report) {
        if line.starts_with("https://") || line.starts_with("http://") {
            println!("{}", line);
        } else {
            print(line, verbosity);
        }
    }
    for failed in report.failures() {
        error(format!("{}: failed", failed.repo));
    }
}

/// Summary lines: the pull request count, then the links.
pub fn format_summary(report: &RunReport) -> Vec<String> {
    let urls = report.pull_request_urls();
    let mut lines = vec![format!(
        "{} pull request{} created",
        urls.len(),
        if urls.len() == 1 { "" } else { "s" }
    )];
    lines.extend(urls.into_iter().map(String::from));
    lines
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}
