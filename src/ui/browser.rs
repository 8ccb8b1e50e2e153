//! ui::browser
//!
//! Opening pull request links, and files in the configured editor.

use std::io;
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::debug;

/// Where to open links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Browser {
    /// The platform opener (`xdg-open`, `open`, `start`).
    System,
    /// A command run as `<command> <url>`.
    Command(String),
    /// Links are only printed.
    Disabled,
}

impl Browser {
    /// Browser from the `--browser` / `--no-browser` flags and the
    /// configured command.
    pub fn from_settings(flag: Option<&str>, disabled: bool, configured: Option<&str>) -> Self {
        if disabled {
            return Browser::Disabled;
        }
        match flag.or(configured) {
            Some(command) => Browser::Command(command.to_string()),
            None => Browser::System,
        }
    }

    pub fn open(&self, url: &str) -> Result<()> {
        match self {
            Browser::Disabled => Ok(()),
            Browser::System => {
                debug!("opening {url}");
                open::that(url).with_context(|| format!("failed to open {url}"))
            }
            Browser::Command(command) => {
                debug!("$ {command} {url}");
                let status = Command::new(command)
                    .arg(url)
                    .status()
                    .map_err(|e| spawn_error(command, e))?;
                if !status.success() {
                    bail!("'{command} {url}' failed ({status})");
                }
                Ok(())
            }
        }
    }
}

fn spawn_error(command: &str, error: io::Error) -> anyhow::Error {
    anyhow::Error::new(error).context(format!("failed to run '{command}'"))
}
