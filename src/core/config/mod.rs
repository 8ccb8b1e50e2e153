//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Two files configure a run:
//! - **User config**: personal settings (browser, editor, defaults)
//! - **Repository list**: the repositories to process, see [`repos`]
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. User config file
//! 3. CLI flags (not handled here)
//!
//! # User Config Locations
//!
//! Searched in order:
//! 1. `$MRA_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/multi-repo-automation.yaml`
//! 3. `<config dir>/multi-repo-automation.yaml`
//!
//! # Example
//!
//! ```no_run
//! use multirepo::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("Repositories: {}", config.repos_filename());
//! println!("Branch reuse: {}", config.branch_reuse());
//! ```

pub mod repos;
pub mod schema;

pub use repos::RepositoryDescriptor;
pub use schema::{BranchReuse, UserConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the user configuration.
pub const CONFIG_FILENAME: &str = "multi-repo-automation.yaml";

/// Default GitHub API base URL.
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Loaded user configuration.
///
/// This struct provides accessor methods that apply the defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub user: UserConfig,
    /// Path to the user config file (if loaded)
    path: Option<PathBuf>,
}

impl Config {
    /// Load the user configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    /// A missing config file is not an error (defaults are used).
    pub fn load() -> Result<Self, ConfigError> {
        let Some(path) = Self::find() else {
            return Ok(Self::default());
        };
        Self::load_from(&path)
    }

    /// Configuration that was not read from a file.
    pub fn from_user(user: UserConfig) -> Self {
        Self { user, path: None }
    }

    /// Load the user configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let user = Self::read_user_config(path)?;
        user.validate()?;
        Ok(Self {
            user,
            path: Some(path.to_path_buf()),
        })
    }

    /// First existing config file in lookup order.
    fn find() -> Option<PathBuf> {
        // 1. $MRA_CONFIG
        if let Ok(path) = std::env::var("MRA_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. $XDG_CONFIG_HOME
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join(CONFIG_FILENAME);
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Platform config directory
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .filter(|path| path.exists())
    }

    fn read_user_config(path: &Path) -> Result<UserConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        // An empty file is a null document.
        let config: Option<UserConfig> =
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(config.unwrap_or_default())
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Get the repository list file name.
    ///
    /// Defaults to "repos.yaml" if not configured.
    pub fn repos_filename(&self) -> &str {
        self.user.repos_filename.as_deref().unwrap_or("repos.yaml")
    }

    /// Get the browser command.
    ///
    /// Returns `None` when the system opener should be used.
    pub fn browser(&self) -> Option<&str> {
        self.user.browser.as_deref()
    }

    /// Get the editor command.
    ///
    /// Returns `None` when the system opener should be used.
    pub fn editor(&self) -> Option<&str> {
        self.user.editor.as_deref()
    }

    /// Get the branch reuse policy.
    ///
    /// Defaults to fast-forward if not configured.
    pub fn branch_reuse(&self) -> BranchReuse {
        self.user.branch_reuse.unwrap_or_default()
    }

    /// Get the GitHub API base URL, without trailing slash.
    pub fn github_api(&self) -> &str {
        self.user
            .github_api
            .as_deref()
            .unwrap_or(DEFAULT_GITHUB_API)
            .trim_end_matches('/')
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
