//! forge::token
//!
//! Bearer tokens for the GitHub API.
//!
//! [`EnvTokenProvider`] looks in order at `GITHUB_TOKEN`, `GH_TOKEN`, and
//! the output of `gh auth token`. The first value found is cached for the
//! rest of the process.

use std::process::Command;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use super::ForgeError;

/// Source of bearer tokens for forge requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token.
    ///
    /// # Errors
    ///
    /// - [`ForgeError::AuthRequired`] if no token is available
    async fn bearer_token(&self) -> Result<String, ForgeError>;
}

/// A fixed token, mostly for tests and GitHub Enterprise scripts.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken([redacted])")
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Result<String, ForgeError> {
        Ok(self.0.clone())
    }
}

/// Token from the environment or the GitHub CLI.
#[derive(Default)]
pub struct EnvTokenProvider {
    cache: RwLock<Option<String>>,
}

impl std::fmt::Debug for EnvTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.cache.read().map(|c| c.is_some()).unwrap_or(false);
        f.debug_struct("EnvTokenProvider")
            .field("cached", &cached)
            .finish()
    }
}

impl EnvTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a token without touching the cache.
    pub fn lookup() -> Option<String> {
        for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
            if let Some(token) = std::env::var(var).ok().filter(|t| !t.trim().is_empty()) {
                debug!("using GitHub token from ${var}");
                return Some(token.trim().to_string());
            }
        }
        Self::from_gh_cli()
    }

    fn from_gh_cli() -> Option<String> {
        debug!("$ gh auth token");
        let output = Command::new("gh").args(["auth", "token"]).output().ok()?;
        if !output.status.success() {
            return None;
        }
        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!token.is_empty()).then_some(token)
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn bearer_token(&self) -> Result<String, ForgeError> {
        if let Ok(cache) = self.cache.read() {
            if let Some(token) = cache.as_ref() {
                return Ok(token.clone());
            }
        }

        let token = Self::lookup().ok_or(ForgeError::AuthRequired)?;
        if let Ok(mut cache) = self.cache.write() {
            *cache = Some(token.clone());
        }
        Ok(token)
    }
}
