//! forge::traits
//!
//! Forge trait definition for interacting with remote hosting services.
//!
//! # Design
//!
//! The `Forge` trait is async because forge operations involve network I/O.
//! One forge instance serves every repository of a run, so each method takes
//! the repository it acts on.
//!
//! A forge failure never undoes local work: by the time a pull request is
//! requested the branch has already been pushed.
//!
//! # Example
//!
//! ```no_run
//! use multirepo::core::types::RepoSlug;
//! use multirepo::forge::{CreatePrRequest, Forge, ForgeError};
//!
//! async fn open(forge: &dyn Forge) -> Result<(), ForgeError> {
//!     let repo = RepoSlug::new("camptocamp/tilecloud").unwrap();
//!     let request = CreatePrRequest {
//!         head: "update-ci".to_string(),
//!         base: "master".to_string(),
//!         title: "Update the CI".to_string(),
//!         body: None,
//!         draft: false,
//!         labels: vec!["chore".to_string()],
//!     };
//!     let pr = forge.create_pr(&repo, request).await?;
//!     println!("Created PR #{}: {}", pr.number, pr.url);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::RepoSlug;

/// Errors from forge operations.
///
/// These error types map to common failure modes when interacting
/// with remote hosting services like GitHub.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required: set GITHUB_TOKEN or log in with 'gh auth login'")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Request to create a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePrRequest {
    /// Head branch name (the branch with changes)
    pub head: String,
    /// Base branch name (the branch to merge into)
    pub base: String,
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: Option<String>,
    /// Create as draft
    pub draft: bool,
    /// Labels added once the pull request exists
    pub labels: Vec<String>,
}

/// Pull request information returned from the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR URL (web URL for viewing)
    pub url: String,
    /// PR state (open, closed, merged)
    pub state: PrState,
    /// Whether the PR is a draft
    pub is_draft: bool,
    /// Head branch name
    pub head: String,
    /// Base branch name
    pub base: String,
    /// PR title
    pub title: String,
}

/// PR state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrState {
    /// PR is open and awaiting review/merge
    Open,
    /// PR is closed without being merged
    Closed,
    /// PR has been merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
            PrState::Merged => write!(f, "merged"),
        }
    }
}

/// The Forge trait for interacting with remote hosting services.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `AuthRequired` / `AuthFailed`: Prompt user to authenticate
/// - `NotFound`: Resource doesn't exist
/// - `RateLimited`: Back off and retry
/// - `ApiError`: Display error message to user
/// - `NetworkError`: Check connectivity
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Create a new pull request.
    ///
    /// Labels are best effort: a pull request that could not be labeled is
    /// still returned.
    ///
    /// # Errors
    ///
    /// - `AuthRequired` if no authentication is configured
    /// - `AuthFailed` if the token is invalid or lacks permissions
    /// - `ApiError` with status 422 if validation fails (e.g., head doesn't exist)
    async fn create_pr(
        &self,
        repo: &RepoSlug,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError>;

    /// Find an open pull request by head branch.
    ///
    /// Used to reuse an existing PR instead of creating a duplicate.
    async fn find_pr_by_head(
        &self,
        repo: &RepoSlug,
        head: &str,
    ) -> Result<Option<PullRequest>, ForgeError>;
}
