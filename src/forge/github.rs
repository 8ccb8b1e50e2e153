//! forge::github
//!
//! GitHub forge implementation using the REST API.
//!
//! # Authentication
//!
//! Requests carry a bearer token from a [`TokenProvider`]; the default
//! provider reads `GITHUB_TOKEN`, `GH_TOKEN`, then `gh auth token`.
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation:
//! - Returns `ForgeError::RateLimited` when limits are hit
//! - Does not implement automatic retry for rate limits (caller's responsibility)
//!
//! # Example
//!
//! ```no_run
//! use multirepo::core::types::RepoSlug;
//! use multirepo::forge::github::GitHubForge;
//! use multirepo::forge::{EnvTokenProvider, Forge};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let forge = GitHubForge::new(Arc::new(EnvTokenProvider::new()));
//! let repo = RepoSlug::new("camptocamp/tilecloud").unwrap();
//! if let Some(pr) = forge.find_pr_by_head(&repo, "update-ci").await.unwrap() {
//!     println!("already open: {}", pr.url);
//! }
//! # });
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::token::TokenProvider;
use super::traits::{CreatePrRequest, Forge, ForgeError, PrState, PullRequest};
use crate::core::config::DEFAULT_GITHUB_API;
use crate::core::types::RepoSlug;

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("multirepo/", env!("CARGO_PKG_VERSION"));

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Token source, asked once per request
    token_provider: Arc<dyn TokenProvider>,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl GitHubForge {
    /// Create a GitHub forge talking to `api.github.com`.
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self::with_api_base(provider, DEFAULT_GITHUB_API)
    }

    /// Create a GitHub forge with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise installations
    /// (e.g., `https://github.example.com/api/v3`) and for tests.
    pub fn with_api_base(provider: Arc<dyn TokenProvider>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token_provider: provider,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    async fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let token = self.token_provider.bearer_token().await?;
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, repo: &RepoSlug, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base,
            repo.owner(),
            repo.repo(),
            path
        )
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
    ) -> Result<T, ForgeError> {
        // Read headers before the body consumes the response.
        let headers = response.headers();
        let rate_limited = headers
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");
        let required_scopes = headers
            .get("X-Accepted-OAuth-Scopes")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let granted_scopes = headers
            .get("X-OAuth-Scopes")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.describe(),
            Err(_) => "Unknown error".to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if rate_limited => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => {
                let mut err_msg = format!("Permission denied: {}", message);
                if let Some(scopes) = required_scopes.filter(|s| !s.is_empty()) {
                    err_msg.push_str(&format!(" [required scopes: {}]", scopes));
                    if let Some(granted) = granted_scopes {
                        err_msg.push_str(&format!(" [granted: {}]", granted));
                    }
                }
                ForgeError::AuthFailed(err_msg)
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

impl GitHubForge {
    /// Add labels to a pull request, through its issue.
    async fn add_labels(
        &self,
        repo: &RepoSlug,
        number: u64,
        labels: &[String],
    ) -> Result<(), ForgeError> {
        let url = self.repo_url(repo, &format!("issues/{number}/labels"));
        debug!("POST {url} {labels:?}");

        let response = self
            .client
            .post(&url)
            .headers(self.headers().await?)
            .json(&LabelsBody { labels })
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let _: Vec<serde_json::Value> = self.handle_response(response).await?;
        Ok(())
    }
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn create_pr(
        &self,
        repo: &RepoSlug,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        let url = self.repo_url(repo, "pulls");
        debug!("POST {url} ({} -> {})", request.head, request.base);

        let body = CreatePrBody {
            head: &request.head,
            base: &request.base,
            title: &request.title,
            body: request.body.as_deref(),
            draft: request.draft,
        };

        let response = self
            .client
            .post(&url)
            .headers(self.headers().await?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let pr: PullRequest = self.handle_response::<GitHubPullRequest>(response).await?.into();
        if !request.labels.is_empty() {
            if let Err(e) = self.add_labels(repo, pr.number, &request.labels).await {
                warn!("could not label {}: {e}", pr.url);
            }
        }
        Ok(pr)
    }

    async fn find_pr_by_head(
        &self,
        repo: &RepoSlug,
        head: &str,
    ) -> Result<Option<PullRequest>, ForgeError> {
        // GitHub API requires owner:branch format
        let head_param = if head.contains(':') {
            head.to_string()
        } else {
            format!("{}:{}", repo.owner(), head)
        };

        let url = self.repo_url(repo, "pulls");
        debug!("GET {url}?head={head_param}");

        let response = self
            .client
            .get(&url)
            .query(&[("head", head_param.as_str()), ("state", "open")])
            .headers(self.headers().await?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let prs: Vec<GitHubPullRequest> = self.handle_response(response).await?;
        Ok(prs.into_iter().next().map(Into::into))
    }
}

// --------------------------------------------------------------------------
// GitHub API Types
// --------------------------------------------------------------------------

/// Request body for creating a PR.
#[derive(Serialize)]
struct CreatePrBody<'a> {
    head: &'a str,
    base: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    draft: bool,
}

/// Request body for labeling an issue or pull request.
#[derive(Serialize)]
struct LabelsBody<'a> {
    labels: &'a [String],
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
    #[serde(default)]
    errors: Vec<GitHubErrorDetail>,
}

/// Validation error detail (422 responses).
#[derive(Deserialize)]
struct GitHubErrorDetail {
    message: Option<String>,
}

impl GitHubErrorResponse {
    /// The top-level message followed by any detail messages.
    fn describe(self) -> String {
        let details: Vec<String> = self.errors.into_iter().filter_map(|e| e.message).collect();
        if details.is_empty() {
            self.message
        } else {
            format!("{} ({})", self.message, details.join("; "))
        }
    }
}

/// GitHub PR response format.
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
    state: String,
    #[serde(default)]
    draft: bool,
    head: GitHubRef,
    base: GitHubRef,
    title: String,
    merged: Option<bool>,
}

/// GitHub ref (head/base) format.
#[derive(Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl From<GitHubPullRequest> for PullRequest {
    fn from(pr: GitHubPullRequest) -> Self {
        let state = if pr.merged.unwrap_or(false) {
            PrState::Merged
        } else if pr.state == "closed" {
            PrState::Closed
        } else {
            PrState::Open
        };

        PullRequest {
            number: pr.number,
            url: pr.html_url,
            state,
            is_draft: pr.draft,
            head: pr.head.ref_name,
            base: pr.base.ref_name,
            title: pr.title,
        }
    }
}
