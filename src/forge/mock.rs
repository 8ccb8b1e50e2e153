//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge stores PRs in memory, records every call, and can be
//! configured to fail a given operation.
//!
//! # Example
//!
//! ```
//! use multirepo::core::types::RepoSlug;
//! use multirepo::forge::mock::MockForge;
//! use multirepo::forge::{CreatePrRequest, Forge, PrState};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new();
//! let repo = RepoSlug::new("camptocamp/tilecloud").unwrap();
//!
//! let pr = forge.create_pr(&repo, CreatePrRequest {
//!     head: "update-ci".to_string(),
//!     base: "master".to_string(),
//!     title: "Update the CI".to_string(),
//!     body: None,
//!     draft: false,
//!     labels: vec![],
//! }).await.unwrap();
//!
//! assert_eq!(pr.number, 1);
//! assert_eq!(pr.url, "https://github.com/camptocamp/tilecloud/pull/1");
//! assert_eq!(pr.state, PrState::Open);
//! # });
//! ```

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::traits::{CreatePrRequest, Forge, ForgeError, PrState, PullRequest};
use crate::core::types::RepoSlug;

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockForge {
    inner: Arc<Mutex<MockForgeInner>>,
}

#[derive(Debug, Default)]
struct MockForgeInner {
    /// Stored PRs with the repository they belong to.
    prs: Vec<(RepoSlug, PullRequest)>,
    /// Last PR number assigned.
    last_number: u64,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail create_pr with the given error.
    CreatePr(ForgeError),
    /// Fail find_pr_by_head with the given error.
    FindPrByHead(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    CreatePr {
        repo: String,
        head: String,
        base: String,
        title: String,
        labels: Vec<String>,
    },
    FindPrByHead {
        repo: String,
        head: String,
    },
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock forge with pre-existing PRs.
    pub fn with_prs(prs: Vec<(RepoSlug, PullRequest)>) -> Self {
        let last_number = prs.iter().map(|(_, p)| p.number).max().unwrap_or(0);
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner {
                prs,
                last_number,
                ..Default::default()
            })),
        }
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use multirepo::forge::mock::{FailOn, MockForge};
    /// use multirepo::forge::ForgeError;
    ///
    /// let forge = MockForge::new().fail_on(FailOn::CreatePr(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.state().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Get all PRs (for test verification).
    pub fn all_prs(&self) -> Vec<PullRequest> {
        self.state().prs.iter().map(|(_, pr)| pr.clone()).collect()
    }

    /// Get the count of PRs.
    pub fn pr_count(&self) -> usize {
        self.state().prs.len()
    }

    /// Close a PR, as if merged or closed by hand.
    pub fn close_pr(&self, number: u64) {
        if let Some((_, pr)) = self.state().prs.iter_mut().find(|(_, p)| p.number == number) {
            pr.state = PrState::Closed;
        }
    }

    fn state(&self) -> MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_fail(&self, expected: &str) -> Result<(), ForgeError> {
        match &self.state().fail_on {
            Some(FailOn::CreatePr(e)) if expected == "create_pr" => Err(e.clone()),
            Some(FailOn::FindPrByHead(e)) if expected == "find_pr_by_head" => Err(e.clone()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_pr(
        &self,
        repo: &RepoSlug,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        self.state().operations.push(MockOperation::CreatePr {
            repo: repo.to_string(),
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
            labels: request.labels.clone(),
        });
        self.check_fail("create_pr")?;

        let mut inner = self.state();
        inner.last_number += 1;
        let number = inner.last_number;

        let pr = PullRequest {
            number,
            url: format!("https://github.com/{}/pull/{}", repo, number),
            state: PrState::Open,
            is_draft: request.draft,
            head: request.head,
            base: request.base,
            title: request.title,
        };

        inner.prs.push((repo.clone(), pr.clone()));
        Ok(pr)
    }

    async fn find_pr_by_head(
        &self,
        repo: &RepoSlug,
        head: &str,
    ) -> Result<Option<PullRequest>, ForgeError> {
        self.state().operations.push(MockOperation::FindPrByHead {
            repo: repo.to_string(),
            head: head.to_string(),
        });
        self.check_fail("find_pr_by_head")?;

        Ok(self
            .state()
            .prs
            .iter()
            .find(|(r, p)| r == repo && p.head == head && p.state == PrState::Open)
            .map(|(_, p)| p.clone()))
    }
}
