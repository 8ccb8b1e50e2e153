//! workflow::iterator
//!
//! Walk the repository list.
//!
//! Repositories are processed one after the other, in list order. A
//! repository that fails is recorded and the walk goes on; the failures are
//! summarized in the [`RunReport`].

use tracing::{debug, warn};

use super::branch::{BranchContext, BranchRequest, BranchState, Orchestrator};
use super::helpers;
use super::{RepoContext, WorkflowError, WorkingDir};
use crate::core::config::RepositoryDescriptor;
use crate::core::types::{BranchName, RepoSlug};
use crate::git::GitError;
use crate::ui::output::{self, Verbosity};

/// How the action is applied to each repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Run in the current checkout, without any git operation.
    InPlace,
    /// One work branch created from the master branch.
    Branch {
        branch: BranchName,
        title: String,
        body: Option<String>,
        pull_request: bool,
    },
    /// One work branch `{prefix}-{base}` for every stabilization branch and
    /// the master branch.
    BaseBranches {
        prefix: String,
        title: String,
        body: Option<String>,
        pull_request: bool,
    },
}

impl Mode {
    /// Branch operations to run on `repo`, in order.
    pub fn requests(&self, repo: &RepositoryDescriptor) -> Result<Vec<BranchRequest>, GitError> {
        let build = |branch: BranchName, base: BranchName, title: &str, body: &Option<String>, pr: bool| {
            let mut request = BranchRequest::new(branch, base, title).pull_request(pr);
            request.body = body.clone();
            request
        };

        match self {
            Mode::InPlace => Ok(Vec::new()),
            Mode::Branch {
                branch,
                title,
                body,
                pull_request,
            } => Ok(vec![build(
                branch.clone(),
                repo.master_branch.clone(),
                title.as_str(),
                body,
                *pull_request,
            )]),
            Mode::BaseBranches {
                prefix,
                title,
                body,
                pull_request,
            } => repo
                .base_branches()
                .into_iter()
                .map(|base| -> Result<BranchRequest, GitError> {
                    let branch = BranchName::new(format!("{prefix}-{base}"))?;
                    Ok(build(branch, base, title.as_str(), body, *pull_request))
                })
                .collect(),
        }
    }

    pub fn creates_branches(&self) -> bool {
        !matches!(self, Mode::InPlace)
    }
}

/// Which repositories to process and how.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: Mode,
    /// Stop after the first pull request, or after the first repository in
    /// place mode.
    pub one: bool,
    /// Only repositories owned by this organization.
    pub org: Option<String>,
    /// Only repositories containing files of this type.
    pub file_type: Option<String>,
    pub verbosity: Verbosity,
}

impl RunOptions {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            one: false,
            org: None,
            file_type: None,
            verbosity: Verbosity::Normal,
        }
    }

    /// Whether `repo` belongs to the selected organization.
    pub fn matches_org(&self, repo: &RepositoryDescriptor) -> bool {
        self.org
            .as_deref()
            .map_or(true, |org| repo.name.owner() == org)
    }
}

/// What happened in one repository.
#[derive(Debug)]
pub enum RepoOutcome {
    /// The action ran in place.
    Applied { messages: Vec<String> },
    /// The action ran on work branches.
    Branches(Vec<BranchContext>),
    Failed {
        error: WorkflowError,
        /// Branch operations that completed before the failure.
        completed: Vec<BranchContext>,
    },
}

impl RepoOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RepoOutcome::Failed { .. })
    }

    /// Every branch operation ended without a change.
    pub fn is_no_change(&self) -> bool {
        match self {
            RepoOutcome::Branches(branches) => branches
                .iter()
                .all(|b| b.state == BranchState::NoChange),
            _ => false,
        }
    }

    pub fn branches(&self) -> &[BranchContext] {
        match self {
            RepoOutcome::Applied { .. } => &[],
            RepoOutcome::Branches(branches) => branches,
            RepoOutcome::Failed { completed, .. } => completed,
        }
    }

    pub fn messages(&self) -> Vec<&str> {
        match self {
            RepoOutcome::Applied { messages } => messages.iter().map(String::as_str).collect(),
            _ => self
                .branches()
                .iter()
                .flat_map(|b| b.messages.iter().map(String::as_str))
                .collect(),
        }
    }
}

#[derive(Debug)]
pub struct RepoReport {
    pub repo: RepoSlug,
    pub outcome: RepoOutcome,
}

/// Result of a whole run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub repos: Vec<RepoReport>,
}

impl RunReport {
    /// Pull request links, in processing order.
    ///
    /// A pull request that could not be opened contributes the pull request
    /// list of its repository.
    pub fn pull_request_urls(&self) -> Vec<&str> {
        self.repos
            .iter()
            .flat_map(|r| r.outcome.branches())
            .filter_map(BranchContext::url)
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RepoReport> {
        self.repos.iter().filter(|r| r.outcome.is_failure())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn no_change_count(&self) -> usize {
        self.repos
            .iter()
            .filter(|r| r.outcome.is_no_change())
            .count()
    }

    pub fn success_count(&self) -> usize {
        self.repos.len() - self.failure_count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Applies an action to every selected repository.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use multirepo::core::config::{BranchReuse, RepositoryDescriptor};
/// use multirepo::forge::mock::MockForge;
/// use multirepo::workflow::{Mode, Orchestrator, RepoIterator, RunOptions};
///
/// let repos = RepositoryDescriptor::load_list("repos.yaml".as_ref())?;
/// let orchestrator = Orchestrator::new(Arc::new(MockForge::new()), BranchReuse::FastForward)?;
/// let iterator = RepoIterator::new(&repos, RunOptions::new(Mode::InPlace), &orchestrator);
///
/// let report = iterator.run(|ctx| Ok(vec![format!("visited {}", ctx.repo.name)]));
/// assert!(report.is_success());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct RepoIterator<'a> {
    repos: &'a [RepositoryDescriptor],
    options: RunOptions,
    orchestrator: &'a Orchestrator,
}

impl<'a> RepoIterator<'a> {
    pub fn new(
        repos: &'a [RepositoryDescriptor],
        options: RunOptions,
        orchestrator: &'a Orchestrator,
    ) -> Self {
        Self {
            repos,
            options,
            orchestrator,
        }
    }

    /// Run `action` on every selected repository.
    pub fn run<F>(&self, mut action: F) -> RunReport
    where
        F: FnMut(&RepoContext<'_>) -> anyhow::Result<Vec<String>>,
    {
        let verbosity = self.options.verbosity;
        let mut report = RunReport::default();

        for repo in self.repos {
            if !self.options.matches_org(repo) {
                debug!("{}: not in organization, skipped", repo.name);
                continue;
            }

            let outcome = match self.type_matches(repo) {
                Ok(true) => {
                    output::banner(&repo.name, verbosity);
                    let outcome = self.process(repo, &mut action);
                    show(&outcome, verbosity);
                    output::banner(&repo.name, verbosity);
                    outcome
                }
                Ok(false) => {
                    debug!("{}: no file of the requested type, skipped", repo.name);
                    continue;
                }
                Err(e) => RepoOutcome::Failed {
                    error: e.into(),
                    completed: Vec::new(),
                },
            };

            if let RepoOutcome::Failed { error, .. } = &outcome {
                warn!("{}: {error}", repo.name);
            }

            let stop = self.options.one && self.counts_for_one(&outcome);
            report.repos.push(RepoReport {
                repo: repo.name.clone(),
                outcome,
            });
            if stop {
                debug!("stopping after the first result");
                break;
            }
        }

        report
    }

    fn process<F>(&self, repo: &RepositoryDescriptor, action: &mut F) -> RepoOutcome
    where
        F: FnMut(&RepoContext<'_>) -> anyhow::Result<Vec<String>>,
    {
        if !self.options.mode.creates_branches() {
            let context = RepoContext {
                repo,
                base_branch: None,
            };
            let result = WorkingDir::enter(&repo.dir)
                .and_then(|_cwd| action(&context).map_err(WorkflowError::Action));
            return match result {
                Ok(messages) => RepoOutcome::Applied { messages },
                Err(error) => RepoOutcome::Failed {
                    error,
                    completed: Vec::new(),
                },
            };
        }

        let requests = match self.options.mode.requests(repo) {
            Ok(requests) => requests,
            Err(e) => {
                return RepoOutcome::Failed {
                    error: e.into(),
                    completed: Vec::new(),
                }
            }
        };

        let mut completed = Vec::new();
        for request in &requests {
            match self.orchestrator.run(repo, request, &mut *action) {
                Ok(context) => {
                    let stop = self.options.one && context.url().is_some();
                    completed.push(context);
                    if stop {
                        break;
                    }
                }
                Err(error) => return RepoOutcome::Failed { error, completed },
            }
        }
        RepoOutcome::Branches(completed)
    }

    fn type_matches(&self, repo: &RepositoryDescriptor) -> Result<bool, GitError> {
        let Some(file_type) = self.options.file_type.as_deref() else {
            return Ok(true);
        };
        if !repo.types.is_empty() {
            return Ok(repo.types.iter().any(|t| t == file_type));
        }
        Ok(helpers::identify(&repo.dir)?.contains(file_type))
    }

    fn counts_for_one(&self, outcome: &RepoOutcome) -> bool {
        if self.options.mode.creates_branches() {
            outcome.branches().iter().any(|b| b.url().is_some())
        } else {
            true
        }
    }
}

fn show(outcome: &RepoOutcome, verbosity: Verbosity) {
    for message in outcome.messages() {
        output::print(message, verbosity);
    }
    for branch in outcome.branches() {
        if branch.state == BranchState::NoChange {
            output::print(format!("{}: no change", branch.branch), verbosity);
        }
        for warning in &branch.warnings {
            output::warn(format!("{}: {warning}", branch.branch), verbosity);
        }
    }
    if let RepoOutcome::Failed { error, .. } = outcome {
        output::error(error);
    }
}
