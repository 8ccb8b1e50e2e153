//! workflow::branch
//!
//! Apply one action on a work branch and turn the result into a pull request.
//!
//! # Lifecycle
//!
//! 1. Prepare: remove `folders_to_clean`, remove ignored files and stash
//!    local changes (see [`RepositoryDescriptor::clean`]).
//! 2. Fetch the remote and check out the work branch from
//!    `<remote>/<base>`, honoring the [`BranchReuse`] policy.
//! 3. Run the action in the repository root.
//! 4. If the tree changed, commit, push and open (or reuse) the pull request.
//! 5. Restore: check out the previous branch and pop the stash.
//!
//! Step 5 runs whatever happened in steps 2 to 4.

use std::fmt;
use std::fs;
use std::io;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use super::{RepoContext, WorkflowError, WorkingDir};
use crate::core::config::{BranchReuse, RepositoryDescriptor};
use crate::core::types::{BranchName, Oid};
use crate::forge::{CreatePrRequest, Forge, ForgeError, PullRequest};
use crate::git::{Git, GitCli, GitError};

/// Where a branch operation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchState {
    CheckedOut,
    BranchCreated,
    Mutated,
    Committed,
    /// The action left the tree as it was.
    NoChange,
    PrOpened,
    /// Committed and pushed, no pull request was requested.
    PrSkipped,
}

impl BranchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchState::CheckedOut => "checked-out",
            BranchState::BranchCreated => "branch-created",
            BranchState::Mutated => "mutated",
            BranchState::Committed => "committed",
            BranchState::NoChange => "no-change",
            BranchState::PrOpened => "pr-opened",
            BranchState::PrSkipped => "pr-skipped",
        }
    }
}

impl fmt::Display for BranchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do on which branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRequest {
    /// Work branch, created from the base.
    pub branch: BranchName,
    /// Branch the pull request targets.
    pub base: BranchName,
    /// Commit message and pull request title.
    pub title: String,
    pub body: Option<String>,
    /// Open a pull request after pushing.
    pub pull_request: bool,
}

impl BranchRequest {
    pub fn new(branch: BranchName, base: BranchName, title: impl Into<String>) -> Self {
        Self {
            branch,
            base,
            title: title.into(),
            body: None,
            pull_request: true,
        }
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn pull_request(mut self, yes: bool) -> Self {
        self.pull_request = yes;
        self
    }
}

/// Result of the pull request step.
#[derive(Debug, Clone)]
pub enum PullRequestOutcome {
    Created(PullRequest),
    /// An open pull request already existed for the work branch.
    Reused(PullRequest),
    /// The branch was pushed but the pull request could not be opened.
    Failed {
        error: ForgeError,
        /// Pull request list of the repository.
        fallback_url: String,
    },
}

impl PullRequestOutcome {
    /// Link to show the user.
    pub fn url(&self) -> &str {
        match self {
            PullRequestOutcome::Created(pr) | PullRequestOutcome::Reused(pr) => &pr.url,
            PullRequestOutcome::Failed { fallback_url, .. } => fallback_url,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PullRequestOutcome::Failed { .. })
    }
}

/// State and result of one branch operation.
#[derive(Debug, Clone)]
pub struct BranchContext {
    pub branch: BranchName,
    pub base: BranchName,
    pub pull_request_requested: bool,
    /// The branch differs from its base after the action.
    pub changed: bool,
    pub state: BranchState,
    pub pull_request: Option<PullRequestOutcome>,
    /// Messages returned by the action.
    pub messages: Vec<String>,
    /// Recovered problems (pull request failure, stash not restored).
    pub warnings: Vec<String>,
}

impl BranchContext {
    fn new(request: &BranchRequest) -> Self {
        Self {
            branch: request.branch.clone(),
            base: request.base.clone(),
            pull_request_requested: request.pull_request,
            changed: false,
            state: BranchState::CheckedOut,
            pull_request: None,
            messages: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn advance(&mut self, state: BranchState) {
        info!("{} ({}): {} -> {}", self.branch, self.base, self.state, state);
        self.state = state;
    }

    /// Pull request link, when a pull request step ran.
    pub fn url(&self) -> Option<&str> {
        self.pull_request.as_ref().map(PullRequestOutcome::url)
    }
}

/// Branch checked out before the operation.
#[derive(Debug)]
enum Previous {
    Branch(BranchName),
    Detached(Oid),
}

impl Previous {
    fn capture(git: &Git) -> Result<Self, GitError> {
        match git.current_branch()? {
            Some(branch) => Ok(Previous::Branch(branch)),
            None => Ok(Previous::Detached(git.head_oid()?)),
        }
    }
}

/// Runs actions on work branches and opens the pull requests.
///
/// One orchestrator serves a whole run; the forge is shared by every
/// repository.
pub struct Orchestrator {
    forge: Arc<dyn Forge>,
    runtime: Runtime,
    reuse: BranchReuse,
    labels: Vec<String>,
}

/// Label of the pull requests opened by a run, unless told otherwise.
pub const DEFAULT_LABEL: &str = "chore";

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("forge", &self.forge.name())
            .field("reuse", &self.reuse)
            .field("labels", &self.labels)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(forge: Arc<dyn Forge>, reuse: BranchReuse) -> Result<Self, WorkflowError> {
        let runtime = Runtime::new().map_err(WorkflowError::Runtime)?;
        Ok(Self {
            forge,
            runtime,
            reuse,
            labels: vec![DEFAULT_LABEL.to_string()],
        })
    }

    /// Labels of the pull requests to open. Empty labels are dropped.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels
            .into_iter()
            .map(Into::into)
            .filter(|l: &String| !l.is_empty())
            .collect();
        self
    }

    pub fn reuse(&self) -> BranchReuse {
        self.reuse
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Run `action` on the work branch described by `request`.
    ///
    /// Returns the final [`BranchContext`]; a [`BranchState::NoChange`]
    /// result is not an error. The previous branch and the stashed local
    /// changes are restored before returning, on success and on error.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::CheckoutConflict`] if the work branch exists and
    ///   cannot be reused under the current policy
    /// - [`WorkflowError::Action`] if the action fails
    /// - [`WorkflowError::Git`] if a git command fails
    pub fn run<F>(
        &self,
        repo: &RepositoryDescriptor,
        request: &BranchRequest,
        action: F,
    ) -> Result<BranchContext, WorkflowError>
    where
        F: FnOnce(&RepoContext<'_>) -> anyhow::Result<Vec<String>>,
    {
        let _cwd = WorkingDir::enter(&repo.dir)?;
        let git = Git::open(&repo.dir)?;
        git.ensure_no_operation()?;
        let cli = GitCli::new(&repo.dir);

        let previous = Previous::capture(&git)?;
        let stashed = prepare(repo, &cli)?;

        let mut context = BranchContext::new(request);
        let result = self.apply(repo, request, &git, &cli, &mut context, action);
        let restored = restore(repo, &git, &cli, &previous, &request.branch, stashed, &mut context);

        match (result, restored) {
            (Ok(()), Ok(())) => Ok(context),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(e), Err(restore_error)) => {
                warn!("{}: restoring the checkout failed: {restore_error}", repo.name);
                Err(e)
            }
        }
    }

    fn apply<F>(
        &self,
        repo: &RepositoryDescriptor,
        request: &BranchRequest,
        git: &Git,
        cli: &GitCli,
        context: &mut BranchContext,
        action: F,
    ) -> Result<(), WorkflowError>
    where
        F: FnOnce(&RepoContext<'_>) -> anyhow::Result<Vec<String>>,
    {
        let remote = repo.remote();
        cli.fetch(remote)?;

        let base_ref = format!("{remote}/{}", request.base);
        let base_tip = git
            .remote_tip(remote, &request.base)?
            .ok_or_else(|| GitError::RefNotFound {
                refname: base_ref.clone(),
            })?;

        self.check_out(repo, request, git, cli, &base_ref, &base_tip)?;
        context.advance(BranchState::BranchCreated);

        let repo_context = RepoContext {
            repo,
            base_branch: Some(&request.base),
        };
        context.messages = action(&repo_context).map_err(WorkflowError::Action)?;
        context.advance(BranchState::Mutated);

        let dirty = !git.is_worktree_clean()?;
        let ahead = git.head_oid()? != base_tip;
        if !dirty && !ahead {
            context.advance(BranchState::NoChange);
            return Ok(());
        }
        context.changed = true;

        if dirty {
            commit(cli, request)?;
        }
        context.advance(BranchState::Committed);

        cli.push(remote, &request.branch, self.reuse == BranchReuse::Recreate)?;

        if !request.pull_request {
            context.advance(BranchState::PrSkipped);
            return Ok(());
        }

        let outcome = self.open_pull_request(repo, request);
        match &outcome {
            PullRequestOutcome::Failed { error, .. } => {
                warn!("{}: pull request not created: {error}", repo.name);
                context
                    .warnings
                    .push(format!("pull request not created: {error}"));
            }
            _ => context.advance(BranchState::PrOpened),
        }
        context.pull_request = Some(outcome);
        Ok(())
    }

    /// Check out the work branch, creating or reusing it.
    fn check_out(
        &self,
        repo: &RepositoryDescriptor,
        request: &BranchRequest,
        git: &Git,
        cli: &GitCli,
        base_ref: &str,
        base_tip: &Oid,
    ) -> Result<(), WorkflowError> {
        let branch = &request.branch;
        let existing = match git.branch_tip(branch)? {
            Some(tip) => Some((tip, branch.to_string())),
            None => git
                .remote_tip(repo.remote(), branch)?
                .map(|tip| (tip, format!("{}/{branch}", repo.remote()))),
        };

        match (self.reuse, existing) {
            (BranchReuse::Recreate, _) | (_, None) => cli.checkout_reset(branch, base_ref)?,
            (BranchReuse::FastForward, Some((tip, start))) => {
                if git.is_ancestor(base_tip, &tip)? {
                    debug!("reusing '{start}', it contains {base_ref}");
                    cli.checkout_reset(branch, &start)?;
                } else if git.is_ancestor(&tip, base_tip)? {
                    debug!("fast-forwarding '{start}' to {base_ref}");
                    cli.checkout_reset(branch, base_ref)?;
                } else {
                    return Err(WorkflowError::CheckoutConflict {
                        branch: branch.to_string(),
                        reason: format!("'{start}' has diverged from '{base_ref}'"),
                    });
                }
            }
        }
        Ok(())
    }

    fn open_pull_request(
        &self,
        repo: &RepositoryDescriptor,
        request: &BranchRequest,
    ) -> PullRequestOutcome {
        let head = request.branch.as_str();
        let result = self.runtime.block_on(async {
            if let Some(existing) = self.forge.find_pr_by_head(&repo.name, head).await? {
                return Ok(PullRequestOutcome::Reused(existing));
            }
            let pr = self
                .forge
                .create_pr(
                    &repo.name,
                    CreatePrRequest {
                        head: head.to_string(),
                        base: request.base.to_string(),
                        title: request.title.clone(),
                        body: request.body.clone(),
                        draft: false,
                        labels: self.labels.clone(),
                    },
                )
                .await?;
            Ok::<_, ForgeError>(PullRequestOutcome::Created(pr))
        });

        result.unwrap_or_else(|error| PullRequestOutcome::Failed {
            error,
            fallback_url: repo.name.pulls_url(),
        })
    }
}

/// Clean the checkout and stash local changes. Returns whether a stash
/// entry was created.
fn prepare(repo: &RepositoryDescriptor, cli: &GitCli) -> Result<bool, WorkflowError> {
    for folder in &repo.folders_to_clean {
        let path = repo.dir.join(folder);
        match fs::remove_dir_all(&path) {
            Ok(()) => debug!("removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(WorkflowError::Clean { path, source }),
        }
    }

    if repo.clean {
        cli.clean_ignored()?;
    }
    Ok(cli.stash(repo.clean)?)
}

/// Commit everything, retrying once without hooks when they reject the
/// commit.
fn commit(cli: &GitCli, request: &BranchRequest) -> Result<(), GitError> {
    cli.add_all()?;
    match cli.commit(&request.title, request.body.as_deref(), false) {
        Ok(()) => Ok(()),
        Err(e @ GitError::CommandFailed { .. }) => {
            warn!("commit rejected, retrying without hooks: {e}");
            // Hooks may have rewritten files.
            cli.add_all()?;
            cli.commit(&request.title, request.body.as_deref(), true)
        }
        Err(e) => Err(e),
    }
}

fn restore(
    repo: &RepositoryDescriptor,
    git: &Git,
    cli: &GitCli,
    previous: &Previous,
    work_branch: &BranchName,
    stashed: bool,
    context: &mut BranchContext,
) -> Result<(), WorkflowError> {
    if !git.is_worktree_clean()? {
        debug!("discarding uncommitted changes on '{work_branch}'");
        cli.reset_hard(None)?;
        // Everything untracked was stashed with `--all`.
        if repo.clean {
            cli.clean_untracked()?;
        }
    }

    match previous {
        Previous::Branch(name) if name == work_branch => {}
        Previous::Branch(name) => cli.checkout(name)?,
        Previous::Detached(oid) => cli.checkout_detached(oid.as_str())?,
    }

    if stashed && !cli.stash_pop()? {
        cli.reset_hard(None)?;
        let message = "local changes could not be restored, they are kept in the stash";
        warn!("{message}");
        context.warnings.push(message.to_string());
    }
    Ok(())
}
