//! workflow
//!
//! Applying one change to many repositories.
//!
//! # Architecture
//!
//! ```text
//! RepoIterator -> (per repository) Orchestrator -> action -> editor
//! ```
//!
//! - [`RepoIterator`] walks the repository list in order, one repository at
//!   a time, and isolates failures: a repository that fails is recorded in
//!   the [`RunReport`] and the next one is processed.
//! - [`Orchestrator`] runs one action on one work branch:
//!
//! ```text
//! CheckedOut -> BranchCreated -> Mutated -> (Committed | NoChange) -> (PrOpened | PrSkipped)
//! ```
//!
//! - Actions are plain closures receiving a [`RepoContext`]. They run with
//!   the process working directory set to the repository root and return
//!   human-readable messages describing what they did.
//!
//! # Invariants
//!
//! - An action that leaves the tree unchanged produces no commit, no push
//!   and no pull request.
//! - The previously checked out branch and any stashed local changes are
//!   restored on every exit path.
//! - A pull request failure never rolls back the pushed branch.

mod branch;
mod cwd;
pub mod helpers;
mod iterator;

pub use branch::{
    BranchContext, BranchRequest, BranchState, Orchestrator, PullRequestOutcome, DEFAULT_LABEL,
};
pub use cwd::WorkingDir;
pub use iterator::{Mode, RepoIterator, RepoOutcome, RepoReport, RunOptions, RunReport};

use std::path::PathBuf;

use thiserror::Error;

use crate::core::config::RepositoryDescriptor;
use crate::core::types::BranchName;
use crate::git::GitError;

/// What an action gets to see.
#[derive(Debug, Clone, Copy)]
pub struct RepoContext<'a> {
    pub repo: &'a RepositoryDescriptor,
    /// Base branch of the pull request, when running on a work branch.
    pub base_branch: Option<&'a BranchName>,
}

/// Errors from processing one repository.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Git(#[from] GitError),

    /// The work branch cannot be checked out without losing history.
    #[error("cannot check out '{branch}': {reason}")]
    CheckoutConflict { branch: String, reason: String },

    #[error("failed to change directory to '{path}': {source}")]
    WorkingDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove '{path}': {source}")]
    Clean {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The action returned an error.
    #[error("action failed: {0:#}")]
    Action(anyhow::Error),

    #[error("failed to start the async runtime: {0}")]
    Runtime(std::io::Error),
}
