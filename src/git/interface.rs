//! git::interface
//!
//! Repository reads through git2.
//!
//! Everything that only inspects a repository (current branch, ref
//! resolution, ancestry, working tree status, remotes) goes through [`Git`].
//! Commands that change the checkout go through [`GitCli`](super::GitCli)
//! so that hooks, credentials and the user's git configuration apply.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::OperationInProgress`]: Rebase/merge/cherry-pick in progress
//! - [`GitError::CommandFailed`]: A git command exited with an error
//!
//! # Example
//!
//! ```no_run
//! use multirepo::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new(".")).unwrap();
//! let oid = git.resolve_ref("refs/heads/master").unwrap();
//! println!("master is at {}", oid.short(7));
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{BranchName, Oid, RepoSlug, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Git operation in progress (rebase, merge, etc.).
    #[error("{operation} in progress")]
    OperationInProgress {
        /// The type of operation in progress
        operation: GitState,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// The git executable could not be started.
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// A git command exited with a non-zero status.
    #[error("'{command}' failed ({status}): {stderr}")]
    CommandFailed {
        /// The command line, as logged
        command: String,
        /// Exit status description
        status: String,
        /// Trimmed standard error
        stderr: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context.contains("ref") || context == "HEAD" {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::RefNotFound {
                refname: err.message().to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: err.message().to_string(),
            },
            _ => GitError::Internal {
                message: err.message().to_string(),
            },
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidBranchName(msg) | TypeError::InvalidRepoSlug(msg) => {
                GitError::InvalidRefName { message: msg }
            }
        }
    }
}

/// State of in-progress Git operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitState {
    /// No operation in progress.
    Clean,
    Rebase,
    Merge,
    CherryPick,
    Revert,
    Bisect,
    ApplyMailbox,
}

impl GitState {
    /// Check if any operation is in progress.
    ///
    /// # Example
    ///
    /// ```
    /// use multirepo::git::GitState;
    ///
    /// assert!(!GitState::Clean.is_in_progress());
    /// assert!(GitState::Merge.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    /// Get a human-readable description of the state.
    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Rebase => "rebase",
            GitState::Merge => "merge",
            GitState::CherryPick => "cherry-pick",
            GitState::Revert => "revert",
            GitState::Bisect => "bisect",
            GitState::ApplyMailbox => "apply-mailbox",
        }
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Summary of working tree status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Number of untracked files (if requested)
    pub untracked: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// Check if the worktree is completely clean (no changes at all).
    ///
    /// Untracked files count as changes: a mutation that only adds files
    /// still has to be committed.
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && self.untracked == 0 && !self.has_conflicts
    }

    /// Check if there are any staged changes ready to commit.
    pub fn has_staged(&self) -> bool {
        self.staged > 0
    }
}

/// Read access to one repository.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover` to find the repository root,
    /// so `path` can be any directory within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Root of the working tree.
    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    // =========================================================================
    // State Detection
    // =========================================================================

    /// Get the current Git state (rebase, merge, etc.).
    pub fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge => GitState::Rebase,
            git2::RepositoryState::Merge => GitState::Merge,
            git2::RepositoryState::CherryPick | git2::RepositoryState::CherryPickSequence => {
                GitState::CherryPick
            }
            git2::RepositoryState::Revert | git2::RepositoryState::RevertSequence => {
                GitState::Revert
            }
            git2::RepositoryState::Bisect => GitState::Bisect,
            git2::RepositoryState::ApplyMailbox | git2::RepositoryState::ApplyMailboxOrRebase => {
                GitState::ApplyMailbox
            }
        }
    }

    /// Fail if a rebase, merge or similar operation is paused.
    pub fn ensure_no_operation(&self) -> Result<(), GitError> {
        match self.state() {
            GitState::Clean => Ok(()),
            operation => Err(GitError::OperationInProgress { operation }),
        }
    }

    // =========================================================================
    // Working Tree Status
    // =========================================================================

    /// Get working tree status summary.
    ///
    /// Ignored files are never counted.
    pub fn worktree_status(&self, include_untracked: bool) -> Result<WorktreeStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(include_untracked)
            .recurse_untracked_dirs(include_untracked)
            .include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;

        let mut result = WorktreeStatus::default();

        for entry in statuses.iter() {
            let status = entry.status();

            if status.is_conflicted() {
                result.has_conflicts = true;
            }

            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                result.staged += 1;
            }

            if status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                result.unstaged += 1;
            }

            if status.is_wt_new() {
                result.untracked += 1;
            }
        }

        Ok(result)
    }

    /// True when there is nothing to commit, untracked files included.
    pub fn is_worktree_clean(&self) -> Result<bool, GitError> {
        Ok(self.worktree_status(true)?.is_clean())
    }

    // =========================================================================
    // Ref Resolution
    // =========================================================================

    /// Resolve a ref to the commit it points to.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if the ref doesn't exist
    pub fn resolve_ref(&self, refname: &str) -> Result<Oid, GitError> {
        let reference = self
            .repo
            .find_reference(refname)
            .map_err(|e| GitError::from_git2(e, refname))?;

        let oid = reference
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, refname))?
            .id();

        Oid::new(oid.to_string()).map_err(|e| e.into())
    }

    /// Resolve a ref, returning None if it doesn't exist.
    pub fn try_resolve_ref(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.resolve_ref(refname) {
            Ok(oid) => Ok(Some(oid)),
            Err(GitError::RefNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get HEAD commit OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if HEAD is unborn (new repository)
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        let oid = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?
            .id();

        Oid::new(oid.to_string()).map_err(|e| e.into())
    }

    /// Local branch tip, if the branch exists.
    pub fn branch_tip(&self, branch: &BranchName) -> Result<Option<Oid>, GitError> {
        self.try_resolve_ref(&format!("refs/heads/{}", branch.as_str()))
    }

    /// Remote-tracking branch tip, if it exists.
    pub fn remote_tip(&self, remote: &str, branch: &BranchName) -> Result<Option<Oid>, GitError> {
        self.try_resolve_ref(&format!("refs/remotes/{}/{}", remote, branch.as_str()))
    }

    /// Get the current branch name, if on a branch.
    ///
    /// Returns `None` if HEAD is detached or unborn.
    pub fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(Some(BranchName::new(name)?));
            }
        }

        Ok(None)
    }

    // =========================================================================
    // Ancestry Queries
    // =========================================================================

    /// Check if `ancestor` is an ancestor of `descendant`.
    ///
    /// Returns true if ancestor == descendant (a commit is its own ancestor).
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }

        let ancestor_oid = git2::Oid::from_str(ancestor.as_str())
            .map_err(|e| GitError::from_git2(e, ancestor.as_str()))?;
        let descendant_oid = git2::Oid::from_str(descendant.as_str())
            .map_err(|e| GitError::from_git2(e, descendant.as_str()))?;

        self.repo
            .graph_descendant_of(descendant_oid, ancestor_oid)
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })
    }

    // =========================================================================
    // Remotes
    // =========================================================================

    /// Get the URL for a remote.
    ///
    /// Returns `None` if the remote doesn't exist.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::Internal {
                message: e.message().to_string(),
            }),
        }
    }

    /// Parse a remote URL into a GitHub repository.
    ///
    /// Handles both HTTPS and SSH URLs:
    /// - `https://github.com/owner/repo.git`
    /// - `git@github.com:owner/repo.git`
    ///
    /// Returns `None` for non-GitHub URLs.
    ///
    /// # Example
    ///
    /// ```
    /// use multirepo::git::Git;
    ///
    /// let slug = Git::parse_github_remote("git@github.com:camptocamp/tilecloud.git").unwrap();
    /// assert_eq!(slug.to_string(), "camptocamp/tilecloud");
    /// assert!(Git::parse_github_remote("https://gitlab.com/owner/repo.git").is_none());
    /// ```
    pub fn parse_github_remote(url: &str) -> Option<RepoSlug> {
        let rest = url
            .strip_prefix("https://github.com/")
            .or_else(|| url.strip_prefix("git@github.com:"))
            .or_else(|| url.strip_prefix("ssh://git@github.com/"))?;
        let rest = rest.trim_end_matches('/');
        let path = rest.strip_suffix(".git").unwrap_or(rest);
        RepoSlug::new(path).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod git_error {
        use super::*;

        #[test]
        fn error_display_formatting() {
            let err = GitError::RefNotFound {
                refname: "refs/heads/main".to_string(),
            };
            assert_eq!(err.to_string(), "ref not found: refs/heads/main");

            let err = GitError::OperationInProgress {
                operation: GitState::Rebase,
            };
            assert_eq!(err.to_string(), "rebase in progress");

            let err = GitError::CommandFailed {
                command: "git push origin fix".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "rejected".to_string(),
            };
            assert_eq!(
                err.to_string(),
                "'git push origin fix' failed (exit status: 1): rejected"
            );
        }

        #[test]
        fn type_errors_convert() {
            let err: GitError = TypeError::InvalidBranchName("a..b".to_string()).into();
            assert!(matches!(err, GitError::InvalidRefName { .. }));
        }
    }

    mod git_state {
        use super::*;

        #[test]
        fn clean_is_not_in_progress() {
            assert!(!GitState::Clean.is_in_progress());
        }

        #[test]
        fn operations_are_in_progress() {
            for state in [
                GitState::Rebase,
                GitState::Merge,
                GitState::CherryPick,
                GitState::Revert,
                GitState::Bisect,
                GitState::ApplyMailbox,
            ] {
                assert!(state.is_in_progress(), "{state} should be in progress");
            }
        }

        #[test]
        fn display_formatting() {
            assert_eq!(GitState::CherryPick.to_string(), "cherry-pick");
        }
    }

    mod worktree_status {
        use super::*;

        #[test]
        fn default_is_clean() {
            assert!(WorktreeStatus::default().is_clean());
        }

        #[test]
        fn staged_changes() {
            let status = WorktreeStatus {
                staged: 2,
                ..Default::default()
            };
            assert!(!status.is_clean());
            assert!(status.has_staged());
        }

        #[test]
        fn untracked_files_are_changes() {
            let status = WorktreeStatus {
                untracked: 1,
                ..Default::default()
            };
            assert!(!status.is_clean());
            assert!(!status.has_staged());
        }

        #[test]
        fn conflicts_make_dirty() {
            let status = WorktreeStatus {
                has_conflicts: true,
                ..Default::default()
            };
            assert!(!status.is_clean());
        }
    }

    mod parse_github_remote {
        use super::*;

        fn parse(url: &str) -> Option<String> {
            Git::parse_github_remote(url).map(|slug| slug.to_string())
        }

        #[test]
        fn https_url() {
            assert_eq!(parse("https://github.com/owner/repo.git").as_deref(), Some("owner/repo"));
            assert_eq!(parse("https://github.com/owner/repo").as_deref(), Some("owner/repo"));
        }

        #[test]
        fn ssh_url() {
            assert_eq!(parse("git@github.com:owner/repo.git").as_deref(), Some("owner/repo"));
            assert_eq!(parse("ssh://git@github.com/owner/repo").as_deref(), Some("owner/repo"));
        }

        #[test]
        fn non_github_returns_none() {
            assert_eq!(parse("https://gitlab.com/owner/repo.git"), None);
            assert_eq!(parse("/srv/git/repo.git"), None);
        }

        #[test]
        fn malformed_returns_none() {
            assert_eq!(parse("https://github.com/"), None);
            assert_eq!(parse("https://github.com/owner"), None);
            assert_eq!(parse("git@github.com:owner/repo/extra"), None);
        }
    }
}
