//! git::cli
//!
//! Porcelain commands run through the `git` executable.
//!
//! Every command is logged at debug level as `$ git ...` before it runs.
//! Commands run in the directory the [`GitCli`] was created for, never in
//! the process working directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use super::GitError;
use crate::core::types::BranchName;

/// Message printed by `git stash` when there is nothing to stash.
const NOTHING_TO_STASH: &str = "No local changes to save";

/// Runs git commands in one working tree.
#[derive(Debug, Clone)]
pub struct GitCli {
    dir: PathBuf,
}

impl GitCli {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn command_line(args: &[&str]) -> String {
        let mut line = String::from("git");
        for arg in args {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push('\'');
                line.push_str(&arg.replace('\'', "'\\''"));
                line.push('\'');
            } else {
                line.push_str(arg);
            }
        }
        line
    }

    /// Run a command and return its output whatever the exit status.
    pub fn output(&self, args: &[&str]) -> Result<Output, GitError> {
        let line = Self::command_line(args);
        debug!("$ {line}");
        Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            // Keep messages parseable ("No local changes to save").
            .env("LC_ALL", "C")
            .output()
            .map_err(|source| GitError::Spawn {
                command: line,
                source,
            })
    }

    /// Run a command and return its standard output, failing on a non-zero
    /// exit status.
    pub fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: Self::command_line(args),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    // =========================================================================
    // Preparing the working tree
    // =========================================================================

    /// Remove ignored files (`git clean -dfX`).
    pub fn clean_ignored(&self) -> Result<(), GitError> {
        self.run(&["clean", "-dfX"]).map(drop)
    }

    /// Remove untracked files, ignored ones excepted (`git clean -fd`).
    pub fn clean_untracked(&self) -> Result<(), GitError> {
        self.run(&["clean", "-fd"]).map(drop)
    }

    /// Stash local changes, including untracked and ignored files when
    /// `all` is set. Returns whether a stash entry was created.
    pub fn stash(&self, all: bool) -> Result<bool, GitError> {
        let args: &[&str] = if all { &["stash", "--all"] } else { &["stash"] };
        let stdout = self.run(args)?;
        Ok(!stdout.trim().is_empty() && stdout.trim() != NOTHING_TO_STASH)
    }

    /// Re-apply the last stash. Returns `false` when it did not apply cleanly.
    pub fn stash_pop(&self) -> Result<bool, GitError> {
        Ok(self.output(&["stash", "pop"])?.status.success())
    }

    pub fn fetch(&self, remote: &str) -> Result<(), GitError> {
        self.run(&["fetch", remote]).map(drop)
    }

    // =========================================================================
    // Branches
    // =========================================================================

    pub fn checkout(&self, branch: &BranchName) -> Result<(), GitError> {
        self.run(&["checkout", branch.as_str(), "--"]).map(drop)
    }

    /// Create or reset `branch` at `start` and check it out (`checkout -B`).
    pub fn checkout_reset(&self, branch: &BranchName, start: &str) -> Result<(), GitError> {
        self.run(&["checkout", "-B", branch.as_str(), start, "--"])
            .map(drop)
    }

    /// Check out a detached HEAD.
    pub fn checkout_detached(&self, rev: &str) -> Result<(), GitError> {
        self.run(&["checkout", "--detach", rev, "--"]).map(drop)
    }

    pub fn reset_hard(&self, rev: Option<&str>) -> Result<(), GitError> {
        match rev {
            Some(rev) => self.run(&["reset", "--hard", rev, "--"]),
            None => self.run(&["reset", "--hard"]),
        }
        .map(drop)
    }

    // =========================================================================
    // Committing and publishing
    // =========================================================================

    /// Stage everything, untracked files included.
    pub fn add_all(&self) -> Result<(), GitError> {
        self.run(&["add", "--all"]).map(drop)
    }

    /// Commit the index with a title and optional body paragraph.
    pub fn commit(&self, title: &str, body: Option<&str>, no_verify: bool) -> Result<(), GitError> {
        let mut args = vec!["commit", "-m", title];
        if let Some(body) = body.filter(|b| !b.trim().is_empty()) {
            args.extend(["-m", body]);
        }
        if no_verify {
            args.push("--no-verify");
        }
        self.run(&args).map(drop)
    }

    pub fn push(&self, remote: &str, branch: &BranchName, force: bool) -> Result<(), GitError> {
        let mut args = vec!["push"];
        if force {
            args.push("--force");
        }
        args.extend([remote, branch.as_str()]);
        self.run(&args).map(drop)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// `git status --short` output.
    pub fn status_short(&self) -> Result<String, GitError> {
        self.run(&["status", "--short"])
    }

    /// Tracked files, relative to the working tree root.
    pub fn ls_files(&self) -> Result<Vec<String>, GitError> {
        Ok(self
            .run(&["ls-files", "-z"])?
            .split('\0')
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect())
    }

    /// Tracked files containing a match for `pattern` (extended regex).
    ///
    /// No match is not an error.
    pub fn grep(&self, pattern: &str) -> Result<Vec<String>, GitError> {
        let args = ["grep", "-l", "-z", "-E", "-e", pattern, "--"];
        let output = self.output(&args)?;
        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout)
                .split('\0')
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect()),
            Some(1) => Ok(Vec::new()),
            _ => Err(GitError::CommandFailed {
                command: Self::command_line(&args),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, GitCli) {
        let temp = TempDir::new().unwrap();
        let git = GitCli::new(temp.path());
        git.run(&["init", "-q", "-b", "master"]).unwrap();
        git.run(&["config", "user.email", "test@example.com"]).unwrap();
        git.run(&["config", "user.name", "Test"]).unwrap();
        git.run(&["config", "commit.gpgsign", "false"]).unwrap();
        fs::write(temp.path().join("README.md"), "# test\n").unwrap();
        git.add_all().unwrap();
        git.commit("Initial commit", None, false).unwrap();
        (temp, git)
    }

    #[test]
    fn command_line_quotes_spaces() {
        assert_eq!(
            GitCli::command_line(&["commit", "-m", "Update the CI"]),
            "git commit -m 'Update the CI'"
        );
    }

    #[test]
    fn failing_command_reports_stderr() {
        let (_temp, git) = init_repo();
        let err = git.run(&["checkout", "does-not-exist"]).unwrap_err();
        match err {
            GitError::CommandFailed { command, stderr, .. } => {
                assert_eq!(command, "git checkout does-not-exist");
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stash_reports_whether_anything_was_saved() {
        let (temp, git) = init_repo();
        assert!(!git.stash(false).unwrap());

        fs::write(temp.path().join("README.md"), "# changed\n").unwrap();
        assert!(git.stash(false).unwrap());
        assert_eq!(fs::read_to_string(temp.path().join("README.md")).unwrap(), "# test\n");

        assert!(git.stash_pop().unwrap());
        assert_eq!(fs::read_to_string(temp.path().join("README.md")).unwrap(), "# changed\n");
    }

    #[test]
    fn stash_all_includes_untracked() {
        let (temp, git) = init_repo();
        fs::write(temp.path().join("new.txt"), "x").unwrap();
        assert!(git.stash(true).unwrap());
        assert!(!temp.path().join("new.txt").exists());
    }

    #[test]
    fn commit_with_body() {
        let (temp, git) = init_repo();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        git.add_all().unwrap();
        git.commit("Add a", Some("Longer explanation."), false).unwrap();

        let message = git.run(&["log", "-1", "--format=%B"]).unwrap();
        assert_eq!(message.trim(), "Add a\n\nLonger explanation.");
    }

    #[test]
    fn ls_files_and_grep() {
        let (temp, git) = init_repo();
        fs::create_dir(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/main.py"), "print('hello world')\n").unwrap();
        git.add_all().unwrap();

        let files = git.ls_files().unwrap();
        assert_eq!(files, vec!["README.md".to_string(), "src/main.py".to_string()]);

        assert_eq!(git.grep("hello").unwrap(), vec!["src/main.py".to_string()]);
        assert!(git.grep("absent-text").unwrap().is_empty());
    }

    #[test]
    fn status_short_lists_changes() {
        let (temp, git) = init_repo();
        assert!(git.status_short().unwrap().trim().is_empty());
        fs::write(temp.path().join("new.txt"), "x").unwrap();
        assert!(git.status_short().unwrap().contains("new.txt"));
    }
}
