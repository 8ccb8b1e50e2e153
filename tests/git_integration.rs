//! Integration tests for the Git interface.
//!
//! These tests use real git repositories created via tempfile.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use multirepo::core::types::{BranchName, Oid};
use multirepo::git::{Git, GitCli, GitError, GitState};

/// Test fixture that creates a real git repository.
struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create a new test repository with an initial commit.
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");

        run_git(dir.path(), &["init", "-q", "-b", "master"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"]);

        fs::write(dir.path().join("README.md"), "# Test Repo\n").unwrap();
        run_git(dir.path(), &["add", "README.md"]);
        run_git(dir.path(), &["commit", "-q", "-m", "Initial commit"]);

        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn git(&self) -> Git {
        Git::open(self.path()).expect("failed to open test repo")
    }

    /// Create a file and commit it, returning the new commit OID.
    fn commit_file(&self, path: &str, content: &str, message: &str) -> Oid {
        fs::write(self.path().join(path), content).unwrap();
        run_git(self.path(), &["add", path]);
        run_git(self.path(), &["commit", "-q", "-m", message]);
        self.git().head_oid().unwrap()
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn branch(name: &str) -> BranchName {
    BranchName::new(name).unwrap()
}

// =============================================================================
// Opening
// =============================================================================

#[test]
fn open_from_subdirectory() {
    let repo = TestRepo::new();
    let subdir = repo.path().join("subdir");
    fs::create_dir(&subdir).unwrap();

    assert!(Git::open(&subdir).is_ok());
}

#[test]
fn open_non_repository_fails() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(Git::open(dir.path()), Err(GitError::NotARepo { .. })));
}

#[test]
fn open_bare_repository_fails() {
    let dir = TempDir::new().unwrap();
    run_git(dir.path(), &["init", "-q", "--bare"]);
    assert!(matches!(Git::open(dir.path()), Err(GitError::BareRepo)));
}

// =============================================================================
// Branches and refs
// =============================================================================

#[test]
fn current_branch_and_detached_head() {
    let repo = TestRepo::new();
    assert_eq!(repo.git().current_branch().unwrap(), Some(branch("master")));

    run_git(repo.path(), &["checkout", "-q", "--detach"]);
    assert_eq!(repo.git().current_branch().unwrap(), None);
}

#[test]
fn branch_tip_of_missing_branch_is_none() {
    let repo = TestRepo::new();
    let git = repo.git();

    assert_eq!(git.branch_tip(&branch("master")).unwrap(), Some(git.head_oid().unwrap()));
    assert_eq!(git.branch_tip(&branch("absent")).unwrap(), None);
}

#[test]
fn remote_tip_follows_fetch() {
    let origin = TestRepo::new();
    let clone_parent = TempDir::new().unwrap();
    run_git(
        clone_parent.path(),
        &["clone", "-q", origin.path().to_str().unwrap(), "work"],
    );
    let work = clone_parent.path().join("work");

    let before = Git::open(&work)
        .unwrap()
        .remote_tip("origin", &branch("master"))
        .unwrap();
    let new_tip = origin.commit_file("a.txt", "a\n", "Add a");
    GitCli::new(&work).fetch("origin").unwrap();
    let after = Git::open(&work)
        .unwrap()
        .remote_tip("origin", &branch("master"))
        .unwrap();

    assert!(before.is_some());
    assert_ne!(before, after);
    assert_eq!(after, Some(new_tip));
}

#[test]
fn ancestry() {
    let repo = TestRepo::new();
    let first = repo.git().head_oid().unwrap();
    let second = repo.commit_file("a.txt", "a\n", "Add a");
    let git = repo.git();

    assert!(git.is_ancestor(&first, &second).unwrap());
    assert!(!git.is_ancestor(&second, &first).unwrap());
}

// =============================================================================
// Working tree
// =============================================================================

#[test]
fn untracked_files_make_the_tree_dirty() {
    let repo = TestRepo::new();
    assert!(repo.git().is_worktree_clean().unwrap());

    fs::write(repo.path().join("new.txt"), "new\n").unwrap();
    let status = repo.git().worktree_status(true).unwrap();

    assert_eq!(status.untracked, 1);
    assert!(!repo.git().is_worktree_clean().unwrap());
}

#[test]
fn stash_round_trip() {
    let repo = TestRepo::new();
    let cli = GitCli::new(repo.path());
    fs::write(repo.path().join("README.md"), "# Changed\n").unwrap();
    fs::write(repo.path().join("new.txt"), "new\n").unwrap();

    assert!(cli.stash(true).unwrap());
    assert!(repo.git().is_worktree_clean().unwrap());
    assert!(cli.stash_pop().unwrap());

    assert_eq!(fs::read_to_string(repo.path().join("README.md")).unwrap(), "# Changed\n");
    assert!(repo.path().join("new.txt").exists());
}

#[test]
fn nothing_to_stash() {
    let repo = TestRepo::new();
    assert!(!GitCli::new(repo.path()).stash(false).unwrap());
}

#[test]
fn merge_in_progress_is_detected() {
    let repo = TestRepo::new();
    run_git(repo.path(), &["checkout", "-q", "-b", "other"]);
    repo.commit_file("README.md", "other\n", "Other");
    run_git(repo.path(), &["checkout", "-q", "master"]);
    repo.commit_file("README.md", "master\n", "Master");

    let status = Command::new("git")
        .args(["merge", "other"])
        .current_dir(repo.path())
        .output()
        .unwrap()
        .status;
    assert!(!status.success());

    let git = repo.git();
    assert_eq!(git.state(), GitState::Merge);
    assert!(matches!(
        git.ensure_no_operation(),
        Err(GitError::OperationInProgress {
            operation: GitState::Merge
        })
    ));
}

#[test]
fn remote_url() {
    let repo = TestRepo::new();
    run_git(
        repo.path(),
        &["remote", "add", "origin", "git@github.com:camptocamp/tilecloud.git"],
    );
    let git = repo.git();

    assert_eq!(
        git.remote_url("origin").unwrap().as_deref(),
        Some("git@github.com:camptocamp/tilecloud.git")
    );
    assert_eq!(git.remote_url("upstream").unwrap(), None);
}
