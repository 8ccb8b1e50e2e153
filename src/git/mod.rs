//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! Reads use the `git2` crate through [`Git`]; no other module imports
//! `git2`. Commands that change a checkout (stash, checkout, commit, push)
//! run the `git` executable through [`GitCli`] so that hooks, credential
//! helpers and the user's configuration behave exactly as on the command
//! line.
//!
//! # Example
//!
//! ```no_run
//! use multirepo::core::types::BranchName;
//! use multirepo::git::{Git, GitCli};
//! use std::path::Path;
//!
//! let dir = Path::new(".");
//! let git = Git::open(dir)?;
//! let cli = GitCli::new(dir);
//!
//! cli.fetch("origin")?;
//! let master = BranchName::new("master").unwrap();
//! if let Some(tip) = git.remote_tip("origin", &master)? {
//!     println!("origin/master is at {}", tip.short(7));
//! }
//! # Ok::<(), multirepo::git::GitError>(())
//! ```

mod cli;
mod interface;

pub use cli::GitCli;
pub use interface::{Git, GitError, GitState, WorktreeStatus};
