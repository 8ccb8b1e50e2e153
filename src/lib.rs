//! multirepo - apply scripted changes across many repositories
//!
//! `multirepo` runs one change over a list of git repositories: edit files
//! in place, commit the result on a work branch and open a pull request,
//! optionally on every maintained stabilization branch too.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface of the `mra` binary
//! - [`workflow`] - Repository iteration and the branch/pull request lifecycle
//! - [`editor`] - Scoped, format-preserving editing of YAML, TOML, INI, JSON5 and text files
//! - [`core`] - Domain types and configuration
//! - [`git`] - Git reads (libgit2) and porcelain commands
//! - [`forge`] - Pull requests on the code hosting service (GitHub)
//! - [`ui`] - User-facing output
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use multirepo::core::config::{BranchReuse, RepositoryDescriptor};
//! use multirepo::core::types::BranchName;
//! use multirepo::editor::{edit, EditError, StructuredDocument, YamlDocument};
//! use multirepo::forge::{create_forge, Forge};
//! use multirepo::core::config::Config;
//! use multirepo::workflow::{Mode, Orchestrator, RepoIterator, RunOptions};
//!
//! let config = Config::load()?;
//! let repos = RepositoryDescriptor::load_list("repos.yaml".as_ref())?;
//! let forge: Arc<dyn Forge> = Arc::from(create_forge(&config));
//! let orchestrator = Orchestrator::new(forge, BranchReuse::FastForward)?;
//!
//! let mode = Mode::Branch {
//!     branch: BranchName::new("pre-commit-ci")?,
//!     title: "Update the pre-commit CI schedule".to_string(),
//!     body: None,
//!     pull_request: true,
//! };
//! let report = RepoIterator::new(&repos, RunOptions::new(mode), &orchestrator).run(|_| {
//!     edit(".pre-commit-config.yaml", |doc: &mut YamlDocument| {
//!         doc.set("ci.autoupdate_schedule", "quarterly")?;
//!         Ok::<_, EditError>(())
//!     })?;
//!     Ok(vec!["schedule set to quarterly".to_string()])
//! });
//!
//! for url in report.pull_request_urls() {
//!     println!("{url}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod core;
pub mod editor;
pub mod forge;
pub mod git;
pub mod ui;
pub mod workflow;
