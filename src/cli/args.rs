//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! `mra` has no subcommands: the positional arguments are the command run
//! in each repository, everything else is a flag.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::core::config::BranchReuse;

/// Apply a command on all the repositories of a list, optionally on a work
/// branch that is then proposed as a pull request.
#[derive(Parser, Debug)]
#[command(name = "mra")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Command to run in each repository, with its arguments (no shell)
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required_unless_present = "completions"
    )]
    pub command: Vec<String>,

    /// YAML file listing the repositories [default: from the user config, else repos.yaml]
    #[arg(long, value_name = "FILE")]
    pub repos: Option<PathBuf>,

    /// Only the repositories of this organization
    #[arg(long, value_name = "ORG")]
    pub org: Option<String>,

    /// Only the repositories containing files of this type (python, yaml, ...)
    #[arg(long = "type", value_name = "TAG")]
    pub file_type: Option<String>,

    /// Stop after the first pull request (or the first repository without pull requests)
    #[arg(long)]
    pub one: bool,

    /// Run the command once in the current directory, without any git operation
    #[arg(long, conflicts_with_all = ["pull_request_branch", "pull_request_on_stabilization_branches"])]
    pub local: bool,

    /// Work branch to commit the changes to and open the pull request from
    #[arg(long, value_name = "BRANCH")]
    pub pull_request_branch: Option<String>,

    /// Commit message and pull request title [default: the command line]
    #[arg(long, value_name = "TITLE")]
    pub pull_request_title: Option<String>,

    /// Pull request body
    #[arg(long, value_name = "BODY")]
    pub pull_request_body: Option<String>,

    /// Open a pull request on every stabilization branch and the master branch
    #[arg(
        long,
        requires = "pull_request_branch_prefix",
        conflicts_with = "pull_request_branch"
    )]
    pub pull_request_on_stabilization_branches: bool,

    /// Work branches are named <PREFIX>-<base branch>
    #[arg(long, value_name = "PREFIX")]
    pub pull_request_branch_prefix: Option<String>,

    /// Commit and push the work branch without opening a pull request
    #[arg(long)]
    pub no_pull_request: bool,

    /// Label of the pull requests, repeatable; an empty label opens them unlabeled
    #[arg(long = "pull-request-label", value_name = "LABEL", default_value = crate::workflow::DEFAULT_LABEL)]
    pub pull_request_labels: Vec<String>,

    /// Command used to open the pull requests [default: from the user config, else the system opener]
    #[arg(long, value_name = "COMMAND", conflicts_with = "no_browser")]
    pub browser: Option<String>,

    /// Only print the pull request links
    #[arg(long)]
    pub no_browser: bool,

    /// What to do when the work branch already exists (fast-forward, recreate)
    #[arg(long, value_name = "POLICY")]
    pub branch_reuse: Option<BranchReuse>,

    /// Validate the configuration and print what would be done
    #[arg(long, visible_alias = "test")]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Print a completion script for this shell and exit
    #[arg(long, value_name = "SHELL", value_enum)]
    pub completions: Option<Shell>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Command line as shown to the user.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// Shells for completion scripts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}
