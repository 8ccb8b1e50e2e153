//! apply command - Run the command in every repository

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::cli::args::Cli;
use crate::core::config::{Config, RepositoryDescriptor};
use crate::core::types::{BranchName, TypeError};
use crate::forge::{create_forge, Forge};
use crate::ui::browser::Browser;
use crate::ui::output::{self, Verbosity};
use crate::workflow::{Mode, Orchestrator, RepoIterator, RunOptions};

/// Run the command as the flags describe.
///
/// Returns `Ok(false)` when at least one repository failed.
///
/// # Errors
///
/// Configuration problems (unreadable config or repository list, invalid
/// branch names) are returned as errors before any repository is touched.
pub fn apply(cli: &Cli) -> Result<bool> {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    let config = Config::load()?;
    if let Some(path) = config.loaded_from() {
        debug!("configuration loaded from {}", path.display());
    }

    if cli.local {
        if cli.dry_run {
            output::print(
                format!("would run '{}' in the current directory", cli.command_line()),
                verbosity,
            );
        } else {
            run_command(&cli.command)?;
        }
        return Ok(true);
    }

    let repos_path = cli
        .repos
        .clone()
        .unwrap_or_else(|| PathBuf::from(config.repos_filename()));
    let repos = RepositoryDescriptor::load_list(&repos_path)?;
    debug!("{} repositories in {}", repos.len(), repos_path.display());

    let options = RunOptions {
        mode: resolve_mode(cli)?,
        one: cli.one,
        org: cli.org.clone(),
        file_type: cli.file_type.clone(),
        verbosity,
    };
    let reuse = cli.branch_reuse.unwrap_or_else(|| config.branch_reuse());

    if cli.dry_run {
        super::plan(&repos, &options, reuse, &cli.command_line())?;
        return Ok(true);
    }

    let forge: Arc<dyn Forge> = Arc::from(create_forge(&config));
    let orchestrator =
        Orchestrator::new(forge, reuse)?.with_labels(cli.pull_request_labels.iter().cloned());
    let report = RepoIterator::new(&repos, options, &orchestrator).run(|_| run_command(&cli.command));

    output::summary(&report, verbosity);

    let browser = Browser::from_settings(cli.browser.as_deref(), cli.no_browser, config.browser());
    for url in report.pull_request_urls() {
        if let Err(e) = browser.open(url) {
            output::warn(format!("{e:#}"), verbosity);
        }
    }

    Ok(report.is_success())
}

/// Work mode selected by the pull request flags.
///
/// The title defaults to the command line.
pub fn resolve_mode(cli: &Cli) -> Result<Mode, TypeError> {
    let title = cli
        .pull_request_title
        .clone()
        .unwrap_or_else(|| cli.command_line());
    let body = cli.pull_request_body.clone();
    let pull_request = !cli.no_pull_request;

    if cli.pull_request_on_stabilization_branches {
        let prefix = cli.pull_request_branch_prefix.clone().unwrap_or_default();
        BranchName::new(prefix.as_str())?;
        return Ok(Mode::BaseBranches {
            prefix,
            title,
            body,
            pull_request,
        });
    }

    match &cli.pull_request_branch {
        Some(branch) => Ok(Mode::Branch {
            branch: BranchName::new(branch.as_str())?,
            title,
            body,
            pull_request,
        }),
        None => Ok(Mode::InPlace),
    }
}

/// Run `argv` in the current directory, its output going to the terminal.
pub fn run_command(argv: &[String]) -> Result<Vec<String>> {
    let (program, args) = argv.split_first().context("no command given")?;
    let line = argv.join(" ");
    debug!("$ {line}");

    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("failed to run '{program}'"))?;
    if !status.success() {
        bail!("'{line}' failed ({status})");
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mra").chain(args.iter().copied())).unwrap()
    }

    mod mode {
        use super::*;

        #[test]
        fn in_place_by_default() {
            assert_eq!(resolve_mode(&cli(&["make", "fix"])).unwrap(), Mode::InPlace);
        }

        #[test]
        fn branch_with_default_title() {
            let mode = resolve_mode(&cli(&["--pull-request-branch", "fix", "make", "fix"])).unwrap();
            assert_eq!(
                mode,
                Mode::Branch {
                    branch: BranchName::new("fix").unwrap(),
                    title: "make fix".to_string(),
                    body: None,
                    pull_request: true,
                }
            );
        }

        #[test]
        fn stabilization_branches() {
            let mode = resolve_mode(&cli(&[
                "--pull-request-on-stabilization-branches",
                "--pull-request-branch-prefix",
                "fix-ci",
                "--pull-request-title",
                "Fix the CI",
                "--no-pull-request",
                "make",
            ]))
            .unwrap();
            assert_eq!(
                mode,
                Mode::BaseBranches {
                    prefix: "fix-ci".to_string(),
                    title: "Fix the CI".to_string(),
                    body: None,
                    pull_request: false,
                }
            );
        }

        #[test]
        fn invalid_branch_name() {
            assert!(resolve_mode(&cli(&["--pull-request-branch", "a..b", "true"])).is_err());
        }
    }

    mod command {
        use super::*;

        #[test]
        fn success() {
            assert!(run_command(&["true".to_string()]).unwrap().is_empty());
        }

        #[test]
        fn failure_status() {
            let err = run_command(&["false".to_string()]).unwrap_err();
            assert!(err.to_string().contains("'false' failed"));
        }

        #[test]
        fn missing_program() {
            let err = run_command(&["mra-no-such-program".to_string()]).unwrap_err();
            assert!(err.to_string().contains("mra-no-such-program"));
        }

        #[test]
        fn empty() {
            assert!(run_command(&[]).is_err());
        }
    }
}
