//! plan command - Print what a run would do (`--dry-run`)
//!
//! Checkouts are only opened to check their remote: no git command runs and
//! no repository is touched.

use anyhow::Result;

use crate::core::config::{BranchReuse, RepositoryDescriptor};
use crate::git::Git;
use crate::ui::output;
use crate::workflow::{Mode, RunOptions};

/// Print the plan.
pub fn plan(
    repos: &[RepositoryDescriptor],
    options: &RunOptions,
    reuse: BranchReuse,
    command: &str,
) -> Result<()> {
    for line in plan_lines(repos, options, reuse, command)? {
        output::print(line, options.verbosity);
    }
    Ok(())
}

/// The plan, one line per step.
pub fn plan_lines(
    repos: &[RepositoryDescriptor],
    options: &RunOptions,
    reuse: BranchReuse,
    command: &str,
) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut selected = 0;

    for repo in repos.iter().filter(|r| options.matches_org(r)) {
        if let Some(file_type) = options.file_type.as_deref() {
            if !repo.types.is_empty() && !repo.types.iter().any(|t| t == file_type) {
                continue;
            }
        }
        selected += 1;

        lines.push(output::format_banner(&repo.name));
        if repo.dir.is_dir() {
            lines.extend(checkout_problem(repo));
        } else {
            lines.push(format!("  missing directory {}", repo.dir.display()));
        }
        if let Some(file_type) = options.file_type.as_deref() {
            if repo.types.is_empty() {
                lines.push(format!("  only if it contains {file_type} files"));
            }
        }

        if let Mode::InPlace = options.mode {
            lines.push(format!("  run '{command}' in {}", repo.dir.display()));
            continue;
        }

        for request in options.mode.requests(repo)? {
            let publish = if request.pull_request {
                "push and open a pull request"
            } else {
                "push"
            };
            lines.push(format!(
                "  {} from {}/{} ({}): run '{command}', commit '{}', {publish}",
                request.branch,
                repo.remote(),
                request.base,
                reuse.as_str(),
                request.title,
            ));
        }
    }

    lines.push(format!(
        "{selected} of {} repositories selected",
        repos.len()
    ));
    if options.one {
        lines.push("stopping after the first result".to_string());
    }
    Ok(lines)
}

/// What is wrong with the checkout of `repo`, if anything.
///
/// Only in-place runs work without a git checkout.
fn checkout_problem(repo: &RepositoryDescriptor) -> Option<String> {
    let git = match Git::open(&repo.dir) {
        Ok(git) => git,
        Err(_) => return Some("  not a git checkout".to_string()),
    };
    let remote = repo.remote();
    match git.remote_url(remote) {
        Ok(None) => Some(format!("  no remote named '{remote}'")),
        Ok(Some(url)) => match Git::parse_github_remote(&url) {
            Some(slug) if slug != repo.name => {
                Some(format!("  remote '{remote}' points to {slug}"))
            }
            _ => None,
        },
        Err(e) => Some(format!("  {e}")),
    }
}
