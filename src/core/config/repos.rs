//! core::config::repos
//!
//! The repository list (`repos.yaml`).
//!
//! # Format
//!
//! ```yaml
//! - dir: ~/src/c2cgeoportal
//!   name: camptocamp/c2cgeoportal
//!   types: [python, javascript]
//!   master_branch: master
//!   stabilization_branches: [2.7, "2.8"]
//!   folders_to_clean: [node_modules]
//! ```
//!
//! Descriptors are validated when loaded: names must be `owner/repo` and
//! branch names must be valid git refnames. Relative directories resolve
//! against the directory given to [`RepositoryDescriptor::parse_list`]
//! (the current directory for [`RepositoryDescriptor::load_list`]).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;
use crate::core::types::{BranchName, RepoSlug};

/// One entry of the repository list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    /// Absolute path of the checkout.
    pub dir: PathBuf,
    pub name: RepoSlug,
    /// File-type tags the repository is known to contain.
    pub types: Vec<String>,
    pub master_branch: BranchName,
    pub stabilization_branches: Vec<BranchName>,
    /// Directories removed before any branch operation.
    pub folders_to_clean: Vec<String>,
    pub remote: Option<String>,
    /// Run `git clean -dfX` and stash ignored files too.
    pub clean: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    dir: String,
    name: String,
    #[serde(default)]
    types: Vec<String>,
    master_branch: Option<String>,
    #[serde(default)]
    stabilization_branches: Vec<BranchEntry>,
    #[serde(default)]
    folders_to_clean: Vec<String>,
    remote: Option<String>,
    clean: Option<bool>,
}

/// Stabilization branches are often written as bare version numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BranchEntry {
    Name(String),
    Number(serde_yaml::Number),
}

impl BranchEntry {
    fn into_string(self) -> String {
        match self {
            BranchEntry::Name(name) => name,
            BranchEntry::Number(number) => number.to_string(),
        }
    }
}

impl RepositoryDescriptor {
    /// Read a repository list, resolving relative directories against the
    /// current directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read, is not a list of
    /// descriptors, or contains an invalid name or branch.
    pub fn load_list(path: &Path) -> Result<Vec<Self>, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let base = std::env::current_dir().map_err(|e| ConfigError::ReadError {
            path: PathBuf::from("."),
            source: e,
        })?;
        Self::parse_list(&contents, &base).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse a repository list from YAML text.
    ///
    /// An empty document is an empty list.
    pub fn parse_list(contents: &str, base: &Path) -> Result<Vec<Self>, ConfigError> {
        let raw: Option<Vec<RawDescriptor>> =
            serde_yaml::from_str(contents).map_err(|e| ConfigError::ParseError {
                path: PathBuf::new(),
                message: e.to_string(),
            })?;
        raw.unwrap_or_default()
            .into_iter()
            .map(|raw| Self::from_raw(raw, base))
            .collect()
    }

    fn from_raw(raw: RawDescriptor, base: &Path) -> Result<Self, ConfigError> {
        let invalid = |e: crate::core::types::TypeError| ConfigError::InvalidValue(e.to_string());

        let name = RepoSlug::new(&raw.name).map_err(invalid)?;
        let master_branch =
            BranchName::new(raw.master_branch.as_deref().unwrap_or("master")).map_err(invalid)?;
        let stabilization_branches = raw
            .stabilization_branches
            .into_iter()
            .map(|entry| BranchName::new(entry.into_string()).map_err(invalid))
            .collect::<Result<Vec<_>, _>>()?;

        if raw.dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue(format!("{name}: dir cannot be empty")));
        }
        if raw.remote.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::InvalidValue(format!("{name}: remote cannot be empty")));
        }

        Ok(Self {
            dir: resolve_dir(&raw.dir, base)?,
            name,
            types: raw.types,
            master_branch,
            stabilization_branches,
            folders_to_clean: raw.folders_to_clean,
            remote: raw.remote,
            clean: raw.clean.unwrap_or(true),
        })
    }

    /// Remote to fetch from and push to.
    ///
    /// Defaults to "origin" if not configured.
    pub fn remote(&self) -> &str {
        self.remote.as_deref().unwrap_or("origin")
    }

    /// Stabilization branches followed by the master branch.
    pub fn base_branches(&self) -> Vec<BranchName> {
        let mut branches = self.stabilization_branches.clone();
        branches.push(self.master_branch.clone());
        branches
    }
}

/// Expand `~/` and make the path absolute.
fn resolve_dir(dir: &str, base: &Path) -> Result<PathBuf, ConfigError> {
    if let Some(rest) = dir.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        return Ok(home.join(rest));
    }
    if dir == "~" {
        return dirs::home_dir().ok_or(ConfigError::NoHomeDir);
    }
    let path = PathBuf::from(dir);
    Ok(if path.is_absolute() { path } else { base.join(path) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LIST: &str = "\
- dir: /src/tilecloud
  name: camptocamp/tilecloud
- dir: c2cgeoportal
  name: camptocamp/c2cgeoportal
  types: [python]
  master_branch: main
  stabilization_branches: [2.7, '2.8', prod-2-6]
  folders_to_clean: [node_modules]
  remote: upstream
  clean: false
";

    fn parse(text: &str) -> Result<Vec<RepositoryDescriptor>, ConfigError> {
        RepositoryDescriptor::parse_list(text, Path::new("/work"))
    }

    #[test]
    fn defaults() {
        let repos = parse(LIST).unwrap();
        let first = &repos[0];
        assert_eq!(first.dir, PathBuf::from("/src/tilecloud"));
        assert_eq!(first.master_branch.as_str(), "master");
        assert!(first.stabilization_branches.is_empty());
        assert!(first.types.is_empty());
        assert!(first.clean);
        assert_eq!(first.remote(), "origin");
    }

    #[test]
    fn all_fields() {
        let repos = parse(LIST).unwrap();
        let second = &repos[1];
        assert_eq!(second.dir, PathBuf::from("/work/c2cgeoportal"));
        assert_eq!(second.name.owner(), "camptocamp");
        assert_eq!(second.types, vec!["python".to_string()]);
        assert_eq!(second.master_branch.as_str(), "main");
        assert_eq!(
            second
                .stabilization_branches
                .iter()
                .map(BranchName::as_str)
                .collect::<Vec<_>>(),
            vec!["2.7", "2.8", "prod-2-6"]
        );
        assert_eq!(second.folders_to_clean, vec!["node_modules".to_string()]);
        assert_eq!(second.remote(), "upstream");
        assert!(!second.clean);
    }

    #[test]
    fn base_branches_end_with_master() {
        let repos = parse(LIST).unwrap();
        let names: Vec<_> = repos[1]
            .base_branches()
            .into_iter()
            .map(|b| b.as_str().to_string())
            .collect();
        assert_eq!(names, vec!["2.7", "2.8", "prod-2-6", "main"]);
    }

    #[test]
    fn empty_document_is_empty_list() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("# nothing yet\n").unwrap().is_empty());
    }

    #[test]
    fn home_is_expanded() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let repos = parse("- dir: ~/src/x\n  name: a/x\n").unwrap();
        assert_eq!(repos[0].dir, home.join("src/x"));
    }

    #[test]
    fn invalid_name_rejected() {
        let result = parse("- dir: /x\n  name: just-a-name\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn invalid_branch_rejected() {
        let result = parse("- dir: /x\n  name: a/x\n  stabilization_branches: ['bad..name']\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn unknown_fields_rejected() {
        let result = parse("- dir: /x\n  name: a/x\n  colour: red\n");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn missing_name_rejected() {
        assert!(parse("- dir: /x\n").is_err());
    }

    #[test]
    fn load_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repos.yaml");
        fs::write(&path, "- dir: [not, a, string]\n  name: a/x\n").unwrap();

        match RepositoryDescriptor::load_list(&path) {
            Err(ConfigError::ParseError { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn load_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = RepositoryDescriptor::load_list(&temp.path().join("repos.yaml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
