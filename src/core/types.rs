//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RepoSlug`] - Hosted repository identity (`owner/repo`)
//!
//! # Validation
//!
//! These types enforce validity at construction time. A repository list
//! with a malformed branch or repository name is rejected before any
//! repository is touched.
//!
//! # Examples
//!
//! ```
//! use multirepo::core::types::{BranchName, RepoSlug};
//!
//! let branch = BranchName::new("ci/update-actions").unwrap();
//! let slug = RepoSlug::new("camptocamp/c2cgeoportal").unwrap();
//! assert_eq!(slug.owner(), "camptocamp");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(RepoSlug::new("no-slash").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid repository name: {0}")]
    InvalidRepoSlug(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// # Example
///
/// ```
/// use multirepo::core::types::BranchName;
///
/// let name = BranchName::new("prefix-2.7").unwrap();
/// assert_eq!(name.as_str(), "prefix-2.7");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let fail = |reason: &str| Err(TypeError::InvalidBranchName(format!("'{name}' {reason}")));

        if name.is_empty() {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be empty".into(),
            ));
        }
        if name == "@" {
            return fail("is reserved");
        }
        if name.starts_with('.') || name.starts_with('-') {
            return fail("cannot start with '.' or '-'");
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return fail("cannot end with '.lock' or '/'");
        }
        for forbidden in ["..", "@{", "//"] {
            if name.contains(forbidden) {
                return fail(&format!("cannot contain '{forbidden}'"));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name
            .chars()
            .find(|c| INVALID_CHARS.contains(c) || c.is_ascii_control())
        {
            return fail(&format!("cannot contain {c:?}"));
        }

        for component in name.split('/').filter(|c| !c.is_empty()) {
            if component.starts_with('.') || component.ends_with(".lock") {
                return fail("has a path component starting with '.' or ending with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256), normalized to lowercase.
///
/// ```
/// use multirepo::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a 40 or 64 character hex id.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity of a hosted repository, `owner/repo`.
///
/// ```
/// use multirepo::core::types::RepoSlug;
///
/// let slug = RepoSlug::new("camptocamp/tilecloud").unwrap();
/// assert_eq!(slug.owner(), "camptocamp");
/// assert_eq!(slug.repo(), "tilecloud");
/// assert_eq!(slug.pulls_url(), "https://github.com/camptocamp/tilecloud/pulls");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoSlug {
    owner: String,
    repo: String,
}

impl RepoSlug {
    /// Parse and validate an `owner/repo` string.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepoSlug` unless the input is exactly two
    /// non-empty segments without whitespace.
    pub fn new(slug: impl AsRef<str>) -> Result<Self, TypeError> {
        let slug = slug.as_ref();
        let (owner, repo) = slug
            .split_once('/')
            .ok_or_else(|| TypeError::InvalidRepoSlug(format!("'{slug}' is not owner/repo")))?;

        let valid = |part: &str| {
            !part.is_empty()
                && !part.contains('/')
                && !part.chars().any(|c| c.is_whitespace() || c.is_control())
        };
        if !valid(owner) || !valid(repo) {
            return Err(TypeError::InvalidRepoSlug(format!(
                "'{slug}' is not owner/repo"
            )));
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// The user or organization owning the repository.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name without its owner.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Web page listing the repository's pull requests.
    pub fn pulls_url(&self) -> String {
        format!("https://github.com/{}/{}/pulls", self.owner, self.repo)
    }
}

impl TryFrom<String> for RepoSlug {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RepoSlug> for String {
    fn from(slug: RepoSlug) -> Self {
        slug.to_string()
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
