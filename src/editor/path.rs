//! editor::path
//!
//! Segmented paths into a document tree.
//!
//! A path is written with dots (`jobs.build.steps.0.uses`). Numeric segments
//! address sequence items when the parent is a sequence and are plain keys
//! otherwise. Keys that themselves contain dots are built with
//! [`KeyPath::from_segments`].

use std::fmt;

use super::EditError;

/// A parsed path into a structured document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Parse a dotted path.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidPath`] for an empty path or an empty segment.
    ///
    /// ```
    /// use multirepo::editor::KeyPath;
    ///
    /// let path = KeyPath::parse("repos.0.hooks").unwrap();
    /// assert_eq!(path.segments(), ["repos", "0", "hooks"]);
    /// assert!(KeyPath::parse("a..b").is_err());
    /// ```
    pub fn parse(path: &str) -> Result<Self, EditError> {
        if path.is_empty() {
            return Err(EditError::InvalidPath(path.to_string()));
        }
        Self::from_segments(path.split('.'))
    }

    /// Build a path from explicit segments, no dot splitting.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, EditError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(EditError::InvalidPath(segments.join(".")));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// All segments but the last, and the last one.
    pub fn split_last(&self) -> (&[String], &str) {
        match self.segments.split_last() {
            Some((last, parents)) => (parents, last.as_str()),
            None => (&[], ""),
        }
    }

    /// A new path extended by one segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// The path of the first `len` segments, for error messages.
    pub(crate) fn prefix(&self, len: usize) -> String {
        self.segments[..len.min(self.segments.len())].join(".")
    }
}

/// Interpret a segment as a sequence index.
pub(crate) fn as_index(segment: &str) -> Option<usize> {
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        segment.parse().ok()
    } else {
        None
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl std::str::FromStr for KeyPath {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Conversion into a [`KeyPath`], so document methods accept `"a.b"` directly.
pub trait IntoKeyPath {
    fn into_key_path(self) -> Result<KeyPath, EditError>;
}

impl IntoKeyPath for KeyPath {
    fn into_key_path(self) -> Result<KeyPath, EditError> {
        Ok(self)
    }
}

impl IntoKeyPath for &KeyPath {
    fn into_key_path(self) -> Result<KeyPath, EditError> {
        Ok(self.clone())
    }
}

impl IntoKeyPath for &str {
    fn into_key_path(self) -> Result<KeyPath, EditError> {
        KeyPath::parse(self)
    }
}

impl IntoKeyPath for &String {
    fn into_key_path(self) -> Result<KeyPath, EditError> {
        KeyPath::parse(self)
    }
}

impl<const N: usize> IntoKeyPath for [&str; N] {
    fn into_key_path(self) -> Result<KeyPath, EditError> {
        KeyPath::from_segments(self)
    }
}
