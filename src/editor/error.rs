//! editor::error
//!
//! Error types for the scoped file editor and the format adapters.

use std::path::PathBuf;

use thiserror::Error;

/// A syntax error reported by a format adapter, without file context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{format} syntax error on line {line}: {message}")]
pub struct ParseError {
    /// Adapter name ("yaml", "toml", "ini").
    pub format: &'static str,
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(format: &'static str, line: usize, message: impl Into<String>) -> Self {
        Self {
            format,
            line,
            message: message.into(),
        }
    }
}

/// Errors from edit sessions and document mutations.
#[derive(Debug, Error)]
pub enum EditError {
    /// The file does not exist and the session was not allowed to create it.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("'{}' is not valid UTF-8", path.display())]
    Encoding { path: PathBuf },

    #[error("failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("invalid path '{0}'")]
    InvalidPath(String),

    /// A path segment walks into a scalar.
    #[error("'{path}' is a {found}, it has no children")]
    NotAContainer { path: String, found: &'static str },

    /// Sequence writes never extend implicitly.
    #[error("index {index} is out of range for '{path}' (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    /// The value cannot be written in this format without losing information.
    #[error("cannot store {kind} at '{path}' in {format}: {reason}")]
    Unrepresentable {
        format: &'static str,
        path: String,
        kind: &'static str,
        reason: String,
    },

    #[error("invalid regular expression: {0}")]
    Pattern(#[from] regex::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = EditError::Parse {
            path: PathBuf::from("ci.yaml"),
            source: ParseError::new("yaml", 3, "bad indentation"),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse 'ci.yaml': yaml syntax error on line 3: bad indentation"
        );
    }

    #[test]
    fn unrepresentable_display() {
        let err = EditError::Unrepresentable {
            format: "toml",
            path: "tool.x".into(),
            kind: "null",
            reason: "TOML has no null value".into(),
        };
        assert!(err.to_string().contains("cannot store null at 'tool.x' in toml"));
    }
}
