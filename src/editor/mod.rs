//! editor
//!
//! Scoped, format-preserving file editing.
//!
//! # Architecture
//!
//! Two layers:
//!
//! - [`EditSession`] / [`edit`]: the scoped contract. A file is read once,
//!   mutated in memory and written back at most once, only when the scope
//!   ends without error and the content changed.
//! - Format adapters implementing [`Document`] and [`StructuredDocument`]:
//!   [`YamlDocument`], [`TomlDocument`], [`IniDocument`], [`Json5Document`],
//!   plus the unstructured [`TextDocument`]. [`PreCommitConfig`] and
//!   [`RenovateConfig`] wrap a document with helpers for one file.
//!
//! # Invariants
//!
//! - Parsing then rendering a document without mutation reproduces the input
//!   bytes exactly.
//! - A mutation changes only the text of the nodes it addresses. Comments,
//!   blank lines, key order and quoting elsewhere are left as they were.
//! - New mapping keys are appended after the existing ones.
//! - Sequence writes never extend a sequence implicitly; [`StructuredDocument::push`]
//!   is the explicit way to grow one.
//!
//! # Example
//!
//! ```no_run
//! use multirepo::editor::{edit, EditError, StructuredDocument, TomlDocument};
//!
//! edit("pyproject.toml", |doc: &mut TomlDocument| {
//!     doc.setdefault("tool.black.line-length", 110)?;
//!     Ok::<_, EditError>(())
//! })?;
//! # Ok::<(), EditError>(())
//! ```

mod diff;
mod error;
pub mod ini;
pub mod json5;
mod path;
pub mod precommit;
pub mod renovate;
mod session;
mod text;
pub mod toml;
mod value;
pub mod yaml;

pub use diff::unified_diff;
pub use error::{EditError, ParseError};
pub use ini::IniDocument;
pub use json5::Json5Document;
pub use path::{IntoKeyPath, KeyPath};
pub use precommit::{FormatterHook, PreCommitConfig};
pub use renovate::RenovateConfig;
pub use session::{edit, edit_with, EditOptions, EditOutcome, EditSession};
pub use text::TextDocument;
pub use self::toml::TomlDocument;
pub use value::{Mapping, Value};
pub use yaml::YamlDocument;

/// A file format that can be parsed from and rendered back to text.
pub trait Document: Sized {
    /// Short format name used in errors and logs.
    const FORMAT: &'static str;

    /// Parse file content.
    fn parse(text: &str) -> Result<Self, ParseError>;

    /// The document used when a session creates a missing file.
    fn empty() -> Self;

    /// Render the document. Without mutation this returns the parsed text.
    fn render(&self) -> String;

    /// Whether the document holds no data (comments and whitespace only).
    fn is_empty(&self) -> bool;

    /// The pre-commit hook formatting files of this format, if any.
    fn formatter_hook() -> Option<&'static FormatterHook> {
        None
    }
}

/// Path-addressed access to a structured document.
///
/// Implementors provide the `*_at` primitives; the convenience methods take
/// anything that converts into a [`KeyPath`], such as `"a.b.0"`.
pub trait StructuredDocument: Document {
    /// Value at `path`, or `None` if any segment is missing.
    fn get_at(&self, path: &KeyPath) -> Option<Value>;

    /// Set `path` to `value`, creating intermediate mappings as needed.
    fn set_at(&mut self, path: &KeyPath, value: Value) -> Result<(), EditError>;

    /// Remove the node at `path` along with the comments attached to it.
    fn remove_at(&mut self, path: &KeyPath) -> Result<Option<Value>, EditError>;

    /// Append `value` to the sequence at `path`, creating it if absent.
    fn push_at(&mut self, path: &KeyPath, value: Value) -> Result<(), EditError>;

    /// The whole document as a value tree.
    fn to_value(&self) -> Value;

    fn get(&self, path: impl IntoKeyPath) -> Option<Value> {
        let path = path.into_key_path().ok()?;
        self.get_at(&path)
    }

    /// Value at `path`, or `default` when absent.
    fn get_or(&self, path: impl IntoKeyPath, default: impl Into<Value>) -> Value {
        self.get(path).unwrap_or_else(|| default.into())
    }

    fn contains(&self, path: impl IntoKeyPath) -> bool {
        self.get(path).is_some()
    }

    /// Top-level keys in document order.
    fn keys(&self) -> Vec<String> {
        match self.to_value() {
            Value::Mapping(map) => map.keys().map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    /// Number of top-level entries.
    fn len(&self) -> usize {
        match self.to_value() {
            Value::Mapping(map) => map.len(),
            Value::Sequence(items) => items.len(),
            Value::Null => 0,
            _ => 1,
        }
    }

    fn set(&mut self, path: impl IntoKeyPath, value: impl Into<Value>) -> Result<(), EditError> {
        let path = path.into_key_path()?;
        self.set_at(&path, value.into())
    }

    /// Return the value at `path`, inserting `value` first if it is absent.
    ///
    /// A second call with the same path leaves the document unchanged.
    fn setdefault(
        &mut self,
        path: impl IntoKeyPath,
        value: impl Into<Value>,
    ) -> Result<Value, EditError> {
        let path = path.into_key_path()?;
        if let Some(existing) = self.get_at(&path) {
            return Ok(existing);
        }
        let value = value.into();
        self.set_at(&path, value.clone())?;
        Ok(value)
    }

    /// Remove `path`, returning the removed value if it existed.
    fn remove(&mut self, path: impl IntoKeyPath) -> Result<Option<Value>, EditError> {
        let path = path.into_key_path()?;
        self.remove_at(&path)
    }

    fn push(&mut self, path: impl IntoKeyPath, value: impl Into<Value>) -> Result<(), EditError> {
        let path = path.into_key_path()?;
        self.push_at(&path, value.into())
    }
}
