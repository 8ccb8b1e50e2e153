//! editor::text
//!
//! Plain text documents.

use regex::Regex;

use super::{Document, EditError, ParseError};

/// An unstructured file, edited as one string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocument {
    pub content: String,
}

impl TextDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Replace every match of `pattern` with `replacement` (`$1` style
    /// references allowed). Returns the number of replacements.
    pub fn replace(&mut self, pattern: &str, replacement: &str) -> Result<usize, EditError> {
        let re = Regex::new(pattern)?;
        Ok(self.replace_regex(&re, replacement))
    }

    pub fn replace_regex(&mut self, re: &Regex, replacement: &str) -> usize {
        let count = re.find_iter(&self.content).count();
        if count > 0 {
            self.content = re.replace_all(&self.content, replacement).into_owned();
        }
        count
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.content.contains(needle)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.lines()
    }

    /// Append a line, adding the missing newline before it if needed.
    pub fn push_line(&mut self, line: &str) {
        if !self.content.is_empty() && !self.content.ends_with('\n') {
            self.content.push('\n');
        }
        self.content.push_str(line);
        self.content.push('\n');
    }
}

impl Document for TextDocument {
    const FORMAT: &'static str = "text";

    fn parse(text: &str) -> Result<Self, ParseError> {
        Ok(Self::new(text))
    }

    fn empty() -> Self {
        Self::default()
    }

    fn render(&self) -> String {
        self.content.clone()
    }

    fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}
