//! editor::json5::tree
//!
//! Lossless JSON5 syntax tree.
//!
//! Trivia (whitespace and comments) belongs to the entry that follows it: an
//! entry's `leading` holds everything between the previous comma, or the
//! opening bracket, and its key or value. Whatever is left before the
//! closing bracket is the container's `trailing`. The first line of a
//! `leading` therefore ends the previous line, and the rest sits above the
//! entry.

use std::ops::Range;

use crate::editor::value::format_float;
use crate::editor::Value;

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Object(Container),
    Array(Container),
    Scalar(Scalar),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Container {
    pub entries: Vec<Entry>,
    pub trailing: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub leading: String,
    /// Object members only.
    pub key: Option<Key>,
    pub value: Node,
    /// Trivia between the value and its comma; empty without a comma.
    pub after: String,
    pub comma: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Key {
    /// The key as written, quotes included.
    pub raw: String,
    pub name: String,
    /// From the end of the key to the value, colon included.
    pub colon: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Scalar {
    pub raw: String,
    pub value: Value,
}

/// Writing conventions detected in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Style {
    /// One indentation level.
    pub indent: String,
    pub quote: char,
    pub quote_keys: bool,
    pub trailing_commas: bool,
    pub newline: &'static str,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            quote: '"',
            quote_keys: false,
            trailing_commas: true,
            newline: "\n",
        }
    }
}

impl Node {
    pub fn render(&self, out: &mut String) {
        match self {
            Node::Object(container) => container.render('{', '}', out),
            Node::Array(container) => container.render('[', ']', out),
            Node::Scalar(scalar) => out.push_str(&scalar.raw),
        }
    }

    /// Duplicate keys read as the last one, as JSON5 readers do.
    pub fn to_value(&self) -> Value {
        match self {
            Node::Object(container) => {
                let mut map = crate::editor::Mapping::new();
                for entry in &container.entries {
                    if let Some(key) = &entry.key {
                        map.insert(key.name.clone(), entry.value.to_value());
                    }
                }
                Value::Mapping(map)
            }
            Node::Array(container) => Value::Sequence(
                container
                    .entries
                    .iter()
                    .map(|entry| entry.value.to_value())
                    .collect(),
            ),
            Node::Scalar(scalar) => scalar.value.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Node::Object(_) => "mapping",
            Node::Array(_) => "sequence",
            Node::Scalar(scalar) => scalar.value.kind(),
        }
    }
}

impl Container {
    fn render(&self, open: char, close: char, out: &mut String) {
        out.push(open);
        for entry in &self.entries {
            out.push_str(&entry.leading);
            if let Some(key) = &entry.key {
                out.push_str(&key.raw);
                out.push_str(&key.colon);
            }
            entry.value.render(out);
            out.push_str(&entry.after);
            if entry.comma {
                out.push(',');
            }
        }
        out.push_str(&self.trailing);
        out.push(close);
    }

    /// Whether the entries sit on lines of their own.
    pub fn is_multiline(&self) -> bool {
        self.trailing.contains('\n') || self.entries.iter().any(|entry| entry.leading.contains('\n'))
    }

    /// Index of the member named `key`; the last one if it is repeated.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|entry| entry.key.as_ref().is_some_and(|k| k.name == key))
    }
}

/// Length of the part of `trivia` that ends the current line, newline
/// included. Newlines inside block comments do not count.
pub(crate) fn line_end(trivia: &str) -> usize {
    let bytes = trivia.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1)) {
            (b'\n', _) => return i + 1,
            (b'/', Some(b'*')) => match trivia[i + 2..].find("*/") {
                Some(end) => i += end + 4,
                None => return trivia.len(),
            },
            (b'/', Some(b'/')) => match trivia[i..].find('\n') {
                Some(end) => return i + end + 1,
                None => return trivia.len(),
            },
            _ => i += 1,
        }
    }
    trivia.len()
}

/// Indentation of the last line of `trivia`, if it spans several lines.
pub(crate) fn last_indent(trivia: &str) -> Option<&str> {
    let line = &trivia[trivia.rfind('\n')? + 1..];
    Some(&line[..line.len() - line.trim_start_matches([' ', '\t']).len()])
}

/// Comments and whitespace runs of `trivia`, as byte ranges.
fn tokens(trivia: &str) -> Vec<(bool, Range<usize>)> {
    let bytes = trivia.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let comment = match (bytes[i], bytes.get(i + 1)) {
            (b'/', Some(b'*')) => {
                i = trivia[i + 2..].find("*/").map_or(trivia.len(), |end| i + end + 4);
                true
            }
            (b'/', Some(b'/')) => {
                i = trivia[i..].find('\n').map_or(trivia.len(), |end| i + end);
                true
            }
            _ => {
                while i < bytes.len() && !(bytes[i] == b'/' && matches!(bytes.get(i + 1), Some(b'*' | b'/'))) {
                    i += 1;
                }
                false
            }
        };
        tokens.push((comment, start..i));
    }
    tokens
}

/// The comments directly above an entry: on the lines before its key, with
/// no blank line in between. `leading` is the entry's leading trivia.
pub(crate) fn attached_comments(leading: &str) -> Option<Range<usize>> {
    let own = line_end(leading);
    if own == leading.len() {
        return None;
    }
    let mut range: Option<Range<usize>> = None;
    let mut newlines = 0;
    for (comment, span) in tokens(leading).into_iter().rev() {
        if span.end <= own {
            break;
        }
        if comment {
            let adjacent = if range.is_none() { newlines == 1 } else { newlines <= 1 };
            if !adjacent {
                break;
            }
            newlines = 0;
            range = Some(span.start..range.map_or(span.end, |r| r.end));
        } else {
            newlines += leading[span.clone()].matches('\n').count();
            if range.is_none() && newlines > 1 {
                break;
            }
        }
    }
    range.filter(|r| r.start >= own)
}

/// The text of a comment without its markers; lines are joined with `\n`.
pub(crate) fn comment_text(comment: &str) -> String {
    if let Some(line) = comment.strip_prefix("//") {
        return line.trim().to_string();
    }
    let body = comment
        .strip_prefix("/*")
        .and_then(|c| c.strip_suffix("*/"))
        .unwrap_or(comment);
    let body = body.strip_prefix('*').unwrap_or(body);
    let lines: Vec<&str> = body
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix("* ")
                .or_else(|| line.strip_prefix('*'))
                .unwrap_or(line)
                .trim()
        })
        .collect();
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
    lines[start..end].join("\n")
}

/// Lines kept from the trivia above a removed entry: everything up to the
/// last blank line. The comments right above the entry go with it.
pub(crate) fn kept_above(own: &str) -> &str {
    let mut end = 0;
    let mut at = 0;
    for line in own.split_inclusive('\n') {
        at += line.len();
        if line.ends_with('\n') && line.trim().is_empty() {
            end = at;
        }
    }
    &own[..end]
}

/// ES5 identifier names, which need no quotes as keys.
pub(crate) fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

pub(crate) fn quote(s: &str, quote: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

impl Style {
    pub fn key(&self, key: &str) -> String {
        if !self.quote_keys && is_identifier(key) {
            key.to_string()
        } else {
            quote(key, self.quote)
        }
    }

    /// `value` as JSON5 text starting on a line indented by `indent`.
    ///
    /// Objects and arrays of collections spread over several lines; arrays
    /// of scalars and empty collections stay on one.
    pub fn value(&self, value: &Value, indent: &str) -> String {
        let inner = format!("{indent}{}", self.indent);
        let close = |out: &mut String, last: bool| {
            if !last || self.trailing_commas {
                out.push(',');
            }
            out.push_str(self.newline);
        };
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) if f.is_nan() => "NaN".to_string(),
            Value::Float(f) if f.is_infinite() && *f > 0.0 => "Infinity".to_string(),
            Value::Float(f) if f.is_infinite() => "-Infinity".to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => quote(s, self.quote),
            Value::Sequence(items) if items.is_empty() => "[]".to_string(),
            Value::Mapping(map) if map.is_empty() => "{}".to_string(),
            Value::Sequence(items) if items.iter().all(Value::is_scalar) => {
                let items: Vec<String> = items.iter().map(|item| self.value(item, indent)).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Sequence(items) => {
                let mut out = format!("[{}", self.newline);
                for (i, item) in items.iter().enumerate() {
                    out.push_str(&inner);
                    out.push_str(&self.value(item, &inner));
                    close(&mut out, i + 1 == items.len());
                }
                out.push_str(indent);
                out.push(']');
                out
            }
            Value::Mapping(map) => {
                let mut out = format!("{{{}", self.newline);
                for (i, (key, item)) in map.iter().enumerate() {
                    out.push_str(&inner);
                    out.push_str(&self.key(key));
                    out.push_str(": ");
                    out.push_str(&self.value(item, &inner));
                    close(&mut out, i + 1 == map.len());
                }
                out.push_str(indent);
                out.push('}');
                out
            }
        }
    }

    /// A `/** ... */` block for `comment`, starting at `indent`.
    pub fn comment(&self, comment: &str, indent: &str) -> String {
        let lines: Vec<&str> = comment.lines().collect();
        match lines.as_slice() {
            [line] => format!("/** {line} */"),
            _ => {
                let mut out = format!("/**{}", self.newline);
                for line in lines {
                    out.push_str(indent);
                    out.push_str(if line.is_empty() { " *" } else { " * " });
                    out.push_str(line);
                    out.push_str(self.newline);
                }
                out.push_str(indent);
                out.push_str(" */");
                out
            }
        }
    }
}
