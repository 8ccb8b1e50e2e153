//! editor::json5
//!
//! Comment-preserving JSON5 documents, as used by Renovate configurations.
//!
//! The whole text is parsed into a lossless tree where every comment and
//! whitespace run is attached to the entry that follows it. Writes replace
//! the value of one entry, or insert and remove whole entries:
//!
//! - a replaced string keeps its quote character,
//! - new entries copy the indentation, quotes and trailing-comma habit of
//!   the document,
//! - a removed entry takes the comment lines right above it along.

mod parser;
mod tree;

use std::iter;

use tracing::trace;

use self::tree::{
    attached_comments, comment_text, kept_above, last_indent, line_end, Container, Entry, Key,
    Node, Style,
};
use super::path::as_index;
use super::{
    Document, EditError, IntoKeyPath, KeyPath, ParseError, StructuredDocument, Value,
};

/// A parsed JSON5 file.
#[derive(Debug, Clone)]
pub struct Json5Document {
    prefix: String,
    root: Option<Node>,
    suffix: String,
    style: Style,
}

impl Json5Document {
    /// Comment right above the entry at `path`, without its markers.
    ///
    /// ```
    /// use multirepo::editor::{Document, Json5Document};
    ///
    /// let doc = Json5Document::parse("{\n  /** Pinned */\n  node: '18',\n}\n").unwrap();
    /// assert_eq!(doc.comment("node").as_deref(), Some("Pinned"));
    /// ```
    pub fn comment(&self, path: impl IntoKeyPath) -> Option<String> {
        let path = path.into_key_path().ok()?;
        let (parents, last) = path.split_last();
        let container = container_of(self.root.as_ref()?, parents)?;
        let leading = &container.entries[entry_index(container, last)?].leading;
        attached_comments(leading).map(|range| comment_text(&leading[range]))
    }

    /// Put `comment` above the entry at `path`, replacing the one there. An
    /// empty comment removes it.
    ///
    /// Entries of single-line collections cannot take a comment.
    pub fn set_comment(&mut self, path: impl IntoKeyPath, comment: &str) -> Result<(), EditError> {
        let path = path.into_key_path()?;
        let (parents, last) = path.split_last();
        let style = self.style.clone();
        let (container, indent) = self
            .root
            .as_mut()
            .and_then(|root| container_of_mut(root, parents, String::new()))
            .ok_or_else(|| EditError::InvalidPath(path.to_string()))?;
        let index = entry_index(container, last).ok_or_else(|| EditError::InvalidPath(path.to_string()))?;
        if !container.is_multiline() {
            return Err(unrepresentable(&path, "comment", "the collection is on a single line"));
        }
        let indent = entry_indent(container, index, &indent);
        let leading = &mut container.entries[index].leading;
        let text = style.comment(comment, &indent);
        match attached_comments(leading) {
            Some(range) if comment.is_empty() => {
                let start = leading[..range.start].rfind('\n').map_or(0, |i| i + 1);
                let end = leading[range.end..].find('\n').map_or(leading.len(), |i| range.end + i + 1);
                leading.replace_range(start..end, "");
            }
            Some(range) => leading.replace_range(range, &text),
            None if comment.is_empty() => {}
            None => {
                leading.push_str(&text);
                leading.push_str(style.newline);
                leading.push_str(&indent);
            }
        }
        Ok(())
    }

    /// Append `value` to the array at `path` with `comment` above it.
    pub fn push_with_comment(
        &mut self,
        path: impl IntoKeyPath,
        value: impl Into<Value>,
        comment: &str,
    ) -> Result<(), EditError> {
        let path = path.into_key_path()?;
        let value = value.into();
        self.restoring(|doc| {
            if doc.get_at(&path).map_or(true, |v| v.is_null()) {
                doc.set_at(&path, Value::Sequence(Vec::new()))?;
            }
            doc.push_entry(&path, &value, Some(comment))
        })
    }

    /// Run `op`, rolling the document back if it fails.
    pub(crate) fn restoring<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, EditError>,
    ) -> Result<T, EditError> {
        let backup = self.clone();
        let result = op(self);
        if result.is_err() {
            *self = backup;
        }
        result
    }

    fn root_mut(&mut self) -> &mut Node {
        let suffix = &mut self.suffix;
        self.root.get_or_insert_with(|| {
            if !suffix.contains('\n') {
                suffix.push('\n');
            }
            Node::Object(Container::default())
        })
    }

    /// Append an item to the array at `path`.
    fn push_entry(
        &mut self,
        path: &KeyPath,
        value: &Value,
        comment: Option<&str>,
    ) -> Result<(), EditError> {
        let style = self.style.clone();
        let (node, indent) = node_mut(self.root_mut(), path.segments(), String::new())
            .ok_or_else(|| EditError::InvalidPath(path.to_string()))?;
        match node {
            Node::Array(container) => {
                insert_entry(container, &indent, None, value, comment, &style, path)
            }
            other => Err(EditError::NotAContainer {
                path: path.to_string(),
                found: other.kind(),
            }),
        }
    }
}

impl Document for Json5Document {
    const FORMAT: &'static str = "json5";

    fn parse(text: &str) -> Result<Self, ParseError> {
        let parsed = parser::parse(text)?;
        trace!(style = ?parsed.style, "parsed json5 document");
        Ok(Self {
            prefix: parsed.prefix,
            root: parsed.root,
            suffix: parsed.suffix,
            style: parsed.style,
        })
    }

    fn empty() -> Self {
        Self {
            prefix: String::new(),
            root: None,
            suffix: String::new(),
            style: Style::default(),
        }
    }

    fn render(&self) -> String {
        let mut out = self.prefix.clone();
        if let Some(root) = &self.root {
            root.render(&mut out);
        }
        out.push_str(&self.suffix);
        out
    }

    fn is_empty(&self) -> bool {
        match self.to_value() {
            Value::Null => true,
            Value::Mapping(map) => map.is_empty(),
            Value::Sequence(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl StructuredDocument for Json5Document {
    fn get_at(&self, path: &KeyPath) -> Option<Value> {
        let mut node = self.root.as_ref()?;
        for segment in path.segments() {
            let (container, index) = match node {
                Node::Object(container) => (container, container.position(segment)?),
                Node::Array(container) => (container, as_index(segment)?),
                Node::Scalar(_) => return None,
            };
            node = &container.entries.get(index)?.value;
        }
        Some(node.to_value())
    }

    fn set_at(&mut self, path: &KeyPath, value: Value) -> Result<(), EditError> {
        let style = self.style.clone();
        self.restoring(|doc| match doc.root_mut() {
            Node::Scalar(scalar) => Err(EditError::NotAContainer {
                path: "(document root)".to_string(),
                found: scalar.value.kind(),
            }),
            root => set_in_node(root, path, 0, "", value, &style),
        })
    }

    fn remove_at(&mut self, path: &KeyPath) -> Result<Option<Value>, EditError> {
        let (parents, last) = path.split_last();
        let Some((container, _)) = self
            .root
            .as_mut()
            .and_then(|root| container_of_mut(root, parents, String::new()))
        else {
            return Ok(None);
        };
        Ok(entry_index(container, last).map(|index| remove_entry(container, index).value.to_value()))
    }

    fn push_at(&mut self, path: &KeyPath, value: Value) -> Result<(), EditError> {
        match self.get_at(path) {
            None | Some(Value::Null) => self.set_at(path, Value::Sequence(vec![value])),
            Some(Value::Sequence(_)) => self.push_entry(path, &value, None),
            Some(other) => Err(EditError::NotAContainer {
                path: path.to_string(),
                found: other.kind(),
            }),
        }
    }

    fn to_value(&self) -> Value {
        self.root.as_ref().map_or(Value::Null, Node::to_value)
    }
}

fn unrepresentable(path: &KeyPath, kind: &'static str, reason: &str) -> EditError {
    EditError::Unrepresentable {
        format: Json5Document::FORMAT,
        path: path.to_string(),
        kind,
        reason: reason.to_string(),
    }
}

fn entry_index(container: &Container, segment: &str) -> Option<usize> {
    match container.entries.first()?.key {
        Some(_) => container.position(segment),
        None => as_index(segment).filter(|index| *index < container.entries.len()),
    }
}

/// Indentation of the line entry `index` starts on.
fn entry_indent(container: &Container, index: usize, indent: &str) -> String {
    last_indent(&container.entries[index].leading)
        .unwrap_or(indent)
        .to_string()
}

/// Indentation of entries added to `container`.
fn child_indent(container: &Container, indent: &str, style: &Style) -> String {
    container
        .entries
        .iter()
        .find_map(|entry| last_indent(&entry.leading))
        .map_or_else(|| format!("{indent}{}", style.indent), str::to_string)
}

fn container_of<'a>(node: &'a Node, segments: &[String]) -> Option<&'a Container> {
    let mut node = node;
    for segment in segments {
        let (container, index) = match node {
            Node::Object(container) => (container, container.position(segment)?),
            Node::Array(container) => (container, as_index(segment)?),
            Node::Scalar(_) => return None,
        };
        node = &container.entries.get(index)?.value;
    }
    match node {
        Node::Object(container) | Node::Array(container) => Some(container),
        Node::Scalar(_) => None,
    }
}

/// The node at `segments`, with the indentation of the line it starts on.
fn node_mut<'a>(node: &'a mut Node, segments: &[String], mut indent: String) -> Option<(&'a mut Node, String)> {
    let mut node = node;
    for segment in segments {
        let current = node;
        let (container, index) = match current {
            Node::Object(container) => {
                let index = container.position(segment)?;
                (container, index)
            }
            Node::Array(container) => {
                let index = as_index(segment).filter(|index| *index < container.entries.len())?;
                (container, index)
            }
            Node::Scalar(_) => return None,
        };
        indent = entry_indent(container, index, &indent);
        node = &mut container.entries[index].value;
    }
    Some((node, indent))
}

fn container_of_mut<'a>(
    node: &'a mut Node,
    segments: &[String],
    indent: String,
) -> Option<(&'a mut Container, String)> {
    let (node, indent) = node_mut(node, segments, indent)?;
    match node {
        Node::Object(container) | Node::Array(container) => Some((container, indent)),
        Node::Scalar(_) => None,
    }
}

/// `{a: {b: value}}` for segments `[a, b]`.
fn nest(segments: &[String], value: Value) -> Value {
    segments.iter().rev().fold(value, |value, segment| {
        Value::Mapping(iter::once((segment.clone(), value)).collect())
    })
}

fn new_node(value: &Value, indent: &str, style: &Style, path: &KeyPath) -> Result<Node, EditError> {
    parser::parse_value(&style.value(value, indent))
        .map_err(|e| unrepresentable(path, value.kind(), &e.message))
}

/// The node for `value` in place of `old`. Strings keep their quotes.
fn replacement(old: &Node, value: &Value, indent: &str, style: &Style, path: &KeyPath) -> Result<Node, EditError> {
    match (old, value) {
        (Node::Scalar(scalar), Value::String(_)) => {
            let quote = scalar.raw.chars().next().filter(|c| matches!(c, '"' | '\''));
            let style = Style {
                quote: quote.unwrap_or(style.quote),
                ..style.clone()
            };
            new_node(value, indent, &style, path)
        }
        _ => new_node(value, indent, style, path),
    }
}

fn set_in_node(
    node: &mut Node,
    path: &KeyPath,
    depth: usize,
    indent: &str,
    value: Value,
    style: &Style,
) -> Result<(), EditError> {
    let segments = path.segments();
    let segment = &segments[depth];
    let last = depth + 1 == segments.len();

    let (container, index) = match node {
        Node::Object(container) => match container.position(segment) {
            Some(index) => (container, index),
            None => {
                let value = nest(&segments[depth + 1..], value);
                return insert_entry(container, indent, Some(segment.as_str()), &value, None, style, path);
            }
        },
        Node::Array(container) => {
            let index = as_index(segment).ok_or_else(|| {
                EditError::InvalidPath(format!("{path} ('{}' is an array)", path.prefix(depth)))
            })?;
            if index >= container.entries.len() {
                return Err(EditError::IndexOutOfRange {
                    path: path.prefix(depth),
                    index,
                    len: container.entries.len(),
                });
            }
            (container, index)
        }
        Node::Scalar(scalar) => {
            return Err(EditError::NotAContainer {
                path: path.prefix(depth),
                found: scalar.value.kind(),
            })
        }
    };

    let indent = entry_indent(container, index, indent);
    let entry = &mut container.entries[index];
    if last {
        if entry.value.to_value() != value {
            entry.value = replacement(&entry.value, &value, &indent, style, path)?;
        }
        return Ok(());
    }
    if matches!(&entry.value, Node::Scalar(scalar) if scalar.value.is_null()) {
        let value = nest(&segments[depth + 1..], value);
        entry.value = new_node(&value, &indent, style, path)?;
        return Ok(());
    }
    set_in_node(&mut entry.value, path, depth + 1, &indent, value, style)
}

/// Append an entry to `container`, whose opening bracket is on a line
/// indented by `indent`.
fn insert_entry(
    container: &mut Container,
    indent: &str,
    key: Option<&str>,
    value: &Value,
    comment: Option<&str>,
    style: &Style,
    path: &KeyPath,
) -> Result<(), EditError> {
    let empty = container.entries.is_empty();
    let multiline = container.is_multiline()
        || (empty && (key.is_some() || comment.is_some() || !value.is_scalar()));
    let key = key.map(|name| Key {
        raw: style.key(name),
        name: name.to_string(),
        colon: ": ".to_string(),
    });
    let trailing_comma = container
        .entries
        .last()
        .map_or(style.trailing_commas, |entry| entry.comma);

    if !multiline {
        if comment.is_some() {
            return Err(unrepresentable(path, value.kind(), "the collection is on a single line"));
        }
        let node = new_node(value, indent, style, path)?;
        let leading = match container.entries.last_mut() {
            Some(last) => {
                last.comma = true;
                " ".to_string()
            }
            None => {
                if container.trailing.trim().is_empty() {
                    container.trailing.clear();
                }
                String::new()
            }
        };
        container.entries.push(Entry {
            leading,
            key,
            value: node,
            after: String::new(),
            comma: !empty && trailing_comma,
        });
        return Ok(());
    }

    let child = child_indent(container, indent, style);
    let node = new_node(value, &child, style, path)?;
    let trailing = std::mem::take(&mut container.trailing);
    let (tail, closing) = trailing.split_at(line_end(&trailing));
    let mut leading = tail.to_string();
    let closing = if tail.ends_with('\n') {
        closing.to_string()
    } else {
        leading.push_str(style.newline);
        indent.to_string()
    };
    leading.push_str(&child);
    if let Some(comment) = comment.filter(|c| !c.is_empty()) {
        leading.push_str(&style.comment(comment, &child));
        leading.push_str(style.newline);
        leading.push_str(&child);
    }
    if let Some(last) = container.entries.last_mut() {
        last.comma = true;
    }
    container.entries.push(Entry {
        leading,
        key,
        value: node,
        after: String::new(),
        comma: trailing_comma,
    });
    container.trailing = format!("{}{closing}", style.newline);
    Ok(())
}

/// Take entry `index` out of `container` with the comments above it.
fn remove_entry(container: &mut Container, index: usize) -> Entry {
    let multiline = container.is_multiline();
    let entry = container.entries.remove(index);

    if !entry.comma {
        if let Some(last) = container.entries.last_mut() {
            last.comma = false;
            let after = std::mem::take(&mut last.after);
            container.trailing.insert_str(0, &after);
        }
    }

    if multiline {
        let head_len = line_end(&entry.leading);
        let head = &entry.leading[..head_len];
        let kept = kept_above(&entry.leading[head_len..]);
        let following = match container.entries.get_mut(index) {
            Some(next) => &mut next.leading,
            None => &mut container.trailing,
        };
        let rest = following.split_off(line_end(following));
        *following = format!("{head}{kept}{rest}");
    } else if let Some(next) = container.entries.get_mut(index) {
        next.leading = entry.leading.clone();
    }

    if container.entries.is_empty() && container.trailing.trim().is_empty() {
        container.trailing.clear();
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Mapping;

    fn doc(text: &str) -> Json5Document {
        Json5Document::parse(text).unwrap()
    }

    fn mapping<const N: usize>(entries: [(&str, Value); N]) -> Value {
        Value::Mapping(entries.into_iter().collect())
    }

    const RENOVATE: &str = "\
// Renovate configuration
{
  $schema: 'https://docs.renovatebot.com/renovate-schema.json',
  extends: ['config:base'], // shared presets
  packageRules: [
    /** Auto merge minor updates */
    {
      matchUpdateTypes: ['minor', 'patch'],
      automerge: true,
    },

    // Python
    {
      matchManagers: ['pip_requirements'],
      enabled: false,
    },
  ],
  timezone: 'Europe/Paris',
}
";

    mod reading {
        use super::*;

        #[test]
        fn round_trip_is_exact() {
            for text in [
                RENOVATE,
                "",
                "// nothing\n",
                "{}",
                "[1, 2, 3]",
                "{a: 1, 'b': \"two\" /* inline */ , c: [ ] }\n",
                "{\r\n  a: 0x10,\r\n  b: .5,\r\n  c: -Infinity,\r\n}\r\n",
                "/* head */ { \"nested\": { \"deep\": [ { } ] } } // tail",
            ] {
                assert_eq!(doc(text).render(), text);
            }
        }

        #[test]
        fn get_paths() {
            let d = doc(RENOVATE);
            assert_eq!(d.get("extends"), Some(Value::from(vec!["config:base"])));
            assert_eq!(d.get("packageRules.0.automerge"), Some(Value::Bool(true)));
            assert_eq!(
                d.get("packageRules.1.matchManagers.0"),
                Some(Value::from("pip_requirements"))
            );
            assert_eq!(d.get("packageRules.2"), None);
            assert_eq!(d.get("timezone.x"), None);
            assert_eq!(d.keys(), vec!["$schema", "extends", "packageRules", "timezone"]);
        }

        #[test]
        fn plain_json_matches_serde_json() {
            let text = r#"{"a": [1, 2.5, null, true], "b": {"c": "dé"}}"#;
            let json: serde_json::Value = serde_json::from_str(text).unwrap();
            let expected = mapping([
                (
                    "a",
                    Value::Sequence(vec![
                        Value::Integer(1),
                        Value::Float(2.5),
                        Value::Null,
                        Value::Bool(true),
                    ]),
                ),
                ("b", mapping([("c", Value::from(json["b"]["c"].as_str().unwrap()))])),
            ]);
            assert_eq!(doc(text).to_value(), expected);
        }

        #[test]
        fn later_duplicate_keys_win() {
            assert_eq!(doc("{a: 1, a: 2}").get("a"), Some(Value::Integer(2)));
        }

        #[test]
        fn comments() {
            let d = doc(RENOVATE);
            assert_eq!(
                d.comment("packageRules.0").as_deref(),
                Some("Auto merge minor updates")
            );
            assert_eq!(d.comment("packageRules.1").as_deref(), Some("Python"));
            // A line tail belongs to the line it ends.
            assert_eq!(d.comment("packageRules"), None);
            assert_eq!(d.comment("missing"), None);
        }

        #[test]
        fn empty_documents() {
            assert!(doc("").is_empty());
            assert!(doc("// nothing\n").is_empty());
            assert!(doc("{}\n").is_empty());
            assert!(!doc("{a: 1}").is_empty());
        }
    }

    mod writing {
        use super::*;

        #[test]
        fn replaced_string_keeps_its_quotes() {
            let mut d = doc("{\n  a: \"x\", // keep\n  b: 'y',\n}\n");
            d.set("a", "new").unwrap();
            d.set("b", "it's").unwrap();
            assert_eq!(d.render(), "{\n  a: \"new\", // keep\n  b: 'it\\'s',\n}\n");
        }

        #[test]
        fn unchanged_value_keeps_its_text() {
            let text = "{a: 0x10, b: 1.50}";
            let mut d = doc(text);
            d.set("a", 16).unwrap();
            d.set("b", 1.5).unwrap();
            assert_eq!(d.render(), text);
        }

        #[test]
        fn new_key_follows_the_document() {
            let mut d = doc(RENOVATE);
            d.set("labels", vec!["dependencies"]).unwrap();
            assert!(d
                .render()
                .ends_with("  timezone: 'Europe/Paris',\n  labels: ['dependencies'],\n}\n"));
        }

        #[test]
        fn new_key_without_trailing_commas() {
            let mut d = doc("{\n    \"a\": 1 // one\n}\n");
            d.set("b", true).unwrap();
            assert_eq!(d.render(), "{\n    \"a\": 1, // one\n    \"b\": true\n}\n");
        }

        #[test]
        fn new_key_in_single_line_object() {
            let mut d = doc("{ a: 1 }");
            d.set("b", "two").unwrap();
            assert_eq!(d.render(), "{ a: 1, b: \"two\" }");
        }

        #[test]
        fn nested_keys_are_created() {
            let mut d = doc("{\n  a: 1,\n}\n");
            d.set("lockFileMaintenance.enabled", true).unwrap();
            assert_eq!(
                d.render(),
                "{\n  a: 1,\n  lockFileMaintenance: {\n    enabled: true,\n  },\n}\n"
            );
        }

        #[test]
        fn empty_object_opens_up() {
            let mut d = doc("{\n  a: {},\n}\n");
            d.set("a.b", 1).unwrap();
            assert_eq!(d.render(), "{\n  a: {\n    b: 1,\n  },\n}\n");
        }

        #[test]
        fn empty_file_gets_an_object() {
            let mut d = Json5Document::empty();
            d.set("extends", vec!["config:base"]).unwrap();
            assert_eq!(d.render(), "{\n  extends: [\"config:base\"],\n}\n");
        }

        #[test]
        fn odd_keys_are_quoted() {
            let mut d = doc("{\n  a: 1,\n}\n");
            d.set(KeyPath::from_segments(["match-me"]).unwrap(), 2).unwrap();
            assert!(d.render().contains("  \"match-me\": 2,\n"));
        }

        #[test]
        fn errors_leave_the_document_alone() {
            let mut d = doc(RENOVATE);
            let err = d.set("timezone.zone", "x").unwrap_err();
            assert!(matches!(err, EditError::NotAContainer { ref path, found: "string" } if path == "timezone"));
            let err = d.set("packageRules.5.enabled", true).unwrap_err();
            assert!(matches!(err, EditError::IndexOutOfRange { index: 5, len: 2, .. }));
            assert!(matches!(
                d.set("packageRules.first", 1),
                Err(EditError::InvalidPath(_))
            ));
            assert_eq!(d.render(), RENOVATE);

            let mut scalar = doc("42");
            assert!(matches!(
                scalar.set("a", 1),
                Err(EditError::NotAContainer { found: "integer", .. })
            ));
        }

        #[test]
        fn set_comment() {
            let mut d = doc(RENOVATE);
            d.set_comment("packageRules.0", "Merge minor and patch").unwrap();
            d.set_comment("packageRules.1", "").unwrap();
            d.set_comment("timezone", "Where\nwe are").unwrap();
            let out = d.render();
            assert!(out.contains("    /** Merge minor and patch */\n    {\n"));
            assert!(out.contains("    },\n\n    {\n      matchManagers"));
            assert!(out.contains(
                "  /**\n   * Where\n   * we are\n   */\n  timezone: 'Europe/Paris',\n"
            ));
            assert_eq!(d.comment("timezone").as_deref(), Some("Where\nwe are"));

            assert!(matches!(
                d.set_comment("extends.0", "inline"),
                Err(EditError::Unrepresentable { .. })
            ));
            assert!(matches!(d.set_comment("nope", "x"), Err(EditError::InvalidPath(_))));
        }
    }

    mod removing {
        use super::*;

        #[test]
        fn entry_goes_with_its_comment() {
            let mut d = doc(RENOVATE);
            let removed = d.remove("packageRules.0").unwrap();
            assert_eq!(
                removed,
                Some(mapping([
                    ("matchUpdateTypes", Value::from(vec!["minor", "patch"])),
                    ("automerge", Value::Bool(true)),
                ]))
            );
            assert!(d.render().contains(
                "  packageRules: [\n\n    // Python\n    {\n      matchManagers"
            ));
        }

        #[test]
        fn line_tail_stays_with_its_line() {
            let mut d = doc(RENOVATE);
            d.remove("packageRules").unwrap();
            assert!(d.render().contains(
                "  extends: ['config:base'], // shared presets\n  timezone: 'Europe/Paris',\n"
            ));
        }

        #[test]
        fn last_entry_without_trailing_comma() {
            let mut d = doc("{\n  a: 1,\n  b: 2\n}\n");
            d.remove("b").unwrap();
            assert_eq!(d.render(), "{\n  a: 1\n}\n");
        }

        #[test]
        fn single_line_collections() {
            let mut d = doc("{ list: [1, 2, 3], other: true }");
            d.remove("list.1").unwrap();
            assert_eq!(d.render(), "{ list: [1, 3], other: true }");
            d.remove("other").unwrap();
            assert_eq!(d.render(), "{ list: [1, 3] }");
            d.remove("list.0").unwrap();
            assert_eq!(d.render(), "{ list: [3] }");
        }

        #[test]
        fn emptied_object_closes() {
            let mut d = doc("{\n  a: {\n    b: 1,\n  },\n}\n");
            d.remove("a.b").unwrap();
            assert_eq!(d.render(), "{\n  a: {},\n}\n");
        }

        #[test]
        fn missing_paths() {
            let mut d = doc(RENOVATE);
            assert_eq!(d.remove("nope").unwrap(), None);
            assert_eq!(d.remove("packageRules.9").unwrap(), None);
            assert_eq!(d.remove("timezone.x").unwrap(), None);
            assert_eq!(d.render(), RENOVATE);
        }
    }

    mod pushing {
        use super::*;

        #[test]
        fn onto_single_line_array() {
            let mut d = doc(RENOVATE);
            d.push("extends", ":semanticCommits").unwrap();
            assert!(d
                .render()
                .contains("  extends: ['config:base', ':semanticCommits'], // shared presets\n"));
        }

        #[test]
        fn object_with_comment() {
            let mut d = doc(RENOVATE);
            let rule: Mapping = [("matchPackageNames", Value::from(vec!["black"]))]
                .into_iter()
                .collect();
            d.push_with_comment("packageRules", rule, "Group black").unwrap();
            assert!(d.render().contains(
                "      enabled: false,\n    },\n    /** Group black */\n    {\n      matchPackageNames: ['black'],\n    },\n  ],\n"
            ));
            assert_eq!(d.comment("packageRules.2").as_deref(), Some("Group black"));
        }

        #[test]
        fn missing_array_is_created() {
            let mut d = doc("{\n  a: 1,\n}\n");
            d.push("extends", "config:base").unwrap();
            assert_eq!(d.render(), "{\n  a: 1,\n  extends: [\"config:base\"],\n}\n");

            let mut d = doc("{\n  a: 1,\n}\n");
            d.push_with_comment("customManagers", mapping([("x", Value::Integer(1))]), "Pinned")
                .unwrap();
            assert_eq!(
                d.render(),
                "{\n  a: 1,\n  customManagers: [\n    /** Pinned */\n    {\n      x: 1,\n    },\n  ],\n}\n"
            );
        }

        #[test]
        fn empty_array_stays_inline_for_scalars() {
            let mut d = doc("{ tags: [ ] }");
            d.push("tags", "a").unwrap();
            assert_eq!(d.render(), "{ tags: [\"a\"] }");
        }

        #[test]
        fn onto_a_scalar() {
            let mut d = doc(RENOVATE);
            assert!(matches!(
                d.push("timezone", "x"),
                Err(EditError::NotAContainer { found: "string", .. })
            ));
            assert!(matches!(
                d.push_with_comment("extends", "x", "why"),
                Err(EditError::Unrepresentable { .. })
            ));
            assert_eq!(d.render(), RENOVATE);
        }
    }
}
