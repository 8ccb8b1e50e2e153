//! editor::yaml::tree
//!
//! Lossless block-structure tree.
//!
//! Every byte of the source lives in exactly one field: comment and blank
//! lines in `leading`/`trailing`, indentation in `prefix`, and the text after
//! a key's colon in the entry's [`Slot`]. Rendering concatenates the fields
//! in order, so an untouched tree renders back to its input.

use super::scalar::{self, decode};
use crate::editor::{Mapping, Value};

/// A block-level node.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Map(BlockMap),
    Seq(BlockSeq),
    /// A scalar or flow collection spread over its own lines.
    Scalar(ScalarLines),
}

#[derive(Debug, Clone)]
pub(crate) struct BlockMap {
    pub indent: usize,
    pub entries: Vec<MapEntry>,
    pub trailing: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct MapEntry {
    pub leading: Vec<String>,
    pub prefix: String,
    /// Key text as written, up to the colon.
    pub key_raw: String,
    pub key: String,
    pub slot: Slot,
}

#[derive(Debug, Clone)]
pub(crate) struct BlockSeq {
    pub indent: usize,
    pub items: Vec<SeqItem>,
    pub trailing: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct SeqItem {
    pub leading: Vec<String>,
    pub prefix: String,
    pub slot: Slot,
}

#[derive(Debug, Clone)]
pub(crate) struct ScalarLines {
    pub lines: Vec<String>,
}

/// What follows a key's colon or an item's dash.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    /// A value starting on the same line.
    Inline { gap: String, scalar: InlineScalar },
    /// A collection starting on the dash line: `- key: value`.
    Compact { gap: String, node: Box<Node> },
    /// A value on the following lines, or nothing (null).
    Block {
        tail: String,
        eol: String,
        node: Option<Box<Node>>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct InlineScalar {
    pub raw: String,
    /// Whitespace and comment after the value.
    pub comment: String,
    pub eol: String,
    /// Lines of a block scalar, quoted scalar or flow collection that
    /// continue past the first line.
    pub continuation: Vec<String>,
}

/// Indentation conventions detected in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndentStyle {
    /// Nested mapping indent relative to its parent key.
    pub map: usize,
    /// Sequence dash offset relative to its parent key.
    pub seq: usize,
    /// Spaces between a dash and a compact collection.
    pub gap: usize,
}

impl Default for IndentStyle {
    fn default() -> Self {
        Self {
            map: 2,
            seq: 2,
            gap: 1,
        }
    }
}

impl Node {
    pub fn to_value(&self) -> Value {
        match self {
            Node::Map(map) => Value::Mapping(
                map.entries
                    .iter()
                    .map(|entry| (entry.key.clone(), entry.slot.to_value()))
                    .collect(),
            ),
            Node::Seq(seq) => {
                Value::Sequence(seq.items.iter().map(|item| item.slot.to_value()).collect())
            }
            Node::Scalar(lines) => lines.to_value(),
        }
    }

    pub fn render(&self, out: &mut String) {
        match self {
            Node::Map(map) => {
                for entry in &map.entries {
                    push_lines(out, &entry.leading);
                    out.push_str(&entry.prefix);
                    out.push_str(&entry.key_raw);
                    out.push(':');
                    entry.slot.render(out);
                }
                push_lines(out, &map.trailing);
            }
            Node::Seq(seq) => {
                for item in &seq.items {
                    push_lines(out, &item.leading);
                    out.push_str(&item.prefix);
                    out.push('-');
                    item.slot.render(out);
                }
                push_lines(out, &seq.trailing);
            }
            Node::Scalar(lines) => push_lines(out, &lines.lines),
        }
    }

    /// Drop the indentation of the first line, for nodes that start after a dash.
    pub fn clear_first_prefix(&mut self) {
        match self {
            Node::Map(map) => {
                if let Some(first) = map.entries.first_mut() {
                    first.prefix.clear();
                }
            }
            Node::Seq(seq) => {
                if let Some(first) = seq.items.first_mut() {
                    first.prefix.clear();
                }
            }
            Node::Scalar(_) => {}
        }
    }

    /// Comment and blank lines above the first entry.
    pub fn first_leading(&self) -> &[String] {
        match self {
            Node::Map(map) => map.entries.first().map_or(&[][..], |entry| entry.leading.as_slice()),
            Node::Seq(seq) => seq.items.first().map_or(&[][..], |item| item.leading.as_slice()),
            Node::Scalar(_) => &[],
        }
    }

    /// Give the first line its indentation back, for nodes leaving a dash line.
    pub fn restore_first_prefix(&mut self) {
        match self {
            Node::Map(map) => {
                let indent = map.indent;
                if let Some(first) = map.entries.first_mut() {
                    first.prefix = " ".repeat(indent);
                }
            }
            Node::Seq(seq) => {
                let indent = seq.indent;
                if let Some(first) = seq.items.first_mut() {
                    first.prefix = " ".repeat(indent);
                }
            }
            Node::Scalar(_) => {}
        }
    }

    /// Collections with no entries, which block syntax cannot express.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Node::Map(map) => map.entries.is_empty(),
            Node::Seq(seq) => seq.items.is_empty(),
            Node::Scalar(_) => false,
        }
    }

    pub fn is_collection(&self) -> bool {
        !matches!(self, Node::Scalar(_))
    }
}

impl ScalarLines {
    pub fn to_value(&self) -> Value {
        let indent = self
            .lines
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.len() - line.trim_start_matches(' ').len())
            .min()
            .unwrap_or(0);
        let text: String = self
            .lines
            .iter()
            .map(|line| line.get(indent..).unwrap_or(""))
            .map(|line| if line.trim().is_empty() { "\n" } else { line })
            .collect();
        decode(&text)
    }
}

impl Slot {
    pub fn to_value(&self) -> Value {
        match self {
            Slot::Inline { scalar, .. } => scalar.to_value(),
            Slot::Compact { node, .. } => node.to_value(),
            Slot::Block { node, .. } => node.as_ref().map_or(Value::Null, |node| node.to_value()),
        }
    }

    pub fn render(&self, out: &mut String) {
        match self {
            Slot::Inline { gap, scalar } => {
                out.push_str(gap);
                out.push_str(&scalar.raw);
                out.push_str(&scalar.comment);
                out.push_str(&scalar.eol);
                push_lines(out, &scalar.continuation);
            }
            Slot::Compact { gap, node } => {
                out.push_str(gap);
                node.render(out);
            }
            Slot::Block { tail, eol, node } => {
                out.push_str(tail);
                out.push_str(eol);
                if let Some(node) = node {
                    node.render(out);
                }
            }
        }
    }

    /// The container node under this slot, when it is a block collection.
    pub fn node_mut(&mut self) -> Option<&mut Node> {
        match self {
            Slot::Compact { node, .. } => Some(&mut **node),
            Slot::Block {
                node: Some(node), ..
            } if node.is_collection() => Some(&mut **node),
            _ => None,
        }
    }

    pub fn node(&self) -> Option<&Node> {
        match self {
            Slot::Compact { node, .. } => Some(&**node),
            Slot::Block {
                node: Some(node), ..
            } if node.is_collection() => Some(&**node),
            _ => None,
        }
    }

    /// Comment text carried by the slot's first line, if any.
    pub fn comment(&self) -> String {
        match self {
            Slot::Inline { scalar, .. } => scalar.comment.clone(),
            Slot::Block { tail, .. } => {
                let (_, comment) = scalar::split_comment(tail);
                if comment.trim().is_empty() {
                    String::new()
                } else {
                    comment.to_string()
                }
            }
            Slot::Compact { .. } => String::new(),
        }
    }

    /// Replace the end-of-line comment of the slot's first line; an empty
    /// `comment` removes it. Returns `false` where a comment cannot go:
    /// after a compact collection or a value that continues on later lines.
    pub fn set_comment(&mut self, comment: &str) -> bool {
        let text = |existing: &str| {
            if comment.is_empty() {
                return String::new();
            }
            let space = existing
                .find('#')
                .map(|at| &existing[..at])
                .filter(|space| !space.is_empty())
                .unwrap_or(" ");
            format!("{space}# {comment}")
        };
        match self {
            Slot::Inline { scalar, .. } => {
                if !scalar.continuation.is_empty() && !scalar::is_block_scalar_header(&scalar.raw) {
                    return false;
                }
                scalar.comment = text(&scalar.comment);
                true
            }
            Slot::Block { tail, .. } => {
                let (value, existing) = scalar::split_comment(tail);
                *tail = format!("{value}{}", text(existing));
                true
            }
            Slot::Compact { .. } => false,
        }
    }

    pub fn eol(&self) -> Option<&str> {
        match self {
            Slot::Inline { scalar, .. } => Some(&scalar.eol),
            Slot::Block { eol, .. } => Some(eol),
            Slot::Compact { .. } => None,
        }
    }
}

impl InlineScalar {
    pub fn to_value(&self) -> Value {
        if self.continuation.is_empty() {
            return decode(&self.raw);
        }
        let mut text = self.raw.clone();
        text.push('\n');
        for line in &self.continuation {
            text.push_str(line);
        }
        decode(&text)
    }

    pub fn is_flow(&self) -> bool {
        self.raw.starts_with(['[', '{'])
    }
}

fn push_lines(out: &mut String, lines: &[String]) {
    for line in lines {
        out.push_str(line);
    }
}

/// Builds new tree fragments from values in a document's style.
pub(crate) struct Builder<'a> {
    pub style: IndentStyle,
    pub newline: &'a str,
}

impl Builder<'_> {
    /// A slot for `value` under a key or dash at column `parent`.
    pub fn slot(&self, value: &Value, parent: usize, in_seq: bool) -> Slot {
        match value {
            Value::Null => Slot::Block {
                tail: String::new(),
                eol: self.newline.to_string(),
                node: None,
            },
            Value::Mapping(map) if !map.is_empty() => {
                if in_seq {
                    let column = parent + 1 + self.style.gap;
                    let mut node = Node::Map(self.map(map, column));
                    node.clear_first_prefix();
                    Slot::Compact {
                        gap: " ".repeat(self.style.gap),
                        node: Box::new(node),
                    }
                } else {
                    self.block(Node::Map(self.map(map, parent + self.style.map)))
                }
            }
            Value::Sequence(items) if !items.is_empty() => {
                if in_seq {
                    let column = parent + 1 + self.style.gap;
                    let mut node = Node::Seq(self.seq(items, column));
                    node.clear_first_prefix();
                    Slot::Compact {
                        gap: " ".repeat(self.style.gap),
                        node: Box::new(node),
                    }
                } else {
                    self.block(Node::Seq(self.seq(items, parent + self.style.seq)))
                }
            }
            other => Slot::Inline {
                gap: " ".to_string(),
                scalar: self.inline(other, None, parent),
            },
        }
    }

    /// An inline scalar, or a literal block for multi-line strings.
    pub fn inline(&self, value: &Value, previous: Option<&str>, parent: usize) -> InlineScalar {
        let (raw, continuation) = match value {
            Value::String(s) if s.contains('\n') => match scalar::literal_header(s) {
                Some(header) => (
                    header.to_string(),
                    scalar::literal_lines(s, parent + self.style.map.max(1), self.newline),
                ),
                None => (scalar::encode_multiline_fallback(s), Vec::new()),
            },
            other => (scalar::encode_inline(other, previous), Vec::new()),
        };
        InlineScalar {
            raw,
            comment: String::new(),
            eol: self.newline.to_string(),
            continuation,
        }
    }

    fn block(&self, node: Node) -> Slot {
        Slot::Block {
            tail: String::new(),
            eol: self.newline.to_string(),
            node: Some(Box::new(node)),
        }
    }

    pub fn map(&self, map: &Mapping, indent: usize) -> BlockMap {
        BlockMap {
            indent,
            entries: map
                .iter()
                .map(|(key, value)| self.entry(key, value, indent))
                .collect(),
            trailing: Vec::new(),
        }
    }

    pub fn entry(&self, key: &str, value: &Value, indent: usize) -> MapEntry {
        MapEntry {
            leading: Vec::new(),
            prefix: " ".repeat(indent),
            key_raw: scalar::encode_key(key),
            key: key.to_string(),
            slot: self.slot(value, indent, false),
        }
    }

    pub fn seq(&self, items: &[Value], indent: usize) -> BlockSeq {
        BlockSeq {
            indent,
            items: items.iter().map(|value| self.item(value, indent)).collect(),
            trailing: Vec::new(),
        }
    }

    pub fn item(&self, value: &Value, indent: usize) -> SeqItem {
        SeqItem {
            leading: Vec::new(),
            prefix: " ".repeat(indent),
            slot: self.slot(value, indent, true),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> Builder<'static> {
        Builder {
            style: IndentStyle::default(),
            newline: "\n",
        }
    }

    fn render(node: &Node) -> String {
        let mut out = String::new();
        node.render(&mut out);
        out
    }

    #[test]
    fn builds_nested_block_collections() {
        let value: Mapping = [
            ("repo", Value::from("https://example.com/x")),
            ("hooks", Value::from(vec![Value::Mapping([("id", "fmt")].into_iter().collect())])),
        ]
        .into_iter()
        .collect();
        let node = Node::Map(builder().map(&value, 0));
        assert_eq!(
            render(&node),
            "repo: https://example.com/x\nhooks:\n  - id: fmt\n"
        );
        assert_eq!(node.to_value(), Value::Mapping(value));
    }

    #[test]
    fn builds_compact_items() {
        let items = vec![Value::Mapping(
            [("a", 1), ("b", 2)].into_iter().collect(),
        )];
        let node = Node::Seq(builder().seq(&items, 0));
        assert_eq!(render(&node), "- a: 1\n  b: 2\n");
    }

    #[test]
    fn builds_literal_blocks() {
        let map: Mapping = [("run", "echo a\necho b\n")].into_iter().collect();
        let node = Node::Map(builder().map(&map, 2));
        assert_eq!(render(&node), "  run: |\n    echo a\n    echo b\n");
        assert_eq!(node.to_value(), Value::Mapping(map));
    }

    #[test]
    fn empty_collections_stay_inline() {
        let map: Mapping = [("a", Value::Sequence(vec![])), ("b", Value::Mapping(Mapping::new()))]
            .into_iter()
            .collect();
        assert_eq!(render(&Node::Map(builder().map(&map, 0))), "a: []\nb: {}\n");
    }

    #[test]
    fn scalar_lines_are_dedented() {
        let lines = ScalarLines {
            lines: vec!["  multi\n".into(), "  line\n".into()],
        };
        assert_eq!(lines.to_value(), Value::from("multi line"));
    }
}
