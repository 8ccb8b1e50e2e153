//! editor::yaml
//!
//! Comment-preserving YAML documents.
//!
//! # Design
//!
//! The block structure (mappings, sequences, comment and blank lines) is
//! parsed into a lossless tree; scalars and flow collections stay as the text
//! they were written as and are decoded with `serde_yaml` when read. A write
//! re-renders only the slot it addresses:
//!
//! - a scalar keeps its quoting style, trailing comment and spacing,
//! - a flow collection (`[a, b]`) stays in flow style while it holds scalars,
//! - new keys and items are indented like the rest of the document.
//!
//! Not supported: multi-document streams past the first document, complex
//! (`? `) keys and editing through aliases. Aliases read as their literal
//! text.

mod parser;
mod scalar;
mod tree;

use std::iter;

use tracing::trace;

use self::scalar::is_block_scalar_header;
use self::tree::{Builder, IndentStyle, InlineScalar, Node, Slot};
use super::path::as_index;
use super::precommit::{FormatterHook, PRETTIER_YAML};
use super::{
    Document, EditError, IntoKeyPath, KeyPath, Mapping, ParseError, StructuredDocument, Value,
};

/// A parsed YAML file.
#[derive(Debug, Clone)]
pub struct YamlDocument {
    /// Comments and directives up to an explicit `---`.
    header: Vec<String>,
    root: Option<Node>,
    /// Trailing comments and anything after a document end marker.
    trailer: Vec<String>,
    style: IndentStyle,
    newline: &'static str,
    missing_final_newline: bool,
}

impl YamlDocument {
    fn builder(&self) -> Builder<'static> {
        Builder {
            style: self.style,
            newline: self.newline,
        }
    }

    /// The root as a block collection, converting or creating it as needed.
    fn container_root(
        &mut self,
        create: bool,
    ) -> Result<Option<&mut Node>, EditError> {
        let current = match &self.root {
            Some(Node::Scalar(lines)) => Some(lines.to_value()),
            Some(_) => None,
            None => Some(Value::Null),
        };
        if let Some(value) = current {
            let builder = self.builder();
            match value {
                Value::Mapping(map) => self.root = Some(Node::Map(builder.map(&map, 0))),
                Value::Sequence(items) => self.root = Some(Node::Seq(builder.seq(&items, 0))),
                Value::Null if create => {
                    self.adopt_trailer_comments();
                    self.root = Some(Node::Map(builder.map(&Mapping::new(), 0)));
                }
                Value::Null => return Ok(None),
                other => {
                    return Err(EditError::NotAContainer {
                        path: "(document root)".to_string(),
                        found: other.kind(),
                    })
                }
            }
        }
        Ok(self.root.as_mut())
    }

    /// A document without content keeps its comments above new content.
    fn adopt_trailer_comments(&mut self) {
        let end = self
            .trailer
            .iter()
            .position(|line| line.starts_with("---") || line.starts_with("..."))
            .unwrap_or(self.trailer.len());
        self.header.extend(self.trailer.drain(..end));
    }

    fn set_inner(&mut self, path: &KeyPath, value: Value) -> Result<(), EditError> {
        let builder = self.builder();
        match self.container_root(true)? {
            Some(root) => set_in_node(root, path, 0, value, &builder),
            None => Err(EditError::InvalidPath(path.to_string())),
        }
    }

    /// End-of-line comment of the value at `path`, without the `#`.
    ///
    /// ```
    /// use multirepo::editor::{Document, YamlDocument};
    ///
    /// let doc = YamlDocument::parse("rev: v4.5.0  # frozen\n").unwrap();
    /// assert_eq!(doc.comment("rev").as_deref(), Some("frozen"));
    /// ```
    pub fn comment(&self, path: impl IntoKeyPath) -> Option<String> {
        let path = path.into_key_path().ok()?;
        let (last, parents) = path.segments().split_last()?;
        let slot = match block_node(self.root.as_ref()?, parents)? {
            Node::Map(map) => &map.entries.iter().find(|entry| entry.key == *last)?.slot,
            Node::Seq(seq) => &seq.items.get(as_index(last)?)?.slot,
            Node::Scalar(_) => return None,
        };
        let comment = slot.comment();
        let text = comment.trim_start().strip_prefix('#')?.trim();
        Some(text.to_string())
    }

    /// Set the end-of-line comment of the value at `path`; an empty comment
    /// removes it.
    ///
    /// # Errors
    ///
    /// - [`EditError::InvalidPath`] if nothing is at `path`
    /// - [`EditError::Unrepresentable`] if the value sits inside a flow
    ///   collection or spreads over several lines
    pub fn set_comment(&mut self, path: impl IntoKeyPath, comment: &str) -> Result<(), EditError> {
        let path = path.into_key_path()?;
        if comment.contains(['\n', '\r']) {
            return Err(EditError::Unrepresentable {
                format: Self::FORMAT,
                path: path.to_string(),
                kind: "comment",
                reason: "an end-of-line comment is a single line".to_string(),
            });
        }
        if self.get_at(&path).is_none() {
            return Err(EditError::InvalidPath(path.to_string()));
        }
        let unrepresentable = |reason: &str| EditError::Unrepresentable {
            format: Self::FORMAT,
            path: path.to_string(),
            kind: "comment",
            reason: reason.to_string(),
        };
        let Some((last, parents)) = path.segments().split_last() else {
            return Err(EditError::InvalidPath(path.to_string()));
        };
        let slot = match self
            .root
            .as_mut()
            .and_then(|root| block_node_mut(root, parents))
        {
            Some(Node::Map(map)) => map
                .entries
                .iter_mut()
                .find(|entry| entry.key == *last)
                .map(|entry| &mut entry.slot),
            Some(Node::Seq(seq)) => as_index(last)
                .and_then(|index| seq.items.get_mut(index))
                .map(|item| &mut item.slot),
            _ => None,
        }
        .ok_or_else(|| unrepresentable("the value is inside a flow collection"))?;
        if slot.set_comment(comment) {
            Ok(())
        } else {
            Err(unrepresentable("the value spreads over several lines"))
        }
    }

    /// Whether `path` holds a block (not flow) sequence.
    pub(crate) fn is_block_sequence(&self, path: &KeyPath) -> bool {
        self.root
            .as_ref()
            .and_then(|root| block_node(root, path.segments()))
            .is_some_and(|node| matches!(node, Node::Seq(_)))
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
}

impl Document for YamlDocument {
    const FORMAT: &'static str = "yaml";

    fn parse(text: &str) -> Result<Self, ParseError> {
        let parsed = parser::parse(text)?;
        trace!(style = ?parsed.style, "parsed yaml document");
        Ok(Self {
            header: parsed.header,
            root: parsed.root,
            trailer: parsed.trailer,
            style: parsed.style,
            newline: parsed.newline,
            missing_final_newline: parsed.missing_final_newline,
        })
    }

    fn empty() -> Self {
        Self {
            header: Vec::new(),
            root: None,
            trailer: Vec::new(),
            style: IndentStyle::default(),
            newline: "\n",
            missing_final_newline: false,
        }
    }

    fn render(&self) -> String {
        let mut out: String = self.header.concat();
        if let Some(root) = &self.root {
            root.render(&mut out);
        }
        for line in &self.trailer {
            out.push_str(line);
        }
        if self.missing_final_newline && out.ends_with(self.newline) {
            out.truncate(out.len() - self.newline.len());
        }
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

    fn formatter_hook() -> Option<&'static FormatterHook> {
        Some(&PRETTIER_YAML)
    }
}

impl StructuredDocument for YamlDocument {
    fn get_at(&self, path: &KeyPath) -> Option<Value> {
        let segments = path.segments();
        let mut node = self.root.as_ref()?;
        for (depth, segment) in segments.iter().enumerate() {
            let slot = match node {
                Node::Map(map) => &map.entries.iter().find(|entry| entry.key == *segment)?.slot,
                Node::Seq(seq) => &seq.items.get(as_index(segment)?)?.slot,
                Node::Scalar(lines) => return walk_value(lines.to_value(), &segments[depth..]),
            };
            if depth + 1 == segments.len() {
                return Some(slot.to_value());
            }
            match slot.node() {
                Some(child) => node = child,
                None => return walk_value(slot.to_value(), &segments[depth + 1..]),
            }
        }
        None
    }

    fn set_at(&mut self, path: &KeyPath, value: Value) -> Result<(), EditError> {
        self.restoring(|doc| doc.set_inner(path, value))
    }

    fn remove_at(&mut self, path: &KeyPath) -> Result<Option<Value>, EditError> {
        if self.get_at(path).is_none() {
            return Ok(None);
        }
        let builder = self.builder();
        self.restoring(|doc| match doc.container_root(false)? {
            Some(root) => Ok(remove_in_node(root, path, 0, &builder)),
            None => Ok(None),
        })
    }

    fn push_at(&mut self, path: &KeyPath, value: Value) -> Result<(), EditError> {
        let mut items = match self.get_at(path) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(items)) => items,
            Some(other) => {
                return Err(EditError::NotAContainer {
                    path: path.to_string(),
                    found: other.kind(),
                })
            }
        };

        let builder = self.builder();
        if let Some(Node::Seq(seq)) = self
            .root
            .as_mut()
            .and_then(|root| block_node_mut(root, path.segments()))
        {
            let item = builder.item(&value, seq.indent);
            seq.items.push(item);
            return Ok(());
        }

        items.push(value);
        self.set_at(path, Value::Sequence(items))
    }

    fn to_value(&self) -> Value {
        self.root.as_ref().map_or(Value::Null, Node::to_value)
    }
}

fn walk_value(value: Value, segments: &[String]) -> Option<Value> {
    segments.iter().try_fold(value, |value, segment| match value {
        Value::Mapping(mut map) => map.remove(segment),
        Value::Sequence(mut items) => {
            let index = as_index(segment).filter(|index| *index < items.len())?;
            Some(items.swap_remove(index))
        }
        _ => None,
    })
}

/// Follow `segments` through block collections only.
fn block_node<'a>(mut node: &'a Node, segments: &[String]) -> Option<&'a Node> {
    for segment in segments {
        let slot = match node {
            Node::Map(map) => &map.entries.iter().find(|entry| entry.key == *segment)?.slot,
            Node::Seq(seq) => &seq.items.get(as_index(segment)?)?.slot,
            Node::Scalar(_) => return None,
        };
        node = slot.node()?;
    }
    Some(node)
}

fn block_node_mut<'a>(mut node: &'a mut Node, segments: &[String]) -> Option<&'a mut Node> {
    for segment in segments {
        let current = node;
        let slot = match current {
            Node::Map(map) => {
                &mut map
                    .entries
                    .iter_mut()
                    .find(|entry| entry.key == *segment)?
                    .slot
            }
            Node::Seq(seq) => &mut seq.items.get_mut(as_index(segment)?)?.slot,
            Node::Scalar(_) => return None,
        };
        node = slot.node_mut()?;
    }
    Some(node)
}

fn index_of(segment: &str, path: &KeyPath, depth: usize) -> Result<usize, EditError> {
    as_index(segment).ok_or_else(|| {
        EditError::InvalidPath(format!("{path} ('{}' is a sequence)", path.prefix(depth)))
    })
}

fn out_of_range(path: &KeyPath, depth: usize, index: usize, len: usize) -> EditError {
    EditError::IndexOutOfRange {
        path: path.prefix(depth),
        index,
        len,
    }
}

/// `{a: {b: value}}` for segments `[a, b]`.
fn nest(segments: &[String], value: Value) -> Value {
    segments.iter().rev().fold(value, |value, segment| {
        Value::Mapping(iter::once((segment.clone(), value)).collect())
    })
}

fn set_in_node(
    node: &mut Node,
    path: &KeyPath,
    depth: usize,
    value: Value,
    builder: &Builder<'_>,
) -> Result<(), EditError> {
    let segments = path.segments();
    let segment = &segments[depth];
    let last = depth + 1 == segments.len();

    let (slot, parent, in_seq) = match node {
        Node::Map(map) => {
            let indent = map.indent;
            match map.entries.iter().position(|entry| entry.key == *segment) {
                Some(index) => (&mut map.entries[index].slot, indent, false),
                None => {
                    let value = nest(&segments[depth + 1..], value);
                    map.entries.push(builder.entry(segment, &value, indent));
                    return Ok(());
                }
            }
        }
        Node::Seq(seq) => {
            let index = index_of(segment, path, depth)?;
            let len = seq.items.len();
            let indent = seq.indent;
            match seq.items.get_mut(index) {
                Some(item) => (&mut item.slot, indent, true),
                None => return Err(out_of_range(path, depth, index, len)),
            }
        }
        Node::Scalar(lines) => {
            return Err(EditError::NotAContainer {
                path: path.prefix(depth),
                found: lines.to_value().kind(),
            })
        }
    };

    if last {
        replace_slot(slot, value, parent, in_seq, builder);
        return Ok(());
    }
    if let Some(child) = slot.node_mut() {
        return set_in_node(child, path, depth + 1, value, builder);
    }
    let mut current = slot.to_value();
    set_value(&mut current, path, depth + 1, value)?;
    replace_slot(slot, current, parent, in_seq, builder);
    Ok(())
}

/// Set inside a decoded inline value.
fn set_value(
    target: &mut Value,
    path: &KeyPath,
    depth: usize,
    value: Value,
) -> Result<(), EditError> {
    let segments = path.segments();
    let segment = &segments[depth];
    let last = depth + 1 == segments.len();

    match target {
        Value::Mapping(map) => {
            if !last && map.get(segment).is_some_and(|child| !child.is_null()) {
                if let Some(child) = map.get_mut(segment) {
                    return set_value(child, path, depth + 1, value);
                }
            }
            map.insert(segment.clone(), nest(&segments[depth + 1..], value));
            Ok(())
        }
        Value::Sequence(items) => {
            let index = index_of(segment, path, depth)?;
            let len = items.len();
            let item = items
                .get_mut(index)
                .ok_or_else(|| out_of_range(path, depth, index, len))?;
            if last {
                *item = value;
                Ok(())
            } else {
                set_value(item, path, depth + 1, value)
            }
        }
        Value::Null => {
            *target = nest(&segments[depth..], value);
            Ok(())
        }
        other => Err(EditError::NotAContainer {
            path: path.prefix(depth),
            found: other.kind(),
        }),
    }
}

/// Collections of scalars that fit on one line.
fn is_flat(value: &Value) -> bool {
    let scalar = |v: &Value| v.is_scalar() && !v.as_str().is_some_and(|s| s.contains('\n'));
    match value {
        Value::Sequence(items) => items.iter().all(scalar),
        Value::Mapping(map) => map.iter().all(|(_, v)| scalar(v)),
        _ => false,
    }
}

/// Write `value` into a slot, keeping as much of the old text as applies.
fn replace_slot(slot: &mut Slot, value: Value, parent: usize, in_seq: bool, builder: &Builder<'_>) {
    let previous = slot.to_value();
    if previous == value {
        return;
    }
    let comment = slot.comment();

    if let Slot::Inline { gap, scalar: inline } = slot {
        let single_line = value.is_scalar()
            && !value.is_null()
            && !value.as_str().is_some_and(|s| s.contains('\n'));
        let was_filled = match &previous {
            Value::Sequence(items) => !items.is_empty(),
            Value::Mapping(map) => !map.is_empty(),
            _ => false,
        };
        let stays_flow = inline.is_flow() && was_filled && is_flat(&value);
        if single_line || stays_flow {
            let quoting = (!is_block_scalar_header(&inline.raw)).then_some(inline.raw.as_str());
            inline.raw = scalar::encode_inline(&value, quoting);
            inline.continuation.clear();
            if gap.is_empty() {
                gap.push(' ');
            }
            return;
        }
    }

    let mut fresh = builder.slot(&value, parent, in_seq);
    match &mut fresh {
        Slot::Inline { scalar, .. } => scalar.comment = comment,
        Slot::Block { tail, .. } => *tail = comment,
        Slot::Compact { .. } => {}
    }
    *slot = fresh;
}

fn remove_in_node(
    node: &mut Node,
    path: &KeyPath,
    depth: usize,
    builder: &Builder<'_>,
) -> Option<Value> {
    let segments = path.segments();
    let segment = &segments[depth];
    let last = depth + 1 == segments.len();

    let (slot, parent, in_seq) = match node {
        Node::Map(map) => {
            let index = map.entries.iter().position(|entry| entry.key == *segment)?;
            if last {
                let entry = map.entries.remove(index);
                let next = map.entries.get_mut(index).map(|next| &mut next.leading);
                detach(entry.leading, next, &mut map.trailing);
                return Some(entry.slot.to_value());
            }
            (&mut map.entries[index].slot, map.indent, false)
        }
        Node::Seq(seq) => {
            let index = as_index(segment).filter(|index| *index < seq.items.len())?;
            if last {
                let item = seq.items.remove(index);
                let next = seq.items.get_mut(index).map(|next| &mut next.leading);
                detach(item.leading, next, &mut seq.trailing);
                return Some(item.slot.to_value());
            }
            (&mut seq.items[index].slot, seq.indent, true)
        }
        Node::Scalar(_) => return None,
    };

    if let Some(child) = slot.node_mut() {
        let removed = remove_in_node(child, path, depth + 1, builder)?;
        tidy(slot, builder.newline);
        return Some(removed);
    }
    let mut current = slot.to_value();
    let removed = remove_value(&mut current, &segments[depth + 1..])?;
    replace_slot(slot, current, parent, in_seq, builder);
    Some(removed)
}

fn remove_value(target: &mut Value, segments: &[String]) -> Option<Value> {
    let (segment, rest) = segments.split_first()?;
    match target {
        Value::Mapping(map) if rest.is_empty() => map.remove(segment),
        Value::Mapping(map) => remove_value(map.get_mut(segment)?, rest),
        Value::Sequence(items) => {
            let index = as_index(segment).filter(|index| *index < items.len())?;
            if rest.is_empty() {
                Some(items.remove(index))
            } else {
                remove_value(&mut items[index], rest)
            }
        }
        _ => None,
    }
}

/// Hand the trivia of a removed entry to its neighbours.
///
/// Comments directly above the entry go with it; blank lines and anything
/// separated from it by a blank line stay.
fn detach(leading: Vec<String>, next: Option<&mut Vec<String>>, trailing: &mut Vec<String>) {
    let keep = leading
        .iter()
        .rposition(|line| line.trim().is_empty())
        .map_or(0, |index| index + 1);
    let mut kept: Vec<String> = leading.into_iter().take(keep).collect();
    match next {
        Some(next) => {
            kept.append(next);
            *next = kept;
        }
        None => {
            while kept.last().is_some_and(|line| line.trim().is_empty()) {
                kept.pop();
            }
            kept.append(trailing);
            *trailing = kept;
        }
    }
}

/// Fix up a collection slot after one of its children was removed.
fn tidy(slot: &mut Slot, newline: &str) {
    let (empty, first_has_trivia) = match slot.node() {
        Some(node) if node.is_empty_collection() => {
            (Some(if matches!(node, Node::Map(_)) { "{}" } else { "[]" }), false)
        }
        Some(node) => (None, !node.first_leading().is_empty()),
        None => return,
    };

    if let Some(raw) = empty {
        let gap = match &*slot {
            Slot::Compact { gap, .. } => gap.clone(),
            _ => " ".to_string(),
        };
        *slot = Slot::Inline {
            gap,
            scalar: InlineScalar {
                raw: raw.to_string(),
                comment: slot.comment(),
                eol: slot.eol().unwrap_or(newline).to_string(),
                continuation: Vec::new(),
            },
        };
        return;
    }

    if let Slot::Compact { node, .. } = slot {
        if first_has_trivia {
            // Comment lines cannot follow a dash; move the node below it.
            node.restore_first_prefix();
            let node = std::mem::replace(
                node,
                Box::new(Node::Scalar(tree::ScalarLines { lines: Vec::new() })),
            );
            *slot = Slot::Block {
                tail: String::new(),
                eol: newline.to_string(),
                node: Some(node),
            };
        } else {
            node.clear_first_prefix();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> YamlDocument {
        YamlDocument::parse(text).unwrap()
    }

    fn mapping<const N: usize>(entries: [(&str, Value); N]) -> Value {
        Value::Mapping(entries.into_iter().collect())
    }

    const PRE_COMMIT: &str = "\
# See https://pre-commit.com for more information
ci:
  autoupdate_schedule: quarterly
  skip: [pylint]

repos:
  - repo: https://github.com/pre-commit/pre-commit-hooks
    rev: v4.5.0  # frozen
    hooks:
      - id: check-yaml
      - id: end-of-file-fixer

  # formatting
  - repo: https://github.com/psf/black
    rev: \"23.1.0\"
    hooks:
      - id: black
        args: [--line-length=110]
";

    mod reading {
        use super::*;

        #[test]
        fn round_trip_is_exact() {
            for text in [
                PRE_COMMIT,
                "",
                "a: 1",
                "---\n# c\nkey: |\n  x\n\n  y\nother: >\n  folded\n...\n",
                "list:\n- a\n-   b: 1\n    c: 2\n- - nested\n  - more\n",
                "a: 1\r\nb:\r\n  - x\r\n",
                "anchors:\n  base: &base\n    x: 1\n  derived: *base\n",
            ] {
                assert_eq!(doc(text).render(), text);
            }
        }

        #[test]
        fn get_paths() {
            let d = doc(PRE_COMMIT);
            assert_eq!(d.get("ci.skip"), Some(Value::from(vec!["pylint"])));
            assert_eq!(d.get("ci.skip.0"), Some(Value::from("pylint")));
            assert_eq!(d.get("repos.1.rev"), Some(Value::from("23.1.0")));
            assert_eq!(
                d.get("repos.1.hooks.0.args"),
                Some(Value::from(vec!["--line-length=110"]))
            );
            assert_eq!(d.get("repos.2"), None);
            assert_eq!(d.get("ci.missing"), None);
            assert_eq!(d.keys(), vec!["ci", "repos"]);
        }

        #[test]
        fn value_matches_serde_yaml() {
            let expected = scalar::from_yaml(serde_yaml::from_str(PRE_COMMIT).unwrap());
            assert_eq!(doc(PRE_COMMIT).to_value(), expected);
        }

        #[test]
        fn empty_documents() {
            assert!(doc("").is_empty());
            assert!(doc("# nothing\n").is_empty());
            assert!(doc("{}\n").is_empty());
            assert!(!doc("a: 1\n").is_empty());
        }
    }

    mod writing {
        use super::*;

        #[test]
        fn scalar_keeps_comment_and_quoting() {
            let mut d = doc(PRE_COMMIT);
            d.set("repos.0.rev", "v4.6.0").unwrap();
            d.set("repos.1.rev", "24.1.0").unwrap();
            let out = d.render();
            assert!(out.contains("    rev: v4.6.0  # frozen\n"));
            assert!(out.contains("    rev: \"24.1.0\"\n"));
            assert_eq!(out.lines().count(), PRE_COMMIT.lines().count());
        }

        #[test]
        fn unchanged_value_is_a_no_op() {
            let mut d = doc("a: 'x'   # c\n");
            d.set("a", "x").unwrap();
            assert_eq!(d.render(), "a: 'x'   # c\n");
        }

        #[test]
        fn ambiguous_strings_are_quoted() {
            let mut d = doc("a: 1\n");
            d.set("a", "yes").unwrap();
            d.set("b", "1.0").unwrap();
            assert_eq!(d.render(), "a: 'yes'\nb: '1.0'\n");
            assert_eq!(d.get("a"), Some(Value::from("yes")));
        }

        #[test]
        fn new_keys_stay_strings() {
            let mut d = doc("a: 1\n");
            d.set("1", 3).unwrap();
            d.set("true", 4).unwrap();
            d.set("on", 5).unwrap();
            let out = d.render();
            assert_eq!(out, "a: 1\n'1': 3\n'true': 4\non: 5\n");

            let parsed: serde_yaml::Mapping = serde_yaml::from_str(&out).unwrap();
            for key in ["1", "true", "on"] {
                assert!(parsed.contains_key(key), "{key} is not a string key");
            }
            assert_eq!(doc(&out).get("1"), Some(Value::Integer(3)));
        }

        #[test]
        fn new_keys_nest_with_document_indent() {
            let mut d = doc("a:\n    x: 1\n");
            d.set("b.c.d", true).unwrap();
            assert_eq!(d.render(), "a:\n    x: 1\nb:\n    c:\n        d: true\n");
        }

        #[test]
        fn new_key_in_nested_map_goes_before_next_section() {
            let mut d = doc(PRE_COMMIT);
            d.set("ci.autofix_prs", false).unwrap();
            assert!(d
                .render()
                .contains("  skip: [pylint]\n  autofix_prs: false\n\nrepos:\n"));
        }

        #[test]
        fn compact_item_gets_new_key() {
            let mut d = doc("repos:\n- repo: a\n  hooks:\n  - id: x\n");
            d.set("repos.0.rev", "v1").unwrap();
            assert_eq!(
                d.render(),
                "repos:\n- repo: a\n  hooks:\n  - id: x\n  rev: v1\n"
            );
        }

        #[test]
        fn flow_sequences_stay_flow() {
            let mut d = doc("args: [a, b]  # flags\n");
            d.set("args.1", "c").unwrap();
            assert_eq!(d.render(), "args: [a, c]  # flags\n");
        }

        #[test]
        fn null_becomes_mapping_when_addressed() {
            let mut d = doc("tool:\nother: 1\n");
            d.set("tool.x", 1).unwrap();
            assert_eq!(d.render(), "tool:\n  x: 1\nother: 1\n");
        }

        #[test]
        fn multi_line_strings_use_literal_blocks() {
            let mut d = doc("run: echo\n");
            d.set("run", "echo a\necho b\n").unwrap();
            assert_eq!(d.render(), "run: |\n  echo a\n  echo b\n");
            assert_eq!(d.get("run"), Some(Value::from("echo a\necho b\n")));
        }

        #[test]
        fn block_collections_replace_scalars() {
            let mut d = doc("a: 1  # note\n");
            d.set("a", mapping([("x", Value::from(1)), ("y", Value::from(vec![1, 2]))]))
                .unwrap();
            assert_eq!(d.render(), "a:  # note\n  x: 1\n  y:\n    - 1\n    - 2\n");
        }

        #[test]
        fn errors_leave_the_document_untouched() {
            let mut d = doc("a: 1\nl: [x]\n");
            assert!(matches!(
                d.set("a.b", 2),
                Err(EditError::NotAContainer { found: "integer", .. })
            ));
            assert!(matches!(
                d.set("l.3", 2),
                Err(EditError::IndexOutOfRange { index: 3, len: 1, .. })
            ));
            assert!(matches!(d.set("l.x", 2), Err(EditError::InvalidPath(_))));
            assert_eq!(d.render(), "a: 1\nl: [x]\n");
        }

        #[test]
        fn empty_document_gets_content_below_comments() {
            let mut d = doc("# header\n");
            d.set("a", 1).unwrap();
            assert_eq!(d.render(), "# header\na: 1\n");
            let mut d = YamlDocument::empty();
            d.set("key", "value").unwrap();
            assert_eq!(d.render(), "key: value\n");
        }

        #[test]
        fn missing_final_newline_is_kept() {
            let mut d = doc("a: 1");
            d.set("b", 2).unwrap();
            assert_eq!(d.render(), "a: 1\nb: 2");
        }

        #[test]
        fn crlf_is_kept_for_new_lines() {
            let mut d = doc("a: 1\r\n");
            d.set("b.c", 2).unwrap();
            assert_eq!(d.render(), "a: 1\r\nb:\r\n  c: 2\r\n");
        }
    }

    mod removing {
        use super::*;

        #[test]
        fn attached_comments_go_with_the_entry() {
            let mut d = doc("a: 1\n\n# about b\nb: 2\nc: 3\n");
            assert_eq!(d.remove("b").unwrap(), Some(Value::from(2)));
            assert_eq!(d.render(), "a: 1\n\nc: 3\n");
        }

        #[test]
        fn last_entry() {
            let mut d = doc("x:\n  a: 1\n\n  b: 2\n\ny: 3\n");
            d.remove("x.b").unwrap();
            assert_eq!(d.render(), "x:\n  a: 1\n\ny: 3\n");
        }

        #[test]
        fn emptied_collections_become_flow() {
            let mut d = doc("x:\n  a: 1\ny:\n  - 1\n");
            d.remove("x.a").unwrap();
            d.remove("y.0").unwrap();
            assert_eq!(d.render(), "x: {}\ny: []\n");
        }

        #[test]
        fn first_key_of_compact_item() {
            let mut d = doc("- a: 1\n  b: 2\n- c: 3\n");
            d.remove("0.a").unwrap();
            assert_eq!(d.render(), "- b: 2\n- c: 3\n");
        }

        #[test]
        fn inside_flow() {
            let mut d = doc("skip: [a, b, c]\n");
            assert_eq!(d.remove("skip.1").unwrap(), Some(Value::from("b")));
            assert_eq!(d.render(), "skip: [a, c]\n");
        }

        #[test]
        fn missing_path_is_none() {
            let mut d = doc("a: 1\n");
            assert_eq!(d.remove("b.c").unwrap(), None);
            assert_eq!(d.render(), "a: 1\n");
        }
    }

    mod pushing {
        use super::*;

        #[test]
        fn block_sequence_item_keeps_style() {
            let mut d = doc(PRE_COMMIT);
            d.push(
                "repos",
                mapping([
                    ("repo", Value::from("https://github.com/x/y")),
                    ("rev", Value::from("v1")),
                    ("hooks", Value::from(vec![mapping([("id", Value::from("z"))])])),
                ]),
            )
            .unwrap();
            assert!(d.render().ends_with(
                "        args: [--line-length=110]\n  - repo: https://github.com/x/y\n    rev: v1\n    hooks:\n      - id: z\n"
            ));
        }

        #[test]
        fn flow_sequence_item() {
            let mut d = doc(PRE_COMMIT);
            d.push("ci.skip", "mypy").unwrap();
            assert!(d.render().contains("  skip: [pylint, mypy]\n"));
        }

        #[test]
        fn missing_sequence_is_created() {
            let mut d = doc("a: 1\n");
            d.push("b", "x").unwrap();
            assert_eq!(d.render(), "a: 1\nb:\n  - x\n");
        }

        #[test]
        fn indentless_sequence() {
            let mut d = doc("l:\n- a\n");
            d.push("l", "b").unwrap();
            assert_eq!(d.render(), "l:\n- a\n- b\n");
        }

        #[test]
        fn scalar_is_not_a_sequence() {
            let mut d = doc("a: 1\n");
            assert!(matches!(d.push("a", 2), Err(EditError::NotAContainer { .. })));
        }
    }

    mod comments {
        use super::*;

        #[test]
        fn read_end_of_line_comments() {
            let d = doc(PRE_COMMIT);
            assert_eq!(d.comment("repos.0.rev").as_deref(), Some("frozen"));
            assert_eq!(d.comment("repos.1.rev"), None);
            assert_eq!(d.comment("repos.9.rev"), None);
        }

        #[test]
        fn set_replace_and_clear() {
            let mut d = doc("deps:\n  - black  # pypi\n  - isort\nmap:\n  a: 1\n");
            d.set_comment("deps.1", "pypi").unwrap();
            d.set_comment("deps.0", "pip").unwrap();
            d.set_comment("map", "nested").unwrap();
            assert_eq!(
                d.render(),
                "deps:\n  - black  # pip\n  - isort # pypi\nmap: # nested\n  a: 1\n"
            );
            assert_eq!(d.comment("map").as_deref(), Some("nested"));

            d.set_comment("deps.0", "").unwrap();
            assert!(d.render().starts_with("deps:\n  - black\n"));
            assert_eq!(d.get("map.a"), Some(Value::Integer(1)));
        }

        #[test]
        fn block_scalar_header_takes_a_comment() {
            let mut d = doc("script: |\n  make\n");
            d.set_comment("script", "run").unwrap();
            assert_eq!(d.render(), "script: | # run\n  make\n");
            assert_eq!(d.get("script"), Some(Value::from("make\n")));
        }

        #[test]
        fn where_no_comment_fits() {
            let mut d = doc("flow: [a, b]\nlist:\n  - k: v\n");
            assert!(matches!(
                d.set_comment("flow.0", "x"),
                Err(EditError::Unrepresentable { .. })
            ));
            assert!(matches!(
                d.set_comment("list.0", "x"),
                Err(EditError::Unrepresentable { .. })
            ));
            assert!(matches!(d.set_comment("missing", "x"), Err(EditError::InvalidPath(_))));
            assert!(matches!(
                d.set_comment("flow", "two\nlines"),
                Err(EditError::Unrepresentable { .. })
            ));
            assert_eq!(d.render(), "flow: [a, b]\nlist:\n  - k: v\n");
        }
    }
}
