//! editor::toml
//!
//! TOML adapter over `toml_edit`.
//!
//! `toml_edit` keeps every byte of the parsed file as decoration around keys
//! and values, so this adapter only has to make sure replacements inherit
//! the decoration of what they replace.
//!
//! # Mapping rules
//!
//! - A mapping stored under a standard table becomes a `[table]`; anywhere
//!   else it becomes an inline table.
//! - A non-empty sequence of mappings under a standard table becomes an
//!   array of tables (`[[name]]`).
//! - TOML has no null, so storing [`Value::Null`] fails with
//!   [`EditError::Unrepresentable`].

use toml_edit::{
    Array, ArrayOfTables, DocumentMut, InlineTable, Item, Table, TableLike, Value as TomlValue,
};

use super::path::as_index;
use super::precommit::{FormatterHook, PRETTIER_TOML};
use super::{Document, EditError, KeyPath, Mapping, ParseError, StructuredDocument, Value};

const FORMAT: &str = "toml";

/// A TOML file.
#[derive(Debug, Clone, Default)]
pub struct TomlDocument {
    doc: DocumentMut,
}

impl TomlDocument {
    /// Direct access to the underlying `toml_edit` document.
    pub fn as_toml(&self) -> &DocumentMut {
        &self.doc
    }

    pub fn as_toml_mut(&mut self) -> &mut DocumentMut {
        &mut self.doc
    }
}

impl Document for TomlDocument {
    const FORMAT: &'static str = FORMAT;

    fn parse(text: &str) -> Result<Self, ParseError> {
        let doc = text.parse::<DocumentMut>().map_err(|e| {
            let line = e
                .span()
                .map(|span| line_of(text, span.start))
                .unwrap_or(1);
            ParseError::new(FORMAT, line, e.message().trim())
        })?;
        Ok(Self { doc })
    }

    fn empty() -> Self {
        Self::default()
    }

    fn render(&self) -> String {
        self.doc.to_string()
    }

    fn is_empty(&self) -> bool {
        self.doc.as_table().is_empty()
    }

    fn formatter_hook() -> Option<&'static FormatterHook> {
        Some(&PRETTIER_TOML)
    }
}

impl StructuredDocument for TomlDocument {
    fn get_at(&self, path: &KeyPath) -> Option<Value> {
        let mut node = Node::Table(self.doc.as_table());
        for segment in path.segments() {
            node = node.child(segment)?;
        }
        node.to_value()
    }

    fn set_at(&mut self, path: &KeyPath, value: Value) -> Result<(), EditError> {
        let (parents, key) = path.split_last();
        let Some(slot) = descend(self.doc.as_table_mut(), path, parents, true)? else {
            return Err(EditError::InvalidPath(path.to_string()));
        };
        slot.set(key, &value, path)
    }

    fn remove_at(&mut self, path: &KeyPath) -> Result<Option<Value>, EditError> {
        let (parents, key) = path.split_last();
        match descend(self.doc.as_table_mut(), path, parents, false)? {
            Some(slot) => Ok(slot.remove(key)),
            None => Ok(None),
        }
    }

    fn push_at(&mut self, path: &KeyPath, value: Value) -> Result<(), EditError> {
        let (parents, key) = path.split_last();
        let Some(slot) = descend(self.doc.as_table_mut(), path, parents, true)? else {
            return Err(EditError::InvalidPath(path.to_string()));
        };
        slot.push(key, value, path)
    }

    fn to_value(&self) -> Value {
        table_value(self.doc.as_table())
    }
}

fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}

/// Read-only cursor.
enum Node<'a> {
    Item(&'a Item),
    Table(&'a Table),
    Value(&'a TomlValue),
}

impl<'a> Node<'a> {
    fn child(self, segment: &str) -> Option<Node<'a>> {
        match self {
            Node::Table(table) => table.get(segment).map(Node::Item),
            Node::Item(Item::Table(table)) => table.get(segment).map(Node::Item),
            Node::Item(Item::ArrayOfTables(tables)) => {
                tables.get(as_index(segment)?).map(Node::Table)
            }
            Node::Item(Item::Value(value)) => Node::Value(value).child(segment),
            Node::Item(Item::None) => None,
            Node::Value(TomlValue::InlineTable(table)) => table.get(segment).map(Node::Value),
            Node::Value(TomlValue::Array(array)) => array.get(as_index(segment)?).map(Node::Value),
            Node::Value(_) => None,
        }
    }

    fn to_value(&self) -> Option<Value> {
        match self {
            Node::Item(item) => item_value(item),
            Node::Table(table) => Some(table_value(*table)),
            Node::Value(value) => Some(toml_value(value)),
        }
    }
}

/// Mutable container cursor.
enum Slot<'a> {
    Table(&'a mut dyn TableLike, bool),
    Array(&'a mut Array),
    Tables(&'a mut ArrayOfTables),
}

/// Walk `parents` from the root table, creating missing tables when `create`.
fn descend<'a>(
    root: &'a mut Table,
    path: &KeyPath,
    parents: &[String],
    create: bool,
) -> Result<Option<Slot<'a>>, EditError> {
    let mut slot = Slot::Table(root, false);
    for (depth, segment) in parents.iter().enumerate() {
        slot = match slot.child(segment, path, depth + 1, create)? {
            Some(next) => next,
            None => return Ok(None),
        };
    }
    Ok(Some(slot))
}

fn index_of(segment: &str, path: &KeyPath, depth: usize) -> Result<usize, EditError> {
    as_index(segment).ok_or_else(|| {
        EditError::InvalidPath(format!("{path} ('{}' is a sequence)", path.prefix(depth - 1)))
    })
}

fn out_of_range(path: &KeyPath, depth: usize, index: usize, len: usize) -> EditError {
    EditError::IndexOutOfRange {
        path: path.prefix(depth - 1),
        index,
        len,
    }
}

impl<'a> Slot<'a> {
    fn child(
        self,
        segment: &str,
        path: &KeyPath,
        depth: usize,
        create: bool,
    ) -> Result<Option<Slot<'a>>, EditError> {
        match self {
            Slot::Table(table, inline) => {
                if !table.contains_key(segment) {
                    if !create {
                        return Ok(None);
                    }
                    let item = if inline {
                        Item::Value(TomlValue::InlineTable(InlineTable::new()))
                    } else {
                        let mut table = Table::new();
                        table.set_implicit(true);
                        Item::Table(table)
                    };
                    append(table, segment, item, inline);
                }
                let Some(item) = table.get_mut(segment) else {
                    return Ok(None);
                };
                let found = item.type_name();
                match item {
                    Item::Table(t) => Ok(Some(Slot::Table(t, false))),
                    Item::ArrayOfTables(a) => Ok(Some(Slot::Tables(a))),
                    Item::Value(TomlValue::InlineTable(t)) => Ok(Some(Slot::Table(t, true))),
                    Item::Value(TomlValue::Array(a)) => Ok(Some(Slot::Array(a))),
                    _ => Err(EditError::NotAContainer {
                        path: path.prefix(depth),
                        found,
                    }),
                }
            }
            Slot::Array(array) => {
                let index = index_of(segment, path, depth)?;
                let len = array.len();
                match array.get_mut(index) {
                    Some(TomlValue::InlineTable(t)) => Ok(Some(Slot::Table(t, true))),
                    Some(TomlValue::Array(a)) => Ok(Some(Slot::Array(a))),
                    Some(other) => Err(EditError::NotAContainer {
                        path: path.prefix(depth),
                        found: other.type_name(),
                    }),
                    None if create => Err(out_of_range(path, depth, index, len)),
                    None => Ok(None),
                }
            }
            Slot::Tables(tables) => {
                let index = index_of(segment, path, depth)?;
                let len = tables.len();
                match tables.get_mut(index) {
                    Some(t) => Ok(Some(Slot::Table(t, false))),
                    None if create => Err(out_of_range(path, depth, index, len)),
                    None => Ok(None),
                }
            }
        }
    }

    fn set(self, key: &str, value: &Value, path: &KeyPath) -> Result<(), EditError> {
        let depth = path.len();
        match self {
            Slot::Table(table, inline) => {
                let item = to_item(value, !inline, path)?;
                if table.contains_key(key) {
                    if let Some(existing) = table.get_mut(key) {
                        replace_item(existing, item);
                    }
                } else {
                    append(table, key, item, inline);
                }
                Ok(())
            }
            Slot::Array(array) => {
                let index = index_of(key, path, depth)?;
                let len = array.len();
                let new = to_toml_value(value, path)?;
                match array.get_mut(index) {
                    Some(existing) => {
                        let new = restyle(existing, new);
                        *existing = new;
                        Ok(())
                    }
                    None => Err(out_of_range(path, depth, index, len)),
                }
            }
            Slot::Tables(tables) => {
                let index = index_of(key, path, depth)?;
                let len = tables.len();
                let Value::Mapping(map) = value else {
                    return Err(array_of_tables_only(path, value));
                };
                let mut new = mapping_table(map, path)?;
                match tables.get_mut(index) {
                    Some(existing) => {
                        *new.decor_mut() = existing.decor().clone();
                        if let Some(position) = existing.position() {
                            new.set_position(position);
                        }
                        *existing = new;
                        Ok(())
                    }
                    None => Err(out_of_range(path, depth, index, len)),
                }
            }
        }
    }

    fn remove(self, key: &str) -> Option<Value> {
        match self {
            Slot::Table(table, _) => table.remove(key).as_ref().and_then(item_value),
            Slot::Array(array) => {
                let index = as_index(key).filter(|i| *i < array.len())?;
                let first_decor = (index == 0).then(|| array.get(0).map(|v| v.decor().clone()));
                let removed = array.remove(index);
                if let (Some(Some(decor)), Some(next)) = (first_decor, array.get_mut(0)) {
                    *next.decor_mut() = decor;
                }
                Some(toml_value(&removed))
            }
            Slot::Tables(tables) => {
                let index = as_index(key).filter(|i| *i < tables.len())?;
                let removed = tables.get(index).map(table_value);
                tables.remove(index);
                removed
            }
        }
    }

    fn push(self, key: &str, value: Value, path: &KeyPath) -> Result<(), EditError> {
        match self {
            Slot::Table(table, inline) => {
                if !table.contains_key(key) {
                    let item = to_item(&Value::Sequence(vec![value]), !inline, path)?;
                    append(table, key, item, inline);
                    return Ok(());
                }
                let Some(existing) = table.get_mut(key) else {
                    return Ok(());
                };
                let found = existing.type_name();
                match existing {
                    Item::Value(TomlValue::Array(array)) => push_value(array, &value, path),
                    Item::ArrayOfTables(tables) => match &value {
                        Value::Mapping(map) => {
                            tables.push(mapping_table(map, path)?);
                            Ok(())
                        }
                        other => Err(array_of_tables_only(path, other)),
                    },
                    _ => Err(EditError::NotAContainer {
                        path: path.to_string(),
                        found,
                    }),
                }
            }
            Slot::Array(array) => {
                let depth = path.len();
                let index = index_of(key, path, depth)?;
                let len = array.len();
                match array.get_mut(index) {
                    Some(TomlValue::Array(inner)) => push_value(inner, &value, path),
                    Some(other) => Err(EditError::NotAContainer {
                        path: path.to_string(),
                        found: other.type_name(),
                    }),
                    None => Err(out_of_range(path, depth, index, len)),
                }
            }
            Slot::Tables(_) => Err(EditError::NotAContainer {
                path: path.to_string(),
                found: "table",
            }),
        }
    }
}

fn array_of_tables_only(path: &KeyPath, value: &Value) -> EditError {
    EditError::Unrepresentable {
        format: FORMAT,
        path: path.to_string(),
        kind: value.kind(),
        reason: "an array of tables only holds tables".to_string(),
    }
}

/// Add a new last entry. In an inline table the space before the closing
/// brace moves from the previous last value to the new one.
fn append(table: &mut dyn TableLike, key: &str, item: Item, inline: bool) {
    if inline {
        if let Some((_, Item::Value(last))) = table.iter_mut().last() {
            last.decor_mut().set_suffix("");
        }
    }
    table.insert(key, item);
}

/// Append to an array, formatted like its current last element.
fn push_value(array: &mut Array, value: &Value, path: &KeyPath) -> Result<(), EditError> {
    let mut new = to_toml_value(value, path)?;
    let last_decor = array.iter().last().map(|last| last.decor().clone());
    match last_decor {
        Some(decor) => {
            let multiline = decor
                .prefix()
                .and_then(|p| p.as_str())
                .is_some_and(|p| p.contains('\n'));
            if multiline || array.len() > 1 {
                *new.decor_mut() = decor;
            } else {
                new.decor_mut().set_prefix(" ");
                new.decor_mut().set_suffix("");
            }
            array.push_formatted(new);
        }
        None => array.push(new),
    }
    Ok(())
}

/// Put `new` in place of `slot`, keeping the surrounding formatting.
fn replace_item(slot: &mut Item, new: Item) {
    let new = match (&*slot, new) {
        (Item::Value(old), Item::Value(value)) => Item::Value(restyle(old, value)),
        (Item::Table(old), Item::Table(mut table)) => {
            *table.decor_mut() = old.decor().clone();
            if let Some(position) = old.position() {
                table.set_position(position);
            }
            Item::Table(table)
        }
        (_, new) => new,
    };
    *slot = new;
}

/// Give `new` the decoration of `old`, and its literal quoting when the new
/// string can be written that way.
fn restyle(old: &TomlValue, new: TomlValue) -> TomlValue {
    let literal = match (old, &new) {
        (TomlValue::String(before), TomlValue::String(after)) => {
            let raw = before
                .as_repr()
                .and_then(|repr| repr.as_raw().as_str())
                .unwrap_or_default();
            let text = after.value();
            let literal_ok = !text.contains('\'') && !text.chars().any(char::is_control);
            if raw.starts_with('\'') && !raw.starts_with("'''") && literal_ok {
                format!("'{text}'").parse::<TomlValue>().ok()
            } else {
                None
            }
        }
        _ => None,
    };
    let mut new = literal.unwrap_or(new);
    *new.decor_mut() = old.decor().clone();
    new
}

/// Convert for storage under a table key.
fn to_item(value: &Value, standard_table: bool, path: &KeyPath) -> Result<Item, EditError> {
    if standard_table {
        match value {
            Value::Mapping(map) => return Ok(Item::Table(mapping_table(map, path)?)),
            Value::Sequence(items)
                if !items.is_empty() && items.iter().all(|v| v.as_mapping().is_some()) =>
            {
                let mut tables = ArrayOfTables::new();
                for item in items {
                    if let Value::Mapping(map) = item {
                        tables.push(mapping_table(map, path)?);
                    }
                }
                return Ok(Item::ArrayOfTables(tables));
            }
            _ => {}
        }
    }
    to_toml_value(value, path).map(Item::Value)
}

fn mapping_table(map: &Mapping, path: &KeyPath) -> Result<Table, EditError> {
    let mut table = Table::new();
    for (key, value) in map.iter() {
        table.insert(key, to_item(value, true, &path.child(key))?);
    }
    Ok(table)
}

fn to_toml_value(value: &Value, path: &KeyPath) -> Result<TomlValue, EditError> {
    Ok(match value {
        Value::Null => {
            return Err(EditError::Unrepresentable {
                format: FORMAT,
                path: path.to_string(),
                kind: "null",
                reason: "TOML has no null value".to_string(),
            })
        }
        Value::Bool(b) => TomlValue::from(*b),
        Value::Integer(i) => TomlValue::from(*i),
        Value::Float(f) => TomlValue::from(*f),
        Value::String(s) => TomlValue::from(s.as_str()),
        Value::Sequence(items) => {
            let mut array = Array::new();
            for (i, item) in items.iter().enumerate() {
                array.push(to_toml_value(item, &path.child(i.to_string()))?);
            }
            TomlValue::Array(array)
        }
        Value::Mapping(map) => {
            let mut table = InlineTable::new();
            for (key, item) in map.iter() {
                table.insert(key, to_toml_value(item, &path.child(key))?);
            }
            TomlValue::InlineTable(table)
        }
    })
}

fn item_value(item: &Item) -> Option<Value> {
    match item {
        Item::None => None,
        Item::Value(value) => Some(toml_value(value)),
        Item::Table(table) => Some(table_value(table)),
        Item::ArrayOfTables(tables) => Some(Value::Sequence(tables.iter().map(table_value).collect())),
    }
}

fn table_value(table: &Table) -> Value {
    Value::Mapping(
        table
            .iter()
            .filter_map(|(key, item)| item_value(item).map(|v| (key, v)))
            .collect(),
    )
}

fn toml_value(value: &TomlValue) -> Value {
    match value {
        TomlValue::String(s) => Value::String(s.value().clone()),
        TomlValue::Integer(i) => Value::Integer(*i.value()),
        TomlValue::Float(f) => Value::Float(*f.value()),
        TomlValue::Boolean(b) => Value::Bool(*b.value()),
        TomlValue::Datetime(d) => Value::String(d.value().to_string()),
        TomlValue::Array(array) => Value::Sequence(array.iter().map(toml_value).collect()),
        TomlValue::InlineTable(table) => Value::Mapping(
            table
                .iter()
                .map(|(key, value)| (key, toml_value(value)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PYPROJECT: &str = r#"# Build settings
[build-system]
requires = ["setuptools", "wheel"]  # minimal

[tool.black]
line-length = 100   # wide screens
target = 'py39'

[[tool.mypy.overrides]]
module = "tests.*"
ignore_errors = true

[[tool.mypy.overrides]]
module = "vendor.*"
"#;

    fn doc(text: &str) -> TomlDocument {
        TomlDocument::parse(text).unwrap()
    }

    mod reading {
        use super::*;

        #[test]
        fn roundtrip_is_exact() {
            assert_eq!(doc(PYPROJECT).render(), PYPROJECT);
        }

        #[test]
        fn nested_values() {
            let d = doc(PYPROJECT);
            assert_eq!(d.get("tool.black.line-length"), Some(Value::Integer(100)));
            assert_eq!(d.get("build-system.requires.1"), Some("wheel".into()));
            assert_eq!(d.get("tool.mypy.overrides.1.module"), Some("vendor.*".into()));
        }

        #[test]
        fn missing_paths_are_none() {
            let d = doc(PYPROJECT);
            assert_eq!(d.get("tool.isort"), None);
            assert_eq!(d.get("build-system.requires.5"), None);
            assert_eq!(d.get("tool.black.line-length.x"), None);
            assert_eq!(d.get_or("tool.isort.profile", "black"), Value::from("black"));
        }

        #[test]
        fn top_level_keys() {
            assert_eq!(doc(PYPROJECT).keys(), vec!["build-system", "tool"]);
        }

        #[test]
        fn parse_error_has_line() {
            let err = TomlDocument::parse("a = 1\nb = = 2\n").unwrap_err();
            assert_eq!(err.line, 2);
            assert_eq!(err.format, "toml");
        }
    }

    mod writing {
        use super::*;

        #[test]
        fn new_key_in_inline_table() {
            let mut d = doc("[project]\ninline = { a = 1 }  # kept\n");
            d.set("project.inline.b", 2).unwrap();
            d.set("project.inline.c.d", "x").unwrap();
            assert_eq!(
                d.render(),
                "[project]\ninline = { a = 1, b = 2, c = { d = \"x\" } }  # kept\n"
            );
        }

        #[test]
        fn replace_keeps_comment() {
            let mut d = doc(PYPROJECT);
            d.set("tool.black.line-length", 110).unwrap();
            let expected = PYPROJECT.replace("line-length = 100 ", "line-length = 110 ");
            assert_eq!(d.render(), expected);
        }

        #[test]
        fn replace_keeps_literal_quotes() {
            let mut d = doc(PYPROJECT);
            d.set("tool.black.target", "py311").unwrap();
            assert!(d.render().contains("target = 'py311'\n"));
        }

        #[test]
        fn new_key_is_appended_to_its_table() {
            let mut d = doc("[a]\nx = 1\n\n[b]\ny = 2\n");
            d.set("a.z", true).unwrap();
            assert_eq!(d.render(), "[a]\nx = 1\nz = true\n\n[b]\ny = 2\n");
        }

        #[test]
        fn new_table_is_created() {
            let mut d = doc("[tool.black]\nline-length = 100\n");
            d.set("tool.isort.profile", "black").unwrap();
            assert_eq!(
                d.render(),
                "[tool.black]\nline-length = 100\n\n[tool.isort]\nprofile = \"black\"\n"
            );
        }

        #[test]
        fn setdefault_is_idempotent() {
            let mut d = doc("[a]\nx = 1\n");
            assert_eq!(d.setdefault("a.y", "v").unwrap(), Value::from("v"));
            let once = d.render();
            assert_eq!(d.setdefault("a.y", "other").unwrap(), Value::from("v"));
            assert_eq!(d.render(), once);
        }

        #[test]
        fn null_is_unrepresentable() {
            let mut d = doc("a = 1\n");
            let err = d.set("a", Value::Null).unwrap_err();
            assert!(matches!(err, EditError::Unrepresentable { kind: "null", .. }));
            assert_eq!(d.render(), "a = 1\n");
        }

        #[test]
        fn index_write_never_extends() {
            let mut d = doc("a = [1, 2]\n");
            let err = d.set("a.2", 3).unwrap_err();
            assert!(matches!(err, EditError::IndexOutOfRange { index: 2, len: 2, .. }));
            d.set("a.1", 5).unwrap();
            assert_eq!(d.render(), "a = [1, 5]\n");
        }

        #[test]
        fn writing_through_a_scalar_fails() {
            let mut d = doc("a = 1\n");
            assert!(matches!(
                d.set("a.b", 1),
                Err(EditError::NotAContainer { .. })
            ));
        }

        #[test]
        fn mapping_in_array_is_inline() {
            let mut d = doc("a = []\n");
            d.push("a", Mapping::from_iter([("k", 1)])).unwrap();
            assert_eq!(d.render(), "a = [{ k = 1 }]\n");
        }
    }

    mod lists {
        use super::*;

        #[test]
        fn push_follows_multiline_layout() {
            let mut d = doc("deps = [\n    \"a\",\n    \"b\",\n]\n");
            d.push("deps", "c").unwrap();
            assert_eq!(d.render(), "deps = [\n    \"a\",\n    \"b\",\n    \"c\",\n]\n");
        }

        #[test]
        fn push_to_single_element_array() {
            let mut d = doc("a = [1]\n");
            d.push("a", 2).unwrap();
            assert_eq!(d.render(), "a = [1, 2]\n");
        }

        #[test]
        fn push_creates_array() {
            let mut d = doc("[a]\n");
            d.push("a.list", "x").unwrap();
            assert_eq!(d.get("a.list"), Some(Value::from(vec!["x"])));
        }

        #[test]
        fn push_table_to_array_of_tables() {
            let mut d = doc(PYPROJECT);
            d.push(
                "tool.mypy.overrides",
                Mapping::from_iter([("module", "docs.*")]),
            )
            .unwrap();
            assert!(d.render().ends_with("[[tool.mypy.overrides]]\nmodule = \"docs.*\"\n"));
            assert_eq!(d.get("tool.mypy.overrides.2.module"), Some("docs.*".into()));
        }

        #[test]
        fn push_scalar_to_array_of_tables_fails() {
            let mut d = doc(PYPROJECT);
            assert!(matches!(
                d.push("tool.mypy.overrides", 1),
                Err(EditError::Unrepresentable { .. })
            ));
        }
    }

    mod removing {
        use super::*;

        #[test]
        fn remove_key_with_its_comment() {
            let mut d = doc("a = 1\n# about b\nb = 2\nc = 3\n");
            assert_eq!(d.remove("b").unwrap(), Some(Value::Integer(2)));
            assert_eq!(d.render(), "a = 1\nc = 3\n");
        }

        #[test]
        fn remove_first_array_element() {
            let mut d = doc("a = [1, 2, 3]\n");
            assert_eq!(d.remove("a.0").unwrap(), Some(Value::Integer(1)));
            assert_eq!(d.render(), "a = [2, 3]\n");
        }

        #[test]
        fn remove_missing_is_none() {
            let mut d = doc("a = 1\n");
            assert_eq!(d.remove("b.c").unwrap(), None);
            assert_eq!(d.render(), "a = 1\n");
        }
    }
}
