//! editor::ini
//!
//! Lossless INI-style configuration files (`setup.cfg`, `tox.ini`,
//! `.flake8`, ...).
//!
//! The file is kept as lines. Each option remembers its key text, its
//! delimiter with the surrounding spaces, its value text and its
//! continuation lines, so unmodified options render byte for byte.
//!
//! # Paths
//!
//! `section.key`. Section names may contain dots; the last segment is always
//! the key. A path naming a whole section addresses that section as a
//! mapping. Values are strings; an option without a delimiter reads as
//! [`Value::Null`]. Options are matched exactly first, then ignoring case.

use super::{Document, EditError, KeyPath, Mapping, ParseError, StructuredDocument, Value};

const FORMAT: &str = "ini";
const DEFAULT_DELIMITER: &str = " = ";
const DEFAULT_CONTINUATION_INDENT: &str = "    ";

/// An INI-style configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    preamble: Vec<String>,
    sections: Vec<Section>,
    newline: Newline,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Newline {
    #[default]
    Lf,
    CrLf,
}

impl Newline {
    fn as_str(self) -> &'static str {
        match self {
            Newline::Lf => "\n",
            Newline::CrLf => "\r\n",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    /// Comment lines directly above the header.
    leading: Vec<String>,
    header: String,
    name: String,
    options: Vec<Entry>,
    /// Blank and comment lines after the last option.
    trailing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    leading: Vec<String>,
    key_raw: String,
    delimiter: Option<String>,
    value_raw: String,
    /// Trailing spaces and line ending of the key line.
    tail: String,
    continuation: Vec<String>,
}

impl Entry {
    fn key(&self) -> &str {
        self.key_raw.trim()
    }

    fn value(&self) -> Value {
        if self.delimiter.is_none() {
            return Value::Null;
        }
        let mut text = self.value_raw.clone();
        for line in &self.continuation {
            text.push('\n');
            text.push_str(line.trim());
        }
        Value::String(text.trim().to_string())
    }

    fn terminate(&mut self, newline: Newline) {
        match self.continuation.last_mut() {
            Some(line) => terminate_line(line, newline),
            None => terminate_line(&mut self.tail, newline),
        }
    }

    fn render(&self, out: &mut String) {
        out.extend(self.leading.iter().map(String::as_str));
        out.push_str(&self.key_raw);
        if let Some(delimiter) = &self.delimiter {
            out.push_str(delimiter);
            out.push_str(&self.value_raw);
        }
        out.push_str(&self.tail);
        out.extend(self.continuation.iter().map(String::as_str));
    }

    /// Rewrite the value, keeping key text, delimiter and indentation.
    fn set(&mut self, value: Option<&str>, delimiter: &str, newline: Newline) {
        let Some(text) = value else {
            self.delimiter = None;
            self.value_raw.clear();
            self.continuation.clear();
            return;
        };
        if self.delimiter.is_none() {
            self.delimiter = Some(delimiter.to_string());
        }
        let indent = self
            .continuation
            .first()
            .map(|line| leading_whitespace(line).to_string())
            .filter(|indent| !indent.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTINUATION_INDENT.to_string());

        let mut lines = text.split('\n');
        self.value_raw = lines.next().unwrap_or_default().trim_end().to_string();
        if let Some(delimiter) = &mut self.delimiter {
            if self.value_raw.is_empty() {
                let trimmed = delimiter.trim_end().len();
                delimiter.truncate(trimmed);
            } else if delimiter.starts_with(' ') && !delimiter.ends_with(' ') {
                delimiter.push(' ');
            }
        }
        let eol = self.tail.trim_start_matches([' ', '\t']).to_string();
        self.tail = if eol.is_empty() { newline.as_str().to_string() } else { eol };
        self.continuation = lines
            .map(|line| format!("{indent}{}{}", line.trim(), newline.as_str()))
            .collect();
    }
}

impl Section {
    fn find(&self, key: &str) -> Option<usize> {
        self.options
            .iter()
            .position(|o| o.key() == key)
            .or_else(|| {
                self.options
                    .iter()
                    .position(|o| o.key().eq_ignore_ascii_case(key))
            })
    }

    fn to_mapping(&self) -> Mapping {
        self.options
            .iter()
            .map(|o| (o.key().to_string(), o.value()))
            .collect()
    }

    /// Delimiter of the first option that has a value on its key line.
    fn delimiter(&self) -> Option<&str> {
        self.options
            .iter()
            .filter(|o| !o.value_raw.is_empty())
            .find_map(|o| o.delimiter.as_deref())
    }

    fn render(&self, out: &mut String) {
        out.extend(self.leading.iter().map(String::as_str));
        out.push_str(&self.header);
        for option in &self.options {
            option.render(out);
        }
        out.extend(self.trailing.iter().map(String::as_str));
    }

    /// Make sure the last rendered line of this section ends with a newline.
    fn terminate(&mut self, newline: Newline) {
        if let Some(line) = self.trailing.last_mut() {
            terminate_line(line, newline);
        } else if let Some(entry) = self.options.last_mut() {
            entry.terminate(newline);
        } else {
            terminate_line(&mut self.header, newline);
        }
    }
}

fn terminate_line(line: &mut String, newline: Newline) {
    if !line.ends_with('\n') {
        line.push_str(newline.as_str());
    }
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

fn is_trivia(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';')
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Split `lines` so the comments directly above the next node (after the
/// last blank line) are separated from the rest.
fn split_attached(mut lines: Vec<String>) -> (Vec<String>, Vec<String>) {
    let cut = lines.iter().rposition(|l| is_blank(l)).map_or(0, |i| i + 1);
    let attached = lines.split_off(cut);
    (lines, attached)
}

fn strip_eol(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

fn parse_option(line: &str) -> Entry {
    let (body, eol) = strip_eol(line);
    let content = body.trim_end_matches([' ', '\t']);
    let tail = format!("{}{eol}", &body[content.len()..]);

    match content.find(['=', ':']) {
        Some(at) => {
            let key_raw = content[..at].trim_end().to_string();
            let after = &content[at + 1..];
            let value_raw = after.trim_start().to_string();
            let delimiter = format!(
                "{}{}{}",
                &content[key_raw.len()..at],
                &content[at..at + 1],
                &after[..after.len() - value_raw.len()]
            );
            Entry {
                leading: Vec::new(),
                key_raw,
                delimiter: Some(delimiter),
                value_raw,
                tail,
                continuation: Vec::new(),
            }
        }
        None => Entry {
            leading: Vec::new(),
            key_raw: content.to_string(),
            delimiter: None,
            value_raw: String::new(),
            tail,
            continuation: Vec::new(),
        },
    }
}

impl Document for IniDocument {
    const FORMAT: &'static str = FORMAT;

    fn parse(text: &str) -> Result<Self, ParseError> {
        let newline = if text.contains("\r\n") { Newline::CrLf } else { Newline::Lf };
        let mut doc = IniDocument {
            newline,
            ..Self::default()
        };
        let mut pending: Vec<String> = Vec::new();

        for (index, line) in text.split_inclusive('\n').enumerate() {
            let number = index + 1;
            let (body, _) = strip_eol(line);
            let trimmed = body.trim();

            let continues = !is_trivia(body)
                && body.starts_with([' ', '\t'])
                && pending.is_empty()
                && doc
                    .sections
                    .last()
                    .is_some_and(|s| !s.options.is_empty());
            if continues {
                if let Some(option) = doc.sections.last_mut().and_then(|s| s.options.last_mut()) {
                    option.continuation.push(line.to_string());
                }
                continue;
            }

            if is_trivia(body) {
                pending.push(line.to_string());
                continue;
            }

            if trimmed.starts_with('[') {
                let name = trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.find(']').map(|end| &rest[..end]))
                    .ok_or_else(|| ParseError::new(FORMAT, number, "unterminated section header"))?
                    .trim()
                    .to_string();
                if doc.sections.iter().any(|s| s.name == name) {
                    return Err(ParseError::new(
                        FORMAT,
                        number,
                        format!("duplicate section '{name}'"),
                    ));
                }
                let (before, attached) = split_attached(std::mem::take(&mut pending));
                match doc.sections.last_mut() {
                    Some(previous) => previous.trailing.extend(before),
                    None => doc.preamble.extend(before),
                }
                doc.sections.push(Section {
                    leading: attached,
                    header: line.to_string(),
                    name,
                    options: Vec::new(),
                    trailing: Vec::new(),
                });
                continue;
            }

            let Some(section) = doc.sections.last_mut() else {
                return Err(ParseError::new(
                    FORMAT,
                    number,
                    "option outside of any section",
                ));
            };
            let mut option = parse_option(line);
            if option.key().is_empty() {
                return Err(ParseError::new(FORMAT, number, "option without a name"));
            }
            if section.options.iter().any(|o| o.key() == option.key()) {
                return Err(ParseError::new(
                    FORMAT,
                    number,
                    format!("duplicate option '{}' in [{}]", option.key(), section.name),
                ));
            }
            option.leading = std::mem::take(&mut pending);
            section.options.push(option);
        }

        match doc.sections.last_mut() {
            Some(section) => section.trailing.extend(pending),
            None => doc.preamble.extend(pending),
        }
        Ok(doc)
    }

    fn empty() -> Self {
        Self::default()
    }

    fn render(&self) -> String {
        let mut out = String::new();
        out.extend(self.preamble.iter().map(String::as_str));
        for section in &self.sections {
            section.render(&mut out);
        }
        out
    }

    fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl IniDocument {
    /// Section names in file order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    fn section_index(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }

    fn default_delimiter(&self) -> String {
        self.sections
            .iter()
            .find_map(Section::delimiter)
            .unwrap_or(DEFAULT_DELIMITER)
            .to_string()
    }

    /// Index of section `name`, appending an empty one at the end if needed.
    fn ensure_section(&mut self, name: &str) -> usize {
        if let Some(index) = self.section_index(name) {
            return index;
        }
        let newline = self.newline;
        let needs_gap = match self.sections.last_mut() {
            Some(last) => {
                last.terminate(newline);
                !last.trailing.last().is_some_and(|l| is_blank(l))
            }
            None => {
                if let Some(line) = self.preamble.last_mut() {
                    terminate_line(line, newline);
                }
                self.preamble.last().is_some_and(|l| !is_blank(l))
            }
        };
        let leading = if needs_gap {
            vec![newline.as_str().to_string()]
        } else {
            Vec::new()
        };
        self.sections.push(Section {
            leading,
            header: format!("[{name}]{}", newline.as_str()),
            name: name.to_string(),
            options: Vec::new(),
            trailing: Vec::new(),
        });
        self.sections.len() - 1
    }

    fn set_option(&mut self, section: usize, key: &str, value: Option<&str>) {
        let delimiter = self.default_delimiter();
        let newline = self.newline;
        let section = &mut self.sections[section];
        match section.find(key) {
            Some(index) => {
                let option = &mut section.options[index];
                let current = option.value();
                let unchanged = match value {
                    None => current.is_null(),
                    Some(text) => current.as_str() == Some(text.trim()),
                };
                if !unchanged {
                    option.set(value, &delimiter, newline);
                }
            }
            None => {
                match section.options.last_mut() {
                    Some(last) => last.terminate(newline),
                    None => section.terminate(newline),
                }
                let mut option = Entry {
                    leading: Vec::new(),
                    key_raw: key.to_string(),
                    delimiter: None,
                    value_raw: String::new(),
                    tail: newline.as_str().to_string(),
                    continuation: Vec::new(),
                };
                option.set(value, &delimiter, newline);
                section.options.push(option);
            }
        }
    }

    fn remove_option(&mut self, section: usize, key: &str) -> Option<Value> {
        let section = &mut self.sections[section];
        let index = section.find(key)?;
        let option = section.options.remove(index);
        let (detached, _) = split_attached(option.leading.clone());
        match section.options.get_mut(index) {
            Some(next) => {
                let mut leading = detached;
                leading.append(&mut next.leading);
                next.leading = leading;
            }
            None => {
                let mut trailing = detached;
                trailing.append(&mut section.trailing);
                section.trailing = trailing;
            }
        }
        Some(option.value())
    }

    fn remove_section(&mut self, index: usize) -> Value {
        let section = self.sections.remove(index);
        Value::Mapping(section.to_mapping())
    }
}

fn unrepresentable(path: &KeyPath, value: &Value, reason: &str) -> EditError {
    EditError::Unrepresentable {
        format: FORMAT,
        path: path.to_string(),
        kind: value.kind(),
        reason: reason.to_string(),
    }
}

impl StructuredDocument for IniDocument {
    fn get_at(&self, path: &KeyPath) -> Option<Value> {
        let full = path.to_string();
        if let Some(index) = self.section_index(&full) {
            return Some(Value::Mapping(self.sections[index].to_mapping()));
        }
        let (parents, key) = path.split_last();
        if parents.is_empty() {
            return None;
        }
        let section = &self.sections[self.section_index(&parents.join("."))?];
        section.find(key).map(|i| section.options[i].value())
    }

    fn set_at(&mut self, path: &KeyPath, value: Value) -> Result<(), EditError> {
        match value {
            Value::Mapping(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, item) in map.iter() {
                    if !item.is_scalar() {
                        return Err(unrepresentable(
                            &path.child(key),
                            item,
                            "option values are strings",
                        ));
                    }
                    entries.push((key.to_string(), plain(item)));
                }
                let index = self.ensure_section(&path.to_string());
                let stale: Vec<String> = self.sections[index]
                    .options
                    .iter()
                    .map(|o| o.key().to_string())
                    .filter(|k| !map.contains_key(k))
                    .collect();
                for key in stale {
                    self.remove_option(index, &key);
                }
                for (key, text) in entries {
                    self.set_option(index, &key, text.as_deref());
                }
                Ok(())
            }
            Value::Sequence(_) => Err(unrepresentable(path, &value, "option values are strings")),
            scalar => {
                let (parents, key) = path.split_last();
                if parents.is_empty() {
                    return Err(EditError::InvalidPath(format!(
                        "{path} (options live in a section: 'section.{key}')"
                    )));
                }
                let index = self.ensure_section(&parents.join("."));
                self.set_option(index, key, plain(&scalar).as_deref());
                Ok(())
            }
        }
    }

    fn remove_at(&mut self, path: &KeyPath) -> Result<Option<Value>, EditError> {
        if let Some(index) = self.section_index(&path.to_string()) {
            return Ok(Some(self.remove_section(index)));
        }
        let (parents, key) = path.split_last();
        if parents.is_empty() {
            return Ok(None);
        }
        Ok(self
            .section_index(&parents.join("."))
            .and_then(|index| self.remove_option(index, key)))
    }

    fn push_at(&mut self, path: &KeyPath, value: Value) -> Result<(), EditError> {
        Err(unrepresentable(path, &value, "INI files have no lists"))
    }

    fn to_value(&self) -> Value {
        Value::Mapping(
            self.sections
                .iter()
                .map(|s| (s.name.clone(), Value::Mapping(s.to_mapping())))
                .collect(),
        )
    }
}

/// Option text for a scalar; `None` writes a key without a value.
fn plain(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => other.to_plain_string(),
    }
}
