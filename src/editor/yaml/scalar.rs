//! editor::yaml::scalar
//!
//! Lexical helpers for single YAML lines and scalar encoding.
//!
//! Decoding hands the scalar text to `serde_yaml`, which knows every
//! escape and block-scalar rule. Encoding picks the quoting style: the
//! previous style of the node when it can hold the new value, plain when
//! the text reads back unchanged, quoted otherwise.

use crate::editor::value::format_float;
use crate::editor::Value;

/// Words YAML 1.1 readers (PyYAML, pre-commit) load as booleans or null.
const AMBIGUOUS_WORDS: &[&str] = &[
    "y", "n", "yes", "no", "on", "off", "true", "false", "null", "~",
];

/// Split a line's content into value text and trailing comment.
///
/// The comment part keeps the whitespace in front of `#`.
pub(crate) fn split_comment(text: &str) -> (&str, &str) {
    let mut quote: Option<char> = None;
    let mut token_start = true;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match quote {
            Some('"') => {
                if c == '\\' {
                    chars.next();
                } else if c == '"' {
                    quote = None;
                }
            }
            Some(_) => {
                if c == '\'' {
                    if matches!(chars.peek(), Some((_, '\''))) {
                        chars.next();
                    } else {
                        quote = None;
                    }
                }
            }
            None => {
                if c == '#' && prev.map_or(true, |p| p == ' ' || p == '\t') {
                    let value = text[..i].trim_end_matches([' ', '\t']);
                    return (value, &text[value.len()..]);
                }
                if token_start && (c == '"' || c == '\'') {
                    quote = Some(c);
                }
                token_start = matches!(c, '[' | '{' | ',' | ' ' | '\t')
                    || (token_start && c == ':');
            }
        }
        prev = Some(c);
    }
    (text.trim_end_matches([' ', '\t']), &text[text.trim_end_matches([' ', '\t']).len()..])
}

/// `-` followed by whitespace or nothing.
pub(crate) fn is_seq_item(content: &str) -> bool {
    content == "-" || content.starts_with("- ") || content.starts_with("-\t")
}

/// Byte offset of the `:` ending a block mapping key on this line.
pub(crate) fn key_end(content: &str) -> Option<usize> {
    if content.starts_with(['[', '{', '|', '>', '&', '!', '*', '#', '%', '@', '`']) {
        return None;
    }
    if let Some(quote) = content.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let close = closing_quote(content, quote)?;
        let rest = &content[close + 1..];
        let colon = close + 1 + (rest.len() - rest.trim_start_matches([' ', '\t']).len());
        let after = &content[colon..];
        return after
            .strip_prefix(':')
            .filter(|tail| tail.is_empty() || tail.starts_with([' ', '\t']))
            .map(|_| colon);
    }

    let bytes = content.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        let prev_blank = i > 0 && (bytes[i - 1] == b' ' || bytes[i - 1] == b'\t');
        if b == b'#' && prev_blank {
            return None;
        }
        if b == b':' {
            match bytes.get(i + 1) {
                None | Some(b' ') | Some(b'\t') => return Some(i),
                _ => {}
            }
        }
    }
    None
}

/// Index of the quote closing the one at position 0.
fn closing_quote(text: &str, quote: char) -> Option<usize> {
    let mut chars = text.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if quote == '"' && c == '\\' {
            chars.next();
        } else if c == quote {
            if quote == '\'' && matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
            } else {
                return Some(i);
            }
        }
    }
    None
}

/// Whether a quoted scalar starting on this line ends on it too.
pub(crate) fn quote_is_open(raw: &str) -> bool {
    match raw.chars().next() {
        Some(q @ ('"' | '\'')) => closing_quote(raw, q).is_none(),
        _ => false,
    }
}

/// Bracket depth change of a flow fragment, ignoring quoted text.
pub(crate) fn flow_depth(text: &str) -> i64 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some('"') if c == '\\' => {
                chars.next();
            }
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '[' | '{' => depth += 1,
                ']' | '}' => depth -= 1,
                '#' => break,
                _ => {}
            },
        }
    }
    depth
}

/// Anchors and tags with no value after them.
pub(crate) fn is_properties_only(value: &str) -> bool {
    !value.is_empty()
        && value
            .split_whitespace()
            .all(|token| token.starts_with('&') || token.starts_with('!'))
}

pub(crate) fn is_block_scalar_header(raw: &str) -> bool {
    raw.starts_with(['|', '>'])
}

/// Decode scalar or flow text. Unparsable text (aliases, for one) reads as
/// the string it is written as.
pub(crate) fn decode(text: &str) -> Value {
    match serde_yaml::from_str::<serde_yaml::Value>(text) {
        Ok(value) => from_yaml(value),
        Err(_) => Value::String(text.trim().to_string()),
    }
}

pub(crate) fn decode_key(raw: &str) -> String {
    let key = raw.trim();
    if key.starts_with(['"', '\'']) {
        if let Value::String(s) = decode(key) {
            return s;
        }
    }
    key.to_string()
}

pub(crate) fn from_yaml(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Sequence(items.into_iter().map(from_yaml).collect())
        }
        serde_yaml::Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(key, value)| (key_string(key), from_yaml(value)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn key_string(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// The quoting style a raw scalar was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quoting {
    Plain,
    Single,
    Double,
}

impl Quoting {
    pub(crate) fn of(raw: &str) -> Self {
        match raw.chars().next() {
            Some('\'') => Quoting::Single,
            Some('"') => Quoting::Double,
            _ => Quoting::Plain,
        }
    }
}

fn is_indicator(c: char) -> bool {
    "-?:,[]{}#&*!|>'\"%@`".contains(c)
}

/// Text that can be written as a plain key.
fn plain_key_ok(s: &str) -> bool {
    let Some(first) = s.chars().next() else {
        return false;
    };
    let second_blank = s.chars().nth(1).map_or(true, char::is_whitespace);
    if is_indicator(first) && !(matches!(first, '-' | '?' | ':') && !second_blank) {
        return false;
    }
    s == s.trim()
        && !s.contains(": ")
        && !s.contains(" #")
        && !s.ends_with(':')
        && !s.chars().any(char::is_control)
}

/// Text that reads back as the same string when written plain.
fn plain_ok(s: &str) -> bool {
    !AMBIGUOUS_WORDS.contains(&s.to_ascii_lowercase().as_str()) && reads_back_plain(s)
}

/// Written plain, `s` is read back as this very string.
fn reads_back_plain(s: &str) -> bool {
    plain_key_ok(s)
        && matches!(
            serde_yaml::from_str::<serde_yaml::Value>(s),
            Ok(serde_yaml::Value::String(ref parsed)) if parsed == s
        )
}

fn single_ok(s: &str) -> bool {
    !s.chars().any(char::is_control)
}

fn single_quoted(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub(crate) fn encode_key(key: &str) -> String {
    if reads_back_plain(key) {
        key.to_string()
    } else if single_ok(key) {
        single_quoted(key)
    } else {
        double_quoted(key)
    }
}

fn encode_float(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { ".inf" } else { "-.inf" }.to_string()
    } else {
        format_float(f)
    }
}

/// Encode a value that fits on one line. Collections are written in flow
/// style. `previous` is the raw text being replaced, if any.
pub(crate) fn encode_inline(value: &Value, previous: Option<&str>) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => encode_float(*f),
        Value::String(s) => encode_string(s, previous.map(Quoting::of)),
        Value::Sequence(items) => {
            let items: Vec<String> = items.iter().map(encode_flow_item).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(map) => {
            if map.is_empty() {
                return "{}".to_string();
            }
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", encode_key(k), encode_flow_item(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

fn encode_flow_item(value: &Value) -> String {
    match value {
        Value::String(s) if s.contains([',', '[', ']', '{', '}']) => {
            if single_ok(s) {
                single_quoted(s)
            } else {
                double_quoted(s)
            }
        }
        other => encode_inline(other, None),
    }
}

fn encode_string(s: &str, previous: Option<Quoting>) -> String {
    match previous {
        Some(Quoting::Single) if single_ok(s) => single_quoted(s),
        Some(Quoting::Double) => double_quoted(s),
        _ if plain_ok(s) => s.to_string(),
        _ if single_ok(s) => single_quoted(s),
        _ => double_quoted(s),
    }
}

/// Literal block header for a multi-line string, when one can hold it.
pub(crate) fn literal_header(s: &str) -> Option<&'static str> {
    let first_content = s.lines().find(|line| !line.is_empty())?;
    if first_content.starts_with([' ', '\t'])
        || s.chars().any(|c| c.is_control() && c != '\n' && c != '\t')
        || s.lines().any(|line| line.ends_with([' ', '\t']))
    {
        return None;
    }
    let trailing = s.len() - s.trim_end_matches('\n').len();
    Some(match trailing {
        0 => "|-",
        1 => "|",
        _ => "|+",
    })
}

/// Content lines of a literal block scalar.
pub(crate) fn literal_lines(s: &str, indent: usize, newline: &str) -> Vec<String> {
    let body = s.strip_suffix('\n').unwrap_or(s);
    let pad = " ".repeat(indent);
    body.split('\n')
        .map(|line| {
            if line.is_empty() {
                newline.to_string()
            } else {
                format!("{pad}{line}{newline}")
            }
        })
        .collect()
}

/// Double-quoted fallback for multi-line strings a literal block cannot hold.
pub(crate) fn encode_multiline_fallback(s: &str) -> String {
    double_quoted(s)
}
