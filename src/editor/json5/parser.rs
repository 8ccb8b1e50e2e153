//! editor::json5::parser
//!
//! Recursive descent over JSON5 text, keeping every byte in the tree.
//! Writing conventions (indentation, quotes, trailing commas) are noted
//! on the way so that new entries can follow them.

use super::tree::{last_indent, Container, Entry, Key, Node, Scalar, Style};
use crate::editor::{ParseError, Value};

pub(crate) struct Parsed {
    /// Trivia before the value, or all of it when there is no value.
    pub prefix: String,
    pub root: Option<Node>,
    pub suffix: String,
    pub style: Style,
}

pub(crate) fn parse(text: &str) -> Result<Parsed, ParseError> {
    let mut parser = Parser::new(text);
    let prefix = parser.trivia()?;
    if parser.peek().is_none() {
        return Ok(Parsed {
            prefix,
            root: None,
            suffix: String::new(),
            style: parser.style(),
        });
    }
    let root = parser.value(0)?;
    let suffix = parser.trivia()?;
    if parser.peek().is_some() {
        return Err(parser.error("unexpected content after the value"));
    }
    Ok(Parsed {
        prefix,
        root: Some(root),
        suffix,
        style: parser.style(),
    })
}

/// A single value with no surrounding trivia.
pub(crate) fn parse_value(text: &str) -> Result<Node, ParseError> {
    let mut parser = Parser::new(text);
    let node = parser.value(0)?;
    if parser.peek().is_some() {
        return Err(parser.error("unexpected content after the value"));
    }
    Ok(node)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    indent: Option<String>,
    quote: Option<char>,
    quote_keys: Option<bool>,
    trailing_commas: Option<bool>,
}

fn is_space(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '+' | '-')
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            indent: None,
            quote: None,
            quote_keys: None,
            trailing_commas: None,
        }
    }

    fn style(&self) -> Style {
        let defaults = Style::default();
        Style {
            indent: self.indent.clone().unwrap_or(defaults.indent),
            quote: self.quote.unwrap_or(defaults.quote),
            quote_keys: self.quote_keys.unwrap_or(defaults.quote_keys),
            trailing_commas: self.trailing_commas.unwrap_or(defaults.trailing_commas),
            newline: if self.text.contains("\r\n") { "\r\n" } else { "\n" },
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let line = self.text[..self.pos].matches('\n').count() + 1;
        ParseError::new("json5", line, message)
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    /// Whitespace and comments.
    fn trivia(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        loop {
            let rest = self.rest();
            if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if rest.starts_with("/*") {
                match rest[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => return Err(self.error("unterminated block comment")),
                }
            } else if self.peek().is_some_and(is_space) {
                self.next_char();
            } else {
                break;
            }
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn value(&mut self, depth: usize) -> Result<Node, ParseError> {
        match self.peek() {
            Some('{') => Ok(Node::Object(self.container('}', depth)?)),
            Some('[') => Ok(Node::Array(self.container(']', depth)?)),
            Some('"' | '\'') => {
                let start = self.pos;
                let decoded = self.string()?;
                if self.quote.is_none() {
                    self.quote = self.text[start..].chars().next();
                }
                Ok(Node::Scalar(Scalar {
                    raw: self.text[start..self.pos].to_string(),
                    value: Value::String(decoded),
                }))
            }
            Some(_) => self.word(),
            None => Err(self.error("expected a value")),
        }
    }

    fn container(&mut self, close: char, depth: usize) -> Result<Container, ParseError> {
        let keyed = close == '}';
        self.next_char();
        let mut entries = Vec::new();
        loop {
            let leading = self.trivia()?;
            match self.peek() {
                Some(c) if c == close => {
                    self.next_char();
                    return Ok(self.close(entries, leading));
                }
                None => return Err(self.error(format!("missing '{close}'"))),
                _ => {}
            }
            if depth == 0 && self.indent.is_none() {
                self.indent = last_indent(&leading)
                    .filter(|indent| !indent.is_empty())
                    .map(str::to_string);
            }
            let key = if keyed { Some(self.key()?) } else { None };
            let value = self.value(depth + 1)?;
            let after = self.trivia()?;
            match self.peek() {
                Some(',') => {
                    self.next_char();
                    entries.push(Entry {
                        leading,
                        key,
                        value,
                        after,
                        comma: true,
                    });
                }
                Some(c) if c == close => {
                    self.next_char();
                    entries.push(Entry {
                        leading,
                        key,
                        value,
                        after: String::new(),
                        comma: false,
                    });
                    return Ok(self.close(entries, after));
                }
                _ => return Err(self.error(format!("expected ',' or '{close}'"))),
            }
        }
    }

    fn close(&mut self, entries: Vec<Entry>, trailing: String) -> Container {
        let container = Container { entries, trailing };
        if self.trailing_commas.is_none() && container.is_multiline() {
            self.trailing_commas = container.entries.last().map(|entry| entry.comma);
        }
        container
    }

    fn key(&mut self) -> Result<Key, ParseError> {
        let start = self.pos;
        let name = match self.peek() {
            Some('"' | '\'') => self.string()?,
            Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
                while self
                    .peek()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
                {
                    self.next_char();
                }
                self.text[start..self.pos].to_string()
            }
            _ => return Err(self.error("expected a key")),
        };
        let raw = self.text[start..self.pos].to_string();
        if self.quote_keys.is_none() {
            self.quote_keys = Some(raw.starts_with(['"', '\'']));
        }
        let mut colon = self.trivia()?;
        if self.next_char() != Some(':') {
            return Err(self.error(format!("expected ':' after key '{name}'")));
        }
        colon.push(':');
        colon.push_str(&self.trivia()?);
        Ok(Key { raw, name, colon })
    }

    /// A quoted string, decoded. The opening quote is at the cursor.
    fn string(&mut self) -> Result<String, ParseError> {
        let quote = self.next_char();
        let mut out = String::new();
        loop {
            let c = self.peek().ok_or_else(|| self.error("unterminated string"))?;
            if c == '\n' || c == '\r' {
                return Err(self.error("line break in string"));
            }
            self.next_char();
            match c {
                c if Some(c) == quote => return Ok(out),
                '\\' => self.escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        let c = self
            .next_char()
            .ok_or_else(|| self.error("unterminated string"))?;
        match c {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.peek().is_some_and(|c| c.is_ascii_digit()) => out.push('\0'),
            'x' => {
                let code = self.hex(2)?;
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            'u' => {
                let code = self.hex(4)?;
                let code = if (0xD800..0xDC00).contains(&code) && self.rest().starts_with("\\u") {
                    let resume = self.pos;
                    self.pos += 2;
                    let low = self.hex(4)?;
                    if (0xDC00..0xE000).contains(&low) {
                        0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00)
                    } else {
                        self.pos = resume;
                        code
                    }
                } else {
                    code
                };
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            // Line continuations.
            '\r' => {
                if self.peek() == Some('\n') {
                    self.next_char();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            c if c.is_ascii_digit() => return Err(self.error("octal escapes are not allowed")),
            c => out.push(c),
        }
        Ok(())
    }

    fn hex(&mut self, digits: usize) -> Result<u32, ParseError> {
        let rest = self.rest();
        let code = rest
            .get(..digits)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .ok_or_else(|| self.error("invalid escape sequence"))?;
        self.pos += digits;
        Ok(code)
    }

    /// Numbers and the literals `true`, `false` and `null`.
    fn word(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        while self.peek().is_some_and(is_word_char) {
            self.next_char();
        }
        let text = self.text;
        let raw = &text[start..self.pos];
        if raw.is_empty() {
            let found = self.peek().unwrap_or(' ');
            return Err(self.error(format!("unexpected '{found}'")));
        }
        let value = decode_word(raw).ok_or_else(|| {
            self.pos = start;
            self.error(format!("invalid value '{raw}'"))
        })?;
        Ok(Node::Scalar(Scalar {
            raw: raw.to_string(),
            value,
        }))
    }
}

fn decode_word(word: &str) -> Option<Value> {
    match word {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" => return Some(Value::Null),
        _ => {}
    }
    let (negative, body) = match word.as_bytes().first() {
        Some(b'-') => (true, &word[1..]),
        Some(b'+') => (false, &word[1..]),
        _ => (false, word),
    };
    let sign = if negative { -1.0 } else { 1.0 };
    match body {
        "Infinity" => return Some(Value::Float(sign * f64::INFINITY)),
        "NaN" => return Some(Value::Float(f64::NAN)),
        _ => {}
    }
    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        let magnitude = i64::from_str_radix(hex, 16).ok()?;
        return Some(Value::Integer(if negative { -magnitude } else { magnitude }));
    }
    let numeric = body.bytes().next().is_some_and(|b| b.is_ascii_digit() || b == b'.')
        && body
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !numeric {
        return None;
    }
    if body.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = word.parse::<i64>() {
            return Some(Value::Integer(i));
        }
    }
    word.parse::<f64>().ok().map(Value::Float)
}
