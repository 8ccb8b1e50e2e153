//! editor::yaml::parser
//!
//! Line-oriented parser for the block structure of a YAML document.
//!
//! Only block mappings and sequences are broken down into nodes. Scalars and
//! flow collections are kept as raw text with their continuation lines and
//! decoded on demand. Comment and blank lines are collected as pending trivia
//! and attached to whichever entry comes next, at any depth.

use std::mem;

use super::scalar::{
    decode_key, flow_depth, is_block_scalar_header, is_properties_only, is_seq_item, key_end,
    quote_is_open, split_comment,
};
use super::tree::{BlockMap, BlockSeq, IndentStyle, InlineScalar, MapEntry, Node, ScalarLines, SeqItem, Slot};
use crate::editor::ParseError;

#[derive(Debug)]
pub(crate) struct Parsed {
    pub header: Vec<String>,
    pub root: Option<Node>,
    pub trailer: Vec<String>,
    pub style: IndentStyle,
    pub newline: &'static str,
    pub missing_final_newline: bool,
}

pub(crate) fn parse(text: &str) -> Result<Parsed, ParseError> {
    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let missing_final_newline = !text.is_empty() && !text.ends_with('\n');
    let mut text = text.to_string();
    if missing_final_newline {
        text.push_str(newline);
    }

    let mut parser = Parser {
        lines: text.split_inclusive('\n').map(str::to_string).collect(),
        pos: 0,
        pending: Vec::new(),
        map_step: None,
        seq_offset: None,
        gap: None,
    };
    let header = parser.header();
    let root = parser.root()?;
    let trailer = parser.trailer()?;

    let defaults = IndentStyle::default();
    Ok(Parsed {
        header,
        root,
        trailer,
        style: IndentStyle {
            map: parser.map_step.unwrap_or(defaults.map),
            seq: parser.seq_offset.unwrap_or(defaults.seq),
            gap: parser.gap.unwrap_or(defaults.gap),
        },
        newline,
        missing_final_newline,
    })
}

struct Parser {
    lines: Vec<String>,
    pos: usize,
    pending: Vec<String>,
    map_step: Option<usize>,
    seq_offset: Option<usize>,
    gap: Option<usize>,
}

fn body(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn eol(line: &str) -> &str {
    &line[body(line).len()..]
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_blank(line: &str) -> bool {
    body(line).trim().is_empty()
}

fn is_trivia(line: &str) -> bool {
    let text = body(line).trim_start();
    text.is_empty() || text.starts_with('#')
}

/// `---` or `...` at column zero.
fn is_marker(line: &str) -> bool {
    let text = body(line);
    (text.starts_with("---") || text.starts_with("..."))
        && (text.len() == 3 || text[3..].starts_with([' ', '\t']))
}

/// `---` with nothing but a comment after it.
fn is_bare_start(line: &str) -> bool {
    let text = body(line);
    text.starts_with("---") && is_marker(line) && {
        let rest = text[3..].trim();
        rest.is_empty() || rest.starts_with('#')
    }
}

impl Parser {
    fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> ParseError {
        ParseError::new("yaml", pos + 1, message)
    }

    fn take_trivia(&mut self) {
        while let Some(line) = self.lines.get(self.pos) {
            if !is_trivia(line) {
                break;
            }
            self.pending.push(line.clone());
            self.pos += 1;
        }
    }

    /// The next content line, with trivia moved to `pending`.
    fn peek(&mut self) -> Option<String> {
        self.take_trivia();
        self.lines.get(self.pos).cloned()
    }

    fn header(&mut self) -> Vec<String> {
        let mut end = 0;
        while end < self.lines.len()
            && (is_trivia(&self.lines[end]) || self.lines[end].starts_with('%'))
        {
            end += 1;
        }
        if end < self.lines.len() && is_bare_start(&self.lines[end]) {
            self.pos = end + 1;
            return self.lines[..=end].to_vec();
        }
        Vec::new()
    }

    fn root(&mut self) -> Result<Option<Node>, ParseError> {
        let Some(line) = self.peek() else {
            return Ok(None);
        };
        if is_marker(&line) {
            return Ok(None);
        }
        let indent = indent_of(&line);
        let content = &body(&line)[indent..];
        if is_seq_item(content) {
            return Ok(Some(Node::Seq(self.parse_seq(indent)?)));
        }
        if key_end(content).is_some() {
            return Ok(Some(Node::Map(self.parse_map(indent)?)));
        }

        let mut lines = mem::take(&mut self.pending);
        let keep = lines.len();
        while let Some(line) = self.lines.get(self.pos) {
            if is_marker(line) {
                break;
            }
            lines.push(line.clone());
            self.pos += 1;
        }
        self.rewind_trivia(&mut lines, keep);
        Ok(Some(Node::Scalar(ScalarLines { lines })))
    }

    fn trailer(&mut self) -> Result<Vec<String>, ParseError> {
        if let Some(line) = self.peek() {
            if !is_marker(&line) {
                return Err(self.error("unexpected indentation"));
            }
        }
        let mut trailer = mem::take(&mut self.pending);
        trailer.extend(self.lines.drain(self.pos..));
        Ok(trailer)
    }

    /// Give trailing trivia lines back to the input.
    fn rewind_trivia(&mut self, lines: &mut Vec<String>, keep: usize) {
        while lines.len() > keep && lines.last().is_some_and(|line| is_trivia(line)) {
            lines.pop();
            self.pos -= 1;
        }
    }

    fn check_tabs(&self, content: &str) -> Result<(), ParseError> {
        if content.starts_with('\t') {
            return Err(self.error("tab characters are not allowed in indentation"));
        }
        Ok(())
    }

    fn parse_map(&mut self, indent: usize) -> Result<BlockMap, ParseError> {
        let mut entries: Vec<MapEntry> = Vec::new();
        while let Some(line) = self.peek() {
            let column = indent_of(&line);
            if column < indent || is_marker(&line) {
                break;
            }
            if column > indent {
                return Err(self.error("unexpected indentation"));
            }
            let content = &body(&line)[column..];
            if is_seq_item(content) {
                break;
            }
            self.check_tabs(content)?;
            if content == "?" || content.starts_with("? ") {
                return Err(self.error("complex mapping keys are not supported"));
            }
            let Some(colon) = key_end(content) else {
                return Err(self.error("expected a mapping key"));
            };
            let key_raw = content[..colon].to_string();
            let key = decode_key(&key_raw);
            if entries.iter().any(|entry| entry.key == key) {
                return Err(self.error(format!("duplicate key '{key}'")));
            }

            let leading = mem::take(&mut self.pending);
            self.pos += 1;
            let slot = self.parse_slot(&content[colon + 1..], eol(&line), indent, true)?;
            entries.push(MapEntry {
                leading,
                prefix: line[..column].to_string(),
                key_raw,
                key,
                slot,
            });
        }
        Ok(BlockMap {
            indent,
            entries,
            trailing: Vec::new(),
        })
    }

    fn parse_seq(&mut self, indent: usize) -> Result<BlockSeq, ParseError> {
        let mut items = Vec::new();
        while let Some(line) = self.peek() {
            let column = indent_of(&line);
            if column < indent || is_marker(&line) {
                break;
            }
            if column > indent {
                return Err(self.error("unexpected indentation"));
            }
            let content = &body(&line)[column..];
            if !is_seq_item(content) {
                break;
            }

            let leading = mem::take(&mut self.pending);
            let prefix = line[..column].to_string();
            let after = &content[1..];
            let rest = after.trim_start_matches([' ', '\t']);
            let gap = &after[..after.len() - rest.len()];

            let slot = if !rest.starts_with('#') && (is_seq_item(rest) || key_end(rest).is_some()) {
                // Re-read the dash line as the first line of the nested node.
                let nested = column + 1 + gap.len();
                self.gap.get_or_insert(gap.len());
                self.lines[self.pos] = format!("{}{}{}", " ".repeat(nested), rest, eol(&line));
                let mut node = if is_seq_item(rest) {
                    Node::Seq(self.parse_seq(nested)?)
                } else {
                    Node::Map(self.parse_map(nested)?)
                };
                node.clear_first_prefix();
                Slot::Compact {
                    gap: gap.to_string(),
                    node: Box::new(node),
                }
            } else {
                self.pos += 1;
                self.parse_slot(after, eol(&line), indent, false)?
            };
            items.push(SeqItem {
                leading,
                prefix,
                slot,
            });
        }
        Ok(BlockSeq {
            indent,
            items,
            trailing: Vec::new(),
        })
    }

    /// Parse what follows a colon or dash. The line itself is already consumed.
    fn parse_slot(
        &mut self,
        after: &str,
        eol: &str,
        parent: usize,
        map_value: bool,
    ) -> Result<Slot, ParseError> {
        let (value, comment) = split_comment(after);
        let raw = value.trim_start_matches([' ', '\t']);
        let gap = &value[..value.len() - raw.len()];

        if raw.is_empty() || is_properties_only(raw) {
            let node = self.parse_child(parent, map_value)?;
            return Ok(Slot::Block {
                tail: after.to_string(),
                eol: eol.to_string(),
                node: node.map(Box::new),
            });
        }

        let continuation = self.continuation(raw, parent)?;
        Ok(Slot::Inline {
            gap: gap.to_string(),
            scalar: InlineScalar {
                raw: raw.to_string(),
                comment: comment.to_string(),
                eol: eol.to_string(),
                continuation,
            },
        })
    }

    /// Lines after the first that belong to an inline value.
    fn continuation(&mut self, raw: &str, parent: usize) -> Result<Vec<String>, ParseError> {
        let start = self.pos;
        let last_token = raw.rsplit([' ', '\t']).next().unwrap_or(raw);
        let props = raw[..raw.len() - last_token.len()].trim();

        if is_block_scalar_header(last_token) && (props.is_empty() || is_properties_only(props)) {
            while let Some(line) = self.lines.get(self.pos) {
                if !is_blank(line) && indent_of(line) <= parent {
                    break;
                }
                self.pos += 1;
            }
            if !last_token.contains('+') {
                while self.pos > start && is_blank(&self.lines[self.pos - 1]) {
                    self.pos -= 1;
                }
            }
        } else if quote_is_open(raw) {
            let mut text = raw.to_string();
            while quote_is_open(&text) {
                let Some(line) = self.lines.get(self.pos) else {
                    return Err(self.error_at(start - 1, "unterminated quoted scalar"));
                };
                text.push('\n');
                text.push_str(body(line));
                self.pos += 1;
            }
        } else if raw.starts_with(['[', '{']) {
            let mut depth = flow_depth(raw);
            while depth > 0 {
                let Some(line) = self.lines.get(self.pos) else {
                    return Err(self.error_at(start - 1, "unterminated flow collection"));
                };
                depth += flow_depth(body(line));
                self.pos += 1;
            }
        } else {
            while let Some(line) = self.lines.get(self.pos) {
                if is_trivia(line) || is_marker(line) || indent_of(line) <= parent {
                    break;
                }
                self.pos += 1;
            }
        }
        Ok(self.lines[start..self.pos].to_vec())
    }

    /// The block node nested under a key or dash at column `parent`.
    fn parse_child(&mut self, parent: usize, map_value: bool) -> Result<Option<Node>, ParseError> {
        let Some(line) = self.peek() else {
            return Ok(None);
        };
        if is_marker(&line) {
            return Ok(None);
        }
        let column = indent_of(&line);
        let content = &body(&line)[column..];
        let same_column_seq = column == parent && map_value && is_seq_item(content);
        if column <= parent && !same_column_seq {
            return Ok(None);
        }

        if is_seq_item(content) {
            if map_value {
                self.seq_offset.get_or_insert(column - parent);
            }
            return Ok(Some(Node::Seq(self.parse_seq(column)?)));
        }
        if key_end(content).is_some() {
            if map_value {
                self.map_step.get_or_insert(column - parent);
            }
            return Ok(Some(Node::Map(self.parse_map(column)?)));
        }

        let mut lines = mem::take(&mut self.pending);
        let keep = lines.len();
        while let Some(line) = self.lines.get(self.pos) {
            if !is_blank(line) && indent_of(line) <= parent {
                break;
            }
            lines.push(line.clone());
            self.pos += 1;
        }
        self.rewind_trivia(&mut lines, keep);
        Ok(Some(Node::Scalar(ScalarLines { lines })))
    }
}
