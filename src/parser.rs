//! NC block lexer.
//!
//! Turns raw program lines into [`CommandNode`]s with zero semantic
//! interpretation: words keep their literal values (including `#1` and `R1`
//! references), and everything that is not a word (assignments, `DO`/`END`
//! markers, `GOTO`/`IF` statements, named cycle calls) is carried verbatim
//! in `loop_command` for the handlers to interpret.

use crate::node::CommandNode;

/// Lexer failure. Caught at the canal boundary and wrapped into the
/// structured interpreter error there.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: unexpected token `{token}`")]
    UnexpectedToken { line: usize, token: String },
    #[error("line {line}: word `{letter}` is missing a value")]
    MissingValue { line: usize, letter: char },
    #[error("line {line}: malformed N word `{text}`")]
    BadLineNumber { line: usize, text: String },
}

/// Stateless NC line parser shared by all dialects.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Parser
    }

    /// Parses a whole program, skipping blank lines, `%` delimiters and
    /// comment-only lines. `line` on each node is the zero-based index into
    /// the original text.
    pub fn parse_program(&self, text: &str) -> Result<Vec<CommandNode>, ParseError> {
        let mut nodes = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let stripped = strip_comments(raw);
            let trimmed = stripped.trim();
            if trimmed.is_empty() || trimmed == "%" {
                continue;
            }
            nodes.push(self.parse_line(trimmed, index)?);
        }
        Ok(nodes)
    }

    /// Parses one line into a [`CommandNode`].
    pub fn parse(&self, line: &str) -> Result<CommandNode, ParseError> {
        self.parse_line(&strip_comments(line), 0)
    }

    fn parse_line(&self, line: &str, index: usize) -> Result<CommandNode, ParseError> {
        let text = line.trim().to_ascii_uppercase();
        let mut node = CommandNode {
            line: index,
            ..CommandNode::default()
        };

        // Leading N word doubles as a jump label; consume it first so the
        // special whole-line forms below see only the statement body.
        let mut rest = text.as_str();
        if let Some(tail) = rest.strip_prefix('N') {
            let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
            if !digits.is_empty() {
                node.line_number = Some(digits.parse().map_err(|_| ParseError::BadLineNumber {
                    line: index,
                    text: digits.clone(),
                })?);
                rest = tail[digits.len()..].trim_start();
            }
        }

        if rest.is_empty() {
            return Ok(node);
        }

        // Whole-line statements travel raw in `loop_command`.
        if rest.starts_with("GOTO") || rest.starts_with("IF ") || rest.starts_with("IF(") {
            node.loop_command = Some(rest.to_string());
            return Ok(node);
        }
        if is_assignment(rest) {
            node.loop_command = Some(rest.to_string());
            return Ok(node);
        }
        if is_cycle_call(rest) {
            node.loop_command = Some(rest.to_string());
            return Ok(node);
        }

        // DO/END markers may share a line with ordinary words.
        let mut loop_parts: Vec<&str> = Vec::new();
        let mut word_text = String::new();
        for token in rest.split_whitespace() {
            if is_loop_marker(token) {
                loop_parts.push(token);
            } else {
                if !word_text.is_empty() {
                    word_text.push(' ');
                }
                word_text.push_str(token);
            }
        }
        if !loop_parts.is_empty() {
            node.loop_command = Some(loop_parts.join(" "));
        }

        self.scan_words(&word_text, index, &mut node)?;
        Ok(node)
    }

    /// Scans `A<value>` words. Values are signed decimal literals, `#n`
    /// references, or (after `=`) `Rn` references; they are kept as literal
    /// strings.
    fn scan_words(
        &self,
        text: &str,
        index: usize,
        node: &mut CommandNode,
    ) -> Result<(), ParseError> {
        let bytes = text.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() {
            if bytes[pos] == b' ' {
                pos += 1;
                continue;
            }
            let letter = bytes[pos] as char;
            if !letter.is_ascii_alphabetic() {
                return Err(ParseError::UnexpectedToken {
                    line: index,
                    token: letter.to_string(),
                });
            }
            pos += 1;

            let mut assigned = false;
            if bytes.get(pos) == Some(&b'=') {
                assigned = true;
                pos += 1;
            }

            let start = pos;
            match bytes.get(pos).copied() {
                Some(b'#') => {
                    pos += 1;
                    pos += count_digits(&bytes[pos..]);
                }
                Some(b'R') if assigned => {
                    pos += 1;
                    pos += count_digits(&bytes[pos..]);
                }
                _ => {
                    if matches!(bytes.get(pos).copied(), Some(b'+') | Some(b'-')) {
                        pos += 1;
                    }
                    while matches!(bytes.get(pos), Some(b) if b.is_ascii_digit() || *b == b'.') {
                        pos += 1;
                    }
                }
            }
            if pos == start || (pos == start + 1 && matches!(bytes[start], b'+' | b'-' | b'#' | b'R')) {
                return Err(ParseError::MissingValue {
                    line: index,
                    letter,
                });
            }
            let value = &text[start..pos];

            match letter {
                'N' => {
                    node.line_number =
                        Some(
                            value
                                .parse::<f64>()
                                .map_err(|_| ParseError::BadLineNumber {
                                    line: index,
                                    text: value.to_string(),
                                })? as i64,
                        );
                }
                'G' => node.g_code.push(format!("G{value}")),
                'M' => node.m_code.push(format!("M{value}")),
                _ => {
                    node.command_parameter.insert(letter, value.to_string());
                }
            }
        }
        Ok(())
    }
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Removes `( … )` comments and `;` end-of-line comments.
///
/// A `(` that directly follows a cycle-shaped name (`POCKET4(`, `CYCLE81(`)
/// opens an argument list and is kept; any other `(` starts a comment.
fn strip_comments(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut depth = 0usize;
    for (i, &ch) in chars.iter().enumerate() {
        if depth > 0 {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            continue;
        }
        match ch {
            ';' => break,
            '(' if !is_call_opener(&chars, i) => depth += 1,
            _ => out.push(ch),
        }
    }
    out
}

/// `true` when the identifier run ending at `chars[open]` starts with at
/// least two letters, the shape of a named cycle call.
fn is_call_opener(chars: &[char], open: usize) -> bool {
    let mut start = open;
    while start > 0 && (chars[start - 1].is_ascii_alphanumeric() || chars[start - 1] == '_') {
        start -= 1;
    }
    chars[start..open]
        .iter()
        .take_while(|c| c.is_ascii_alphabetic())
        .count()
        >= 2
}

/// `#n=…` or `Rn=…` at the start of a statement.
fn is_assignment(text: &str) -> bool {
    let rest = match text.strip_prefix('#').or_else(|| text.strip_prefix('R')) {
        Some(rest) => rest,
        None => return false,
    };
    let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    digits > 0 && rest[digits..].trim_start().starts_with('=')
}

/// `NAME(args)` where NAME is at least two characters of identifier text.
fn is_cycle_call(text: &str) -> bool {
    let head = text
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    head >= 2
        && text.as_bytes().get(head) == Some(&b'(')
        && text.bytes().take(head).filter(u8::is_ascii_alphabetic).count() >= 2
}

/// `DO<n>` or `END<n>`.
fn is_loop_marker(token: &str) -> bool {
    for prefix in ["DO", "END"] {
        if let Some(rest) = token.strip_prefix(prefix) {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                return true;
            }
        }
    }
    false
}
