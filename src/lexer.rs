//! Tokenizer for ISON text.
//!
//! Produces the token stream the parser consumes: names, numbers, strings,
//! operators, logical and blank line ends, and `Indent`/`Dedent` tokens for
//! indentation changes outside of brackets. Inside `()`, `[]` and `{}` line
//! breaks are plain [`TokenKind::Nl`] tokens and indentation is ignored.
//!
//! ```rust
//! use serde_ison::lexer::tokenize;
//! use serde_ison::TokenKind;
//!
//! let tokens = tokenize("a:\n    b: 1\n").unwrap();
//! let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(
//!     kinds,
//!     vec![
//!         TokenKind::StreamStart,
//!         TokenKind::Name,
//!         TokenKind::Op,
//!         TokenKind::Newline,
//!         TokenKind::Indent,
//!         TokenKind::Name,
//!         TokenKind::Op,
//!         TokenKind::Number,
//!         TokenKind::Newline,
//!         TokenKind::Dedent,
//!         TokenKind::EndMarker,
//!     ]
//! );
//! ```

use crate::error::{Error, ErrorKind, Result};
use crate::token::{Token, TokenKind};
use std::sync::Arc;
use tracing::trace;

const TAB_SIZE: usize = 8;

/// Spellings after which a `-` starts the imaginary half of a complex number.
const NON_FINITE: [&str; 4] = ["Infinity", "NaN", "inf", "nan"];

/// Operators, longest first.
const OPERATORS: [&str; 18] = [
    "---", "**", "--", "-", "*", "{", "}", "[", "]", "(", ")", ",", ":", "=", "@", "+", ";", ".",
];

/// Tokenizes `text`, naming it `<string>` in error messages.
///
/// # Errors
///
/// Returns an [`ErrorKind::InvalidToken`] error for unterminated strings,
/// unknown characters and inconsistent dedents.
pub fn tokenize(text: &str) -> Result<Vec<Token>> {
    tokenize_named(text, "<string>")
}

/// Tokenizes `text`, naming it `source_name` in error messages.
///
/// # Errors
///
/// See [`tokenize`].
pub fn tokenize_named(text: &str, source_name: &str) -> Result<Vec<Token>> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let tokens = Lexer::new(&normalized, source_name).run()?;
    trace!(count = tokens.len(), source_name, "tokenized");
    Ok(tokens)
}

/// Returns `true` if `text` would be read back as exactly one name token.
///
/// ```rust
/// use serde_ison::lexer::is_bare_name;
///
/// assert!(is_bare_name("list1.2"));
/// assert!(is_bare_name("bcaa9bbe-ff57"));
/// assert!(!is_bare_name("two words"));
/// assert!(!is_bare_name("1abc"));
/// assert!(!is_bare_name("NaN-2j"));
/// ```
#[must_use]
pub fn is_bare_name(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    match chars.first() {
        Some(&c) if is_name_start(c) => scan_name(&chars, 0) == chars.len(),
        _ => false,
    }
}

#[inline]
fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

#[inline]
fn is_name_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '-'
}

fn starts_with_str(chars: &[char], word: &str) -> bool {
    let mut it = chars.iter();
    word.chars().all(|w| it.next() == Some(&w))
}

fn equals_str(chars: &[char], word: &str) -> bool {
    chars.len() == word.chars().count() && starts_with_str(chars, word)
}

/// Scans an optionally signed name starting at `start`, returning its end.
fn scan_name(chars: &[char], start: usize) -> usize {
    let mut i = start;
    if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
        i += 1;
    }
    if i >= chars.len() || !is_name_start(chars[i]) {
        return start;
    }
    let word_start = i;
    i += 1;
    while i < chars.len() && is_name_continue(chars[i]) {
        if chars[i] == '-' {
            let word = &chars[word_start..i];
            let rest = &chars[i + 1..];
            let numeric_tail = rest
                .first()
                .map_or(false, |c| c.is_ascii_digit() || *c == '.')
                || NON_FINITE.iter().any(|w| starts_with_str(rest, w));
            if numeric_tail && NON_FINITE.iter().any(|w| equals_str(word, w)) {
                break;
            }
        }
        i += 1;
    }
    i
}

fn scan_digits(chars: &[char], mut i: usize, radix: u32) -> usize {
    while i < chars.len() && (chars[i].is_digit(radix) || chars[i] == '_') {
        i += 1;
    }
    i
}

/// Scans an optionally signed numeric literal starting at `start`, returning its end.
fn scan_number(chars: &[char], start: usize) -> usize {
    let mut i = start;
    if chars[i] == '+' || chars[i] == '-' {
        i += 1;
    }
    if chars[i] == '0' && i + 1 < chars.len() {
        let radix = match chars[i + 1] {
            'x' | 'X' => Some(16),
            'o' | 'O' => Some(8),
            'b' | 'B' => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            return scan_digits(chars, i + 2, radix);
        }
    }
    i = scan_digits(chars, i, 10);
    if i < chars.len() && chars[i] == '.' {
        i = scan_digits(chars, i + 1, 10);
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            i = scan_digits(chars, j, 10);
        }
    }
    if i < chars.len() && (chars[i] == 'j' || chars[i] == 'J') {
        i += 1;
    }
    i
}

fn is_string_prefix(prefix: &[char]) -> bool {
    let lower: String = prefix.iter().map(|c| c.to_ascii_lowercase()).collect();
    matches!(lower.as_str(), "" | "r" | "b" | "u" | "br" | "rb")
}

struct Lexer<'a> {
    source_name: &'a str,
    chars: Vec<char>,
    lines: Vec<Arc<str>>,
    pos: usize,
    line: usize,
    col: usize,
    indents: Vec<usize>,
    depth: usize,
    line_has_content: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(text: &str, source_name: &'a str) -> Self {
        Lexer {
            source_name,
            chars: text.chars().collect(),
            lines: text.split('\n').map(Arc::from).collect(),
            pos: 0,
            line: 1,
            col: 0,
            indents: vec![0],
            depth: 0,
            line_has_content: false,
            tokens: Vec::new(),
        }
    }

    fn line_text(&self, line: usize) -> Arc<str> {
        self.lines
            .get(line - 1)
            .cloned()
            .unwrap_or_else(|| Arc::from(""))
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(
            ErrorKind::InvalidToken,
            self.source_name,
            self.line,
            self.col + 1,
            &self.line_text(self.line),
            message,
        )
    }

    fn emit(&mut self, kind: TokenKind, text: String, start: (usize, usize)) {
        if !matches!(
            kind,
            TokenKind::Newline
                | TokenKind::Nl
                | TokenKind::Indent
                | TokenKind::Dedent
                | TokenKind::Comment
                | TokenKind::StreamStart
        ) {
            self.line_has_content = true;
        }
        if kind == TokenKind::Newline {
            self.line_has_content = false;
        }
        self.tokens.push(Token {
            kind,
            text,
            start: (start.0, start.1 + 1),
            end: (self.line, self.col + 1),
            line: self.line_text(start.0),
        });
    }

    /// Consumes `len` characters as one token of `kind`.
    fn emit_span(&mut self, kind: TokenKind, len: usize) {
        let start = (self.line, self.col);
        let text: String = self.chars[self.pos..self.pos + len].iter().collect();
        for _ in 0..len {
            self.bump();
        }
        self.emit(kind, text, start);
    }

    fn run(mut self) -> Result<Vec<Token>> {
        self.emit(TokenKind::StreamStart, String::new(), (1, 0));
        let mut at_line_start = true;
        while self.pos < self.chars.len() {
            if at_line_start {
                at_line_start = false;
                if self.depth == 0 && self.skip_blank_line_or_indent()? {
                    at_line_start = true;
                    continue;
                }
            }
            let Some(c) = self.peek(0) else { break };
            match c {
                '\n' => {
                    let kind = if self.depth > 0 {
                        TokenKind::Nl
                    } else {
                        TokenKind::Newline
                    };
                    self.emit_span(kind, 1);
                    at_line_start = true;
                }
                ' ' | '\t' | '\x0c' => {
                    self.bump();
                }
                '\\' if self.peek(1) == Some('\n') => {
                    self.bump();
                    self.bump();
                }
                '#' => self.lex_comment(),
                '\'' | '"' => self.lex_string(0)?,
                c if c.is_ascii_digit() => self.lex_number(),
                '.' if self.peek(1).map_or(false, |d| d.is_ascii_digit()) => self.lex_number(),
                '+' | '-' => self.lex_sign(),
                c if is_name_start(c) => self.lex_name()?,
                _ => self.lex_operator()?,
            }
        }
        let eof = (self.line, self.col);
        if self.line_has_content {
            self.emit(TokenKind::Newline, String::new(), eof);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.emit(TokenKind::Dedent, String::new(), eof);
        }
        self.emit(TokenKind::EndMarker, String::new(), eof);
        Ok(self.tokens)
    }

    /// Handles the start of a physical line outside brackets. Returns `true`
    /// if the whole line was blank or a comment and has been consumed.
    fn skip_blank_line_or_indent(&mut self) -> Result<bool> {
        let start = (self.line, self.col);
        let mut width = 0;
        let mut indent_text = String::new();
        while let Some(c) = self.peek(0) {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / TAB_SIZE + 1) * TAB_SIZE,
                '\x0c' => width = 0,
                _ => break,
            }
            indent_text.push(c);
            self.bump();
        }
        match self.peek(0) {
            None => return Ok(true),
            Some('\n') => {
                self.emit_span(TokenKind::Nl, 1);
                return Ok(true);
            }
            Some('#') => {
                self.lex_comment();
                if self.peek(0) == Some('\n') {
                    self.emit_span(TokenKind::Nl, 1);
                }
                return Ok(true);
            }
            Some(_) => {}
        }
        let top = self.indents.last().copied().unwrap_or(0);
        if width > top {
            self.indents.push(width);
            self.emit(TokenKind::Indent, indent_text, start);
        } else if width < top {
            while self.indents.last().map_or(false, |&level| width < level) {
                self.indents.pop();
                self.emit(TokenKind::Dedent, String::new(), (self.line, self.col));
            }
            if self.indents.last().copied() != Some(width) {
                return Err(self.error("unindent does not match any outer indentation level"));
            }
        }
        Ok(false)
    }

    fn lex_comment(&mut self) {
        let mut len = 0;
        while self.peek(len).map_or(false, |c| c != '\n') {
            len += 1;
        }
        self.emit_span(TokenKind::Comment, len);
    }

    fn lex_number(&mut self) {
        let end = scan_number(&self.chars, self.pos);
        self.emit_span(TokenKind::Number, end - self.pos);
    }

    fn lex_sign(&mut self) {
        match self.peek(1) {
            Some(d) if d.is_ascii_digit() => self.lex_number(),
            Some('.') if self.peek(2).map_or(false, |d| d.is_ascii_digit()) => self.lex_number(),
            Some(n) if is_name_start(n) => {
                let end = scan_name(&self.chars, self.pos);
                self.emit_span(TokenKind::Name, end - self.pos);
            }
            _ => {
                if self.peek(0) == Some('+') {
                    self.emit_span(TokenKind::Op, 1);
                } else {
                    let mut len = 1;
                    while len < 3 && self.peek(len) == Some('-') {
                        len += 1;
                    }
                    self.emit_span(TokenKind::Op, len);
                }
            }
        }
    }

    fn lex_name(&mut self) -> Result<()> {
        let mut prefix = 0;
        while prefix < 2
            && self
                .peek(prefix)
                .map_or(false, |c| matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U'))
        {
            prefix += 1;
        }
        for len in (1..=prefix).rev() {
            if matches!(self.peek(len), Some('\'' | '"'))
                && is_string_prefix(&self.chars[self.pos..self.pos + len])
            {
                return self.lex_string(len);
            }
        }
        let end = scan_name(&self.chars, self.pos);
        self.emit_span(TokenKind::Name, end - self.pos);
        Ok(())
    }

    fn lex_string(&mut self, prefix: usize) -> Result<()> {
        let start = (self.line, self.col);
        let begin = self.pos;
        for _ in 0..prefix {
            self.bump();
        }
        let quote = self.peek(0).unwrap_or('\'');
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        let quote_len = if triple { 3 } else { 1 };
        for _ in 0..quote_len {
            self.bump();
        }
        loop {
            match self.peek(0) {
                None => {
                    return Err(Error::parse(
                        ErrorKind::InvalidToken,
                        self.source_name,
                        start.0,
                        start.1 + 1,
                        &self.line_text(start.0),
                        "unterminated string literal",
                    ))
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('\n') if !triple => {
                    return Err(self.error("unterminated string literal"));
                }
                Some(c) if c == quote => {
                    if !triple {
                        self.bump();
                        break;
                    }
                    if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                        self.bump();
                        self.bump();
                        self.bump();
                        break;
                    }
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let text: String = self.chars[begin..self.pos].iter().collect();
        self.emit(TokenKind::String, text, start);
        Ok(())
    }

    fn lex_operator(&mut self) -> Result<()> {
        let rest = &self.chars[self.pos..];
        let Some(op) = OPERATORS.iter().find(|op| starts_with_str(rest, op)) else {
            let c = self.peek(0).unwrap_or(' ');
            return Err(self.error(format!("unexpected character {c:?}")));
        };
        match *op {
            "(" | "[" | "{" => self.depth += 1,
            ")" | "]" | "}" => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        self.emit_span(TokenKind::Op, op.chars().count());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<(TokenKind, String)> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn significant(src: &str) -> Vec<String> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .filter(|t| matches!(t.kind, TokenKind::Name | TokenKind::Number | TokenKind::String | TokenKind::Op))
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_names_with_dots_and_dashes() {
        assert_eq!(significant("flag: @list1.1"), vec!["flag", ":", "@", "list1.1"]);
        assert_eq!(
            significant("id: bcaa9bbe-ff57-44c0"),
            vec!["id", ":", "bcaa9bbe-ff57-44c0"]
        );
    }

    #[test]
    fn test_signed_numbers_and_complex() {
        assert_eq!(significant("3+4j"), vec!["3", "+4j"]);
        assert_eq!(significant("-0-0j"), vec!["-0", "-0j"]);
        assert_eq!(significant("NaN-2j"), vec!["NaN", "-2j"]);
        assert_eq!(significant("Infinity-Infinityj"), vec!["Infinity", "-Infinityj"]);
        assert_eq!(significant("nan-value"), vec!["nan-value"]);
        assert_eq!(significant("1e-5 0x1F 1_000 .5"), vec!["1e-5", "0x1F", "1_000", ".5"]);
    }

    #[test]
    fn test_bullets_and_markers() {
        assert_eq!(significant("- a\n-- b\n--- c"), vec!["-", "a", "--", "b", "---", "c"]);
        assert_eq!(significant("1. a\n2. b"), vec!["1.", "a", "2.", "b"]);
        assert_eq!(significant("**obj *lst"), vec!["**", "obj", "*", "lst"]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            significant(r#"a: 'x' "y" b'z' r'\d' '''m'''"#),
            vec!["a", ":", "'x'", "\"y\"", "b'z'", r"r'\d'", "'''m'''"]
        );
        let tokens = tokenize("s: '''line1\nline2\nline3'''\n").unwrap();
        let string = tokens.iter().find(|t| t.kind == TokenKind::String).unwrap();
        assert_eq!(string.start, (1, 4));
        assert_eq!(string.end.0, 3);
    }

    #[test]
    fn test_brackets_suppress_indentation() {
        let kinds: Vec<_> = texts("a: [\n    1,\n    2\n]\n")
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert!(!kinds.contains(&TokenKind::Indent));
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Nl).count(), 3);
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Newline).count(), 1);
    }

    #[test]
    fn test_blank_and_comment_lines() {
        let kinds: Vec<_> = texts("a: 1\n\n# note\nb: 2  # trailing\n")
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::StreamStart,
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::Nl,
                TokenKind::Comment,
                TokenKind::Nl,
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Number,
                TokenKind::Comment,
                TokenKind::Newline,
                TokenKind::EndMarker,
            ]
        );
    }

    #[test]
    fn test_unterminated_final_line_gets_newline() {
        let tokens = tokenize("a: 1").unwrap();
        assert_eq!(tokens[tokens.len() - 2].kind, TokenKind::Newline);
    }

    #[test]
    fn test_empty_input_has_no_logical_line() {
        let kinds = |src| tokenize(src).unwrap().into_iter().map(|t| t.kind).collect::<Vec<_>>();
        assert_eq!(kinds(""), vec![TokenKind::StreamStart, TokenKind::EndMarker]);
        assert!(!kinds("\n# note\n\n").contains(&TokenKind::Newline));
    }

    #[test]
    fn test_errors() {
        let err = tokenize("a: 'open").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
        let err = tokenize("a:\n    b: 1\n  c: 2\n").unwrap_err();
        assert_eq!(err.line(), Some(3));
        assert!(tokenize("a: $").is_err());
    }

    #[test]
    fn test_positions_are_one_based() {
        let tokens = tokenize("key: value\n").unwrap();
        assert_eq!(tokens[1].start, (1, 1));
        assert_eq!(tokens[1].end, (1, 4));
        assert_eq!(tokens[3].start, (1, 6));
        assert_eq!(&*tokens[3].line, "key: value");
    }
}
