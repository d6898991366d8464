//! Token records exchanged between the tokenizer and the parser.

use std::fmt;
use std::sync::Arc;

/// The coarse kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A bare word: letters, digits, `_`, `.` and `-`, starting with a letter or `_`.
    Name,
    /// A numeric literal, possibly signed or imaginary.
    Number,
    /// A string or byte-string literal including its prefix and quotes.
    String,
    /// Punctuation.
    Op,
    /// End of a logical line.
    Newline,
    /// A line break that does not end a logical line (blank lines, inside brackets).
    Nl,
    /// Indentation increase.
    Indent,
    /// Indentation decrease.
    Dedent,
    /// A `#` comment.
    Comment,
    /// End of input.
    EndMarker,
    /// Leading marker of a token stream.
    StreamStart,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Name => "NAME",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Op => "OP",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Nl => "NL",
            TokenKind::Indent => "INDENT",
            TokenKind::Dedent => "DEDENT",
            TokenKind::Comment => "COMMENT",
            TokenKind::EndMarker => "ENDMARKER",
            TokenKind::StreamStart => "STREAMSTART",
        };
        f.write_str(name)
    }
}

/// One token: kind, literal text, 1-based start and end positions, and the
/// source line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: (usize, usize),
    pub end: (usize, usize),
    pub line: Arc<str>,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        text: &str,
        start: (usize, usize),
        end: (usize, usize),
        line: &str,
    ) -> Self {
        Token {
            kind,
            text: text.to_string(),
            start,
            end,
            line: Arc::from(line),
        }
    }

    /// Returns `true` for an operator token with exactly this text.
    #[inline]
    #[must_use]
    pub fn is_op(&self, text: &str) -> bool {
        self.kind == TokenKind::Op && self.text == text
    }

    /// Returns `true` for a name token with exactly this text.
    #[inline]
    #[must_use]
    pub fn is_name(&self, text: &str) -> bool {
        self.kind == TokenKind::Name && self.text == text
    }

    /// Human-readable rendering used in "expected X, found Y" messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Name | TokenKind::Number | TokenKind::String | TokenKind::Op => {
                format!("{:?}", self.text)
            }
            TokenKind::Newline | TokenKind::Nl => "end of line".to_string(),
            TokenKind::Indent => "indentation".to_string(),
            TokenKind::Dedent => "dedent".to_string(),
            TokenKind::EndMarker => "end of input".to_string(),
            other => other.to_string(),
        }
    }
}
