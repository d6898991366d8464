//! Backtrackable view over a token sequence.
//!
//! The parser looks ahead speculatively: it saves the position with
//! [`TokenCursor::push_marker`], consumes tokens, and then either restores the
//! saved position or drops it with [`TokenCursor::pop_marker`]. Looking past the
//! end always yields the final [`TokenKind::EndMarker`] token.
//!
//! ```rust
//! use serde_ison::cursor::TokenCursor;
//! use serde_ison::lexer::tokenize;
//! use serde_ison::TokenKind;
//!
//! let mut cursor = TokenCursor::new(tokenize("a: 1").unwrap());
//! cursor.push_marker();
//! cursor.advance();
//! assert!(cursor.current().is_op(":"));
//! cursor.pop_marker(true);
//! assert!(cursor.current().is_name("a"));
//! assert_eq!(cursor.look_ahead(100).kind, TokenKind::EndMarker);
//! ```

use crate::token::{Token, TokenKind};

pub struct TokenCursor {
    tokens: Vec<Token>,
    position: usize,
    markers: Vec<usize>,
}

impl TokenCursor {
    /// Wraps a token sequence.
    ///
    /// Stream-start and comment tokens are dropped, as are line-break tokens
    /// of blank lines (an `Nl` following another line break or an
    /// indentation token). An end marker is appended if the sequence lacks one.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut kept: Vec<Token> = Vec::with_capacity(tokens.len());
        for token in tokens {
            match token.kind {
                TokenKind::StreamStart | TokenKind::Comment => {}
                TokenKind::Nl
                    if kept.last().map_or(true, |prev| {
                        matches!(
                            prev.kind,
                            TokenKind::Newline | TokenKind::Nl | TokenKind::Indent | TokenKind::Dedent
                        )
                    }) => {}
                TokenKind::EndMarker => {
                    kept.push(token);
                    break;
                }
                _ => kept.push(token),
            }
        }
        if kept.last().map_or(true, |t| t.kind != TokenKind::EndMarker) {
            let (pos, line) = kept
                .last()
                .map_or(((1, 1), "".into()), |t| (t.end, t.line.clone()));
            kept.push(Token {
                kind: TokenKind::EndMarker,
                text: String::new(),
                start: pos,
                end: pos,
                line,
            });
        }
        TokenCursor {
            tokens: kept,
            position: 0,
            markers: Vec::new(),
        }
    }

    #[inline]
    fn sentinel(&self) -> &Token {
        // `new` guarantees a trailing end marker.
        &self.tokens[self.tokens.len() - 1]
    }

    /// The token at the cursor.
    #[inline]
    #[must_use]
    pub fn current(&self) -> &Token {
        self.look_ahead(0)
    }

    /// The token `n` places past the cursor, or the end marker.
    #[must_use]
    pub fn look_ahead(&self, n: usize) -> &Token {
        self.tokens
            .get(self.position + n)
            .unwrap_or_else(|| self.sentinel())
    }

    /// The most recently consumed token.
    #[must_use]
    pub fn last(&self) -> Option<&Token> {
        self.position
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
    }

    /// Consumes the current token and returns it. At the end of input the
    /// cursor stays on the end marker.
    pub fn advance(&mut self) -> &Token {
        let index = self.position.min(self.tokens.len() - 1);
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        &self.tokens[index]
    }

    pub fn push_marker(&mut self) {
        self.markers.push(self.position);
    }

    /// Drops the most recent marker, moving the cursor back to it if `reset`.
    pub fn pop_marker(&mut self, reset: bool) {
        if let Some(saved) = self.markers.pop() {
            if reset {
                self.position = saved;
            }
        }
    }

    #[must_use]
    pub fn at_end(&self) -> bool {
        self.current().kind == TokenKind::EndMarker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn kinds(cursor: &TokenCursor) -> Vec<TokenKind> {
        (0..cursor.tokens.len())
            .map(|i| cursor.look_ahead(i).kind)
            .collect()
    }

    #[test]
    fn test_blank_lines_and_comments_are_dropped() {
        let cursor = TokenCursor::new(tokenize("# header\n\na: 1 # note\n\n").unwrap());
        assert_eq!(
            kinds(&cursor),
            vec![
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::EndMarker
            ]
        );
    }

    #[test]
    fn test_line_breaks_inside_brackets_are_kept() {
        let cursor = TokenCursor::new(tokenize("[1,\n 2]").unwrap());
        assert_eq!(cursor.look_ahead(3).kind, TokenKind::Nl);
    }

    #[test]
    fn test_nested_markers() {
        let mut cursor = TokenCursor::new(tokenize("a b c").unwrap());
        cursor.push_marker();
        cursor.advance();
        cursor.push_marker();
        cursor.advance();
        cursor.pop_marker(false);
        assert!(cursor.current().is_name("c"));
        cursor.pop_marker(true);
        assert!(cursor.current().is_name("a"));
        assert!(cursor.last().is_none());
    }

    #[test]
    fn test_advance_past_end_is_stable() {
        let mut cursor = TokenCursor::new(Vec::new());
        assert!(cursor.at_end());
        cursor.advance();
        cursor.advance();
        assert!(cursor.at_end());
    }
}
