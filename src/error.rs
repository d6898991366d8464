//! Error types for ISON parsing and writing.
//!
//! Every failure is reported through the single [`Error`] enum. Parse failures
//! carry an [`ErrorKind`], the source name, the 1-based line and column of the
//! offending token, the source line text, a message and, for constructor
//! failures, the wrapped cause.
//!
//! ## Examples
//!
//! ```rust
//! use serde_ison::{parse_str, ErrorKind};
//!
//! let err = parse_str("a: 1\na: 2\n").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::DuplicateKey);
//! assert_eq!(err.line(), Some(2));
//! ```

use crate::token::Token;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A failure raised by a registered constructor.
pub type FactoryError = Box<dyn StdError + Send + Sync>;

/// The category of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A token did not match any grammar rule at its position.
    UnexpectedToken,
    /// A key appeared twice in one mapping.
    DuplicateKey,
    /// An element appeared twice in one set literal.
    DuplicateSetElement,
    /// `@name`, `*name` or `**name` named nothing in scope.
    UndefinedReference,
    /// A literal merged into a reference of a different container kind.
    MergeTypeMismatch,
    /// `*` applied to a non-iterable or `**` applied to a non-mapping.
    SpreadTypeMismatch,
    /// A numbered list marker skipped or repeated a number.
    InvalidNumberedList,
    /// A registered constructor returned an error.
    FactoryInvocation,
    /// A call or import named a constructor the registry does not know.
    UnresolvableConstructor,
    /// An import bound a name that was already bound.
    DuplicateImport,
    /// A string or number literal could not be decoded.
    InvalidLiteral,
    /// The tokenizer could not read the input.
    InvalidToken,
    /// A key token that cannot be used as a mapping key.
    InvalidKey,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnexpectedToken => "unexpected token",
            ErrorKind::DuplicateKey => "duplicate key",
            ErrorKind::DuplicateSetElement => "duplicate set element",
            ErrorKind::UndefinedReference => "undefined reference",
            ErrorKind::MergeTypeMismatch => "merge type mismatch",
            ErrorKind::SpreadTypeMismatch => "spread type mismatch",
            ErrorKind::InvalidNumberedList => "invalid numbered list",
            ErrorKind::FactoryInvocation => "constructor failed",
            ErrorKind::UnresolvableConstructor => "unresolvable constructor",
            ErrorKind::DuplicateImport => "duplicate import",
            ErrorKind::InvalidLiteral => "invalid literal",
            ErrorKind::InvalidToken => "invalid token",
            ErrorKind::InvalidKey => "invalid key",
        };
        f.write_str(name)
    }
}

/// Represents all possible errors of ISON parsing, writing and serde conversion.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// Positioned failure while tokenizing or parsing a document
    #[error("{kind} in {source_name} at line {line}, column {column}:\n{context}\n{message}")]
    Parse {
        kind: ErrorKind,
        source_name: String,
        line: usize,
        column: usize,
        context: String,
        message: String,
        #[source]
        cause: Option<Arc<dyn StdError + Send + Sync>>,
    },

    /// The writer was asked to render a value it is configured to reject
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    /// A map key that cannot be represented as an ISON key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),

    /// Generic message
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Creates a parse error positioned at the start of `token`.
    pub fn at(kind: ErrorKind, source_name: &str, token: &Token, message: impl Into<String>) -> Self {
        Error::Parse {
            kind,
            source_name: source_name.to_string(),
            line: token.start.0,
            column: token.start.1,
            context: token.line.to_string(),
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a parse error at an explicit position.
    ///
    /// Used by the tokenizer, which fails before a token exists.
    pub fn parse(
        kind: ErrorKind,
        source_name: &str,
        line: usize,
        column: usize,
        context: &str,
        message: impl Into<String>,
    ) -> Self {
        Error::Parse {
            kind,
            source_name: source_name.to_string(),
            line,
            column,
            context: context.to_string(),
            message: message.into(),
            cause: None,
        }
    }

    /// Attaches the underlying failure of a constructor to a parse error.
    #[must_use]
    pub fn with_cause(self, err: FactoryError) -> Self {
        match self {
            Error::Parse {
                kind,
                source_name,
                line,
                column,
                context,
                message,
                ..
            } => Error::Parse {
                kind,
                source_name,
                line,
                column,
                context,
                message,
                cause: Some(Arc::from(err)),
            },
            other => other,
        }
    }

    /// Returns the kind of a parse error, or [`ErrorKind::InvalidKey`] for
    /// writer key failures. Other variants report [`ErrorKind::UnexpectedToken`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse { kind, .. } => *kind,
            Error::InvalidKey(_) => ErrorKind::InvalidKey,
            _ => ErrorKind::UnexpectedToken,
        }
    }

    /// The 1-based line of a parse error.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Parse { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// The 1-based column of a parse error.
    #[must_use]
    pub fn column(&self) -> Option<usize> {
        match self {
            Error::Parse { column, .. } => Some(*column),
            _ => None,
        }
    }

    /// The human-readable message without position information.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Error::Parse { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Creates an unsupported value error for values the writer refuses to emit.
    pub fn unsupported_value(msg: &str) -> Self {
        Error::UnsupportedValue(msg.to_string())
    }

    /// Creates an invalid key error for map keys that are not string-like.
    pub fn invalid_key(msg: &str) -> Self {
        Error::InvalidKey(msg.to_string())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_ison::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for reading/writing failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Error::Io("formatter error".to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    #[test]
    fn test_parse_error_display() {
        let token = Token::new(TokenKind::Name, "b", (3, 5), (3, 6), "a: b");
        let err = Error::at(ErrorKind::DuplicateKey, "<test>", &token, "duplicate key 'b'");
        let text = err.to_string();
        assert!(text.contains("duplicate key in <test> at line 3, column 5"));
        assert!(text.contains("a: b"));
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.column(), Some(5));
    }

    #[test]
    fn test_with_cause_keeps_source() {
        let token = Token::new(TokenKind::Name, "f", (1, 1), (1, 2), "f()");
        let cause: FactoryError = "boom".into();
        let err = Error::at(ErrorKind::FactoryInvocation, "<test>", &token, "failed").with_cause(cause);
        let source = StdError::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("boom"));
    }

    #[test]
    fn test_writer_errors() {
        assert_eq!(Error::invalid_key("[1]").kind(), ErrorKind::InvalidKey);
        assert!(Error::unsupported_value("NaN").to_string().contains("NaN"));
        assert_eq!(Error::custom("x").line(), None);
    }
}
