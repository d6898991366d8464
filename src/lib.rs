//! # serde_ison
//!
//! A parser and writer for ISON, an indentation-based notation for structured
//! data with references, merges and named constructors, plus Serde support.
//!
//! ## What is ISON?
//!
//! ISON reads like a config file. Mappings and lists nest by indentation or
//! use bracketed literals, and values can refer to other parts of the same
//! document:
//!
//! ```text
//! defaults:
//!     retries: 3
//!     hosts: [a, b]
//! service: @defaults
//!     name: api
//! hosts: [*defaults.hosts, c]
//! origin: complex(0, 1)
//! ```
//!
//! ## Key Features
//!
//! - **References**: `@name` copies a value, `@name.0.key` walks into it,
//!   `*name` and `**name` splice sequences and mappings
//! - **Merges**: `@base` followed by literal content combines the two without
//!   touching `base`
//! - **Named constructors**: `Name(args)` calls a factory from a
//!   [`ConstructorRegistry`] the host application fills
//! - **Canonical writer**: output is always plain bracketed literals and
//!   parses back to the same data
//! - **Serde Compatible**: `#[derive(Serialize, Deserialize)]` types convert
//!   to and from [`Value`]
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use serde_ison::{from_str, to_string_pretty};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     tags: Vec<String>,
//! }
//!
//! let user = User { id: 7, name: "Alice".to_string(), tags: vec!["admin".to_string()] };
//! let text = to_string_pretty(&user).unwrap();
//! assert_eq!(text, "id: 7\nname: Alice\ntags: [\n    admin\n]");
//!
//! let back: User = from_str(&text).unwrap();
//! assert_eq!(user, back);
//! ```
//!
//! ### Working with Documents
//!
//! ```rust
//! use serde_ison::{parse_str, Value};
//!
//! let doc = "object1:\n    key: 1\nobject2: @object1\n    key2: 2\n";
//! let value = parse_str(doc).unwrap();
//! let merged = value.get("object2").unwrap();
//! assert_eq!(merged.get("key"), Some(&Value::from(1)));
//! assert_eq!(merged.get("key2"), Some(&Value::from(2)));
//! assert!(value.get("object1").and_then(|o| o.get("key2")).is_none());
//! ```
//!
//! ### Dynamic Values with the ison! Macro
//!
//! ```rust
//! use serde_ison::{ison, to_string};
//!
//! let data = ison!({
//!     "name": "Alice",
//!     "tags": ["rust", "serde"]
//! });
//! assert_eq!(to_string(&data).unwrap(), "{name: Alice, tags: [rust, serde]}");
//! ```
//!
//! ## Errors
//!
//! Every parse failure is an [`Error::Parse`] carrying an [`ErrorKind`], the
//! source name, the 1-based line and column of the offending token and the
//! source line itself. Failures raised inside constructors are kept as the
//! error's `source()`.
//!
//! ## Logging
//!
//! The crate emits `tracing` events: `debug` when a document is parsed or
//! written and for each import, `trace` for references, merges and
//! constructor calls. No subscriber is installed.

pub mod cursor;
pub mod de;
pub mod error;
pub mod lexer;
mod literal;
pub mod macros;
pub mod map;
pub mod options;
mod parser;
pub mod registry;
mod scope;
pub mod ser;
pub mod set;
pub mod token;
pub mod value;
pub mod writer;

pub use de::{from_value, ValueDeserializer};
pub use error::{Error, ErrorKind, FactoryError, Result};
pub use map::Map;
pub use options::{ConstantStyle, ParseOptions, WriteOptions};
pub use parser::parse;
pub use registry::{ConstructorRegistry, Factory, Produced};
pub use ser::{to_value, ValueSerializer};
pub use set::Set;
pub use token::{Token, TokenKind};
pub use value::{Complex, Constructed, Value};
pub use writer::{write, write_to_string};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;

/// Parses a document with default options.
///
/// # Examples
///
/// ```rust
/// use serde_ison::{parse_str, Value};
///
/// let value = parse_str("list1: [1, 2, 3]\nflag1: @list1.1\n").unwrap();
/// assert_eq!(value.get("flag1"), Some(&Value::from(2)));
/// ```
///
/// # Errors
///
/// Returns a positioned [`Error::Parse`] if the text is not a valid document.
pub fn parse_str(text: &str) -> Result<Value> {
    parse_str_with_options(text, "<string>", &ParseOptions::default())
}

/// Parses a document, naming it `source_name` in error messages.
///
/// # Examples
///
/// ```rust
/// use serde_ison::{parse_str_with_options, ErrorKind, ParseOptions};
///
/// let err = parse_str_with_options("a: 1\na: 2\n", "app.ison", &ParseOptions::default())
///     .unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::DuplicateKey);
/// assert_eq!(err.line(), Some(2));
/// assert!(err.to_string().contains("app.ison"));
/// ```
///
/// # Errors
///
/// Returns a positioned [`Error::Parse`] if the text is not a valid document.
pub fn parse_str_with_options(
    text: &str,
    source_name: &str,
    options: &ParseOptions,
) -> Result<Value> {
    let tokens = lexer::tokenize_named(text, source_name)?;
    parse(tokens, source_name, options)
}

/// Serialize any `T: Serialize` to a compact ISON string.
///
/// # Examples
///
/// ```rust
/// use serde_ison::to_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// assert_eq!(to_string(&Point { x: 1, y: 2 }).unwrap(), "{x: 1, y: 2}");
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be represented (for example a map
/// with non-string keys).
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with_options(value, &WriteOptions::default())
}

/// Serialize any `T: Serialize` to an indented ISON string.
///
/// A struct or map at the top level becomes one `key: value` line per field.
///
/// # Errors
///
/// Returns an error if the value cannot be represented.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_pretty<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with_options(value, &WriteOptions::pretty())
}

/// Serialize any `T: Serialize` to an ISON string with custom options.
///
/// # Examples
///
/// ```rust
/// use serde_ison::{to_string_with_options, ConstantStyle, WriteOptions};
///
/// let options = WriteOptions::new()
///     .with_constants(ConstantStyle::TitleCase)
///     .with_sort_keys(true);
/// let mut map = std::collections::HashMap::new();
/// map.insert("b", true);
/// map.insert("a", false);
/// assert_eq!(to_string_with_options(&map, &options).unwrap(), "{a: False, b: True}");
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be represented.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_with_options<T>(value: &T, options: &WriteOptions) -> Result<String>
where
    T: ?Sized + Serialize,
{
    write_to_string(&to_value(value)?, options)
}

/// Serialize any `T: Serialize` to a writer in compact ISON.
///
/// # Examples
///
/// ```rust
/// use serde_ison::to_writer;
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &vec![1, 2]).unwrap();
/// assert_eq!(buffer, b"[1, 2]");
/// ```
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    to_writer_with_options(writer, value, &WriteOptions::default())
}

/// Serialize any `T: Serialize` to a writer with custom options.
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer_with_options<W, T>(mut writer: W, value: &T, options: &WriteOptions) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let text = to_string_with_options(value, options)?;
    writer
        .write_all(text.as_bytes())
        .map_err(|e| Error::io(&e.to_string()))?;
    Ok(())
}

/// Deserialize an instance of type `T` from ISON text.
///
/// The whole document is parsed first, so references, merges and
/// constructors are resolved before `T` sees the data.
///
/// # Examples
///
/// ```rust
/// use serde_ison::from_str;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let point: Point = from_str("x: 1\ny: @x\n").unwrap();
/// assert_eq!(point, Point { x: 1, y: 1 });
/// ```
///
/// # Errors
///
/// Returns an error if the text is not a valid document or cannot be
/// deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str<T>(s: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    from_value(parse_str(s)?)
}

/// Deserialize an instance of type `T` from ISON text with custom options.
///
/// # Errors
///
/// Returns an error if the text is not a valid document or cannot be
/// deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_with_options<T>(s: &str, source_name: &str, options: &ParseOptions) -> Result<T>
where
    T: DeserializeOwned,
{
    from_value(parse_str_with_options(s, source_name, options)?)
}

/// Deserialize an instance of type `T` from an I/O stream of ISON.
///
/// # Examples
///
/// ```rust
/// use serde_ison::from_reader;
/// use std::io::Cursor;
///
/// let numbers: Vec<u8> = from_reader(Cursor::new(b"- 1\n- 2\n")).unwrap();
/// assert_eq!(numbers, vec![1, 2]);
/// ```
///
/// # Errors
///
/// Returns an error if reading fails, the input is not valid ISON, or the
/// data cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R, T>(mut reader: R) -> Result<T>
where
    R: io::Read,
    T: DeserializeOwned,
{
    let mut string = String::new();
    reader
        .read_to_string(&mut string)
        .map_err(|e| Error::io(&e.to_string()))?;
    from_str(&string)
}

/// Deserialize an instance of type `T` from bytes of ISON text.
///
/// # Errors
///
/// Returns an error if the bytes are not valid UTF-8, not valid ISON, or
/// cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<T>(v: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    let s = std::str::from_utf8(v).map_err(|e| Error::custom(e.to_string()))?;
    from_str(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct User {
        id: u32,
        name: String,
        active: bool,
        tags: Vec<String>,
        scores: BTreeMap<String, f64>,
    }

    fn user() -> User {
        let mut scores = BTreeMap::new();
        scores.insert("math".to_string(), 9.5);
        scores.insert("two words".to_string(), -1.0);
        User {
            id: 123,
            name: "Alice Smith".to_string(),
            active: true,
            tags: vec!["admin".to_string(), "true".to_string()],
            scores,
        }
    }

    #[test]
    fn test_serialize_deserialize_point() {
        let point = Point { x: 1, y: 2 };
        let text = to_string(&point).unwrap();
        assert_eq!(text, "{x: 1, y: 2}");
        let point_back: Point = from_str(&text).unwrap();
        assert_eq!(point, point_back);
    }

    #[test]
    fn test_serialize_deserialize_user_all_layouts() {
        for options in [
            WriteOptions::new(),
            WriteOptions::new().with_indent(0),
            WriteOptions::pretty(),
            WriteOptions::new().with_indent(2).with_short_list_width(10),
        ] {
            let text = to_string_with_options(&user(), &options).unwrap();
            let user_back: User = from_str(&text).unwrap();
            assert_eq!(user(), user_back, "{text}");
        }
    }

    #[test]
    fn test_arrays() {
        let numbers = vec![1, 2, 3, 4, 5];
        let text = to_string(&numbers).unwrap();
        let numbers_back: Vec<i32> = from_str(&text).unwrap();
        assert_eq!(numbers, numbers_back);
    }

    #[test]
    fn test_to_writer_and_from_slice() {
        let mut buffer = Vec::new();
        to_writer_with_options(&mut buffer, &Point { x: 3, y: 4 }, &WriteOptions::pretty()).unwrap();
        assert_eq!(buffer, b"x: 3\ny: 4");
        let point: Point = from_slice(&buffer).unwrap();
        assert_eq!(point, Point { x: 3, y: 4 });
        assert!(from_slice::<Point>(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_from_str_with_options() {
        let options = ParseOptions::new().with_constants(ConstantStyle::TitleCase);
        let flags: Vec<Option<bool>> = from_str_with_options("[True, None]", "<flags>", &options).unwrap();
        assert_eq!(flags, vec![Some(true), None]);
    }
}
