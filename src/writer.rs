//! Canonical ISON text output.
//!
//! The writer always emits fully expanded literal data: mappings as `{...}`,
//! sequences, tuples and sets as `[...]`. It never produces bullet lists,
//! references or constructor calls, so everything it writes can be parsed
//! back. Sets and tuples come back as sequences.
//!
//! ## Layouts
//!
//! The layout follows [`WriteOptions::indent`]:
//!
//! - `None`: everything on one line, `{a: 1, b: [1, 2]}`
//! - `Some(0)`: one entry or element per line, no indentation
//! - `Some(n)`: one entry or element per line, indented by `n` spaces per
//!   level; a non-empty top-level mapping is written as bare `key: value`
//!   lines
//!
//! ```rust
//! use serde_ison::{parse_str, write_to_string, WriteOptions};
//!
//! let value = parse_str("a: [1, 2, 3]\n").unwrap();
//! let text = write_to_string(&value, &WriteOptions::pretty()).unwrap();
//! assert_eq!(text, "a: [\n    1,\n    2,\n    3\n]");
//! assert_eq!(parse_str(&text).unwrap(), value);
//! ```

use crate::error::{Error, Result};
use crate::lexer::is_bare_name;
use crate::options::{ConstantStyle, WriteOptions};
use crate::value::{Complex, Value};
use crate::Map;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Writes `value` to `sink` as ISON text.
///
/// # Errors
///
/// Returns [`Error::UnsupportedValue`] for a non-finite float when
/// `allow_inf_nan` is off, or an I/O error if the sink fails.
pub fn write<W: fmt::Write>(value: &Value, sink: &mut W, options: &WriteOptions) -> Result<()> {
    debug!(indent = ?options.indent, kind = value.kind_name(), "writing value");
    Writer::new(sink, options).write_document(value)
}

/// Writes `value` into a new string.
///
/// # Examples
///
/// ```rust
/// use serde_ison::{write_to_string, Value, WriteOptions};
///
/// let value = Value::Sequence(vec![Value::from(1), Value::from("a b"), Value::Null]);
/// let text = write_to_string(&value, &WriteOptions::default()).unwrap();
/// assert_eq!(text, "[1, 'a b', null]");
/// ```
///
/// # Errors
///
/// See [`write`].
pub fn write_to_string(value: &Value, options: &WriteOptions) -> Result<String> {
    let mut out = String::with_capacity(128);
    write(value, &mut out, options)?;
    Ok(out)
}

/// Returns `true` if `text` can be written without quotes and read back as
/// the same string.
fn is_bare_string(text: &str) -> bool {
    is_bare_name(text) && !ConstantStyle::is_reserved(text)
}

/// Picks the quote character that occurs less often in `text`.
fn quote_for(text: &str) -> char {
    if text.matches('\'').count() > text.matches('"').count() {
        '"'
    } else {
        '\''
    }
}

struct Writer<'a, W> {
    sink: &'a mut W,
    options: &'a WriteOptions,
    depth: usize,
    /// Identities of constructed instances already written.
    rendered: HashSet<usize>,
}

impl<'a, W: fmt::Write> Writer<'a, W> {
    fn new(sink: &'a mut W, options: &'a WriteOptions) -> Self {
        Writer {
            sink,
            options,
            depth: 0,
            rendered: HashSet::new(),
        }
    }

    fn write_document(&mut self, value: &Value) -> Result<()> {
        match (self.options.indent, value) {
            (Some(width), Value::Mapping(map)) if width > 0 && !map.is_empty() => {
                for (i, (key, value)) in self.entries(map).into_iter().enumerate() {
                    if i > 0 {
                        self.sink.write_char('\n')?;
                    }
                    self.write_entry(key, value)?;
                }
                Ok(())
            }
            _ => self.write_value(value),
        }
    }

    fn entries<'m>(&self, map: &'m Map) -> Vec<(&'m String, &'m Value)> {
        let mut entries: Vec<_> = map.iter().collect();
        if self.options.sort_keys {
            entries.sort_by(|a, b| a.0.cmp(b.0));
        }
        entries
    }

    fn newline(&mut self) -> Result<()> {
        if let Some(width) = self.options.indent {
            self.sink.write_char('\n')?;
            for _ in 0..width * self.depth {
                self.sink.write_char(' ')?;
            }
        }
        Ok(())
    }

    fn write_value(&mut self, value: &Value) -> Result<()> {
        let constants = self.options.constants;
        match value {
            Value::Null => self.sink.write_str(constants.null())?,
            Value::Bool(true) => self.sink.write_str(constants.true_())?,
            Value::Bool(false) => self.sink.write_str(constants.false_())?,
            Value::Int(n) => write!(self.sink, "{n}")?,
            Value::BigInt(n) => write!(self.sink, "{n}")?,
            Value::Float(f) => {
                let text = self.format_float(*f, false)?;
                self.sink.write_str(&text)?;
            }
            Value::Complex(c) => self.write_complex(*c)?,
            Value::String(s) => self.write_string(s)?,
            Value::Bytes(b) => self.write_bytes(b)?,
            Value::Mapping(map) => self.write_mapping(map)?,
            Value::Sequence(items) | Value::Tuple(items) => self.write_list(items)?,
            Value::Set(set) => self.write_list(set.iter().as_slice())?,
            Value::Constructed(c) => {
                if self.options.check_circular && !self.rendered.insert(c.identity()) {
                    self.sink.write_str("...")?;
                } else {
                    self.write_value(c.value())?;
                }
            }
        }
        Ok(())
    }

    fn write_entry(&mut self, key: &str, value: &Value) -> Result<()> {
        self.write_key(key)?;
        self.sink.write_str(": ")?;
        self.write_value(value)
    }

    fn write_mapping(&mut self, map: &Map) -> Result<()> {
        if map.is_empty() {
            self.sink.write_str("{}")?;
            return Ok(());
        }
        let entries = self.entries(map);
        self.sink.write_char('{')?;
        if self.options.indent.is_none() {
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    self.sink.write_str(", ")?;
                }
                self.write_entry(key, value)?;
            }
        } else {
            self.depth += 1;
            for (key, value) in entries {
                self.newline()?;
                self.write_entry(key, value)?;
            }
            self.depth -= 1;
            self.newline()?;
        }
        self.sink.write_char('}')?;
        Ok(())
    }

    fn write_list(&mut self, items: &[Value]) -> Result<()> {
        if items.is_empty() {
            self.sink.write_str("[]")?;
            return Ok(());
        }
        self.sink.write_char('[')?;
        if self.options.indent.is_none() || self.fits_on_line(items)? {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    self.sink.write_str(", ")?;
                }
                self.write_value(item)?;
            }
        } else {
            self.depth += 1;
            for (i, item) in items.iter().enumerate() {
                self.newline()?;
                self.write_value(item)?;
                if i + 1 < items.len() {
                    self.sink.write_char(',')?;
                }
            }
            self.depth -= 1;
            self.newline()?;
        }
        self.sink.write_char(']')?;
        Ok(())
    }

    /// Whether an indented list is short enough to stay on one line.
    fn fits_on_line(&self, items: &[Value]) -> Result<bool> {
        let width = self.options.short_list_width;
        if width == 0 {
            return Ok(false);
        }
        for item in items {
            if matches!(
                item,
                Value::Mapping(_)
                    | Value::Sequence(_)
                    | Value::Tuple(_)
                    | Value::Set(_)
                    | Value::Constructed(_)
            ) {
                return Ok(false);
            }
            let mut rendered = String::new();
            Writer::new(&mut rendered, self.options).write_value(item)?;
            if rendered.chars().count() > width || rendered.contains('\n') {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn write_key(&mut self, key: &str) -> Result<()> {
        if is_bare_string(key) {
            self.sink.write_str(key)?;
            Ok(())
        } else {
            self.write_quoted(key)
        }
    }

    fn write_string(&mut self, s: &str) -> Result<()> {
        if is_bare_string(s) {
            self.sink.write_str(s)?;
        } else if s.matches('\n').count() > 2 {
            self.write_triple_quoted(s)?;
        } else if s.matches('\\').count() >= 2
            && !s.ends_with('\\')
            && !s.contains(['\'', '"'])
            && !s.contains(char::is_control)
        {
            write!(self.sink, "r'{s}'")?;
        } else {
            self.write_quoted(s)?;
        }
        Ok(())
    }

    fn write_escaped_char(&mut self, c: char, quote: char) -> Result<()> {
        match c {
            '\\' => self.sink.write_str("\\\\")?,
            '\n' => self.sink.write_str("\\n")?,
            '\r' => self.sink.write_str("\\r")?,
            '\t' => self.sink.write_str("\\t")?,
            c if c == quote => {
                self.sink.write_char('\\')?;
                self.sink.write_char(c)?;
            }
            c if c.is_control() => {
                let code = u32::from(c);
                if code <= 0xff {
                    write!(self.sink, "\\x{code:02x}")?;
                } else {
                    write!(self.sink, "\\u{code:04x}")?;
                }
            }
            c => self.sink.write_char(c)?,
        }
        Ok(())
    }

    fn write_quoted(&mut self, s: &str) -> Result<()> {
        let quote = quote_for(s);
        self.sink.write_char(quote)?;
        for c in s.chars() {
            self.write_escaped_char(c, quote)?;
        }
        self.sink.write_char(quote)?;
        Ok(())
    }

    /// Multi-line form: line breaks are kept literally.
    fn write_triple_quoted(&mut self, s: &str) -> Result<()> {
        let quote = quote_for(s);
        for _ in 0..3 {
            self.sink.write_char(quote)?;
        }
        for c in s.chars() {
            if c == '\n' {
                self.sink.write_char('\n')?;
            } else {
                self.write_escaped_char(c, quote)?;
            }
        }
        for _ in 0..3 {
            self.sink.write_char(quote)?;
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') {
            b'"'
        } else {
            b'\''
        };
        self.sink.write_char('b')?;
        self.sink.write_char(char::from(quote))?;
        for &b in bytes {
            match b {
                b'\\' => self.sink.write_str("\\\\")?,
                b'\n' => self.sink.write_str("\\n")?,
                b'\r' => self.sink.write_str("\\r")?,
                b'\t' => self.sink.write_str("\\t")?,
                b if b == quote => {
                    self.sink.write_char('\\')?;
                    self.sink.write_char(char::from(b))?;
                }
                0x20..=0x7e => self.sink.write_char(char::from(b))?,
                b => write!(self.sink, "\\x{b:02x}")?,
            }
        }
        self.sink.write_char(char::from(quote))?;
        Ok(())
    }

    /// Formats a float. Inside complex numbers integral components drop
    /// their `.0`.
    fn format_float(&self, f: f64, component: bool) -> Result<String> {
        if !f.is_finite() {
            if !self.options.allow_inf_nan {
                return Err(Error::unsupported_value(&format!(
                    "non-finite float {f} is not allowed"
                )));
            }
            let constants = self.options.constants;
            return Ok(if f.is_nan() {
                constants.nan().to_string()
            } else if f > 0.0 {
                constants.infinity().to_string()
            } else {
                format!("-{}", constants.infinity())
            });
        }
        let text = format!("{f:?}");
        if component {
            if let Some(integral) = text.strip_suffix(".0") {
                return Ok(integral.to_string());
            }
        }
        Ok(text)
    }

    fn write_complex(&mut self, c: Complex) -> Result<()> {
        let im = self.format_float(c.im, true)?;
        if c.re == 0.0 && !c.re.is_sign_negative() {
            write!(self.sink, "{im}j")?;
            return Ok(());
        }
        let re = self.format_float(c.re, true)?;
        let sign = if im.starts_with('-') { "" } else { "+" };
        write!(self.sink, "{re}{sign}{im}j")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_str, Constructed, Set};
    use std::sync::Arc;

    fn compact(value: &Value) -> String {
        write_to_string(value, &WriteOptions::default()).unwrap()
    }

    fn mapping(entries: Vec<(&str, Value)>) -> Value {
        Value::Mapping(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn ints(items: &[i64]) -> Value {
        Value::Sequence(items.iter().map(|&i| Value::from(i)).collect())
    }

    #[test]
    fn test_compact_layout() {
        let value = mapping(vec![("a", Value::from(1)), ("b", ints(&[1, 2]))]);
        assert_eq!(compact(&value), "{a: 1, b: [1, 2]}");
        assert_eq!(compact(&Value::Mapping(Map::new())), "{}");
        assert_eq!(compact(&Value::Sequence(vec![])), "[]");
    }

    #[test]
    fn test_pretty_top_level_mapping() {
        let value = mapping(vec![
            (
                "server",
                mapping(vec![("host", Value::from("localhost")), ("ports", ints(&[80]))]),
            ),
            ("name", Value::from("x")),
        ]);
        let text = write_to_string(&value, &WriteOptions::pretty()).unwrap();
        assert_eq!(
            text,
            "server: {\n    host: localhost\n    ports: [\n        80\n    ]\n}\nname: x"
        );
        assert_eq!(parse_str(&text).unwrap(), value);
    }

    #[test]
    fn test_zero_indent_layout() {
        let value = mapping(vec![("a", ints(&[1, 2]))]);
        let text = write_to_string(&value, &WriteOptions::new().with_indent(0)).unwrap();
        assert_eq!(text, "{\na: [\n1,\n2\n]\n}");
        assert_eq!(parse_str(&text).unwrap(), value);
    }

    #[test]
    fn test_short_lists_stay_inline() {
        let options = WriteOptions::pretty().with_short_list_width(8);
        let value = mapping(vec![("a", ints(&[1, 2, 3]))]);
        assert_eq!(write_to_string(&value, &options).unwrap(), "a: [1, 2, 3]");

        let value = mapping(vec![(
            "a",
            Value::Sequence(vec![Value::from(1), Value::from("a long string")]),
        )]);
        assert_eq!(
            write_to_string(&value, &options).unwrap(),
            "a: [\n    1,\n    'a long string'\n]"
        );
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(compact(&Value::from("hello")), "hello");
        assert_eq!(compact(&Value::from("two words")), "'two words'");
        assert_eq!(compact(&Value::from("it's")), "\"it's\"");
        assert_eq!(compact(&Value::from("true")), "'true'");
        assert_eq!(compact(&Value::from("-Infinity")), "'-Infinity'");
        assert_eq!(compact(&Value::from("")), "''");
        assert_eq!(compact(&Value::from("tab\there")), "'tab\\there'");
        assert_eq!(compact(&Value::from("a\nb\nc\nd")), "'''a\nb\nc\nd'''");
        assert_eq!(compact(&Value::from("C:\\dir\\file")), "r'C:\\dir\\file'");
        assert_eq!(compact(&Value::from("one\\")), "'one\\\\'");
    }

    #[test]
    fn test_strings_read_back() {
        for s in ["a\nb\nc\nd'e", "C:\\dir\\file", "x\u{1}y", "\"both'", "1.5", "k: v"] {
            let value = mapping(vec![("s", Value::from(s))]);
            let text = compact(&value);
            assert_eq!(parse_str(&text).unwrap(), value, "{text}");
        }
    }

    #[test]
    fn test_keys() {
        let value = mapping(vec![
            ("plain", Value::Null),
            ("with space", Value::Null),
            ("1", Value::Null),
            ("null", Value::Null),
        ]);
        assert_eq!(
            compact(&value),
            "{plain: null, 'with space': null, '1': null, 'null': null}"
        );
    }

    #[test]
    fn test_bytes() {
        assert_eq!(compact(&Value::Bytes(b"ab\n".to_vec())), "b'ab\\n'");
        assert_eq!(compact(&Value::Bytes(vec![0, b'a', b'\''])), "b\"\\x00a'\"");
    }

    #[test]
    fn test_floats() {
        assert_eq!(compact(&Value::from(1.5)), "1.5");
        assert_eq!(compact(&Value::from(2.0)), "2.0");
        assert_eq!(compact(&Value::from(f64::NEG_INFINITY)), "-Infinity");
        assert_eq!(compact(&Value::from(f64::NAN)), "NaN");
        let title = WriteOptions::new().with_constants(ConstantStyle::TitleCase);
        assert_eq!(
            write_to_string(&Value::from(f64::INFINITY), &title).unwrap(),
            "inf"
        );
        let strict = WriteOptions::new().with_inf_nan(false);
        let err = write_to_string(&Value::from(f64::NAN), &strict).unwrap_err();
        assert!(matches!(err, Error::UnsupportedValue(_)));
    }

    #[test]
    fn test_complex() {
        assert_eq!(compact(&Value::Complex(Complex::new(3.0, 4.0))), "3+4j");
        assert_eq!(compact(&Value::Complex(Complex::new(0.0, -2.0))), "-2j");
        assert_eq!(compact(&Value::Complex(Complex::new(-0.0, -0.0))), "-0-0j");
        assert_eq!(
            compact(&Value::Complex(Complex::new(1.5, f64::INFINITY))),
            "1.5+Infinityj"
        );
        for c in [Complex::new(3.0, 4.0), Complex::new(-1.5, 0.25), Complex::new(0.0, 2.0)] {
            let value = mapping(vec![("z", Value::Complex(c))]);
            assert_eq!(parse_str(&compact(&value)).unwrap(), value);
        }
    }

    #[test]
    fn test_sort_keys() {
        let value = mapping(vec![("b", Value::from(1)), ("a", Value::from(2))]);
        let options = WriteOptions::new().with_sort_keys(true);
        assert_eq!(write_to_string(&value, &options).unwrap(), "{a: 2, b: 1}");
    }

    #[test]
    fn test_sets_and_tuples_write_as_lists() {
        let set: Set = vec![Value::from(1), Value::from(2)].into_iter().collect();
        assert_eq!(compact(&Value::Set(set)), "[1, 2]");
        assert_eq!(compact(&Value::Tuple(vec![Value::from("a")])), "[a]");
    }

    #[test]
    fn test_repeated_instances() {
        let shared = Constructed::new("point", Arc::new(ints(&[1])));
        let value = Value::Sequence(vec![
            Value::Constructed(shared.clone()),
            Value::Constructed(shared),
        ]);
        assert_eq!(compact(&value), "[[1], ...]");
        let unchecked = WriteOptions::new().with_check_circular(false);
        assert_eq!(write_to_string(&value, &unchecked).unwrap(), "[[1], [1]]");
    }
}
