//! Decoding of string and number token text into values.

use crate::value::{Complex, Value};
use num_bigint::BigInt;

/// Decodes a string or byte-string literal, including prefix and quotes.
pub(crate) fn decode_string(text: &str) -> Result<Value, String> {
    let prefix_len = text
        .find(|c| c == '\'' || c == '"')
        .ok_or_else(|| format!("{text:?} is not a string literal"))?;
    let prefix = text[..prefix_len].to_ascii_lowercase();
    let raw = prefix.contains('r');
    let bytes = prefix.contains('b');
    let body = &text[prefix_len..];
    let quote_len = if body.starts_with("'''") || body.starts_with("\"\"\"") {
        3
    } else {
        1
    };
    if body.len() < 2 * quote_len {
        return Err(format!("{text:?} is not a string literal"));
    }
    let inner = &body[quote_len..body.len() - quote_len];

    if bytes {
        let mut out = Vec::with_capacity(inner.len());
        if raw {
            for c in inner.chars() {
                out.push(ascii_byte(c)?);
            }
        } else {
            unescape(inner, true, &mut |unit| match unit {
                Unit::Char(c) => {
                    out.push(ascii_byte(c)?);
                    Ok(())
                }
                Unit::Byte(b) => {
                    out.push(b);
                    Ok(())
                }
            })?;
        }
        return Ok(Value::Bytes(out));
    }

    if raw {
        return Ok(Value::String(inner.to_string()));
    }
    let mut out = String::with_capacity(inner.len());
    unescape(inner, false, &mut |unit| {
        match unit {
            Unit::Char(c) => out.push(c),
            Unit::Byte(b) => out.push(char::from(b)),
        }
        Ok(())
    })?;
    Ok(Value::String(out))
}

fn ascii_byte(c: char) -> Result<u8, String> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err("bytes can only contain ASCII literal characters".to_string())
    }
}

enum Unit {
    Char(char),
    Byte(u8),
}

fn unescape(
    inner: &str,
    bytes: bool,
    sink: &mut dyn FnMut(Unit) -> Result<(), String>,
) -> Result<(), String> {
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            sink(Unit::Char(c))?;
            continue;
        }
        let Some(esc) = chars.next() else {
            return Err("trailing backslash in string literal".to_string());
        };
        let unit = match esc {
            '\n' => continue,
            '\\' => Unit::Char('\\'),
            '\'' => Unit::Char('\''),
            '"' => Unit::Char('"'),
            'n' => Unit::Char('\n'),
            'r' => Unit::Char('\r'),
            't' => Unit::Char('\t'),
            'a' => Unit::Char('\x07'),
            'b' => Unit::Char('\x08'),
            'f' => Unit::Char('\x0c'),
            'v' => Unit::Char('\x0b'),
            '0'..='7' => {
                let mut code = esc.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                if bytes {
                    Unit::Byte((code & 0xff) as u8)
                } else {
                    Unit::Char(char::from_u32(code).ok_or("invalid octal escape")?)
                }
            }
            'x' => {
                let code = hex_escape(&mut chars, 2)?;
                if bytes {
                    Unit::Byte(code as u8)
                } else {
                    Unit::Char(char::from_u32(code).ok_or("invalid \\x escape")?)
                }
            }
            'u' if !bytes => Unit::Char(
                char::from_u32(hex_escape(&mut chars, 4)?).ok_or("invalid \\u escape")?,
            ),
            'U' if !bytes => Unit::Char(
                char::from_u32(hex_escape(&mut chars, 8)?).ok_or("invalid \\U escape")?,
            ),
            other => {
                sink(Unit::Char('\\'))?;
                Unit::Char(other)
            }
        };
        sink(unit)?;
    }
    Ok(())
}

fn hex_escape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, len: usize) -> Result<u32, String> {
    let mut code = 0u32;
    for _ in 0..len {
        let digit = chars
            .next()
            .and_then(|d| d.to_digit(16))
            .ok_or_else(|| format!("truncated escape: expected {len} hex digits"))?;
        code = code * 16 + digit;
    }
    Ok(code)
}

/// Decodes a number token: integer, float or imaginary literal.
pub(crate) fn decode_number(text: &str) -> Result<Value, String> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    if let Some(imag) = cleaned
        .strip_suffix('j')
        .or_else(|| cleaned.strip_suffix('J'))
    {
        let im = parse_float(imag)?;
        return Ok(Value::Complex(Complex::new(0.0, im)));
    }
    let (negative, digits) = match cleaned.as_bytes().first() {
        Some(b'-') => (true, &cleaned[1..]),
        Some(b'+') => (false, &cleaned[1..]),
        _ => (false, cleaned.as_str()),
    };
    let lower = digits.to_ascii_lowercase();
    let radix = if lower.starts_with("0x") {
        Some(16)
    } else if lower.starts_with("0o") {
        Some(8)
    } else if lower.starts_with("0b") {
        Some(2)
    } else {
        None
    };
    if let Some(radix) = radix {
        return parse_int(&digits[2..], radix, negative, text);
    }
    if digits.contains(['.', 'e', 'E']) {
        return parse_float(&cleaned).map(Value::Float);
    }
    parse_int(digits, 10, negative, text)
}

fn parse_int(digits: &str, radix: u32, negative: bool, text: &str) -> Result<Value, String> {
    if digits.is_empty() {
        return Err(format!("invalid number literal {text:?}"));
    }
    let signed = if negative {
        format!("-{digits}")
    } else {
        digits.to_string()
    };
    if let Ok(small) = i64::from_str_radix(&signed, radix) {
        return Ok(Value::Int(small));
    }
    BigInt::parse_bytes(signed.as_bytes(), radix)
        .map(Value::BigInt)
        .ok_or_else(|| format!("invalid number literal {text:?}"))
}

/// Parses a float literal; a trailing `.` (as in `1.`) is accepted.
pub(crate) fn parse_float(text: &str) -> Result<f64, String> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let normalized = if cleaned.ends_with('.') {
        format!("{cleaned}0")
    } else {
        cleaned
    };
    normalized
        .parse::<f64>()
        .map_err(|_| format!("invalid number literal {text:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_strings() {
        assert_eq!(decode_string("'abc'"), Ok(Value::from("abc")));
        assert_eq!(decode_string("\"a'b\""), Ok(Value::from("a'b")));
        assert_eq!(decode_string("''"), Ok(Value::from("")));
        assert_eq!(decode_string("'''a\nb'''"), Ok(Value::from("a\nb")));
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(
            decode_string(r"'tab\there\nnl \x41é\U0001F600 \101 \\ \q'"),
            Ok(Value::from("tab\there\nnl Aé😀 A \\ \\q"))
        );
        assert_eq!(decode_string("'a\\\nb'"), Ok(Value::from("ab")));
        assert!(decode_string(r"'\x4'").is_err());
    }

    #[test]
    fn test_decode_raw_and_bytes() {
        assert_eq!(decode_string(r"r'\d+\.\d'"), Ok(Value::from(r"\d+\.\d")));
        assert_eq!(
            decode_string(r"b'a\x00\xff'"),
            Ok(Value::Bytes(vec![b'a', 0, 0xff]))
        );
        assert_eq!(decode_string(r"rb'\x'"), Ok(Value::Bytes(b"\\x".to_vec())));
        assert!(decode_string("b'é'").is_err());
    }

    #[test]
    fn test_decode_numbers() {
        assert_eq!(decode_number("42"), Ok(Value::Int(42)));
        assert_eq!(decode_number("-7"), Ok(Value::Int(-7)));
        assert_eq!(decode_number("1_000"), Ok(Value::Int(1000)));
        assert_eq!(decode_number("0x1F"), Ok(Value::Int(31)));
        assert_eq!(decode_number("-0b101"), Ok(Value::Int(-5)));
        assert_eq!(decode_number("1.5"), Ok(Value::Float(1.5)));
        assert_eq!(decode_number("1e3"), Ok(Value::Float(1000.0)));
        assert_eq!(decode_number("1."), Ok(Value::Float(1.0)));
        assert_eq!(
            decode_number("4j"),
            Ok(Value::Complex(Complex::new(0.0, 4.0)))
        );
        assert_eq!(
            decode_number("-9223372036854775808"),
            Ok(Value::Int(i64::MIN))
        );
    }

    #[test]
    fn test_big_integers_fall_back() {
        let value = decode_number("82932652004413992431").unwrap();
        let expected: BigInt = "82932652004413992431".parse().unwrap();
        assert_eq!(value, Value::BigInt(expected));
    }
}
