//! Dynamic value representation for ISON data.
//!
//! This module provides the [`Value`] enum, the tree every parsed document
//! becomes and the writer consumes.
//!
//! ## Core Types
//!
//! - [`Value`]: null, bool, integers, floats, complex numbers, strings, bytes,
//!   mappings, sequences, tuples, sets and constructed values
//! - [`Complex`]: a pair of `f64` components
//! - [`Constructed`]: the shared result of a registered constructor
//!
//! ## Usage Patterns
//!
//! ```rust
//! use serde_ison::{parse_str, Value};
//!
//! let value = parse_str("list1: [1, 2, 3]\nflag1: @list1.1\n").unwrap();
//! assert_eq!(value.get("flag1"), Some(&Value::from(2)));
//! assert!(value.get("list1").map_or(false, Value::is_sequence));
//! ```
//!
//! Values form an owned tree. [`Value::deep_copy`] is what references use: it
//! also duplicates [`Constructed`] instances, which a plain `clone` shares.

use crate::{Map, Set};
use num_bigint::BigInt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// A dynamically-typed ISON value.
///
/// # Examples
///
/// ```rust
/// use serde_ison::Value;
///
/// let null = Value::Null;
/// let num = Value::Int(42);
/// let text = Value::String("hello".to_string());
///
/// assert!(null.is_null());
/// assert!(num.is_int());
/// assert!(text.is_string());
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    /// An integer that fits in 64 bits.
    Int(i64),
    /// An integer outside the 64-bit range. Never holds a value that fits `Int`.
    BigInt(BigInt),
    Float(f64),
    Complex(Complex),
    String(String),
    Bytes(Vec<u8>),
    Mapping(Map),
    Sequence(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Set),
    Constructed(Constructed),
}

/// A complex number with `f64` components.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    #[must_use]
    pub const fn new(re: f64, im: f64) -> Self {
        Complex { re, im }
    }
}

/// Newtype name under which [`Complex`] serializes, so that
/// [`ValueSerializer`](crate::ValueSerializer) can rebuild it. Other
/// serializers see a plain `(re, im)` pair.
pub(crate) const COMPLEX_TOKEN: &str = "$serde_ison::private::Complex";

impl Serialize for Complex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(COMPLEX_TOKEN, &(self.re, self.im))
    }
}

/// A value produced by a registered constructor and shared by identity.
///
/// Cloning shares the instance; [`Value::deep_copy`] does not. The writer
/// tracks instances by identity and renders a repeated instance as `...`.
#[derive(Clone, Debug)]
pub struct Constructed {
    name: String,
    value: Arc<Value>,
}

impl Constructed {
    pub fn new(name: impl Into<String>, value: Arc<Value>) -> Self {
        Constructed {
            name: name.into(),
            value,
        }
    }

    /// The constructor name this instance was produced by.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Address of the shared instance, stable for the lifetime of the value.
    #[must_use]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.value) as usize
    }

    /// Returns `true` if both handles share one instance.
    #[must_use]
    pub fn same_instance(&self, other: &Constructed) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl PartialEq for Constructed {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

impl Value {
    /// Returns `true` if the value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` if the value is a boolean.
    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Returns `true` for both integer representations.
    #[inline]
    #[must_use]
    pub const fn is_int(&self) -> bool {
        matches!(self, Value::Int(_) | Value::BigInt(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_complex(&self) -> bool {
        matches!(self, Value::Complex(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_bytes(&self) -> bool {
        matches!(self, Value::Bytes(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_mapping(&self) -> bool {
        matches!(self, Value::Mapping(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_tuple(&self) -> bool {
        matches!(self, Value::Tuple(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_set(&self) -> bool {
        matches!(self, Value::Set(_))
    }

    /// If the value is a boolean, returns it. Otherwise returns `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_ison::Value;
    ///
    /// assert_eq!(Value::Bool(true).as_bool(), Some(true));
    /// assert_eq!(Value::from(42).as_bool(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// If the value is a string, returns a reference to it. Otherwise returns `None`.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// If the value is a 64-bit integer, returns it.
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as `f64` for floats and integers.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::BigInt(b) => b.to_string().parse().ok(),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// If the value is a mapping, returns a reference to it.
    #[inline]
    #[must_use]
    pub fn as_mapping(&self) -> Option<&Map> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the elements of a sequence or tuple.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_set(&self) -> Option<&Set> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    /// Looks up `key` if the value is a mapping.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Deep copies of the elements a `*name` spread splices: items of
    /// sequences, tuples and sets, keys of mappings, characters of strings and
    /// octets of bytes. Returns `None` for values that are not iterable.
    ///
    /// ```rust
    /// use serde_ison::Value;
    ///
    /// assert_eq!(
    ///     Value::from("ab").elements(),
    ///     Some(vec![Value::from("a"), Value::from("b")])
    /// );
    /// assert_eq!(Value::from(1).elements(), None);
    /// ```
    #[must_use]
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::Sequence(items) | Value::Tuple(items) => {
                Some(items.iter().map(Value::deep_copy).collect())
            }
            Value::Set(set) => Some(set.iter().map(Value::deep_copy).collect()),
            Value::Mapping(map) => Some(map.keys().map(|k| Value::String(k.clone())).collect()),
            Value::String(s) => Some(s.chars().map(|c| Value::String(c.to_string())).collect()),
            Value::Bytes(b) => Some(b.iter().map(|&octet| Value::from(octet)).collect()),
            Value::Constructed(c) => c.value().elements(),
            _ => None,
        }
    }

    /// A short name of the value's kind, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::BigInt(_) => "int",
            Value::Float(_) => "float",
            Value::Complex(_) => "complex",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Mapping(_) => "mapping",
            Value::Sequence(_) => "sequence",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Constructed(c) => c.value().kind_name(),
        }
    }

    /// Copies the whole tree, including fresh instances of constructed values.
    ///
    /// ```rust
    /// use serde_ison::{Constructed, Value};
    /// use std::sync::Arc;
    ///
    /// let shared = Constructed::new("point", Arc::new(Value::from(1)));
    /// let value = Value::Constructed(shared);
    /// let (Value::Constructed(a), Value::Constructed(b)) = (value.clone(), value.deep_copy()) else {
    ///     unreachable!()
    /// };
    /// let Value::Constructed(original) = &value else { unreachable!() };
    /// assert!(a.same_instance(original));
    /// assert!(!b.same_instance(original));
    /// ```
    #[must_use]
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Mapping(map) => Value::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.deep_copy()))
                    .collect(),
            ),
            Value::Sequence(items) => Value::Sequence(items.iter().map(Value::deep_copy).collect()),
            Value::Tuple(items) => Value::Tuple(items.iter().map(Value::deep_copy).collect()),
            Value::Set(set) => Value::Set(set.iter().map(Value::deep_copy).collect()),
            Value::Constructed(c) => Value::Constructed(Constructed::new(
                c.name(),
                Arc::new(c.value().deep_copy()),
            )),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Value {
    /// Formats the value as compact ISON text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::writer::write(self, f, &crate::WriteOptions::default()).map_err(|_| fmt::Error)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::{SerializeMap, SerializeSeq};
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::BigInt(b) => match i128::try_from(b) {
                Ok(i) => serializer.serialize_i128(i),
                Err(_) => serializer.collect_str(b),
            },
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Complex(c) => c.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Sequence(items) | Value::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for element in items {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Value::Set(set) => {
                let mut seq = serializer.serialize_seq(Some(set.len()))?;
                for element in set {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Value::Constructed(c) => c.value().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any valid ISON value")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
                Ok(Value::Int(value))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Value::from(BigInt::from(value)))
            }

            fn visit_i128<E>(self, value: i128) -> Result<Self::Value, E> {
                Ok(Value::from(BigInt::from(value)))
            }

            fn visit_u128<E>(self, value: u128) -> Result<Self::Value, E> {
                Ok(Value::from(BigInt::from(value)))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
                Ok(Value::Float(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
                Ok(Value::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
                Ok(Value::String(value))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E> {
                Ok(Value::Bytes(value.to_vec()))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> Result<Self::Value, E> {
                Ok(Value::Bytes(value))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::Sequence(vec))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut values = Map::new();
                while let Some((key, value)) = map.next_entry()? {
                    values.insert(key, value);
                }
                Ok(Value::Mapping(values))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl TryFrom<Value> for i64 {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Int(i) => Ok(i),
            Value::Float(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                Ok(f as i64)
            }
            _ => Err(crate::Error::custom(format!(
                "expected integer, found {}",
                value.kind_name()
            ))),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        value.as_f64().ok_or_else(|| {
            crate::Error::custom(format!("expected number, found {}", value.kind_name()))
        })
    }
}

impl TryFrom<Value> for bool {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            _ => Err(crate::Error::custom(format!(
                "expected boolean, found {}",
                value.kind_name()
            ))),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            _ => Err(crate::Error::custom(format!(
                "expected string, found {}",
                value.kind_name()
            ))),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_small_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Int(i64::from(n))
                }
            }
        )*
    };
}

from_small_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::from(BigInt::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::from(BigInt::from(n))
    }
}

/// Narrows to [`Value::Int`] when the integer fits in 64 bits.
impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        match i64::try_from(&n) {
            Ok(small) => Value::Int(small),
            Err(_) => Value::BigInt(n),
        }
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f64::from(f))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Complex> for Value {
    fn from(c: Complex) -> Self {
        Value::Complex(c)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(vec: Vec<Value>) -> Self {
        Value::Sequence(vec)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Mapping(map)
    }
}

impl From<Set> for Value {
    fn from(set: Set) -> Self {
        Value::Set(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    #[test]
    fn test_tryfrom_i64() {
        assert_eq!(i64::try_from(Value::Int(42)).unwrap(), 42);
        assert_eq!(i64::try_from(Value::Float(42.0)).unwrap(), 42);
        assert!(i64::try_from(Value::from("test")).is_err());
    }

    #[test]
    fn test_tryfrom_f64_and_bool() {
        assert_eq!(f64::try_from(Value::Int(2)).unwrap(), 2.0);
        assert_eq!(f64::try_from(Value::Float(f64::INFINITY)).unwrap(), f64::INFINITY);
        assert!(bool::try_from(Value::Bool(true)).unwrap());
        assert!(bool::try_from(Value::Int(1)).is_err());
        assert!(String::try_from(Value::Int(1)).is_err());
    }

    #[test]
    fn test_bigint_narrowing() {
        assert_eq!(Value::from(BigInt::from(5)), Value::Int(5));
        assert_eq!(Value::from(u64::MAX).kind_name(), "int");
        assert!(matches!(Value::from(u64::MAX), Value::BigInt(_)));
    }

    #[test]
    fn test_deep_copy_is_structural() {
        let mut map = Map::new();
        map.insert("k".to_string(), Value::Sequence(vec![Value::from(1)]));
        let original = Value::Mapping(map);
        let mut copy = original.deep_copy();
        if let Value::Mapping(m) = &mut copy {
            if let Some(Value::Sequence(items)) = m.get_mut("k") {
                items.push(Value::from(2));
            }
        }
        assert_eq!(
            original.get("k"),
            Some(&Value::Sequence(vec![Value::from(1)]))
        );
        assert_ne!(original, copy);
    }

    #[test]
    fn test_constructed_identity() {
        let inner = Arc::new(Value::from("x"));
        let a = Constructed::new("str", Arc::clone(&inner));
        let b = Constructed::new("str", Arc::new(Value::from("x")));
        assert_eq!(a, b);
        assert!(!a.same_instance(&b));
        assert!(a.same_instance(&a.clone()));
    }

    #[test]
    fn test_kind_checks() {
        assert!(Value::Null.is_null());
        assert!(Value::BigInt(BigInt::from(1) << 70).is_int());
        assert!(Value::Complex(Complex::new(1.0, 2.0)).is_complex());
        assert!(Value::Tuple(vec![]).is_tuple());
        assert!(Value::Set(Set::new()).is_set());
        assert_eq!(Value::Tuple(vec![Value::Null]).as_slice().map(<[Value]>::len), Some(1));
    }

    #[test]
    fn test_serialize_matches_json() {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::from("svc"));
        map.insert("ports".to_string(), Value::Sequence(vec![Value::from(80), Value::from(1.5)]));
        map.insert("z".to_string(), Value::Complex(Complex::new(3.0, -4.0)));
        map.insert("raw".to_string(), Value::Bytes(vec![1, 2]));
        map.insert("tags".to_string(), Value::Set(vec![Value::from("a")].into_iter().collect()));
        map.insert("none".to_string(), Value::Null);
        assert_eq!(
            serde_json::to_string(&Value::Mapping(map)).unwrap(),
            r#"{"name":"svc","ports":[80,1.5],"z":[3.0,-4.0],"raw":[1,2],"tags":["a"],"none":null}"#
        );
    }

    #[test]
    fn test_deserialize_from_json() {
        let value: Value = serde_json::from_str(r#"{"a": [1, 2.5, null, true], "b": "x"}"#).unwrap();
        assert_eq!(
            value.get("a"),
            Some(&Value::Sequence(vec![
                Value::from(1),
                Value::from(2.5),
                Value::Null,
                Value::Bool(true),
            ]))
        );
        assert_eq!(value.get("b"), Some(&Value::from("x")));
    }

    #[test]
    fn test_display_is_compact_notation() {
        let value = Value::Sequence(vec![Value::from(1), Value::from("a b"), Value::Null]);
        assert_eq!(value.to_string(), "[1, 'a b', null]");
    }
}
