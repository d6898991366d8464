//! Serde deserialization from [`Value`].
//!
//! Documents are parsed into a [`Value`] first; [`ValueDeserializer`] then
//! drives the target type's visitor from that tree. Enums accept the
//! externally tagged forms the serializer produces: a bare string for unit
//! variants and a single-entry mapping for the rest.
//!
//! ```rust
//! use serde::Deserialize;
//! use serde_ison::{from_value, parse_str};
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Server { host: String, ports: Vec<u16> }
//!
//! let value = parse_str("host: localhost\nports:\n    - 80\n    - 443\n").unwrap();
//! let server: Server = from_value(value).unwrap();
//! assert_eq!(server.ports, vec![80, 443]);
//! ```

use crate::{Error, Map, Result, Value};
use serde::de::{self, DeserializeOwned, IntoDeserializer};
use serde::forward_to_deserialize_any;

/// Builds a `T` from a [`Value`].
///
/// # Errors
///
/// Fails when the value's shape does not match what `T` expects.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(ValueDeserializer::new(value))
}

/// A deserializer reading from an owned [`Value`].
pub struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    #[must_use]
    pub fn new(value: Value) -> Self {
        ValueDeserializer { value }
    }
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = ValueDeserializer;

    fn into_deserializer(self) -> ValueDeserializer {
        ValueDeserializer::new(self)
    }
}

/// Strips the constructed wrapper; its content is what gets deserialized.
fn unwrap_constructed(value: Value) -> Value {
    match value {
        Value::Constructed(c) => unwrap_constructed(c.value().clone()),
        other => other,
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match unwrap_constructed(self.value) {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int(i) => visitor.visit_i64(i),
            Value::BigInt(n) => {
                if let Ok(u) = u64::try_from(&n) {
                    visitor.visit_u64(u)
                } else if let Ok(i) = i64::try_from(&n) {
                    visitor.visit_i64(i)
                } else if let Ok(i) = i128::try_from(&n) {
                    visitor.visit_i128(i)
                } else if let Ok(u) = u128::try_from(&n) {
                    visitor.visit_u128(u)
                } else {
                    visitor.visit_string(n.to_string())
                }
            }
            Value::Float(f) => visitor.visit_f64(f),
            Value::Complex(c) => visitor.visit_seq(SeqDeserializer::new(vec![
                Value::Float(c.re),
                Value::Float(c.im),
            ])),
            Value::String(s) => visitor.visit_string(s),
            Value::Bytes(b) => visitor.visit_byte_buf(b),
            Value::Mapping(map) => visitor.visit_map(MapDeserializer::new(map)),
            Value::Sequence(items) | Value::Tuple(items) => {
                visitor.visit_seq(SeqDeserializer::new(items))
            }
            Value::Set(set) => visitor.visit_seq(SeqDeserializer::new(set.into_iter().collect())),
            Value::Constructed(_) => Err(Error::custom("unresolved constructed value")),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_none(),
            value => visitor.visit_some(ValueDeserializer::new(value)),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match unwrap_constructed(self.value) {
            Value::String(variant) => visitor.visit_enum(EnumDeserializer {
                variant,
                value: None,
            }),
            Value::Mapping(map) if map.len() == 1 => {
                let mut entries = map.into_iter();
                match entries.next() {
                    Some((variant, value)) => visitor.visit_enum(EnumDeserializer {
                        variant,
                        value: Some(value),
                    }),
                    None => Err(Error::custom("expected an enum variant")),
                }
            }
            other => Err(Error::custom(format!(
                "expected a variant name or a single-entry mapping, found {}",
                other.kind_name()
            ))),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct MapDeserializer {
    iter: indexmap::map::IntoIter<String, Value>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(map: Map) -> Self {
        MapDeserializer {
            iter: map.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(MapKeyDeserializer { key }).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

/// Keys are always strings in a document; numeric and bool key types parse
/// them back.
struct MapKeyDeserializer {
    key: String,
}

macro_rules! deserialize_parsed_key {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                match self.key.parse::<$ty>() {
                    Ok(parsed) => visitor.$visit(parsed),
                    Err(_) => visitor.visit_string(self.key),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for MapKeyDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_string(self.key)
    }

    deserialize_parsed_key! {
        deserialize_bool => visit_bool: bool,
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_enum(EnumDeserializer {
            variant: self.key,
            value: None,
        })
    }

    forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf option unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

struct EnumDeserializer {
    variant: String,
    value: Option<Value>,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(IntoDeserializer::<'de, Error>::into_deserializer(
            self.variant,
        ))?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Option<Value>,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            Some(Value::Null) | None => Ok(()),
            Some(other) => Err(Error::custom(format!(
                "expected a unit variant, found {}",
                other.kind_name()
            ))),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("expected a newtype variant")),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value.map(unwrap_constructed) {
            Some(Value::Sequence(items) | Value::Tuple(items)) => {
                visitor.visit_seq(SeqDeserializer::new(items))
            }
            _ => Err(Error::custom("expected a tuple variant")),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value.map(unwrap_constructed) {
            Some(Value::Mapping(map)) => visitor.visit_map(MapDeserializer::new(map)),
            _ => Err(Error::custom("expected a struct variant")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{to_value, Complex, Constructed};
    use serde::{Deserialize, Serialize};
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Arc;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Event {
        Start,
        Move(i32, i32),
        Rename(String),
        Resize { w: u8 },
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Config {
        name: String,
        retries: Option<u32>,
        ratio: f64,
        tags: HashSet<String>,
    }

    #[test]
    fn test_struct_from_mapping() {
        let mut map = Map::new();
        map.insert("name".into(), Value::from("svc"));
        map.insert("retries".into(), Value::Null);
        map.insert("ratio".into(), Value::from(0.5));
        map.insert(
            "tags".into(),
            Value::Set(vec![Value::from("a"), Value::from("b")].into_iter().collect()),
        );
        let config: Config = from_value(Value::Mapping(map)).unwrap();
        assert_eq!(config.name, "svc");
        assert_eq!(config.retries, None);
        assert_eq!(config.tags.len(), 2);
    }

    #[test]
    fn test_enum_round_trip() {
        for event in [
            Event::Start,
            Event::Move(1, -1),
            Event::Rename("x".into()),
            Event::Resize { w: 9 },
        ] {
            let value = to_value(&event).unwrap();
            assert_eq!(from_value::<Event>(value).unwrap(), event);
        }
    }

    #[test]
    fn test_numeric_keys() {
        let mut map = Map::new();
        map.insert("1".into(), Value::from("one"));
        map.insert("2".into(), Value::from("two"));
        let parsed: BTreeMap<u8, String> = from_value(Value::Mapping(map)).unwrap();
        assert_eq!(parsed.get(&2).map(String::as_str), Some("two"));
    }

    #[test]
    fn test_special_values() {
        let pair: (f64, f64) = from_value(Value::Complex(Complex::new(1.0, 2.0))).unwrap();
        assert_eq!(pair, (1.0, 2.0));

        let shared = Constructed::new("list", Arc::new(Value::Sequence(vec![Value::from(3)])));
        let items: Vec<i64> = from_value(Value::Constructed(shared)).unwrap();
        assert_eq!(items, vec![3]);

        let big: u128 = from_value(Value::from(num_bigint::BigInt::from(u128::MAX))).unwrap();
        assert_eq!(big, u128::MAX);
    }

    #[test]
    fn test_wide_unsigned_integers() {
        let top = i64::MAX as u64 + 1;
        let value = to_value(&top).unwrap();
        assert!(matches!(value, Value::BigInt(_)));
        assert_eq!(from_value::<u64>(value).unwrap(), top);
        assert_eq!(from_value::<u64>(Value::from(u64::MAX)).unwrap(), u64::MAX);
        assert_eq!(from_value::<i128>(Value::from(u64::MAX)).unwrap(), i128::from(u64::MAX));
        let below = num_bigint::BigInt::from(i64::MIN) - 1;
        assert_eq!(from_value::<i128>(Value::BigInt(below)).unwrap(), i128::from(i64::MIN) - 1);
    }

    #[test]
    fn test_type_mismatch() {
        assert!(from_value::<u32>(Value::from("x")).is_err());
        assert!(from_value::<Event>(Value::from(1)).is_err());
    }
}
