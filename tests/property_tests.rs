//! Property-based tests for the round-trip guarantees of the writer and parser.
//!
//! Values are drawn from the canonical subset (null, booleans, integers,
//! finite floats, strings, bytes, mappings and sequences), which the writer
//! must reproduce exactly in every layout.

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_ison::{from_str, parse_str, to_string, write_to_string, Map, Value, WriteOptions};

fn roundtrip<T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug>(
    value: &T,
) -> bool {
    match to_string(value) {
        Ok(serialized) => match from_str::<T>(&serialized) {
            Ok(deserialized) => *value == deserialized,
            Err(e) => {
                eprintln!("Deserialize failed: {}", e);
                eprintln!("Serialized was: {}", serialized);
                false
            }
        },
        Err(e) => {
            eprintln!("Serialize failed: {}", e);
            false
        }
    }
}

fn layouts() -> Vec<WriteOptions> {
    vec![
        WriteOptions::new(),
        WriteOptions::new().with_indent(0),
        WriteOptions::pretty(),
        WriteOptions::pretty().with_indent(2).with_short_list_width(30),
    ]
}

fn text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z_][a-z0-9_.-]{0,8}",
        "[ -~]{0,16}",
        "[a-z \\n\\t'\"\\\\]{0,24}",
        any::<String>(),
    ]
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>()
            .prop_filter("finite floats only", |f| f.is_finite())
            .prop_map(Value::Float),
        text().prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..12).prop_map(Value::Bytes),
    ]
}

fn canonical_value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Sequence),
            prop::collection::btree_map(text(), inner, 0..6)
                .prop_map(|entries| Value::Mapping(entries.into_iter().collect::<Map>())),
        ]
    })
}

proptest! {
    #[test]
    fn prop_canonical_values_roundtrip(value in canonical_value()) {
        for options in layouts() {
            let written = write_to_string(&value, &options).unwrap();
            let parsed = parse_str(&written);
            prop_assert!(parsed.is_ok(), "failed to read back {:?}: {:?}", written, parsed);
            prop_assert_eq!(parsed.unwrap(), value.clone(), "written as {:?}", written);
        }
    }

    #[test]
    fn prop_documents_roundtrip(
        entries in prop::collection::btree_map("[a-z][a-z0-9_]{0,6}", canonical_value(), 1..6)
    ) {
        let value = Value::Mapping(entries.into_iter().collect());
        let written = write_to_string(&value, &WriteOptions::pretty()).unwrap();
        prop_assert_eq!(parse_str(&written).unwrap(), value, "written as {:?}", written);
    }

    #[test]
    fn prop_sorted_keys_are_ordered(keys in prop::collection::btree_set("[a-z]{1,5}", 1..8)) {
        let value: Value = Value::Mapping(
            keys.iter().rev().map(|k| (k.clone(), Value::Null)).collect(),
        );
        let options = WriteOptions::pretty().with_sort_keys(true);
        let written = write_to_string(&value, &options).unwrap();
        let Value::Mapping(parsed) = parse_str(&written).unwrap() else {
            panic!("expected a mapping from {written:?}");
        };
        let order: Vec<&String> = parsed.keys().collect();
        let expected: Vec<&String> = keys.iter().collect();
        prop_assert_eq!(order, expected);
    }

    #[test]
    fn prop_i32(n in any::<i32>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_i64(n in any::<i64>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_u64(n in any::<u64>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_bool(b in any::<bool>()) {
        prop_assert!(roundtrip(&b));
    }

    #[test]
    fn prop_string(s in text()) {
        prop_assert!(roundtrip(&s));
    }

    #[test]
    fn prop_vec_i32(v in prop::collection::vec(any::<i32>(), 0..20)) {
        prop_assert!(roundtrip(&v));
    }

    #[test]
    fn prop_option_i32(opt in proptest::option::of(any::<i32>())) {
        prop_assert!(roundtrip(&opt));
    }

    #[test]
    fn prop_tuple_i32_bool(t in (any::<i32>(), any::<bool>())) {
        prop_assert!(roundtrip(&t));
    }

    #[test]
    fn prop_string_map(m in prop::collection::btree_map(text(), any::<i16>(), 0..8)) {
        prop_assert!(roundtrip(&m));
    }
}
