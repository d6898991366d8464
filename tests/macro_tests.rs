use serde_ison::{ison, parse_str, to_string, Map, Set, Value};

#[test]
fn test_ison_macro_null() {
    let value = ison!(null);
    assert_eq!(value, Value::Null);
}

#[test]
fn test_ison_macro_booleans() {
    assert_eq!(ison!(true), Value::Bool(true));
    assert_eq!(ison!(false), Value::Bool(false));
}

#[test]
fn test_ison_macro_numbers() {
    assert_eq!(ison!(42), Value::Int(42));
    assert_eq!(ison!(3.5), Value::Float(3.5));
    assert_eq!(ison!(-123), Value::Int(-123));
    assert_eq!(ison!(u64::MAX), Value::from(u64::MAX));
}

#[test]
fn test_ison_macro_strings() {
    assert_eq!(ison!("hello world"), Value::String("hello world".to_string()));
    assert_eq!(ison!(""), Value::String(String::new()));
}

#[test]
fn test_ison_macro_sequences() {
    assert_eq!(ison!([]), Value::Sequence(vec![]));

    assert_eq!(
        ison!([1, 2, 3]),
        Value::Sequence(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );

    assert_eq!(
        ison!([1, "hello", true, null]),
        Value::Sequence(vec![
            Value::Int(1),
            Value::from("hello"),
            Value::Bool(true),
            Value::Null,
        ])
    );
}

#[test]
fn test_ison_macro_tuples_and_sets() {
    let tuple = ison!((1, "x", [true]));
    assert_eq!(tuple, parse_str("(1, x, [true])").unwrap());
    assert_eq!(ison!(()), parse_str("()").unwrap());

    assert_eq!(ison!({"a", "b", "a"}), parse_str("{a, b}").unwrap());
    assert_eq!(ison!({,}), Value::Set(Set::new()));
    assert_eq!(ison!({,}), parse_str("{,}").unwrap());
}

#[test]
fn test_ison_macro_mappings() {
    assert_eq!(ison!({}), Value::Mapping(Map::new()));

    let person = ison!({
        "name": "Alice",
        "age": 30
    });
    let Value::Mapping(ref fields) = person else {
        panic!("expected a mapping, got {person:?}");
    };
    assert_eq!(fields.len(), 2);
    assert_eq!(fields.get("name"), Some(&Value::from("Alice")));
    assert_eq!(fields.get("age"), Some(&Value::Int(30)));
    assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["name", "age"]);
}

#[test]
fn test_ison_macro_nested() {
    let config = ison!({
        "service": {
            "name": "api",
            "ports": [80, 443]
        },
        "replicas": 3,
        "labels": []
    });

    assert_eq!(
        config.get("service").and_then(|s| s.get("ports")),
        Some(&Value::Sequence(vec![Value::Int(80), Value::Int(443)]))
    );
    assert_eq!(config.get("labels"), Some(&Value::Sequence(vec![])));
    assert_eq!(
        to_string(&config).unwrap(),
        "{service: {name: api, ports: [80, 443]}, replicas: 3, labels: []}"
    );
}

#[test]
fn test_ison_macro_expressions() {
    let name = "worker";
    let count = 4usize;
    let value = ison!({
        "name": name,
        "count": count
    });
    assert_eq!(value.get("name"), Some(&Value::from("worker")));
    assert_eq!(value.get("count"), Some(&Value::Int(4)));

    let bytes = ison!(owned_bytes(b"ab"));
    assert_eq!(bytes, Value::Sequence(vec![Value::Int(97), Value::Int(98)]));
}

fn owned_bytes(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}
