/// Builds a [`Value`](crate::Value) from JSON-like literal syntax.
///
/// The arms follow ISON's literal forms: `null`, `true` and `false` map to
/// their constants, `[...]` to a sequence, `(...)` to a tuple, `{"key": value}`
/// to a mapping and `{a, b}` to a set, with `{,}` the empty set. Repeated set
/// elements collapse. Anything else is an expression converted with
/// [`to_value`](crate::to_value), falling back to `Null` if it cannot be
/// represented.
///
/// ```rust
/// use serde_ison::{ison, Value};
///
/// let value = ison!({
///     "name": "svc",
///     "ports": [80, 443],
///     "debug": false
/// });
/// assert_eq!(value.get("ports").and_then(Value::as_slice).map(<[Value]>::len), Some(2));
/// ```
#[macro_export]
macro_rules! ison {
    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Sequence(vec![])
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Sequence(vec![$($crate::ison!($elem)),*])
    };

    (()) => {
        $crate::Value::Tuple(vec![])
    };

    (( $($elem:tt),+ $(,)? )) => {
        $crate::Value::Tuple(vec![$($crate::ison!($elem)),+])
    };

    ({}) => {
        $crate::Value::Mapping($crate::Map::new())
    };

    ({,}) => {
        $crate::Value::Set($crate::Set::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut mapping = $crate::Map::new();
        $(
            mapping.insert($key.to_string(), $crate::ison!($value));
        )*
        $crate::Value::Mapping(mapping)
    }};

    ({ $($elem:tt),+ $(,)? }) => {
        $crate::Value::Set(vec![$($crate::ison!($elem)),+].into_iter().collect::<$crate::Set>())
    };

    ($other:expr) => {
        $crate::to_value(&$other).unwrap_or($crate::Value::Null)
    };
}
