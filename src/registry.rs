//! Named constructors available to documents.
//!
//! A document can build values through calls such as `range(3)` or
//! `Point(x=1, y=2)`, and through typed section blocks. Every name must be
//! registered by the host in a [`ConstructorRegistry`] before parsing; the
//! parser never loads anything on its own. `import` and `from ... import`
//! lines at the top of a document only bind aliases to registered names.
//!
//! ```rust
//! use serde_ison::{parse_str_with_options, ConstructorRegistry, ParseOptions, Produced, Value};
//!
//! let mut registry = ConstructorRegistry::with_builtins();
//! registry.register("geo.Point", |args, kwargs| {
//!     let mut point = kwargs;
//!     if let Some(x) = args.into_iter().next() {
//!         point.insert("x".to_string(), x);
//!     }
//!     Ok(Produced::Value(Value::Mapping(point)))
//! });
//!
//! let options = ParseOptions::new().with_registry(registry);
//! let doc = "from geo import Point\norigin: Point(0, y=0)\n";
//! let value = parse_str_with_options(doc, "<doc>", &options).unwrap();
//! assert_eq!(value.get("origin").and_then(|p| p.get("y")), Some(&Value::from(0)));
//! ```

use crate::error::FactoryError;
use crate::value::{Complex, Constructed, Value};
use crate::{Map, Set};
use indexmap::IndexMap;
use num_bigint::BigInt;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a constructor hands back to the parser.
pub enum Produced {
    /// A plain value, embedded as is.
    Value(Value),
    /// An instance embedded as [`Value::Constructed`], shared by identity.
    Shared(Arc<Value>),
    /// A lazy sequence, drained into a [`Value::Sequence`] immediately.
    Lazy(Box<dyn Iterator<Item = Value>>),
}

impl From<Value> for Produced {
    fn from(value: Value) -> Self {
        Produced::Value(value)
    }
}

/// A registered constructor: positional arguments and keyword arguments in,
/// a value out.
pub type Factory = Arc<dyn Fn(Vec<Value>, Map) -> Result<Produced, FactoryError> + Send + Sync>;

/// Mapping from constructor names to factories.
#[derive(Clone, Default)]
pub struct ConstructorRegistry {
    factories: IndexMap<String, Factory>,
}

impl fmt::Debug for ConstructorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl ConstructorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in constructors: `set`,
    /// `frozenset`, `tuple`, `list`, `dict`, `str`, `int`, `float`,
    /// `complex`, `bytes`, `chr`, `ord`, `sorted`, `reversed` and `range`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("set", builtin_set)
            .register("frozenset", builtin_set)
            .register("tuple", |args, kwargs| {
                Ok(Value::Tuple(optional_iterable("tuple", args, &kwargs)?).into())
            })
            .register("list", |args, kwargs| {
                Ok(Value::Sequence(optional_iterable("list", args, &kwargs)?).into())
            })
            .register("dict", builtin_dict)
            .register("str", builtin_str)
            .register("int", builtin_int)
            .register("float", builtin_float)
            .register("complex", builtin_complex)
            .register("bytes", builtin_bytes)
            .register("chr", builtin_chr)
            .register("ord", builtin_ord)
            .register("sorted", builtin_sorted)
            .register("reversed", builtin_reversed)
            .register("range", builtin_range);
        registry
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    /// Dotted names (`geo.Point`) are reachable through import directives.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(Vec<Value>, Map) -> Result<Produced, FactoryError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Looks up a factory by its registered name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Factory> {
        self.factories.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Returns `true` if some registered name lives under the dotted `module`.
    #[must_use]
    pub fn has_module(&self, module: &str) -> bool {
        self.factories
            .keys()
            .any(|name| name.len() > module.len() && name.starts_with(module) && name[module.len()..].starts_with('.'))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

/// Runs a factory and normalizes its result into a plain tree value.
pub(crate) fn invoke(
    name: &str,
    factory: &Factory,
    args: Vec<Value>,
    kwargs: Map,
) -> Result<Value, FactoryError> {
    Ok(match factory(args, kwargs)? {
        Produced::Value(value) => value,
        Produced::Shared(instance) => Value::Constructed(Constructed::new(name, instance)),
        Produced::Lazy(iter) => Value::Sequence(iter.collect()),
    })
}

/// Aliases bound by a document's import directives.
#[derive(Debug, Default)]
pub(crate) struct ImportScope {
    names: HashMap<String, String>,
    modules: HashMap<String, String>,
}

impl ImportScope {
    pub(crate) fn is_bound(&self, alias: &str) -> bool {
        self.names.contains_key(alias) || self.modules.contains_key(alias)
    }

    pub(crate) fn bind_name(&mut self, alias: String, qualified: String) {
        self.names.insert(alias, qualified);
    }

    pub(crate) fn bind_module(&mut self, alias: String, module: String) {
        self.modules.insert(alias, module);
    }

    /// Maps a name written in the document to a registry name: imported
    /// names first, then the longest imported module prefix, then the name
    /// itself.
    pub(crate) fn qualify(&self, name: &str) -> String {
        if let Some(qualified) = self.names.get(name) {
            return qualified.clone();
        }
        let mut end = name.len();
        while let Some(dot) = name[..end].rfind('.') {
            if let Some(module) = self.modules.get(&name[..dot]) {
                return format!("{module}{}", &name[dot..]);
            }
            end = dot;
        }
        name.to_string()
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), FactoryError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{min}")
        } else {
            format!("{min} to {max}")
        };
        return Err(format!("{name}() takes {expected} positional arguments but {} were given", args.len()).into());
    }
    Ok(())
}

fn no_keywords(name: &str, kwargs: &Map) -> Result<(), FactoryError> {
    match kwargs.keys().next() {
        Some(key) => Err(format!("{name}() got an unexpected keyword argument {key:?}").into()),
        None => Ok(()),
    }
}

fn iterable(name: &str, value: &Value) -> Result<Vec<Value>, FactoryError> {
    value
        .elements()
        .ok_or_else(|| format!("{name}() argument must be iterable, not {}", value.kind_name()).into())
}

fn optional_iterable(name: &str, args: Vec<Value>, kwargs: &Map) -> Result<Vec<Value>, FactoryError> {
    arity(name, &args, 0, 1)?;
    no_keywords(name, kwargs)?;
    match args.first() {
        Some(source) => iterable(name, source),
        None => Ok(Vec::new()),
    }
}

fn builtin_set(args: Vec<Value>, kwargs: Map) -> Result<Produced, FactoryError> {
    let items = optional_iterable("set", args, &kwargs)?;
    Ok(Value::Set(items.into_iter().collect::<Set>()).into())
}

fn builtin_dict(args: Vec<Value>, kwargs: Map) -> Result<Produced, FactoryError> {
    arity("dict", &args, 0, 1)?;
    let mut out = Map::new();
    match args.into_iter().next() {
        None => {}
        Some(Value::Mapping(map)) => out = map,
        Some(Value::Sequence(pairs)) | Some(Value::Tuple(pairs)) => {
            for pair in pairs {
                match pair.as_slice() {
                    Some([Value::String(key), value]) => {
                        out.insert(key.clone(), value.clone());
                    }
                    _ => return Err("dict() sequence elements must be [key, value] pairs with string keys".into()),
                }
            }
        }
        Some(other) => return Err(format!("dict() cannot convert {}", other.kind_name()).into()),
    }
    for (key, value) in kwargs {
        out.insert(key, value);
    }
    Ok(Value::Mapping(out).into())
}

fn builtin_str(args: Vec<Value>, kwargs: Map) -> Result<Produced, FactoryError> {
    arity("str", &args, 0, 1)?;
    no_keywords("str", &kwargs)?;
    let text = match args.into_iter().next() {
        None => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    };
    Ok(Value::String(text).into())
}

fn builtin_int(args: Vec<Value>, kwargs: Map) -> Result<Produced, FactoryError> {
    arity("int", &args, 0, 2)?;
    no_keywords("int", &kwargs)?;
    let mut args = args.into_iter();
    let value = match (args.next(), args.next()) {
        (None, _) => Value::Int(0),
        (Some(Value::String(text)), base) => {
            let radix = match base {
                None => 10,
                Some(Value::Int(b)) if (2..=36).contains(&b) => b as u32,
                Some(_) => return Err("int() base must be an integer between 2 and 36".into()),
            };
            let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
            BigInt::parse_bytes(cleaned.as_bytes(), radix)
                .map(Value::from)
                .ok_or_else(|| format!("invalid literal for int() with base {radix}: {text:?}"))?
        }
        (Some(_), Some(_)) => return Err("int() can't convert non-string with explicit base".into()),
        (Some(Value::Bool(b)), None) => Value::Int(i64::from(b)),
        (Some(v @ Value::Int(_)), None) | (Some(v @ Value::BigInt(_)), None) => v,
        (Some(Value::Float(f)), None) if f.is_finite() => {
            let truncated = format!("{:.0}", f.trunc());
            BigInt::parse_bytes(truncated.as_bytes(), 10)
                .map(Value::from)
                .ok_or("cannot convert float to integer")?
        }
        (Some(other), None) => return Err(format!("int() cannot convert {}", other.kind_name()).into()),
    };
    Ok(value.into())
}

fn builtin_float(args: Vec<Value>, kwargs: Map) -> Result<Produced, FactoryError> {
    arity("float", &args, 0, 1)?;
    no_keywords("float", &kwargs)?;
    let value = match args.first() {
        None => 0.0,
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            match trimmed.to_ascii_lowercase().trim_start_matches(['+', '-']) {
                "inf" | "infinity" | "nan" => trimmed.to_ascii_lowercase().parse::<f64>()?,
                _ => crate::literal::parse_float(trimmed)?,
            }
        }
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(other) => other
            .as_f64()
            .ok_or_else(|| format!("float() cannot convert {}", other.kind_name()))?,
    };
    Ok(Value::Float(value).into())
}

fn builtin_complex(args: Vec<Value>, kwargs: Map) -> Result<Produced, FactoryError> {
    arity("complex", &args, 0, 2)?;
    let part = |value: Option<&Value>, name: &str| -> Result<Complex, FactoryError> {
        match value.or_else(|| kwargs.get(name)) {
            None => Ok(Complex::default()),
            Some(Value::Complex(c)) => Ok(*c),
            Some(other) => other
                .as_f64()
                .map(|re| Complex::new(re, 0.0))
                .ok_or_else(|| format!("complex() argument must be a number, not {}", other.kind_name()).into()),
        }
    };
    let real = part(args.first(), "real")?;
    let imag = part(args.get(1), "imag")?;
    Ok(Value::Complex(Complex::new(real.re - imag.im, real.im + imag.re)).into())
}

fn builtin_bytes(args: Vec<Value>, kwargs: Map) -> Result<Produced, FactoryError> {
    arity("bytes", &args, 0, 1)?;
    no_keywords("bytes", &kwargs)?;
    let out = match args.into_iter().next() {
        None => Vec::new(),
        Some(Value::String(s)) => s.into_bytes(),
        Some(Value::Bytes(b)) => b,
        Some(Value::Int(n)) if n >= 0 => vec![0; n as usize],
        Some(other) => iterable("bytes", &other)?
            .into_iter()
            .map(|item| match item {
                Value::Int(n) if (0..=255).contains(&n) => Ok(n as u8),
                _ => Err(FactoryError::from("bytes must be in range(0, 256)")),
            })
            .collect::<Result<Vec<u8>, FactoryError>>()?,
    };
    Ok(Value::Bytes(out).into())
}

fn builtin_chr(args: Vec<Value>, kwargs: Map) -> Result<Produced, FactoryError> {
    arity("chr", &args, 1, 1)?;
    no_keywords("chr", &kwargs)?;
    let c = args[0]
        .as_i64()
        .and_then(|n| u32::try_from(n).ok())
        .and_then(char::from_u32)
        .ok_or("chr() arg not in range")?;
    Ok(Value::String(c.to_string()).into())
}

fn builtin_ord(args: Vec<Value>, kwargs: Map) -> Result<Produced, FactoryError> {
    arity("ord", &args, 1, 1)?;
    no_keywords("ord", &kwargs)?;
    let code = match &args[0] {
        Value::String(s) if s.chars().count() == 1 => s.chars().next().map_or(0, |c| i64::from(u32::from(c))),
        Value::Bytes(b) if b.len() == 1 => i64::from(b[0]),
        _ => return Err("ord() expected a character".into()),
    };
    Ok(Value::Int(code).into())
}

/// Orders numbers among numbers and strings among strings.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bytes(x), Value::Bytes(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::BigInt(_), _) | (_, Value::BigInt(_)) | (Value::Float(_), _) | (_, Value::Float(_))
            if a.as_f64().is_some() && b.as_f64().is_some() =>
        {
            match (a, b) {
                (Value::BigInt(x), Value::BigInt(y)) => Some(x.cmp(y)),
                _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
            }
        }
        _ => None,
    }
}

fn builtin_sorted(args: Vec<Value>, kwargs: Map) -> Result<Produced, FactoryError> {
    arity("sorted", &args, 1, 1)?;
    let reverse = match kwargs.get("reverse") {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err("sorted() reverse must be a boolean".into()),
    };
    if let Some(key) = kwargs.keys().find(|k| k.as_str() != "reverse") {
        return Err(format!("sorted() got an unexpected keyword argument {key:?}").into());
    }
    let mut items = iterable("sorted", &args[0])?;
    let mut failed = false;
    items.sort_by(|a, b| {
        compare(a, b).unwrap_or_else(|| {
            failed = true;
            Ordering::Equal
        })
    });
    if failed {
        return Err("sorted() elements are not mutually comparable".into());
    }
    if reverse {
        items.reverse();
    }
    Ok(Value::Sequence(items).into())
}

fn builtin_reversed(args: Vec<Value>, kwargs: Map) -> Result<Produced, FactoryError> {
    arity("reversed", &args, 1, 1)?;
    no_keywords("reversed", &kwargs)?;
    let items = iterable("reversed", &args[0])?;
    Ok(Produced::Lazy(Box::new(items.into_iter().rev())))
}

fn builtin_range(args: Vec<Value>, kwargs: Map) -> Result<Produced, FactoryError> {
    arity("range", &args, 1, 3)?;
    no_keywords("range", &kwargs)?;
    let ints = args
        .iter()
        .map(|a| a.as_i64().ok_or("range() arguments must be integers"))
        .collect::<Result<Vec<i64>, _>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => unreachable!("arity checked"),
    };
    if step == 0 {
        return Err("range() arg 3 must not be zero".into());
    }
    let iter = std::iter::successors(Some(start), move |n| n.checked_add(step))
        .take_while(move |n| if step > 0 { *n < stop } else { *n > stop })
        .map(Value::Int);
    Ok(Produced::Lazy(Box::new(iter)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, FactoryError> {
        let registry = ConstructorRegistry::with_builtins();
        let factory = registry.resolve(name).expect("builtin");
        invoke(name, factory, args, Map::new())
    }

    #[test]
    fn test_lazy_results_are_drained() {
        assert_eq!(
            call("range", vec![Value::from(3)]).unwrap(),
            Value::Sequence(vec![Value::from(0), Value::from(1), Value::from(2)])
        );
        assert_eq!(
            call("range", vec![Value::from(5), Value::from(0), Value::from(-2)]).unwrap(),
            Value::Sequence(vec![Value::from(5), Value::from(3), Value::from(1)])
        );
        assert_eq!(
            call("reversed", vec![Value::from("ab")]).unwrap(),
            Value::Sequence(vec![Value::from("b"), Value::from("a")])
        );
    }

    #[test]
    fn test_collections() {
        let items = Value::Sequence(vec![Value::from(2), Value::from(1), Value::from(2)]);
        assert_eq!(call("set", vec![items.clone()]).unwrap().as_set().map(Set::len), Some(2));
        assert!(call("tuple", vec![items.clone()]).unwrap().is_tuple());
        assert_eq!(
            call("sorted", vec![items]).unwrap(),
            Value::Sequence(vec![Value::from(1), Value::from(2), Value::from(2)])
        );
        assert!(call("sorted", vec![Value::Sequence(vec![Value::from(1), Value::from("a")])]).is_err());
    }

    #[test]
    fn test_scalars() {
        assert_eq!(call("int", vec![Value::from("ff"), Value::from(16)]).unwrap(), Value::from(255));
        assert_eq!(call("int", vec![Value::from(2.9)]).unwrap(), Value::from(2));
        assert_eq!(call("float", vec![Value::from("-inf")]).unwrap(), Value::Float(f64::NEG_INFINITY));
        assert_eq!(call("chr", vec![Value::from(65)]).unwrap(), Value::from("A"));
        assert_eq!(call("ord", vec![Value::from("A")]).unwrap(), Value::from(65));
        assert_eq!(
            call("complex", vec![Value::from(1), Value::from(2)]).unwrap(),
            Value::Complex(Complex::new(1.0, 2.0))
        );
        assert_eq!(call("str", vec![Value::from(5)]).unwrap(), Value::from("5"));
        assert!(call("chr", vec![]).is_err());
    }

    #[test]
    fn test_shared_results_become_constructed() {
        let mut registry = ConstructorRegistry::new();
        registry.register("Point", |_, kwargs| Ok(Produced::Shared(Arc::new(Value::Mapping(kwargs)))));
        let factory = registry.resolve("Point").unwrap();
        let value = invoke("Point", factory, vec![], Map::new()).unwrap();
        assert!(matches!(value, Value::Constructed(ref c) if c.name() == "Point"));
    }

    #[test]
    fn test_import_scope_qualifies_names() {
        let mut scope = ImportScope::default();
        scope.bind_name("OD".to_string(), "collections.OrderedDict".to_string());
        scope.bind_module("geo".to_string(), "my.geo".to_string());
        assert_eq!(scope.qualify("OD"), "collections.OrderedDict");
        assert_eq!(scope.qualify("geo.Point"), "my.geo.Point");
        assert_eq!(scope.qualify("set"), "set");
        assert!(scope.is_bound("geo"));
    }

    #[test]
    fn test_has_module() {
        let mut registry = ConstructorRegistry::new();
        registry.register("geo.shapes.Point", |_, _| Ok(Value::Null.into()));
        assert!(registry.has_module("geo"));
        assert!(registry.has_module("geo.shapes"));
        assert!(!registry.has_module("ge"));
    }
}
