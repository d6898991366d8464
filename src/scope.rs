//! Name bindings visible to references while a document is parsed.
//!
//! Every mapping key and list index the parser descends into opens a level.
//! When a level's value has been parsed successfully it is published twice:
//! under its full dotted path (`server.ports.0`) at the root level, and, for
//! nested levels, under its own name in the enclosing level so siblings can
//! refer to each other by short name. A level that fails publishes nothing.
//!
//! Levels opened while the chain is detached, such as constructor arguments,
//! skip the root publication: their short names stay visible to siblings but
//! no dotted path outlives them.

use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug)]
pub(crate) struct ScopeChain {
    names: Vec<String>,
    maps: Vec<HashMap<String, Value>>,
    detached: usize,
}

impl ScopeChain {
    pub(crate) fn new() -> Self {
        ScopeChain {
            names: Vec::new(),
            maps: vec![HashMap::new()],
            detached: 0,
        }
    }

    pub(crate) fn detach(&mut self) {
        self.detached += 1;
    }

    pub(crate) fn reattach(&mut self) {
        self.detached = self.detached.saturating_sub(1);
    }

    pub(crate) fn enter(&mut self, name: impl Into<String>) {
        self.names.push(name.into());
        self.maps.push(HashMap::new());
    }

    /// Closes the innermost level, publishing `value` when the level succeeded.
    pub(crate) fn exit(&mut self, value: Option<&Value>) {
        self.maps.pop();
        if let Some(value) = value {
            let path = self.names.join(".");
            let nested = self.names.len() > 1;
            if self.detached == 0 {
                if let Some(root) = self.maps.first_mut() {
                    root.insert(path, value.clone());
                }
            }
            if nested {
                if let (Some(name), Some(parent)) = (self.names.last(), self.maps.last_mut()) {
                    parent.insert(name.clone(), value.clone());
                }
            }
        }
        self.names.pop();
    }

    /// Looks `name` up from the innermost level outwards.
    pub(crate) fn lookup(&self, name: &str) -> Option<&Value> {
        self.maps.iter().rev().find_map(|map| map.get(name))
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_publication() {
        let mut scopes = ScopeChain::new();
        scopes.enter("a");
        scopes.exit(Some(&Value::from(1)));
        assert_eq!(scopes.lookup("a"), Some(&Value::from(1)));
        assert_eq!(scopes.depth(), 0);
    }

    #[test]
    fn test_nested_publication() {
        let mut scopes = ScopeChain::new();
        scopes.enter("outer");
        scopes.enter("inner");
        scopes.exit(Some(&Value::from("x")));
        assert_eq!(scopes.lookup("inner"), Some(&Value::from("x")));
        assert!(scopes.contains("outer.inner"));
        scopes.exit(Some(&Value::Null));
        assert!(!scopes.contains("inner"));
        assert!(scopes.contains("outer.inner"));
        assert!(scopes.contains("outer"));
    }

    #[test]
    fn test_detached_levels_skip_root() {
        let mut scopes = ScopeChain::new();
        scopes.enter("a");
        scopes.detach();
        scopes.enter("0");
        scopes.exit(Some(&Value::from(7)));
        assert_eq!(scopes.lookup("0"), Some(&Value::from(7)));
        scopes.reattach();
        scopes.exit(Some(&Value::Null));
        assert!(!scopes.contains("a.0"));
        assert!(!scopes.contains("0"));
        assert!(scopes.contains("a"));
    }

    #[test]
    fn test_failed_level_publishes_nothing() {
        let mut scopes = ScopeChain::new();
        scopes.enter("a");
        scopes.exit(None);
        assert!(!scopes.contains("a"));
    }
}
