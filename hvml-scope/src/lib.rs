//! Component D: the scoped variable map.
//!
//! Every element node in the parsed tree *may* own a variable map; a lookup
//! walks the ancestor chain outward, then falls back to document-level
//! bindings (§3 "Scope", §4.D). The parsed element tree itself is an
//! external collaborator (§1), so this crate does not know about tree
//! structure directly: callers (principally `hvml-frame`, whose frame
//! stack *is* the live ancestor chain) hand in the sequence of node
//! identities to walk, nearest ancestor first.

use std::collections::BTreeMap;
use std::rc::Rc;

use hvml_value::Value;

/// Opaque identity of a node in the externally-owned element tree. The
/// tree builder is responsible for handing out stable, unique ids.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

/// One node's variable bindings. Insertion-ordered with by-name uniqueness,
/// same as `hvml_value::Object` (§3: "Binding uniqueness within a map is by
/// name; redefinition replaces").
#[derive(Default)]
pub struct ScopeMap {
    entries: Vec<(Rc<str>, Value)>,
}

impl ScopeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| &**k == name).map(|(_, v)| v)
    }

    pub fn bind(&mut self, name: impl Into<Rc<str>>, value: Value) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn unbind(&mut self, name: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| &**k == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The built-in document-level namespaces available when an unqualified
/// name is not found anywhere in the ancestor chain (§3).
pub const BUILTIN_NAMES: &[&str] = &[
    "HVML", "SYSTEM", "DATETIME", "DOC", "SESSION", "EJSON", "STR", "STREAM", "TIMERS", "T", "L",
];

/// Document-wide bindings: the built-ins plus whatever the document itself
/// has bound at the root (§3 "document-level bindings").
#[derive(Default)]
pub struct DocumentBindings {
    map: ScopeMap,
}

impl DocumentBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_builtin(&mut self, name: &str, value: Value) {
        debug_assert!(
            BUILTIN_NAMES.contains(&name),
            "binding a non-builtin name as a builtin; did you mean `bind`?"
        );
        self.map.bind(name, value);
    }

    pub fn bind(&mut self, name: impl Into<Rc<str>>, value: Value) {
        self.map.bind(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }
}

/// Arena of per-node [`ScopeMap`]s, kept in a `BTreeMap` so ancestor walks
/// (which re-touch the same handful of nodes every step) stay logarithmic
/// without needing the tree itself to carry a scope-index field (§4.D:
/// "Scoped variable maps keyed on tree-node identity suggest an arena +
/// index design" — here the "index" is the node id itself, since node ids
/// are handed out by the external tree builder rather than owned by us).
#[derive(Default)]
pub struct ScopeArena {
    maps: BTreeMap<NodeId, ScopeMap>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: returns the existing map if `node` already owns one.
    pub fn create_if_absent(&mut self, node: NodeId) -> &mut ScopeMap {
        self.maps.entry(node).or_default()
    }

    pub fn get(&self, node: NodeId) -> Option<&ScopeMap> {
        self.maps.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut ScopeMap> {
        self.maps.get_mut(&node)
    }

    /// Resolve `name` by walking `ancestors` (nearest first) and finally
    /// `document`. Used for unqualified lookups (§4.B).
    pub fn resolve<'a>(
        &'a self,
        ancestors: impl IntoIterator<Item = NodeId>,
        document: &'a DocumentBindings,
        name: &str,
    ) -> Option<&'a Value> {
        for node in ancestors {
            if let Some(map) = self.maps.get(&node) {
                if let Some(value) = map.get(name) {
                    return Some(value);
                }
            }
        }
        document.get(name)
    }

    /// Destroy every map under `nodes`, in the given (post-order) sequence
    /// so children release before parents (§4.D).
    pub fn destroy_subtree(&mut self, nodes_post_order: impl IntoIterator<Item = NodeId>) {
        for node in nodes_post_order {
            self.maps.remove(&node);
        }
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ancestor_walk_stops_at_first_binding() {
        let mut arena = ScopeArena::new();
        arena.create_if_absent(NodeId(1)).bind("x", Value::Int(1));
        arena.create_if_absent(NodeId(2)).bind("x", Value::Int(2));

        let doc = DocumentBindings::new();
        let value = arena.resolve([NodeId(2), NodeId(1)], &doc, "x");
        assert!(matches!(value, Some(Value::Int(2))));
    }

    #[test]
    fn falls_back_to_document_bindings() {
        let arena = ScopeArena::new();
        let mut doc = DocumentBindings::new();
        doc.bind_builtin("SYSTEM", Value::make_str("system"));

        let value = arena.resolve([NodeId(1)], &doc, "SYSTEM");
        assert!(matches!(value, Some(Value::Str(_))));
    }

    #[test]
    fn create_if_absent_is_idempotent() {
        let mut arena = ScopeArena::new();
        arena.create_if_absent(NodeId(1)).bind("a", Value::Int(1));
        arena.create_if_absent(NodeId(1));
        assert_eq!(arena.get(NodeId(1)).unwrap().get("a"), Some(&Value::Int(1)));
    }
}
