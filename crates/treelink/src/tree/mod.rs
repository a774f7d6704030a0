//! The snapshot tree model.
//!
//! Snapshots are immutable trees behind cheap [`Tree`] handles. The handle is
//! reference-counted, and *reference identity is part of the caller
//! contract*: the diff engine skips a subtree only when the previous and next
//! snapshots hold the very same handle (or an equal primitive). A branch that
//! has not changed must be passed forward by cloning its handle, not by
//! rebuilding a structurally-equal tree; a fresh allocation is treated as a
//! change and diffed in full.
//!
//! Shape classification happens once, at construction: a single-key
//! `{"$set": v}` mapping becomes the [`Node::Overwrite`] variant, so the
//! diff engine matches on variant kind instead of re-inspecting mappings.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

/// Reserved mapping key marking a whole-subtree overwrite.
pub const OVERWRITE_KEY: &str = "$set";

/// One node of a snapshot tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Programming-error sentinel. Never valid inside a snapshot; the diff
    /// engine rejects it eagerly. Deletion is an explicit [`Node::Null`].
    Absent,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Key-to-subtree mapping. Insertion order drives patch emission order.
    Map(IndexMap<String, Tree>),
    /// Replace the entire subtree at this location with the payload instead
    /// of merging key-by-key.
    Overwrite(Tree),
}

/// A shared handle to a snapshot (sub)tree.
///
/// Cloning is cheap and preserves identity; see the module docs for the
/// identity contract this implies for diffing.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree(Arc<Node>);

impl Tree {
    pub fn new(node: Node) -> Self {
        Self(Arc::new(node))
    }

    pub fn absent() -> Self {
        Self::new(Node::Absent)
    }

    pub fn null() -> Self {
        Self::new(Node::Null)
    }

    /// The empty mapping. Illegal inside a snapshot, but it is the initial
    /// "previous snapshot" a driver starts from.
    pub fn empty_map() -> Self {
        Self::new(Node::Map(IndexMap::new()))
    }

    /// Build a mapping node. A single entry keyed [`OVERWRITE_KEY`] is
    /// classified as an overwrite directive.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Tree)>,
    {
        Self::from_entries(entries.into_iter().map(|(k, v)| (k.into(), v)))
    }

    /// Wrap `payload` in an overwrite directive.
    pub fn overwrite(payload: Tree) -> Self {
        Self::new(Node::Overwrite(payload))
    }

    /// Convert a JSON value into a tree, classifying overwrite directives.
    ///
    /// Arrays are represented as index-keyed mappings, the shape they take
    /// in a hierarchical key/value store.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::null(),
            Value::Bool(b) => Self::new(Node::Bool(*b)),
            Value::Number(n) => Self::new(Node::Number(n.clone())),
            Value::String(s) => Self::new(Node::String(s.clone())),
            Value::Array(items) => Self::from_entries(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), Self::from_json(v))),
            ),
            Value::Object(map) => {
                Self::from_entries(map.iter().map(|(k, v)| (k.clone(), Self::from_json(v))))
            }
        }
    }

    fn from_entries(entries: impl Iterator<Item = (String, Tree)>) -> Self {
        let entries: IndexMap<String, Tree> = entries.collect();
        if entries.len() == 1 {
            if let Some(payload) = entries.get(OVERWRITE_KEY) {
                return Self::new(Node::Overwrite(payload.clone()));
            }
        }
        Self::new(Node::Map(entries))
    }

    /// Serialize back to JSON. Overwrite directives regain their
    /// `{"$set": ...}` form. `Absent` has no JSON form and renders as null;
    /// it never survives to serialization on validated snapshots.
    pub fn to_json(&self) -> Value {
        match self.node() {
            Node::Absent | Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(n) => Value::Number(n.clone()),
            Node::String(s) => Value::String(s.clone()),
            Node::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Node::Overwrite(payload) => {
                let mut map = Map::new();
                map.insert(OVERWRITE_KEY.to_owned(), payload.to_json());
                Value::Object(map)
            }
        }
    }

    pub fn node(&self) -> &Node {
        &self.0
    }

    /// True if both handles point at the very same tree allocation. This is
    /// the short-circuit the diff engine relies on; structural equality is
    /// deliberately not enough.
    pub fn same_reference(&self, other: &Tree) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<&Value> for Tree {
    fn from(value: &Value) -> Self {
        Self::from_json(value)
    }
}

impl From<bool> for Tree {
    fn from(b: bool) -> Self {
        Self::new(Node::Bool(b))
    }
}

impl From<i64> for Tree {
    fn from(n: i64) -> Self {
        Self::new(Node::Number(Number::from(n)))
    }
}

impl From<&str> for Tree {
    fn from(s: &str) -> Self {
        Self::new(Node::String(s.to_owned()))
    }
}
