//! Read and overwrite subtrees of a JSON document by path.

use serde_json::{Map, Value};

use crate::PathAddress;

/// Get a reference to the value at `path`, or `None` if any segment along
/// the way is missing or not an object.
///
/// # Example
///
/// ```
/// use treelink_path::{get, PathAddress};
///
/// let doc = serde_json::json!({"a": {"b": 1}});
/// assert_eq!(get(&doc, &PathAddress::parse("a/b")), Some(&serde_json::json!(1)));
/// assert_eq!(get(&doc, &PathAddress::parse("a/missing")), None);
/// assert_eq!(get(&doc, &PathAddress::root()), Some(&doc));
/// ```
pub fn get<'a>(doc: &'a Value, path: &PathAddress) -> Option<&'a Value> {
    let mut node = doc;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

/// Overwrite the subtree at `path` with `value`, creating intermediate
/// objects as needed and replacing non-object intermediates.
///
/// Writing `Value::Null` deletes the entry instead of storing a null,
/// matching hierarchical stores where a null write removes the location.
pub fn set_at(doc: &mut Value, path: &PathAddress, value: Value) {
    let Some((last, parents)) = path.segments().split_last() else {
        *doc = value;
        return;
    };
    let mut node = doc;
    for segment in parents {
        let map = ensure_object(node);
        node = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let map = ensure_object(node);
    if value.is_null() {
        map.remove(last);
    } else {
        map.insert(last.clone(), value);
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}
