//! Tree diff: compute the patches that transform one snapshot into the next.
//!
//! The engine walks the *next* snapshot depth-first and emits one
//! [`Patch`] per changed leaf (or per overwrite directive). Absence of a key
//! in the next snapshot does not mean removal, only that the key is no
//! longer tracked, so nothing is emitted for it. Removal is an explicit
//! null, which patches the location to null.
//!
//! Unchanged subtrees are detected by handle identity (see the caller
//! contract in [`crate::tree`]): equal primitives short-circuit by value,
//! everything else only by passing the same [`Tree`] handle forward. This
//! keeps the skip check O(1) per subtree with no deep comparisons.

use serde_json::Value;
use thiserror::Error;
use treelink_path::PathAddress;

use crate::tree::{Node, Tree, OVERWRITE_KEY};

// ── Public API ────────────────────────────────────────────────────────────

/// One instruction for the remote store: overwrite everything at and below
/// `location` with `value`. A null value deletes the location.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub location: PathAddress,
    pub value: Value,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// An absent-marker value inside the next snapshot. Always a caller
    /// bug; deletions must be explicit nulls.
    #[error("absent value found at '{location}' in snapshot tree")]
    MalformedTree { location: PathAddress },
    /// An empty mapping, which a hierarchical store cannot distinguish from
    /// "no data". Callers must use null instead.
    #[error("empty mapping at '{location}'; use an explicit null instead")]
    EmptyTree { location: PathAddress },
    /// The `$set` overwrite marker mixed with sibling keys.
    #[error("overwrite marker '$set' mixed with sibling keys at '{location}'")]
    MalformedOverwrite { location: PathAddress },
}

/// Diff two snapshots into the ordered patch sequence that transforms
/// `prev` into `next`.
///
/// Patches are emitted in the next snapshot's key iteration order, but each
/// patch is an independent full-subtree overwrite; no cross-patch ordering
/// is required for correctness.
pub fn diff(prev: &Tree, next: &Tree) -> Result<Vec<Patch>, DiffError> {
    let mut patches = Vec::new();
    diff_at(prev, next, PathAddress::root(), &mut patches)?;
    Ok(patches)
}

// ── Core recursive differ ─────────────────────────────────────────────────

fn diff_at(
    prev: &Tree,
    next: &Tree,
    location: PathAddress,
    out: &mut Vec<Patch>,
) -> Result<(), DiffError> {
    match next.node() {
        Node::Absent => Err(DiffError::MalformedTree { location }),
        _ if unchanged(prev, next) => Ok(()),
        Node::Null => {
            out.push(Patch {
                location,
                value: Value::Null,
            });
            Ok(())
        }
        Node::Map(entries) => {
            if entries.is_empty() {
                return Err(DiffError::EmptyTree { location });
            }
            if let Some(payload) = entries.get(OVERWRITE_KEY) {
                // Only reachable for mappings built without boundary
                // classification, or when the marker has siblings.
                if entries.len() != 1 {
                    return Err(DiffError::MalformedOverwrite { location });
                }
                return diff_overwrite(prev, payload, location, out);
            }
            let absent_prev = Tree::empty_map();
            for (key, next_child) in entries {
                let prev_child = child_of(prev, key).unwrap_or(&absent_prev);
                diff_at(prev_child, next_child, location.join(key), out)?;
            }
            Ok(())
        }
        Node::Overwrite(payload) => diff_overwrite(prev, payload, location, out),
        Node::Bool(_) | Node::Number(_) | Node::String(_) => {
            out.push(Patch {
                location,
                value: next.to_json(),
            });
            Ok(())
        }
    }
}

fn diff_overwrite(
    prev: &Tree,
    payload: &Tree,
    location: PathAddress,
    out: &mut Vec<Patch>,
) -> Result<(), DiffError> {
    match payload.node() {
        Node::Absent => {
            return Err(DiffError::MalformedTree {
                location: location.join(OVERWRITE_KEY),
            })
        }
        Node::Map(entries) if entries.is_empty() => {
            return Err(DiffError::EmptyTree { location })
        }
        _ => {}
    }
    // The directive wrapper is rebuilt on every snapshot; identity lives on
    // the payload.
    if let Some(prev_payload) = overwrite_payload(prev) {
        if prev_payload.same_reference(payload) {
            return Ok(());
        }
    }
    out.push(Patch {
        location,
        value: payload.to_json(),
    });
    Ok(())
}

/// Identity-or-primitive-equality short-circuit.
fn unchanged(prev: &Tree, next: &Tree) -> bool {
    if prev.same_reference(next) {
        return true;
    }
    match (prev.node(), next.node()) {
        (Node::Null, Node::Null) => true,
        (Node::Bool(a), Node::Bool(b)) => a == b,
        (Node::Number(a), Node::Number(b)) => a == b,
        (Node::String(a), Node::String(b)) => a == b,
        _ => false,
    }
}

fn child_of<'a>(prev: &'a Tree, key: &str) -> Option<&'a Tree> {
    match prev.node() {
        Node::Map(entries) => entries.get(key),
        _ => None,
    }
}

fn overwrite_payload(prev: &Tree) -> Option<&Tree> {
    match prev.node() {
        Node::Overwrite(payload) => Some(payload),
        Node::Map(entries) => entries.get(OVERWRITE_KEY),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
