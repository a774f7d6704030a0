//! Slash-delimited path addressing.
//!
//! This crate implements the logical addressing scheme used to locate values
//! in a hierarchical key/value tree: paths are sequences of non-empty string
//! segments, written and parsed in `a/b/c` form.
//!
//! # Example
//!
//! ```
//! use treelink_path::PathAddress;
//!
//! // Parsing normalizes away empty segments.
//! let path = PathAddress::parse("/users//alice/");
//! assert_eq!(path.to_string(), "users/alice");
//!
//! // Join builds child locations.
//! let deep = path.join("posts/1");
//! assert_eq!(deep.segments(), ["users", "alice", "posts", "1"]);
//!
//! // Read a value out of a JSON document.
//! let doc = serde_json::json!({"users": {"alice": {"age": 30}}});
//! let age = treelink_path::get(&doc, &PathAddress::parse("users/alice/age"));
//! assert_eq!(age, Some(&serde_json::json!(30)));
//! ```

use std::fmt;

use thiserror::Error;

mod access;
pub use access::{get, set_at};

/// Marker character reserving a path's first segment for virtual
/// capabilities (identity, auth control) instead of stored data.
pub const VIRTUAL_MARKER: char = '$';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path segment must be a non-empty string")]
    Empty,
}

/// A normalized slash-delimited location in a value tree.
///
/// The root path has no segments and displays as the empty string. Parsing
/// drops empty segments, so leading, trailing, and doubled separators never
/// survive normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PathAddress {
    segments: Vec<String>,
}

impl PathAddress {
    /// The empty root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash-delimited path, dropping empty segments.
    pub fn parse(raw: &str) -> Self {
        Self {
            segments: raw
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first_segment(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Append a raw (possibly multi-segment) suffix to this path.
    pub fn join(&self, raw: &str) -> Self {
        self.join_path(&Self::parse(raw))
    }

    pub fn join_path(&self, suffix: &Self) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(suffix.segments.iter().cloned());
        Self { segments }
    }

    /// Like [`join`](Self::join), but requires the suffix to contain at
    /// least one segment after normalization.
    pub fn child(&self, raw: &str) -> Result<Self, PathError> {
        let suffix = Self::parse(raw);
        if suffix.is_root() {
            return Err(PathError::Empty);
        }
        Ok(self.join_path(&suffix))
    }

    /// True if `prefix` is this path or an ancestor of it.
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// True if the first segment begins with the [`VIRTUAL_MARKER`].
    pub fn is_virtual(&self) -> bool {
        self.first_segment()
            .is_some_and(|s| s.starts_with(VIRTUAL_MARKER))
    }
}

impl fmt::Display for PathAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl From<&str> for PathAddress {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}
