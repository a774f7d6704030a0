//! The reactive source layer: remote listeners as push streams.
//!
//! A [`SourceHandle`] wraps the remote store's listener-registration API
//! into lazy, cancellable [`PushStream`]s addressed by slash-delimited
//! paths, and scopes the whole surface to a base path via
//! [`child`](SourceHandle::child). Reserved virtual paths (first segment
//! starting with `$`) never reach the store: `$user` and its descendants
//! resolve to the auth-state identity stream, anything else `$`-prefixed is
//! rejected.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};
use thiserror::Error;
use treelink_path::{PathAddress, PathError, VIRTUAL_MARKER};

use crate::push_id::PushIdGenerator;
use crate::store::{RemoteEvent, RemoteStore, VALUE_EVENT};
use crate::tree::OVERWRITE_KEY;

mod stream;
pub use stream::{Observer, PushStream, StreamEvent, Subscription};

/// Virtual path resolving to the identity stream on reads and to auth
/// control on writes.
pub const IDENTITY_PATH: &str = "$user";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("invalid child path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("unknown virtual path '{0}'")]
    UnknownVirtualPath(PathAddress),
}

/// Path-scoped capability surface over a remote store.
#[derive(Clone)]
pub struct SourceHandle {
    store: Rc<dyn RemoteStore>,
    base: PathAddress,
    ids: Rc<RefCell<PushIdGenerator>>,
}

impl SourceHandle {
    /// A handle rooted at the top of the store.
    pub fn new(store: Rc<dyn RemoteStore>) -> Self {
        Self {
            store,
            base: PathAddress::root(),
            ids: Rc::new(RefCell::new(PushIdGenerator::new(None))),
        }
    }

    pub fn base(&self) -> &PathAddress {
        &self.base
    }

    /// The same surface rooted at `base/path`. The push-id generator is
    /// shared, so scoped handles keep the same-millisecond ordering
    /// guarantee.
    pub fn child(&self, path: &str) -> Result<SourceHandle, SourceError> {
        Ok(Self {
            store: Rc::clone(&self.store),
            base: self.base.child(path)?,
            ids: Rc::clone(&self.ids),
        })
    }

    /// The value at `base/path` over time. Each subscription registers its
    /// own value listener and forwards every notification's payload;
    /// listener errors terminate the stream.
    ///
    /// Paths at or under [`IDENTITY_PATH`] resolve to the identity stream,
    /// rendered as a JSON string or null.
    pub fn value_at(&self, path: &str) -> Result<PushStream<Value>, SourceError> {
        let full = self.base.join(path);
        match route(full)? {
            Route::Identity => Ok(self
                .identity()
                .map(|uid| uid.map(Value::String).unwrap_or(Value::Null))),
            Route::Remote(full) => Ok(self
                .observe_at(full, VALUE_EVENT)
                .map(|event| event.payload)),
        }
    }

    /// The signed-in identifier over time; null renders as `None`. Backed
    /// by an auth-state listener, not a value listener.
    pub fn identity(&self) -> PushStream<Option<String>> {
        let store = Rc::clone(&self.store);
        PushStream::new(move |mut observer| {
            let listener = store.add_auth_listener(Box::new(move |user| {
                observer(StreamEvent::Next(user.map(|u| u.uid)));
            }));
            let store = Rc::clone(&store);
            Box::new(move || store.remove_auth_listener(listener))
        })
    }

    /// Raw notifications for a custom event at `base/path`. Escape hatch
    /// for everything that is not a plain value change; virtual paths have
    /// no events and are rejected.
    pub fn event(&self, path: &str, event: &str) -> Result<PushStream<RemoteEvent>, SourceError> {
        let full = self.base.join(path);
        if full.is_virtual() {
            return Err(SourceError::UnknownVirtualPath(full));
        }
        Ok(self.observe_at(full, event))
    }

    /// One freshly generated identifier, then completion. Never touches
    /// the remote store.
    pub fn fresh_id(&self) -> PushStream<String> {
        let ids = Rc::clone(&self.ids);
        PushStream::new(move |mut observer| {
            observer(StreamEvent::Next(ids.borrow_mut().next_id()));
            observer(StreamEvent::Complete);
            Box::new(|| {})
        })
    }

    /// Wrap a value in an overwrite directive: `{"$set": value}`.
    pub fn overwrite(value: Value) -> Value {
        let mut map = Map::new();
        map.insert(OVERWRITE_KEY.to_owned(), value);
        Value::Object(map)
    }

    /// Direct access to the underlying store, for collaborators applying
    /// writes.
    pub fn store(&self) -> Rc<dyn RemoteStore> {
        Rc::clone(&self.store)
    }

    fn observe_at(&self, path: PathAddress, event: &str) -> PushStream<RemoteEvent> {
        let store = Rc::clone(&self.store);
        let event = event.to_owned();
        PushStream::new(move |mut observer| {
            let listener = store.add_listener(
                &path,
                &event,
                Box::new(move |notification| {
                    observer(match notification {
                        Ok(remote_event) => StreamEvent::Next(remote_event),
                        Err(err) => StreamEvent::Error(err),
                    });
                }),
            );
            let store = Rc::clone(&store);
            let path = path.clone();
            let event = event.clone();
            Box::new(move || store.remove_listener(&path, &event, listener))
        })
    }
}

#[derive(Debug)]
enum Route {
    Identity,
    Remote(PathAddress),
}

fn route(path: PathAddress) -> Result<Route, SourceError> {
    match path.first_segment() {
        Some(first) if first.starts_with(VIRTUAL_MARKER) => {
            if first == IDENTITY_PATH {
                Ok(Route::Identity)
            } else {
                Err(SourceError::UnknownVirtualPath(path))
            }
        }
        _ => Ok(Route::Remote(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_wraps_values() {
        assert_eq!(
            SourceHandle::overwrite(serde_json::json!({"a": 1})),
            serde_json::json!({"$set": {"a": 1}})
        );
        assert_eq!(
            SourceHandle::overwrite(Value::Null),
            serde_json::json!({"$set": null})
        );
    }

    #[test]
    fn routing_recognizes_identity_and_rejects_strangers() {
        assert!(matches!(
            route(PathAddress::parse("$user")),
            Ok(Route::Identity)
        ));
        assert!(matches!(
            route(PathAddress::parse("$user/uid")),
            Ok(Route::Identity)
        ));
        assert!(matches!(
            route(PathAddress::parse("users/alice")),
            Ok(Route::Remote(_))
        ));
        assert_eq!(
            route(PathAddress::parse("$lastError")).unwrap_err(),
            SourceError::UnknownVirtualPath(PathAddress::parse("$lastError"))
        );
    }
}
