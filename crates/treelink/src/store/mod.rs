//! The remote-store capability surface.
//!
//! The transport to the actual hierarchical store lives outside this crate;
//! everything here talks to it through the object-safe [`RemoteStore`]
//! trait. Writes are fire-and-forget subtree overwrites. Reads are
//! listener registrations: an observer callback paired with a [`ListenerId`]
//! that must be handed back verbatim on removal. The id is the listener's
//! identity; removing anything else leaks the registration.

use serde_json::Value;
use thiserror::Error;
use treelink_path::PathAddress;

use crate::auth::{AuthMethod, InvocationDescriptor};

/// Identity of one registered listener, scoped to the path and event name
/// it was registered under.
pub type ListenerId = u64;

/// Event name for value-change notifications.
pub const VALUE_EVENT: &str = "value";

/// One raw notification from the remote store. For [`VALUE_EVENT`]
/// notifications the payload is the current value at the listened path.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEvent {
    pub name: String,
    pub payload: Value,
}

/// The signed-in account as reported by auth-state notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("listener at '{path}' failed: {message}")]
    Listener { path: PathAddress, message: String },
    #[error("write at '{path}' rejected: {message}")]
    Write { path: PathAddress, message: String },
    #[error("auth invocation {method:?} failed: {message}")]
    Auth { method: AuthMethod, message: String },
}

/// Observer for path-scoped events. Errors terminate the registration's
/// stream on the consumer side; the store keeps the listener until it is
/// explicitly removed.
pub type EventObserver = Box<dyn FnMut(Result<RemoteEvent, StoreError>)>;

/// Observer for auth-state changes; `None` means signed out.
pub type AuthObserver = Box<dyn FnMut(Option<AuthUser>)>;

pub trait RemoteStore {
    /// Overwrite everything at and below `path` with `value`; a null value
    /// deletes the location. Errors surfaced asynchronously by the store
    /// are outside this surface.
    fn set_value(&self, path: &PathAddress, value: &Value) -> Result<(), StoreError>;

    /// Register an observer for `event` notifications at `path`.
    fn add_listener(&self, path: &PathAddress, event: &str, observer: EventObserver)
        -> ListenerId;

    /// Deregister the exact listener previously returned for this path and
    /// event. Unknown ids are ignored.
    fn remove_listener(&self, path: &PathAddress, event: &str, listener: ListenerId);

    /// Register an observer for auth-state changes.
    fn add_auth_listener(&self, observer: AuthObserver) -> ListenerId;

    fn remove_auth_listener(&self, listener: ListenerId);

    /// Perform the auth operation described by a translated intent.
    fn invoke_auth(&self, invocation: &InvocationDescriptor) -> Result<(), StoreError>;
}
