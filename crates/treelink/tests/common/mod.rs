#![allow(dead_code)]

//! Shared test double: an in-memory remote store that records every call
//! so tests can assert on the register/deregister discipline, and that can
//! fire notifications into registered observers on demand.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};
use treelink::store::{AuthObserver, EventObserver};
use treelink::{AuthUser, InvocationDescriptor, ListenerId, RemoteEvent, RemoteStore, StoreError};
use treelink_path::{get, set_at, PathAddress};

struct EventListener {
    path: PathAddress,
    event: String,
    observer: EventObserver,
}

#[derive(Default)]
pub struct MemoryStore {
    data: RefCell<Value>,
    next_listener: Cell<ListenerId>,
    listeners: RefCell<BTreeMap<ListenerId, EventListener>>,
    auth_listeners: RefCell<BTreeMap<ListenerId, AuthObserver>>,
    /// Ids ever passed to a remove call; used to decide whether a listener
    /// taken out during a fire may be put back.
    removed: RefCell<BTreeSet<ListenerId>>,

    pub writes: RefCell<Vec<(PathAddress, Value)>>,
    pub registrations: RefCell<Vec<(PathAddress, String, ListenerId)>>,
    pub removals: RefCell<Vec<(PathAddress, String, ListenerId)>>,
    pub auth_registrations: RefCell<Vec<ListenerId>>,
    pub auth_removals: RefCell<Vec<ListenerId>>,
    pub invocations: RefCell<Vec<InvocationDescriptor>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let store = Self::default();
        *store.data.borrow_mut() = json!({});
        store
    }

    pub fn data(&self) -> Value {
        self.data.borrow().clone()
    }

    pub fn value_at(&self, path: &str) -> Option<Value> {
        get(&self.data.borrow(), &PathAddress::parse(path)).cloned()
    }

    fn next_id(&self) -> ListenerId {
        let id = self.next_listener.get() + 1;
        self.next_listener.set(id);
        id
    }

    /// Deliver a value notification to every listener at `path`.
    pub fn fire_value(&self, path: &str, payload: Value) {
        self.fire_event(path, treelink::VALUE_EVENT, payload);
    }

    pub fn fire_event(&self, path: &str, event: &str, payload: Value) {
        let remote_event = RemoteEvent {
            name: event.to_owned(),
            payload,
        };
        self.deliver(path, event, |observer| (observer)(Ok(remote_event.clone())));
    }

    /// Fail every listener at `path` with a listener error.
    pub fn fire_error(&self, path: &str, message: &str) {
        let err = StoreError::Listener {
            path: PathAddress::parse(path),
            message: message.to_owned(),
        };
        self.deliver(path, treelink::VALUE_EVENT, |observer| {
            (observer)(Err(err.clone()))
        });
    }

    pub fn fire_auth(&self, user: Option<AuthUser>) {
        let ids: Vec<ListenerId> = self.auth_listeners.borrow().keys().copied().collect();
        for id in ids {
            let entry = self.auth_listeners.borrow_mut().remove(&id);
            if let Some(mut observer) = entry {
                observer(user.clone());
                if !self.removed.borrow().contains(&id) {
                    self.auth_listeners.borrow_mut().insert(id, observer);
                }
            }
        }
    }

    /// Call matching observers one at a time, with each taken out of the
    /// registry for the duration of its call so observers may re-enter the
    /// store (e.g. a stream tearing itself down on error).
    fn deliver(&self, path: &str, event: &str, mut notify: impl FnMut(&mut EventObserver)) {
        let target = PathAddress::parse(path);
        let ids: Vec<ListenerId> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, l)| l.path == target && l.event == event)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            let entry = self.listeners.borrow_mut().remove(&id);
            if let Some(mut listener) = entry {
                notify(&mut listener.observer);
                if !self.removed.borrow().contains(&id) {
                    self.listeners.borrow_mut().insert(id, listener);
                }
            }
        }
    }
}

impl RemoteStore for MemoryStore {
    fn set_value(&self, path: &PathAddress, value: &Value) -> Result<(), StoreError> {
        self.writes.borrow_mut().push((path.clone(), value.clone()));
        set_at(&mut self.data.borrow_mut(), path, value.clone());
        Ok(())
    }

    fn add_listener(
        &self,
        path: &PathAddress,
        event: &str,
        observer: EventObserver,
    ) -> ListenerId {
        let id = self.next_id();
        self.registrations
            .borrow_mut()
            .push((path.clone(), event.to_owned(), id));
        self.listeners.borrow_mut().insert(
            id,
            EventListener {
                path: path.clone(),
                event: event.to_owned(),
                observer,
            },
        );
        id
    }

    fn remove_listener(&self, path: &PathAddress, event: &str, listener: ListenerId) {
        self.removals
            .borrow_mut()
            .push((path.clone(), event.to_owned(), listener));
        self.removed.borrow_mut().insert(listener);
        self.listeners.borrow_mut().remove(&listener);
    }

    fn add_auth_listener(&self, observer: AuthObserver) -> ListenerId {
        let id = self.next_id();
        self.auth_registrations.borrow_mut().push(id);
        self.auth_listeners.borrow_mut().insert(id, observer);
        id
    }

    fn remove_auth_listener(&self, listener: ListenerId) {
        self.auth_removals.borrow_mut().push(listener);
        self.removed.borrow_mut().insert(listener);
        self.auth_listeners.borrow_mut().remove(&listener);
    }

    fn invoke_auth(&self, invocation: &InvocationDescriptor) -> Result<(), StoreError> {
        self.invocations.borrow_mut().push(invocation.clone());
        Ok(())
    }
}
