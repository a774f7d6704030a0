//! Source-layer behavior against a recording store: listener hygiene,
//! virtual path routing, and stream delivery.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};
use treelink::{
    AuthUser, PathAddress, SourceError, SourceHandle, StreamEvent, PUSH_ID_LEN, VALUE_EVENT,
};

use common::MemoryStore;

fn harness() -> (Rc<MemoryStore>, SourceHandle) {
    let store = Rc::new(MemoryStore::new());
    let source = SourceHandle::new(store.clone());
    (store, source)
}

fn collect<T: 'static>(stream: &treelink::PushStream<T>) -> Rc<RefCell<Vec<StreamEvent<T>>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    // Kept alive by the start function; events arrive until terminal.
    stream.subscribe(move |event| sink.borrow_mut().push(event));
    seen
}

#[test]
fn each_subscription_registers_exactly_one_listener() {
    let (store, source) = harness();
    let stream = source.value_at("users/alice").unwrap();

    assert!(store.registrations.borrow().is_empty(), "streams are lazy");

    let subscription = stream.subscribe(|_| {});
    {
        let registrations = store.registrations.borrow();
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].0, PathAddress::parse("users/alice"));
        assert_eq!(registrations[0].1, VALUE_EVENT);
    }

    subscription.unsubscribe();
    subscription.unsubscribe();
    let removals = store.removals.borrow();
    assert_eq!(removals.len(), 1, "teardown runs once");
    // The exact id handed out on registration comes back on removal.
    assert_eq!(removals[0].2, store.registrations.borrow()[0].2);
}

#[test]
fn value_notifications_arrive_unwrapped() {
    let (store, source) = harness();
    let seen = collect(&source.value_at("doc/title").unwrap());

    store.fire_value("doc/title", json!("draft"));
    store.fire_value("doc/title", json!("final"));

    assert_eq!(
        *seen.borrow(),
        [
            StreamEvent::Next(json!("draft")),
            StreamEvent::Next(json!("final")),
        ]
    );
}

#[test]
fn listener_errors_terminate_and_deregister() {
    let (store, source) = harness();
    let seen = collect(&source.value_at("doc").unwrap());

    store.fire_error("doc", "permission denied");
    // The error tore the listener down, so nothing more is delivered.
    store.fire_value("doc", json!(1));

    let events = seen.borrow();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], StreamEvent::Error(_)));
    assert_eq!(store.removals.borrow().len(), 1);
}

#[test]
fn identity_stream_follows_auth_state() {
    let (store, source) = harness();
    let seen = collect(&source.identity());

    assert_eq!(store.auth_registrations.borrow().len(), 1);
    assert!(store.registrations.borrow().is_empty());

    store.fire_auth(Some(AuthUser { uid: "u-1".into() }));
    store.fire_auth(None);

    assert_eq!(
        *seen.borrow(),
        [
            StreamEvent::Next(Some("u-1".to_owned())),
            StreamEvent::Next(None),
        ]
    );
}

#[test]
fn identity_unsubscribe_removes_the_auth_listener() {
    let (store, source) = harness();
    let subscription = source.identity().subscribe(|_| {});
    subscription.unsubscribe();

    assert_eq!(
        *store.auth_removals.borrow(),
        *store.auth_registrations.borrow()
    );
    store.fire_auth(Some(AuthUser { uid: "u-2".into() }));
}

#[test]
fn identity_path_reads_route_to_auth_state() {
    let (store, source) = harness();
    let seen = collect(&source.value_at("$user/uid").unwrap());

    store.fire_auth(Some(AuthUser { uid: "u-3".into() }));
    store.fire_auth(None);

    // Rendered as a JSON string, with signed-out as null.
    assert_eq!(
        *seen.borrow(),
        [
            StreamEvent::Next(json!("u-3")),
            StreamEvent::Next(Value::Null),
        ]
    );
    assert!(store.registrations.borrow().is_empty());
}

#[test]
fn unknown_virtual_reads_are_rejected() {
    let (_, source) = harness();
    assert_eq!(
        source.value_at("$lastError").unwrap_err(),
        SourceError::UnknownVirtualPath(PathAddress::parse("$lastError"))
    );
}

#[test]
fn custom_events_register_under_their_own_name() {
    let (store, source) = harness();
    let seen = collect(&source.event("rooms/lobby", "child_added").unwrap());

    assert_eq!(store.registrations.borrow()[0].1, "child_added");

    store.fire_event("rooms/lobby", "child_added", json!({"id": "m1"}));
    let events = seen.borrow();
    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Next(remote) => {
            assert_eq!(remote.name, "child_added");
            assert_eq!(remote.payload, json!({"id": "m1"}));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn events_on_virtual_paths_are_rejected() {
    let (_, source) = harness();
    assert!(matches!(
        source.event("$user", "child_added"),
        Err(SourceError::UnknownVirtualPath(_))
    ));
}

#[test]
fn child_handles_scope_every_path() {
    let (store, source) = harness();
    let alice = source.child("users").unwrap().child("alice").unwrap();
    assert_eq!(*alice.base(), PathAddress::parse("users/alice"));

    let _sub = alice.value_at("posts").unwrap().subscribe(|_| {});
    assert_eq!(
        store.registrations.borrow()[0].0,
        PathAddress::parse("users/alice/posts")
    );
}

#[test]
fn empty_child_paths_are_rejected() {
    let (_, source) = harness();
    assert!(matches!(
        source.child(""),
        Err(SourceError::InvalidPath(_))
    ));
}

#[test]
fn fresh_id_emits_one_identifier_and_completes() {
    let (store, source) = harness();
    let seen = collect(&source.fresh_id());

    let events = seen.borrow();
    assert_eq!(events.len(), 2);
    match &events[0] {
        StreamEvent::Next(id) => assert_eq!(id.len(), PUSH_ID_LEN),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(events[1], StreamEvent::Complete);
    // Id generation is local.
    assert!(store.registrations.borrow().is_empty());
    assert!(store.writes.borrow().is_empty());
}

#[test]
fn fresh_id_subscriptions_draw_distinct_ordered_ids() {
    let (_, source) = harness();
    let stream = source.fresh_id();
    let first = collect(&stream);
    let second = collect(&stream);

    let (a, b) = match (&first.borrow()[0], &second.borrow()[0]) {
        (StreamEvent::Next(a), StreamEvent::Next(b)) => (a.clone(), b.clone()),
        other => panic!("unexpected events {other:?}"),
    };
    assert!(a < b);
}

#[test]
fn child_handles_share_the_id_sequence() {
    let (_, source) = harness();
    let scoped = source.child("deep").unwrap();

    let parent_id = collect(&source.fresh_id());
    let child_id = collect(&scoped.fresh_id());

    let (a, b) = match (&parent_id.borrow()[0], &child_id.borrow()[0]) {
        (StreamEvent::Next(a), StreamEvent::Next(b)) => (a.clone(), b.clone()),
        other => panic!("unexpected events {other:?}"),
    };
    assert!(a < b, "shared generator keeps scoped ids ordered");
}
