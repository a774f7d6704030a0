//! Push streams over listener registrations.
//!
//! A [`PushStream`] is lazy and restartable: nothing happens until
//! `subscribe`, and every subscription runs the start function again,
//! acquiring its own listener. The returned [`Subscription`] owns that
//! listener's teardown and releases it exactly once, on explicit
//! `unsubscribe` or automatically when the stream errors or completes.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::store::StoreError;

/// One delivery to a stream observer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent<T> {
    Next(T),
    /// Terminal: the underlying listener failed. The subscription tears
    /// down after delivery.
    Error(StoreError),
    /// Terminal: the stream is done. The subscription tears down after
    /// delivery.
    Complete,
}

impl<T> StreamEvent<T> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Error(_) | StreamEvent::Complete)
    }
}

/// Boxed observer callback, invoked once per [`StreamEvent`].
pub type Observer<T> = Box<dyn FnMut(StreamEvent<T>)>;

type Teardown = Box<dyn FnOnce()>;

/// Handle tying one subscription to its teardown.
///
/// Teardown runs at most once, however many times `unsubscribe` is called
/// and whether it races with a terminal event: the stored closure is taken
/// out of the shared slot, so a second caller finds it gone.
#[derive(Clone)]
pub struct Subscription {
    state: Rc<RefCell<SubscriptionState>>,
}

#[derive(Default)]
struct SubscriptionState {
    closed: bool,
    teardown: Option<Teardown>,
}

impl Subscription {
    fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SubscriptionState::default())),
        }
    }

    /// Store the teardown, or run it immediately if a terminal event
    /// already closed the subscription during start.
    fn attach(&self, teardown: Teardown) {
        let pending = {
            let mut state = self.state.borrow_mut();
            if state.closed {
                Some(teardown)
            } else {
                state.teardown = Some(teardown);
                None
            }
        };
        if let Some(teardown) = pending {
            teardown();
        }
    }

    /// Release the underlying listener. Idempotent.
    pub fn unsubscribe(&self) {
        let teardown = {
            let mut state = self.state.borrow_mut();
            state.closed = true;
            state.teardown.take()
        };
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

/// A lazy, restartable push sequence.
pub struct PushStream<T> {
    start: Rc<dyn Fn(Observer<T>) -> Teardown>,
}

impl<T> Clone for PushStream<T> {
    fn clone(&self) -> Self {
        Self {
            start: Rc::clone(&self.start),
        }
    }
}

impl<T> fmt::Debug for PushStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushStream").finish_non_exhaustive()
    }
}

impl<T: 'static> PushStream<T> {
    /// Wrap a start function: it receives the observer, begins delivering
    /// events, and returns the teardown releasing whatever it acquired.
    pub fn new(start: impl Fn(Observer<T>) -> Teardown + 'static) -> Self {
        Self {
            start: Rc::new(start),
        }
    }

    /// Start the stream. Terminal events close the subscription after
    /// delivery; nothing is delivered once it is closed.
    pub fn subscribe(&self, observer: impl FnMut(StreamEvent<T>) + 'static) -> Subscription {
        let subscription = Subscription::new();
        let guard = subscription.clone();
        let mut observer = observer;
        let wrapped: Observer<T> = Box::new(move |event| {
            if guard.is_closed() {
                return;
            }
            let terminal = event.is_terminal();
            observer(event);
            if terminal {
                guard.unsubscribe();
            }
        });
        let teardown = (self.start)(wrapped);
        subscription.attach(teardown);
        subscription
    }

    /// Derive a stream applying `project` to every value.
    pub fn map<U: 'static>(&self, project: impl Fn(T) -> U + 'static) -> PushStream<U> {
        let start = Rc::clone(&self.start);
        let project = Rc::new(project);
        PushStream::new(move |mut observer: Observer<U>| {
            let project = Rc::clone(&project);
            start(Box::new(move |event| {
                observer(match event {
                    StreamEvent::Next(value) => StreamEvent::Next(project(value)),
                    StreamEvent::Error(err) => StreamEvent::Error(err),
                    StreamEvent::Complete => StreamEvent::Complete,
                })
            }))
        })
    }
}
