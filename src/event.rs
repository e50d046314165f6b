//! Synchronous event emitter
//!
//! Observers are invoked in registration order on the caller's thread, during
//! the call that caused the transition. The subscriber list is snapshotted
//! before dispatch, so handlers may subscribe, unsubscribe or call back into
//! the emitting object without deadlocking.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::track::Encoding;

/// Handle returned by [`EventEmitter::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Notifications emitted by a [`SimulcastTrack`](crate::SimulcastTrack)
#[derive(Debug, Clone)]
pub enum TrackEvent {
    /// A member encoding was mirrored into the aggregate
    Encoding(Encoding),
    /// Attach count went from 0 to 1
    Attached,
    /// Attach count went from 1 to 0
    Detached,
    /// The aggregate was stopped (terminal)
    Stopped,
}

/// Kind of a [`TrackEvent`], without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEventKind {
    Encoding,
    Attached,
    Detached,
    Stopped,
}

impl TrackEvent {
    /// Get the payload-free kind of this event
    pub fn kind(&self) -> TrackEventKind {
        match self {
            TrackEvent::Encoding(_) => TrackEventKind::Encoding,
            TrackEvent::Attached => TrackEventKind::Attached,
            TrackEvent::Detached => TrackEventKind::Detached,
            TrackEvent::Stopped => TrackEventKind::Stopped,
        }
    }
}

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Subscriber<E> {
    id: SubscriptionId,
    once: bool,
    handler: Handler<E>,
}

struct EmitterState<E> {
    subscribers: Vec<Subscriber<E>>,
    next_id: u64,
    torn_down: bool,
}

/// Typed observer list with on / once / off semantics
pub struct EventEmitter<E> {
    state: Mutex<EmitterState<E>>,
}

impl<E> EventEmitter<E> {
    /// Create an empty emitter
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EmitterState {
                subscribers: Vec::new(),
                next_id: 1,
                torn_down: false,
            }),
        }
    }

    /// Subscribe to every event
    pub fn on<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(handler), false)
    }

    /// Subscribe to the next event only
    pub fn once<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(handler), true)
    }

    fn subscribe(&self, handler: Handler<E>, once: bool) -> SubscriptionId {
        let mut state = self.state.lock();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;

        // Torn-down emitters hand out ids but never store handlers
        if !state.torn_down {
            state.subscribers.push(Subscriber { id, once, handler });
        }
        id
    }

    /// Remove a subscription
    ///
    /// Returns false if the id is unknown or already fired (for `once`).
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|s| s.id != id);
        state.subscribers.len() != before
    }

    /// Deliver an event to all current subscribers
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: &E) -> usize {
        let handlers: Vec<Handler<E>> = {
            let mut state = self.state.lock();
            if state.torn_down {
                return 0;
            }
            let handlers = state
                .subscribers
                .iter()
                .map(|s| Arc::clone(&s.handler))
                .collect();
            state.subscribers.retain(|s| !s.once);
            handlers
        };

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Drop all subscribers and ignore every later emit
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        state.subscribers.clear();
        state.torn_down = true;
    }

    /// Check whether [`teardown`](Self::teardown) was called
    pub fn is_torn_down(&self) -> bool {
        self.state.lock().torn_down
    }

    /// Number of live subscriptions
    pub fn listener_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventEmitter")
            .field("subscribers", &state.subscribers.len())
            .field("torn_down", &state.torn_down)
            .finish()
    }
}
