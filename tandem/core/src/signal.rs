//! Signals
//!
//! A [`Signal`] is a multicast callback list. Proxies raise signals from their
//! reply handlers; UI code subscribes with [`Signal::add`]. Delivery is
//! synchronous and happens on the thread calling [`Signal::raise`], which for
//! proxy replies is always the UI thread.
//!
//! Subscriptions are owned by the returned [`Connection`]: dropping it
//! disconnects the observer.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Slot<A> = Arc<Mutex<Box<dyn FnMut(&A) + Send>>>;

struct Observers<A> {
    next_id: u64,
    slots: Vec<(u64, Slot<A>)>,
}

/// Multicast, same-thread callback primitive
pub struct Signal<A> {
    observers: Arc<Mutex<Observers<A>>>,
}

impl<A: 'static> Signal<A> {
    /// Create a signal with no observers
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: Arc::new(Mutex::new(Observers {
                next_id: 0,
                slots: Vec::new(),
            })),
        }
    }

    /// Subscribe an observer. It stays connected while the returned
    /// [`Connection`] lives.
    pub fn add<F>(&self, observer: F) -> Connection
    where
        F: FnMut(&A) + Send + 'static,
    {
        let boxed: Box<dyn FnMut(&A) + Send> = Box::new(observer);
        let id = {
            let mut observers = self.observers.lock();
            let id = observers.next_id;
            observers.next_id += 1;
            observers.slots.push((id, Arc::new(Mutex::new(boxed))));
            id
        };

        let weak: Weak<Mutex<Observers<A>>> = Arc::downgrade(&self.observers);
        Connection {
            disconnect: Some(Box::new(move || {
                if let Some(observers) = weak.upgrade() {
                    observers.lock().slots.retain(|(slot_id, _)| *slot_id != id);
                }
            })),
        }
    }

    /// Invoke every connected observer, in subscription order.
    ///
    /// Observers added or removed by an observer take effect on the next
    /// raise. An observer that raises the same signal recursively is skipped
    /// for the nested raise.
    pub fn raise(&self, args: &A) {
        let snapshot: Vec<Slot<A>> = self
            .observers
            .lock()
            .slots
            .iter()
            .map(|(_, slot)| Arc::clone(slot))
            .collect();

        for slot in snapshot {
            if let Some(mut observer) = slot.try_lock() {
                (*observer)(args);
            } else {
                tracing::trace!("Observer already running, skipped for nested raise");
            }
        }
    }

    /// Number of connected observers
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.lock().slots.len()
    }
}

impl<A: 'static> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Signal<A> {
    fn clone(&self) -> Self {
        Self {
            observers: Arc::clone(&self.observers),
        }
    }
}

impl<A> std::fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("observers", &self.observers.lock().slots.len())
            .finish()
    }
}

/// Subscription handle returned by [`Signal::add`]
#[must_use = "dropping a Connection disconnects the observer immediately"]
pub struct Connection {
    disconnect: Option<Box<dyn FnOnce() + Send>>,
}

impl Connection {
    /// Keep the observer connected for the lifetime of the signal
    pub fn detach(mut self) {
        self.disconnect = None;
    }

    /// Disconnect now (same as dropping)
    pub fn disconnect(self) {}
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("attached", &self.disconnect.is_some())
            .finish()
    }
}
