//! Receivers
//!
//! A [`Receiver`] binds a live target object to the dispatcher whose thread
//! is allowed to touch it, and hands out [`Sender`]s that reach it.
//!
//! # Lifetime
//!
//! The receiver is the only strong owner of the target's mailbox. Senders and
//! queued delivery capsules hold weak references, so dropping the receiver
//! makes every request that has not started yet fall on the floor:
//!
//! ```text
//!  Sender ──post──▶ Dispatcher queue ──run──▶ capsule ──upgrade──▶ Mailbox<T>
//!                                                  │                   ▲
//!                                                  └── dead? discard   │ Arc
//!                                                                 Receiver<T>
//! ```
//!
//! A request that is already running keeps the mailbox alive until it
//! returns; dropping the receiver never interrupts it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::dispatcher::{DispatcherRef, Runnable};
use crate::request::BoxedRequest;
use crate::sender::Sender;

/// A request plus the hook to fire once it has fully run
type Delivery<T> = (BoxedRequest<T>, Option<Runnable>);

/// Shared cell holding the target, reachable from delivery capsules
pub(crate) struct Mailbox<T> {
    /// The target. Only the dispatcher thread locks it, so it is uncontended
    target: Mutex<T>,
    /// Thread currently inside `handle`, for reentrancy detection
    handling_on: Mutex<Option<ThreadId>>,
    /// Requests delivered on `handling_on` while the target was busy
    nested: Mutex<VecDeque<Delivery<T>>>,
    /// Human-readable name used in log records
    label: String,
    /// Slow request threshold in milliseconds, 0 = disabled
    slow_threshold_ms: AtomicU64,
    /// Requests that exceeded the threshold
    slow_requests: AtomicU64,
}

impl<T> Mailbox<T> {
    fn new(target: T, label: String) -> Self {
        Self {
            target: Mutex::new(target),
            handling_on: Mutex::new(None),
            nested: Mutex::new(VecDeque::new()),
            label,
            slow_threshold_ms: AtomicU64::new(0),
            slow_requests: AtomicU64::new(0),
        }
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }
}

impl<T: 'static> Mailbox<T> {
    /// Run one request against the target, then fire `completion`.
    ///
    /// A request delivered on the thread that is already handling this
    /// target is queued and runs right after the current one returns, in
    /// delivery order.
    pub(crate) fn execute(&self, request: BoxedRequest<T>, completion: Option<Runnable>) {
        let current = thread::current().id();

        let mut target = match self.target.try_lock() {
            Some(guard) => guard,
            None => {
                if *self.handling_on.lock() == Some(current) {
                    tracing::trace!(receiver = %self.label, "Nested request queued");
                    self.nested.lock().push_back((request, completion));
                    return;
                }
                self.target.lock()
            }
        };

        *self.handling_on.lock() = Some(current);
        self.run(&mut target, request, completion);
        loop {
            let next = self.nested.lock().pop_front();
            let Some((request, completion)) = next else {
                break;
            };
            self.run(&mut target, request, completion);
        }
        *self.handling_on.lock() = None;
    }

    fn run(&self, target: &mut T, request: BoxedRequest<T>, completion: Option<Runnable>) {
        let started = Instant::now();
        request.handle(target);
        let elapsed = started.elapsed();

        let threshold_ms = self.slow_threshold_ms.load(Ordering::Relaxed);
        if threshold_ms > 0 && elapsed >= Duration::from_millis(threshold_ms) {
            self.slow_requests.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                receiver = %self.label,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                threshold_ms,
                "Slow request; synchronous callers were blocked meanwhile"
            );
        }

        if let Some(completion) = completion {
            completion();
        }
    }
}

/// Owner of the binding between a live target and its dispatcher
///
/// Not `Clone`: exactly one receiver exists per target. Dropping it discards
/// every request that has not started executing.
pub struct Receiver<T> {
    mailbox: Arc<Mailbox<T>>,
    dispatcher: DispatcherRef,
}

impl<T: Send + 'static> Receiver<T> {
    /// Bind `target` to `dispatcher`, labelled with the target's type name.
    ///
    /// The slow-request check starts disabled.
    pub fn new(dispatcher: DispatcherRef, target: T) -> Self {
        Self::with_label(dispatcher, target, short_type_name::<T>())
    }

    /// Bind `target` to `dispatcher` under an explicit label for log records
    pub fn with_label(dispatcher: DispatcherRef, target: T, label: impl Into<String>) -> Self {
        let label = label.into();
        tracing::debug!(receiver = %label, "Receiver bound");
        Self {
            mailbox: Arc::new(Mailbox::new(target, label)),
            dispatcher,
        }
    }

    /// Issue a sender that reaches this receiver's target
    #[must_use]
    pub fn sender(&self) -> Sender<T> {
        Sender::direct(Arc::clone(&self.dispatcher), Arc::downgrade(&self.mailbox))
    }

    /// Warn whenever a single request runs longer than `threshold`.
    ///
    /// `Duration::ZERO` disables the check.
    pub fn set_slow_request_threshold(&self, threshold: Duration) {
        let ms = u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX);
        self.mailbox.slow_threshold_ms.store(ms, Ordering::Relaxed);
    }

    /// Builder form of [`Receiver::set_slow_request_threshold`]
    #[must_use]
    pub fn with_slow_request_threshold(self, threshold: Duration) -> Self {
        self.set_slow_request_threshold(threshold);
        self
    }
}

impl<T> Receiver<T> {
    /// Label used in log records
    #[must_use]
    pub fn label(&self) -> &str {
        self.mailbox.label()
    }

    /// Dispatcher requests to this target run on
    #[must_use]
    pub fn dispatcher(&self) -> &DispatcherRef {
        &self.dispatcher
    }

    /// Number of requests that ran longer than the slow-request threshold
    #[must_use]
    pub fn slow_request_count(&self) -> u64 {
        self.mailbox.slow_requests.load(Ordering::Relaxed)
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        tracing::debug!(receiver = %self.mailbox.label(), "Receiver dropped");
    }
}

impl<T> std::fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("label", &self.mailbox.label())
            .field("senders", &Arc::weak_count(&self.mailbox))
            .finish()
    }
}

/// Last path segment of a type name, e.g. `Session` for `game::session::Session`
fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
