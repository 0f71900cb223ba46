//! Dispatchers
//!
//! A dispatcher is the destination half of "run this later, on my thread".
//! It exposes exactly one operation, posting a [`Runnable`], and offers no
//! way to learn whether or when the work ran.
//!
//! # Implementations
//!
//! - [`WorkerThread`](crate::WorkerThread): a dedicated thread draining its queue
//! - [`EventLoop`](crate::EventLoop): the UI thread, interleaving native input events
//! - [`WaitIndicator`](crate::WaitIndicator): a caller blocked in a synchronous round trip
//! - [`InlineDispatcher`]: runs work immediately on the posting thread
//!
//! A dispatcher whose thread has already exited must keep accepting posts.
//! Such work is silently discarded.

use std::sync::Arc;

/// A zero-argument unit of work executed once on a dispatcher's thread
pub type Runnable = Box<dyn FnOnce() + Send + 'static>;

/// Shared handle to a dispatcher
pub type DispatcherRef = Arc<dyn Dispatcher>;

/// Destination for work that must run on one particular thread
pub trait Dispatcher: Send + Sync {
    /// Enqueue a runnable for later execution on this dispatcher's thread.
    ///
    /// Never blocks and never fails from the caller's point of view.
    fn post_new_runnable(&self, runnable: Runnable);
}

/// Convenience methods available on every dispatcher
pub trait DispatcherExt: Dispatcher {
    /// Box a closure and post it
    fn post<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_new_runnable(Box::new(f));
    }
}

impl<D: Dispatcher + ?Sized> DispatcherExt for D {}

impl<D: Dispatcher + ?Sized> Dispatcher for Arc<D> {
    fn post_new_runnable(&self, runnable: Runnable) {
        (**self).post_new_runnable(runnable);
    }
}

/// Dispatcher that runs every runnable immediately on the posting thread
///
/// Useful for targets that are already confined to the caller's thread, and
/// for tests that want deterministic, synchronous delivery.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineDispatcher;

impl InlineDispatcher {
    /// Create a shared handle to an inline dispatcher
    #[must_use]
    pub fn shared() -> DispatcherRef {
        Arc::new(Self)
    }
}

impl Dispatcher for InlineDispatcher {
    fn post_new_runnable(&self, runnable: Runnable) {
        runnable();
    }
}
