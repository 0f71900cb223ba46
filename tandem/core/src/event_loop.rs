//! UI Event Loop
//!
//! The [`EventLoop`] is the dispatcher of the UI thread. One queue carries
//! both native input events (keyboard lines, resize notifications, whatever
//! the surface produces) and runnables posted from other threads, so replies
//! from the session actor interleave with user input in arrival order.
//!
//! Proxies bind their reply receivers to [`EventLoop::dispatcher`]; input
//! producers feed events through an [`EventSender`].

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::dispatcher::{Dispatcher, DispatcherRef, Runnable};

/// What the event handler wants the loop to do next
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopControl {
    /// Keep running
    Continue,
    /// Leave [`EventLoop::run`]
    Quit,
}

enum Item<E> {
    Event(E),
    Task(Runnable),
}

struct LoopInbox<E> {
    tx: mpsc::UnboundedSender<Item<E>>,
}

impl<E: Send + 'static> Dispatcher for LoopInbox<E> {
    fn post_new_runnable(&self, runnable: Runnable) {
        if self.tx.send(Item::Task(runnable)).is_err() {
            tracing::trace!("Event loop gone, runnable discarded");
        }
    }
}

/// Thread-safe handle for injecting native events into an [`EventLoop`]
pub struct EventSender<E> {
    tx: mpsc::UnboundedSender<Item<E>>,
}

impl<E> EventSender<E> {
    /// Queue an event. Returns `false` if the loop no longer exists.
    pub fn send(&self, event: E) -> bool {
        self.tx.send(Item::Event(event)).is_ok()
    }
}

impl<E> Clone for EventSender<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E> std::fmt::Debug for EventSender<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Blocking UI-thread loop interleaving native events with posted work
pub struct EventLoop<E> {
    inbox: Arc<LoopInbox<E>>,
    rx: mpsc::UnboundedReceiver<Item<E>>,
    /// Events seen by `process_pending` that `run` has not handled yet
    deferred: VecDeque<E>,
}

impl<E: Send + 'static> EventLoop<E> {
    /// Create a loop for the current thread
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inbox: Arc::new(LoopInbox { tx }),
            rx,
            deferred: VecDeque::new(),
        }
    }

    /// Dispatcher for binding UI-side receivers to this loop
    #[must_use]
    pub fn dispatcher(&self) -> DispatcherRef {
        Arc::clone(&self.inbox) as DispatcherRef
    }

    /// Handle for feeding native events from any thread
    #[must_use]
    pub fn event_sender(&self) -> EventSender<E> {
        EventSender {
            tx: self.inbox.tx.clone(),
        }
    }

    /// Run until `handler` returns [`LoopControl::Quit`].
    ///
    /// Posted runnables execute as they arrive; each event is passed to
    /// `handler`.
    pub fn run<H>(&mut self, mut handler: H)
    where
        H: FnMut(E) -> LoopControl,
    {
        tracing::debug!("Event loop running");
        loop {
            let event = match self.deferred.pop_front() {
                Some(event) => event,
                None => match self.rx.blocking_recv() {
                    Some(Item::Task(runnable)) => {
                        runnable();
                        continue;
                    }
                    Some(Item::Event(event)) => event,
                    None => break,
                },
            };
            if handler(event) == LoopControl::Quit {
                break;
            }
        }
        tracing::debug!("Event loop finished");
    }

    /// Execute every runnable queued right now without blocking.
    ///
    /// Events stay queued for the next [`run`](Self::run). Returns the number
    /// of runnables executed.
    pub fn process_pending(&mut self) -> usize {
        let mut executed = 0;
        while let Ok(item) = self.rx.try_recv() {
            match item {
                Item::Task(runnable) => {
                    runnable();
                    executed += 1;
                }
                Item::Event(event) => self.deferred.push_back(event),
            }
        }
        executed
    }
}

impl<E: Send + 'static> Default for EventLoop<E> {
    fn default() -> Self {
        Self::new()
    }
}
