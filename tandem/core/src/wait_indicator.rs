//! Wait Indicator
//!
//! A [`WaitIndicator`] lets a thread that runs no event loop of its own make
//! a synchronous round trip to an actor. It plays two roles at once:
//!
//! - **Dispatcher**: [`WaitIndicator::dispatcher`] accepts runnables from any
//!   thread and queues them for the indicator's owner.
//! - **Waiter**: [`WaitIndicator::wait`] blocks until a reply is posted with
//!   [`WaitIndicator::post`]. Runnables that arrive meanwhile are executed
//!   inline, one at a time, and the wait resumes. For the duration of the
//!   call, `wait()` *is* the thread's event loop.
//!
//! ```text
//!   caller thread                         actor thread
//!   ─────────────                         ────────────
//!   call(sender, f) ──post request──────▶ f(&mut target)
//!   wait() ◀─────── runnable: post(true) ─┘
//!     ├─ task? run inline, keep waiting
//!     └─ reply? return it
//! ```
//!
//! At most one reply may be outstanding per indicator. Posting a second one
//! before the first is consumed is a programming error.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::dispatcher::{Dispatcher, DispatcherExt, DispatcherRef, Runnable};
use crate::sender::Sender;

enum Wake {
    Task(Runnable),
    Reply,
}

/// The part of a wait indicator other threads can reach
struct Inbox {
    tx: mpsc::UnboundedSender<Wake>,
    result: Mutex<Option<bool>>,
}

impl Inbox {
    fn post_result(&self, result: bool) {
        {
            let mut slot = self.result.lock();
            debug_assert!(slot.is_none(), "second reply posted before the first was consumed");
            if slot.is_some() {
                tracing::error!("Second reply posted before the first was consumed");
            }
            *slot = Some(result);
        }
        // Wakes a blocked wait(); the slot is checked before every block.
        let _ = self.tx.send(Wake::Reply);
    }
}

impl Dispatcher for Inbox {
    fn post_new_runnable(&self, runnable: Runnable) {
        if self.tx.send(Wake::Task(runnable)).is_err() {
            tracing::trace!("Wait indicator gone, runnable discarded");
        }
    }
}

/// Thread-safe handle for posting the reply a [`WaitIndicator`] waits for
#[derive(Clone)]
pub struct ReplyHandle {
    inbox: Arc<Inbox>,
}

impl ReplyHandle {
    /// Record the reply and wake the waiter
    pub fn post(&self, result: bool) {
        self.inbox.post_result(result);
    }
}

impl std::fmt::Debug for ReplyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyHandle").finish_non_exhaustive()
    }
}

/// Blocking synchronous-call coordinator that doubles as a dispatcher
pub struct WaitIndicator {
    inbox: Arc<Inbox>,
    rx: mpsc::UnboundedReceiver<Wake>,
}

impl WaitIndicator {
    /// Create an indicator for the current thread
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inbox: Arc::new(Inbox {
                tx,
                result: Mutex::new(None),
            }),
            rx,
        }
    }

    /// Dispatcher whose runnables execute inside [`wait`](Self::wait) or
    /// [`process_queue`](Self::process_queue) on the owning thread
    #[must_use]
    pub fn dispatcher(&self) -> DispatcherRef {
        Arc::clone(&self.inbox) as DispatcherRef
    }

    /// Handle for posting the reply from any thread
    #[must_use]
    pub fn reply_handle(&self) -> ReplyHandle {
        ReplyHandle {
            inbox: Arc::clone(&self.inbox),
        }
    }

    /// Record the reply and wake the waiter
    pub fn post(&self, result: bool) {
        self.inbox.post_result(result);
    }

    /// Block until a reply is posted, executing queued runnables meanwhile.
    ///
    /// Returns the posted reply. Has no timeout: if nothing ever posts a
    /// reply, this never returns.
    pub fn wait(&mut self) -> bool {
        loop {
            if let Some(result) = self.inbox.result.lock().take() {
                return result;
            }
            match self.rx.blocking_recv() {
                Some(Wake::Task(runnable)) => runnable(),
                Some(Wake::Reply) => {}
                // The inbox holds a sender, so the channel cannot close while we exist.
                None => return false,
            }
        }
    }

    /// Execute every runnable queued right now without blocking.
    ///
    /// A pending reply stays recorded for the next [`wait`](Self::wait).
    /// Returns the number of runnables executed.
    pub fn process_queue(&mut self) -> usize {
        let mut executed = 0;
        while let Ok(wake) = self.rx.try_recv() {
            if let Wake::Task(runnable) = wake {
                runnable();
                executed += 1;
            }
        }
        executed
    }

    /// Run `f` on the target behind `sender` and block until it returns.
    ///
    /// Returns `None` when the request was discarded without running, e.g.
    /// because the receiver is gone or the request panicked. Runnables posted
    /// to this indicator meanwhile execute inline.
    pub fn call<T, R, F>(&mut self, sender: &Sender<T>, f: F) -> Option<R>
    where
        T: 'static,
        R: Send + 'static,
        F: FnOnce(&mut T) -> R + Send + 'static,
    {
        let (result_tx, mut result_rx) = oneshot::channel();
        let confirm = Confirm::new(self.dispatcher(), self.reply_handle());

        sender.post_with_completion(
            Box::new(move |target: &mut T| {
                let _ = result_tx.send(f(target));
            }),
            Box::new(move || confirm.complete()),
        );

        if self.wait() {
            result_rx.try_recv().ok()
        } else {
            None
        }
    }

    /// Block until every request posted to `sender`'s target before this
    /// call has finished executing. For a narrowed sender this includes
    /// dropping the adaptor built for the barrier itself.
    ///
    /// Returns `false` if the target is gone.
    pub fn sync<T: 'static>(&mut self, sender: &Sender<T>) -> bool {
        self.call(sender, |_| ()).is_some()
    }
}

impl Default for WaitIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WaitIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitIndicator")
            .field("reply_pending", &self.inbox.result.lock().is_some())
            .finish_non_exhaustive()
    }
}

/// Posts the round-trip outcome back to the waiter exactly once.
///
/// Completing posts `true`; being dropped unexecuted posts `false`, so a
/// discarded request never leaves its caller blocked.
struct Confirm {
    target: Option<(DispatcherRef, ReplyHandle)>,
}

impl Confirm {
    fn new(dispatcher: DispatcherRef, reply: ReplyHandle) -> Self {
        Self {
            target: Some((dispatcher, reply)),
        }
    }

    fn complete(mut self) {
        self.send(true);
    }

    fn send(&mut self, result: bool) {
        if let Some((dispatcher, reply)) = self.target.take() {
            dispatcher.post(move || reply.post(result));
        }
    }
}

impl Drop for Confirm {
    fn drop(&mut self) {
        self.send(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::InlineDispatcher;
    use crate::receiver::Receiver;
    use std::thread;

    #[test]
    fn test_wait_returns_posted_value() {
        let mut ind = WaitIndicator::new();
        let reply = ind.reply_handle();
        let poster = thread::spawn(move || reply.post(false));
        assert!(!ind.wait());
        poster.join().unwrap();
    }

    #[test]
    fn test_reply_posted_as_task() {
        let mut ind = WaitIndicator::new();
        let reply = ind.reply_handle();
        ind.dispatcher().post(move || reply.post(true));
        assert!(ind.wait());
    }

    #[test]
    fn test_process_queue_keeps_reply() {
        let mut ind = WaitIndicator::new();
        let reply = ind.reply_handle();
        let dispatcher = ind.dispatcher();

        dispatcher.post(|| {});
        dispatcher.post(move || reply.post(true));
        assert_eq!(ind.process_queue(), 2);
        assert_eq!(ind.process_queue(), 0);
        assert!(ind.wait());
    }

    #[test]
    fn test_call_inline_target() {
        let mut ind = WaitIndicator::new();
        let receiver = Receiver::new(InlineDispatcher::shared(), vec![1, 2, 3]);
        let sum = ind.call(&receiver.sender(), |v: &mut Vec<i32>| v.iter().sum::<i32>());
        assert_eq!(sum, Some(6));
    }

    #[test]
    fn test_call_dead_target_returns_none() {
        let mut ind = WaitIndicator::new();
        let receiver = Receiver::new(InlineDispatcher::shared(), 0u8);
        let sender = receiver.sender();
        drop(receiver);

        assert_eq!(ind.call(&sender, |n: &mut u8| *n), None);
        assert!(!ind.sync(&sender));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "second reply")]
    fn test_double_reply_asserts() {
        let ind = WaitIndicator::new();
        ind.post(true);
        ind.post(true);
    }
}
