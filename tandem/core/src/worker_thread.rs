//! Worker Threads
//!
//! A [`WorkerThread`] owns one OS thread that runs a simple loop:
//!
//! ```text
//! loop {
//!     block until at least one runnable is queued
//!     drain and execute everything queued, in FIFO order
//! } until stopped
//! ```
//!
//! It is the usual home of a long-lived actor such as the game session.
//! Posting is thread-safe from anywhere. Stopping runs every runnable posted
//! before the stop, which is what makes `sync()` barriers reliable.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::config::WorkerConfig;
use crate::dispatcher::{Dispatcher, DispatcherRef, Runnable};
use crate::error::TandemError;

enum WorkerMessage {
    Run(Runnable),
    Stop,
}

#[derive(Default)]
struct WorkerCounters {
    executed: AtomicU64,
    discarded: AtomicU64,
    panicked: AtomicU64,
}

/// Point-in-time counters of a worker thread
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Runnables that ran to completion or panicked
    pub executed: u64,
    /// Runnables posted after the worker stopped
    pub discarded: u64,
    /// Runnables that panicked (the loop survived them)
    pub panicked: u64,
}

/// Dispatcher backed by a dedicated thread
pub struct WorkerThread {
    name: String,
    tx: mpsc::UnboundedSender<WorkerMessage>,
    handle: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
    counters: Arc<WorkerCounters>,
}

impl WorkerThread {
    /// Spawn the thread and start its loop
    ///
    /// # Errors
    ///
    /// Returns [`TandemError::ThreadSpawn`] if the OS refuses to create the thread.
    pub fn spawn(config: &WorkerConfig) -> Result<Arc<Self>, TandemError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(WorkerCounters::default());

        let mut builder = thread::Builder::new().name(config.name.clone());
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let loop_counters = Arc::clone(&counters);
        let loop_name = config.name.clone();
        let handle = builder
            .spawn(move || run_loop(&loop_name, rx, &loop_counters))
            .map_err(|source| TandemError::ThreadSpawn {
                name: config.name.clone(),
                source,
            })?;

        tracing::debug!(worker = %config.name, "Worker thread started");

        Ok(Arc::new(Self {
            name: config.name.clone(),
            tx,
            handle: Mutex::new(Some(handle)),
            stopped: AtomicBool::new(false),
            counters,
        }))
    }

    /// Shared dispatcher handle for binding receivers to this thread
    #[must_use]
    pub fn dispatcher(self: &Arc<Self>) -> DispatcherRef {
        Arc::clone(self) as DispatcherRef
    }

    /// Thread name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `stop` has been requested
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            executed: self.counters.executed.load(Ordering::SeqCst),
            discarded: self.counters.discarded.load(Ordering::SeqCst),
            panicked: self.counters.panicked.load(Ordering::SeqCst),
        }
    }

    /// Stop the loop after everything posted so far has run, then join.
    ///
    /// Idempotent. When called from the worker thread itself the join is
    /// skipped; the loop exits once the current runnable returns.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        // The loop may already be gone if the thread panicked outside a runnable.
        let _ = self.tx.send(WorkerMessage::Stop);

        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            tracing::debug!(worker = %self.name, "Worker stopping itself; not joining");
            return;
        }
        if handle.join().is_err() {
            tracing::error!(worker = %self.name, "Worker thread terminated abnormally");
        }
        tracing::debug!(worker = %self.name, "Worker thread joined");
    }
}

impl Dispatcher for WorkerThread {
    fn post_new_runnable(&self, runnable: Runnable) {
        if self.stopped.load(Ordering::SeqCst) || self.tx.send(WorkerMessage::Run(runnable)).is_err()
        {
            self.counters.discarded.fetch_add(1, Ordering::SeqCst);
            tracing::trace!(worker = %self.name, "Worker stopped, runnable discarded");
        }
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for WorkerThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerThread")
            .field("name", &self.name)
            .field("stopped", &self.is_stopped())
            .field("stats", &self.stats())
            .finish()
    }
}

fn run_loop(
    name: &str,
    mut rx: mpsc::UnboundedReceiver<WorkerMessage>,
    counters: &WorkerCounters,
) {
    while let Some(first) = rx.blocking_recv() {
        let mut next = Some(first);
        while let Some(message) = next.take() {
            match message {
                WorkerMessage::Run(runnable) => execute(name, runnable, counters),
                WorkerMessage::Stop => {
                    tracing::debug!(worker = %name, "Worker loop stopping");
                    return;
                }
            }
            next = rx.try_recv().ok();
        }
    }
}

fn execute(name: &str, runnable: Runnable, counters: &WorkerCounters) {
    if panic::catch_unwind(AssertUnwindSafe(runnable)).is_err() {
        counters.panicked.fetch_add(1, Ordering::SeqCst);
        tracing::error!(worker = %name, "Runnable panicked; worker continues");
    }
    counters.executed.fetch_add(1, Ordering::SeqCst);
}
