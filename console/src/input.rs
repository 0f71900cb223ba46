//! Input reader
//!
//! Lines are read on a dedicated thread and fed to the UI event loop as
//! [`ConsoleEvent`]s. A line is only sent once the previous one has been
//! acknowledged, so a command is fully handled, and the session replies it
//! triggered are queued on the UI thread, before the next command arrives.
//!
//! The reader keeps reading while it waits for an acknowledgement. A
//! `cancel` line is not queued behind the running command: it goes straight
//! to that command through an [`Interrupt`].

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tandem_core::{DispatcherExt, DispatcherRef, EventSender};
use tokio::sync::mpsc;

/// Input line that interrupts the running command
pub const CANCEL: &str = "cancel";

/// Native events of the console surface
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// One line of input, without the trailing newline
    Line(String),
    /// Input is exhausted
    Eof,
}

/// Handle the UI thread uses to let the reader continue
#[derive(Clone, Debug)]
pub struct InputAck {
    tx: mpsc::UnboundedSender<()>,
}

impl InputAck {
    /// Signal that the last event has been handled
    pub fn ack(&self) {
        let _ = self.tx.send(());
    }
}

/// Cancellation requests for the command currently being handled.
///
/// Lines are numbered from 1 in the order they are sent. A request names
/// the line it targets and is delivered through the app's wait indicator,
/// so it lands while the command is blocked on the session.
#[derive(Clone)]
pub struct Interrupt {
    dispatcher: DispatcherRef,
    cancelled: Arc<AtomicU64>,
}

impl Interrupt {
    pub(crate) fn new(dispatcher: DispatcherRef, cancelled: Arc<AtomicU64>) -> Self {
        Self {
            dispatcher,
            cancelled,
        }
    }

    /// Ask the command read from line `line` to stop.
    ///
    /// Line 0 names no command and is ignored by the app.
    pub fn cancel(&self, line: u64) {
        let cancelled = Arc::clone(&self.cancelled);
        self.dispatcher.post(move || {
            tracing::debug!(line, "Cancel requested");
            cancelled.store(line, Ordering::Relaxed);
        });
    }
}

impl std::fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interrupt")
            .field("cancelled", &self.cancelled.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Spawn the reader thread
///
/// With an [`Interrupt`], `cancel` lines are consumed by the reader and
/// target the last line sent. Without one they are sent like any other line.
/// The thread stops at end of input, on a read error, or once the event
/// loop or every [`InputAck`] is gone.
///
/// # Errors
///
/// Returns an error if the thread cannot be spawned.
pub fn spawn_reader<R>(
    input: R,
    events: EventSender<ConsoleEvent>,
    interrupt: Option<Interrupt>,
) -> io::Result<(JoinHandle<()>, InputAck)>
where
    R: BufRead + Send + 'static,
{
    let (tx, mut acks) = mpsc::unbounded_channel();
    let handle = thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            let mut sent: u64 = 0;
            let mut awaiting_ack = false;
            for line in input.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!(error = %e, "Input read failed");
                        break;
                    }
                };
                if let Some(interrupt) = &interrupt {
                    if line.trim().eq_ignore_ascii_case(CANCEL) {
                        interrupt.cancel(sent);
                        continue;
                    }
                }
                if (awaiting_ack && acks.blocking_recv().is_none())
                    || !events.send(ConsoleEvent::Line(line))
                {
                    tracing::debug!("Event loop gone, input reader stopping");
                    return;
                }
                sent += 1;
                awaiting_ack = true;
            }
            if awaiting_ack && acks.blocking_recv().is_none() {
                return;
            }
            events.send(ConsoleEvent::Eof);
            tracing::debug!(lines = sent, "Input exhausted");
        })?;
    Ok((handle, InputAck { tx }))
}
