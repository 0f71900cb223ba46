//! Tandem Core - Cross-Thread Request/Response Substrate
//!
//! This crate lets a responsive, single-threaded UI event loop drive a
//! separate, single-threaded actor (typically the game session) that owns all
//! mutable state. No locks are needed in feature code: exclusion comes from
//! the rule that only one thread ever touches a given target.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────── UI thread ────────────────────────────┐
//! │  EventLoop (Dispatcher)        native events + posted runnables  │
//! │    │                                                              │
//! │    ├── Proxy A ── Sender<Session> ────────────┐                   │
//! │    │     └── Receiver<Replies> ◀──────────┐   │                   │
//! │    └── WaitIndicator (sync round trips)   │   │                   │
//! └───────────────────────────────────────────┼───┼───────────────────┘
//!                                             │   │
//! ┌──────────────────────── session thread ───┼───▼───────────────────┐
//! │  WorkerThread (Dispatcher)                │                       │
//! │    └── Receiver<Session> ── Request::handle(&mut Session)         │
//! │                               └── reply via Sender<Replies> ──────┘
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Dispatcher`]: "run this unit of work on thread X, eventually"
//! - [`Request`]: a unit of work closed over a typed target
//! - [`Sender`]: copyable capability to post requests to a target
//! - [`Receiver`]: owns the target and its binding to a dispatcher
//! - [`WorkerThread`]: a dispatcher with its own thread
//! - [`EventLoop`]: the UI thread's dispatcher
//! - [`WaitIndicator`]: blocking synchronous round trips that keep pumping work
//! - [`Signal`]: multicast same-thread callbacks for proxy replies
//! - [`ProxyBase`]: reusable core of a feature proxy
//!
//! # Quick Start
//!
//! ```ignore
//! use tandem_core::{Receiver, WaitIndicator, WorkerConfig, WorkerThread};
//!
//! let worker = WorkerThread::spawn(&WorkerConfig::default())?;
//! let session = Receiver::new(worker.dispatcher(), Vec::<String>::new());
//! let sender = session.sender();
//!
//! sender.post_request(|log: &mut Vec<String>| log.push("hello".into()));
//!
//! let mut ind = WaitIndicator::new();
//! let len = ind.call(&sender, |log: &mut Vec<String>| log.len());
//! assert_eq!(len, Some(1));
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event_loop;
pub mod logging;
pub mod proxy;
pub mod receiver;
pub mod request;
pub mod sender;
pub mod signal;
pub mod wait_indicator;
pub mod worker_thread;

// Re-exports for convenience
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, TandemConfig, TandemToml, WorkerConfig,
};
pub use dispatcher::{Dispatcher, DispatcherExt, DispatcherRef, InlineDispatcher, Runnable};
pub use error::TandemError;
pub use event_loop::{EventLoop, EventSender, LoopControl};
pub use proxy::ProxyBase;
pub use receiver::Receiver;
pub use request::{BoxedRequest, Request};
pub use sender::Sender;
pub use signal::{Connection, Signal};
pub use wait_indicator::{ReplyHandle, WaitIndicator};
pub use worker_thread::{WorkerStats, WorkerThread};
