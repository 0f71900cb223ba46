//! Tandem Console - Headless Demonstration Surface
//!
//! A line-oriented "UI" for a sample game session, built entirely from the
//! `tandem_core` substrate:
//!
//! - the [`Session`](session::Session) actor is hosted on a
//!   [`WorkerThread`](tandem_core::WorkerThread),
//! - the main thread runs an [`EventLoop`](tandem_core::EventLoop) fed by an
//!   [input reader](input::spawn_reader),
//! - each feature is reached through a [proxy](proxy).

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod commands;
pub mod input;
pub mod proxy;
pub mod session;

pub use app::{App, Output};
pub use commands::{Command, ParseError};
pub use input::{spawn_reader, ConsoleEvent, InputAck, Interrupt};
pub use session::{Charset, Player, ScoreError, Session};
