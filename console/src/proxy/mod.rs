//! Feature Proxies
//!
//! Each proxy is the UI-side facade of one feature of the [`Session`]
//! actor. Proxies live on the UI thread, hold only senders and signals, and
//! never touch session state directly:
//!
//! | Proxy | Synchronous | Asynchronous (signal) |
//! |-------|-------------|-----------------------|
//! | [`TurnProxy`] | `current_turn` | `advance` (`sig_turn_changed`) |
//! | [`PlayerProxy`] | `list` | `search` (`sig_results`), `add_score` (`sig_score`) |
//! | [`FileProxy`] | `list`, `read` | |
//!
//! [`Session`]: crate::session::Session

pub mod file;
pub mod player;
pub mod turn;

pub use file::{FileError, FileProxy, FileView};
pub use player::{PlayerProxy, PlayerReplies, ScoreUpdate};
pub use turn::{TurnProxy, TurnReplies};
