//! Logging setup
//!
//! Hosts call [`init`] once at startup. `RUST_LOG`, when set, takes
//! precedence over the configured directives.

use tracing_subscriber::EnvFilter;

use crate::error::TandemError;

/// Install a global `tracing` subscriber writing to stderr
///
/// # Errors
///
/// Returns [`TandemError::Logging`] if the directives do not parse or a
/// global subscriber is already installed.
pub fn init(default_filter: &str) -> Result<(), TandemError> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(default_filter),
    }
    .map_err(|e| TandemError::Logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| TandemError::Logging(e.to_string()))
}
