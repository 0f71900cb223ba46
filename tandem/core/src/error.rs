//! Setup errors
//!
//! The request path never reports errors: posts always "succeed" and domain
//! failures travel inside request results. Only fallible setup (spawning
//! threads, loading configuration, installing the log subscriber) returns
//! [`TandemError`].

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while setting up the substrate
#[derive(Debug, Error)]
pub enum TandemError {
    /// The OS refused to create a worker thread
    #[error("Failed to spawn worker thread {name}: {source}")]
    ThreadSpawn {
        /// Requested thread name
        name: String,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// The tracing subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TandemError::ThreadSpawn {
            name: "session".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::OutOfMemory, "no threads left"),
        };
        let msg = format!("{err}");
        assert!(msg.contains("session"));
        assert!(msg.contains("no threads left"));

        let err: TandemError = ConfigError::ValidationError("bad".to_string()).into();
        assert_eq!(format!("{err}"), "Invalid configuration: bad");
    }
}
