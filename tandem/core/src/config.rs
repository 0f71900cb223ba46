//! TOML Configuration File Support
//!
//! Centralized configuration for hosts of the substrate, loaded from a TOML
//! file at `~/.config/tandem/tandem.toml`.
//!
//! # Configuration Priority
//!
//! Values are applied with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [worker]
//! name = "session"
//! stack_size_kb = 4096
//! slow_request_threshold_ms = 100
//!
//! [logging]
//! filter = "tandem_core=debug"
//! ```
//!
//! # Environment Variables
//!
//! - `TANDEM_WORKER_NAME`: worker thread name
//! - `TANDEM_WORKER_STACK_KB`: worker stack size in KiB
//! - `TANDEM_SLOW_REQUEST_MS`: slow request warning threshold (0 disables)
//! - `TANDEM_LOG`: tracing filter directives

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest stack a worker thread may be configured with
pub const MIN_STACK_SIZE_KB: usize = 64;

/// Default tracing filter directives
pub const DEFAULT_LOG_FILTER: &str = "tandem_core=info,tandem_console=info";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Worker section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerToml {
    /// Worker thread name
    pub name: Option<String>,

    /// Worker stack size in KiB
    pub stack_size_kb: Option<usize>,

    /// Requests running longer than this are logged (0 disables)
    pub slow_request_threshold_ms: Option<u64>,
}

/// Logging section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingToml {
    /// Tracing filter directives, `RUST_LOG` syntax
    pub filter: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TandemToml {
    /// Worker configuration section
    pub worker: WorkerToml,

    /// Logging configuration section
    pub logging: LoggingToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Settings for one [`WorkerThread`](crate::WorkerThread)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Thread name, visible in debuggers and log records
    pub name: String,
    /// Stack size in bytes (`None` = platform default)
    pub stack_size: Option<usize>,
    /// Requests running longer than this are logged (`ZERO` disables)
    pub slow_request_threshold: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "tandem-session".to_string(),
            stack_size: None,
            slow_request_threshold: Duration::from_millis(100),
        }
    }
}

/// Resolved configuration for a substrate host
#[derive(Clone, Debug)]
pub struct TandemConfig {
    /// Session worker settings
    pub worker: WorkerConfig,

    /// Tracing filter directives
    pub log_filter: String,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for TandemConfig {
    fn default() -> Self {
        Self {
            worker: WorkerConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl TandemConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "worker.name must not be empty".to_string(),
            ));
        }
        if let Some(stack_size) = self.worker.stack_size {
            if stack_size < MIN_STACK_SIZE_KB * 1024 {
                return Err(ConfigError::ValidationError(format!(
                    "worker.stack_size_kb must be at least {MIN_STACK_SIZE_KB}, got {}",
                    stack_size / 1024
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/tandem/tandem.toml` or
/// `~/.config/tandem/tandem.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tandem").join("tandem.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the resulting values are invalid. A missing file is not an error.
pub fn load_config() -> Result<TandemConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if the resulting values are invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<TandemConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<TandemConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = TandemConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: TandemToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env)?;
    config.validate()?;

    Ok(config)
}

/// Convert a stack size in KiB to bytes, rejecting sizes that do not fit
fn stack_size_from_kb(kb: usize) -> Result<usize, ConfigError> {
    kb.checked_mul(1024).ok_or_else(|| {
        ConfigError::ValidationError(format!("worker.stack_size_kb is too large: {kb}"))
    })
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut TandemConfig, toml: &TandemToml) -> Result<(), ConfigError> {
    if let Some(ref name) = toml.worker.name {
        config.worker.name = name.clone();
    }
    if let Some(kb) = toml.worker.stack_size_kb {
        config.worker.stack_size = Some(stack_size_from_kb(kb)?);
    }
    if let Some(ms) = toml.worker.slow_request_threshold_ms {
        config.worker.slow_request_threshold = Duration::from_millis(ms);
    }
    if let Some(ref filter) = toml.logging.filter {
        config.log_filter = filter.clone();
    }
    Ok(())
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut TandemConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = env("TANDEM_WORKER_NAME") {
        config.worker.name = name;
        config.source = ConfigSource::Env;
    }
    if let Some(kb) = env("TANDEM_WORKER_STACK_KB") {
        if let Ok(kb) = kb.parse::<usize>() {
            config.worker.stack_size = Some(stack_size_from_kb(kb)?);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(ms) = env("TANDEM_SLOW_REQUEST_MS") {
        if let Ok(ms) = ms.parse::<u64>() {
            config.worker.slow_request_threshold = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(filter) = env("TANDEM_LOG") {
        config.log_filter = filter;
        config.source = ConfigSource::Env;
    }
    Ok(())
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Worker thread name override
    pub worker_name: Option<String>,

    /// Log filter override
    pub log_filter: Option<String>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set worker name override
    #[must_use]
    pub fn with_worker_name(mut self, name: String) -> Self {
        self.worker_name = Some(name);
        self
    }

    /// Set log filter override
    #[must_use]
    pub fn with_log_filter(mut self, filter: String) -> Self {
        self.log_filter = Some(filter);
        self
    }

    /// Apply overrides to a configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override is invalid.
    pub fn apply(&self, config: &mut TandemConfig) -> Result<(), ConfigError> {
        if self.worker_name.is_some() || self.log_filter.is_some() {
            config.source = ConfigSource::Cli;
        }
        if let Some(ref name) = self.worker_name {
            config.worker.name = name.clone();
        }
        if let Some(ref filter) = self.log_filter {
            config.log_filter = filter.clone();
        }
        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
