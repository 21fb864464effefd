//! Logging setup for eventdoc.
//!
//! This crate provides:
//! - Structured logging (JSON or pretty) through `tracing-subscriber`
//! - Standard event names and `log_*!` macros for run milestones
//!
//! # Usage
//!
//! ```ignore
//! use eventdoc_telemetry::{LogFormat, TelemetryConfig};
//!
//! let config = TelemetryConfig::new()
//!     .with_log_level("debug")
//!     .with_log_format(LogFormat::Json);
//!
//! eventdoc_telemetry::init(&config)?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::{events, init_logging as init};

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The configured log level is not a valid filter directive.
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),
}
