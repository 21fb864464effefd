//! Structured logging with JSON or pretty output.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{
    fmt, fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
    Layer,
};

/// Initialize the logging subsystem.
///
/// Sets up tracing-subscriber with either JSON or pretty format,
/// respecting the configured log level unless `RUST_LOG` is set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.log_level)?,
    };

    let writer = if config.stderr {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    match config.log_format {
        LogFormat::Json => init_json_logging(filter, writer),
        LogFormat::Pretty => init_pretty_logging(filter, writer),
    }
}

/// Parse a level or filter directive list such as `info` or `eventdoc_resolver=debug`.
pub fn parse_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(level).map_err(|_| TelemetryError::InvalidLevel(level.to_string()))
}

fn init_json_logging(filter: EnvFilter, writer: BoxMakeWriter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_writer(writer)
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

fn init_pretty_logging(filter: EnvFilter, writer: BoxMakeWriter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .pretty()
        .with_writer(writer)
        .with_target(false)
        .without_time()
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// A generation or check run is starting.
    pub const RUN_STARTED: &str = "run_started";

    /// A service was resolved and its outputs written.
    pub const SERVICE_RESOLVED: &str = "service_resolved";

    /// A service could not be resolved and was skipped.
    pub const SERVICE_SKIPPED: &str = "service_skipped";

    /// An event title matched no document.
    pub const EVENT_SOFT_MISS: &str = "event_soft_miss";

    /// The relation index was built and frozen.
    pub const INDEX_BUILT: &str = "index_built";

    /// A run finished.
    pub const RUN_COMPLETED: &str = "run_completed";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to ensure consistent field naming.
#[macro_export]
macro_rules! log_run_started {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::RUN_STARTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_service_resolved {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::SERVICE_RESOLVED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_service_skipped {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::SERVICE_SKIPPED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_event_soft_miss {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::EVENT_SOFT_MISS,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_index_built {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::INDEX_BUILT,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_run_completed {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::RUN_COMPLETED,
            $($field)*
        )
    };
}
