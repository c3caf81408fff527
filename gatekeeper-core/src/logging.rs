//! Unified logging system
//!
//! Structured logging through `tracing`. Output goes to stderr (or a file) so that
//! command output on stdout stays machine readable.

use serde::{Deserialize, Serialize};
use std::io;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Whether to include file and line information
    pub include_location: bool,
    /// Whether to include thread information
    pub include_thread: bool,
    /// Whether to log to file
    pub log_to_file: bool,
    /// Log file path (if log_to_file is true)
    pub log_file_path: Option<String>,
    /// Custom filter directives
    pub filter_directives: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            include_location: false,
            include_thread: false,
            log_to_file: false,
            log_file_path: None,
            filter_directives: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// Verbose preset used by `--verbose`
    pub fn verbose() -> Self {
        Self {
            level: "debug".to_string(),
            include_location: true,
            filter_directives: vec![
                "gatekeeper=debug".to_string(),
                "gatekeeper_core=debug".to_string(),
                "gatekeeper_client=debug".to_string(),
                "gatekeeper_console=debug".to_string(),
            ],
            ..Self::default()
        }
    }
}

/// Initialize the logging system
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    for directive in &config.filter_directives {
        filter = filter.add_directive(directive.parse()?);
    }

    let writer = if config.log_to_file {
        let Some(log_path) = &config.log_file_path else {
            return Err("log_file_path must be specified when log_to_file is true".into());
        };
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        BoxMakeWriter::new(std::sync::Mutex::new(file))
    } else {
        BoxMakeWriter::new(io::stderr)
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread)
        .with_thread_names(config.include_thread);

    let layer = match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;

    Ok(())
}

/// Operation lifecycle events: start at `debug`, fulfilment at `info`, rejection at `warn`
#[macro_export]
macro_rules! log_operation_start {
    ($operation:expr $(, $($field:tt)*)?) => {
        $crate::tracing::debug!(operation = %$operation, $($($field)*,)? "Operation started")
    };
}

#[macro_export]
macro_rules! log_operation_success {
    ($operation:expr $(, $($field:tt)*)?) => {
        $crate::tracing::info!(operation = %$operation, $($($field)*,)? "Operation fulfilled")
    };
}

#[macro_export]
macro_rules! log_operation_error {
    ($operation:expr, $error:expr $(, $($field:tt)*)?) => {
        $crate::tracing::warn!(
            operation = %$operation,
            error = %$error,
            $($($field)*,)?
            "Operation rejected"
        )
    };
}
