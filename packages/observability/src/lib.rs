//! # Observability
//!
//! Structured logging for the Gatehouse processes.
//!
//! Every Gatehouse process (the controller that serves the API and each
//! remote executor running inside a target execution context) calls
//! [`init_with_config`] once at startup and then logs through the standard
//! `tracing` macros. Output goes to:
//!
//! - an append-only JSONL file (`~/.gatehouse/logs/gatehouse.jsonl` unless
//!   overridden), shared by all processes with per-line flushes
//! - optionally, compact human-readable lines on stderr
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "controller".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//!     tracing::info!("ready");
//! }
//! ```
//!
//! `RUST_LOG` takes precedence over `default_level` when set.

mod json_layer;
mod sink;

use std::path::PathBuf;

pub use json_layer::{JsonLayer, LogEntry};
pub use sink::{LogFileWriter, LogFileWriterFactory};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the process role (e.g., "controller", "executor:profile").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.gatehouse/logs/gatehouse.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize logging with default settings for the given service.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// If the log file cannot be opened, logging falls back to stderr only.
/// Calling this more than once is harmless: later calls are ignored.
pub fn init_with_config(config: LogConfig) {
    sink::install(&config);
}

/// Default location of the shared JSONL log file.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".gatehouse").join("logs").join("gatehouse.jsonl"))
}

pub use tracing::{debug, error, info, instrument, trace, warn, Level};
