//! Logging initialization.
//!
//! Thin wrappers over the observability crate. Every process writes
//! structured JSONL to `<base>/logs/gatehouse.jsonl` and echoes compact
//! lines to stderr.

use crate::Paths;
use observability::LogConfig;

/// Initialize logging for the controller with the default log location.
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("controller started");
/// ```
pub fn init_logging(level: &str) {
    observability::init_with_config(LogConfig {
        service_name: "controller".into(),
        default_level: level.into(),
        also_stderr: true,
        ..Default::default()
    });
}

/// Initialize logging for a named service writing under `paths`.
///
/// Executors use `executor:<context>` so their lines can be told apart from
/// the controller's in the shared log file.
pub fn init_logging_for_service(service_name: &str, level: &str, paths: &Paths) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr: true,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
