//! File system paths for the controller and its executors.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// API socket filename under the base directory.
const API_SOCKET_NAME: &str = "gatehouse.sock";
/// PID filename under the base directory.
const PID_FILE_NAME: &str = "gatehouse.pid";
/// Shared JSONL log filename under the logs directory.
const LOG_FILE_NAME: &str = "gatehouse.jsonl";

/// Manages file system paths.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for runtime files (~/.gatehouse)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.gatehouse`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".gatehouse"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.gatehouse).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.gatehouse/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the API socket path (~/.gatehouse/gatehouse.sock).
    pub fn api_socket_file(&self) -> PathBuf {
        self.base_dir.join(API_SOCKET_NAME)
    }

    /// Get the shuttle socket path of an execution context
    /// (~/.gatehouse/shuttle-<context>.sock).
    pub fn shuttle_socket_file(&self, context: &str) -> PathBuf {
        self.base_dir.join(format!("shuttle-{}.sock", context))
    }

    /// Get the PID file path (~/.gatehouse/gatehouse.pid).
    pub fn pid_file(&self) -> PathBuf {
        self.base_dir.join(PID_FILE_NAME)
    }

    /// Get the logs directory (~/.gatehouse/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the shared log file path (~/.gatehouse/logs/gatehouse.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join(LOG_FILE_NAME)
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths_with_base_dir() {
        let base = PathBuf::from("/tmp/test-gatehouse");
        let paths = Paths::with_base_dir(base.clone());

        assert_eq!(paths.base_dir(), &base);
        assert_eq!(paths.config_file(), base.join("config.json"));
        assert_eq!(paths.api_socket_file(), base.join("gatehouse.sock"));
        assert_eq!(
            paths.shuttle_socket_file("profile"),
            base.join("shuttle-profile.sock")
        );
        assert_eq!(paths.pid_file(), base.join("gatehouse.pid"));
        assert_eq!(paths.logs_dir(), base.join("logs"));
        assert_eq!(paths.log_file(), base.join("logs/gatehouse.jsonl"));
    }

    #[test]
    fn test_paths_default() {
        let paths = Paths::new().unwrap();
        let home = dirs::home_dir().unwrap();

        assert_eq!(paths.base_dir(), &home.join(".gatehouse"));
    }

    #[test]
    fn test_ensure_dirs_idempotent() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("gatehouse");
        let paths = Paths::with_base_dir(base.clone());

        assert!(!base.exists());
        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();

        assert!(base.is_dir());
        assert!(paths.logs_dir().is_dir());
    }

    #[test]
    fn test_log_file_inside_logs_dir() {
        let paths = Paths::with_base_dir(PathBuf::from("/test/path"));
        assert!(paths.log_file().starts_with(paths.logs_dir()));
    }
}
