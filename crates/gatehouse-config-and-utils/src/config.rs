//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default name of the execution context work is shuttled into.
pub const DEFAULT_EXECUTION_CONTEXT: &str = "profile";

/// Integration partner trusted by signing-certificate SHA-256 fingerprint.
///
/// These entries extend the built-in legacy allowlist; they never replace it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedPartner {
    /// Package name of the partner.
    pub package: String,
    /// Hex-encoded SHA-256 of the partner's signing certificate.
    pub sha256: String,
}

impl TrustedPartner {
    /// Decode the hex fingerprint.
    pub fn fingerprint(&self) -> CoreResult<[u8; 32]> {
        let hex = self.sha256.trim();
        if hex.len() != 64 || !hex.is_ascii() {
            return Err(CoreError::Config(format!(
                "sha256 fingerprint of {} must be 64 hex characters",
                self.package
            )));
        }
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| {
                CoreError::Config(format!(
                    "sha256 fingerprint of {} is not valid hex",
                    self.package
                ))
            })?;
        }
        Ok(out)
    }
}

/// Static package registry entry used by the bundled platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Package name.
    pub package: String,
    /// Numeric identity the package runs under.
    pub uid: i64,
    /// Base64-encoded signing certificates.
    #[serde(default)]
    pub certificates: Vec<String>,
    /// Permissions granted to the package.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl PackageRecord {
    /// Decode the base64 signing certificates.
    pub fn decoded_certificates(&self) -> CoreResult<Vec<Vec<u8>>> {
        self.certificates
            .iter()
            .map(|encoded| {
                base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| {
                        CoreError::Config(format!(
                            "invalid certificate for {}: {}",
                            self.package, e
                        ))
                    })
            })
            .collect()
    }
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Execution context that target operations are shuttled into.
    #[serde(default = "default_execution_context")]
    pub execution_context: String,
    /// Numeric identity of this process; the process uid when absent.
    #[serde(default)]
    pub own_uid: Option<i64>,
    /// Partners trusted in addition to the legacy allowlist.
    #[serde(default)]
    pub trusted_partners: Vec<TrustedPartner>,
    /// Packages known to the bundled platform registry.
    #[serde(default)]
    pub packages: Vec<PackageRecord>,
    /// Targets the bundled controller manages.
    #[serde(default)]
    pub known_targets: Vec<String>,
}

fn default_execution_context() -> String {
    DEFAULT_EXECUTION_CONTEXT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            execution_context: default_execution_context(),
            own_uid: None,
            trusted_partners: Vec::new(),
            packages: Vec::new(),
            known_targets: Vec::new(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Only log_level can be overridden at runtime.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("GATEHOUSE_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    /// Check that every entry can be used.
    pub fn validate(&self) -> CoreResult<()> {
        let context = &self.execution_context;
        if context.is_empty()
            || !context
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::Config(format!(
                "execution_context must be a non-empty [A-Za-z0-9_-] name, got {:?}",
                context
            )));
        }
        for partner in &self.trusted_partners {
            partner.fingerprint()?;
        }
        for record in &self.packages {
            record.decoded_certificates()?;
        }
        Ok(())
    }

    /// Numeric identity of this process.
    pub fn own_uid(&self) -> i64 {
        match self.own_uid {
            Some(uid) => uid,
            None => process_uid(),
        }
    }
}

#[cfg(unix)]
fn process_uid() -> i64 {
    // SAFETY: getuid has no preconditions and cannot fail.
    i64::from(unsafe { libc::getuid() })
}

#[cfg(not(unix))]
fn process_uid() -> i64 {
    -1
}
