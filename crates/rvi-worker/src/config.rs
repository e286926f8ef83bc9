//! Worker configuration.
//!
//! Loaded from a TOML file (`rvi-worker serve --config worker.toml`); every
//! key is optional and falls back to [`WorkerConfig::default`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rvi_protocol::{PROTOCOL_MAX, PROTOCOL_MIN};

/// Worker configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Minimum supported protocol version.
    pub protocol_min: i32,
    /// Maximum supported protocol version.
    pub protocol_max: i32,
    /// TCP listen address for `serve`.
    pub listen: String,
    /// Directory under which per-request sandboxes are created.
    pub work_root: PathBuf,
    /// Wall-clock limit for a single shell invocation.
    pub operation_timeout_seconds: u64,
    /// Read/write timeout on accepted connections.
    pub io_timeout_seconds: u64,
    /// Keep sandbox directories after the request completes.
    pub keep_sandboxes: bool,
    /// Maximum size of one request line in bytes.
    pub max_request_bytes: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            protocol_min: PROTOCOL_MIN,
            protocol_max: PROTOCOL_MAX,
            listen: "127.0.0.1:15000".to_string(),
            work_root: std::env::temp_dir().join("rvi-worker"),
            operation_timeout_seconds: 600,
            io_timeout_seconds: 60,
            keep_sandboxes: false,
            max_request_bytes: 256 * 1024 * 1024, // 256 MB
        }
    }
}

/// Errors loading a worker config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl WorkerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: WorkerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol_min > self.protocol_max {
            return Err(ConfigError::InvalidValue {
                field: "protocol_min".to_string(),
                reason: format!(
                    "{} is greater than protocol_max {}",
                    self.protocol_min, self.protocol_max
                ),
            });
        }
        if self.operation_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "operation_timeout_seconds".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.io_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "io_timeout_seconds".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_seconds)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_seconds)
    }
}
