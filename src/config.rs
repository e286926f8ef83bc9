//! Client configuration.
//!
//! Read from `--config PATH` when given, else `.rvi/client.toml` in the
//! current directory when present, else built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{Endpoint, TcpTransport};

/// Default config location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".rvi/client.toml";

/// Client configuration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    /// TCP connect timeout.
    pub connect_timeout_seconds: u64,
    /// Read/write timeout once connected. Covers the whole remote pipeline.
    pub io_timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            connect_timeout_seconds: 10,
            io_timeout_seconds: 900,
        }
    }
}

/// Errors loading a client config file.
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

impl ClientConfig {
    /// Load from `explicit` if given, else from [`DEFAULT_CONFIG_PATH`] under
    /// `cwd` if it exists, else defaults.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default_path = cwd.join(DEFAULT_CONFIG_PATH);
        if default_path.is_file() {
            tracing::debug!(path = %default_path.display(), "using client config");
            return Self::load(&default_path);
        }
        Ok(Self::default())
    }

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
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "endpoint.host".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.endpoint.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "endpoint.port".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        for (field, value) in [
            ("connect_timeout_seconds", self.connect_timeout_seconds),
            ("io_timeout_seconds", self.io_timeout_seconds),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Build the TCP transport this configuration describes.
    pub fn transport(&self) -> TcpTransport {
        TcpTransport::new(
            self.endpoint.clone(),
            Duration::from_secs(self.connect_timeout_seconds),
            Duration::from_secs(self.io_timeout_seconds),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, Endpoint::new("127.0.0.1", 15000));
        assert_eq!(config.connect_timeout_seconds, 10);
    }

    #[test]
    fn test_parse_endpoint_table() {
        let config = ClientConfig::parse(
            r#"
            io_timeout_seconds = 60

            [endpoint]
            host = "riscv.local"
            port = 15001
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoint, Endpoint::new("riscv.local", 15001));
        assert_eq!(config.io_timeout_seconds, 60);
        assert_eq!(config.connect_timeout_seconds, 10);
    }

    #[test]
    fn test_partial_endpoint_keeps_default_host() {
        let config = ClientConfig::parse("[endpoint]\nport = 15002").unwrap();
        assert_eq!(config.endpoint.host, "127.0.0.1");
        assert_eq!(config.endpoint.port, 15002);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ClientConfig::parse("[endpoint]\nport = 0").unwrap_err();
        assert!(err.to_string().contains("endpoint.port"));

        let err = ClientConfig::parse("io_timeout_seconds = 0").unwrap_err();
        assert!(err.to_string().contains("io_timeout_seconds"));

        assert!(matches!(
            ClientConfig::parse("[endpoint]\nport = \"x\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_discover_order() {
        let cwd = TempDir::new().unwrap();
        assert_eq!(
            ClientConfig::discover(None, cwd.path()).unwrap(),
            ClientConfig::default()
        );

        std::fs::create_dir_all(cwd.path().join(".rvi")).unwrap();
        std::fs::write(cwd.path().join(DEFAULT_CONFIG_PATH), "[endpoint]\nport = 16000").unwrap();
        assert_eq!(
            ClientConfig::discover(None, cwd.path()).unwrap().endpoint.port,
            16000
        );

        let explicit = cwd.path().join("other.toml");
        std::fs::write(&explicit, "[endpoint]\nport = 17000").unwrap();
        assert_eq!(
            ClientConfig::discover(Some(&explicit), cwd.path())
                .unwrap()
                .endpoint
                .port,
            17000
        );
    }
}
