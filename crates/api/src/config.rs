//! Server configuration
//!
//! Configuration is layered, highest precedence first:
//! 1. Environment variables prefixed with `PLANT_RELAY__` (`__` separates
//!    sections, e.g. `PLANT_RELAY__HTTP__PORT=8080`)
//! 2. The TOML file at `PLANT_RELAY_CONFIG` (default `plant-relay.toml`), if present
//! 3. Compiled defaults, filled in by `#[serde(default)]` for any key left unset

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;

use crate::rate_limit::RateLimitConfig;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "PLANT_RELAY_CONFIG";

/// Config file used when `PLANT_RELAY_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "plant-relay.toml";

const ENV_PREFIX: &str = "PLANT_RELAY";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config load error: {0}")]
    Load(#[from] config::ConfigError),
    #[error("config invalid: {0}")]
    Invalid(String),
}

/// Top-level server configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub rate_limit: RateLimitConfig,
    pub metrics: MetricsConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and mount `/metrics`
    pub enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://flower".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ServerConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot reject on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url cannot be empty".into()));
        }

        if self.rate_limit.enabled
            && (self.rate_limit.replenish_period_secs == 0 || self.rate_limit.burst_size == 0)
        {
            return Err(ConfigError::Invalid(
                "rate_limit.replenish_period_secs and rate_limit.burst_size must be non-zero"
                    .into(),
            ));
        }

        Ok(())
    }

    /// Socket address the server binds to
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.http.host, self.http.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("invalid http bind: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.http.port, 5000);
        assert_eq!(config.database.url, "sqlite://flower");
        assert!(config.metrics.enabled);
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let config = ServerConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[http]\nport = 8081\n\n[database]\nurl = \"sqlite::memory:\"\n\n[rate_limit]\nenabled = false"
        )
        .unwrap();

        let config = ServerConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.http.port, 8081);
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_sample_config_takes_effect() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"[http]
host = "127.0.0.1"
port = 5001

[database]
url = "sqlite://flower"

[logging]
level = "debug"
json = true

[rate_limit]
enabled = true
per_second = 30
burst_size = 4

[metrics]
enabled = false"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:5001");
        assert_eq!(config.database.url, "sqlite://flower");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.rate_limit.replenish_period_secs, 30);
        assert_eq!(config.rate_limit.burst_size, 4);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_invalid_host_rejected() {
        let mut config = ServerConfig::default();
        config.http.host = "not a host".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_burst_rejected() {
        let mut config = ServerConfig::default();
        config.rate_limit.burst_size = 0;
        assert!(config.validate().is_err());

        config.rate_limit.enabled = false;
        assert!(config.validate().is_ok());
    }
}
