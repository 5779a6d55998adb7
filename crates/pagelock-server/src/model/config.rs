//! Configuration management for the page lock server
//!
//! Settings are layered: `conf/application.yml` (optional), then environment
//! variables such as `PAGELOCK_SERVER__PORT`, then command line flags.

use std::time::Duration;

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use pagelock_core::StreamConfig;

use super::constants::{
    DEFAULT_ANONYMOUS_HOLDER, DEFAULT_CHANNEL_CAPACITY, DEFAULT_CONFIG_FILE,
    DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_LOG_LEVEL, DEFAULT_LOG_ROTATION, DEFAULT_SERVER_ADDRESS, DEFAULT_SERVER_PORT,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS, ENV_PREFIX, LOCK_ANONYMOUS_HOLDER_PROPERTY,
    LOGS_CONSOLE_PROPERTY, LOGS_FILE_PROPERTY, LOGS_LEVEL_PROPERTY, LOGS_PATH_PROPERTY, LOGS_ROTATION_PROPERTY,
    SERVER_ADDRESS_PROPERTY, SERVER_PORT_PROPERTY, SERVER_SHUTDOWN_TIMEOUT_PROPERTY,
    STREAM_CHANNEL_CAPACITY_PROPERTY, STREAM_HEARTBEAT_INTERVAL_PROPERTY,
};
use crate::startup::LoggingConfig;

/// Command line arguments for the server
#[derive(Debug, Default, Parser)]
#[command(name = "pagelock-server", version, about = "Page lock server with live lock events")]
pub struct Cli {
    /// Configuration file to load instead of conf/application.yml
    #[arg(short = 'c', long = "config")]
    pub config_file: Option<String>,
    /// Address to bind the HTTP server to
    #[arg(short = 'a', long = "address")]
    pub address: Option<String>,
    /// Port to bind the HTTP server to
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load configuration using the process's command line arguments.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(args: Cli) -> Result<Self, ConfigError> {
        let config_file = args
            .config_file
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut config_builder = Config::builder()
            .add_source(File::with_name(&config_file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Some(v) = args.address {
            config_builder = config_builder.set_override(SERVER_ADDRESS_PROPERTY, v)?;
        }
        if let Some(v) = args.port {
            config_builder = config_builder.set_override(SERVER_PORT_PROPERTY, i64::from(v))?;
        }

        Ok(Self::from_config(config_builder.build()?))
    }

    pub fn from_config(config: Config) -> Self {
        Configuration { config }
    }

    // ========================================================================
    // Server Configuration
    // ========================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string(SERVER_ADDRESS_PROPERTY)
            .unwrap_or(DEFAULT_SERVER_ADDRESS.to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config
            .get_int(SERVER_PORT_PROPERTY)
            .ok()
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        let secs = self
            .config
            .get_int(SERVER_SHUTDOWN_TIMEOUT_PROPERTY)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    // ========================================================================
    // Stream Configuration
    // ========================================================================

    pub fn heartbeat_interval(&self) -> Duration {
        let millis = self
            .config
            .get_int(STREAM_HEARTBEAT_INTERVAL_PROPERTY)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS);
        Duration::from_millis(millis)
    }

    pub fn channel_capacity(&self) -> usize {
        self.config
            .get_int(STREAM_CHANNEL_CAPACITY_PROPERTY)
            .ok()
            .and_then(|v| usize::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            heartbeat_interval: self.heartbeat_interval(),
            channel_capacity: self.channel_capacity(),
        }
    }

    // ========================================================================
    // Lock Configuration
    // ========================================================================

    /// Holder recorded when a lock request carries no user id
    pub fn anonymous_holder(&self) -> String {
        self.config
            .get_string(LOCK_ANONYMOUS_HOLDER_PROPERTY)
            .unwrap_or(DEFAULT_ANONYMOUS_HOLDER.to_string())
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string(LOGS_PATH_PROPERTY).ok(),
            self.config.get_bool(LOGS_CONSOLE_PROPERTY).unwrap_or(true),
            self.config.get_bool(LOGS_FILE_PROPERTY).unwrap_or(false),
            self.config
                .get_string(LOGS_LEVEL_PROPERTY)
                .unwrap_or(DEFAULT_LOG_LEVEL.to_string()),
            self.config
                .get_string(LOGS_ROTATION_PROPERTY)
                .unwrap_or(DEFAULT_LOG_ROTATION.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::startup::LogRotation;

    fn config_with(overrides: &[(&str, &str)]) -> Configuration {
        let mut builder = Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        Configuration::from_config(builder.build().unwrap())
    }

    #[test]
    fn test_defaults() {
        let configuration = Configuration::default();

        assert_eq!(configuration.server_address(), "0.0.0.0");
        assert_eq!(configuration.server_port(), 8080);
        assert_eq!(configuration.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(configuration.anonymous_holder(), "Anonymous");
        assert_eq!(configuration.stream_config(), StreamConfig::default());

        let logging = configuration.logging_config();
        assert!(logging.console_output);
        assert!(!logging.file_logging);
    }

    #[test]
    fn test_overrides() {
        let configuration = config_with(&[
            ("server.port", "9090"),
            ("stream.heartbeat_interval_ms", "500"),
            ("stream.channel_capacity", "8"),
            ("lock.anonymous_holder", "guest"),
            ("logs.rotation", "never"),
        ]);

        assert_eq!(configuration.server_port(), 9090);
        assert_eq!(configuration.heartbeat_interval(), Duration::from_millis(500));
        assert_eq!(configuration.channel_capacity(), 8);
        assert_eq!(configuration.anonymous_holder(), "guest");
        assert_eq!(configuration.logging_config().rotation, LogRotation::Never);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let configuration = config_with(&[
            ("server.port", "70000"),
            ("stream.heartbeat_interval_ms", "0"),
            ("stream.channel_capacity", "-1"),
        ]);

        assert_eq!(configuration.server_port(), 8080);
        assert_eq!(configuration.heartbeat_interval(), Duration::from_secs(15));
        assert_eq!(configuration.channel_capacity(), 64);
    }

    #[test]
    fn test_cli_overrides() {
        let configuration = Configuration::from_cli(Cli {
            config_file: Some("does-not-exist.yml".to_string()),
            address: Some("127.0.0.1".to_string()),
            port: Some(3000),
        })
        .unwrap();

        assert_eq!(configuration.server_address(), "127.0.0.1");
        assert_eq!(configuration.server_port(), 3000);
    }
}
