#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for hydrofetch
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/hydrofetch/config.toml)
//! - Environment variables
//! - CLI flags

pub mod constants;

use hydrofetch_errors::{ConfigError, Error};
use hydrofetch_types::{default_hosts, ColorChoice, HostDescriptor, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub paths: PathConfig,

    /// Replaces the built-in host table when non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<HostDescriptor>,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
}

/// Bag readiness polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval")]
    pub interval: u64, // seconds
    #[serde(default = "default_settle")]
    pub settle: u64, // seconds
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_interval")]
    pub max_interval: u64, // seconds
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default = "default_max_wait")]
    pub max_wait: Option<u64>, // seconds
}

/// Persistent identifier resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_resolver_endpoint")]
    pub endpoint: String,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub scratch_dir: Option<PathBuf>,
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: 600, // bags can be large
            connect_timeout: 30,
            retries: 0,
            retry_delay: 1,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: constants::DEFAULT_POLL_INTERVAL_SECS,
            settle: constants::DEFAULT_SETTLE_SECS,
            backoff_multiplier: 1.0,
            max_interval: 60,
            max_attempts: None,
            max_wait: Some(constants::DEFAULT_MAX_WAIT_SECS),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::DEFAULT_RESOLVER.to_string(),
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_timeout() -> u64 {
    600
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    0
}

fn default_retry_delay() -> u64 {
    1 // 1 second
}

fn default_poll_interval() -> u64 {
    constants::DEFAULT_POLL_INTERVAL_SECS
}

fn default_settle() -> u64 {
    constants::DEFAULT_SETTLE_SECS
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_max_interval() -> u64 {
    60
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_wait() -> Option<u64> {
    Some(constants::DEFAULT_MAX_WAIT_SECS)
}

fn default_resolver_endpoint() -> String {
    constants::DEFAULT_RESOLVER.to_string()
}

impl PollingConfig {
    /// Poll interval as a duration
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Settling delay as a duration
    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle)
    }

    /// Longest single wait between polls
    #[must_use]
    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval)
    }

    /// Total wait budget, if bounded
    #[must_use]
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait.map(Duration::from_secs)
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir
            .join(constants::APP_DIR)
            .join(constants::CONFIG_FILE))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Reject values that would make polling or matching meaningless
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.polling.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "polling.backoff_multiplier".to_string(),
                value: self.polling.backoff_multiplier.to_string(),
            }
            .into());
        }
        if self.polling.max_attempts == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "polling.max_attempts".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if let Some(host) = self
            .hosts
            .iter()
            .find(|host| host.hostnames.is_empty() || host.bag_endpoint.is_empty())
        {
            return Err(ConfigError::Invalid {
                message: format!("host '{}' needs hostnames and a bag_endpoint", host.name),
            }
            .into());
        }
        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // HYDROFETCH_OUTPUT
        if let Ok(output) = std::env::var("HYDROFETCH_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "HYDROFETCH_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        // HYDROFETCH_COLOR
        if let Ok(color) = std::env::var("HYDROFETCH_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "HYDROFETCH_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        // HYDROFETCH_RESOLVER
        if let Ok(endpoint) = std::env::var("HYDROFETCH_RESOLVER") {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    field: "HYDROFETCH_RESOLVER".to_string(),
                    value: endpoint,
                }
                .into());
            }
            self.resolver.endpoint = endpoint;
        }

        // HYDROFETCH_POLL_INTERVAL
        if let Ok(interval) = std::env::var("HYDROFETCH_POLL_INTERVAL") {
            self.polling.interval = interval.parse().map_err(|_| ConfigError::InvalidValue {
                field: "HYDROFETCH_POLL_INTERVAL".to_string(),
                value: interval,
            })?;
        }

        // HYDROFETCH_MAX_WAIT ("none" lifts the bound)
        if let Ok(max_wait) = std::env::var("HYDROFETCH_MAX_WAIT") {
            self.polling.max_wait = if max_wait == "none" {
                None
            } else {
                Some(max_wait.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "HYDROFETCH_MAX_WAIT".to_string(),
                    value: max_wait,
                })?)
            };
        }

        // HYDROFETCH_SCRATCH_DIR
        if let Ok(dir) = std::env::var("HYDROFETCH_SCRATCH_DIR") {
            self.paths.scratch_dir = Some(PathBuf::from(dir));
        }

        Ok(())
    }

    /// The host table in effect: configured hosts, or the built-in table
    #[must_use]
    pub fn hosts(&self) -> Vec<HostDescriptor> {
        if self.hosts.is_empty() {
            default_hosts().to_vec()
        } else {
            self.hosts.clone()
        }
    }

    /// Get the scratch root (with default)
    #[must_use]
    pub fn scratch_root(&self) -> PathBuf {
        self.paths
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Directory for debug log files
    #[must_use]
    pub fn logs_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(constants::APP_DIR)
            .join("logs")
    }
}
