//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; an empty file yields the defaults.
//!
//! ```toml
//! [connection]
//! host = "192.168.1.20"
//! reconnect_delay_ms = 3000
//!
//! [sampler]
//! frame_rate_hz = 60
//! enabled_devices = ["Pro Controller (Vendor: 057e Product: 2009)"]
//!
//! [[bindings]]
//! device_id = "Pro Controller (Vendor: 057e Product: 2009)"
//! buttons = { A = 1, B = 0, Home = 12 }
//! axes = [{ x = 0, y = 1 }, { x = 3 }]
//! ```

use serde::de::Error;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::binding::{AxisPair, BindingRegistry, ControllerBinding};
use crate::error::{PadBridgeError, Result};
use crate::protocol::{endpoint_url, DEFAULT_HOST, DEFAULT_PORT};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub sampler: SamplerConfig,
    pub bindings: Vec<BindingConfig>,
    pub console: ConsoleConfig,
    pub logging: LoggingConfig,
}

/// Remote endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub secure: bool,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Input sampling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SamplerConfig {
    #[serde(default = "default_frame_rate_hz")]
    pub frame_rate_hz: u32,

    #[serde(default = "default_hotplug_interval_ms")]
    pub hotplug_interval_ms: u64,

    #[serde(default)]
    pub enabled_devices: Vec<String>,
}

/// One externalised controller binding
#[derive(Debug, Deserialize, Clone)]
pub struct BindingConfig {
    pub device_id: String,

    #[serde(default)]
    pub buttons: BTreeMap<String, usize>,

    #[serde(default)]
    pub axes: Vec<AxisPair>,
}

/// Script console configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ConsoleConfig {
    #[serde(default = "default_scripts_path")]
    pub scripts_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub file: Option<PathBuf>,
}

// Default value functions
fn default_host() -> String { DEFAULT_HOST.to_string() }
fn default_port() -> u16 { DEFAULT_PORT }
fn default_reconnect_delay_ms() -> u64 { 3000 }
fn default_connect_timeout_ms() -> u64 { 5000 }

fn default_frame_rate_hz() -> u32 { 60 }
fn default_hotplug_interval_ms() -> u64 { 1000 }

fn default_scripts_path() -> PathBuf { PathBuf::from("scripts.json") }

fn default_log_level() -> String { "info".to_string() }

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secure: false,
            reconnect_delay_ms: default_reconnect_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: default_frame_rate_hz(),
            hotplug_interval_ms: default_hotplug_interval_ms(),
            enabled_devices: Vec::new(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { scripts_path: default_scripts_path() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file: None }
    }
}

impl ConnectionConfig {
    /// `ws://host:port/` or `wss://host:port/`
    pub fn url(&self) -> String {
        endpoint_url(&self.host, self.port, self.secure)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl SamplerConfig {
    /// Time between frame ticks.
    pub fn frame_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.frame_rate_hz.max(1)))
    }

    pub fn hotplug_interval(&self) -> Duration {
        Duration::from_millis(self.hotplug_interval_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pad_bridge::config::Config;
    ///
    /// let config = Config::load("pad-bridge.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in bindings plus the ones from this file. File entries
    /// overwrite built-ins with the same device id.
    pub fn binding_registry(&self) -> BindingRegistry {
        let mut registry = BindingRegistry::with_builtin();
        for entry in &self.bindings {
            registry.register(
                entry.device_id.clone(),
                ControllerBinding::new(
                    entry.buttons.iter().map(|(name, &idx)| (name.clone(), idx)),
                    entry.axes.iter().copied(),
                ),
            );
        }
        registry
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.connection.host.trim().is_empty() {
            return Err(invalid("connection host cannot be empty"));
        }

        if self.connection.port == 0 {
            return Err(invalid("connection port must be between 1 and 65535"));
        }

        if self.connection.reconnect_delay_ms == 0 || self.connection.reconnect_delay_ms > 60000 {
            return Err(invalid("reconnect_delay_ms must be between 1 and 60000"));
        }

        if self.connection.connect_timeout_ms == 0 || self.connection.connect_timeout_ms > 60000 {
            return Err(invalid("connect_timeout_ms must be between 1 and 60000"));
        }

        if self.sampler.frame_rate_hz == 0 || self.sampler.frame_rate_hz > 1000 {
            return Err(invalid("frame_rate_hz must be between 1 and 1000"));
        }

        if self.sampler.hotplug_interval_ms == 0 || self.sampler.hotplug_interval_ms > 60000 {
            return Err(invalid("hotplug_interval_ms must be between 1 and 60000"));
        }

        let mut seen = HashSet::new();
        for binding in &self.bindings {
            if binding.device_id.is_empty() {
                return Err(invalid("binding device_id cannot be empty"));
            }
            if !seen.insert(binding.device_id.as_str()) {
                return Err(invalid(format!(
                    "duplicate binding for device '{}'",
                    binding.device_id
                )));
            }
        }

        if self.console.scripts_path.as_os_str().is_empty() {
            return Err(invalid("console scripts_path cannot be empty"));
        }

        if self.logging.level.trim().is_empty() {
            return Err(invalid("logging level cannot be empty"));
        }

        Ok(())
    }
}

fn invalid(message: impl std::fmt::Display) -> PadBridgeError {
    PadBridgeError::Config(toml::de::Error::custom(message))
}
