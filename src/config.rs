//! Bridge configuration
//!
//! Loaded from `config.toml` in the user's config directory
//! (`$XDG_CONFIG_HOME/colorbridge/config.toml` on Linux). Every field has a
//! default, so an absent or partial file is fine. The file is only ever read.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Upstream service connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// WebSocket URL (`ws://` or `wss://`)
    pub url: String,
    /// Device name announced in `connect`
    pub name: String,
    /// Device serial announced in `connect`
    pub serial: String,
    /// Shared secret announced in `connect`
    pub passphrase: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080".to_string(),
            name: "colorbridge".to_string(),
            serial: String::new(),
            passphrase: String::new(),
        }
    }
}

/// Serial link to the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub port: String,
    pub baud_rate: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: colorbridge_transport::DEFAULT_BAUD_RATE,
        }
    }
}

/// Periodic temperature reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Grid interval in seconds
    pub interval_secs: u64,
    /// Sensor name used in `sensorLog`
    pub sensor_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            sensor_name: "temperature".to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Complete bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub device: DeviceConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Parse from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, SessionError> {
        let config: Config =
            toml::from_str(content).map_err(|e| SessionError::Config(format!("parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Load the default config file, or defaults if it does not exist
    pub fn load_default() -> Result<Self, SessionError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.telemetry.interval_secs == 0 {
            return Err(SessionError::Config(
                "telemetry.interval_secs must be positive".into(),
            ));
        }
        if !(self.upstream.url.starts_with("ws://") || self.upstream.url.starts_with("wss://")) {
            return Err(SessionError::Config(format!(
                "upstream.url must be a ws:// or wss:// URL, got {:?}",
                self.upstream.url
            )));
        }
        Ok(())
    }
}

/// Path of the default config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("colorbridge").join("config.toml"))
}
