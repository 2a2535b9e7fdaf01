//! Configuration management for Panel Sync
//!
//! Loads and validates the YAML configuration file. Every section is
//! optional; a missing file section falls back to its defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

use crate::gpio::{default_pins, PinSpec};
use crate::peer::DEFAULT_DEVICE_NAME;
use crate::state::persistence::DEFAULT_NAMESPACE;

/// Default HTTP port (GPIO page, peer bridge, state API)
pub const DEFAULT_API_PORT: u16 = 8080;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub touchscreen: TouchscreenConfig,
    #[serde(default)]
    pub peer: PeerConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub gpio: GpioConfig,
}

/// Serial touchscreen
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TouchscreenConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Device node (`/dev/ttyUSB0`) or `tcp://host:port` serial bridge
    #[serde(default = "default_touchscreen_port")]
    pub port: String,
}

/// Wireless peer link
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PeerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

/// Durable control store
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceConfig {
    /// Database directory; defaults to the state directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// HTTP server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

/// GPIO output table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GpioConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_pins")]
    pub pins: Vec<PinSpec>,
}

impl Default for TouchscreenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_touchscreen_port(),
        }
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_name: default_device_name(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: None,
            namespace: default_namespace(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_api_port(),
        }
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pins: default_pins(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document means "all defaults"
        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.touchscreen.enabled && self.touchscreen.port.trim().is_empty() {
            anyhow::bail!("touchscreen.port cannot be empty");
        }
        if let Some(addr) = self.touchscreen.port.strip_prefix("tcp://") {
            if !addr.contains(':') {
                anyhow::bail!("touchscreen.port '{}' must be tcp://host:port", self.touchscreen.port);
            }
        }

        if self.peer.device_name.is_empty() {
            anyhow::bail!("peer.device_name cannot be empty");
        }

        if self.persistence.namespace.is_empty() {
            anyhow::bail!("persistence.namespace cannot be empty");
        }

        if self.api.enabled && self.api.port == 0 {
            anyhow::bail!("api.port cannot be 0");
        }

        let mut seen = HashSet::new();
        for spec in &self.gpio.pins {
            if spec.label.is_empty() {
                anyhow::bail!("GPIO {} label cannot be empty", spec.pin);
            }
            if !seen.insert(spec.pin) {
                anyhow::bail!("GPIO {} is declared twice", spec.pin);
            }
        }

        Ok(())
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_touchscreen_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_device_name() -> String { DEFAULT_DEVICE_NAME.to_string() }
fn default_namespace() -> String { DEFAULT_NAMESPACE.to_string() }
fn default_api_port() -> u16 { DEFAULT_API_PORT }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_yaml("").unwrap();
        assert!(config.touchscreen.enabled);
        assert_eq!(config.touchscreen.port, "/dev/ttyUSB0");
        assert_eq!(config.peer.device_name, "ESP32-IC905");
        assert_eq!(config.persistence.namespace, "ui");
        assert_eq!(config.api.port, DEFAULT_API_PORT);
        assert_eq!(config.gpio.pins.len(), 10);
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_yaml(
            r#"
touchscreen:
  port: tcp://192.168.1.40:4000
peer:
  enabled: false
gpio:
  pins:
    - { pin: 2, label: LED }
"#,
        )
        .unwrap();

        assert_eq!(config.touchscreen.port, "tcp://192.168.1.40:4000");
        assert!(config.touchscreen.enabled);
        assert!(!config.peer.enabled);
        assert_eq!(config.peer.device_name, "ESP32-IC905");
        assert_eq!(config.gpio.pins, vec![PinSpec::new(2, "LED")]);
    }

    #[test]
    fn test_validation_errors() {
        assert!(AppConfig::from_yaml("peer:\n  device_name: ''\n").is_err());
        assert!(AppConfig::from_yaml("persistence:\n  namespace: ''\n").is_err());
        assert!(AppConfig::from_yaml("touchscreen:\n  port: tcp://nohost\n").is_err());
        assert!(AppConfig::from_yaml(
            "gpio:\n  pins:\n    - { pin: 2, label: a }\n    - { pin: 2, label: b }\n"
        )
        .is_err());
        assert!(AppConfig::from_yaml("api:\n  port: 0\n").is_err());
    }

    #[test]
    fn test_disabled_touchscreen_may_omit_port() {
        assert!(AppConfig::from_yaml("touchscreen:\n  enabled: false\n  port: ''\n").is_ok());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = AppConfig::default();
        config.api.port = 9000;
        config.persistence.path = Some("/var/lib/panel".into());
        config.save(&path).await.unwrap();

        let loaded = AppConfig::load(&path).await.unwrap();
        assert_eq!(loaded.api.port, 9000);
        assert_eq!(loaded.persistence.path.as_deref(), Some("/var/lib/panel"));
        assert_eq!(loaded.gpio.pins, default_pins());
    }
}
