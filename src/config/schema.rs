//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::port::PortConfiguration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device path (`/dev/ttyUSB0`, `COM3`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Line settings passed to the serial driver
    pub port: PortConfiguration,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check the configuration for settings the port would refuse.
    pub fn validate(&self) -> ConfigResult<()> {
        self.port
            .validate()
            .map_err(|e| ConfigError::validation("port", e.to_string()))?;

        if let Some(device) = &self.device {
            if device.trim().is_empty() {
                return Err(ConfigError::validation("device", "must not be empty"));
            }
        }

        Ok(())
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive: "trace", "debug", "info", "warn", "error", or a
    /// full `EnvFilter` expression. `RUST_LOG` takes precedence.
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Pretty => f.write_str("pretty"),
            Self::Compact => f.write_str("compact"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{DataBits, Parity};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.device, None);
        assert_eq!(config.port.baud_rate, 9600);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            device: Some("/dev/ttyS0".to_string()),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("device = \"/dev/ttyS0\""));
        assert!(toml_str.contains("[port]"));
        assert!(toml_str.contains("[logging]"));
        assert!(!toml_str.contains("timeout"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            device = "/dev/ttyACM0"

            [port]
            baud_rate = 57600
            data_bits = "seven"
            parity = "odd"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.device.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.port.baud_rate, 57600);
        assert_eq!(config.port.data_bits, DataBits::Seven);
        assert_eq!(config.port.parity, Parity::Odd);
        // Defaults should still work
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_timeout_fails_validation() {
        let toml_str = r#"
            [port]
            baud_rate = 9600
            write_timeout_ms = 500
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("write_timeout_ms"));
    }

    #[test]
    fn test_blank_device_fails_validation() {
        let config = Config {
            device: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { ref key, .. }) if key == "device"
        ));
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("fancy".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
    }
}
