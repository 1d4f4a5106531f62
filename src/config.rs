//! # Configuration Management
//!
//! Centralized configuration for the dispatch core.
//!
//! This module provides wire-format constants shared across the crate and a
//! structured configuration for diagnostics and hook defaults.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - TOML strings via `from_toml()`
//! - Environment variable overrides via `from_env()`

use crate::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Frame header length: u16 length prefix plus u16 opcode.
pub const FRAME_HEADER_LEN: usize = 4;

/// Byte offset of the little-endian opcode within a frame.
pub const OPCODE_OFFSET: usize = 2;

/// Opcode of the client version-check message snooped for dynamic protocol
/// negotiation before a protocol version has been set.
pub const CHECK_VERSION_OPCODE: u16 = 19900;

/// Definition version the version-check message is parsed under.
pub const CHECK_VERSION_DEF: u32 = 1;

/// Separator byte between system-message tokens (vertical tab).
pub const SYSMSG_SEPARATOR: char = '\u{b}';

/// Default cap on hex-dumped frame bytes in error logs.
pub const DEFAULT_MAX_DUMP_BYTES: usize = 256;

/// Dispatch configuration covering diagnostics and hook defaults.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DispatchConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Diagnostics configuration
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Hook defaults
    #[serde(default)]
    pub hooks: HookConfig,
}

impl DispatchConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| DispatchError::Config(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| DispatchError::Config(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| DispatchError::Config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("PACKET_DISPATCH_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(bytes) = std::env::var("PACKET_DISPATCH_MAX_DUMP_BYTES") {
            if let Ok(val) = bytes.parse::<usize>() {
                config.diagnostics.max_dump_bytes = val;
            }
        }

        if let Ok(timeout) = std::env::var("PACKET_DISPATCH_HOOK_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.hooks.default_timeout = Some(Duration::from_millis(val));
            }
        }

        Ok(config)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter directive (e.g. "info", "packet_dispatch=debug")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Diagnostics configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Maximum number of frame bytes included in error-path hex dumps
    pub max_dump_bytes: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_dump_bytes: DEFAULT_MAX_DUMP_BYTES,
        }
    }
}

/// Hook defaults
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct HookConfig {
    /// Timeout applied to hooks registered without an explicit one.
    /// `None` leaves hooks unarmed.
    #[serde(default, with = "humantime_millis")]
    pub default_timeout: Option<Duration>,
}

/// Serde adapter storing optional durations as integral milliseconds.
mod humantime_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let ms: Option<u64> = Option::deserialize(d)?;
        Ok(ms.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DispatchConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.diagnostics.max_dump_bytes, DEFAULT_MAX_DUMP_BYTES);
        assert!(config.hooks.default_timeout.is_none());
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            [logging]
            level = "debug"

            [diagnostics]
            max_dump_bytes = 64

            [hooks]
            default_timeout = 5000
        "#;

        let config = DispatchConfig::from_toml(toml).expect("valid toml");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.diagnostics.max_dump_bytes, 64);
        assert_eq!(
            config.hooks.default_timeout,
            Some(Duration::from_millis(5000))
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = DispatchConfig::from_toml("[logging]\nlevel = \"trace\"").expect("valid");
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.diagnostics.max_dump_bytes, DEFAULT_MAX_DUMP_BYTES);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(DispatchConfig::from_toml("logging = 3").is_err());
    }
}
