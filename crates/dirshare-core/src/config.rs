//! Configuration system for DirShare
//!
//! Supports TOML configuration files with sensible defaults. Configuration
//! is loaded from:
//! - macOS: ~/Library/Application Support/dirshare/config.toml
//! - Linux: ~/.config/dirshare/config.toml
//! - Windows: %APPDATA%/dirshare/config.toml
//!
//! This layer exists purely for the engine's own tunables (scan interval,
//! chunk sizing, transport selection); it is not involved in CLI argument
//! parsing, which `dirshare-cli` owns directly.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{CHUNK_SIZE, CHUNK_THRESHOLD, DEFAULT_SCAN_INTERVAL_SECS};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub transfer: TransferConfig,
    pub transport: TransportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            transfer: TransferConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

/// Directory-scanner tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Polling interval, `T_scan` in the design ("default 2 seconds").
    pub scan_interval_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
        }
    }
}

/// Chunking thresholds for the outbound publisher / chunk reassembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Files at or above this size are sent in chunks.
    pub chunk_threshold_bytes: u64,
    /// Size of each chunk for large-file transfer.
    pub chunk_size_bytes: u64,
    /// Target pacing delay between chunks, in milliseconds (a tuning
    /// knob, not a correctness property).
    pub chunk_pacing_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_threshold_bytes: CHUNK_THRESHOLD,
            chunk_size_bytes: CHUNK_SIZE,
            chunk_pacing_ms: 10,
        }
    }
}

/// Which [`Transport`](dirshare_engine::transport::Transport) implementation
/// to construct. Only `loopback` ships in this repository; other values are
/// accepted so a deployment can wire in its own pub/sub backend without a
/// config-schema change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: "loopback".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// on any error (missing file, unreadable, unparsable).
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                warn!("failed to load config from {:?}: {}, using defaults", path, e);
                Self::default()
            }),
            None => {
                debug!("no config directory found, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        info!("loaded config from {:?}", path);
        Ok(config)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<(), ConfigError> {
        match Self::default_path() {
            Some(path) => self.save_to(&path),
            None => Err(ConfigError::NoConfigDir),
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

        info!("saved config to {:?}", path);
        Ok(())
    }

    /// Default config file path, following the OS-native convention via
    /// `directories::ProjectDirs`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dirshare", "dirshare").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Render a sample TOML configuration (used by `dirshare config init`).
    pub fn sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Configuration errors.
#[derive(Debug, Clone)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Serialize(String),
    NoConfigDir,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Parse(e) => write!(f, "parse error: {}", e),
            ConfigError::Serialize(e) => write!(f, "serialization error: {}", e),
            ConfigError::NoConfigDir => write!(f, "no configuration directory available"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_documented_constants() {
        let config = Config::default();
        assert_eq!(config.scan.scan_interval_secs, 2);
        assert_eq!(config.transfer.chunk_threshold_bytes, 10 * 1024 * 1024);
        assert_eq!(config.transfer.chunk_size_bytes, 1024 * 1024);
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.scan.scan_interval_secs, config.scan.scan_interval_secs);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults_for_missing_sections() {
        let toml_str = r#"
            [scan]
            scan_interval_secs = 5
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scan.scan_interval_secs, 5);
        assert_eq!(config.transfer.chunk_pacing_ms, 10);
    }

    #[test]
    fn load_from_missing_path_uses_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/dirshare-config.toml")).unwrap();
        assert_eq!(config.scan.scan_interval_secs, 2);
    }

    #[test]
    fn sample_contains_every_section() {
        let sample = Config::sample();
        assert!(sample.contains("[scan]"));
        assert!(sample.contains("[transfer]"));
        assert!(sample.contains("[transport]"));
    }
}
