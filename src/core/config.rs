//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SensorError};

/// Default logger channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Full sensor configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SensorConfig {
    /// Block device to watch. `None` auto-detects the device mounted at `/`.
    pub block_device: Option<String>,
    /// Mount table source.
    pub mount_table: PathBuf,
    /// Usage-report executable.
    pub probe_command: String,
    /// Deadline for a single usage probe.
    pub probe_timeout_ms: u64,
    pub log: LogConfig,
}

/// Log sink settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// JSONL log file. `None` writes to stderr.
    pub jsonl_path: Option<PathBuf>,
    pub channel_capacity: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            block_device: None,
            mount_table: PathBuf::from("/proc/mounts"),
            probe_command: "df".to_string(),
            probe_timeout_ms: 5_000,
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            jsonl_path: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl SensorConfig {
    /// Default configuration path (`$HOME/.config/storage-space/config.toml`).
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home = env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("storage-space")
            .join("config.toml")
    }

    /// Config with only the block device set; everything else defaulted.
    #[must_use]
    pub fn for_device(device: impl Into<String>) -> Self {
        Self {
            block_device: Some(device.into()),
            ..Self::default()
        }
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SensorError::Io {
                path: path_buf.clone(),
                source,
            })?;
            Self::from_toml_str(&raw)?
        } else if path.is_some() {
            return Err(SensorError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(|name| env::var(name).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document without touching env or validating.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Probe deadline as a `Duration`.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Apply `SSS_*` overrides using `lookup` to resolve variable names.
    pub fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut var = |name: &str| lookup(name).filter(|raw| !raw.trim().is_empty());

        if let Some(raw) = var("SSS_BLOCK_DEVICE") {
            self.block_device = Some(raw);
        }
        if let Some(raw) = var("SSS_MOUNT_TABLE") {
            self.mount_table = PathBuf::from(raw);
        }
        if let Some(raw) = var("SSS_PROBE_COMMAND") {
            self.probe_command = raw;
        }
        if let Some(raw) = var("SSS_PROBE_TIMEOUT_MS") {
            self.probe_timeout_ms = parse_env_u64("SSS_PROBE_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = var("SSS_LOG_JSONL_PATH") {
            self.log.jsonl_path = Some(PathBuf::from(raw));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(device) = &self.block_device
            && device.trim().is_empty()
        {
            return Err(SensorError::InvalidConfig {
                details: "block_device must not be empty when set".to_string(),
            });
        }
        if self.mount_table.as_os_str().is_empty() {
            return Err(SensorError::InvalidConfig {
                details: "mount_table must not be empty".to_string(),
            });
        }
        if self.probe_command.trim().is_empty() {
            return Err(SensorError::InvalidConfig {
                details: "probe_command must not be empty".to_string(),
            });
        }
        if self.probe_timeout_ms == 0 {
            return Err(SensorError::InvalidConfig {
                details: "probe_timeout_ms must be > 0".to_string(),
            });
        }
        if self.log.channel_capacity == 0 {
            return Err(SensorError::InvalidConfig {
                details: "log.channel_capacity must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| SensorError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
