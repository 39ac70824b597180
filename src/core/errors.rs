//! SSS-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SensorError>;

/// Top-level error type for the storage-space sensor.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("[SSS-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SSS-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SSS-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SSS-2001] failed to read {path}: {details}")]
    SourceUnavailable { path: PathBuf, details: String },

    #[error("[SSS-2002] {details}")]
    NotFound { query: String, details: String },

    #[error("[SSS-2101] usage probe failed for {mount_point}: {details}")]
    ProbeFailure { mount_point: String, details: String },

    #[error("[SSS-3001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SSS-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SSS-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl SensorError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SSS-1001",
            Self::MissingConfig { .. } => "SSS-1002",
            Self::ConfigParse { .. } => "SSS-1003",
            Self::SourceUnavailable { .. } => "SSS-2001",
            Self::NotFound { .. } => "SSS-2002",
            Self::ProbeFailure { .. } => "SSS-2101",
            Self::Serialization { .. } => "SSS-3001",
            Self::Io { .. } => "SSS-3002",
            Self::Runtime { .. } => "SSS-3900",
        }
    }

    /// Whether retrying on a later tick might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. }
                | Self::ProbeFailure { .. }
                | Self::Io { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for probe failures.
    #[must_use]
    pub fn probe(mount_point: &str, details: impl Into<String>) -> Self {
        Self::ProbeFailure {
            mount_point: mount_point.to_string(),
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for SensorError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SensorError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
