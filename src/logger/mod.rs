//! Sensor event logging: the `EventSink` seam, a JSONL writer, and a
//! background logger thread fed through a bounded channel.

#![allow(missing_docs)]

pub mod channel;
pub mod jsonl;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

/// Everything a sensor reports to its log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorEvent {
    /// Device and mount point are known; sampling starts.
    Resolved {
        sensor: String,
        block_device: String,
        mount_point: String,
    },
    /// Resolution failed; sampling proceeds with fallback identifiers.
    ResolutionFailed { sensor: String, error: String },
    /// First probe failure after a healthy stretch.
    ProbeFailed { sensor: String, error: String },
    /// Probe succeeded again after `failures` consecutive failures.
    ProbeRecovered { sensor: String, failures: u32 },
    /// Sentinel to request graceful shutdown of the logger thread.
    Shutdown,
}

impl SensorEvent {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::ResolutionFailed { .. } | Self::ProbeFailed { .. } => Severity::Error,
            Self::Resolved { .. } | Self::ProbeRecovered { .. } | Self::Shutdown => Severity::Info,
        }
    }

    /// Human-readable one-line message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Resolved {
                sensor,
                block_device,
                mount_point,
            } => format!("{sensor}: monitoring partition {block_device} mounted at {mount_point}"),
            Self::ResolutionFailed { sensor, error } => format!("{sensor}: {error}"),
            Self::ProbeFailed { sensor, error } => {
                format!("{sensor}: failed to get storage space usage data: {error}")
            }
            Self::ProbeRecovered { sensor, failures } => format!(
                "{sensor}: storage space usage data available again after {failures} failed probes"
            ),
            Self::Shutdown => "logger shutdown".to_string(),
        }
    }
}

/// Destination for sensor events. Implementations must not block the caller
/// for long; sensors log from their render path.
pub trait EventSink: Send + Sync {
    fn record(&self, event: SensorEvent);
}

/// Sink that prints one line per event to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl EventSink for StderrSink {
    fn record(&self, event: SensorEvent) {
        let level = match event.severity() {
            Severity::Info => "info",
            Severity::Error => "error",
        };
        eprintln!("[SSS] {level}: {}", event.message());
    }
}

/// Sink that keeps every event in memory, for tests and embedding hosts.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SensorEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<SensorEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events at `severity`.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.severity() == severity)
            .count()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: SensorEvent) {
        self.events.lock().push(event);
    }
}
