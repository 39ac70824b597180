//! JSONL logger: append-only line-delimited JSON for machine-friendly log consumption.
//!
//! Each line is a self-contained JSON object written with a single `write_all`
//! so a tailing reader never sees a partial line.
//!
//! Three-level fallback chain:
//! 1. Configured file path
//! 2. stderr with `[SSS-JSONL]` prefix
//! 3. Silent discard (a panel must never crash for logging failures)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SensorError};
use crate::logger::{SensorEvent, Severity};

/// Event type identifiers as written to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Resolved,
    ResolutionFailed,
    ProbeFailed,
    ProbeRecovered,
}

/// A single JSONL log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    pub sensor: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<u32>,
}

impl LogEntry {
    /// Build an entry stamped with the current UTC time. `Shutdown` has no entry.
    #[must_use]
    pub fn from_event(event: &SensorEvent) -> Option<Self> {
        let (kind, sensor) = match event {
            SensorEvent::Resolved { sensor, .. } => (EventType::Resolved, sensor),
            SensorEvent::ResolutionFailed { sensor, .. } => (EventType::ResolutionFailed, sensor),
            SensorEvent::ProbeFailed { sensor, .. } => (EventType::ProbeFailed, sensor),
            SensorEvent::ProbeRecovered { sensor, .. } => (EventType::ProbeRecovered, sensor),
            SensorEvent::Shutdown => return None,
        };
        let mut entry = Self {
            ts: format_utc_now(),
            event: kind,
            severity: event.severity(),
            sensor: sensor.clone(),
            message: event.message(),
            block_device: None,
            mount_point: None,
            failures: None,
        };
        match event {
            SensorEvent::Resolved {
                block_device,
                mount_point,
                ..
            } => {
                entry.block_device = Some(block_device.clone());
                entry.mount_point = Some(mount_point.clone());
            }
            SensorEvent::ProbeRecovered { failures, .. } => entry.failures = Some(*failures),
            _ => {}
        }
        Some(entry)
    }
}

/// Degradation state of the JSONL writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    File,
    Stderr,
    Discard,
}

/// Append-only JSONL log writer with stderr fallback.
pub struct JsonlWriter {
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    lines_written: u64,
}

impl JsonlWriter {
    /// Open `path` for appending, or write to stderr when `path` is `None`
    /// or cannot be opened.
    #[must_use]
    pub fn open(path: Option<PathBuf>) -> Self {
        let mut w = Self {
            path,
            writer: None,
            state: WriterState::Stderr,
            lines_written: 0,
        };
        if let Some(path) = w.path.clone() {
            match open_append(&path) {
                Ok(file) => {
                    w.writer = Some(BufWriter::new(file));
                    w.state = WriterState::File;
                }
                Err(e) => {
                    let _ = writeln!(io::stderr(), "[SSS-JSONL] {e}, using stderr");
                }
            }
        }
        w
    }

    /// Write a single log entry as one atomic JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[SSS-JSONL] serialize error: {e}");
                return;
            }
        };
        self.write_line(&line);
    }

    /// Convert and write a sensor event. `Shutdown` is ignored.
    pub fn write_event(&mut self, event: &SensorEvent) {
        if let Some(entry) = LogEntry::from_event(event) {
            self.write_entry(&entry);
        }
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Current degradation state.
    pub fn state(&self) -> &str {
        match self.state {
            WriterState::File => "file",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    fn write_line(&mut self, line: &str) {
        match self.state {
            WriterState::File => {
                let ok = self
                    .writer
                    .as_mut()
                    .is_some_and(|w| w.write_all(line.as_bytes()).and_then(|()| w.flush()).is_ok());
                if ok {
                    self.lines_written += 1;
                } else {
                    self.writer = None;
                    self.state = WriterState::Stderr;
                    let _ = writeln!(io::stderr(), "[SSS-JSONL] file write failed, using stderr");
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                if write!(io::stderr(), "[SSS-JSONL] {line}").is_ok() {
                    self.lines_written += 1;
                } else {
                    self.state = WriterState::Discard;
                }
            }
            WriterState::Discard => {}
        }
    }
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| SensorError::io(parent, source))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SensorError::io(path, source))
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
