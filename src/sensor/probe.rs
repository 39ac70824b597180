//! Usage probe: runs `df` against one mount point and parses the megabyte
//! columns it reports.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::core::errors::{Result, SensorError};
use crate::platform::pal::Platform;

/// Space figures for one volume, in megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub size: u64,
    pub used: u64,
    pub available: u64,
}

/// Arguments that make `df` print `size used avail` in whole megabytes.
const DF_ARGS: [&str; 2] = ["-BM", "--output=size,used,avail"];

/// Measures volume usage through an external command.
#[derive(Clone)]
pub struct UsageProbe {
    platform: Arc<dyn Platform>,
    command: String,
    timeout: Duration,
}

impl UsageProbe {
    #[must_use]
    pub fn new(platform: Arc<dyn Platform>, command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            platform,
            command: command.into(),
            timeout,
        }
    }

    /// Measure `mount_point`. Every failure surfaces as `ProbeFailure`.
    pub fn measure(&self, mount_point: &str) -> Result<Usage> {
        let args = [DF_ARGS[0], DF_ARGS[1], mount_point];
        let output = self
            .platform
            .run_command(&self.command, &args, self.timeout)
            .map_err(|error| match error {
                SensorError::ProbeFailure { .. } => error,
                other => SensorError::probe(mount_point, other.to_string()),
            })?;
        parse_usage_report(mount_point, &output)
    }
}

impl std::fmt::Debug for UsageProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageProbe")
            .field("command", &self.command)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Parse a header line followed by a `size used available` data line.
pub fn parse_usage_report(mount_point: &str, output: &str) -> Result<Usage> {
    let mut lines = output.lines();
    if lines.next().is_none_or(|header| header.trim().is_empty()) {
        return Err(SensorError::probe(mount_point, "probe produced no output"));
    }
    let data = lines
        .next()
        .ok_or_else(|| SensorError::probe(mount_point, "probe output has no data line"))?;

    let fields: Vec<&str> = data.split_whitespace().collect();
    let [size, used, available] = fields.as_slice() else {
        return Err(SensorError::probe(
            mount_point,
            format!("expected 3 columns in data line, got {}: {data:?}", fields.len()),
        ));
    };

    Ok(Usage {
        size: parse_megabytes(mount_point, size)?,
        used: parse_megabytes(mount_point, used)?,
        available: parse_megabytes(mount_point, available)?,
    })
}

/// `"4096M"` -> 4096. Any fractional part is truncated.
fn parse_megabytes(mount_point: &str, token: &str) -> Result<u64> {
    let number = token.strip_suffix('M').unwrap_or(token);
    let digits_end = number
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(number.len());
    number[..digits_end]
        .parse::<u64>()
        .map_err(|error| SensorError::probe(mount_point, format!("bad value {token:?}: {error}")))
}
