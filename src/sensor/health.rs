//! Probe health tracking.
//!
//! Replaces a one-way fault latch with explicit transitions so the first
//! failure is logged, repeats stay quiet, and recovery is reported once.

#![allow(missing_docs)]

use serde::Serialize;

/// Probe health of a sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Health {
    #[default]
    Healthy,
    /// Failing since the last success.
    Degraded { failures: u32 },
    /// First success after a degraded stretch.
    Recovering,
}

/// What a health update means for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthChange {
    /// Nothing to report.
    Unchanged,
    /// Entered `Degraded`; log the failure.
    Faulted,
    /// Left `Degraded`; log the recovery.
    Recovered { failures: u32 },
}

impl Health {
    pub fn on_failure(&mut self) -> HealthChange {
        match *self {
            Self::Healthy | Self::Recovering => {
                *self = Self::Degraded { failures: 1 };
                HealthChange::Faulted
            }
            Self::Degraded { failures } => {
                *self = Self::Degraded {
                    failures: failures.saturating_add(1),
                };
                HealthChange::Unchanged
            }
        }
    }

    pub fn on_success(&mut self) -> HealthChange {
        match *self {
            Self::Degraded { failures } => {
                *self = Self::Recovering;
                HealthChange::Recovered { failures }
            }
            Self::Recovering | Self::Healthy => {
                *self = Self::Healthy;
                HealthChange::Unchanged
            }
        }
    }

    /// True while the probe is failing.
    #[must_use]
    pub const fn is_faulted(self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}
