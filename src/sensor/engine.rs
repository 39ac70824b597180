//! Sampling engine: owns one sensor's state, rate-limits probes, keeps the
//! usage history, and renders the panel text.
//!
//! Resolution of the watched volume runs once on a background thread started
//! by [`StorageSpaceSensor::init`]; until it completes every
//! [`sample`](StorageSpaceSensor::sample) returns `None`.
//!
//! At most one probe is in flight per sensor. The sample timestamp is moved
//! forward before the probe is dispatched and a single-slot guard is claimed,
//! so concurrent callers render the last known state instead of starting a
//! second probe.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

use crate::core::config::SensorConfig;
use crate::core::errors::{Result, SensorError};
use crate::logger::{EventSink, SensorEvent};
use crate::platform::pal::Platform;
use crate::sensor::health::{Health, HealthChange};
use crate::sensor::history::UsageHistory;
use crate::sensor::probe::{Usage, UsageProbe};
use crate::sensor::resolver::{ROOT_SENTINEL, Volume, VolumeResolver};
use crate::sensor::template::{self, RenderContext};

/// Prefix of every sensor id.
pub const SENSOR_ID_PREFIX: &str = "storage_space_";

/// Stable id for a sensor watching `block_device`.
///
/// The root sentinel maps to `rootfs`; otherwise a leading `/dev/` is stripped.
#[must_use]
pub fn sensor_id(block_device: &str) -> String {
    let short = if block_device == ROOT_SENTINEL {
        "rootfs"
    } else {
        block_device.strip_prefix("/dev/").unwrap_or(block_device)
    };
    format!("{SENSOR_ID_PREFIX}{short}")
}

/// One render tick's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleOutput {
    pub text: String,
    pub min: u64,
    pub max: u64,
}

/// Point-in-time copy of a sensor's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorSnapshot {
    pub id: String,
    pub block_device: String,
    pub mount_point: String,
    pub resolved: bool,
    pub history: Vec<u64>,
    pub max_capacity_mb: u64,
    pub health: Health,
}

#[derive(Debug)]
struct SensorState {
    volume: Volume,
    resolved: bool,
    history: UsageHistory,
    last_sampled_at: Option<Instant>,
    max_capacity_mb: u64,
    health: Health,
}

impl SensorState {
    fn render(&self, format: &str) -> SampleOutput {
        let rendered = template::render(
            format,
            &RenderContext {
                history: &self.history,
                max_capacity_mb: self.max_capacity_mb,
                mount_point: &self.volume.mount_point,
                block_device: &self.volume.block_device,
            },
        );
        SampleOutput {
            text: rendered.text,
            min: 0,
            max: rendered.max,
        }
    }

    /// Apply a probe outcome; returns the event to log, if any.
    fn apply(&mut self, outcome: Result<Usage>) -> Option<SensorEvent> {
        let sensor = sensor_id(&self.volume.block_device);
        match outcome {
            Ok(usage) => {
                // History and capacity always move together.
                self.history.push(usage.used);
                self.max_capacity_mb = usage.size;
                match self.health.on_success() {
                    HealthChange::Recovered { failures } => {
                        Some(SensorEvent::ProbeRecovered { sensor, failures })
                    }
                    HealthChange::Faulted | HealthChange::Unchanged => None,
                }
            }
            Err(error) => match self.health.on_failure() {
                HealthChange::Faulted => Some(SensorEvent::ProbeFailed {
                    sensor,
                    error: error.to_string(),
                }),
                HealthChange::Recovered { .. } | HealthChange::Unchanged => None,
            },
        }
    }
}

struct Shared {
    state: Mutex<SensorState>,
    resolved_cv: Condvar,
}

/// Releases the in-flight slot when the probe finishes, even on unwind.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn claim(slot: &'a AtomicBool) -> Option<Self> {
        slot.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(slot))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A storage-space sensor. Owns its state; safe to share across threads.
pub struct StorageSpaceSensor {
    shared: Arc<Shared>,
    in_flight: AtomicBool,
    probe: UsageProbe,
    sink: Arc<dyn EventSink>,
}

impl StorageSpaceSensor {
    /// Build the sensor and start resolving its volume in the background.
    ///
    /// For an unconfigured sensor [`id`](Self::id) reads
    /// `storage_space_rootfs` until resolution completes and the real device
    /// afterwards. Hosts that register the id once should use
    /// [`init_blocking`](Self::init_blocking) or [`wait_resolved`](Self::wait_resolved)
    /// first; a configured device's id never changes.
    pub fn init(
        config: &SensorConfig,
        platform: Arc<dyn Platform>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let configured = config.block_device.clone();
        let shared = Arc::new(Shared {
            state: Mutex::new(SensorState {
                volume: Volume::initial(configured.as_deref()),
                resolved: false,
                history: UsageHistory::default(),
                last_sampled_at: None,
                max_capacity_mb: 0,
                health: Health::default(),
            }),
            resolved_cv: Condvar::new(),
        });

        let resolver = VolumeResolver::new(Arc::clone(&platform), config.mount_table.clone());
        let thread_shared = Arc::clone(&shared);
        let thread_sink = Arc::clone(&sink);
        thread::Builder::new()
            .name("sss-resolver".to_string())
            .spawn(move || {
                let outcome = resolver.resolve(configured.as_deref());
                finish_resolution(&thread_shared, thread_sink.as_ref(), outcome);
            })
            .map_err(|e| SensorError::Runtime {
                details: format!("failed to spawn resolver thread: {e}"),
            })?;

        Ok(Self {
            shared,
            in_flight: AtomicBool::new(false),
            probe: UsageProbe::new(
                platform,
                config.probe_command.clone(),
                config.probe_timeout(),
            ),
            sink,
        })
    }

    /// [`init`](Self::init), then block until resolution finishes or `timeout` passes.
    pub fn init_blocking(
        config: &SensorConfig,
        platform: Arc<dyn Platform>,
        sink: Arc<dyn EventSink>,
        timeout: Duration,
    ) -> Result<Self> {
        let sensor = Self::init(config, platform, sink)?;
        if !sensor.wait_resolved(timeout) {
            return Err(SensorError::Runtime {
                details: format!(
                    "volume resolution did not finish within {}ms",
                    timeout.as_millis()
                ),
            });
        }
        Ok(sensor)
    }

    /// Wait for resolution. Returns whether it has completed.
    pub fn wait_resolved(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !state.resolved {
            if self
                .shared
                .resolved_cv
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.resolved;
            }
        }
        true
    }

    /// `storage_space_<shortDevice>` for the current device. Final once
    /// [`is_resolved`](Self::is_resolved) is true.
    #[must_use]
    pub fn id(&self) -> String {
        sensor_id(&self.shared.state.lock().volume.block_device)
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.shared.state.lock().resolved
    }

    #[must_use]
    pub fn volume(&self) -> Volume {
        self.shared.state.lock().volume.clone()
    }

    #[must_use]
    pub fn health(&self) -> Health {
        self.shared.state.lock().health
    }

    /// True while the probe is failing.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.health().is_faulted()
    }

    #[must_use]
    pub fn history(&self) -> Vec<u64> {
        self.shared.state.lock().history.iter().collect()
    }

    #[must_use]
    pub fn max_capacity_mb(&self) -> u64 {
        self.shared.state.lock().max_capacity_mb
    }

    #[must_use]
    pub fn snapshot(&self) -> SensorSnapshot {
        let state = self.shared.state.lock();
        SensorSnapshot {
            id: sensor_id(&state.volume.block_device),
            block_device: state.volume.block_device.clone(),
            mount_point: state.volume.mount_point.clone(),
            resolved: state.resolved,
            history: state.history.iter().collect(),
            max_capacity_mb: state.max_capacity_mb,
            health: state.health,
        }
    }

    /// One render tick. `None` while the volume is still being resolved.
    pub fn sample(&self, rate_ms: u64, format: &str) -> Option<SampleOutput> {
        self.sample_at(rate_ms, format, Instant::now())
    }

    /// [`sample`](Self::sample) with an explicit clock reading.
    pub fn sample_at(&self, rate_ms: u64, format: &str, now: Instant) -> Option<SampleOutput> {
        let rate = Duration::from_millis(rate_ms);
        let (guard, mount_point) = {
            let mut state = self.shared.state.lock();
            if !state.resolved {
                return None;
            }
            let due = state
                .last_sampled_at
                .is_none_or(|last| now.saturating_duration_since(last) > rate);
            if !due {
                return Some(state.render(format));
            }
            let Some(guard) = InFlightGuard::claim(&self.in_flight) else {
                return Some(state.render(format));
            };
            state.last_sampled_at = Some(now);
            (guard, state.volume.mount_point.clone())
        };

        let outcome = self.probe.measure(&mount_point);

        let (output, event) = {
            let mut state = self.shared.state.lock();
            let event = state.apply(outcome);
            (state.render(format), event)
        };
        drop(guard);

        if let Some(event) = event {
            self.sink.record(event);
        }
        Some(output)
    }
}

impl std::fmt::Debug for StorageSpaceSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSpaceSensor")
            .field("state", &*self.shared.state.lock())
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .field("probe", &self.probe)
            .finish_non_exhaustive()
    }
}

/// Store the resolved volume, log the outcome, then publish `resolved`.
///
/// The event is recorded before waiters wake so that anyone past
/// `wait_resolved` can already see it.
fn finish_resolution(shared: &Shared, sink: &dyn EventSink, outcome: Result<Volume>) {
    let event = {
        let mut state = shared.state.lock();
        match outcome {
            Ok(volume) => {
                state.volume = volume;
                SensorEvent::Resolved {
                    sensor: sensor_id(&state.volume.block_device),
                    block_device: state.volume.block_device.clone(),
                    mount_point: state.volume.mount_point.clone(),
                }
            }
            Err(error) => SensorEvent::ResolutionFailed {
                sensor: sensor_id(&state.volume.block_device),
                error: error.to_string(),
            },
        }
    };
    sink.record(event);

    shared.state.lock().resolved = true;
    shared.resolved_cv.notify_all();
}
