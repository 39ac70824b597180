//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use storage_space_sensor::prelude::*;
//! ```

// Core
pub use crate::core::config::SensorConfig;
pub use crate::core::errors::{Result, SensorError};

// Platform
pub use crate::platform::pal::{LinuxPlatform, MockCommand, MockPlatform, Platform};

// Logging
pub use crate::logger::channel::{LoggerHandle, spawn_logger};
pub use crate::logger::{EventSink, MemorySink, SensorEvent, Severity, StderrSink};

// Sensor
pub use crate::sensor::engine::{SampleOutput, SensorSnapshot, StorageSpaceSensor, sensor_id};
pub use crate::sensor::health::Health;
pub use crate::sensor::history::{HISTORY_SIZE, UsageHistory};
pub use crate::sensor::probe::{Usage, UsageProbe};
pub use crate::sensor::resolver::{Volume, VolumeResolver};
