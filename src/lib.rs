#![forbid(unsafe_code)]

//! Storage-space sensor for status panels.
//!
//! Resolves which volume to watch from the live mount table, measures its
//! usage with `df` at a caller-chosen rate, keeps a fixed ten-sample history,
//! and renders `{N}` format templates for the panel to draw.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use storage_space_sensor::prelude::*;
//!
//! let sensor = StorageSpaceSensor::init_blocking(
//!     &SensorConfig::default(),
//!     Arc::new(LinuxPlatform::new()),
//!     Arc::new(StderrSink),
//!     Duration::from_secs(2),
//! )?;
//! if let Some(out) = sensor.sample(1_000, "{3}: {0}{2} ({4}%)") {
//!     println!("{} [{}..{}]", out.text, out.min, out.max);
//! }
//! # Ok::<(), SensorError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod platform;
pub mod sensor;
