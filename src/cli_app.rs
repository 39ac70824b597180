//! Top-level CLI definition and dispatch.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use serde_json::json;

use storage_space_sensor::core::config::SensorConfig;
use storage_space_sensor::core::errors::{Result, SensorError};
use storage_space_sensor::logger::channel::spawn_logger;
use storage_space_sensor::platform::pal::LinuxPlatform;
use storage_space_sensor::sensor::engine::StorageSpaceSensor;

/// How long to wait for the mount table lookup before giving up.
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Storage-space sensor driver — prints one rendered panel line per tick.
#[derive(Debug, Parser)]
#[command(
    name = "storage-space",
    author,
    version,
    about = "Storage-space panel sensor",
    long_about = None
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Block device to watch (default: device mounted at /).
    #[arg(long, value_name = "DEV")]
    device: Option<String>,
    /// Minimum milliseconds between usage probes.
    #[arg(long, default_value_t = 1_000)]
    rate: u64,
    /// Format template ({0} latest, {1} history, {2} unit, {3} label, {4} percent).
    #[arg(long, default_value = "{3}: {0} {2} ({4}%)")]
    format: String,
    /// Number of render ticks to print.
    #[arg(long, default_value_t = 1)]
    ticks: u32,
    /// Milliseconds between render ticks.
    #[arg(long, default_value_t = 500)]
    interval: u64,
    /// Emit one JSON object per tick.
    #[arg(long)]
    json: bool,
}

/// Run the sensor for the requested number of ticks.
pub fn run(cli: &Cli) -> Result<()> {
    let mut config = SensorConfig::load(cli.config.as_deref())?;
    if let Some(device) = &cli.device {
        config.block_device = Some(device.clone());
        config.validate()?;
    }

    let (logger, logger_join) = spawn_logger(&config.log)?;
    let sensor = StorageSpaceSensor::init_blocking(
        &config,
        Arc::new(LinuxPlatform::new()),
        Arc::new(logger.clone()),
        RESOLVE_TIMEOUT,
    )?;

    let result = print_ticks(cli, &sensor);

    logger.shutdown();
    let _ = logger_join.join();
    result
}

fn print_ticks(cli: &Cli, sensor: &StorageSpaceSensor) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for tick in 0..cli.ticks {
        if tick > 0 {
            thread::sleep(Duration::from_millis(cli.interval));
        }
        let Some(sample) = sensor.sample(cli.rate, &cli.format) else {
            continue;
        };
        let line = if cli.json {
            json!({
                "id": sensor.id(),
                "tick": tick,
                "sample": sample,
                "sensor": sensor.snapshot(),
            })
            .to_string()
        } else {
            format!("{} [{}..{}]", sample.text, sample.min, sample.max)
        };
        writeln!(out, "{line}").map_err(|source| SensorError::io("stdout", source))?;
    }
    Ok(())
}
