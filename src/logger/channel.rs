//! Background logger: a dedicated thread owns the `JsonlWriter`; sensors send
//! `SensorEvent`s through a bounded crossbeam channel with `try_send()` so the
//! render loop is never blocked by logging back-pressure.

#![allow(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::config::LogConfig;
use crate::core::errors::{Result, SensorError};
use crate::logger::jsonl::JsonlWriter;
use crate::logger::{EventSink, SensorEvent};

/// Thread-safe, cheaply-cloneable handle for sending log events.
#[derive(Clone)]
pub struct LoggerHandle {
    tx: Sender<SensorEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl LoggerHandle {
    /// Send an event to the logger thread. Non-blocking.
    ///
    /// If the channel is full the event is dropped and the dropped-events counter
    /// is incremented.
    pub fn send(&self, event: SensorEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
        // Disconnected is fine during shutdown.
    }

    /// Number of events dropped due to channel back-pressure.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and exit. Blocks until queued.
    pub fn shutdown(&self) {
        let _ = self.tx.send(SensorEvent::Shutdown);
    }
}

impl EventSink for LoggerHandle {
    fn record(&self, event: SensorEvent) {
        self.send(event);
    }
}

/// Spawn the logger thread and return a handle.
///
/// The thread runs until `handle.shutdown()` is called or all senders are dropped.
pub fn spawn_logger(config: &LogConfig) -> Result<(LoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<SensorEvent>(config.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_clone = Arc::clone(&dropped);
    let path = config.jsonl_path.clone();

    let handle = LoggerHandle {
        tx,
        dropped_events: dropped,
    };

    let join = thread::Builder::new()
        .name("sss-logger".to_string())
        .spawn(move || logger_thread_main(&rx, path, &dropped_clone))
        .map_err(|e| SensorError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

fn logger_thread_main(rx: &Receiver<SensorEvent>, path: Option<PathBuf>, dropped: &AtomicU64) {
    let mut jsonl = JsonlWriter::open(path);

    while let Ok(event) = rx.recv() {
        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            eprintln!("[SSS-LOGGER] {d} log events dropped due to back-pressure");
        }
        if matches!(event, SensorEvent::Shutdown) {
            break;
        }
        jsonl.write_event(&event);
    }
    jsonl.flush();
}
