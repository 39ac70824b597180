//! PAL trait: the two capabilities the sensor needs from the host OS, plus
//! Linux and mock implementations.

#![allow(missing_docs)]

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::core::errors::{Result, SensorError};

/// Poll interval while waiting on a child process.
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// OS abstraction used by the resolver and the usage probe.
pub trait Platform: Send + Sync {
    /// Read a text file. Fails with `SourceUnavailable` if it is absent or unreadable.
    fn read_text(&self, path: &Path) -> Result<String>;

    /// Run `program args...`, capture stdout, fail on non-zero exit or after `timeout`.
    fn run_command(&self, program: &str, args: &[&str], timeout: Duration) -> Result<String>;
}

/// Linux implementation backed by `std::fs` and `std::process`.
#[derive(Debug, Default)]
pub struct LinuxPlatform;

impl LinuxPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Platform for LinuxPlatform {
    fn read_text(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(SensorError::SourceUnavailable {
                path: path.to_path_buf(),
                details: "does not exist".to_string(),
            });
        }
        fs::read_to_string(path).map_err(|error| SensorError::SourceUnavailable {
            path: path.to_path_buf(),
            details: error.to_string(),
        })
    }

    fn run_command(&self, program: &str, args: &[&str], timeout: Duration) -> Result<String> {
        let command_line = format_command_line(program, args);
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SensorError::io(program, source))?;

        // Drain stdout while waiting so a chatty command cannot fill the pipe
        // and stall until the deadline.
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut out = Vec::new();
                stdout.read_to_end(&mut out).map(|_| out)
            })
        });

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if started.elapsed() >= timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(SensorError::Runtime {
                            details: format!(
                                "{command_line} timed out after {}ms",
                                timeout.as_millis()
                            ),
                        });
                    }
                    thread::sleep(CHILD_POLL_INTERVAL);
                }
                Err(source) => return Err(SensorError::io(program, source)),
            }
        };

        if !status.success() {
            return Err(SensorError::Runtime {
                details: format!(
                    "error executing {command_line} (exit {})",
                    status.code().unwrap_or(-1)
                ),
            });
        }

        let out = match reader {
            Some(handle) => handle
                .join()
                .map_err(|_| SensorError::Runtime {
                    details: format!("{command_line}: stdout reader panicked"),
                })?
                .map_err(|source| SensorError::io(program, source))?,
            None => Vec::new(),
        };
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

fn format_command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scripted outcome of one `run_command` call on [`MockPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCommand {
    /// Exit 0 with this stdout.
    Stdout(String),
    /// Exit non-zero with this code.
    Exit(i32),
    /// Sleep, then exit 0 with this stdout. Exceeding the timeout fails the call.
    Delayed(Duration, String),
}

/// In-memory mock implementation for deterministic tests.
///
/// Command responses are consumed in order; the last one repeats forever.
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    files: HashMap<PathBuf, String>,
    responses: Arc<Mutex<VecDeque<MockCommand>>>,
    calls: Arc<Mutex<Vec<String>>>,
    command_count: Arc<AtomicUsize>,
}

impl MockPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    #[must_use]
    pub fn with_command(self, response: MockCommand) -> Self {
        self.push_command(response);
        self
    }

    /// Queue another command response; shared by every clone.
    pub fn push_command(&self, response: MockCommand) {
        self.responses.lock().push_back(response);
    }

    /// Number of `run_command` invocations so far.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.command_count.load(Ordering::SeqCst)
    }

    /// Command lines seen so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn next_response(&self) -> Option<MockCommand> {
        let mut queue = self.responses.lock();
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Platform for MockPlatform {
    fn read_text(&self, path: &Path) -> Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SensorError::SourceUnavailable {
                path: path.to_path_buf(),
                details: "does not exist".to_string(),
            })
    }

    fn run_command(&self, program: &str, args: &[&str], timeout: Duration) -> Result<String> {
        let command_line = format_command_line(program, args);
        self.command_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(command_line.clone());

        match self.next_response() {
            Some(MockCommand::Stdout(out)) => Ok(out),
            Some(MockCommand::Exit(code)) => Err(SensorError::Runtime {
                details: format!("error executing {command_line} (exit {code})"),
            }),
            Some(MockCommand::Delayed(delay, out)) => {
                thread::sleep(delay.min(timeout));
                if delay > timeout {
                    return Err(SensorError::Runtime {
                        details: format!(
                            "{command_line} timed out after {}ms",
                            timeout.as_millis()
                        ),
                    });
                }
                Ok(out)
            }
            None => Err(SensorError::io(
                program,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no mock response queued"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LinuxPlatform, MockCommand, MockPlatform, Platform};
    use crate::core::errors::SensorError;
    use std::path::Path;
    use std::time::Duration;

    #[test]
    fn linux_read_missing_file_is_source_unavailable() {
        let err = LinuxPlatform::new()
            .read_text(Path::new("/nonexistent/mounts"))
            .expect_err("missing file should fail");
        assert!(matches!(err, SensorError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn linux_read_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mounts");
        std::fs::write(&path, "/dev/sda1 / ext4 rw 0 0\n").expect("write");
        let raw = LinuxPlatform::new().read_text(&path).expect("read");
        assert!(raw.starts_with("/dev/sda1"));
    }

    #[test]
    #[cfg(unix)]
    fn linux_command_captures_stdout() {
        let out = LinuxPlatform::new()
            .run_command("echo", &["hello"], Duration::from_secs(5))
            .expect("echo should succeed");
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    #[cfg(unix)]
    fn linux_command_non_zero_exit_fails() {
        let err = LinuxPlatform::new()
            .run_command("false", &[], Duration::from_secs(5))
            .expect_err("false should fail");
        assert!(err.to_string().contains("error executing false"));
    }

    #[test]
    #[cfg(unix)]
    fn linux_command_times_out() {
        let err = LinuxPlatform::new()
            .run_command("sleep", &["5"], Duration::from_millis(50))
            .expect_err("sleep should time out");
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    #[cfg(unix)]
    fn linux_command_output_larger_than_pipe_buffer() {
        // ~290 KiB, several times a default pipe buffer.
        let out = LinuxPlatform::new()
            .run_command("seq", &["1", "50000"], Duration::from_secs(5))
            .expect("seq should succeed");
        assert_eq!(out.lines().count(), 50_000);
        assert_eq!(out.lines().last(), Some("50000"));
    }

    #[test]
    fn linux_command_missing_binary_is_io_error() {
        let err = LinuxPlatform::new()
            .run_command("definitely-not-a-real-binary-sss", &[], Duration::from_secs(1))
            .expect_err("missing binary should fail");
        assert!(matches!(err, SensorError::Io { .. }));
    }

    #[test]
    fn mock_responses_are_consumed_then_last_repeats() {
        let mock = MockPlatform::new()
            .with_command(MockCommand::Exit(1))
            .with_command(MockCommand::Stdout("ok".to_string()));
        let timeout = Duration::from_secs(1);
        assert!(mock.run_command("df", &["/"], timeout).is_err());
        assert_eq!(mock.run_command("df", &["/"], timeout).expect("ok"), "ok");
        assert_eq!(mock.run_command("df", &["/"], timeout).expect("ok"), "ok");
        assert_eq!(mock.command_count(), 3);
        assert_eq!(mock.calls()[0], "df /");
    }

    #[test]
    fn mock_delay_beyond_timeout_fails() {
        let mock = MockPlatform::new().with_command(MockCommand::Delayed(
            Duration::from_millis(50),
            "late".to_string(),
        ));
        let err = mock
            .run_command("df", &[], Duration::from_millis(5))
            .expect_err("should time out");
        assert!(err.to_string().contains("timed out"));
    }
}
