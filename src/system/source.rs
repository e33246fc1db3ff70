use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::warn;

/// Default telemetry location on Linux
pub const DEFAULT_SOURCE: &str = "/proc/cpuinfo";

/// First retry delay; doubles after each failed attempt
const RETRY_BACKOFF_MS: u64 = 10;

/// Produces a full snapshot of per-core telemetry, one entry per line.
pub trait TelemetrySource {
    fn snapshot(&mut self) -> Result<Vec<String>>;

    /// Human-readable origin for messages
    fn describe(&self) -> String;
}

/// File-backed source (`/proc/cpuinfo` by default), re-read in full on every tick
pub struct CpuInfoFile {
    path: PathBuf,
    retries: u32,
}

impl CpuInfoFile {
    pub fn new(path: impl Into<PathBuf>, retries: u32) -> Self {
        Self {
            path: path.into(),
            retries,
        }
    }
}

impl TelemetrySource for CpuInfoFile {
    fn snapshot(&mut self) -> Result<Vec<String>> {
        let mut backoff = Duration::from_millis(RETRY_BACKOFF_MS);
        let mut attempt = 0;
        loop {
            match fs::read_to_string(&self.path) {
                Ok(content) => return Ok(content.lines().map(str::to_owned).collect()),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        "reading {} failed ({}), retry {}/{} in {:?}",
                        self.path.display(),
                        e,
                        attempt,
                        self.retries,
                        backoff
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!(
                            "telemetry source {} unreadable after {} attempt(s)",
                            self.path.display(),
                            attempt + 1
                        )
                    })
                }
            }
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
