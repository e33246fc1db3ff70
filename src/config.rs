//! Run configuration: built-in defaults, then the rc file, then CLI flags.
//!
//! The rc file is htoprc-style `key=value` text at
//! `$XDG_CONFIG_HOME/cpuclear/cpuclearrc` (or `~/.config/cpuclear/cpuclearrc`).

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, warn};

use crate::system::source::DEFAULT_SOURCE;

/// Runtime applied to silent and batch runs that don't set one
pub const DEFAULT_BATCH_RUNTIME_SECS: u64 = 30;

const DEFAULT_READ_RETRIES: u32 = 3;
const MAX_READ_RETRIES: u32 = 10;

#[derive(Parser, Debug, Default)]
#[command(name = "cpuclear")]
#[command(version)]
#[command(about = "Watch per-core CPU frequencies and flag cores that never reach their rated max")]
pub struct Cli {
    /// Maximum number of seconds to watch the CPUs before giving up
    #[arg(short, long, value_name = "SECONDS")]
    pub runtime: Option<u64>,

    /// No output; exit 0 if all CPUs clear, non-zero if they don't within the runtime (default 30s)
    #[arg(short, long)]
    pub silent: bool,

    /// Run for a while, then print the results (default 30s)
    #[arg(short, long)]
    pub batch: bool,

    /// Omit ANSI colors and screen clear/home
    #[arg(long)]
    pub plaintext: bool,

    /// Telemetry file to poll
    #[arg(long, value_name = "PATH")]
    pub source: Option<PathBuf>,
}

/// Settings read from the rc file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcConfig {
    pub runtime: Option<u64>,
    pub plaintext: bool,
    pub source: Option<PathBuf>,
    pub read_retries: u32,
}

impl Default for RcConfig {
    fn default() -> Self {
        Self {
            runtime: None,
            plaintext: false,
            source: None,
            read_retries: DEFAULT_READ_RETRIES,
        }
    }
}

/// Get the rc file path: $XDG_CONFIG_HOME/cpuclear/cpuclearrc
fn config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("cpuclear").join("cpuclearrc"))
}

impl RcConfig {
    /// Load the rc file, returning defaults if it doesn't exist
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!("loaded config from {}", path.display());
                Self::parse(&content)
            }
            Err(_) => Self::default(),
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut cfg = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                "runtime" => match value.parse::<u64>() {
                    Ok(0) => cfg.runtime = None,
                    Ok(secs) => cfg.runtime = Some(secs),
                    Err(_) => warn!("config: ignoring runtime={value:?}"),
                },
                "plaintext" => cfg.plaintext = value == "1",
                "source" if !value.is_empty() => cfg.source = Some(PathBuf::from(value)),
                "read_retries" => match value.parse::<u32>() {
                    Ok(n) => cfg.read_retries = n.min(MAX_READ_RETRIES),
                    Err(_) => warn!("config: ignoring read_retries={value:?}"),
                },
                _ => {} // Ignore unknown keys
            }
        }

        cfg
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// `None` runs until convergence or interrupt
    pub runtime_secs: Option<u64>,
    pub silent: bool,
    pub batch: bool,
    pub plaintext: bool,
    pub source: PathBuf,
    pub read_retries: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            runtime_secs: None,
            silent: false,
            batch: false,
            plaintext: false,
            source: PathBuf::from(DEFAULT_SOURCE),
            read_retries: DEFAULT_READ_RETRIES,
        }
    }
}

impl RunConfig {
    /// Layer CLI flags over the rc file, then apply the mode rules:
    /// a non-terminal stdout forces batch, silent/batch default the runtime,
    /// and batch implies plaintext.
    pub fn resolve(cli: &Cli, rc: &RcConfig, is_terminal: bool) -> Self {
        let batch = cli.batch || !is_terminal;
        let runtime = cli.runtime.filter(|&secs| secs > 0).or(rc.runtime);
        let runtime_secs = if (cli.silent || batch) && runtime.is_none() {
            Some(DEFAULT_BATCH_RUNTIME_SECS)
        } else {
            runtime
        };

        Self {
            runtime_secs,
            silent: cli.silent,
            batch,
            plaintext: cli.plaintext || rc.plaintext || batch,
            source: cli
                .source
                .clone()
                .or_else(|| rc.source.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE)),
            read_retries: rc.read_retries,
        }
    }

    /// Render on every tick (interactive, not silent/batch)
    pub fn renders_each_tick(&self) -> bool {
        !(self.silent || self.batch)
    }
}
