//! cpuclear — stuck-core screening for Linux hosts.
//!
//! Polls `/proc/cpuinfo` every 100ms, tracks the highest frequency each core
//! reaches, and reports whether every core ramps to the rated clock in its
//! model name. Cores parked at 1200 MHz are flagged as stuck.
//!
//! Exit codes: 0 all cores cleared, 1 timed out, 128 interrupted,
//! 2 telemetry unreadable or other fatal error.

mod app;
mod color_scheme;
mod config;
mod system;
mod ui;

use std::io::{self, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use app::App;
use config::{Cli, RcConfig, RunConfig};
use system::source::CpuInfoFile;

/// Exit code for errors that stop the run outright
const EXIT_FATAL: i32 = 2;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let is_terminal = io::stdout().is_terminal();
    if !is_terminal {
        info!("stdout is not a terminal, switching to batch mode");
    }
    let config = RunConfig::resolve(&cli, &RcConfig::load(), is_terminal);

    match run(config) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_FATAL);
        }
    }
}

/// Main application loop
fn run(config: RunConfig) -> Result<i32> {
    // Set up Ctrl+C handler
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("installing Ctrl+C handler")?;

    let source = CpuInfoFile::new(config.source.clone(), config.read_retries);
    let mut app = App::new(config, source, interrupted);

    let mut stdout = io::stdout().lock();
    let phase = app.run(&mut stdout)?;
    Ok(phase.exit_code().unwrap_or(EXIT_FATAL))
}
