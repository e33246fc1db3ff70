use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{debug, info, trace, warn};

use crate::color_scheme::ColorScheme;
use crate::config::RunConfig;
use crate::system::cpu::{RunState, Verdict};
use crate::system::parser::apply_snapshot;
use crate::system::source::TelemetrySource;
use crate::ui::{self, footer, RenderOptions};

/// Sampling interval in milliseconds
pub const TICK_RATE_MS: u64 = 100;
pub const TICKS_PER_SECOND: u64 = 1000 / TICK_RATE_MS;

/// Loop controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Running,
    ConvergedExit,
    TimeoutExit,
    InterruptedExit,
}

impl RunPhase {
    /// Process exit code for a finished run; `None` while still running
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunPhase::Running => None,
            RunPhase::ConvergedExit => Some(0),
            RunPhase::TimeoutExit => Some(1),
            RunPhase::InterruptedExit => Some(128),
        }
    }
}

/// Sampling loop: owns the run state and drives source -> parser -> verdict -> render.
pub struct App<S: TelemetrySource> {
    pub config: RunConfig,
    pub color_scheme: ColorScheme,
    pub state: RunState,
    pub phase: RunPhase,
    /// Ticks completed so far
    pub tick: u64,
    pub started: DateTime<Local>,
    source: S,
    interrupted: Arc<AtomicBool>,
    tick_interval: Duration,
    /// Parse issues are warned about once, then demoted to debug
    parse_warned: bool,
}

impl<S: TelemetrySource> App<S> {
    pub fn new(config: RunConfig, source: S, interrupted: Arc<AtomicBool>) -> Self {
        let color_scheme = ColorScheme::for_plaintext(config.plaintext);
        Self {
            config,
            color_scheme,
            state: RunState::new(),
            phase: RunPhase::Running,
            tick: 0,
            started: Local::now(),
            source,
            interrupted,
            tick_interval: Duration::from_millis(TICK_RATE_MS),
            parse_warned: false,
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Tick budget derived from the runtime, `None` when unlimited
    pub fn tick_budget(&self) -> Option<u64> {
        self.config.runtime_secs.map(|secs| secs.saturating_mul(TICKS_PER_SECOND))
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.tick as f64 / TICKS_PER_SECOND as f64
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    fn render_options(&self, runtime_footer: bool) -> RenderOptions<'_> {
        RenderOptions {
            scheme: &self.color_scheme,
            runtime_footer,
        }
    }

    /// Run one tick: read, parse, evaluate, render, then check the budget.
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<RunPhase> {
        if self.phase != RunPhase::Running {
            return Ok(self.phase);
        }
        if self.is_interrupted() {
            self.transition(RunPhase::InterruptedExit);
            return Ok(self.phase);
        }

        let lines = self
            .source
            .snapshot()
            .with_context(|| format!("tick {}: reading telemetry", self.tick))?;
        let issues = apply_snapshot(&lines, &mut self.state);
        for issue in &issues {
            if self.parse_warned {
                debug!("skipped {} in {}", issue, self.source.describe());
            } else {
                warn!("skipped {} in {}", issue, self.source.describe());
            }
        }
        self.parse_warned |= !issues.is_empty();

        let verdict = self.state.verdict();
        trace!(
            "tick {}: {} cores, {} cleared",
            self.tick,
            self.state.len(),
            self.state.converged_count()
        );

        if self.config.renders_each_tick() {
            ui::draw(out, &self.state, self.elapsed_secs(), self.render_options(true))
                .context("rendering core table")?;
        }

        if verdict == Verdict::Converged {
            self.transition(RunPhase::ConvergedExit);
        } else if self.tick_budget().is_some_and(|budget| self.tick >= budget) {
            self.transition(RunPhase::TimeoutExit);
        }

        self.tick += 1;
        Ok(self.phase)
    }

    fn transition(&mut self, next: RunPhase) {
        info!(
            "{:?} -> {:?} after {} ticks ({}/{} cores cleared)",
            self.phase,
            next,
            self.tick,
            self.state.converged_count(),
            self.state.len()
        );
        self.phase = next;
    }

    /// Sample until the run converges, times out or is interrupted, then
    /// print the final report.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<RunPhase> {
        info!(
            "watching {} (runtime: {})",
            self.source.describe(),
            self.config
                .runtime_secs
                .map_or_else(|| "unlimited".to_string(), |s| format!("{s}s"))
        );

        if self.config.renders_each_tick() && !self.config.plaintext {
            ui::clear_screen(out)?;
        }

        while self.step(out)? == RunPhase::Running {
            thread::sleep(self.tick_interval);
        }

        self.finish(out)?;
        Ok(self.phase)
    }

    fn finish<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.config.silent {
            return Ok(());
        }
        let cs = &self.color_scheme;
        let secs = self.tick / TICKS_PER_SECOND;

        match self.phase {
            RunPhase::InterruptedExit => {
                ui::draw(out, &self.state, self.elapsed_secs(), self.render_options(true))?;
                return Ok(());
            }
            _ if self.config.plaintext => {
                footer::draw_summary(out, cs, self.started, &self.state)?;
                ui::draw(out, &self.state, self.elapsed_secs(), self.render_options(false))?;
            }
            _ => {}
        }

        match self.phase {
            RunPhase::ConvergedExit => footer::draw_cleared(out, cs, secs)?,
            RunPhase::TimeoutExit => footer::draw_timed_out(out, cs, secs)?,
            RunPhase::Running | RunPhase::InterruptedExit => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    const FLOOR: [&str; 3] = ["processor : 0", "model name : Intel(R) X 2.50GHz", "cpu MHz : 1200"];
    const RAMPED: [&str; 3] = ["processor : 0", "model name : Intel(R) X 2.50GHz", "cpu MHz : 2501"];

    /// Plays back snapshots in order, repeating the last one
    struct Scripted {
        snapshots: Vec<Vec<String>>,
        reads: usize,
    }

    impl Scripted {
        fn new(snapshots: &[&[&str]]) -> Self {
            Self {
                snapshots: snapshots
                    .iter()
                    .map(|s| s.iter().map(|l| l.to_string()).collect())
                    .collect(),
                reads: 0,
            }
        }
    }

    impl TelemetrySource for Scripted {
        fn snapshot(&mut self) -> Result<Vec<String>> {
            let idx = self.reads.min(self.snapshots.len() - 1);
            self.reads += 1;
            Ok(self.snapshots[idx].clone())
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    struct Unreadable;

    impl TelemetrySource for Unreadable {
        fn snapshot(&mut self) -> Result<Vec<String>> {
            bail!("no such file")
        }

        fn describe(&self) -> String {
            "unreadable".to_string()
        }
    }

    fn app<S: TelemetrySource>(config: RunConfig, source: S) -> App<S> {
        App::new(config, source, Arc::new(AtomicBool::new(false))).with_tick_interval(Duration::ZERO)
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_converges_once_core_ramps() {
        let config = RunConfig { plaintext: true, ..RunConfig::default() };
        let mut app = app(config, Scripted::new(&[&FLOOR, &RAMPED]));
        let mut buf = Vec::new();

        assert_eq!(app.step(&mut buf).unwrap(), RunPhase::Running);
        assert_eq!(app.step(&mut buf).unwrap(), RunPhase::ConvergedExit);
        assert_eq!(app.tick, 2);
        assert_eq!(app.phase.exit_code(), Some(0));
    }

    #[test]
    fn test_mixed_cores_keep_running() {
        let two_cores: &[&str] = &[
            "processor : 0",
            "model name : X 2.50GHz",
            "cpu MHz : 2600",
            "processor : 1",
            "model name : X 2.50GHz",
            "cpu MHz : 1800",
        ];
        let config = RunConfig { silent: true, runtime_secs: Some(30), ..RunConfig::default() };
        let mut app = app(config, Scripted::new(&[two_cores]));
        let mut buf = Vec::new();
        for _ in 0..5 {
            assert_eq!(app.step(&mut buf).unwrap(), RunPhase::Running);
        }
        assert_eq!(app.state.verdict(), Verdict::NotConverged);
    }

    #[test]
    fn test_times_out_after_runtime() {
        let config = RunConfig { runtime_secs: Some(1), batch: true, plaintext: true, ..RunConfig::default() };
        let mut app = app(config, Scripted::new(&[&FLOOR]));
        let mut buf = Vec::new();

        let phase = app.run(&mut buf).unwrap();
        assert_eq!(phase, RunPhase::TimeoutExit);
        assert_eq!(phase.exit_code(), Some(1));
        // ticks 0..=10 are sampled, the eleventh sees the budget spent
        assert_eq!(app.tick, 11);

        let out = output(buf);
        assert!(out.contains("0 of 1 CPUs at rated speed"));
        assert!(out.contains("Max observed speed: 1200\n"));
        assert!(!out.contains("Ctrl+C"));
        assert!(out.ends_with("CPUs did not clear during the test run, stopped after 1 second\n"));
    }

    #[test]
    fn test_silent_convergence_prints_nothing() {
        let config = RunConfig { silent: true, runtime_secs: Some(30), ..RunConfig::default() };
        let mut app = app(config, Scripted::new(&[&RAMPED]));
        let mut buf = Vec::new();

        assert_eq!(app.run(&mut buf).unwrap(), RunPhase::ConvergedExit);
        assert_eq!(app.tick, 1);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_silent_timeout_prints_nothing() {
        let config = RunConfig { silent: true, runtime_secs: Some(1), ..RunConfig::default() };
        let mut app = app(config, Scripted::new(&[&FLOOR]));
        let mut buf = Vec::new();

        assert_eq!(app.run(&mut buf).unwrap(), RunPhase::TimeoutExit);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_convergence_beats_timeout_on_same_tick() {
        let config = RunConfig { silent: true, runtime_secs: Some(1), ..RunConfig::default() };
        let mut script: Vec<&[&str]> = vec![&FLOOR[..]; 10];
        script.push(&RAMPED);
        let mut app = app(config, Scripted::new(&script));
        let mut buf = Vec::new();

        assert_eq!(app.run(&mut buf).unwrap(), RunPhase::ConvergedExit);
        assert_eq!(app.tick, 11);
    }

    #[test]
    fn test_huge_runtime_saturates_budget() {
        let config = RunConfig { silent: true, runtime_secs: Some(u64::MAX), ..RunConfig::default() };
        let mut app = app(config, Scripted::new(&[&FLOOR]));
        assert_eq!(app.tick_budget(), Some(u64::MAX));

        let mut buf = Vec::new();
        for _ in 0..3 {
            assert_eq!(app.step(&mut buf).unwrap(), RunPhase::Running);
        }
    }

    #[test]
    fn test_empty_telemetry_never_converges() {
        let config = RunConfig { silent: true, runtime_secs: Some(1), ..RunConfig::default() };
        let mut app = app(config, Scripted::new(&[&[]]));
        let mut buf = Vec::new();
        assert_eq!(app.run(&mut buf).unwrap(), RunPhase::TimeoutExit);
    }

    #[test]
    fn test_interactive_renders_every_tick() {
        let config = RunConfig { plaintext: true, ..RunConfig::default() };
        let mut app = app(config, Scripted::new(&[&FLOOR, &FLOOR, &RAMPED]));
        let mut buf = Vec::new();

        assert_eq!(app.run(&mut buf).unwrap(), RunPhase::ConvergedExit);
        let out = output(buf);
        assert_eq!(out.matches("Ctrl+C to exit").count(), 3);
        assert!(out.contains("Runtime:   0.2 seconds"));
        assert!(out.ends_with("All CPUs cleared in 0 seconds\n"));
    }

    #[test]
    fn test_interrupt_renders_final_state() {
        let interrupted = Arc::new(AtomicBool::new(false));
        let config = RunConfig { batch: true, plaintext: true, ..RunConfig::default() };
        let mut app = App::new(config, Scripted::new(&[&FLOOR]), interrupted.clone())
            .with_tick_interval(Duration::ZERO);
        let mut buf = Vec::new();

        assert_eq!(app.step(&mut buf).unwrap(), RunPhase::Running);
        assert!(buf.is_empty());

        interrupted.store(true, Ordering::SeqCst);
        let phase = app.run(&mut buf).unwrap();
        assert_eq!(phase, RunPhase::InterruptedExit);
        assert_eq!(phase.exit_code(), Some(128));

        let out = output(buf);
        assert!(out.contains("Max observed speed: 1200\n"));
        assert!(out.contains("Ctrl+C to exit, Runtime:   0.1 seconds"));
        assert!(!out.contains("did not clear"));
    }

    #[test]
    fn test_read_failure_is_fatal() {
        let mut app = app(RunConfig::default(), Unreadable);
        let mut buf = Vec::new();
        let err = app.step(&mut buf).unwrap_err();
        assert!(format!("{err:#}").contains("no such file"));
        assert_eq!(app.phase, RunPhase::Running);
    }

    #[test]
    fn test_orphan_lines_do_not_stop_the_run() {
        let snapshot: &[&str] = &["cpu MHz : 3000", "processor : 0", "model name : X 2.0GHz", "cpu MHz : 2000"];
        let config = RunConfig { silent: true, ..RunConfig::default() };
        let mut app = app(config, Scripted::new(&[snapshot]));
        let mut buf = Vec::new();
        assert_eq!(app.step(&mut buf).unwrap(), RunPhase::ConvergedExit);
        assert!(app.parse_warned);
    }
}
