use std::io::{self, Write};

use chrono::{DateTime, Local};

use crate::color_scheme::ColorScheme;
use crate::system::cpu::RunState;

use super::{end_line, line, styled};

/// `Ctrl+C to exit, Runtime: <secs> seconds`, below the core table
pub fn draw_runtime<W: Write>(out: &mut W, cs: &ColorScheme, elapsed_secs: f64) -> io::Result<()> {
    line(out, cs, "")?;
    line(out, cs, &format!("Ctrl+C to exit, Runtime: {:5.1} seconds", elapsed_secs))
}

/// One-line run summary printed above the final table
pub fn draw_summary<W: Write>(
    out: &mut W,
    cs: &ColorScheme,
    started: DateTime<Local>,
    state: &RunState,
) -> io::Result<()> {
    line(
        out,
        cs,
        &format!(
            "Run started {}, {} of {} CPUs at rated speed",
            started.format("%Y-%m-%d %H:%M:%S"),
            state.converged_count(),
            state.len()
        ),
    )
}

pub fn draw_cleared<W: Write>(out: &mut W, cs: &ColorScheme, elapsed_secs: u64) -> io::Result<()> {
    styled(out, &format!("All CPUs cleared in {} seconds", elapsed_secs), cs.summary_ok)?;
    end_line(out, cs)?;
    out.flush()
}

pub fn draw_timed_out<W: Write>(out: &mut W, cs: &ColorScheme, elapsed_secs: u64) -> io::Result<()> {
    let plural = if elapsed_secs > 1 { "s" } else { "" };
    styled(
        out,
        &format!(
            "CPUs did not clear during the test run, stopped after {} second{}",
            elapsed_secs, plural
        ),
        cs.summary_fail,
    )?;
    end_line(out, cs)?;
    out.flush()
}
