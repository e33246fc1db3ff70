pub mod footer;

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use unicode_width::UnicodeWidthStr;

use crate::color_scheme::ColorScheme;
use crate::system::cpu::{CoreRecord, RunState};

const HINT: &str = "A healthy and busy system should show MHz in increments of 100 \
                    (or XX01 at full speed) and hit full speed on all CPUs in 30-60 seconds.";

/// Placeholder for values not yet parsed
const UNSET: &str = "-";

/// How a single render pass should look
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions<'a> {
    pub scheme: &'a ColorScheme,
    /// Ctrl+C hint with the elapsed runtime
    pub runtime_footer: bool,
}

/// Clear the screen once before the first interactive render
pub fn clear_screen<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    out.flush()
}

/// Render the per-core table. In color mode the cursor is homed first and
/// each line is cleared to its end so the table redraws in place.
pub fn draw<W: Write>(
    out: &mut W,
    state: &RunState,
    elapsed_secs: f64,
    opts: RenderOptions<'_>,
) -> io::Result<()> {
    let cs = opts.scheme;
    if !cs.is_plain() {
        queue!(out, MoveTo(0, 0))?;
    }

    line(out, cs, HINT)?;
    line(out, cs, "")?;

    // Align the model column on its widest (display-width) entry
    let model_width = state
        .cores()
        .map(|c| c.model_name.as_deref().unwrap_or(UNSET).width())
        .max()
        .unwrap_or(0);
    let id_width = state.cores().last().map_or(1, |c| c.id.to_string().len());

    for core in state.cores() {
        draw_core(out, core, cs, id_width, model_width)?;
    }

    if opts.runtime_footer {
        footer::draw_runtime(out, cs, elapsed_secs)?;
    }

    out.flush()
}

fn draw_core<W: Write>(
    out: &mut W,
    core: &CoreRecord,
    cs: &ColorScheme,
    id_width: usize,
    model_width: usize,
) -> io::Result<()> {
    let model = core.model_name.as_deref().unwrap_or(UNSET);
    let pad = model_width.saturating_sub(model.width());
    line(
        out,
        cs,
        &format!(
            "CPU : {:>id_width$}, Model: {}{}, Max: {}",
            core.id,
            model,
            " ".repeat(pad),
            fmt_mhz(core.rated_max_mhz),
        ),
    )?;

    queue!(out, Print("Max observed speed: "))?;
    styled(out, &fmt_mhz(core.observed_max_mhz), cs.status_color(core.status()))?;
    end_line(out, cs)
}

fn fmt_mhz(mhz: Option<u32>) -> String {
    mhz.map_or_else(|| UNSET.to_string(), |v| v.to_string())
}

/// Print `text` in `color`, or unstyled when the scheme has no color for it
pub(crate) fn styled<W: Write>(out: &mut W, text: &str, color: Option<Color>) -> io::Result<()> {
    match color {
        Some(color) => queue!(out, SetForegroundColor(color), Print(text), ResetColor),
        None => queue!(out, Print(text)),
    }
}

pub(crate) fn line<W: Write>(out: &mut W, cs: &ColorScheme, text: &str) -> io::Result<()> {
    queue!(out, Print(text))?;
    end_line(out, cs)
}

/// Finish a line; in-place redraws also wipe leftovers from the previous frame
pub(crate) fn end_line<W: Write>(out: &mut W, cs: &ColorScheme) -> io::Result<()> {
    if !cs.is_plain() {
        queue!(out, Clear(ClearType::UntilNewLine))?;
    }
    writeln!(out)
}
