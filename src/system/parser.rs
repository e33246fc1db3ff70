//! Telemetry parsing: `/proc/cpuinfo`-style text into [`RunState`] updates.
//!
//! Lines are scanned in order with a "current core" cursor set by each
//! `processor` line. `model name` and `cpu MHz` lines apply to that core.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::system::cpu::RunState;

/// `<label>[whitespace/colon]<payload>`, case-sensitive, anchored at line start
static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(processor|model name|cpu MHz)[\s:]+(.*)$").expect("valid field regex")
});

/// Advertised clock rating inside a model string, e.g. `2.50GHz`
static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)GHz").expect("valid rating regex"));

/// Leading integer part of a frequency sample, e.g. `2500` from `2500.123`
static MHZ_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)").expect("valid mhz regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Processor,
    ModelName,
    CpuMhz,
}

impl LineKind {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "processor" => Some(LineKind::Processor),
            "model name" => Some(LineKind::ModelName),
            "cpu MHz" => Some(LineKind::CpuMhz),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LineKind::Processor => "processor",
            LineKind::ModelName => "model name",
            LineKind::CpuMhz => "cpu MHz",
        }
    }
}

/// A recognised line that could not be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseIssue {
    /// `model name` or `cpu MHz` before any `processor` line
    NoCurrentCore { line: usize, kind: LineKind },
    /// Recognised label with a payload that isn't a number
    BadValue { line: usize, kind: LineKind, value: String },
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseIssue::NoCurrentCore { line, kind } => {
                write!(f, "line {}: '{}' before any processor line", line, kind.label())
            }
            ParseIssue::BadValue { line, kind, value } => {
                write!(f, "line {}: unparsable '{}' value {:?}", line, kind.label(), value)
            }
        }
    }
}

/// Split a line into its kind and payload, or `None` for unrelated lines
pub fn classify(line: &str) -> Option<(LineKind, &str)> {
    let caps = FIELD_RE.captures(line.trim())?;
    let kind = LineKind::from_label(caps.get(1)?.as_str())?;
    Some((kind, caps.get(2).map_or("", |m| m.as_str())))
}

/// Rated max in MHz from a model descriptor (`2.50GHz` -> 2500)
pub fn rated_mhz(model: &str) -> Option<u32> {
    let caps = RATING_RE.captures(model)?;
    let ghz: f64 = caps[1].parse().ok()?;
    Some((ghz * 1000.0).round() as u32)
}

fn sample_mhz(payload: &str) -> Option<u32> {
    MHZ_RE.captures(payload)?[1].parse().ok()
}

/// Apply one telemetry snapshot to `state`, returning lines that were skipped.
pub fn apply_snapshot<S: AsRef<str>>(lines: &[S], state: &mut RunState) -> Vec<ParseIssue> {
    let mut issues = Vec::new();
    let mut current: Option<usize> = None;

    for (idx, raw) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let Some((kind, payload)) = classify(raw.as_ref()) else {
            continue;
        };

        match (kind, current) {
            (LineKind::Processor, _) => match payload.trim().parse::<usize>() {
                Ok(id) => current = Some(id),
                Err(_) => {
                    // Lines up to the next valid processor line belong to an unknown core
                    current = None;
                    issues.push(ParseIssue::BadValue {
                        line: line_no,
                        kind,
                        value: payload.to_string(),
                    });
                }
            },
            (_, None) => issues.push(ParseIssue::NoCurrentCore { line: line_no, kind }),
            (LineKind::ModelName, Some(id)) => {
                let core = state.get_or_create(id);
                if core.model_name.is_none() {
                    let model = payload.trim();
                    core.set_model(model, rated_mhz(model));
                }
            }
            (LineKind::CpuMhz, Some(id)) => match sample_mhz(payload.trim()) {
                Some(mhz) => state.get_or_create(id).record_sample(mhz),
                None => issues.push(ParseIssue::BadValue {
                    line: line_no,
                    kind,
                    value: payload.to_string(),
                }),
            },
        }
    }

    issues
}
