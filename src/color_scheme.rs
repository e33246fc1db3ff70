use crossterm::style::Color;

use crate::system::cpu::CoreStatus;

/// Available color schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSchemeId {
    Default,
    Monochrome,
}

/// Color slots used by the reporter. `None` means "print without styling".
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub id: ColorSchemeId,

    // Per-core observed speed
    pub status_floor: Option<Color>,   // Stuck at the idle floor
    pub status_below: Option<Color>,   // Ramping, below rated max
    pub status_cleared: Option<Color>, // At/above rated max
    pub status_pending: Option<Color>, // No rating or sample yet

    // Final messages
    pub summary_ok: Option<Color>,
    pub summary_fail: Option<Color>,
}

impl ColorScheme {
    pub fn from_id(id: ColorSchemeId) -> Self {
        match id {
            ColorSchemeId::Default => Self::default_scheme(),
            ColorSchemeId::Monochrome => Self::monochrome(),
        }
    }

    /// Monochrome whenever ANSI output is off
    pub fn for_plaintext(plaintext: bool) -> Self {
        Self::from_id(if plaintext {
            ColorSchemeId::Monochrome
        } else {
            ColorSchemeId::Default
        })
    }

    pub fn is_plain(&self) -> bool {
        self.id == ColorSchemeId::Monochrome
    }

    pub fn status_color(&self, status: CoreStatus) -> Option<Color> {
        match status {
            CoreStatus::Floor => self.status_floor,
            CoreStatus::Below => self.status_below,
            CoreStatus::Cleared => self.status_cleared,
            CoreStatus::Pending => self.status_pending,
        }
    }

    // ── Default: bright red / yellow / green ───────────────────────────

    fn default_scheme() -> Self {
        Self {
            id: ColorSchemeId::Default,
            status_floor: Some(Color::Red),
            status_below: Some(Color::Yellow),
            status_cleared: Some(Color::Green),
            status_pending: Some(Color::DarkGrey),
            summary_ok: Some(Color::Green),
            summary_fail: Some(Color::Red),
        }
    }

    // ── Monochrome: no styling at all ──────────────────────────────────

    fn monochrome() -> Self {
        Self {
            id: ColorSchemeId::Monochrome,
            status_floor: None,
            status_below: None,
            status_cleared: None,
            status_pending: None,
            summary_ok: None,
            summary_fail: None,
        }
    }
}
