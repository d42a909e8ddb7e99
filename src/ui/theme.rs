//! Theme color definitions for the UI
//!
//! Provides dark and light color palettes selected from the config.

use crate::config::Theme;
use crate::reporter::StyleHint;
use crate::report::ResultStatus;
use ratatui::style::Color;

/// Complete color palette for the UI
#[derive(Debug, Clone, Copy)]
pub struct ThemeColors {
    /// Main background
    pub bg: Color,
    /// Primary foreground text
    pub fg: Color,
    /// Dimmed/secondary text
    pub dim: Color,
    /// Accent color (headings, focused setup field)
    pub accent: Color,
    /// Passed round
    pub success: Color,
    /// Warning status
    pub warning: Color,
    /// Failed round
    pub fail: Color,
    /// Movement indicator while a key is held
    pub moving: Color,
    /// Status bar background
    pub bar_bg: Color,
}

impl ThemeColors {
    /// Create a color palette for the given theme variant
    pub fn from_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self::dark(),
            Theme::Light => Self::light(),
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb(22, 22, 30),
            fg: Color::Rgb(200, 200, 210),
            dim: Color::Rgb(90, 90, 110),
            accent: Color::Rgb(80, 200, 220),
            success: Color::Rgb(80, 200, 120),
            warning: Color::Rgb(240, 180, 80),
            fail: Color::Rgb(240, 90, 100),
            moving: Color::Rgb(240, 180, 80),
            bar_bg: Color::Rgb(40, 40, 50),
        }
    }

    /// High contrast for bright terminals
    pub fn light() -> Self {
        Self {
            bg: Color::Rgb(245, 245, 248),
            fg: Color::Rgb(30, 30, 40),
            dim: Color::Rgb(130, 130, 150),
            accent: Color::Rgb(0, 130, 160),
            success: Color::Rgb(30, 150, 70),
            warning: Color::Rgb(180, 120, 0),
            fail: Color::Rgb(200, 50, 60),
            moving: Color::Rgb(180, 120, 0),
            bar_bg: Color::Rgb(220, 220, 228),
        }
    }

    /// Foreground for a headline label
    pub fn hint(&self, style: StyleHint) -> Color {
        match style {
            StyleHint::Neutral => self.fg,
            StyleHint::Success => self.success,
            StyleHint::Fail => self.fail,
        }
    }

    /// Foreground for a results panel line
    pub fn status(&self, status: ResultStatus) -> Color {
        match status {
            ResultStatus::Ok => self.success,
            ResultStatus::Warning => self.warning,
            ResultStatus::Error => self.fail,
            ResultStatus::Info => self.accent,
        }
    }
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self::dark()
    }
}
