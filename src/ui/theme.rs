//! Color palette and style helpers for castui

use ratatui::style::{Color, Modifier, Style};

use crate::models::{PlayerState, SessionState};

/// castui palette: dark slate with a teal accent
pub struct Theme;

impl Theme {
    // ═══════════════════════════════════════════════════════════════════════
    // PALETTE
    // ═══════════════════════════════════════════════════════════════════════

    /// Background: #101418
    pub const BACKGROUND: Color = Color::Rgb(0x10, 0x14, 0x18);

    /// Panels and the status bar: #1a2027
    pub const SURFACE: Color = Color::Rgb(0x1a, 0x20, 0x27);

    /// Primary accent: #2ec4b6 (teal)
    pub const PRIMARY: Color = Color::Rgb(0x2e, 0xc4, 0xb6);

    /// Selected device marker: #ffbf69 (amber)
    pub const TARGET: Color = Color::Rgb(0xff, 0xbf, 0x69);

    /// Text: #e6e6e6
    pub const TEXT: Color = Color::Rgb(0xe6, 0xe6, 0xe6);

    /// Muted text: #7a8591
    pub const DIM: Color = Color::Rgb(0x7a, 0x85, 0x91);

    /// Playing: #7bd88f
    pub const PLAYING: Color = Color::Rgb(0x7b, 0xd8, 0x8f);

    /// Paused: #fcd34d
    pub const PAUSED: Color = Color::Rgb(0xfc, 0xd3, 0x4d);

    /// Error: #ff6b6b
    pub const ERROR: Color = Color::Rgb(0xff, 0x6b, 0x6b);

    /// Panel border
    pub const BORDER: Color = Color::Rgb(0x3a, 0x46, 0x52);

    // ═══════════════════════════════════════════════════════════════════════
    // STYLE HELPERS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn text() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::BACKGROUND)
    }

    pub fn dimmed() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    /// Border of the panel that has keyboard focus
    pub fn border_focused() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Device list row under the cursor
    pub fn list_item_selected() -> Style {
        Style::default()
            .fg(Self::BACKGROUND)
            .bg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Marker for the cast target
    pub fn cast_target() -> Style {
        Style::default()
            .fg(Self::TARGET)
            .add_modifier(Modifier::BOLD)
    }

    pub fn input() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::SURFACE)
    }

    pub fn keybind() -> Style {
        Style::default().fg(Self::TARGET)
    }

    pub fn keybind_desc() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn status_bar() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::SURFACE)
    }

    /// Spinner while a background job runs
    pub fn loading() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Error banner text
    pub fn error() -> Style {
        Style::default()
            .fg(Self::ERROR)
            .add_modifier(Modifier::BOLD)
    }

    pub fn progress_bar() -> Style {
        Style::default().fg(Self::PLAYING).bg(Self::SURFACE)
    }

    /// Color for a session state label
    pub fn session_state(state: SessionState) -> Style {
        let fg = match state {
            SessionState::Idle => Self::DIM,
            SessionState::Playing => Self::PLAYING,
            SessionState::Paused => Self::PAUSED,
            SessionState::Stopped => Self::TEXT,
            SessionState::Error => Self::ERROR,
        };
        Style::default().fg(fg).add_modifier(Modifier::BOLD)
    }

    /// Color for what the receiver reports
    pub fn player_state(state: PlayerState) -> Style {
        let fg = match state {
            PlayerState::Playing => Self::PLAYING,
            PlayerState::Paused | PlayerState::Buffering => Self::PAUSED,
            PlayerState::Idle | PlayerState::Unknown => Self::DIM,
        };
        Style::default().fg(fg)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// COLOR UTILITIES
// ═══════════════════════════════════════════════════════════════════════════

/// Relative luminance of an sRGB color (WCAG 2.0 definition)
pub fn relative_luminance(r: u8, g: u8, b: u8) -> f64 {
    fn linear(c: u8) -> f64 {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }

    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

/// Contrast ratio between two colors, from 1 (same) to 21 (black on white)
pub fn contrast_ratio(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> f64 {
    let a = relative_luminance(fg.0, fg.1, fg.2);
    let b = relative_luminance(bg.0, bg.1, bg.2);
    let (lighter, darker) = if a > b { (a, b) } else { (b, a) };
    (lighter + 0.05) / (darker + 0.05)
}

/// WCAG AA for normal text (4.5:1)
pub fn meets_wcag_aa(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> bool {
    contrast_ratio(fg, bg) >= 4.5
}

/// WCAG AA for large or bold text (3:1)
pub fn meets_wcag_aa_large(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> bool {
    contrast_ratio(fg, bg) >= 3.0
}

/// RGB tuple of a `Color::Rgb`, `None` for indexed/named colors
pub fn color_to_rgb(color: Color) -> Option<(u8, u8, u8)> {
    match color {
        Color::Rgb(r, g, b) => Some((r, g, b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_luminance_extremes() {
        assert!(relative_luminance(0, 0, 0).abs() < 0.001);
        assert!((relative_luminance(255, 255, 255) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_contrast_ratio_bounds() {
        assert!((contrast_ratio((0, 0, 0), (255, 255, 255)) - 21.0).abs() < 0.1);
        assert!((contrast_ratio((90, 90, 90), (90, 90, 90)) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_named_colors_have_no_rgb() {
        assert!(color_to_rgb(Color::Red).is_none());
        assert_eq!(color_to_rgb(Theme::PRIMARY), Some((0x2e, 0xc4, 0xb6)));
    }

    #[test]
    fn test_every_session_state_has_a_color() {
        for state in [
            SessionState::Idle,
            SessionState::Playing,
            SessionState::Paused,
            SessionState::Stopped,
            SessionState::Error,
        ] {
            assert!(Theme::session_state(state).fg.is_some());
        }
    }
}
