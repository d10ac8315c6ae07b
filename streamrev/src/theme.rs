//! Color themes.
//!
//! - `dark` uses ANSI 16 colors so it works on any terminal, including
//!   256-color SSH sessions.
//! - `catppuccin_mocha` uses the Catppuccin Mocha palette in RGB and needs
//!   truecolor.

use ratatui::style::Color;
use streamrev_core::Severity;

/// Every color streamrev renders with.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    // Panel borders
    pub border_active: Color,
    pub border_inactive: Color,

    // Diff view
    pub diff_added: Color,
    pub diff_removed: Color,
    pub diff_context: Color,
    pub diff_hunk_header: Color,
    pub diff_file_header: Color,
    pub line_number: Color,
    /// Background of the line under the cursor.
    pub cursor_line: Color,

    // Severity markers, gutter and issue list
    pub severity_high: Color,
    pub severity_medium: Color,
    pub severity_low: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    pub status_streaming: Color,
    pub status_done: Color,
    pub status_failed: Color,

    pub muted: Color,
}

impl Theme {
    /// The default theme.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            diff_added: Color::Green,
            diff_removed: Color::Red,
            diff_context: Color::Reset,
            diff_hunk_header: Color::Cyan,
            diff_file_header: Color::Yellow,
            line_number: Color::DarkGray,
            cursor_line: Color::Indexed(236),

            severity_high: Color::Red,
            severity_medium: Color::Yellow,
            severity_low: Color::Blue,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_streaming: Color::Cyan,
            status_done: Color::Green,
            status_failed: Color::Red,

            muted: Color::DarkGray,
        }
    }

    /// Palette source: <https://github.com/catppuccin/catppuccin>, Mocha.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161); // #a6e3a1
        let red = Color::Rgb(243, 139, 168); // #f38ba8
        let yellow = Color::Rgb(249, 226, 175); // #f9e2af
        let blue = Color::Rgb(137, 180, 250); // #89b4fa
        let teal = Color::Rgb(148, 226, 213); // #94e2d5
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface0 = Color::Rgb(49, 50, 68); // #313244
        let surface1 = Color::Rgb(69, 71, 90); // #45475a
        let text = Color::Rgb(205, 214, 244); // #cdd6f4
        let peach = Color::Rgb(250, 179, 135); // #fab387

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            diff_added: green,
            diff_removed: red,
            diff_context: text,
            diff_hunk_header: teal,
            diff_file_header: yellow,
            line_number: overlay1,
            cursor_line: surface0,

            severity_high: red,
            severity_medium: peach,
            severity_low: blue,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_streaming: teal,
            status_done: green,
            status_failed: red,

            muted: overlay1,
        }
    }

    pub fn severity(&self, severity: Severity) -> Color {
        match severity {
            Severity::High => self.severity_high,
            Severity::Medium => self.severity_medium,
            Severity::Low => self.severity_low,
        }
    }

    /// Resolves a config theme name. Unknown names fall back to `dark()` with
    /// a logged warning.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!(theme = other, "unknown theme, falling back to 'dark'");
                Self::dark()
            }
        }
    }
}
