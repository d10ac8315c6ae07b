//! UI rendering.
//!
//! [`render`] is the single entry point called from the event loop's
//! `terminal.draw()` closure. Layout arithmetic lives in `layout.rs`; each
//! panel has its own module.

mod layout;
pub mod diff_view;
pub mod help;
pub mod issues;
pub mod keybindings;

use ratatui::Frame;

use crate::app::{AppState, Mode};
use crate::theme::Theme;
use layout::{compute_layout, inner_rect, render_status_bar};

/// Renders one frame.
///
/// Viewport heights are written back into `state` so the next keypress can
/// compute half-page distances. The one-frame lag is not noticeable.
pub fn render(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    let [diff, issues, status_bar] = compute_layout(frame.area(), state);

    state.diff_viewport_height = inner_rect(diff).height;
    state.issues_viewport_height = inner_rect(issues).height;

    diff_view::render_diff(frame, diff, state, theme);
    issues::render_issues(frame, issues, state, theme);
    render_status_bar(frame, status_bar, state, theme);

    if state.mode == Mode::HelpOverlay {
        help::render_help_overlay(frame, theme, state.help_scroll);
    }
}
