//! Two-panel layout plus status bar.
//!
//! Pure layout arithmetic, recomputed inside every `terminal.draw()` so each
//! frame reflects the live terminal size. At 100 columns and wider the diff
//! and issues panels sit side by side, split by `AppState.diff_pct`; below
//! that they stack vertically.
//!
//! `Spacing::Overlap(1)` with `MergeStrategy::Fuzzy` makes adjacent borders
//! share one column and merge their junction characters.

use ratatui::{
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
    Frame,
};

use crate::app::{AppState, RequestStatus};
use crate::theme::Theme;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Returns `[diff, issues, status_bar]` for the current frame.
pub fn compute_layout(area: Rect, state: &AppState) -> [Rect; 3] {
    let [main_area, status_bar] =
        area.layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let split = if area.width >= 100 {
        Layout::horizontal([
            Constraint::Percentage(state.diff_pct),
            Constraint::Fill(1),
        ])
    } else {
        Layout::vertical([Constraint::Percentage(60), Constraint::Fill(1)])
    };
    let [diff, issues] = main_area.layout(&split.spacing(Spacing::Overlap(1)));

    [diff, issues, status_bar]
}

/// Inner `Rect` of a bordered panel.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin {
        vertical: 1,
        horizontal: 1,
    })
}

/// Thick border when focused, plain otherwise.
pub fn panel_block<'a>(title: &'a str, is_focused: bool, theme: &'a Theme) -> Block<'a> {
    let (border_type, color) = if is_focused {
        (BorderType::Thick, theme.border_active)
    } else {
        (BorderType::Plain, theme.border_inactive)
    };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(Style::default().fg(color))
        .merge_borders(MergeStrategy::Fuzzy)
}

/// One row: request state, diff origin, file/chunk/issue counts, help hint.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    frame.render_widget(
        Paragraph::new(status_line(state, theme))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}

fn status_line<'a>(state: &'a AppState, theme: &Theme) -> Line<'a> {
    let spinner = SPINNER[state.spinner % SPINNER.len()];
    let (label, color) = match &state.status {
        RequestStatus::Idle => (" IDLE ".to_owned(), theme.status_bar_fg),
        RequestStatus::LoadingDiff => (format!(" {spinner} DIFF "), theme.status_streaming),
        RequestStatus::Waiting => (format!(" {spinner} WAITING "), theme.status_streaming),
        RequestStatus::Streaming => (format!(" {spinner} STREAMING "), theme.status_streaming),
        RequestStatus::Done => (" DONE ".to_owned(), theme.status_done),
        RequestStatus::Failed(_) => (" FAILED ".to_owned(), theme.status_failed),
    };

    let chunks = state.snapshot.as_ref().map_or(0, |s| s.chunks_consumed);
    let issues = state.snapshot.as_ref().map_or(0, |s| s.analysis.issues.len());
    let mut spans = vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" {} ", state.diff_label)),
        Span::raw(format!(
            "| {} file(s) | {} chunk(s) | {} issue(s) ",
            state.files.len(),
            chunks,
            issues
        )),
    ];
    if let RequestStatus::Failed(error) = &state.status {
        spans.push(Span::styled(
            format!("| {error} "),
            Style::default().fg(theme.status_failed),
        ));
    }
    spans.push(Span::raw("| ? help"));
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_terminals_split_side_by_side() {
        let state = AppState::default();
        let [diff, issues, status] = compute_layout(Rect::new(0, 0, 200, 50), &state);
        assert_eq!(diff.y, issues.y);
        assert!(diff.width > issues.width);
        assert_eq!(status.height, 1);
        assert_eq!(status.y, 49);
    }

    #[test]
    fn narrow_terminals_stack_panels() {
        let state = AppState::default();
        let [diff, issues, _] = compute_layout(Rect::new(0, 0, 80, 40), &state);
        assert_eq!(diff.x, issues.x);
        assert!(issues.y > diff.y);
    }

    #[test]
    fn status_line_shows_failure_text() {
        let mut state = AppState::default();
        state.status = RequestStatus::Failed("connection reset".to_owned());
        let line = status_line(&state, &Theme::dark());
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(text.starts_with(" FAILED "));
        assert!(text.contains("connection reset"));
    }
}
