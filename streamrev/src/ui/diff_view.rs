//! Diff panel renderer.
//!
//! Virtual scrolling: only `lines[diff_scroll..diff_scroll + height]` are
//! turned into `ListItem`s each frame, so very large diffs cost O(viewport).
//!
//! Each row is `gutter | old no. | new no. | marker | code`, where the gutter
//! carries a severity dot on lines the latest snapshot correlated with an
//! issue, and such lines end with a short category hint.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};
use streamrev_core::{DiffLineKind, Issue};

use crate::app::{AppState, PanelFocus, RequestStatus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

pub fn render_diff(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let block = panel_block("Diff", state.focus == PanelFocus::Diff, theme);
    let inner = inner_rect(area);
    frame.render_widget(block, area);

    if state.lines.is_empty() {
        let msg = match state.status {
            RequestStatus::LoadingDiff => "Loading diff...",
            _ => "No changes to review.",
        };
        frame.render_widget(List::new(vec![ListItem::new(Line::raw(msg))]), inner);
        return;
    }

    let total = state.lines.len();
    let start = state.diff_scroll.min(total.saturating_sub(1));
    let end = (start + inner.height as usize).min(total);

    let items: Vec<ListItem> = (start..end)
        .map(|pos| ListItem::new(render_line(state, pos, theme)))
        .collect();
    frame.render_widget(List::new(items), inner);
}

fn render_line(state: &AppState, pos: usize, theme: &Theme) -> Line<'static> {
    let line = &state.lines[pos];
    let issue = state.annotation(pos);

    let mut spans = Vec::with_capacity(8);
    spans.push(gutter(issue, theme));
    spans.push(Span::styled(
        format!("{} {} ", lineno(line.old_lineno), lineno(line.new_lineno)),
        Style::default().fg(theme.line_number),
    ));

    let style = kind_style(line.kind, theme);
    if let Some(marker) = marker(line.kind) {
        spans.push(Span::styled(marker, style));
    }
    match state.code.get(pos).and_then(Option::as_ref) {
        Some(code) => spans.extend(code.iter().cloned()),
        None => spans.push(Span::styled(line.content.clone(), style)),
    }

    if let Some(issue) = issue {
        spans.push(hint(issue, theme));
    }
    Line::from(spans)
}

fn gutter(issue: Option<&Issue>, theme: &Theme) -> Span<'static> {
    match issue {
        Some(issue) => Span::styled("● ", Style::default().fg(theme.severity(issue.severity))),
        None => Span::raw("  "),
    }
}

fn marker(kind: DiffLineKind) -> Option<&'static str> {
    match kind {
        DiffLineKind::Added => Some("+"),
        DiffLineKind::Removed => Some("-"),
        DiffLineKind::Context => Some(" "),
        _ => None,
    }
}

fn lineno(n: Option<u32>) -> String {
    match n {
        Some(n) => format!("{n:>4}"),
        None => "    ".to_owned(),
    }
}

fn kind_style(kind: DiffLineKind, theme: &Theme) -> Style {
    match kind {
        DiffLineKind::Added => Style::default().fg(theme.diff_added),
        DiffLineKind::Removed => Style::default().fg(theme.diff_removed),
        DiffLineKind::Context => Style::default().fg(theme.diff_context),
        DiffLineKind::HunkHeader => Style::default().fg(theme.diff_hunk_header),
        DiffLineKind::FileHeader => Style::default()
            .fg(theme.diff_file_header)
            .add_modifier(Modifier::BOLD),
        DiffLineKind::Metadata => Style::default().fg(theme.muted),
    }
}

fn hint(issue: &Issue, theme: &Theme) -> Span<'static> {
    let text = if issue.category.is_empty() {
        format!("  ◀ {}", issue.severity)
    } else {
        format!("  ◀ {}: {}", issue.severity, issue.category)
    };
    Span::styled(
        text,
        Style::default()
            .fg(theme.severity(issue.severity))
            .add_modifier(Modifier::ITALIC),
    )
}

/// Plain text of a rendered row, for tests and debugging.
#[cfg(test)]
fn row_text(state: &AppState, pos: usize) -> String {
    render_line(state, pos, &Theme::dark())
        .spans
        .iter()
        .map(|s| s.content.as_ref())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::types::DiffPayload;
    use streamrev_core::StreamController;

    fn state_with_issue() -> AppState {
        let mut state = AppState::default();
        state.apply_diff(DiffPayload {
            label: "t".to_owned(),
            mode: None,
            text: "--- a/x.py\n+++ b/x.py\n@@ -3,1 +3,1 @@\n-a = 1\n+a = 2\n".to_owned(),
        });
        let id = state.begin_request();
        let mut controller = StreamController::new(state.lines.clone());
        controller.push_chunk(
            br#"{"issues":[{"severity":"High","category":"Logic","lineNumber":5}]}"#,
        );
        state.apply_snapshot(id, controller.finish().unwrap());
        state
    }

    #[test]
    fn annotated_line_has_marker_and_hint() {
        let state = state_with_issue();
        let row = row_text(&state, 4);
        assert!(row.starts_with("● "), "{row}");
        assert!(row.contains("   3 +a = 2"), "{row}");
        assert!(row.ends_with("◀ High: Logic"), "{row}");
    }

    #[test]
    fn plain_lines_have_blank_gutter_and_numbers() {
        let state = state_with_issue();
        assert_eq!(row_text(&state, 3), "     3      -a = 1");
        assert_eq!(row_text(&state, 2), format!("{}@@ -3,1 +3,1 @@", " ".repeat(12)));
    }
}
