//! Issues panel: summary, overall risk, producer statistics and the issue
//! list of the latest snapshot.
//!
//! Statistics are shown exactly as the producer reported them, even when they
//! disagree with the list. Issues that the correlator could not pin to any
//! diff line are marked so the reader knows not to look for them in the diff.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Paragraph, Wrap},
    Frame,
};
use streamrev_core::{Issue, Snapshot};

use crate::app::{AppState, PanelFocus, RequestStatus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

pub fn render_issues(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let block = panel_block("Review", state.focus == PanelFocus::Issues, theme);
    let inner = inner_rect(area);
    frame.render_widget(block, area);

    let text = build_issues_text(state, theme);
    let max_scroll = u16::try_from(text.lines.len().saturating_sub(1)).unwrap_or(u16::MAX);
    frame.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .scroll((state.issues_scroll.min(max_scroll), 0)),
        inner,
    );
}

fn build_issues_text(state: &AppState, theme: &Theme) -> Text<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(theme.muted);
    let mut lines: Vec<Line<'static>> = Vec::new();

    if let RequestStatus::Failed(error) = &state.status {
        lines.push(Line::styled(
            format!("Request failed: {error}"),
            Style::default().fg(theme.status_failed),
        ));
        lines.push(Line::raw(""));
    }

    let Some(snapshot) = &state.snapshot else {
        let msg = match state.status {
            RequestStatus::Waiting => "Waiting for the first complete analysis...",
            RequestStatus::LoadingDiff => "Loading diff...",
            _ => "No analysis yet. Press r to start one.",
        };
        lines.push(Line::styled(msg, muted));
        return Text::from(lines);
    };
    let analysis = &snapshot.analysis;

    lines.push(Line::styled("Summary", bold));
    if analysis.summary.is_empty() {
        lines.push(Line::styled("(none)", muted));
    } else {
        lines.extend(analysis.summary.lines().map(|l| Line::raw(l.to_owned())));
    }
    lines.push(Line::raw(""));

    lines.push(Line::from(vec![
        Span::styled("Overall risk: ", bold),
        Span::styled(
            analysis.overall_risk.as_str().to_uppercase(),
            bold.fg(theme.severity(analysis.overall_risk)),
        ),
    ]));
    let stats = analysis.statistics;
    lines.push(Line::styled(
        format!(
            "Reported: {} total, {} high, {} medium, {} low",
            stats.total_issues, stats.high_risk, stats.medium_risk, stats.low_risk
        ),
        muted,
    ));
    lines.push(Line::raw(""));

    lines.push(Line::styled(format!("Issues ({})", analysis.issues.len()), bold));
    for issue in &analysis.issues {
        push_issue(&mut lines, issue, is_pinned(snapshot, issue), theme);
    }
    if !snapshot.is_final {
        lines.push(Line::styled("...", muted));
    }
    Text::from(lines)
}

fn push_issue(lines: &mut Vec<Line<'static>>, issue: &Issue, pinned: bool, theme: &Theme) {
    let color = theme.severity(issue.severity);
    let mut location = match (&issue.file_path, issue.line_number) {
        (Some(path), Some(n)) => format!("{path}, line {n}"),
        (Some(path), None) => path.clone(),
        (None, Some(n)) => format!("line {n}"),
        (None, None) => String::new(),
    };
    if !pinned {
        if !location.is_empty() {
            location.push(' ');
        }
        location.push_str("(not in diff)");
    }

    lines.push(Line::from(vec![
        Span::styled("● ", Style::default().fg(color)),
        Span::styled(
            format!("[{}] ", issue.severity),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(issue.category.clone()),
        Span::styled(format!("  {location}"), Style::default().fg(theme.muted)),
    ]));
    if !issue.description.is_empty() {
        lines.push(Line::raw(format!("  {}", issue.description)));
    }
    if !issue.recommendation.is_empty() {
        lines.push(Line::styled(
            format!("  → {}", issue.recommendation),
            Style::default().fg(theme.muted),
        ));
    }
}

/// Whether `issue` is the pinned issue of at least one diff line.
fn is_pinned(snapshot: &Snapshot, issue: &Issue) -> bool {
    snapshot.matched().any(|(_, pinned)| pinned == issue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::types::DiffPayload;
    use streamrev_core::StreamController;

    fn plain(text: &Text<'_>) -> Vec<String> {
        text.lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn lists_issues_and_marks_unpinned_ones() {
        let mut state = AppState::default();
        state.apply_diff(DiffPayload {
            label: "t".to_owned(),
            mode: None,
            text: "+++ b/a.rs\n+x\n".to_owned(),
        });
        let id = state.begin_request();
        let mut controller = StreamController::new(state.lines.clone());
        controller.push_chunk(
            br#"{"summary":"Adds x","overallRisk":"high","issues":[
                {"severity":"High","category":"Bug","description":"x is wrong","recommendation":"fix x","lineNumber":2},
                {"severity":"Low","category":"Style","lineNumber":40}
            ],"statistics":{"totalIssues":3}}"#,
        );
        state.apply_snapshot(id, controller.finish().unwrap());

        let text = plain(&build_issues_text(&state, &Theme::dark()));
        assert_eq!(text[0], "Summary");
        assert_eq!(text[1], "Adds x");
        assert_eq!(text[3], "Overall risk: HIGH");
        assert_eq!(text[4], "Reported: 3 total, 0 high, 0 medium, 0 low");
        assert_eq!(text[6], "Issues (2)");
        assert_eq!(text[7], "● [High] Bug  line 2");
        assert_eq!(text[8], "  x is wrong");
        assert_eq!(text[9], "  → fix x");
        assert_eq!(text[10], "● [Low] Style  line 40 (not in diff)");
    }

    #[test]
    fn failure_is_shown_above_the_last_snapshot() {
        let mut state = AppState::default();
        let id = state.begin_request();
        state.fail_request(id, "503".to_owned());
        let text = plain(&build_issues_text(&state, &Theme::dark()));
        assert_eq!(text[0], "Request failed: 503");
        assert!(text[2].starts_with("No analysis yet"));
    }
}
