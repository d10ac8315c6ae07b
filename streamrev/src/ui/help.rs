//! Help overlay.
//!
//! Drawn inside the same `terminal.draw()` as the panels: `Clear` erases the
//! area first, then a bordered `Paragraph` lists the keys.

use ratatui::{
    layout::Constraint,
    style::Style,
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
    Frame,
};

use crate::theme::Theme;

/// Skipped below 60 columns, where the centred area would collapse.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 60 {
        return;
    }

    let overlay_area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(80));
    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help (j/k scroll, ? or Esc to close) ")
        .border_style(Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(help_text())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn help_text() -> Text<'static> {
    Text::from(vec![
        Line::from("Navigation"),
        Line::from("  j / k         Scroll down / up one line"),
        Line::from("  g / G         Jump to top / bottom"),
        Line::from("  Ctrl-d / u    Scroll half a page down / up"),
        Line::from("  Tab           Switch focus between diff and review"),
        Line::from(""),
        Line::from("Diff"),
        Line::from("  [ / ]         Previous / next hunk"),
        Line::from("  n / N         Next / previous line with an issue"),
        Line::from("  < / >         Shrink / grow the diff panel"),
        Line::from("  m             Cycle git diff: unstaged, staged, main..HEAD"),
        Line::from(""),
        Line::from("Analysis"),
        Line::from("  r             Restart the analysis request"),
        Line::from(""),
        Line::from("General"),
        Line::from("  ?             Open / close this help"),
        Line::from("  q / Esc       Quit"),
    ])
}
