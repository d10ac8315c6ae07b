//! Syntax highlighting for the code part of diff lines.
//!
//! Highlighting runs once per loaded diff, not per frame. Each file gets the
//! syntax matching its extension and a fresh highlighter at every hunk, so
//! state from one hunk never leaks into the next.

use std::path::Path;
use std::sync::LazyLock;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use streamrev_core::diff::summarize_files;
use streamrev_core::{DiffLine, DiffLineKind};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

static PS: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static TS: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Highlighted code spans, one entry per input line.
///
/// Entries are `None` for header and metadata lines, which the diff view
/// styles by kind. Code spans cover the line content only, never the
/// `+`/`-`/space marker.
pub type HighlightedCode = Vec<Option<Vec<Span<'static>>>>;

/// Loads the syntax and theme sets ahead of the first diff.
pub fn warm_up() {
    let _ = &*PS;
    let _ = &*TS;
}

pub fn highlight_code(lines: &[DiffLine]) -> HighlightedCode {
    let Some(theme) = TS
        .themes
        .get("base16-ocean.dark")
        .or_else(|| TS.themes.values().next())
    else {
        return vec![None; lines.len()];
    };

    let files = summarize_files(lines);
    let mut file_starts = files.iter().peekable();
    let mut syntax = PS.find_syntax_plain_text();
    let mut highlighter: Option<HighlightLines<'_>> = None;
    let mut out = Vec::with_capacity(lines.len());

    for line in lines {
        if let Some(file) = file_starts.next_if(|f| f.first_line == line.index) {
            syntax = syntax_for(&file.path);
            highlighter = None;
        }
        match line.kind {
            DiffLineKind::HunkHeader => {
                highlighter = Some(HighlightLines::new(syntax, theme));
                out.push(None);
            }
            DiffLineKind::Added | DiffLineKind::Removed | DiffLineKind::Context => {
                let h = highlighter.get_or_insert_with(|| HighlightLines::new(syntax, theme));
                out.push(Some(code_spans(&line.content, h)));
            }
            DiffLineKind::FileHeader | DiffLineKind::Metadata => out.push(None),
        }
    }
    out
}

fn syntax_for(path: &str) -> &'static SyntaxReference {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| PS.find_syntax_by_extension(ext))
        .unwrap_or_else(|| PS.find_syntax_plain_text())
}

/// Falls back to one unstyled span when highlighting fails.
///
/// The syntax set is the newline flavour, so each line is fed with its `\n`
/// restored and the newline is dropped from the resulting spans.
fn code_spans(code: &str, h: &mut HighlightLines<'_>) -> Vec<Span<'static>> {
    let terminated = format!("{code}\n");
    let ranges = h.highlight_line(&terminated, &PS).unwrap_or_default();
    let spans: Vec<Span<'static>> = ranges
        .into_iter()
        .filter_map(|(style, text)| {
            let text = text.strip_suffix('\n').unwrap_or(text);
            (!text.is_empty()).then(|| syntect_to_span(style, text))
        })
        .collect();
    if spans.is_empty() {
        vec![Span::raw(code.to_owned())]
    } else {
        spans
    }
}

/// Foreground and font style only; the diff view owns backgrounds.
fn syntect_to_span(style: syntect::highlighting::Style, content: &str) -> Span<'static> {
    let fg = style.foreground;
    let mut ratatui_style = Style::default();
    if fg.a > 0 {
        ratatui_style = ratatui_style.fg(Color::Rgb(fg.r, fg.g, fg.b));
    }
    if style.font_style.contains(FontStyle::BOLD) {
        ratatui_style = ratatui_style.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        ratatui_style = ratatui_style.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        ratatui_style = ratatui_style.add_modifier(Modifier::UNDERLINED);
    }
    Span::styled(content.to_owned(), ratatui_style)
}
