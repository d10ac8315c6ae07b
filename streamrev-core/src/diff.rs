//! Unified-diff parsing.
//!
//! [`parse`] turns diff text into an ordered `Vec<DiffLine>`. It is total:
//! anything it does not recognise becomes [`DiffLineKind::Metadata`], never an
//! error. Classification depends only on each line's prefix, so the same text
//! always yields the same lines.

use crate::types::{DiffLine, DiffLineKind, FileSummary};

/// Classifies one raw diff line by its prefix.
///
/// File-header prefixes are checked before the single-character markers so
/// that `+++`/`---` never count as added/removed lines.
pub fn classify(raw: &str) -> DiffLineKind {
    if raw.starts_with("diff --git")
        || raw.starts_with("index ")
        || raw.starts_with("---")
        || raw.starts_with("+++")
    {
        DiffLineKind::FileHeader
    } else if raw.starts_with("@@") {
        DiffLineKind::HunkHeader
    } else if raw.starts_with('+') {
        DiffLineKind::Added
    } else if raw.starts_with('-') {
        DiffLineKind::Removed
    } else if raw.starts_with(' ') {
        DiffLineKind::Context
    } else {
        DiffLineKind::Metadata
    }
}

/// Parses unified-diff text into classified lines with 1-based indices.
///
/// Lines split on `\n` (a trailing `\r` is dropped); a final newline does not
/// produce an extra empty line. Old/new line numbers are tracked from the most
/// recent hunk header and reset at every file header.
pub fn parse(text: &str) -> Vec<DiffLine> {
    let mut lines = Vec::new();
    let mut cursor: Option<(u32, u32)> = None;

    for (i, raw) in text.lines().enumerate() {
        let kind = classify(raw);
        let (content, old_lineno, new_lineno) = match kind {
            DiffLineKind::Added => {
                let new = cursor.map(|(_, new)| new);
                if let Some((_, new)) = cursor.as_mut() {
                    *new += 1;
                }
                (&raw[1..], None, new)
            }
            DiffLineKind::Removed => {
                let old = cursor.map(|(old, _)| old);
                if let Some((old, _)) = cursor.as_mut() {
                    *old += 1;
                }
                (&raw[1..], old, None)
            }
            DiffLineKind::Context => {
                let current = cursor;
                if let Some((old, new)) = cursor.as_mut() {
                    *old += 1;
                    *new += 1;
                }
                (&raw[1..], current.map(|c| c.0), current.map(|c| c.1))
            }
            DiffLineKind::HunkHeader => {
                cursor = parse_hunk_header(raw);
                (raw, None, None)
            }
            DiffLineKind::FileHeader => {
                cursor = None;
                (raw, None, None)
            }
            DiffLineKind::Metadata => (raw, None, None),
        };

        lines.push(DiffLine {
            index: i + 1,
            kind,
            content: content.to_owned(),
            old_lineno,
            new_lineno,
        });
    }

    lines
}

/// Extracts `(old_start, new_start)` from `@@ -a[,b] +c[,d] @@ ...`.
fn parse_hunk_header(raw: &str) -> Option<(u32, u32)> {
    let mut ranges = raw.trim_start_matches('@').split_whitespace();
    let old = ranges.next()?.strip_prefix('-')?;
    let new = ranges.next()?.strip_prefix('+')?;
    let start = |range: &str| range.split(',').next()?.parse::<u32>().ok();
    Some((start(old)?, start(new)?))
}

/// Returns the 0-based positions of hunk headers within `lines`.
pub fn hunk_offsets(lines: &[DiffLine]) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.kind == DiffLineKind::HunkHeader)
        .map(|(pos, _)| pos)
        .collect()
}

/// Rolls parsed lines up into one [`FileSummary`] per changed file.
///
/// A file starts at `diff --git`, or at a `---` line not preceded by one.
/// The path comes from `+++ b/<path>`; deletions (`+++ /dev/null`) fall back
/// to the `---` path, and header-only diffs to the `diff --git` path.
pub fn summarize_files(lines: &[DiffLine]) -> Vec<FileSummary> {
    let mut files: Vec<FileSummary> = Vec::new();
    let mut in_header = false;

    for line in lines {
        match line.kind {
            DiffLineKind::FileHeader => {
                let text = line.content.as_str();
                let starts_file = text.starts_with("diff --git")
                    || (text.starts_with("---") && !in_header);
                if starts_file {
                    files.push(FileSummary {
                        path: String::new(),
                        first_line: line.index,
                        added: 0,
                        removed: 0,
                    });
                }
                in_header = true;
                let Some(file) = files.last_mut() else { continue };
                if let Some(rest) = text.strip_prefix("diff --git ") {
                    if let Some((_, b)) = rest.rsplit_once(" b/") {
                        file.path = b.to_owned();
                    }
                } else if let Some(path) = header_path(text, "+++ ") {
                    file.path = path.to_owned();
                } else if let Some(path) = header_path(text, "--- ") {
                    if file.path.is_empty() {
                        file.path = path.to_owned();
                    }
                }
            }
            DiffLineKind::Added => {
                in_header = false;
                if let Some(file) = files.last_mut() {
                    file.added += 1;
                }
            }
            DiffLineKind::Removed => {
                in_header = false;
                if let Some(file) = files.last_mut() {
                    file.removed += 1;
                }
            }
            DiffLineKind::HunkHeader | DiffLineKind::Context => in_header = false,
            DiffLineKind::Metadata => {}
        }
    }

    files
}

/// Strips `prefix` and the `a/`/`b/` marker from a `---`/`+++` header.
/// Returns `None` for `/dev/null`.
fn header_path<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let path = text.strip_prefix(prefix)?.split('\t').next()?.trim_end();
    if path == "/dev/null" {
        return None;
    }
    Some(
        path.strip_prefix("a/")
            .or_else(|| path.strip_prefix("b/"))
            .unwrap_or(path),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use DiffLineKind::*;

    const SAMPLE: &str = concat!(
        "diff --git a/src/a.js b/src/a.js\n",
        "index 83db48f..bf269f4 100644\n",
        "--- a/src/a.js\n",
        "+++ b/src/a.js\n",
        "@@ -1,3 +1,3 @@\n",
        " const a = 1;\n",
        "-const b = 2;\n",
        "+const b = 3;\n",
        " const c = 4;\n",
        "\\ No newline at end of file\n",
    );

    #[test]
    fn classifies_added_line_after_file_header() {
        let lines = parse("+++ b/a.js\n+const x = 1;\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].kind, FileHeader);
        assert_eq!(lines[0].content, "+++ b/a.js");
        assert_eq!(lines[1].kind, Added);
        assert_eq!(lines[1].content, "const x = 1;");
        assert_eq!(lines[1].index, 2);
    }

    #[test]
    fn classifies_every_prefix() {
        let kinds: Vec<_> = parse(SAMPLE).into_iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FileHeader, FileHeader, FileHeader, FileHeader, HunkHeader, Context, Removed,
                Added, Context, Metadata,
            ]
        );
    }

    #[test]
    fn indices_are_one_based_and_strictly_increasing() {
        let lines = parse("a\n\nb\r\n+c");
        let indices: Vec<_> = lines.iter().map(|l| l.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(lines[1].content, "");
        assert_eq!(lines[2].content, "b");
    }

    #[test]
    fn empty_text_yields_no_lines() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn tracks_old_and_new_line_numbers() {
        let lines = parse(SAMPLE);
        let context = &lines[5];
        assert_eq!((context.old_lineno, context.new_lineno), (Some(1), Some(1)));
        let removed = &lines[6];
        assert_eq!((removed.old_lineno, removed.new_lineno), (Some(2), None));
        let added = &lines[7];
        assert_eq!((added.old_lineno, added.new_lineno), (None, Some(2)));
        let trailing = &lines[8];
        assert_eq!((trailing.old_lineno, trailing.new_lineno), (Some(3), Some(3)));
    }

    #[test]
    fn lines_outside_a_hunk_have_no_line_numbers() {
        let lines = parse("+orphan\n");
        assert_eq!(lines[0].new_lineno, None);
    }

    #[test]
    fn parse_is_deterministic() {
        assert_eq!(parse(SAMPLE), parse(SAMPLE));
    }

    #[test]
    fn hunk_offsets_point_at_headers() {
        let lines = parse(SAMPLE);
        assert_eq!(hunk_offsets(&lines), vec![4]);
    }

    #[test]
    fn summarizes_files() {
        let text = format!(
            "{SAMPLE}diff --git a/old.rs b/old.rs\n--- a/old.rs\n+++ /dev/null\n@@ -1 +0,0 @@\n-gone\n"
        );
        let files = summarize_files(&parse(&text));
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "src/a.js");
        assert_eq!((files[0].added, files[0].removed), (1, 1));
        assert_eq!(files[0].first_line, 1);
        assert_eq!(files[1].path, "old.rs");
        assert_eq!(files[1].removed, 1);
    }

    #[test]
    fn summarizes_files_without_git_header() {
        let files = summarize_files(&parse("--- a/x.py\n+++ b/x.py\n@@ -1 +1 @@\n-a\n+b\n"));
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "x.py");
    }
}
