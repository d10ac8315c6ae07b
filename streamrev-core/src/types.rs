use std::fmt;

use serde::Serialize;

/// Classification of a single diff line, derived purely from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiffLineKind {
    /// `diff --git`, `index `, `---` or `+++`.
    FileHeader,
    /// `@@ -a,b +c,d @@`.
    HunkHeader,
    Added,
    Removed,
    Context,
    /// Anything else (`new file mode`, `\ No newline at end of file`, prose).
    Metadata,
}

/// One line of a parsed unified diff.
///
/// `index` is the 1-based position in the original text and is the key that
/// issue correlation matches against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    pub index: usize,
    pub kind: DiffLineKind,
    pub content: String,      // marker stripped for Added/Removed/Context
    pub old_lineno: Option<u32>,
    pub new_lineno: Option<u32>,
}

/// Finding severity. Ordered so that `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    /// Recognises a producer-supplied severity string, ignoring case and
    /// surrounding whitespace. Returns `None` for anything else.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("high") {
            Some(Severity::High)
        } else if raw.eq_ignore_ascii_case("medium") {
            Some(Severity::Medium)
        } else if raw.eq_ignore_ascii_case("low") {
            Some(Severity::Low)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported finding.
///
/// An issue with neither `line_number` nor `file_path` is valid but can never
/// be correlated to a diff line; it still shows up in list views.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub severity: Severity,
    pub category: String,
    pub description: String,
    pub recommendation: String,
    pub line_number: Option<u64>, // always positive when present
    pub file_path: Option<String>, // never empty when present
}

/// Producer-supplied aggregate counts. Kept verbatim, even when they disagree
/// with `Analysis::issues`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_issues: u64,
    pub high_risk: u64,
    pub medium_risk: u64,
    pub low_risk: u64,
}

/// The canonical, fully-defaulted analysis document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub summary: String,
    pub overall_risk: Severity,
    pub issues: Vec<Issue>,
    pub statistics: Statistics,
}

/// A diff line paired with the issue it correlates to, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedLine {
    pub line: DiffLine,
    pub matched_issue: Option<Issue>,
}

/// One immutable, self-contained view of an analysis in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// 0-based emission counter within one request.
    pub sequence: usize,
    /// Source chunks read when this snapshot was produced.
    pub chunks_consumed: usize,
    pub analysis: Analysis,
    pub annotated_lines: Vec<AnnotatedLine>,
    pub is_final: bool,
}

impl Snapshot {
    /// Iterates over the annotated lines that carry a matched issue.
    pub fn matched(&self) -> impl Iterator<Item = (&DiffLine, &Issue)> {
        self.annotated_lines
            .iter()
            .filter_map(|a| a.matched_issue.as_ref().map(|issue| (&a.line, issue)))
    }
}

/// Per-file rollup of a parsed diff, used by file lists and status lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub path: String,
    /// 1-based index of the file's first line (its `diff --git` or `---` header).
    pub first_line: usize,
    pub added: usize,
    pub removed: usize,
}
