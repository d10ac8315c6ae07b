//! Correlation of reported issues to diff lines.
//!
//! Each line gets at most one issue. An issue whose `line_number` equals the
//! line's index wins over any issue matched by file path; within one tier the
//! highest severity wins, then the earliest issue.

use std::collections::BTreeMap;

use crate::types::{AnnotatedLine, DiffLine, Issue};

/// Maps line index to its best-matching issue. Lines without a match have no
/// entry.
pub fn correlate(lines: &[DiffLine], issues: &[Issue]) -> BTreeMap<usize, Issue> {
    lines
        .iter()
        .filter_map(|line| best_match(line, issues).map(|issue| (line.index, issue.clone())))
        .collect()
}

/// Pairs every line with its matched issue, preserving line order.
pub fn annotate(lines: &[DiffLine], issues: &[Issue]) -> Vec<AnnotatedLine> {
    let mut matches = correlate(lines, issues);
    lines
        .iter()
        .map(|line| AnnotatedLine {
            line: line.clone(),
            matched_issue: matches.remove(&line.index),
        })
        .collect()
}

fn best_match<'a>(line: &DiffLine, issues: &'a [Issue]) -> Option<&'a Issue> {
    let by_line = issues
        .iter()
        .filter(|issue| issue.line_number == Some(line.index as u64));
    if let Some(issue) = strongest(by_line) {
        return Some(issue);
    }

    let by_path = issues.iter().filter(|issue| {
        issue
            .file_path
            .as_deref()
            .is_some_and(|path| !path.is_empty() && line.content.contains(path))
    });
    strongest(by_path)
}

/// Highest severity first; the earliest issue wins ties.
fn strongest<'a>(candidates: impl Iterator<Item = &'a Issue>) -> Option<&'a Issue> {
    candidates.fold(None, |best: Option<&Issue>, issue| match best {
        Some(current) if current.severity >= issue.severity => Some(current),
        _ => Some(issue),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::parse;
    use crate::types::Severity;

    fn issue(severity: Severity, line_number: Option<u64>, file_path: Option<&str>) -> Issue {
        Issue {
            severity,
            description: format!("{severity} at {line_number:?} {file_path:?}"),
            line_number,
            file_path: file_path.map(str::to_owned),
            ..Issue::default()
        }
    }

    const DIFF: &str = "diff --git a/a.js b/a.js\n--- a/a.js\n+++ b/a.js\n@@ -1 +1 @@\n-x\n+y\n";

    #[test]
    fn higher_severity_wins_on_the_same_line() {
        let lines = parse("+++ b/a.js\n+const x = 1;\n");
        let issues = vec![
            issue(Severity::Low, Some(2), None),
            issue(Severity::High, Some(2), None),
        ];
        let map = correlate(&lines, &issues);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&2].severity, Severity::High);
    }

    #[test]
    fn earliest_issue_breaks_severity_ties() {
        let lines = parse(DIFF);
        let issues = vec![
            issue(Severity::Medium, Some(5), None),
            issue(Severity::Medium, Some(5), Some("a.js")),
        ];
        let map = correlate(&lines, &issues);
        assert_eq!(map[&5], issues[0]);
    }

    #[test]
    fn file_path_matches_header_lines() {
        let lines = parse(DIFF);
        let issues = vec![issue(Severity::Medium, None, Some("a.js"))];
        let map = correlate(&lines, &issues);
        let matched: Vec<_> = map.keys().copied().collect();
        assert_eq!(matched, vec![1, 2, 3]);
    }

    #[test]
    fn line_number_match_takes_precedence_over_path() {
        let lines = parse(DIFF);
        let issues = vec![
            issue(Severity::High, None, Some("a.js")),
            issue(Severity::Low, Some(3), None),
        ];
        let map = correlate(&lines, &issues);
        assert_eq!(map[&3].severity, Severity::Low);
        assert_eq!(map[&1].severity, Severity::High);
    }

    #[test]
    fn orphaned_and_out_of_range_issues_are_unmatched() {
        let lines = parse(DIFF);
        let issues = vec![
            issue(Severity::High, None, None),
            issue(Severity::High, Some(999), None),
            issue(Severity::High, None, Some("missing.rs")),
        ];
        assert!(correlate(&lines, &issues).is_empty());
    }

    #[test]
    fn annotate_keeps_every_line_in_order() {
        let lines = parse(DIFF);
        let issues = vec![issue(Severity::Low, Some(6), None)];
        let annotated = annotate(&lines, &issues);
        assert_eq!(annotated.len(), lines.len());
        assert!(annotated[..5].iter().all(|a| a.matched_issue.is_none()));
        assert_eq!(annotated[5].matched_issue.as_ref(), Some(&issues[0]));
    }

    #[test]
    fn correlation_is_deterministic() {
        let lines = parse(DIFF);
        let issues = vec![
            issue(Severity::Low, None, Some("a.js")),
            issue(Severity::Low, None, Some("b/a.js")),
            issue(Severity::Medium, Some(4), None),
        ];
        assert_eq!(correlate(&lines, &issues), correlate(&lines, &issues));
    }
}
