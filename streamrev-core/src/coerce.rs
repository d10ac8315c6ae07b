//! Coercion of a raw candidate object into a canonical [`Analysis`].
//!
//! The candidate is parsed strictly as JSON; structural failures are reported
//! as [`ParseFailure`]. Once parsed, each recognised field is copied with a
//! default for anything absent or wrong-typed, so a half-written document
//! (say, a summary but no issues yet) is a legitimate intermediate result.

use serde_json::{Map, Value};

use crate::error::ParseFailure;
use crate::types::{Analysis, Issue, Severity, Statistics};

/// Parses `candidate` and fills in defaults for every missing field.
///
/// Unknown fields are ignored. Coercing the same candidate twice yields equal
/// values.
pub fn coerce(candidate: &str) -> Result<Analysis, ParseFailure> {
    let value: Value = serde_json::from_str(candidate)?;
    let Value::Object(root) = value else {
        return Err(ParseFailure::NotAnObject);
    };

    Ok(Analysis {
        summary: string_field(&root, "summary"),
        overall_risk: severity_field(&root, "overallRisk"),
        issues: match root.get("issues") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(coerce_issue)
                .collect(),
            _ => Vec::new(),
        },
        statistics: match root.get("statistics") {
            Some(Value::Object(stats)) => Statistics {
                total_issues: count_field(stats, "totalIssues"),
                high_risk: count_field(stats, "highRisk"),
                medium_risk: count_field(stats, "mediumRisk"),
                low_risk: count_field(stats, "lowRisk"),
            },
            _ => Statistics::default(),
        },
    })
}

fn coerce_issue(raw: &Map<String, Value>) -> Issue {
    Issue {
        severity: severity_field(raw, "severity"),
        category: string_field(raw, "category"),
        description: string_field(raw, "description"),
        recommendation: string_field(raw, "recommendation"),
        line_number: raw
            .get("lineNumber")
            .and_then(Value::as_u64)
            .filter(|&n| n > 0),
        file_path: raw
            .get("filePath")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .map(str::to_owned),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn severity_field(obj: &Map<String, Value>, key: &str) -> Severity {
    obj.get(key)
        .and_then(Value::as_str)
        .and_then(Severity::parse)
        .unwrap_or_default()
}

fn count_field(obj: &Map<String, Value>, key: &str) -> u64 {
    obj.get(key).and_then(Value::as_u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn summary_only_gets_defaults() {
        let analysis = coerce(r#"{"summary":"ok"}"#).unwrap();
        assert_eq!(
            analysis,
            Analysis {
                summary: "ok".to_owned(),
                overall_risk: Severity::Low,
                issues: Vec::new(),
                statistics: Statistics::default(),
            }
        );
    }

    #[test]
    fn full_document_is_copied() {
        let candidate = r#"{
            "summary": "Adds input validation",
            "overallRisk": "Medium",
            "issues": [{
                "severity": "High",
                "category": "Security",
                "description": "SQL built by concatenation",
                "recommendation": "Use bound parameters",
                "lineNumber": 12,
                "filePath": "src/db.rs"
            }],
            "statistics": {"totalIssues": 1, "highRisk": 1, "mediumRisk": 0, "lowRisk": 0}
        }"#;
        let analysis = coerce(candidate).unwrap();
        assert_eq!(analysis.overall_risk, Severity::Medium);
        assert_eq!(
            analysis.issues,
            vec![Issue {
                severity: Severity::High,
                category: "Security".to_owned(),
                description: "SQL built by concatenation".to_owned(),
                recommendation: "Use bound parameters".to_owned(),
                line_number: Some(12),
                file_path: Some("src/db.rs".to_owned()),
            }]
        );
        assert_eq!(
            analysis.statistics,
            Statistics { total_issues: 1, high_risk: 1, medium_risk: 0, low_risk: 0 }
        );
    }

    #[test]
    fn structural_failures_are_reported() {
        assert!(coerce(r#"{"summary":"ok",}"#).is_err());
        assert!(coerce(r#"{"summary":"\u12"}"#).is_err());
        assert!(coerce("[1, 2]").is_err());
        assert!(matches!(coerce("42"), Err(ParseFailure::NotAnObject)));
    }

    #[test]
    fn wrong_types_fall_back_to_defaults() {
        let candidate = r#"{
            "summary": 7,
            "overallRisk": "catastrophic",
            "issues": [
                "not an issue",
                {"severity": 3, "lineNumber": "12", "filePath": ""},
                {"lineNumber": 0},
                {"lineNumber": -4, "filePath": null}
            ],
            "statistics": {"totalIssues": -1, "highRisk": "2", "lowRisk": 1.5}
        }"#;
        let analysis = coerce(candidate).unwrap();
        assert_eq!(analysis.summary, "");
        assert_eq!(analysis.overall_risk, Severity::Low);
        assert_eq!(analysis.issues.len(), 3);
        assert!(analysis
            .issues
            .iter()
            .all(|i| i.line_number.is_none() && i.file_path.is_none()));
        assert!(analysis.issues.iter().all(|i| i.severity == Severity::Low));
        assert_eq!(analysis.statistics, Statistics::default());
    }

    #[test]
    fn issues_of_wrong_type_become_empty() {
        let analysis = coerce(r#"{"issues":{"severity":"High"},"statistics":[]}"#).unwrap();
        assert!(analysis.issues.is_empty());
        assert_eq!(analysis.statistics, Statistics::default());
    }

    #[test]
    fn inconsistent_statistics_are_preserved() {
        let analysis =
            coerce(r#"{"issues":[],"statistics":{"totalIssues":9,"highRisk":4}}"#).unwrap();
        assert_eq!(analysis.statistics.total_issues, 9);
        assert_eq!(analysis.statistics.high_risk, 4);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let analysis = coerce(r#"{"summary":"x","confidence":0.9,"extra":{"a":[1]}}"#).unwrap();
        assert_eq!(analysis.summary, "x");
    }

    #[test]
    fn coercion_is_idempotent() {
        let candidate = r#"{"summary":"s","overallRisk":"high","issues":[{"severity":"LOW"}]}"#;
        assert_eq!(coerce(candidate).unwrap(), coerce(candidate).unwrap());
    }
}
