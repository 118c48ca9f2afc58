//! Validation report structures
//!
//! Rule failures found while parsing or encoding are collected into a
//! [`ValidationReport`] instead of being raised one by one. The parser decides
//! afterwards, per hook, whether the report aborts the operation.

use crate::domain::errors::{ErrorCode, Hl7Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hook point at which an issue was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    /// Raw text checked against encoding rules before parsing
    BeforeParse,
    /// Primitive values checked while the tree is built
    Primitive,
    /// Built message checked against message rules
    AfterParse,
    /// Source message checked before encoding
    BeforeEncode,
    /// Produced text checked against encoding rules
    AfterEncode,
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValidationStage::BeforeParse => "before parse",
            ValidationStage::Primitive => "primitive",
            ValidationStage::AfterParse => "after parse",
            ValidationStage::BeforeEncode => "before encode",
            ValidationStage::AfterEncode => "after encode",
        };
        f.write_str(name)
    }
}

/// A single rule failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Table 0357 code reported for this failure
    pub code: ErrorCode,

    /// What went wrong
    pub message: String,

    /// Description of the failed rule
    pub rule: String,

    /// Section of the HL7 standard the rule comes from
    pub section: String,

    pub segment: Option<String>,

    /// Segment occurrence within the message, 1-based
    pub repetition: Option<usize>,

    pub field: Option<usize>,

    pub stage: ValidationStage,
}

impl ValidationIssue {
    pub fn new(
        stage: ValidationStage,
        code: ErrorCode,
        message: impl Into<String>,
        rule: impl Into<String>,
        section: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            rule: rule.into(),
            section: section.into(),
            segment: None,
            repetition: None,
            field: None,
            stage,
        }
    }

    pub fn at(mut self, segment: impl Into<String>, repetition: usize, field: usize) -> Self {
        self.segment = Some(segment.into());
        self.repetition = Some(repetition);
        self.field = Some(field);
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Hl7Error::from(self))?;
        if !self.section.is_empty() {
            write!(f, " [{}]", self.section)?;
        }
        Ok(())
    }
}

impl From<&ValidationIssue> for Hl7Error {
    fn from(issue: &ValidationIssue) -> Self {
        let mut err = Hl7Error::new(issue.message.clone(), issue.code);
        if let Some(segment) = &issue.segment {
            err = err.with_segment(segment.clone());
        }
        if let Some(repetition) = issue.repetition {
            err = err.with_repetition(repetition);
        }
        if let Some(field) = issue.field {
            err = err.with_field(field);
        }
        err
    }
}

/// Issues collected over one parse or encode call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// When validation started
    pub checked_at: DateTime<Utc>,

    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            checked_at: Utc::now(),
            issues: Vec::new(),
        }
    }

    pub fn record(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Issues raised at `stage`
    pub fn issues_at(&self, stage: ValidationStage) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.stage == stage)
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Human-readable listing of the issues
    pub fn format_summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Validation report ({})\n", self.checked_at.to_rfc3339()));
        if self.issues.is_empty() {
            summary.push_str("  No issues found\n");
            return summary;
        }
        summary.push_str(&format!("  {} issue(s):\n", self.issues.len()));
        for issue in &self.issues {
            summary.push_str(&format!("  - [{}] {}\n", issue.stage, issue));
        }
        summary
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.issues.as_slice() {
            [] => f.write_str("no issues"),
            [only] => write!(f, "{only}"),
            [first, rest @ ..] => write!(f, "{first} (and {} more)", rest.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue() -> ValidationIssue {
        ValidationIssue::new(
            ValidationStage::Primitive,
            ErrorCode::DataTypeError,
            "Value 12a does not match NM",
            "Number",
            "Version 2.5 Section 2.A.47",
        )
        .at("OBX", 1, 5)
    }

    #[test]
    fn test_new_report_is_clean() {
        let report = ValidationReport::new();
        assert!(report.is_clean());
        assert_eq!(report.to_string(), "no issues");
    }

    #[test]
    fn test_issue_converts_to_located_error() {
        let err = Hl7Error::from(&issue());
        assert_eq!(err.code(), ErrorCode::DataTypeError);
        assert_eq!(
            err.to_string(),
            "Value 12a does not match NM Segment: OBX (rep 1) Field #5"
        );
    }

    #[test]
    fn test_display_mentions_remaining_issues() {
        let mut report = ValidationReport::new();
        report.record(issue());
        report.record(issue());
        assert!(report.to_string().ends_with("(and 1 more)"));
        assert_eq!(report.issues_at(ValidationStage::Primitive).count(), 2);
        assert_eq!(report.issues_at(ValidationStage::AfterParse).count(), 0);
    }

    #[test]
    fn test_summary_lists_issues() {
        let mut report = ValidationReport::new();
        report.record(issue());
        let summary = report.format_summary();
        assert!(summary.contains("1 issue(s)"));
        assert!(summary.contains("[primitive]"));
        assert!(summary.contains("2.A.47"));
    }
}
