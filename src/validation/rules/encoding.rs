//! Encoding rules

use super::{EncodingRule, Rule, Violation};
use crate::domain::errors::ErrorCode;

/// Traditional encoding must separate segments with carriage returns only
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentSeparatorRule;

impl Rule for SegmentSeparatorRule {
    fn description(&self) -> &str {
        "Segments are separated by carriage returns"
    }

    fn section_reference(&self) -> &str {
        "Version 2.5 Section 2.7"
    }
}

impl EncodingRule for SegmentSeparatorRule {
    fn check(&self, text: &str) -> Vec<Violation> {
        match text.find('\n') {
            Some(offset) => vec![Violation::new(
                ErrorCode::ApplicationInternalError,
                format!("Line feed used as segment separator at offset {offset}"),
            )],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carriage_returns_pass() {
        assert!(SegmentSeparatorRule.check("MSH|^~\\&\rPID|1\r").is_empty());
    }

    #[test]
    fn test_line_feed_reported_once() {
        let violations = SegmentSeparatorRule.check("MSH|^~\\&\nPID|1\nPV1|1\n");
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("offset 8"));
    }
}
