//! Validation rules
//!
//! Three kinds of rules plug into a [`ValidationContext`](super::ValidationContext):
//!
//! - [`PrimitiveRule`] - checks and corrects a single leaf value
//! - [`MessageRule`] - checks a built message
//! - [`EncodingRule`] - checks encoded message text

pub mod encoding;
pub mod message;
pub mod primitive;

pub use encoding::SegmentSeparatorRule;
pub use message::MshRequiredFieldsRule;
pub use primitive::{RegexPrimitiveRule, SizeRule, TrimLeadingWhitespace};

use crate::domain::errors::ErrorCode;
use crate::model::Message;
use std::borrow::Cow;
use std::fmt;

/// The two-character HL7 explicit null (`""`)
pub const EXPLICIT_NULL: &str = "\"\"";

/// Returns true for an absent value, an empty string or the explicit null
pub fn is_null_or_empty(value: Option<&str>) -> bool {
    matches!(value, None | Some("") | Some(EXPLICIT_NULL))
}

/// Common rule metadata
pub trait Rule: Send + Sync + fmt::Debug {
    /// What the rule checks, used in reports
    fn description(&self) -> &str;

    /// Section of the HL7 standard the rule comes from, empty when none
    fn section_reference(&self) -> &str;
}

/// Rule applied to a primitive value
pub trait PrimitiveRule: Rule {
    /// Checks a value that is neither absent, empty nor the explicit null
    ///
    /// Called through [`accepts`], which passes null values without asking
    /// the rule.
    fn test_value(&self, value: &str) -> bool;

    /// Normalizes a value; the default leaves it unchanged
    fn correct<'a>(&self, value: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(value)
    }
}

/// Checks `value` against `rule`; null and empty values always pass
pub fn accepts<R: PrimitiveRule + ?Sized>(rule: &R, value: Option<&str>) -> bool {
    match value {
        Some(v) if !is_null_or_empty(value) => rule.test_value(v),
        _ => true,
    }
}

/// A rule failure found in a message or its encoded text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub code: ErrorCode,
    pub message: String,
    pub segment: Option<String>,
    /// Segment occurrence, 1-based
    pub repetition: Option<usize>,
    pub field: Option<usize>,
}

impl Violation {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            segment: None,
            repetition: None,
            field: None,
        }
    }

    pub fn at(mut self, segment: impl Into<String>, repetition: usize, field: usize) -> Self {
        self.segment = Some(segment.into());
        self.repetition = Some(repetition);
        self.field = Some(field);
        self
    }
}

/// Rule applied to a whole message
pub trait MessageRule: Rule {
    /// Returns every violation found; empty when the message passes
    fn check(&self, message: &Message) -> Vec<Violation>;
}

/// Rule applied to encoded message text
pub trait EncodingRule: Rule {
    /// Returns every violation found; empty when the text passes
    fn check(&self, text: &str) -> Vec<Violation>;
}
