//! Primitive value rules

use super::{PrimitiveRule, Rule};
use regex::Regex;
use std::borrow::Cow;

/// Removes leading whitespace; never fails
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimLeadingWhitespace;

impl Rule for TrimLeadingWhitespace {
    fn description(&self) -> &str {
        "Leading whitespace removed"
    }

    fn section_reference(&self) -> &str {
        ""
    }
}

impl PrimitiveRule for TrimLeadingWhitespace {
    fn test_value(&self, _value: &str) -> bool {
        true
    }

    fn correct<'a>(&self, value: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(value.trim_start())
    }
}

/// Maximum length in characters
#[derive(Debug, Clone)]
pub struct SizeRule {
    max: usize,
    description: String,
}

impl SizeRule {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            description: format!("Maximum size <= {max} characters"),
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

impl Rule for SizeRule {
    fn description(&self) -> &str {
        &self.description
    }

    fn section_reference(&self) -> &str {
        ""
    }
}

impl PrimitiveRule for SizeRule {
    fn test_value(&self, value: &str) -> bool {
        value.chars().count() <= self.max
    }
}

/// Value must match a regular expression
#[derive(Debug, Clone)]
pub struct RegexPrimitiveRule {
    regex: Regex,
    description: String,
    section: String,
}

impl RegexPrimitiveRule {
    /// Compiles `pattern` into a rule
    ///
    /// # Errors
    ///
    /// Returns the regex error for an invalid pattern.
    pub fn new(
        pattern: &str,
        description: impl Into<String>,
        section: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            description: description.into(),
            section: section.into(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

impl Rule for RegexPrimitiveRule {
    fn description(&self) -> &str {
        &self.description
    }

    fn section_reference(&self) -> &str {
        &self.section
    }
}

impl PrimitiveRule for RegexPrimitiveRule {
    fn test_value(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}
