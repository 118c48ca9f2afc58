//! Value locations
//!
//! A [`Location`] names one primitive value in a message using the familiar
//! `SEG-F-C-S` notation. Repetitions are optional, 0-based and written in
//! parentheses after the segment or field: `PID-3(1)-1` is component 1 of the
//! second repetition of PID-3, and `OBX(2)-5` is field 5 of the third OBX.

use crate::domain::errors::{ErrorCode, Hl7Error};
use std::fmt;
use std::str::FromStr;

/// Address of a primitive value within a message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub segment: String,
    /// Occurrence of the segment within the message, 0-based
    pub segment_rep: usize,
    pub field: usize,
    /// Field repetition, 0-based
    pub field_rep: usize,
    pub component: usize,
    pub subcomponent: usize,
}

impl Location {
    pub fn new(segment: impl Into<String>, field: usize) -> Self {
        Self {
            segment: segment.into(),
            segment_rep: 0,
            field,
            field_rep: 0,
            component: 1,
            subcomponent: 1,
        }
    }
}

impl FromStr for Location {
    type Err = Hl7Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('-').collect();
        if parts.len() < 2 || parts.len() > 4 {
            return Err(invalid(s));
        }

        let (segment, segment_rep) = split_repetition(parts[0]).ok_or_else(|| invalid(s))?;
        if segment.len() != 3 || !segment.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid(s));
        }
        let (field, field_rep) = split_repetition(parts[1]).ok_or_else(|| invalid(s))?;
        let field = parse_position(field).ok_or_else(|| invalid(s))?;
        let component = match parts.get(2) {
            Some(part) => parse_position(part).ok_or_else(|| invalid(s))?,
            None => 1,
        };
        let subcomponent = match parts.get(3) {
            Some(part) => parse_position(part).ok_or_else(|| invalid(s))?,
            None => 1,
        };

        Ok(Self {
            segment: segment.to_string(),
            segment_rep,
            field,
            field_rep,
            component,
            subcomponent,
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segment)?;
        if self.segment_rep > 0 {
            write!(f, "({})", self.segment_rep)?;
        }
        write!(f, "-{}", self.field)?;
        if self.field_rep > 0 {
            write!(f, "({})", self.field_rep)?;
        }
        write!(f, "-{}-{}", self.component, self.subcomponent)
    }
}

/// Splits `NAME(n)` into the name and repetition
fn split_repetition(part: &str) -> Option<(&str, usize)> {
    match part.find('(') {
        Some(open) => {
            let inner = part[open + 1..].strip_suffix(')')?;
            let rep = inner.parse().ok()?;
            Some((&part[..open], rep))
        }
        None => Some((part, 0)),
    }
}

fn parse_position(part: &str) -> Option<usize> {
    part.parse().ok().filter(|n| *n > 0)
}

fn invalid(path: &str) -> Hl7Error {
    Hl7Error::new(
        format!("Invalid location '{path}', expected SEG[(n)]-F[(n)][-C[-S]]"),
        ErrorCode::ApplicationInternalError,
    )
}
