//! HL7 delimiter set
//!
//! Every pipe-delimited message declares its delimiters in the first two
//! fields of MSH: MSH-1 is the field separator and MSH-2 lists the component,
//! repetition, escape and subcomponent characters in that order.

use super::errors::{ErrorCode, Hl7Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default field separator
pub const DEFAULT_FIELD_SEPARATOR: char = '|';

/// Default MSH-2 value
pub const DEFAULT_ENCODING_CHARACTERS: &str = "^~\\&";

/// The five delimiters of a message
///
/// # Examples
///
/// ```
/// use pipehat::domain::encoding::EncodingCharacters;
///
/// let enc = EncodingCharacters::parse('|', "^~\\&").unwrap();
/// assert_eq!(enc.component_separator(), '^');
/// assert_eq!(enc.to_string(), "^~\\&");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodingCharacters {
    field: char,
    component: char,
    repetition: char,
    escape: char,
    subcomponent: char,
}

impl EncodingCharacters {
    /// Creates a delimiter set from explicit characters
    pub fn new(field: char, component: char, repetition: char, escape: char, subcomponent: char) -> Self {
        Self {
            field,
            component,
            repetition,
            escape,
            subcomponent,
        }
    }

    /// Builds a delimiter set from a field separator and an MSH-2 value
    ///
    /// Only the first four characters of `encoding` are used; later versions
    /// of the standard append a truncation character that has no role here.
    ///
    /// # Errors
    ///
    /// Returns a DATA_TYPE_ERROR located at MSH-2 when fewer than four
    /// characters are supplied.
    pub fn parse(field: char, encoding: &str) -> Result<Self, Hl7Error> {
        let chars: Vec<char> = encoding.chars().take(4).collect();
        if chars.len() < 4 {
            return Err(Hl7Error::new(
                format!(
                    "Encoding characters must contain 4 characters, got '{}'",
                    encoding
                ),
                ErrorCode::DataTypeError,
            )
            .with_segment("MSH")
            .with_field(2));
        }
        Ok(Self::new(field, chars[0], chars[1], chars[2], chars[3]))
    }

    /// Default delimiters with a custom field separator
    pub fn with_field_separator(field: char) -> Self {
        Self {
            field,
            ..Self::default()
        }
    }

    /// The same encoding characters with another field separator
    pub fn with_field(self, field: char) -> Self {
        Self { field, ..self }
    }

    pub fn field_separator(&self) -> char {
        self.field
    }

    pub fn component_separator(&self) -> char {
        self.component
    }

    pub fn repetition_separator(&self) -> char {
        self.repetition
    }

    pub fn escape_character(&self) -> char {
        self.escape
    }

    pub fn subcomponent_separator(&self) -> char {
        self.subcomponent
    }

    /// Returns true when `c` is one of the five delimiters
    pub fn is_delimiter(&self, c: char) -> bool {
        c == self.field
            || c == self.component
            || c == self.repetition
            || c == self.escape
            || c == self.subcomponent
    }
}

impl Default for EncodingCharacters {
    fn default() -> Self {
        Self::new(DEFAULT_FIELD_SEPARATOR, '^', '~', '\\', '&')
    }
}

/// Renders the MSH-2 form (component, repetition, escape, subcomponent)
impl fmt::Display for EncodingCharacters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            self.component, self.repetition, self.escape, self.subcomponent
        )
    }
}

/// Parses an MSH-2 value using the default field separator
impl FromStr for EncodingCharacters {
    type Err = Hl7Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(DEFAULT_FIELD_SEPARATOR, s)
    }
}
