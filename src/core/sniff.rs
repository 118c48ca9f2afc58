//! Header sniffing
//!
//! The version of a message decides which grammar parses it, so the encoding
//! and version have to be read before any structure exists. These functions
//! scan the raw text for the header and nothing else, and they cope with the
//! truncated or malformed headers that make a full parse fail.

use crate::domain::encoding::EncodingCharacters;
use crate::domain::errors::{ErrorCode, Hl7Error};
use serde::Serialize;
use std::fmt;

/// Wire encodings recognised by the sniffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Encoding {
    /// Traditional pipe-delimited encoding
    Er7,
    /// XML encoding
    Xml,
}

impl Encoding {
    /// Name used to bind encoding rules
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Er7 => "ER7",
            Encoding::Xml => "XML",
        }
    }

    /// Encoding for a name, case-insensitive; `VB` is accepted for ER7
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ER7" | "VB" => Some(Encoding::Er7),
            "XML" => Some(Encoding::Xml),
            _ => None,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detects the encoding of a raw message
///
/// # Examples
///
/// ```
/// use pipehat::core::sniff::{sniff_encoding, Encoding};
///
/// assert_eq!(sniff_encoding("MSH|^~\\&|A"), Some(Encoding::Er7));
/// assert_eq!(sniff_encoding("<ADT_A01><MSH>"), Some(Encoding::Xml));
/// assert_eq!(sniff_encoding("hello"), None);
/// ```
pub fn sniff_encoding(text: &str) -> Option<Encoding> {
    let text = text.trim_start();
    if text.starts_with('<') && text.contains("MSH") {
        return Some(Encoding::Xml);
    }
    let mut chars = text.chars();
    let name: String = chars.by_ref().take(3).collect();
    match chars.next() {
        Some(sep) if name == "MSH" && is_separator(sep) => Some(Encoding::Er7),
        _ => None,
    }
}

/// Reads the version identifier (MSH-12 component 1) from a raw message
///
/// # Errors
///
/// Returns a REQUIRED_FIELD_MISSING error located at MSH-12 when the header
/// is missing, has fewer than 12 fields, or MSH-12 is empty.
pub fn sniff_version(text: &str) -> Result<String, Hl7Error> {
    if sniff_encoding(text) == Some(Encoding::Xml) {
        return xml_version(text);
    }

    let header = RawHeader::locate(text).ok_or_else(missing_header)?;
    if header.field_count() < 12 {
        return Err(Hl7Error::new(
            format!(
                "Can't find version ID - MSH has only {} fields",
                header.field_count()
            ),
            ErrorCode::RequiredFieldMissing,
        )
        .with_segment("MSH")
        .with_field(12));
    }

    let enc = header.encoding_characters();
    header
        .component(12, 1, &enc)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            Hl7Error::new("MSH-12 (version ID) is empty", ErrorCode::RequiredFieldMissing)
                .with_segment("MSH")
                .with_field(12)
        })
}

/// The header values needed to answer a message that failed to parse
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CriticalResponseData {
    pub encoding: EncodingCharacters,
    pub sending_application: Option<String>,
    pub sending_facility: Option<String>,
    pub receiving_application: Option<String>,
    pub receiving_facility: Option<String>,
    pub trigger_event: Option<String>,
    /// MSH-10
    pub control_id: Option<String>,
    /// MSH-11 component 1
    pub processing_id: Option<String>,
    /// MSH-12 component 1
    pub version: Option<String>,
}

/// Extracts the delimiters, control ID and processing ID from a raw message
///
/// Everything besides the field separator is optional: unusable encoding
/// characters fall back to the defaults and missing fields read as `None`.
///
/// # Examples
///
/// ```
/// use pipehat::core::sniff::critical_response_data;
///
/// let data = critical_response_data("MSH|^~\\&|A|B|C|D|20240101||ADT^A01|123|P").unwrap();
/// assert_eq!(data.control_id.as_deref(), Some("123"));
/// assert_eq!(data.processing_id.as_deref(), Some("P"));
/// assert_eq!(data.version, None);
/// ```
///
/// # Errors
///
/// Returns a REQUIRED_FIELD_MISSING error when no header with a field
/// separator can be found.
pub fn critical_response_data(text: &str) -> Result<CriticalResponseData, Hl7Error> {
    let header = RawHeader::locate(text).ok_or_else(missing_header)?;
    let enc = header.encoding_characters();
    let value = |field: usize, component: usize| {
        header
            .component(field, component, &enc)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(CriticalResponseData {
        encoding: enc,
        sending_application: value(3, 1),
        sending_facility: value(4, 1),
        receiving_application: value(5, 1),
        receiving_facility: value(6, 1),
        trigger_event: value(9, 2),
        control_id: value(10, 1),
        processing_id: value(11, 1),
        version: value(12, 1),
    })
}

/// Header segment of a pipe-delimited message, split into fields
#[derive(Debug, Clone)]
pub(crate) struct RawHeader<'a> {
    separator: char,
    /// `fields[0]` is the segment name, `fields[n - 1]` is MSH-n for n >= 2
    fields: Vec<&'a str>,
}

impl<'a> RawHeader<'a> {
    /// Finds the first `MSH` followed by a separator character
    pub(crate) fn locate(text: &'a str) -> Option<Self> {
        let mut offset = 0;
        while let Some(found) = text[offset..].find("MSH") {
            let start = offset + found;
            let after = &text[start + 3..];
            match after.chars().next() {
                Some(sep) if is_separator(sep) => {
                    let end = after.find(['\r', '\n']).map_or(text.len(), |i| start + 3 + i);
                    let fields = text[start..end].split(sep).collect();
                    return Some(Self {
                        separator: sep,
                        fields,
                    });
                }
                _ => offset = start + 3,
            }
        }
        None
    }

    pub(crate) fn separator(&self) -> char {
        self.separator
    }

    /// Number of MSH fields present, counting MSH-1
    pub(crate) fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Raw text of MSH-`number`, for `number` >= 2
    pub(crate) fn field(&self, number: usize) -> Option<&'a str> {
        if number < 2 {
            return None;
        }
        self.fields.get(number - 1).copied()
    }

    /// Delimiters declared in MSH-1 and MSH-2, defaults where unusable
    pub(crate) fn encoding_characters(&self) -> EncodingCharacters {
        self.declared_encoding_characters()
            .unwrap_or_else(|_| EncodingCharacters::with_field_separator(self.separator))
    }

    /// Delimiters declared in MSH-1 and MSH-2
    ///
    /// An empty or absent MSH-2 means the default encoding characters.
    pub(crate) fn declared_encoding_characters(&self) -> Result<EncodingCharacters, Hl7Error> {
        match self.field(2) {
            Some(declared) if !declared.is_empty() => {
                EncodingCharacters::parse(self.separator, declared)
            }
            _ => Ok(EncodingCharacters::with_field_separator(self.separator)),
        }
    }

    /// Raw text of a component of the first repetition of MSH-`number`
    pub(crate) fn component(
        &self,
        number: usize,
        component: usize,
        enc: &EncodingCharacters,
    ) -> Option<&'a str> {
        let field = self.field(number)?;
        let first = field.split(enc.repetition_separator()).next()?;
        first
            .split(enc.component_separator())
            .nth(component.checked_sub(1)?)
    }
}

fn is_separator(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace()
}

fn missing_header() -> Hl7Error {
    Hl7Error::new(
        "Can't find an MSH segment with a field separator",
        ErrorCode::RequiredFieldMissing,
    )
    .with_segment("MSH")
}

fn xml_version(text: &str) -> Result<String, Hl7Error> {
    let field = xml_element(text, "MSH.12");
    let version = field
        .and_then(|f| xml_element(f, "VID.1").or(Some(f)))
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.contains('<'));
    version.map(str::to_string).ok_or_else(|| {
        Hl7Error::new(
            "Can't find version ID in the MSH.12 element",
            ErrorCode::RequiredFieldMissing,
        )
        .with_segment("MSH")
        .with_field(12)
    })
}

fn xml_element<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = text.find(&open)? + open.len();
    let end = text[start..].find(&close)? + start;
    Some(&text[start..end])
}
