//! Domain error types
//!
//! This module defines the error hierarchy for Pipehat. Every failure raised by
//! the parser, the encoder and the structure registry is an [`Hl7Error`]: a
//! message, an HL7 table 0357 [`ErrorCode`] and an optional location inside the
//! message (segment name, segment repetition and field position). Errors that
//! cross the public API are wrapped in [`PipehatError`].
//!
//! An [`Hl7Error`] can render itself into an ERR segment with
//! [`Hl7Error::populate`], which is how acknowledgements report failures back
//! to the sender.

use crate::adapters::tables::TableLookup;
use crate::model::Segment;
use crate::validation::ValidationReport;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// HL7 table 0357 identifier used when populating ERR segments
pub const ERROR_CODE_TABLE: u16 = 357;

/// Coding system name written next to 0357 codes in ERR segments
pub const ERROR_CODE_SYSTEM: &str = "hl70357";

/// HL7 message error condition codes (table 0357)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ErrorCode {
    /// 0 - Message accepted
    MessageAccepted,
    /// 100 - Segment sequence error
    SegmentSequenceError,
    /// 101 - Required field missing
    RequiredFieldMissing,
    /// 102 - Data type error
    DataTypeError,
    /// 103 - Table value not found
    TableValueNotFound,
    /// 200 - Unsupported message type
    UnsupportedMessageType,
    /// 201 - Unsupported event code
    UnsupportedEventCode,
    /// 202 - Unsupported processing id
    UnsupportedProcessingId,
    /// 203 - Unsupported version id
    UnsupportedVersionId,
    /// 204 - Unknown key identifier
    UnknownKeyIdentifier,
    /// 205 - Duplicate key identifier
    DuplicateKeyIdentifier,
    /// 206 - Application record locked
    ApplicationRecordLocked,
    /// 207 - Application internal error
    #[default]
    ApplicationInternalError,
}

impl ErrorCode {
    /// All codes in table order
    pub const ALL: [ErrorCode; 13] = [
        ErrorCode::MessageAccepted,
        ErrorCode::SegmentSequenceError,
        ErrorCode::RequiredFieldMissing,
        ErrorCode::DataTypeError,
        ErrorCode::TableValueNotFound,
        ErrorCode::UnsupportedMessageType,
        ErrorCode::UnsupportedEventCode,
        ErrorCode::UnsupportedProcessingId,
        ErrorCode::UnsupportedVersionId,
        ErrorCode::UnknownKeyIdentifier,
        ErrorCode::DuplicateKeyIdentifier,
        ErrorCode::ApplicationRecordLocked,
        ErrorCode::ApplicationInternalError,
    ];

    /// Returns the numeric table 0357 value
    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::MessageAccepted => 0,
            ErrorCode::SegmentSequenceError => 100,
            ErrorCode::RequiredFieldMissing => 101,
            ErrorCode::DataTypeError => 102,
            ErrorCode::TableValueNotFound => 103,
            ErrorCode::UnsupportedMessageType => 200,
            ErrorCode::UnsupportedEventCode => 201,
            ErrorCode::UnsupportedProcessingId => 202,
            ErrorCode::UnsupportedVersionId => 203,
            ErrorCode::UnknownKeyIdentifier => 204,
            ErrorCode::DuplicateKeyIdentifier => 205,
            ErrorCode::ApplicationRecordLocked => 206,
            ErrorCode::ApplicationInternalError => 207,
        }
    }

    /// Looks up a code by its numeric value
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Standard table 0357 description
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::MessageAccepted => "Message accepted",
            ErrorCode::SegmentSequenceError => "Segment sequence error",
            ErrorCode::RequiredFieldMissing => "Required field missing",
            ErrorCode::DataTypeError => "Data type error",
            ErrorCode::TableValueNotFound => "Table value not found",
            ErrorCode::UnsupportedMessageType => "Unsupported message type",
            ErrorCode::UnsupportedEventCode => "Unsupported event code",
            ErrorCode::UnsupportedProcessingId => "Unsupported processing id",
            ErrorCode::UnsupportedVersionId => "Unsupported version id",
            ErrorCode::UnknownKeyIdentifier => "Unknown key identifier",
            ErrorCode::DuplicateKeyIdentifier => "Duplicate key identifier",
            ErrorCode::ApplicationRecordLocked => "Application record locked",
            ErrorCode::ApplicationInternalError => "Application internal error",
        }
    }

    /// Whether a sender should see this code as a rejection (MSA-1 = AR)
    /// rather than an application error (AE)
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ErrorCode::UnsupportedMessageType
                | ErrorCode::UnsupportedEventCode
                | ErrorCode::UnsupportedProcessingId
                | ErrorCode::UnsupportedVersionId
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An HL7 processing failure
///
/// Carries a base message, a table 0357 code and an optional location. The
/// rendered form appends the location:
/// `"<message> Segment: PID (rep 1) Field #3"`.
///
/// # Examples
///
/// ```
/// use pipehat::domain::errors::{ErrorCode, Hl7Error};
///
/// let err = Hl7Error::new("Missing patient identifier", ErrorCode::RequiredFieldMissing)
///     .with_segment("PID")
///     .with_repetition(1)
///     .with_field(3);
/// assert_eq!(
///     err.to_string(),
///     "Missing patient identifier Segment: PID (rep 1) Field #3"
/// );
/// ```
#[derive(Debug, Error)]
#[error("{}", render(.message, .segment, .repetition, .field))]
pub struct Hl7Error {
    message: String,
    code: ErrorCode,
    segment: Option<String>,
    repetition: Option<usize>,
    field: Option<usize>,
    #[source]
    source: Option<BoxedSource>,
}

/// Base message followed by the location suffix
fn render(
    message: &str,
    segment: &Option<String>,
    repetition: &Option<usize>,
    field: &Option<usize>,
) -> String {
    let mut out = message.to_string();
    if let Some(segment) = segment {
        out.push_str(" Segment: ");
        out.push_str(segment);
    }
    if let Some(rep) = repetition {
        out.push_str(&format!(" (rep {rep})"));
    }
    if let Some(field) = field {
        out.push_str(&format!(" Field #{field}"));
    }
    out
}

impl Hl7Error {
    /// Creates a new error with the given base message and code
    pub fn new(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            code,
            segment: None,
            repetition: None,
            field: None,
            source: None,
        }
    }

    /// Creates an APPLICATION_INTERNAL_ERROR wrapping an underlying failure
    pub fn internal(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::new(message, ErrorCode::ApplicationInternalError).with_source(source)
    }

    /// Sets the segment name
    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    /// Sets the segment repetition (1-based occurrence within the message)
    pub fn with_repetition(mut self, repetition: usize) -> Self {
        self.repetition = Some(repetition);
        self
    }

    /// Sets the field position
    pub fn with_field(mut self, field: usize) -> Self {
        self.field = Some(field);
        self
    }

    /// Attaches the underlying cause
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Fills in location details that are not already set
    ///
    /// Used while an error travels up through the segment and field parsers so
    /// the innermost location wins.
    pub fn located(mut self, segment: &str, repetition: usize, field: Option<usize>) -> Self {
        if self.segment.is_none() {
            self.segment = Some(segment.to_string());
            self.repetition = Some(repetition);
        }
        if self.field.is_none() {
            self.field = field;
        }
        self
    }

    /// Base message without location details
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Table 0357 error code
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Segment name, if known
    pub fn segment(&self) -> Option<&str> {
        self.segment.as_deref()
    }

    /// Segment repetition, if known
    pub fn repetition(&self) -> Option<usize> {
        self.repetition
    }

    /// Field position, if known
    pub fn field(&self) -> Option<usize> {
        self.field
    }

    /// Message with the location suffix appended
    pub fn rendered_message(&self) -> String {
        render(&self.message, &self.segment, &self.repetition, &self.field)
    }

    /// Writes this error into a new repetition of ERR-1
    ///
    /// ERR-1 components are filled as: segment id, sequence, field position
    /// and a coded element carrying the 0357 code, its description (looked up
    /// through `tables`), the `hl70357` coding system and the rendered message.
    /// A failed description lookup is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns an APPLICATION_INTERNAL_ERROR when `segment` is not an ERR
    /// segment. The segment is left untouched in that case.
    pub fn populate(&self, segment: &mut Segment, tables: &dyn TableLookup) -> Result<(), Hl7Error> {
        if segment.name() != "ERR" {
            return Err(Hl7Error::new(
                format!(
                    "Can only populate an ERR segment with an exception, got: {}",
                    segment.name()
                ),
                ErrorCode::ApplicationInternalError,
            ));
        }

        let rep = segment.repetition_count(1)?;

        if let Some(name) = &self.segment {
            segment.set_value(1, rep, 1, 1, name)?;
        }
        if let Some(repetition) = self.repetition {
            segment.set_value(1, rep, 2, 1, &repetition.to_string())?;
        }
        if let Some(field) = self.field {
            segment.set_value(1, rep, 3, 1, &field.to_string())?;
        }

        let code = self.code.to_string();
        segment.set_value(1, rep, 4, 1, &code)?;
        match tables.description(ERROR_CODE_TABLE, &code) {
            Ok(description) => segment.set_value(1, rep, 4, 2, &description)?,
            Err(e) => debug!(code = %code, error = %e, "Error code description lookup failed"),
        }
        segment.set_value(1, rep, 4, 3, ERROR_CODE_SYSTEM)?;
        segment.set_value(1, rep, 4, 5, &self.rendered_message())?;

        Ok(())
    }
}

/// Main Pipehat error type
///
/// This is the error type returned across the public API. HL7 failures keep
/// their 0357 code through [`PipehatError::error_code`].
#[derive(Debug, Error)]
pub enum PipehatError {
    /// Parsing, encoding or structure lookup failure
    #[error(transparent)]
    Hl7(#[from] Hl7Error),

    /// The text is not in a supported wire encoding
    #[error("Encoding not supported: {0}")]
    EncodingNotSupported(String),

    /// Validation rules failed under an abort policy
    #[error("Validation failed: {0}")]
    Validation(ValidationReport),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Code table lookup errors
    #[error("Table lookup error: {0}")]
    Lookup(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl PipehatError {
    /// Table 0357 code best describing this error
    pub fn error_code(&self) -> ErrorCode {
        match self {
            PipehatError::Hl7(e) => e.code(),
            PipehatError::Validation(report) => report
                .issues()
                .first()
                .map(|issue| issue.code)
                .unwrap_or(ErrorCode::ApplicationInternalError),
            PipehatError::Lookup(_) => ErrorCode::TableValueNotFound,
            _ => ErrorCode::ApplicationInternalError,
        }
    }

    /// Converts this error into an [`Hl7Error`] suitable for ERR population
    pub fn into_hl7(self) -> Hl7Error {
        match self {
            PipehatError::Hl7(e) => e,
            PipehatError::Validation(report) => match report.issues().first() {
                Some(issue) => Hl7Error::from(issue),
                None => Hl7Error::new("Validation failed", ErrorCode::ApplicationInternalError),
            },
            other => {
                let code = other.error_code();
                Hl7Error::new(other.to_string(), code)
            }
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for PipehatError {
    fn from(err: std::io::Error) -> Self {
        PipehatError::Io(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for PipehatError {
    fn from(err: toml::de::Error) -> Self {
        PipehatError::Configuration(format!("TOML parse error: {err}"))
    }
}
