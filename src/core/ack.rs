//! Acknowledgement messages
//!
//! An application acknowledgement answers a message with an ACK carrying
//! MSA-1 `AA` when it was accepted. A message that failed to parse is
//! answered from the raw header alone: MSA-1 is `AE`, or `AR` for a version,
//! type, event or processing ID the receiver does not support, and the
//! error goes into an ERR segment.

use super::context::Hl7Context;
use super::sniff::{critical_response_data, CriticalResponseData};
use crate::domain::errors::{Hl7Error, PipehatError};
use crate::model::{Message, Segment};
use chrono::Local;
use tracing::{debug, info};
use uuid::Uuid;

/// MSA-1 for an accepted message
pub const APPLICATION_ACCEPT: &str = "AA";

/// MSA-1 for a message that failed processing
pub const APPLICATION_ERROR: &str = "AE";

/// MSA-1 for a message that was rejected outright
pub const APPLICATION_REJECT: &str = "AR";

/// Acknowledges a message that could not be processed
///
/// Only the header of `raw` is read, so this works for text that fails to
/// parse. Values that cannot be found are left empty; an unusable version
/// is replaced by the configured default version.
///
/// # Examples
///
/// ```rust,no_run
/// use pipehat::core::{ack, Parser};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let parser = Parser::with_defaults()?;
/// let raw = "MSH|^~\\&|A|B|C|D|20240101||ADT^A01|123|P|9.9\r";
/// if let Err(err) = parser.parse(raw) {
///     let reply = ack::error_ack(raw, &err.into_hl7(), parser.context())?;
///     assert_eq!(reply.get("MSA-1")?, Some("AR"));
/// }
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error when the registry has no ACK structure for the version.
pub fn error_ack(raw: &str, error: &Hl7Error, context: &Hl7Context) -> Result<Message, PipehatError> {
    let header = match critical_response_data(raw) {
        Ok(header) => header,
        Err(e) => {
            debug!(error = %e, "No usable header, acknowledging with defaults");
            CriticalResponseData::default()
        }
    };

    let code = if error.code().is_rejection() {
        APPLICATION_REJECT
    } else {
        APPLICATION_ERROR
    };

    let mut message = acknowledgement(&header, code, context)?;
    message
        .root_mut()
        .segment_mut("MSA")?
        .set_value(3, 0, 1, 1, error.message())?;

    let err_segment = message.root_mut().segment_mut("ERR")?;
    error.populate(err_segment, context.tables.as_ref())?;

    info!(
        control_id = header.control_id.as_deref().unwrap_or_default(),
        code = %error.code(),
        ack_code = code,
        "Built error acknowledgement"
    );
    Ok(message)
}

/// Acknowledges a message that was accepted
///
/// # Errors
///
/// Returns an error when the registry has no ACK structure for the version.
pub fn accept_ack(message: &Message, context: &Hl7Context) -> Result<Message, PipehatError> {
    let header = header_of(message);
    let reply = acknowledgement(&header, APPLICATION_ACCEPT, context)?;
    debug!(
        control_id = header.control_id.as_deref().unwrap_or_default(),
        "Built accept acknowledgement"
    );
    Ok(reply)
}

/// ACK with the sender and receiver of `header` swapped and MSA filled
fn acknowledgement(
    header: &CriticalResponseData,
    code: &str,
    context: &Hl7Context,
) -> Result<Message, PipehatError> {
    let registry = &context.registry;
    let version = header
        .version
        .as_deref()
        .filter(|v| registry.is_valid_version(v))
        .unwrap_or(context.options.default_version.as_str());
    let version = registry.version(version)?;
    let definition = registry.message_definition("ACK", version.as_str())?;

    let mut message = Message::new(definition, version).with_encoding_characters(header.encoding);

    let msh = message.msh_mut()?;
    set_optional(msh, 3, header.receiving_application.as_deref())?;
    set_optional(msh, 4, header.receiving_facility.as_deref())?;
    set_optional(msh, 5, header.sending_application.as_deref())?;
    set_optional(msh, 6, header.sending_facility.as_deref())?;
    msh.set_value(7, 0, 1, 1, &Local::now().format("%Y%m%d%H%M%S%.3f%z").to_string())?;
    msh.set_value(9, 0, 1, 1, "ACK")?;
    set_component(msh, 9, 2, header.trigger_event.as_deref())?;
    msh.set_value(10, 0, 1, 1, &Uuid::new_v4().simple().to_string())?;
    msh.set_value(11, 0, 1, 1, header.processing_id.as_deref().unwrap_or("P"))?;

    let msa = message.root_mut().segment_mut("MSA")?;
    msa.set_value(1, 0, 1, 1, code)?;
    set_optional(msa, 2, header.control_id.as_deref())?;

    Ok(message)
}

/// Header values of a parsed message, in the shape read from raw text
fn header_of(message: &Message) -> CriticalResponseData {
    let value = |field: usize| {
        message
            .msh()
            .and_then(|msh| msh.value(field, 0, 1, 1).ok().flatten())
            .map(str::to_string)
    };
    CriticalResponseData {
        encoding: message.encoding_characters(),
        sending_application: value(3),
        sending_facility: value(4),
        receiving_application: value(5),
        receiving_facility: value(6),
        trigger_event: message.trigger_event().map(str::to_string),
        control_id: message.control_id().map(str::to_string),
        processing_id: message.processing_id().map(str::to_string),
        version: value(12),
    }
}

fn set_optional(segment: &mut Segment, field: usize, value: Option<&str>) -> Result<(), Hl7Error> {
    set_component(segment, field, 1, value)
}

fn set_component(
    segment: &mut Segment,
    field: usize,
    component: usize,
    value: Option<&str>,
) -> Result<(), Hl7Error> {
    match value {
        Some(v) => segment.set_value(field, 0, component, 1, v),
        None => Ok(()),
    }
}
