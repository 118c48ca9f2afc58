//! Message instances

use super::definition::MessageDefinition;
use super::group::Group;
use super::path::Location;
use super::segment::Segment;
use crate::domain::encoding::EncodingCharacters;
use crate::domain::errors::{ErrorCode, Hl7Error};
use crate::domain::ids::Version;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// A parsed or constructed HL7 message
///
/// The message owns its root [`Group`], the version it was parsed under and
/// the delimiters it declared in MSH-1 and MSH-2.
#[derive(Debug, Clone)]
pub struct Message {
    definition: Arc<MessageDefinition>,
    version: Version,
    encoding: EncodingCharacters,
    root: Group,
}

impl Message {
    /// Creates an empty message with default delimiters
    pub fn new(definition: Arc<MessageDefinition>, version: Version) -> Self {
        let root = Group::new(definition.root.clone());
        Self {
            definition,
            version,
            encoding: EncodingCharacters::default(),
            root,
        }
    }

    pub fn with_encoding_characters(mut self, encoding: EncodingCharacters) -> Self {
        self.encoding = encoding;
        self
    }

    /// Message structure name, e.g. `ADT_A01`
    pub fn structure(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &Arc<MessageDefinition> {
        &self.definition
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn encoding_characters(&self) -> EncodingCharacters {
        self.encoding
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }

    pub fn msh(&self) -> Option<&Segment> {
        self.root.find_segment("MSH")
    }

    /// Header segment, created with MSH-1, MSH-2 and MSH-12 filled when absent
    pub fn msh_mut(&mut self) -> Result<&mut Segment, Hl7Error> {
        let created = self.root.get("MSH", 0)?.is_none();
        let field = self.encoding.field_separator().to_string();
        let encoding = self.encoding.to_string();
        let version = self.version.to_string();
        let msh = self.root.segment_mut("MSH")?;
        if created {
            msh.set_value(1, 0, 1, 1, &field)?;
            msh.set_value(2, 0, 1, 1, &encoding)?;
            msh.set_value(12, 0, 1, 1, &version)?;
        }
        Ok(msh)
    }

    /// MSH-9 component 1
    pub fn message_type(&self) -> Option<&str> {
        self.msh_value(9, 1)
    }

    /// MSH-9 component 2
    pub fn trigger_event(&self) -> Option<&str> {
        self.msh_value(9, 2)
    }

    /// MSH-10
    pub fn control_id(&self) -> Option<&str> {
        self.msh_value(10, 1)
    }

    /// MSH-11 component 1
    pub fn processing_id(&self) -> Option<&str> {
        self.msh_value(11, 1)
    }

    /// Every segment in document order
    pub fn segments(&self) -> Vec<&Segment> {
        self.root.segments()
    }

    /// Reads the value at a location such as `PID-3(1)-1`
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use pipehat::core::Parser;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let parser = Parser::with_defaults()?;
    /// let message = parser.parse("MSH|^~\\&|A|B|C|D|20240101||ADT^A01|123|P|2.4\rPID|1||12345\r")?;
    /// assert_eq!(message.get("PID-3-1")?, Some("12345"));
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed location. A location pointing at a
    /// segment or value that is not present reads as `None`.
    pub fn get(&self, path: &str) -> Result<Option<&str>, Hl7Error> {
        let location: Location = path.parse()?;
        let segment = self
            .segments()
            .into_iter()
            .filter(|s| s.name() == location.segment)
            .nth(location.segment_rep);
        match segment {
            Some(s) => s.value(
                location.field,
                location.field_rep,
                location.component,
                location.subcomponent,
            ),
            None => Ok(None),
        }
    }

    /// Writes the value at a location; the segment must already exist
    pub fn set(&mut self, path: &str, value: &str) -> Result<(), Hl7Error> {
        let location: Location = path.parse()?;
        let segment = self
            .root
            .segments_mut()
            .into_iter()
            .filter(|s| s.name() == location.segment)
            .nth(location.segment_rep)
            .ok_or_else(|| {
                Hl7Error::new(
                    format!("Segment {} is not present in the message", location.segment),
                    ErrorCode::ApplicationInternalError,
                )
                .with_segment(location.segment.clone())
            })?;
        segment.set_value(
            location.field,
            location.field_rep,
            location.component,
            location.subcomponent,
            value,
        )
    }

    /// JSON view of the whole message
    pub fn to_json(&self) -> JsonValue {
        serde_json::json!({
            "structure": self.structure(),
            "version": self.version.as_str(),
            "encoding_characters": self.encoding.to_string(),
            "message": self.root.to_json(),
        })
    }

    fn msh_value(&self, field: usize, component: usize) -> Option<&str> {
        self.msh()
            .and_then(|msh| msh.value(field, 0, component, 1).ok().flatten())
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.structure() == other.structure()
            && self.version == other.version
            && self.encoding == other.encoding
            && self.root == other.root
    }
}

impl Eq for Message {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::definition::{ChildDefinition, SegmentDefinition};

    fn ack_definition() -> Arc<MessageDefinition> {
        Arc::new(MessageDefinition::new(
            "ACK",
            vec![
                ChildDefinition::segment(Arc::new(SegmentDefinition::generic("MSH")), true, false),
                ChildDefinition::segment(Arc::new(SegmentDefinition::generic("MSA")), true, false),
            ],
        ))
    }

    fn version() -> Version {
        Version::new("2.4").unwrap()
    }

    #[test]
    fn test_msh_mut_initializes_header() {
        let mut message = Message::new(ack_definition(), version());
        message.msh_mut().unwrap();

        let msh = message.msh().unwrap();
        assert_eq!(msh.value(1, 0, 1, 1).unwrap(), Some("|"));
        assert_eq!(msh.value(2, 0, 1, 1).unwrap(), Some("^~\\&"));
        assert_eq!(msh.value(12, 0, 1, 1).unwrap(), Some("2.4"));
    }

    #[test]
    fn test_get_and_set_by_location() {
        let mut message = Message::new(ack_definition(), version());
        message.msh_mut().unwrap();
        message.root_mut().segment_mut("MSA").unwrap();

        message.set("MSA-1", "AA").unwrap();
        message.set("MSH-9-2", "A01").unwrap();

        assert_eq!(message.get("MSA-1").unwrap(), Some("AA"));
        assert_eq!(message.get("MSH-9-2").unwrap(), Some("A01"));
        assert_eq!(message.trigger_event(), Some("A01"));
        assert_eq!(message.get("MSA(1)-1").unwrap(), None);
    }

    #[test]
    fn test_set_on_missing_segment_fails() {
        let mut message = Message::new(ack_definition(), version());
        let err = message.set("MSA-1", "AA").unwrap_err();
        assert_eq!(err.segment(), Some("MSA"));
    }

    #[test]
    fn test_to_json_shape() {
        let mut message = Message::new(ack_definition(), version());
        message.msh_mut().unwrap();
        let json = message.to_json();
        assert_eq!(json["structure"], "ACK");
        assert_eq!(json["version"], "2.4");
        assert!(json["message"]["children"]["MSH"].is_array());
    }
}
