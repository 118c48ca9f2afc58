//! Parser and encoder entry points
//!
//! A parse runs through a fixed sequence: sniff the encoding, sniff the
//! version, check the raw text against encoding rules, resolve the message
//! structure, decode the segments, then check the built message against
//! message rules. Encoding runs the message rules first and the encoding
//! rules on the produced text. Validation failures are collected into a
//! [`ValidationReport`] and only turn into errors under an abort policy.

use super::compose::compose;
use super::context::Hl7Context;
use super::decode::{split_segments, Decoder};
use super::sniff::{self, CriticalResponseData, Encoding, RawHeader};
use crate::domain::encoding::EncodingCharacters;
use crate::domain::errors::{ErrorCode, Hl7Error, PipehatError};
use crate::domain::ids::Version;
use crate::model::definition::MessageDefinition;
use crate::model::Message;
use crate::validation::{
    FailureAction, MessageRulePolicy, ValidationIssue, ValidationReport, ValidationStage, Violation,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// HL7 v2 parser and encoder
///
/// Cheap to clone; every clone shares the same [`Hl7Context`].
///
/// # Examples
///
/// ```rust,no_run
/// use pipehat::core::Parser;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let parser = Parser::with_defaults()?;
/// let message = parser.parse("MSH|^~\\&|A|B|C|D|20240101||ADT^A01|123|P|2.4\rPID|1||12345\r")?;
/// assert_eq!(message.structure(), "ADT_A01");
/// assert_eq!(message.control_id(), Some("123"));
///
/// let text = parser.encode(&message)?;
/// assert!(text.starts_with("MSH|^~\\&|A|B|C|D|20240101||ADT^A01|123|P|2.4\r"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Parser {
    context: Arc<Hl7Context>,
}

impl Parser {
    pub fn new(context: Arc<Hl7Context>) -> Self {
        Self { context }
    }

    /// Parser over [`Hl7Context::with_defaults`]
    pub fn with_defaults() -> Result<Self, PipehatError> {
        Ok(Self::new(Arc::new(Hl7Context::with_defaults()?)))
    }

    pub fn context(&self) -> &Arc<Hl7Context> {
        &self.context
    }

    /// Wire encoding of `text`, `None` when it is not a message
    pub fn encoding_of(&self, text: &str) -> Option<Encoding> {
        sniff::sniff_encoding(text)
    }

    /// MSH-12 of `text`, read without a full parse
    pub fn version_of(&self, text: &str) -> Result<String, Hl7Error> {
        sniff::sniff_version(text)
    }

    /// Header values needed to acknowledge `text`, read without a full parse
    pub fn critical_response_data(&self, text: &str) -> Result<CriticalResponseData, Hl7Error> {
        sniff::critical_response_data(text)
    }

    /// Parses a message
    ///
    /// # Errors
    ///
    /// Returns [`PipehatError::EncodingNotSupported`] for text that is not
    /// pipe-delimited, [`PipehatError::Hl7`] for structural, data type and
    /// version failures and [`PipehatError::Validation`] when a rule fails
    /// under an abort policy.
    pub fn parse(&self, text: &str) -> Result<Message, PipehatError> {
        self.parse_with_report(text).map(|(message, _)| message)
    }

    /// Parses a message and returns the validation issues found on the way
    pub fn parse_with_report(&self, text: &str) -> Result<(Message, ValidationReport), PipehatError> {
        let encoding = sniff::sniff_encoding(text).ok_or_else(|| {
            PipehatError::EncodingNotSupported(
                "the text does not start with an MSH segment or an XML document".to_string(),
            )
        })?;
        let declared = sniff::sniff_version(text)?;
        let version = self.context.registry.version(&declared)?;

        let mut report = ValidationReport::new();
        self.check_encoding(text, encoding, &version, ValidationStage::BeforeParse, &mut report)?;

        if encoding == Encoding::Xml {
            return Err(PipehatError::EncodingNotSupported(encoding.name().to_string()));
        }

        let header = RawHeader::locate(text).ok_or_else(|| {
            Hl7Error::new("Can't find an MSH segment", ErrorCode::RequiredFieldMissing).with_segment("MSH")
        })?;
        let enc = header.declared_encoding_characters()?;
        let definition = self.resolve_structure(&header, &enc, &version)?;

        let segments = split_segments(text.trim_start(), enc.field_separator())?;
        let mut message = Message::new(definition.clone(), version.clone()).with_encoding_characters(enc);
        let primitive = Decoder::new(&self.context, &definition, version.clone(), enc, segments)
            .decode(&mut message)?;
        report.extend(primitive);

        self.check_message(&message, ValidationStage::AfterParse, &mut report)?;

        debug!(
            version = %version,
            structure = message.structure(),
            issues = report.len(),
            "Parsed message"
        );
        Ok((message, report))
    }

    /// Encodes a message as ER7 text
    ///
    /// # Errors
    ///
    /// Returns [`PipehatError::Hl7`] when the message has no MSH segment and
    /// [`PipehatError::Validation`] when a rule fails under an abort policy.
    pub fn encode(&self, message: &Message) -> Result<String, PipehatError> {
        self.encode_with_report(message).map(|(text, _)| text)
    }

    /// Encodes a message and returns the validation issues found on the way
    pub fn encode_with_report(&self, message: &Message) -> Result<(String, ValidationReport), PipehatError> {
        let mut report = ValidationReport::new();
        self.check_message(message, ValidationStage::BeforeEncode, &mut report)?;

        let text = compose(message, &self.context.options.segment_separator)?;

        self.check_encoding(
            &text,
            Encoding::Er7,
            message.version(),
            ValidationStage::AfterEncode,
            &mut report,
        )?;

        debug!(
            version = %message.version(),
            structure = message.structure(),
            length = text.len(),
            "Encoded message"
        );
        Ok((text, report))
    }

    /// Grammar for the message type in MSH-9
    ///
    /// An explicit structure in MSH-9-3 is trusted as is. Otherwise the
    /// event map of the version resolves `TYPE_EVENT`, and a structure the
    /// version does not define falls back to the bare message type.
    fn resolve_structure(
        &self,
        header: &RawHeader<'_>,
        enc: &EncodingCharacters,
        version: &Version,
    ) -> Result<Arc<MessageDefinition>, Hl7Error> {
        let registry = &self.context.registry;
        let component = |n| header.component(9, n, enc).map(str::trim).filter(|v| !v.is_empty());

        let message_type = component(1).ok_or_else(|| {
            Hl7Error::new("MSH-9 (message type) is empty", ErrorCode::RequiredFieldMissing)
                .with_segment("MSH")
                .with_field(9)
        })?;

        if let Some(explicit) = component(3) {
            debug!(structure = explicit, "Using explicit message structure");
            return registry.explicit_message_definition(explicit, version.as_str());
        }

        let code = match component(2) {
            Some(event) => format!("{message_type}_{event}"),
            None => message_type.to_string(),
        };
        let structure = registry.resolve_event_structure(&code, version.as_str())?;
        match registry.message_definition(&structure, version.as_str()) {
            Ok(definition) => Ok(definition),
            Err(err) => match registry.message_definition(message_type, version.as_str()) {
                Ok(definition) => {
                    debug!(code = %code, structure = message_type, "Falling back to the message type");
                    Ok(definition)
                }
                Err(_) => Err(err),
            },
        }
    }

    fn check_encoding(
        &self,
        text: &str,
        encoding: Encoding,
        version: &Version,
        stage: ValidationStage,
        report: &mut ValidationReport,
    ) -> Result<(), PipehatError> {
        let rules = self
            .context
            .validation
            .encoding_rules(version.as_str(), encoding.name());
        let issues = rules
            .iter()
            .flat_map(|rule| {
                let (description, section) = (rule.description(), rule.section_reference());
                rule.check(text)
                    .into_iter()
                    .map(move |v| issue(stage, v, description, section))
            })
            .collect();
        self.decide(issues, self.context.validation.policy().encoding_failures, report)
    }

    fn check_message(
        &self,
        message: &Message,
        stage: ValidationStage,
        report: &mut ValidationReport,
    ) -> Result<(), PipehatError> {
        let policy = self.context.validation.policy();
        let mut rules = self.context.validation.message_rules(
            message.version().as_str(),
            message.message_type().unwrap_or_default(),
            message.trigger_event().unwrap_or_default(),
        );
        if policy.message_rule_policy == MessageRulePolicy::FirstMatch {
            rules.truncate(1);
        }
        let issues = rules
            .iter()
            .flat_map(|rule| {
                let (description, section) = (rule.description(), rule.section_reference());
                rule.check(message)
                    .into_iter()
                    .map(move |v| issue(stage, v, description, section))
            })
            .collect();
        self.decide(issues, policy.message_failures, report)
    }

    /// Applies the failure action to the issues of one hook
    fn decide(
        &self,
        issues: Vec<ValidationIssue>,
        action: FailureAction,
        report: &mut ValidationReport,
    ) -> Result<(), PipehatError> {
        if issues.is_empty() {
            return Ok(());
        }
        if action == FailureAction::Abort {
            let mut failed = ValidationReport::new();
            for issue in issues {
                failed.record(issue);
            }
            return Err(PipehatError::Validation(failed));
        }
        for issue in issues {
            warn!(
                stage = %issue.stage,
                rule = %issue.rule,
                segment = issue.segment.as_deref().unwrap_or_default(),
                field = issue.field.unwrap_or_default(),
                "{}",
                issue.message
            );
            report.record(issue);
        }
        Ok(())
    }
}

fn issue(stage: ValidationStage, violation: Violation, rule: &str, section: &str) -> ValidationIssue {
    let mut issue = ValidationIssue::new(stage, violation.code, violation.message, rule, section);
    issue.segment = violation.segment;
    issue.repetition = violation.repetition;
    issue.field = violation.field;
    issue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::{ParserOptions, UnexpectedSegments};
    use crate::validation::{ValidationContext, ValidationPolicy};
    use pretty_assertions::assert_eq;

    const ADT_A01: &str = "MSH|^~\\&|A|B|C|D|20240101||ADT^A01|123|P|2.4\rPID|1||12345\r";

    fn parser_with(policy: ValidationPolicy, options: ParserOptions) -> Parser {
        let defaults = Hl7Context::with_defaults().unwrap();
        let validation = ValidationContext::with_rules(
            policy,
            &[crate::validation::defaults::MSH_REQUIRED_FIELDS],
            &[crate::validation::defaults::SEGMENT_SEPARATOR],
        )
        .unwrap();
        Parser::new(Arc::new(Hl7Context::new(
            defaults.registry,
            validation,
            defaults.tables,
            options,
        )))
    }

    #[test]
    fn test_parse_and_encode() {
        let parser = Parser::with_defaults().unwrap();
        let (message, report) = parser.parse_with_report(ADT_A01).unwrap();
        assert!(report.is_clean(), "{}", report.format_summary());
        assert_eq!(message.version().as_str(), "2.4");
        assert_eq!(message.structure(), "ADT_A01");
        assert_eq!(parser.encode(&message).unwrap(), ADT_A01);
    }

    #[test]
    fn test_event_map_resolves_structure() {
        let parser = Parser::with_defaults().unwrap();
        let text = ADT_A01.replace("ADT^A01", "ADT^A04");
        let message = parser.parse(&text).unwrap();
        assert_eq!(message.structure(), "ADT_A01");
        assert_eq!(message.trigger_event(), Some("A04"));
    }

    #[test]
    fn test_unknown_structure_is_internal_error() {
        let parser = Parser::with_defaults().unwrap();
        let text = ADT_A01.replace("ADT^A01", "ZZZ^Z01");
        let err = parser.parse(&text).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::ApplicationInternalError);
    }

    #[test]
    fn test_empty_message_type() {
        let parser = Parser::with_defaults().unwrap();
        let text = ADT_A01.replace("ADT^A01", "");
        let err = parser.parse(&text).unwrap_err().into_hl7();
        assert_eq!(err.code(), ErrorCode::RequiredFieldMissing);
        assert_eq!(err.field(), Some(9));
    }

    #[test]
    fn test_not_a_message() {
        let parser = Parser::with_defaults().unwrap();
        let err = parser.parse("hello world").unwrap_err();
        assert!(matches!(err, PipehatError::EncodingNotSupported(_)));
    }

    #[test]
    fn test_xml_is_sniffed_but_not_parsed() {
        let parser = Parser::with_defaults().unwrap();
        let xml = "<ADT_A01><MSH><MSH.12><VID.1>2.4</VID.1></MSH.12></MSH></ADT_A01>";
        assert_eq!(parser.encoding_of(xml), Some(Encoding::Xml));
        assert_eq!(parser.version_of(xml).unwrap(), "2.4");
        let err = parser.parse(xml).unwrap_err();
        assert!(matches!(err, PipehatError::EncodingNotSupported(ref name) if name == "XML"));
    }

    #[test]
    fn test_line_feeds_reported() {
        let parser = Parser::with_defaults().unwrap();
        let text = ADT_A01.replace('\r', "\n");
        let (message, report) = parser.parse_with_report(&text).unwrap();
        assert_eq!(message.structure(), "ADT_A01");
        assert_eq!(report.issues_at(ValidationStage::BeforeParse).count(), 1);
    }

    #[test]
    fn test_line_feeds_abort() {
        let policy = ValidationPolicy {
            encoding_failures: FailureAction::Abort,
            ..ValidationPolicy::default()
        };
        let parser = parser_with(policy, ParserOptions::default());
        let err = parser.parse(&ADT_A01.replace('\r', "\n")).unwrap_err();
        assert!(matches!(err, PipehatError::Validation(_)));
    }

    #[test]
    fn test_missing_control_id_reported_after_parse() {
        let parser = Parser::with_defaults().unwrap();
        let text = ADT_A01.replace("|123|", "||");
        let (_, report) = parser.parse_with_report(&text).unwrap();
        let issue = report.issues_at(ValidationStage::AfterParse).next().unwrap();
        assert_eq!(issue.code, ErrorCode::RequiredFieldMissing);
        assert_eq!(issue.field, Some(10));
    }

    #[test]
    fn test_encode_uses_configured_separator() {
        let options = ParserOptions {
            segment_separator: "\r\n".to_string(),
            unexpected_segments: UnexpectedSegments::AddInline,
            ..ParserOptions::default()
        };
        let parser = parser_with(ValidationPolicy::default(), options);
        let message = parser.parse(ADT_A01).unwrap();
        let (text, report) = parser.encode_with_report(&message).unwrap();
        assert_eq!(text, ADT_A01.replace('\r', "\r\n"));
        assert_eq!(report.issues_at(ValidationStage::AfterEncode).count(), 1);
    }
}
