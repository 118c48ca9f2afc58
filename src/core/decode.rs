//! Recursive descent over the segment stream
//!
//! The grammar of the message structure is walked depth-first. Every child
//! slot greedily takes the segments that can open it, a repeating child
//! keeps going for as long as the stream matches, and a required child that
//! takes nothing fails the parse. Segments the grammar does not contain at
//! all are handled by the configured [`UnexpectedSegments`] policy.

use super::context::{Hl7Context, UnexpectedSegments};
use super::escape::unescape;
use crate::domain::encoding::EncodingCharacters;
use crate::domain::errors::{ErrorCode, Hl7Error};
use crate::domain::ids::Version;
use crate::model::definition::{ChildDefinition, ChildKind, MessageDefinition, SegmentDefinition};
use crate::model::{Group, Message, Primitive, Segment, Structure, Type};
use crate::validation::rules::accepts;
use crate::validation::{FailureAction, PrimitiveRule, ValidationIssue, ValidationReport, ValidationStage};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// One line of the message: segment name and full text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawSegment<'a> {
    pub name: &'a str,
    pub text: &'a str,
}

/// Splits message text into segments
///
/// Carriage returns, line feeds and CR LF pairs all end a segment; blank
/// lines are skipped.
///
/// # Errors
///
/// Returns a SEGMENT_SEQUENCE_ERROR for a line that does not start with a
/// three character segment name.
pub(crate) fn split_segments(text: &str, field_separator: char) -> Result<Vec<RawSegment<'_>>, Hl7Error> {
    let mut segments = Vec::new();
    for line in text.split(['\r', '\n']) {
        if line.trim().is_empty() {
            continue;
        }
        let name = line.split(field_separator).next().unwrap_or_default();
        let valid = name.len() == 3 && name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if !valid {
            let shown: String = line.chars().take(20).collect();
            return Err(Hl7Error::new(
                format!("Invalid segment name '{name}' in line starting '{shown}'"),
                ErrorCode::SegmentSequenceError,
            ));
        }
        segments.push(RawSegment { name, text: line });
    }
    Ok(segments)
}

/// Where a leaf value came from, for error locations
#[derive(Debug, Clone, Copy)]
struct Position<'p> {
    segment: &'p str,
    occurrence: usize,
    field: usize,
}

/// Builds a message tree from raw segments
pub(crate) struct Decoder<'a> {
    context: &'a Hl7Context,
    version: Version,
    enc: EncodingCharacters,
    segments: Vec<RawSegment<'a>>,
    pos: usize,
    known: HashSet<String>,
    occurrences: HashMap<&'a str, usize>,
    rules: HashMap<String, Arc<[Arc<dyn PrimitiveRule>]>>,
    report: ValidationReport,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(
        context: &'a Hl7Context,
        definition: &MessageDefinition,
        version: Version,
        enc: EncodingCharacters,
        segments: Vec<RawSegment<'a>>,
    ) -> Self {
        let known = definition
            .root
            .segment_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            context,
            version,
            enc,
            segments,
            pos: 0,
            known,
            occurrences: HashMap::new(),
            rules: HashMap::new(),
            report: ValidationReport::new(),
        }
    }

    /// Fills `message` and returns the primitive rule failures recorded on
    /// the way
    ///
    /// # Errors
    ///
    /// Structural errors, data type errors and, under an abort policy, the
    /// first primitive rule failure.
    pub(crate) fn decode(mut self, message: &mut Message) -> Result<ValidationReport, Hl7Error> {
        self.parse_group(message.root_mut())?;

        if let Some(raw) = self.segments.get(self.pos).copied() {
            let occurrence = self.occurrences.get(raw.name).copied().unwrap_or(0) + 1;
            return Err(Hl7Error::new(
                format!(
                    "Segment {} is not allowed at this position in {}",
                    raw.name,
                    message.structure()
                ),
                ErrorCode::SegmentSequenceError,
            )
            .with_segment(raw.name)
            .with_repetition(occurrence));
        }

        debug!(
            structure = message.structure(),
            segments = self.pos,
            "Decoded message"
        );
        Ok(self.report)
    }

    fn peek_name(&self) -> Option<&'a str> {
        self.segments.get(self.pos).map(|s| s.name)
    }

    fn is_known(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    /// Name of the first segment from the current position the grammar knows
    fn next_known_name(&self) -> Option<&'a str> {
        self.segments[self.pos..]
            .iter()
            .map(|s| s.name)
            .find(|name| self.is_known(name))
    }

    fn parse_group(&mut self, group: &mut Group) -> Result<(), Hl7Error> {
        let definition = group.definition().clone();
        let mut inserted = 0;
        for (i, child) in definition.children.iter().enumerate() {
            inserted += self.absorb_unexpected(group, i + inserted)?;
            inserted += self.parse_child(group, i + inserted, child)?;
        }
        self.absorb_unexpected(group, definition.children.len() + inserted)?;
        Ok(())
    }

    /// Parses every repetition of `child` into the slot at `slot`
    ///
    /// Returns the number of nonstandard slots inserted after the child for
    /// unexpected segments found between its repetitions.
    fn parse_child(
        &mut self,
        group: &mut Group,
        slot: usize,
        child: &ChildDefinition,
    ) -> Result<usize, Hl7Error> {
        let mut reps = 0;
        let mut inserted = 0;
        while let Some(name) = self.peek_name() {
            if reps > 0 && !child.repeating {
                break;
            }
            if !self.is_known(name) {
                let resumes = reps > 0 && self.next_known_name().is_some_and(|n| child.starts_with(n));
                if !resumes {
                    break;
                }
                inserted += self.absorb_unexpected(group, slot + 1 + inserted)?;
                continue;
            }
            if !child.starts_with(name) {
                break;
            }

            let structure = match &child.kind {
                ChildKind::Segment(definition) => {
                    Structure::Segment(self.parse_segment(definition.clone())?)
                }
                ChildKind::Group(definition) => {
                    let start = self.pos;
                    let mut nested = Group::new(definition.clone());
                    self.parse_group(&mut nested)?;
                    if self.pos == start {
                        break;
                    }
                    Structure::Group(nested)
                }
            };
            group.push_at(slot, structure);
            reps += 1;
        }

        if reps == 0 && child.required {
            return Err(self.missing(child));
        }
        Ok(inserted)
    }

    /// Consumes a run of segments the grammar does not contain
    ///
    /// Returns the number of slots inserted into `group`.
    fn absorb_unexpected(&mut self, group: &mut Group, index: usize) -> Result<usize, Hl7Error> {
        let mut inserted = 0;
        while let Some(name) = self.peek_name() {
            if self.is_known(name) {
                break;
            }
            match self.context.options.unexpected_segments {
                UnexpectedSegments::AddInline => {
                    let definition = self
                        .context
                        .registry
                        .segment_definition(name, &self.version)
                        .unwrap_or_else(|| Arc::new(SegmentDefinition::generic(name)));
                    let segment = self.parse_segment(definition)?;
                    debug!(segment = name, group = group.name(), "Added nonstandard segment");
                    if group.insert_nonstandard(index + inserted, segment) {
                        inserted += 1;
                    }
                }
                UnexpectedSegments::Drop => {
                    let occurrence = self.next_occurrence(name);
                    warn!(segment = name, repetition = occurrence, "Dropping unexpected segment");
                    self.pos += 1;
                }
                UnexpectedSegments::Error => {
                    let occurrence = self.occurrences.get(name).copied().unwrap_or(0) + 1;
                    return Err(Hl7Error::new(
                        format!("Unexpected segment {name} is not part of {}", group.name()),
                        ErrorCode::SegmentSequenceError,
                    )
                    .with_segment(name)
                    .with_repetition(occurrence));
                }
            }
        }
        Ok(inserted)
    }

    fn missing(&self, child: &ChildDefinition) -> Hl7Error {
        let openers = child.first_segments();
        let expected = openers.iter().next().copied().unwrap_or(child.name.as_str());
        let later = self.segments[self.pos..]
            .iter()
            .find(|s| openers.contains(s.name));

        match later {
            Some(found) => {
                let occurrence = self.occurrences.get(found.name).copied().unwrap_or(0) + 1;
                let here = self
                    .peek_name()
                    .map_or_else(|| "the end of the message".to_string(), |n| format!("segment {n}"));
                Hl7Error::new(
                    format!("Segment {} is out of order, it is required before {here}", found.name),
                    ErrorCode::SegmentSequenceError,
                )
                .with_segment(found.name)
                .with_repetition(occurrence)
            }
            None => {
                let kind = match child.kind {
                    ChildKind::Segment(_) => "segment",
                    ChildKind::Group(_) => "group",
                };
                Hl7Error::new(
                    format!("Required {kind} {} is missing", child.name),
                    ErrorCode::RequiredFieldMissing,
                )
                .with_segment(expected)
            }
        }
    }

    fn next_occurrence(&mut self, name: &'a str) -> usize {
        let count = self.occurrences.entry(name).or_insert(0);
        *count += 1;
        *count
    }

    fn parse_segment(&mut self, definition: Arc<SegmentDefinition>) -> Result<Segment, Hl7Error> {
        let raw = self.segments[self.pos];
        self.pos += 1;
        let occurrence = self.next_occurrence(raw.name);
        let separator = self.enc.field_separator();

        let mut segment = Segment::new(definition);
        let mut fields = raw.text.split(separator);
        fields.next();

        let mut number = 1;
        if raw.name == "MSH" {
            let at = |field| Position {
                segment: raw.name,
                occurrence,
                field,
            };
            segment
                .set_value(1, 0, 1, 1, &separator.to_string())
                .map_err(|e| locate(e, at(1)))?;
            if let Some(declared) = fields.next().filter(|d| !d.is_empty()) {
                segment
                    .set_value(2, 0, 1, 1, declared)
                    .map_err(|e| locate(e, at(2)))?;
            }
            number = 3;
        }

        for text in fields {
            let position = Position {
                segment: raw.name,
                occurrence,
                field: number,
            };
            self.parse_field(&mut segment, text, position)?;
            number += 1;
        }

        segment.normalize();
        Ok(segment)
    }

    fn parse_field(&mut self, segment: &mut Segment, text: &str, pos: Position<'_>) -> Result<(), Hl7Error> {
        if text.is_empty() {
            return Ok(());
        }
        for (rep, rep_text) in text.split(self.enc.repetition_separator()).enumerate() {
            if rep_text.is_empty() {
                continue;
            }
            let value = segment
                .repetition_mut(pos.field, rep)
                .map_err(|e| locate(e, pos))?;
            self.parse_field_value(value, rep_text, pos)
                .map_err(|e| locate(e, pos))?;
        }
        Ok(())
    }

    /// Field level: components split on the component separator
    fn parse_field_value(&mut self, value: &mut Type, text: &str, pos: Position<'_>) -> Result<(), Hl7Error> {
        let comp = self.enc.component_separator();
        match value {
            Type::Primitive(_) => {
                let mut pieces = text.split(comp);
                let first = pieces.next().unwrap_or_default();
                self.set_leaf(value.first_primitive_mut(), first, pos)?;
                for (i, piece) in pieces.enumerate() {
                    if !piece.is_empty() {
                        let extra = value.component_mut(i + 2)?;
                        self.parse_component(extra, piece, pos)?;
                    }
                }
            }
            Type::Composite(_) => {
                for (i, piece) in text.split(comp).enumerate() {
                    if !piece.is_empty() {
                        let component = value.component_mut(i + 1)?;
                        self.parse_component(component, piece, pos)?;
                    }
                }
            }
            Type::Varies(_) => {
                let sub = self.enc.subcomponent_separator();
                let pieces = trimmed_pieces(text, comp);
                let structured = pieces.len() > 1
                    || pieces.first().is_some_and(|p| trimmed_pieces(p, sub).len() > 1);
                if structured {
                    structure(value);
                    for (i, piece) in pieces.iter().enumerate() {
                        if !piece.is_empty() {
                            let component = value.component_mut(i + 1)?;
                            self.parse_component(component, piece, pos)?;
                        }
                    }
                } else if let Some(first) = pieces.first() {
                    let leaf = trimmed_pieces(first, sub).first().copied().unwrap_or_default();
                    self.set_leaf(value.first_primitive_mut(), leaf, pos)?;
                }
            }
        }
        Ok(())
    }

    /// Component level: subcomponents split on the subcomponent separator
    fn parse_component(&mut self, value: &mut Type, text: &str, pos: Position<'_>) -> Result<(), Hl7Error> {
        let sub = self.enc.subcomponent_separator();
        match value {
            Type::Primitive(_) => {
                let mut pieces = text.split(sub);
                let first = pieces.next().unwrap_or_default();
                self.set_leaf(value.first_primitive_mut(), first, pos)?;
                for (i, piece) in pieces.enumerate() {
                    if !piece.is_empty() {
                        let extra = value.component_mut(i + 2)?;
                        self.set_leaf(extra.first_primitive_mut(), piece, pos)?;
                    }
                }
            }
            Type::Composite(_) => {
                for (i, piece) in text.split(sub).enumerate() {
                    if !piece.is_empty() {
                        let component = value.component_mut(i + 1)?;
                        self.set_leaf(component.first_primitive_mut(), piece, pos)?;
                    }
                }
            }
            Type::Varies(_) => {
                let pieces = trimmed_pieces(text, sub);
                if pieces.len() > 1 {
                    structure(value);
                    for (i, piece) in pieces.iter().enumerate() {
                        if !piece.is_empty() {
                            let component = value.component_mut(i + 1)?;
                            self.set_leaf(component.first_primitive_mut(), piece, pos)?;
                        }
                    }
                } else if let Some(first) = pieces.first() {
                    self.set_leaf(value.first_primitive_mut(), first, pos)?;
                }
            }
        }
        Ok(())
    }

    /// Unescapes, corrects and checks a leaf value, then stores it
    fn set_leaf(&mut self, leaf: &mut Primitive, raw: &str, pos: Position<'_>) -> Result<(), Hl7Error> {
        if raw.is_empty() {
            return Ok(());
        }
        let mut value = unescape(raw, &self.enc).into_owned();
        let rules = self.rules_for(leaf.datatype());

        for rule in rules.iter() {
            let corrected = match rule.correct(&value) {
                Cow::Borrowed(c) if c == value.as_str() => None,
                c => Some(c.into_owned()),
            };
            if let Some(c) = corrected {
                value = c;
            }
        }

        for rule in rules.iter() {
            if accepts(rule.as_ref(), Some(value.as_str())) {
                continue;
            }
            let issue = ValidationIssue::new(
                ValidationStage::Primitive,
                ErrorCode::DataTypeError,
                format!(
                    "Failed validation rule for value \"{}\": {}",
                    value,
                    rule.description()
                ),
                rule.description(),
                rule.section_reference(),
            )
            .at(pos.segment, pos.occurrence, pos.field);

            match self.context.validation.policy().primitive_failures {
                FailureAction::Abort => return Err(Hl7Error::from(&issue)),
                FailureAction::Report => {
                    warn!(
                        segment = pos.segment,
                        repetition = pos.occurrence,
                        field = pos.field,
                        datatype = leaf.datatype(),
                        rule = rule.description(),
                        "Primitive value failed validation"
                    );
                    self.report.record(issue);
                }
            }
        }

        leaf.set_value(value);
        Ok(())
    }

    fn rules_for(&mut self, datatype: &str) -> Arc<[Arc<dyn PrimitiveRule>]> {
        if let Some(rules) = self.rules.get(datatype) {
            return rules.clone();
        }
        let rules: Arc<[Arc<dyn PrimitiveRule>]> = self
            .context
            .validation
            .primitive_rules(self.version.as_str(), datatype)
            .into();
        self.rules.insert(datatype.to_string(), rules.clone());
        rules
    }
}

/// Pieces of `text` split on `separator`, trailing empty pieces removed
fn trimmed_pieces(text: &str, separator: char) -> Vec<&str> {
    let mut pieces: Vec<&str> = text.split(separator).collect();
    while pieces.last().is_some_and(|p| p.is_empty()) {
        pieces.pop();
    }
    pieces
}

fn structure(value: &mut Type) {
    if let Type::Varies(v) = value {
        v.structure();
    }
}

/// Adds the segment occurrence and field to an error raised below them
fn locate(err: Hl7Error, pos: Position<'_>) -> Hl7Error {
    let needs_repetition = err.repetition().is_none() && err.segment().map_or(true, |s| s == pos.segment);
    let err = err.located(pos.segment, pos.occurrence, Some(pos.field));
    if needs_repetition && err.repetition().is_none() {
        err.with_repetition(pos.occurrence)
    } else {
        err
    }
}
