//! Structure definitions
//!
//! Definitions describe the grammar of a version: which data types exist,
//! which fields a segment has and how segments nest into groups and messages.
//! They are immutable once built and shared through `Arc`, so every parsed
//! [`Segment`](super::Segment) or [`Group`](super::Group) points at the
//! definition it was created from.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Name of the data type used for values whose type is only known at runtime
pub const VARIES: &str = "varies";

/// Shape of a data type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DatatypeKind {
    /// Single string value
    Primitive,
    /// Ordered components, each with its own data type
    Composite(Vec<Arc<DatatypeDefinition>>),
    /// Type decided by the content
    Varies,
}

/// Data type definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatatypeDefinition {
    pub name: String,
    pub description: Option<String>,
    pub kind: DatatypeKind,
}

impl DatatypeDefinition {
    pub fn primitive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind: DatatypeKind::Primitive,
        }
    }

    pub fn composite(name: impl Into<String>, components: Vec<Arc<DatatypeDefinition>>) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind: DatatypeKind::Composite(components),
        }
    }

    pub fn varies() -> Self {
        Self {
            name: VARIES.to_string(),
            description: None,
            kind: DatatypeKind::Varies,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, DatatypeKind::Primitive)
    }
}

/// Field definition within a segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDefinition {
    pub description: String,
    pub datatype: Arc<DatatypeDefinition>,
    pub required: bool,
    /// Maximum number of repetitions, 0 for unbounded
    pub max_repetitions: usize,
    /// Maximum length in characters, 0 when not specified
    pub length: usize,
    /// HL7 table number for coded fields
    pub table: Option<u16>,
}

impl FieldDefinition {
    pub fn new(description: impl Into<String>, datatype: Arc<DatatypeDefinition>) -> Self {
        Self {
            description: description.into(),
            datatype,
            required: false,
            max_repetitions: 1,
            length: 0,
            table: None,
        }
    }

    /// Field used for positions beyond a segment's definition
    pub fn extra() -> Self {
        let mut field = Self::new("Extra field", Arc::new(DatatypeDefinition::varies()));
        field.max_repetitions = 0;
        field
    }

    /// Returns true when repetition `rep` (0-based) is allowed
    pub fn allows_repetition(&self, rep: usize) -> bool {
        self.max_repetitions == 0 || rep < self.max_repetitions
    }
}

/// Segment definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentDefinition {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldDefinition>,
}

impl SegmentDefinition {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields,
        }
    }

    /// Definition for a segment the grammar does not know (Z segments)
    ///
    /// Every field of a generic segment holds a `varies` value.
    pub fn generic(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Definition of field `number` (1-based)
    pub fn field(&self, number: usize) -> Option<&FieldDefinition> {
        number.checked_sub(1).and_then(|i| self.fields.get(i))
    }
}

/// What a child slot of a group holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ChildKind {
    Segment(Arc<SegmentDefinition>),
    Group(Arc<GroupDefinition>),
}

/// A child slot of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildDefinition {
    /// Slot name: the segment name, or the group name without the message prefix
    pub name: String,
    pub required: bool,
    pub repeating: bool,
    pub kind: ChildKind,
}

impl ChildDefinition {
    pub fn segment(definition: Arc<SegmentDefinition>, required: bool, repeating: bool) -> Self {
        Self {
            name: definition.name.clone(),
            required,
            repeating,
            kind: ChildKind::Segment(definition),
        }
    }

    pub fn group(
        name: impl Into<String>,
        definition: Arc<GroupDefinition>,
        required: bool,
        repeating: bool,
    ) -> Self {
        Self {
            name: name.into(),
            required,
            repeating,
            kind: ChildKind::Group(definition),
        }
    }

    /// Segment names that can open this child
    pub fn first_segments(&self) -> BTreeSet<&str> {
        match &self.kind {
            ChildKind::Segment(segment) => BTreeSet::from([segment.name.as_str()]),
            ChildKind::Group(group) => group.first_segments(),
        }
    }

    /// Returns true when `segment` can open this child
    pub fn starts_with(&self, segment: &str) -> bool {
        match &self.kind {
            ChildKind::Segment(definition) => definition.name == segment,
            ChildKind::Group(group) => group.starts_with(segment),
        }
    }
}

/// Group (or message root) definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupDefinition {
    /// Full name, prefixed with the message structure (`ADT_A01_PROCEDURE`)
    pub name: String,
    pub children: Vec<ChildDefinition>,
}

impl GroupDefinition {
    pub fn new(name: impl Into<String>, children: Vec<ChildDefinition>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    /// Derives the slot name and full name of a group inside `message`
    ///
    /// The slot name is the explicit group name when one is given, otherwise
    /// the names of every descendant segment concatenated depth-first. The
    /// full name prefixes the slot name with the message name.
    ///
    /// # Examples
    ///
    /// ```
    /// use pipehat::model::definition::{ChildDefinition, GroupDefinition, SegmentDefinition};
    /// use std::sync::Arc;
    ///
    /// let children = vec![
    ///     ChildDefinition::segment(Arc::new(SegmentDefinition::generic("PR1")), true, false),
    ///     ChildDefinition::segment(Arc::new(SegmentDefinition::generic("ROL")), false, true),
    /// ];
    /// let (slot, full) = GroupDefinition::derive_names("ADT_A01", None, &children);
    /// assert_eq!(slot, "PR1ROL");
    /// assert_eq!(full, "ADT_A01_PR1ROL");
    /// ```
    pub fn derive_names(
        message: &str,
        explicit: Option<&str>,
        children: &[ChildDefinition],
    ) -> (String, String) {
        let slot = match explicit.filter(|name| !name.trim().is_empty()) {
            Some(name) => name.trim().to_string(),
            None => {
                let mut names = String::new();
                collect_segment_names(children, &mut names);
                names
            }
        };
        let full = format!("{message}_{slot}");
        (slot, full)
    }

    /// Segment names that can open a repetition of this group
    ///
    /// Collects the opening segments of each child up to and including the
    /// first required child.
    pub fn first_segments(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        for child in &self.children {
            names.extend(child.first_segments());
            if child.required {
                break;
            }
        }
        names
    }

    pub fn starts_with(&self, segment: &str) -> bool {
        for child in &self.children {
            if child.starts_with(segment) {
                return true;
            }
            if child.required {
                break;
            }
        }
        false
    }

    /// Every segment name reachable from this group
    pub fn segment_names(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        for child in &self.children {
            match &child.kind {
                ChildKind::Segment(segment) => {
                    names.insert(segment.name.as_str());
                }
                ChildKind::Group(group) => names.extend(group.segment_names()),
            }
        }
        names
    }

    pub fn child(&self, name: &str) -> Option<&ChildDefinition> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn collect_segment_names(children: &[ChildDefinition], out: &mut String) {
    for child in children {
        match &child.kind {
            ChildKind::Segment(segment) => out.push_str(&segment.name),
            ChildKind::Group(group) => collect_segment_names(&group.children, out),
        }
    }
}

/// Message structure definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageDefinition {
    /// Structure name, e.g. `ADT_A01`
    pub name: String,
    pub description: Option<String>,
    pub root: Arc<GroupDefinition>,
}

impl MessageDefinition {
    pub fn new(name: impl Into<String>, children: Vec<ChildDefinition>) -> Self {
        let name = name.into();
        Self {
            root: Arc::new(GroupDefinition::new(name.clone(), children)),
            name,
            description: None,
        }
    }
}
