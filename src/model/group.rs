//! Groups: ordered, named child slots holding segments or nested groups

use super::definition::{ChildDefinition, ChildKind, GroupDefinition};
use super::segment::Segment;
use crate::domain::errors::{ErrorCode, Hl7Error};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// A child structure: a segment or a nested group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Structure {
    Segment(Segment),
    Group(Group),
}

impl Structure {
    pub fn name(&self) -> &str {
        match self {
            Structure::Segment(s) => s.name(),
            Structure::Group(g) => g.name(),
        }
    }

    pub fn as_segment(&self) -> Option<&Segment> {
        match self {
            Structure::Segment(s) => Some(s),
            Structure::Group(_) => None,
        }
    }

    pub fn as_segment_mut(&mut self) -> Option<&mut Segment> {
        match self {
            Structure::Segment(s) => Some(s),
            Structure::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Structure::Group(g) => Some(g),
            Structure::Segment(_) => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Structure::Group(g) => Some(g),
            Structure::Segment(_) => None,
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Structure::Segment(s) => s.to_json(),
            Structure::Group(g) => g.to_json(),
        }
    }
}

/// A named child slot and its repetitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    name: String,
    required: bool,
    repeating: bool,
    nonstandard: bool,
    kind: ChildKind,
    reps: Vec<Structure>,
}

impl Slot {
    fn from_definition(child: &ChildDefinition) -> Self {
        Self {
            name: child.name.clone(),
            required: child.required,
            repeating: child.repeating,
            nonstandard: false,
            kind: child.kind.clone(),
            reps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_repeating(&self) -> bool {
        self.repeating
    }

    /// True for slots added at parse time for segments the grammar lacks
    pub fn is_nonstandard(&self) -> bool {
        self.nonstandard
    }

    pub fn repetitions(&self) -> &[Structure] {
        &self.reps
    }

    fn instantiate(&self) -> Structure {
        match &self.kind {
            ChildKind::Segment(definition) => Structure::Segment(Segment::new(definition.clone())),
            ChildKind::Group(definition) => Structure::Group(Group::new(definition.clone())),
        }
    }
}

/// A group of child structures
///
/// The message root is itself a group named after the message structure.
#[derive(Debug, Clone)]
pub struct Group {
    definition: Arc<GroupDefinition>,
    slots: Vec<Slot>,
}

impl Group {
    pub fn new(definition: Arc<GroupDefinition>) -> Self {
        let slots = definition.children.iter().map(Slot::from_definition).collect();
        Self { definition, slots }
    }

    /// Full group name (`ADT_A01_PROCEDURE`, or the structure name for a root)
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &Arc<GroupDefinition> {
        &self.definition
    }

    /// Child slot names in order, including nonstandard slots
    pub fn names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn is_required(&self, name: &str) -> Result<bool, Hl7Error> {
        Ok(self.slot(name)?.required)
    }

    pub fn is_repeating(&self, name: &str) -> Result<bool, Hl7Error> {
        Ok(self.slot(name)?.repeating)
    }

    /// Repetition `rep` (0-based) of child `name`, if present
    ///
    /// # Errors
    ///
    /// Returns an APPLICATION_INTERNAL_ERROR when `name` is not a child of
    /// this group.
    pub fn get(&self, name: &str, rep: usize) -> Result<Option<&Structure>, Hl7Error> {
        Ok(self.slot(name)?.reps.get(rep))
    }

    /// All repetitions of child `name`
    pub fn get_all(&self, name: &str) -> Result<&[Structure], Hl7Error> {
        Ok(&self.slot(name)?.reps)
    }

    /// Repetition `rep` of child `name`, created when missing
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is unknown, or when `rep` is above 0 for
    /// a non-repeating child.
    pub fn get_or_create(&mut self, name: &str, rep: usize) -> Result<&mut Structure, Hl7Error> {
        let group = self.name().to_string();
        let slot = self.slot_mut(name)?;
        if rep > 0 && !slot.repeating {
            return Err(Hl7Error::new(
                format!("Can't create repetition #{} of non-repeating {} in {}", rep + 1, name, group),
                ErrorCode::ApplicationInternalError,
            ));
        }
        while slot.reps.len() <= rep {
            let created = slot.instantiate();
            slot.reps.push(created);
        }
        Ok(&mut slot.reps[rep])
    }

    /// Convenience accessor for a segment child, created when missing
    pub fn segment_mut(&mut self, name: &str) -> Result<&mut Segment, Hl7Error> {
        let group = self.name().to_string();
        self.get_or_create(name, 0)?
            .as_segment_mut()
            .ok_or_else(|| {
                Hl7Error::new(
                    format!("{name} is a group, not a segment, in {group}"),
                    ErrorCode::ApplicationInternalError,
                )
            })
    }

    /// Appends a parsed repetition to the slot at `index`
    pub(crate) fn push_at(&mut self, index: usize, structure: Structure) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.reps.push(structure);
        }
    }

    /// Places a segment the grammar does not expect at slot position `index`
    ///
    /// Consecutive segments with the same name share one repeating slot.
    /// Otherwise a new slot is inserted, named after the segment with a
    /// numeric suffix when that name is already taken. Returns true when a
    /// new slot was inserted.
    pub fn insert_nonstandard(&mut self, index: usize, segment: Segment) -> bool {
        let index = index.min(self.slots.len());
        if let Some(previous) = index.checked_sub(1).and_then(|i| self.slots.get_mut(i)) {
            let same = previous.nonstandard
                && previous
                    .reps
                    .first()
                    .is_some_and(|s| s.name() == segment.name());
            if same {
                previous.reps.push(Structure::Segment(segment));
                return false;
            }
        }

        let name = self.unique_name(segment.name());
        let slot = Slot {
            name,
            required: false,
            repeating: true,
            nonstandard: true,
            kind: ChildKind::Segment(segment.definition().clone()),
            reps: vec![Structure::Segment(segment)],
        };
        self.slots.insert(index, slot);
        true
    }

    /// First segment named `name`, searching depth-first
    pub fn find_segment(&self, name: &str) -> Option<&Segment> {
        self.segments().into_iter().find(|s| s.name() == name)
    }

    /// Every segment in document order
    pub fn segments(&self) -> Vec<&Segment> {
        let mut out = Vec::new();
        self.collect_segments(&mut out);
        out
    }

    /// Every segment in document order, mutably
    pub fn segments_mut(&mut self) -> Vec<&mut Segment> {
        let mut out = Vec::new();
        for slot in &mut self.slots {
            for rep in &mut slot.reps {
                match rep {
                    Structure::Segment(s) => out.push(s),
                    Structure::Group(g) => out.extend(g.segments_mut()),
                }
            }
        }
        out
    }

    /// JSON view: slot name to repetitions, empty slots omitted
    pub fn to_json(&self) -> JsonValue {
        let mut children = serde_json::Map::new();
        for slot in &self.slots {
            if slot.reps.is_empty() {
                continue;
            }
            let reps: Vec<JsonValue> = slot.reps.iter().map(Structure::to_json).collect();
            children.insert(slot.name.clone(), JsonValue::Array(reps));
        }
        serde_json::json!({ "group": self.name(), "children": children })
    }

    fn collect_segments<'a>(&'a self, out: &mut Vec<&'a Segment>) {
        for slot in &self.slots {
            for rep in &slot.reps {
                match rep {
                    Structure::Segment(s) => out.push(s),
                    Structure::Group(g) => g.collect_segments(out),
                }
            }
        }
    }

    fn unique_name(&self, base: &str) -> String {
        if !self.slots.iter().any(|s| s.name == base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !self.slots.iter().any(|s| &s.name == candidate))
            .unwrap_or_else(|| base.to_string())
    }

    fn slot(&self, name: &str) -> Result<&Slot, Hl7Error> {
        self.slots
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| unknown_child(name, self.name()))
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut Slot, Hl7Error> {
        let group = self.definition.name.clone();
        self.slots
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| unknown_child(name, &group))
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name() && self.slots == other.slots
    }
}

impl Eq for Group {}

fn unknown_child(name: &str, group: &str) -> Hl7Error {
    Hl7Error::new(
        format!("{name} does not exist in the group {group}"),
        ErrorCode::ApplicationInternalError,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::definition::SegmentDefinition;

    fn seg(name: &str) -> Arc<SegmentDefinition> {
        Arc::new(SegmentDefinition::generic(name))
    }

    fn adt() -> Group {
        let procedure = Arc::new(GroupDefinition::new(
            "ADT_A01_PROCEDURE",
            vec![
                ChildDefinition::segment(seg("PR1"), true, false),
                ChildDefinition::segment(seg("ROL"), false, true),
            ],
        ));
        Group::new(Arc::new(GroupDefinition::new(
            "ADT_A01",
            vec![
                ChildDefinition::segment(seg("MSH"), true, false),
                ChildDefinition::segment(seg("PID"), true, false),
                ChildDefinition::group("PROCEDURE", procedure, false, true),
            ],
        )))
    }

    #[test]
    fn test_names_and_flags() {
        let group = adt();
        assert_eq!(group.names(), vec!["MSH", "PID", "PROCEDURE"]);
        assert!(group.is_required("PID").unwrap());
        assert!(group.is_repeating("PROCEDURE").unwrap());
        assert!(!group.is_repeating("MSH").unwrap());
    }

    #[test]
    fn test_unknown_child_is_error() {
        let group = adt();
        let err = group.get("ZZZ", 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ApplicationInternalError);
        assert!(err.message().contains("ZZZ"));
    }

    #[test]
    fn test_get_or_create_group_repetitions() {
        let mut group = adt();
        group.get_or_create("PROCEDURE", 1).unwrap();
        assert_eq!(group.get_all("PROCEDURE").unwrap().len(), 2);
        let first = group.get("PROCEDURE", 0).unwrap().unwrap();
        assert_eq!(first.name(), "ADT_A01_PROCEDURE");
    }

    #[test]
    fn test_non_repeating_child_limited() {
        let mut group = adt();
        assert!(group.get_or_create("PID", 1).is_err());
    }

    #[test]
    fn test_insert_nonstandard_segments() {
        let mut group = adt();
        let zpi = Segment::new(seg("ZPI"));

        assert!(group.insert_nonstandard(2, zpi.clone()));
        assert!(!group.insert_nonstandard(3, zpi.clone()));
        assert!(group.insert_nonstandard(0, zpi));

        assert_eq!(group.names(), vec!["ZPI2", "MSH", "PID", "ZPI", "PROCEDURE"]);
        assert_eq!(group.get_all("ZPI").unwrap().len(), 2);
        assert!(group.slots()[0].is_nonstandard());
    }

    #[test]
    fn test_segments_in_document_order() {
        let mut group = adt();
        group.segment_mut("MSH").unwrap();
        group.segment_mut("PID").unwrap();
        group
            .get_or_create("PROCEDURE", 0)
            .unwrap()
            .as_group_mut()
            .unwrap()
            .segment_mut("PR1")
            .unwrap();

        let names: Vec<&str> = group.segments().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["MSH", "PID", "PR1"]);
        assert!(group.find_segment("PR1").is_some());
    }
}
