//! Segment instances

use super::datatype::Type;
use super::definition::{FieldDefinition, SegmentDefinition};
use crate::domain::errors::{ErrorCode, Hl7Error};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// A parsed or constructed segment
///
/// Fields are numbered from 1 and each holds zero or more repetitions.
/// Positions beyond the definition are accepted and hold `varies` values.
///
/// # Examples
///
/// ```
/// use pipehat::model::definition::SegmentDefinition;
/// use pipehat::model::Segment;
/// use std::sync::Arc;
///
/// let mut zpi = Segment::new(Arc::new(SegmentDefinition::generic("ZPI")));
/// zpi.set_value(2, 0, 1, 1, "custom").unwrap();
/// assert_eq!(zpi.value(2, 0, 1, 1).unwrap(), Some("custom"));
/// ```
#[derive(Debug, Clone)]
pub struct Segment {
    definition: Arc<SegmentDefinition>,
    fields: Vec<Vec<Type>>,
}

impl Segment {
    pub fn new(definition: Arc<SegmentDefinition>) -> Self {
        let fields = vec![Vec::new(); definition.fields.len()];
        Self { definition, fields }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &Arc<SegmentDefinition> {
        &self.definition
    }

    /// Number of field positions currently held (defined or extra)
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Definition of field `number`, falling back to a `varies` field
    pub fn field_definition(&self, number: usize) -> FieldDefinition {
        self.definition
            .field(number)
            .cloned()
            .unwrap_or_else(FieldDefinition::extra)
    }

    /// All repetitions of field `number`
    ///
    /// # Errors
    ///
    /// Returns a DATA_TYPE_ERROR for field 0.
    pub fn field(&self, number: usize) -> Result<&[Type], Hl7Error> {
        let index = field_index(number)?;
        match self.fields.get(index) {
            Some(reps) => Ok(reps),
            None => Ok(&[]),
        }
    }

    /// Number of repetitions held by field `number`
    pub fn repetition_count(&self, number: usize) -> Result<usize, Hl7Error> {
        Ok(self.field(number)?.len())
    }

    /// Repetition `rep` (0-based) of field `number`, if present
    pub fn repetition(&self, number: usize, rep: usize) -> Result<Option<&Type>, Hl7Error> {
        Ok(self.field(number)?.get(rep))
    }

    /// Repetition `rep` (0-based) of field `number`, created when missing
    ///
    /// # Errors
    ///
    /// Returns a DATA_TYPE_ERROR located at the field when `rep` exceeds the
    /// field's maximum repetitions.
    pub fn repetition_mut(&mut self, number: usize, rep: usize) -> Result<&mut Type, Hl7Error> {
        let index = field_index(number)?;
        let definition = self.field_definition(number);
        if !definition.allows_repetition(rep) {
            return Err(Hl7Error::new(
                format!(
                    "Can't create repetition #{} of field {} ({}), maximum repetitions is {}",
                    rep + 1,
                    number,
                    definition.description,
                    definition.max_repetitions
                ),
                ErrorCode::DataTypeError,
            )
            .with_segment(self.name())
            .with_field(number));
        }
        if self.fields.len() <= index {
            self.fields.resize(index + 1, Vec::new());
        }
        let reps = &mut self.fields[index];
        while reps.len() <= rep {
            reps.push(Type::new(&definition.datatype));
        }
        Ok(&mut reps[rep])
    }

    /// Reads a primitive value
    ///
    /// `field`, `component` and `subcomponent` are 1-based; `rep` is 0-based.
    pub fn value(
        &self,
        field: usize,
        rep: usize,
        component: usize,
        subcomponent: usize,
    ) -> Result<Option<&str>, Hl7Error> {
        match self.repetition(field, rep)? {
            Some(t) => t.value(component, subcomponent),
            None => Ok(None),
        }
    }

    /// Writes a primitive value, creating the path to it as needed
    pub fn set_value(
        &mut self,
        field: usize,
        rep: usize,
        component: usize,
        subcomponent: usize,
        value: &str,
    ) -> Result<(), Hl7Error> {
        let name = self.name().to_string();
        self.repetition_mut(field, rep)?
            .leaf_mut(component, subcomponent)
            .map_err(|e| e.with_segment(name).with_field(field))?
            .set_value(value);
        Ok(())
    }

    /// Removes all repetitions of field `number`
    pub fn clear_field(&mut self, number: usize) -> Result<(), Hl7Error> {
        let index = field_index(number)?;
        if let Some(reps) = self.fields.get_mut(index) {
            reps.clear();
        }
        Ok(())
    }

    /// Drops trailing empty repetitions and fields beyond the definition
    ///
    /// Keeps the instance identical to what a parse of its encoded form
    /// produces.
    pub fn normalize(&mut self) {
        for reps in &mut self.fields {
            while reps.last().is_some_and(Type::is_empty) {
                reps.pop();
            }
        }
        let defined = self.definition.fields.len();
        while self.fields.len() > defined && self.fields.last().is_some_and(Vec::is_empty) {
            self.fields.pop();
        }
    }

    /// JSON view keyed by field number; empty fields are omitted
    pub fn to_json(&self) -> JsonValue {
        let mut fields = Map::new();
        for (i, reps) in self.fields.iter().enumerate() {
            if reps.iter().all(Type::is_empty) {
                continue;
            }
            let value = match reps.as_slice() {
                [single] => single.to_json(),
                many => JsonValue::Array(many.iter().map(Type::to_json).collect()),
            };
            fields.insert((i + 1).to_string(), value);
        }
        serde_json::json!({ "segment": self.name(), "fields": fields })
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name() && self.fields == other.fields
    }
}

impl Eq for Segment {}

fn field_index(number: usize) -> Result<usize, Hl7Error> {
    number.checked_sub(1).ok_or_else(|| {
        Hl7Error::new(
            "Invalid field number 0, fields start at 1",
            ErrorCode::DataTypeError,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::definition::DatatypeDefinition;

    fn pid() -> Segment {
        let st = Arc::new(DatatypeDefinition::primitive("ST"));
        let cx = Arc::new(DatatypeDefinition::composite(
            "CX",
            vec![st.clone(), st.clone(), st.clone()],
        ));
        let mut identifiers = FieldDefinition::new("Patient Identifier List", cx);
        identifiers.max_repetitions = 0;
        identifiers.required = true;
        Segment::new(Arc::new(SegmentDefinition::new(
            "PID",
            vec![
                FieldDefinition::new("Set ID", st.clone()),
                FieldDefinition::new("Patient ID", st),
                identifiers,
            ],
        )))
    }

    #[test]
    fn test_new_segment_has_empty_fields() {
        let segment = pid();
        assert_eq!(segment.name(), "PID");
        assert_eq!(segment.field_count(), 3);
        assert_eq!(segment.repetition_count(3).unwrap(), 0);
    }

    #[test]
    fn test_set_and_read_component() {
        let mut segment = pid();
        segment.set_value(3, 0, 1, 1, "12345").unwrap();
        segment.set_value(3, 1, 1, 1, "67890").unwrap();
        assert_eq!(segment.value(3, 0, 1, 1).unwrap(), Some("12345"));
        assert_eq!(segment.value(3, 1, 1, 1).unwrap(), Some("67890"));
        assert_eq!(segment.repetition_count(3).unwrap(), 2);
    }

    #[test]
    fn test_repetition_limit_enforced() {
        let mut segment = pid();
        segment.set_value(1, 0, 1, 1, "1").unwrap();
        let err = segment.set_value(1, 1, 1, 1, "2").unwrap_err();
        assert_eq!(err.code(), ErrorCode::DataTypeError);
        assert_eq!(err.segment(), Some("PID"));
        assert_eq!(err.field(), Some(1));
    }

    #[test]
    fn test_extra_fields_are_varies() {
        let mut segment = pid();
        segment.set_value(8, 0, 2, 1, "extra").unwrap();
        assert_eq!(segment.field_count(), 8);
        assert_eq!(segment.value(8, 0, 2, 1).unwrap(), Some("extra"));
        assert_eq!(segment.field(8).unwrap()[0].datatype(), "varies");
    }

    #[test]
    fn test_field_zero_rejected() {
        let segment = pid();
        assert!(segment.field(0).is_err());
    }

    #[test]
    fn test_normalize_trims_trailing_empties() {
        let mut segment = pid();
        segment.repetition_mut(3, 2).unwrap();
        segment.repetition_mut(9, 0).unwrap();
        segment.set_value(3, 0, 1, 1, "1").unwrap();
        segment.normalize();
        assert_eq!(segment.repetition_count(3).unwrap(), 1);
        assert_eq!(segment.field_count(), 3);
    }

    #[test]
    fn test_to_json_skips_empty_fields() {
        let mut segment = pid();
        segment.set_value(3, 0, 1, 1, "12345").unwrap();
        let json = segment.to_json();
        assert_eq!(json["segment"], "PID");
        assert_eq!(json["fields"]["3"], serde_json::json!(["12345"]));
        assert!(json["fields"].get("1").is_none());
    }
}
