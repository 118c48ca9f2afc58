//! Field values
//!
//! A field repetition is a [`Type`]: a primitive string, a composite of
//! components, or a `varies` value whose shape is decided by the content.
//! Content beyond what a data type defines is never discarded; it is kept as
//! extra components (`varies` values) and written back out on encode.
//!
//! Values are addressed HL7-style by 1-based component and subcomponent
//! numbers. For a primitive field, component 1 is the field itself.

use super::definition::{DatatypeDefinition, DatatypeKind, VARIES};
use crate::domain::errors::{ErrorCode, Hl7Error};
use serde_json::Value as JsonValue;

/// A data type instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Primitive(Primitive),
    Composite(Composite),
    Varies(Varies),
}

/// A single string value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primitive {
    datatype: String,
    value: Option<String>,
    extra: Vec<Type>,
}

/// An ordered list of components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composite {
    datatype: String,
    components: Vec<Type>,
    extra: Vec<Type>,
}

/// A value whose type is only known once content arrives
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Varies {
    data: Option<Box<Type>>,
}

impl Type {
    /// Creates an empty instance of a data type
    pub fn new(definition: &DatatypeDefinition) -> Self {
        match &definition.kind {
            DatatypeKind::Primitive => Type::Primitive(Primitive::new(&definition.name)),
            DatatypeKind::Composite(components) => Type::Composite(Composite {
                datatype: definition.name.clone(),
                components: components.iter().map(|c| Type::new(c)).collect(),
                extra: Vec::new(),
            }),
            DatatypeKind::Varies => Type::Varies(Varies::default()),
        }
    }

    /// Name of the data type
    pub fn datatype(&self) -> &str {
        match self {
            Type::Primitive(p) => &p.datatype,
            Type::Composite(c) => &c.datatype,
            Type::Varies(_) => VARIES,
        }
    }

    /// Returns true when no value is held anywhere in this instance
    pub fn is_empty(&self) -> bool {
        match self {
            Type::Primitive(p) => p.value.is_none() && p.extra.iter().all(Type::is_empty),
            Type::Composite(c) => {
                c.components.iter().all(Type::is_empty) && c.extra.iter().all(Type::is_empty)
            }
            Type::Varies(v) => v.data.as_deref().map_or(true, Type::is_empty),
        }
    }

    /// Extra components beyond the data type definition
    pub fn extra(&self) -> &[Type] {
        match self {
            Type::Primitive(p) => &p.extra,
            Type::Composite(c) => &c.extra,
            Type::Varies(v) => match v.data.as_deref() {
                Some(data) => data.extra(),
                None => &[],
            },
        }
    }

    /// Child at `index` (1-based) on the level directly below this value
    pub fn component(&self, index: usize) -> Option<&Type> {
        match self {
            Type::Primitive(p) => match index {
                0 => None,
                1 => Some(self),
                n => p.extra.get(n - 2),
            },
            Type::Composite(c) => {
                let n = c.components.len();
                match index {
                    0 => None,
                    i if i <= n => c.components.get(i - 1),
                    i => c.extra.get(i - n - 1),
                }
            }
            Type::Varies(v) => v.data.as_deref().and_then(|d| d.component(index)),
        }
    }

    /// Mutable child at `index`, creating extra components as needed
    ///
    /// A `varies` value asked for anything beyond its first child turns into
    /// a generic composite.
    ///
    /// # Errors
    ///
    /// Returns a DATA_TYPE_ERROR for index 0.
    pub fn component_mut(&mut self, index: usize) -> Result<&mut Type, Hl7Error> {
        if index == 0 {
            return Err(invalid_index("component", index));
        }
        if index == 1 && matches!(self, Type::Primitive(_)) {
            return Ok(self);
        }
        match self {
            Type::Primitive(p) => Ok(grow(&mut p.extra, index - 2)),
            Type::Composite(c) => {
                let n = c.components.len();
                if index <= n {
                    Ok(&mut c.components[index - 1])
                } else {
                    Ok(grow(&mut c.extra, index - n - 1))
                }
            }
            Type::Varies(v) => {
                if index == 1 && !v.is_structured() {
                    return Ok(v.data_mut());
                }
                v.structure();
                v.data_mut().component_mut(index)
            }
        }
    }

    /// First primitive reachable through first components
    pub fn first_primitive(&self) -> Option<&Primitive> {
        match self {
            Type::Primitive(p) => Some(p),
            Type::Composite(c) => c
                .components
                .first()
                .or_else(|| c.extra.first())
                .and_then(Type::first_primitive),
            Type::Varies(v) => v.data.as_deref().and_then(Type::first_primitive),
        }
    }

    /// First primitive, created when the path to it does not exist yet
    pub fn first_primitive_mut(&mut self) -> &mut Primitive {
        match self {
            Type::Primitive(p) => p,
            Type::Composite(c) => match c.components.first_mut() {
                Some(first) => first.first_primitive_mut(),
                None => grow(&mut c.extra, 0).first_primitive_mut(),
            },
            Type::Varies(v) => v.data_mut().first_primitive_mut(),
        }
    }

    /// Reads the value at `component`/`subcomponent` (both 1-based)
    ///
    /// # Errors
    ///
    /// Returns a DATA_TYPE_ERROR for index 0.
    pub fn value(&self, component: usize, subcomponent: usize) -> Result<Option<&str>, Hl7Error> {
        check_position(component, subcomponent)?;
        if component == 1 && self.is_primitive_like() {
            if subcomponent > 1 {
                return Ok(None);
            }
            return Ok(self.first_primitive().and_then(Primitive::value));
        }
        let value = self
            .component(component)
            .and_then(|c| c.component(subcomponent))
            .and_then(Type::first_primitive)
            .and_then(Primitive::value);
        Ok(value)
    }

    /// Mutable primitive at `component`/`subcomponent` (both 1-based)
    ///
    /// # Errors
    ///
    /// Returns a DATA_TYPE_ERROR for index 0, or when a subcomponent is
    /// requested from a primitive field.
    pub fn leaf_mut(&mut self, component: usize, subcomponent: usize) -> Result<&mut Primitive, Hl7Error> {
        check_position(component, subcomponent)?;
        if component == 1 && matches!(self, Type::Primitive(_)) {
            if subcomponent > 1 {
                return Err(Hl7Error::new(
                    format!(
                        "Primitive type {} has no subcomponent {}",
                        self.datatype(),
                        subcomponent
                    ),
                    ErrorCode::DataTypeError,
                ));
            }
            return Ok(self.first_primitive_mut());
        }
        if let Type::Varies(v) = self {
            if (component, subcomponent) != (1, 1) {
                v.structure();
            }
        }
        let comp = self.component_mut(component)?;
        let sub = comp.component_mut(subcomponent)?;
        Ok(sub.first_primitive_mut())
    }

    /// JSON view of this value
    pub fn to_json(&self) -> JsonValue {
        match self {
            Type::Primitive(p) if p.extra.is_empty() => match &p.value {
                Some(v) => JsonValue::String(v.clone()),
                None => JsonValue::Null,
            },
            Type::Primitive(p) => {
                let mut items = vec![p.value.clone().map_or(JsonValue::Null, JsonValue::String)];
                items.extend(p.extra.iter().map(Type::to_json));
                JsonValue::Array(trim_nulls(items))
            }
            Type::Composite(c) => {
                let items = c
                    .components
                    .iter()
                    .chain(c.extra.iter())
                    .map(Type::to_json)
                    .collect();
                JsonValue::Array(trim_nulls(items))
            }
            Type::Varies(v) => v.data.as_deref().map_or(JsonValue::Null, Type::to_json),
        }
    }

    fn is_primitive_like(&self) -> bool {
        match self {
            Type::Primitive(_) => true,
            Type::Composite(_) => false,
            Type::Varies(v) => !v.is_structured(),
        }
    }
}

impl Primitive {
    pub fn new(datatype: impl Into<String>) -> Self {
        Self {
            datatype: datatype.into(),
            value: None,
            extra: Vec::new(),
        }
    }

    /// Primitive created for `varies` content
    pub fn generic() -> Self {
        Self::new(VARIES)
    }

    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }

    pub fn clear(&mut self) {
        self.value = None;
    }

    pub fn extra(&self) -> &[Type] {
        &self.extra
    }

    pub fn extra_mut(&mut self) -> &mut Vec<Type> {
        &mut self.extra
    }
}

impl Composite {
    /// Composite created for `varies` content; every component is an extra
    pub fn generic() -> Self {
        Self {
            datatype: VARIES.to_string(),
            components: Vec::new(),
            extra: Vec::new(),
        }
    }

    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    pub fn components(&self) -> &[Type] {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut [Type] {
        &mut self.components
    }

    pub fn extra(&self) -> &[Type] {
        &self.extra
    }

    pub fn extra_mut(&mut self) -> &mut Vec<Type> {
        &mut self.extra
    }
}

impl Varies {
    pub fn data(&self) -> Option<&Type> {
        self.data.as_deref()
    }

    pub fn set_data(&mut self, data: Type) {
        self.data = Some(Box::new(data));
    }

    /// Returns true when the content has been given components
    pub fn is_structured(&self) -> bool {
        matches!(self.data.as_deref(), Some(Type::Composite(_)))
    }

    /// Held value, created as a generic primitive when absent
    pub fn data_mut(&mut self) -> &mut Type {
        self.data
            .get_or_insert_with(|| Box::new(Type::Primitive(Primitive::generic())))
    }

    /// Turns the content into a generic composite
    ///
    /// A primitive already held becomes the first component.
    pub fn structure(&mut self) {
        let mut composite = Composite::generic();
        match self.data.take().map(|d| *d) {
            Some(Type::Composite(existing)) => composite = existing,
            Some(other) if !other.is_empty() => {
                let mut first = Varies::default();
                first.set_data(other);
                composite.extra.push(Type::Varies(first));
            }
            _ => {}
        }
        self.data = Some(Box::new(Type::Composite(composite)));
    }
}

fn grow(items: &mut Vec<Type>, index: usize) -> &mut Type {
    while items.len() <= index {
        items.push(Type::Varies(Varies::default()));
    }
    &mut items[index]
}

fn trim_nulls(mut items: Vec<JsonValue>) -> Vec<JsonValue> {
    while matches!(items.last(), Some(JsonValue::Null)) {
        items.pop();
    }
    items
}

fn check_position(component: usize, subcomponent: usize) -> Result<(), Hl7Error> {
    if component == 0 {
        return Err(invalid_index("component", component));
    }
    if subcomponent == 0 {
        return Err(invalid_index("subcomponent", subcomponent));
    }
    Ok(())
}

fn invalid_index(kind: &str, index: usize) -> Hl7Error {
    Hl7Error::new(
        format!("Invalid {kind} index {index}, positions start at 1"),
        ErrorCode::DataTypeError,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn st() -> Arc<DatatypeDefinition> {
        Arc::new(DatatypeDefinition::primitive("ST"))
    }

    fn hd() -> DatatypeDefinition {
        DatatypeDefinition::composite("HD", vec![st(), st(), st()])
    }

    #[test]
    fn test_new_composite_has_empty_components() {
        let t = Type::new(&hd());
        match &t {
            Type::Composite(c) => assert_eq!(c.components().len(), 3),
            _ => panic!("expected composite"),
        }
        assert!(t.is_empty());
        assert_eq!(t.datatype(), "HD");
    }

    #[test]
    fn test_primitive_component_one_is_itself() {
        let mut t = Type::new(&st());
        t.leaf_mut(1, 1).unwrap().set_value("abc");
        assert_eq!(t.value(1, 1).unwrap(), Some("abc"));
        assert!(t.leaf_mut(1, 2).is_err());
    }

    #[test]
    fn test_primitive_extra_components() {
        let mut t = Type::new(&st());
        t.leaf_mut(3, 1).unwrap().set_value("third");
        assert_eq!(t.extra().len(), 2);
        assert_eq!(t.value(3, 1).unwrap(), Some("third"));
        assert_eq!(t.value(2, 1).unwrap(), None);
    }

    #[test]
    fn test_composite_beyond_definition() {
        let mut t = Type::new(&hd());
        t.leaf_mut(5, 1).unwrap().set_value("x");
        assert_eq!(t.extra().len(), 2);
        assert_eq!(t.value(5, 1).unwrap(), Some("x"));
    }

    #[test]
    fn test_subcomponent_of_composite_component() {
        let cx = DatatypeDefinition::composite("CX", vec![st(), st(), st(), Arc::new(hd())]);
        let mut t = Type::new(&cx);
        t.leaf_mut(4, 2).unwrap().set_value("1.2.3");
        assert_eq!(t.value(4, 2).unwrap(), Some("1.2.3"));
        assert_eq!(t.value(4, 1).unwrap(), None);
    }

    #[test]
    fn test_varies_becomes_composite() {
        let mut t = Type::Varies(Varies::default());
        t.leaf_mut(1, 1).unwrap().set_value("first");
        t.leaf_mut(4, 2).unwrap().set_value("deep");

        assert_eq!(t.value(1, 1).unwrap(), Some("first"));
        assert_eq!(t.value(4, 2).unwrap(), Some("deep"));
        match &t {
            Type::Varies(v) => assert!(v.is_structured()),
            _ => panic!("expected varies"),
        }
    }

    #[test]
    fn test_varies_primitive_read() {
        let mut t = Type::Varies(Varies::default());
        t.leaf_mut(1, 1).unwrap().set_value("v");
        assert_eq!(t.value(1, 1).unwrap(), Some("v"));
        assert_eq!(t.value(1, 2).unwrap(), None);
        assert_eq!(t.value(2, 1).unwrap(), None);
    }

    #[test]
    fn test_zero_index_rejected() {
        let t = Type::new(&st());
        let err = t.value(0, 1).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DataTypeError);
    }

    #[test]
    fn test_to_json() {
        let mut t = Type::new(&hd());
        t.leaf_mut(1, 1).unwrap().set_value("APP");
        assert_eq!(t.to_json(), serde_json::json!(["APP"]));

        let mut p = Type::new(&st());
        p.leaf_mut(1, 1).unwrap().set_value("x");
        assert_eq!(p.to_json(), serde_json::json!("x"));
    }
}
