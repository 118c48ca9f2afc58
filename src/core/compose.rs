//! Composing a message tree back into ER7 text
//!
//! The inverse of the decoder: every level is joined with its separator,
//! primitive values are escaped, and trailing empty pieces are dropped so
//! that a composed message parses back into an equal tree.

use super::escape::escape;
use crate::domain::encoding::EncodingCharacters;
use crate::domain::errors::{ErrorCode, Hl7Error};
use crate::model::{Message, Segment, Type};

/// Encodes `message`, terminating every segment with `separator`
///
/// # Errors
///
/// Returns a REQUIRED_FIELD_MISSING error when the message has no MSH
/// segment.
pub(crate) fn compose(message: &Message, separator: &str) -> Result<String, Hl7Error> {
    let msh = message.msh().ok_or_else(|| {
        Hl7Error::new("Can't encode a message without an MSH segment", ErrorCode::RequiredFieldMissing)
            .with_segment("MSH")
    })?;
    let enc = delimiters(message, msh);

    let mut out = String::new();
    for segment in message.segments() {
        out.push_str(&compose_segment(segment, &enc));
        out.push_str(separator);
    }
    Ok(out)
}

/// Delimiters declared in MSH-1 and MSH-2, or the message's own
fn delimiters(message: &Message, msh: &Segment) -> EncodingCharacters {
    let fallback = message.encoding_characters();
    let field = msh
        .value(1, 0, 1, 1)
        .ok()
        .flatten()
        .and_then(|v| v.chars().next())
        .unwrap_or(fallback.field_separator());
    match msh.value(2, 0, 1, 1).ok().flatten() {
        Some(declared) => EncodingCharacters::parse(field, declared)
            .unwrap_or_else(|_| fallback.with_field(field)),
        None => fallback.with_field(field),
    }
}

/// Encodes one segment without its terminator
pub(crate) fn compose_segment(segment: &Segment, enc: &EncodingCharacters) -> String {
    let separator = enc.field_separator();
    let is_header = segment.name() == "MSH";
    let first = if is_header { 3 } else { 1 };

    let fields: Vec<String> = (first..=segment.field_count())
        .map(|number| compose_field(segment, number, enc))
        .collect();
    let fields = join_trimmed(fields, separator);

    let mut out = String::from(segment.name());
    if is_header {
        out.push(separator);
        match segment.value(2, 0, 1, 1).ok().flatten() {
            Some(declared) => out.push_str(declared),
            None => out.push_str(&enc.to_string()),
        }
    }
    if !fields.is_empty() {
        out.push(separator);
        out.push_str(&fields);
    }
    out
}

fn compose_field(segment: &Segment, number: usize, enc: &EncodingCharacters) -> String {
    let reps: Vec<String> = segment
        .field(number)
        .unwrap_or_default()
        .iter()
        .map(|rep| encode_field(rep, enc))
        .collect();
    join_trimmed(reps, enc.repetition_separator())
}

/// Field level: components joined with the component separator
fn encode_field(value: &Type, enc: &EncodingCharacters) -> String {
    match value {
        Type::Primitive(p) => {
            let mut parts = vec![leaf(p.value(), enc)];
            parts.extend(p.extra().iter().map(|t| encode_component(t, enc)));
            join_trimmed(parts, enc.component_separator())
        }
        Type::Composite(c) => {
            let parts = c
                .components()
                .iter()
                .chain(c.extra())
                .map(|t| encode_component(t, enc))
                .collect();
            join_trimmed(parts, enc.component_separator())
        }
        Type::Varies(v) => v.data().map(|d| encode_field(d, enc)).unwrap_or_default(),
    }
}

/// Component level: subcomponents joined with the subcomponent separator
fn encode_component(value: &Type, enc: &EncodingCharacters) -> String {
    match value {
        Type::Primitive(p) => {
            let mut parts = vec![leaf(p.value(), enc)];
            parts.extend(p.extra().iter().map(|t| encode_subcomponent(t, enc)));
            join_trimmed(parts, enc.subcomponent_separator())
        }
        Type::Composite(c) => {
            let parts = c
                .components()
                .iter()
                .chain(c.extra())
                .map(|t| encode_subcomponent(t, enc))
                .collect();
            join_trimmed(parts, enc.subcomponent_separator())
        }
        Type::Varies(v) => v.data().map(|d| encode_component(d, enc)).unwrap_or_default(),
    }
}

/// Subcomponent level holds a single value
fn encode_subcomponent(value: &Type, enc: &EncodingCharacters) -> String {
    leaf(value.first_primitive().and_then(|p| p.value()), enc)
}

fn leaf(value: Option<&str>, enc: &EncodingCharacters) -> String {
    value.map(|v| escape(v, enc).into_owned()).unwrap_or_default()
}

fn join_trimmed(mut parts: Vec<String>, separator: char) -> String {
    while parts.last().is_some_and(String::is_empty) {
        parts.pop();
    }
    parts.join(&separator.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::definition::SegmentDefinition;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn generic(name: &str) -> Segment {
        Segment::new(Arc::new(SegmentDefinition::generic(name)))
    }

    #[test]
    fn test_join_trimmed() {
        let parts = vec!["a".to_string(), String::new(), "b".to_string(), String::new()];
        assert_eq!(join_trimmed(parts, '^'), "a^^b");
        assert_eq!(join_trimmed(vec![String::new()], '^'), "");
    }

    #[test]
    fn test_compose_generic_segment() {
        let mut zpi = generic("ZPI");
        zpi.set_value(1, 0, 1, 1, "one").unwrap();
        zpi.set_value(3, 1, 2, 1, "rep").unwrap();
        zpi.set_value(4, 0, 1, 2, "sub").unwrap();
        let enc = EncodingCharacters::default();
        assert_eq!(compose_segment(&zpi, &enc), "ZPI|one||~^rep|&sub");
    }

    #[test]
    fn test_compose_escapes_delimiters() {
        let mut zpi = generic("ZPI");
        zpi.set_value(1, 0, 1, 1, "A|B^C").unwrap();
        let enc = EncodingCharacters::default();
        assert_eq!(compose_segment(&zpi, &enc), "ZPI|A\\F\\B\\S\\C");
    }

    #[test]
    fn test_compose_empty_segment() {
        let zpi = generic("ZPI");
        assert_eq!(compose_segment(&zpi, &EncodingCharacters::default()), "ZPI");
    }
}
