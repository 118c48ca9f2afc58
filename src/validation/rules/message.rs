//! Message rules

use super::{is_null_or_empty, MessageRule, Rule, Violation};
use crate::domain::errors::ErrorCode;
use crate::model::Message;

/// MSH-9, MSH-10, MSH-11 and MSH-12 must be valued
#[derive(Debug, Clone, Copy, Default)]
pub struct MshRequiredFieldsRule;

const CHECKED: [(usize, &str); 4] = [
    (9, "Message Type"),
    (10, "Message Control ID"),
    (11, "Processing ID"),
    (12, "Version ID"),
];

impl Rule for MshRequiredFieldsRule {
    fn description(&self) -> &str {
        "MSH-9, MSH-10, MSH-11 and MSH-12 must be valued"
    }

    fn section_reference(&self) -> &str {
        "Version 2.5 Section 2.15.9"
    }
}

impl MessageRule for MshRequiredFieldsRule {
    fn check(&self, message: &Message) -> Vec<Violation> {
        let Some(msh) = message.msh() else {
            return vec![Violation::new(
                ErrorCode::RequiredFieldMissing,
                "Message has no MSH segment",
            )];
        };

        CHECKED
            .iter()
            .filter(|(field, _)| is_null_or_empty(msh.value(*field, 0, 1, 1).ok().flatten()))
            .map(|(field, name)| {
                Violation::new(
                    ErrorCode::RequiredFieldMissing,
                    format!("Required field {name} is not valued"),
                )
                .at("MSH", 1, *field)
            })
            .collect()
    }
}
