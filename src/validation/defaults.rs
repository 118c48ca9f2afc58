//! Default rule set
//!
//! Primitive rules are described in TOML (embedded from
//! `resources/rules/primitive.toml`) and compiled at context creation.
//! Message and encoding rules are looked up by name so configuration can
//! choose which of them to bind.

use super::binding::{RuleBinding, WILDCARD};
use super::rules::{
    EncodingRule, MessageRule, MshRequiredFieldsRule, PrimitiveRule, RegexPrimitiveRule,
    SegmentSeparatorRule, SizeRule, TrimLeadingWhitespace,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_PRIMITIVE_RULES: &str = include_str!("../../resources/rules/primitive.toml");

/// Name of the MSH required fields message rule
pub const MSH_REQUIRED_FIELDS: &str = "msh-required-fields";

/// Name of the segment separator encoding rule
pub const SEGMENT_SEPARATOR: &str = "segment-separator";

/// Encoding the segment separator rule is bound to
pub const TRADITIONAL_ENCODING: &str = "ER7";

#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<RuleSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RuleSpec {
    TrimLeadingWhitespace {
        datatypes: Vec<String>,
        #[serde(default = "wildcard")]
        version: String,
    },
    Size {
        max: usize,
        datatypes: Vec<String>,
        #[serde(default = "wildcard")]
        version: String,
    },
    Pattern {
        pattern: String,
        description: String,
        #[serde(default)]
        section: String,
        datatypes: Vec<String>,
        #[serde(default = "wildcard")]
        version: String,
    },
}

fn wildcard() -> String {
    WILDCARD.to_string()
}

/// Compiles primitive rule bindings from TOML content
pub fn primitive_rules_from_toml(content: &str) -> Result<Vec<RuleBinding<dyn PrimitiveRule>>> {
    let file: RuleFile = toml::from_str(content).context("Failed to parse rule file TOML")?;

    let mut bindings = Vec::new();
    for spec in file.rules {
        let (rule, datatypes, version): (Arc<dyn PrimitiveRule>, Vec<String>, String) = match spec {
            RuleSpec::TrimLeadingWhitespace { datatypes, version } => {
                (Arc::new(TrimLeadingWhitespace), datatypes, version)
            }
            RuleSpec::Size {
                max,
                datatypes,
                version,
            } => (Arc::new(SizeRule::new(max)), datatypes, version),
            RuleSpec::Pattern {
                pattern,
                description,
                section,
                datatypes,
                version,
            } => {
                let rule = RegexPrimitiveRule::new(&pattern, description, section)
                    .with_context(|| format!("Invalid pattern in rule file: {pattern}"))?;
                (Arc::new(rule), datatypes, version)
            }
        };

        for datatype in datatypes {
            bindings.push(RuleBinding::new(version.clone(), datatype, rule.clone()));
        }
    }

    Ok(bindings)
}

/// The bundled primitive rule bindings
pub fn default_primitive_rules() -> Result<Vec<RuleBinding<dyn PrimitiveRule>>> {
    primitive_rules_from_toml(DEFAULT_PRIMITIVE_RULES)
        .context("Invalid bundled primitive rule set")
}

/// Message rule registered under `name`
pub fn message_rule(name: &str) -> Option<Arc<dyn MessageRule>> {
    match name {
        MSH_REQUIRED_FIELDS => Some(Arc::new(MshRequiredFieldsRule)),
        _ => None,
    }
}

/// Encoding rule registered under `name`, with the encoding it applies to
pub fn encoding_rule(name: &str) -> Option<(Arc<dyn EncodingRule>, &'static str)> {
    match name {
        SEGMENT_SEPARATOR => Some((Arc::new(SegmentSeparatorRule), TRADITIONAL_ENCODING)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::rules::accepts;
    use test_case::test_case;

    fn rules_for(datatype: &str) -> Vec<Arc<dyn PrimitiveRule>> {
        default_primitive_rules()
            .unwrap()
            .into_iter()
            .filter(|b| b.applies_to("2.5", datatype))
            .map(|b| b.rule().clone())
            .collect()
    }

    fn passes(datatype: &str, value: &str) -> bool {
        rules_for(datatype).iter().all(|r| accepts(r.as_ref(), Some(value)))
    }

    #[test_case("123", true ; "integer")]
    #[test_case("-12.5", true ; "negative decimal")]
    #[test_case("+0.0", true ; "positive zero")]
    #[test_case("12a", false ; "letters")]
    #[test_case("1.2.3", false ; "two points")]
    fn test_numeric_pattern(value: &str, expected: bool) {
        assert_eq!(passes("NM", value), expected);
    }

    #[test_case("2024", true ; "year")]
    #[test_case("202403", true ; "year month")]
    #[test_case("20240315", true ; "full date")]
    #[test_case("2024-03-15", false ; "dashes")]
    #[test_case("20241", false ; "partial month")]
    fn test_date_pattern(value: &str, expected: bool) {
        assert_eq!(passes("DT", value), expected);
    }

    #[test_case("12", true ; "hour")]
    #[test_case("1230", true ; "hour minute")]
    #[test_case("123045.1234", true ; "fractional seconds")]
    #[test_case("1230-0500", true ; "offset")]
    #[test_case("2460", false ; "bad minute")]
    fn test_time_pattern(value: &str, expected: bool) {
        assert_eq!(passes("TM", value), expected);
    }

    #[test_case("DTM", "20240315123045.1+0100", true ; "dtm full")]
    #[test_case("DTM", "2024031512", true ; "dtm hour")]
    #[test_case("TSComponentOne", "20240315", true ; "ts date")]
    #[test_case("TSComponentOne", "2024-03-15", false ; "ts dashes")]
    fn test_datetime_pattern(datatype: &str, value: &str, expected: bool) {
        assert_eq!(passes(datatype, value), expected);
    }

    #[test_case("SI", "-1" ; "negative sequence")]
    #[test_case("SI", "1.0" ; "decimal sequence")]
    fn test_sequence_id_rejects(datatype: &str, value: &str) {
        assert!(!passes(datatype, value));
    }

    #[test]
    fn test_null_values_pass_every_default_rule() {
        for binding in default_primitive_rules().unwrap() {
            for value in [None, Some(""), Some("\"\"")] {
                assert!(accepts(binding.rule().as_ref(), value), "{:?} failed", binding);
            }
        }
    }

    #[test]
    fn test_size_limits() {
        assert!(passes("ID", &"A".repeat(200)));
        assert!(!passes("IS", &"A".repeat(201)));
        assert!(passes("FT", &"x".repeat(32000)));
        assert!(!passes("FT", &"x".repeat(32001)));
    }

    #[test]
    fn test_free_text_rules_trim() {
        let rules = rules_for("ST");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].correct("  hi"), "hi");
    }

    #[test]
    fn test_named_rules() {
        assert!(message_rule(MSH_REQUIRED_FIELDS).is_some());
        assert!(message_rule("nope").is_none());
        let (_, encoding) = encoding_rule(SEGMENT_SEPARATOR).unwrap();
        assert_eq!(encoding, "ER7");
    }

    #[test]
    fn test_custom_rule_file() {
        let bindings = primitive_rules_from_toml(
            r#"
            [[rules]]
            kind = "size"
            max = 5
            datatypes = ["ST"]
            version = "2.4"
            "#,
        )
        .unwrap();
        assert_eq!(bindings.len(), 1);
        assert!(bindings[0].applies_to("2.4", "ST"));
        assert!(!bindings[0].applies_to("2.5", "ST"));
    }
}
