//! Validation context
//!
//! Holds the primitive, message and encoding rule bindings and answers which
//! rules are active for a given version and scope. Reads take a cheap
//! snapshot of the binding list; writes build a new list and swap it in, so
//! parses running on other threads never observe a half-updated list.

use super::binding::{RuleBinding, WILDCARD};
use super::defaults;
use super::rules::{EncodingRule, MessageRule, PrimitiveRule};
use crate::domain::errors::PipehatError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What to do when a hook finds rule failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    /// Log and record the failures, keep going
    #[default]
    Report,
    /// Fail the parse or encode call
    Abort,
}

/// Which matching message rules are evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRulePolicy {
    /// Every active matching binding
    #[default]
    All,
    /// Only the first active matching binding, in registration order
    FirstMatch,
}

/// Failure handling per hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    pub primitive_failures: FailureAction,
    pub message_failures: FailureAction,
    pub encoding_failures: FailureAction,
    pub message_rule_policy: MessageRulePolicy,
}

impl ValidationPolicy {
    /// Policy that aborts on every kind of failure
    pub fn strict() -> Self {
        Self {
            primitive_failures: FailureAction::Abort,
            message_failures: FailureAction::Abort,
            encoding_failures: FailureAction::Abort,
            message_rule_policy: MessageRulePolicy::All,
        }
    }
}

type Bindings<R> = RwLock<Arc<Vec<RuleBinding<R>>>>;

/// Rule bindings and failure policy
///
/// # Examples
///
/// ```
/// use pipehat::validation::ValidationContext;
///
/// let context = ValidationContext::with_default_rules().unwrap();
/// assert!(!context.primitive_rules("2.4", "NM").is_empty());
/// assert!(context.primitive_rules("2.4", "CE").is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ValidationContext {
    primitive: Bindings<dyn PrimitiveRule>,
    message: Bindings<dyn MessageRule>,
    encoding: Bindings<dyn EncodingRule>,
    policy: ValidationPolicy,
}

impl ValidationContext {
    /// Empty context; every value and message passes
    pub fn new(policy: ValidationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Context with the bundled primitive rules, the MSH required fields
    /// rule and the segment separator rule
    pub fn with_default_rules() -> Result<Self, PipehatError> {
        Self::with_rules(
            ValidationPolicy::default(),
            &[defaults::MSH_REQUIRED_FIELDS],
            &[defaults::SEGMENT_SEPARATOR],
        )
    }

    /// Context with the bundled primitive rules and the named message and
    /// encoding rules
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown rule name.
    pub fn with_rules(
        policy: ValidationPolicy,
        message_rules: &[&str],
        encoding_rules: &[&str],
    ) -> Result<Self, PipehatError> {
        let context = Self::new(policy);

        let primitive = defaults::default_primitive_rules()
            .map_err(|e| PipehatError::Configuration(format!("{e:#}")))?;
        context.update(&context.primitive, |bindings| bindings.extend(primitive));

        for name in message_rules {
            let rule = defaults::message_rule(name).ok_or_else(|| {
                PipehatError::Configuration(format!("Unknown message rule: {name}"))
            })?;
            context.add_message_rule(WILDCARD, WILDCARD, rule);
        }
        for name in encoding_rules {
            let (rule, encoding) = defaults::encoding_rule(name).ok_or_else(|| {
                PipehatError::Configuration(format!("Unknown encoding rule: {name}"))
            })?;
            context.add_encoding_rule(WILDCARD, encoding, rule);
        }

        Ok(context)
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Binds a primitive rule to `version` and data type `datatype`
    pub fn add_primitive_rule(&self, version: &str, datatype: &str, rule: Arc<dyn PrimitiveRule>) {
        let binding = RuleBinding::new(version, datatype, rule);
        self.update(&self.primitive, |bindings| bindings.push(binding));
    }

    /// Binds a message rule to `version` and `scope` (`TYPE^EVENT` or `*`)
    pub fn add_message_rule(&self, version: &str, scope: &str, rule: Arc<dyn MessageRule>) {
        let binding = RuleBinding::new(version, scope, rule);
        self.update(&self.message, |bindings| bindings.push(binding));
    }

    /// Binds an encoding rule to `version` and encoding name
    pub fn add_encoding_rule(&self, version: &str, encoding: &str, rule: Arc<dyn EncodingRule>) {
        let binding = RuleBinding::new(version, encoding, rule);
        self.update(&self.encoding, |bindings| bindings.push(binding));
    }

    /// Active primitive rules for a version and data type
    pub fn primitive_rules(&self, version: &str, datatype: &str) -> Vec<Arc<dyn PrimitiveRule>> {
        active(&self.primitive, version, datatype)
    }

    /// Active message rules for a version, message type and trigger event
    pub fn message_rules(
        &self,
        version: &str,
        message_type: &str,
        trigger_event: &str,
    ) -> Vec<Arc<dyn MessageRule>> {
        let scope = format!("{message_type}^{trigger_event}");
        active(&self.message, version, &scope)
    }

    /// Active encoding rules for a version and encoding name
    pub fn encoding_rules(&self, version: &str, encoding: &str) -> Vec<Arc<dyn EncodingRule>> {
        active(&self.encoding, version, encoding)
    }

    /// Activates or deactivates every binding whose rule has `description`
    ///
    /// Returns the number of bindings changed.
    pub fn set_active(&self, description: &str, active: bool) -> usize {
        let mut changed = 0;
        self.update(&self.primitive, |b| changed += toggle(b, description, active));
        self.update(&self.message, |b| changed += toggle(b, description, active));
        self.update(&self.encoding, |b| changed += toggle(b, description, active));
        changed
    }

    /// Number of bindings of each kind: primitive, message, encoding
    pub fn binding_counts(&self) -> (usize, usize, usize) {
        (
            self.primitive.read().len(),
            self.message.read().len(),
            self.encoding.read().len(),
        )
    }

    fn update<R: ?Sized>(
        &self,
        bindings: &Bindings<R>,
        change: impl FnOnce(&mut Vec<RuleBinding<R>>),
    ) {
        let mut guard = bindings.write();
        let mut next = guard.as_slice().to_vec();
        change(&mut next);
        *guard = Arc::new(next);
    }
}

trait Described {
    fn described_as(&self, description: &str) -> bool;
}

impl Described for dyn PrimitiveRule {
    fn described_as(&self, description: &str) -> bool {
        self.description() == description
    }
}

impl Described for dyn MessageRule {
    fn described_as(&self, description: &str) -> bool {
        self.description() == description
    }
}

impl Described for dyn EncodingRule {
    fn described_as(&self, description: &str) -> bool {
        self.description() == description
    }
}

fn toggle<R: ?Sized + Described>(
    bindings: &mut [RuleBinding<R>],
    description: &str,
    active: bool,
) -> usize {
    let mut changed = 0;
    for binding in bindings.iter_mut() {
        if binding.rule().described_as(description) && binding.is_active() != active {
            binding.set_active(active);
            changed += 1;
        }
    }
    changed
}

fn active<R: ?Sized>(bindings: &Bindings<R>, version: &str, scope: &str) -> Vec<Arc<R>> {
    let snapshot = Arc::clone(&bindings.read());
    snapshot
        .iter()
        .filter(|b| b.is_active() && b.applies_to(version, scope))
        .map(|b| b.rule().clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::rules::{MshRequiredFieldsRule, Rule, SizeRule};
    use std::thread;

    #[test]
    fn test_default_rules_by_datatype() {
        let context = ValidationContext::with_default_rules().unwrap();
        assert_eq!(context.primitive_rules("2.4", "FT").len(), 2);
        assert_eq!(context.primitive_rules("2.4", "ST").len(), 1);
        assert_eq!(context.primitive_rules("2.4", "DTM").len(), 1);
        assert!(context.primitive_rules("2.4", "CE").is_empty());
    }

    #[test]
    fn test_message_rule_scope() {
        let context = ValidationContext::new(ValidationPolicy::default());
        context.add_message_rule("2.4", "ADT^A01", Arc::new(MshRequiredFieldsRule));

        assert_eq!(context.message_rules("2.4", "ADT", "A01").len(), 1);
        assert!(context.message_rules("2.4", "ADT", "A04").is_empty());
        assert!(context.message_rules("2.5", "ADT", "A01").is_empty());
    }

    #[test]
    fn test_encoding_rules_bound_to_traditional_encoding() {
        let context = ValidationContext::with_default_rules().unwrap();
        assert_eq!(context.encoding_rules("2.5", "ER7").len(), 1);
        assert!(context.encoding_rules("2.5", "XML").is_empty());
    }

    #[test]
    fn test_set_active_hides_rule() {
        let context = ValidationContext::new(ValidationPolicy::default());
        let rule = Arc::new(SizeRule::new(10));
        let description = rule.description().to_string();
        context.add_primitive_rule("*", "ST", rule);

        assert_eq!(context.set_active(&description, false), 1);
        assert!(context.primitive_rules("2.4", "ST").is_empty());
        assert_eq!(context.set_active(&description, false), 0);

        context.set_active(&description, true);
        assert_eq!(context.primitive_rules("2.4", "ST").len(), 1);
    }

    #[test]
    fn test_unknown_rule_name_rejected() {
        let result = ValidationContext::with_rules(ValidationPolicy::default(), &["bogus"], &[]);
        assert!(matches!(result, Err(PipehatError::Configuration(_))));
    }

    #[test]
    fn test_concurrent_reads_during_writes() {
        let context = Arc::new(ValidationContext::new(ValidationPolicy::default()));

        let writer = {
            let context = context.clone();
            thread::spawn(move || {
                for max in 0..100 {
                    context.add_primitive_rule("*", "ST", Arc::new(SizeRule::new(max)));
                }
            })
        };
        let reader = {
            let context = context.clone();
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..100 {
                    let seen = context.primitive_rules("2.4", "ST").len();
                    assert!(seen >= last);
                    last = seen;
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(context.primitive_rules("2.4", "ST").len(), 100);
    }

    #[test]
    fn test_policy_deserializes() {
        let policy: ValidationPolicy = toml::from_str(
            r#"
            primitive_failures = "abort"
            message_failures = "report"
            encoding_failures = "report"
            message_rule_policy = "first_match"
            "#,
        )
        .unwrap();
        assert_eq!(policy.primitive_failures, FailureAction::Abort);
        assert_eq!(policy.message_rule_policy, MessageRulePolicy::FirstMatch);
    }
}
