//! Rule bindings

use std::fmt;
use std::sync::Arc;

/// Matches any version or scope
pub const WILDCARD: &str = "*";

/// A rule scoped to a version and an item type
///
/// The scope is a data type name for primitive rules, `TYPE^EVENT` for
/// message rules and an encoding name for encoding rules. Either part may be
/// the [`WILDCARD`].
pub struct RuleBinding<R: ?Sized> {
    version: String,
    scope: String,
    rule: Arc<R>,
    active: bool,
}

impl<R: ?Sized> RuleBinding<R> {
    /// Creates an active binding
    pub fn new(version: impl Into<String>, scope: impl Into<String>, rule: Arc<R>) -> Self {
        Self {
            version: version.into(),
            scope: scope.into(),
            rule,
            active: true,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn rule(&self) -> &Arc<R> {
        &self.rule
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Returns true when both version and scope match, exactly or by wildcard
    pub fn applies_to(&self, version: &str, scope: &str) -> bool {
        matches(&self.version, version) && matches(&self.scope, scope)
    }
}

impl<R: ?Sized> Clone for RuleBinding<R> {
    fn clone(&self) -> Self {
        Self {
            version: self.version.clone(),
            scope: self.scope.clone(),
            rule: self.rule.clone(),
            active: self.active,
        }
    }
}

impl<R: ?Sized + fmt::Debug> fmt::Debug for RuleBinding<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleBinding")
            .field("version", &self.version)
            .field("scope", &self.scope)
            .field("rule", &self.rule)
            .field("active", &self.active)
            .finish()
    }
}

fn matches(bound: &str, query: &str) -> bool {
    bound == WILDCARD || bound == query
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(version: &str, scope: &str) -> RuleBinding<str> {
        RuleBinding::new(version, scope, Arc::from("rule"))
    }

    #[test]
    fn test_wildcards_match_everything() {
        let b = binding("*", "*");
        assert!(b.applies_to("2.4", "ST"));
        assert!(b.applies_to("2.5.1", "ADT^A01"));
    }

    #[test]
    fn test_exact_match_only() {
        let b = binding("2.4", "ST");
        assert!(b.applies_to("2.4", "ST"));
        assert!(!b.applies_to("2.5", "ST"));
        assert!(!b.applies_to("2.4", "TX"));
    }

    #[test]
    fn test_mixed_wildcard() {
        let b = binding("2.4", "*");
        assert!(b.applies_to("2.4", "NM"));
        assert!(!b.applies_to("2.3", "NM"));
    }

    #[test]
    fn test_toggle_active() {
        let mut b = binding("*", "*");
        assert!(b.is_active());
        b.set_active(false);
        assert!(!b.is_active());
        assert_eq!(&**b.rule(), "rule");
    }
}
