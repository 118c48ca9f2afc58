//! Validation rules and the context that binds them
//!
//! # Overview
//!
//! - [`rules`] - Rule traits and the concrete primitive, message and encoding rules
//! - [`binding`] - Version and scope bindings with wildcard matching
//! - [`context`] - The [`ValidationContext`] queried by the parser
//! - [`defaults`] - The bundled rule set
//! - [`report`] - Issues collected during a parse or encode call
//!
//! The context only answers which rules apply. Running them, and deciding
//! whether a failure aborts the call, is up to the parser.

pub mod binding;
pub mod context;
pub mod defaults;
pub mod report;
pub mod rules;

pub use binding::{RuleBinding, WILDCARD};
pub use context::{FailureAction, MessageRulePolicy, ValidationContext, ValidationPolicy};
pub use report::{ValidationIssue, ValidationReport, ValidationStage};
pub use rules::{EncodingRule, MessageRule, PrimitiveRule, Rule, Violation};
