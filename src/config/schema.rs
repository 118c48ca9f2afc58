//! Configuration schema types
//!
//! This module defines the configuration structure for Pipehat. Every section
//! is optional; an empty file yields the bundled defaults.

use crate::core::context::UnexpectedSegments;
use crate::validation::defaults;
use crate::validation::{FailureAction, MessageRulePolicy, ValidationPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Which rule set a context starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationProfile {
    /// Bundled primitive rules plus the configured message and encoding rules
    #[default]
    Default,
    /// No rules at all
    None,
}

/// Main Pipehat configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipehatConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Parser behaviour
    #[serde(default)]
    pub parser: ParserConfig,

    /// Validation rules and failure handling
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Additional versions and structure resources
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PipehatConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.parser.validate()?;
        self.validation.validate()?;
        self.registry.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// What happens to segments the message grammar does not know
    #[serde(default)]
    pub unexpected_segments: UnexpectedSegments,

    /// Version used for generated acknowledgements when the input has none
    #[serde(default = "default_version")]
    pub default_version: String,

    /// Segment terminator written on encode
    #[serde(default = "default_segment_separator")]
    pub segment_separator: String,
}

impl ParserConfig {
    fn validate(&self) -> Result<(), String> {
        if self.default_version.trim().is_empty() {
            return Err("parser.default_version cannot be empty".to_string());
        }

        let valid_separators = ["\r", "\n", "\r\n"];
        if !valid_separators.contains(&self.segment_separator.as_str()) {
            return Err(format!(
                "Invalid parser.segment_separator {:?}. Must be one of: \"\\r\", \"\\n\", \"\\r\\n\"",
                self.segment_separator
            ));
        }
        Ok(())
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            unexpected_segments: UnexpectedSegments::default(),
            default_version: default_version(),
            segment_separator: default_segment_separator(),
        }
    }
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Starting rule set
    #[serde(default)]
    pub profile: ValidationProfile,

    /// Failure action for primitive value rules
    #[serde(default)]
    pub primitive_failures: FailureAction,

    /// Failure action for whole-message rules
    #[serde(default)]
    pub message_failures: FailureAction,

    /// Failure action for encoding rules
    #[serde(default)]
    pub encoding_failures: FailureAction,

    /// Whether every matching message rule runs, or only the first
    #[serde(default)]
    pub message_rule_policy: MessageRulePolicy,

    /// Named message rules bound to every version and message type
    #[serde(default = "default_message_rules")]
    pub message_rules: Vec<String>,

    /// Named encoding rules
    #[serde(default = "default_encoding_rules")]
    pub encoding_rules: Vec<String>,
}

impl ValidationConfig {
    /// Failure handling assembled from this section
    pub fn policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            primitive_failures: self.primitive_failures,
            message_failures: self.message_failures,
            encoding_failures: self.encoding_failures,
            message_rule_policy: self.message_rule_policy,
        }
    }

    fn validate(&self) -> Result<(), String> {
        for name in &self.message_rules {
            if defaults::message_rule(name).is_none() {
                return Err(format!("Unknown validation.message_rules entry '{name}'"));
            }
        }
        for name in &self.encoding_rules {
            if defaults::encoding_rule(name).is_none() {
                return Err(format!("Unknown validation.encoding_rules entry '{name}'"));
            }
        }
        Ok(())
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            profile: ValidationProfile::default(),
            primitive_failures: FailureAction::default(),
            message_failures: FailureAction::default(),
            encoding_failures: FailureAction::default(),
            message_rule_policy: MessageRulePolicy::default(),
            message_rules: default_message_rules(),
            encoding_rules: default_encoding_rules(),
        }
    }
}

/// Structure registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory of `<version>.properties` event maps, read before the bundled maps
    #[serde(default)]
    pub event_map_dir: Option<PathBuf>,

    /// Additional versions, consulted before the built-in ones
    #[serde(default)]
    pub versions: Vec<VersionConfig>,
}

impl RegistryConfig {
    fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for entry in &self.versions {
            if entry.version.trim().is_empty() {
                return Err("registry.versions entries need a version".to_string());
            }
            if entry.package.trim().is_empty() {
                return Err(format!(
                    "registry.versions entry for {} needs a package",
                    entry.version
                ));
            }
            if !seen.insert(entry.version.trim().to_lowercase()) {
                return Err(format!(
                    "Version {} is listed more than once in registry.versions",
                    entry.version
                ));
            }
        }
        Ok(())
    }
}

/// An additional version and where its definitions come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConfig {
    /// Package identifier
    pub package: String,

    /// Version string as it appears in MSH-12
    pub version: String,

    /// Model definition pack (TOML); without one the version has no structures
    #[serde(default)]
    pub model_pack: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write JSON logs to rotating files
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Rotation period (daily, hourly)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local_enabled = true".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_version() -> String {
    "2.5".to_string()
}

fn default_segment_separator() -> String {
    "\r".to_string()
}

fn default_message_rules() -> Vec<String> {
    vec![defaults::MSH_REQUIRED_FIELDS.to_string()]
}

fn default_encoding_rules() -> Vec<String> {
    vec![defaults::SEGMENT_SEPARATOR.to_string()]
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: PipehatConfig = toml::from_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.application.log_level, "info");
        assert_eq!(config.parser.default_version, "2.5");
        assert_eq!(config.parser.segment_separator, "\r");
        assert_eq!(config.parser.unexpected_segments, UnexpectedSegments::AddInline);
        assert_eq!(config.validation.profile, ValidationProfile::Default);
        assert_eq!(config.validation.message_rules, vec!["msh-required-fields"]);
        assert!(!config.logging.local_enabled);
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parser_config_validation() {
        let mut config = ParserConfig::default();
        config.segment_separator = "\n".to_string();
        assert!(config.validate().is_ok());

        config.segment_separator = "|".to_string();
        assert!(config.validate().is_err());

        config.segment_separator = "\r".to_string();
        config.default_version = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_config_rejects_unknown_rule() {
        let mut config = ValidationConfig::default();
        assert!(config.validate().is_ok());

        config.encoding_rules.push("no-such-rule".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.contains("no-such-rule"));
    }

    #[test]
    fn test_validation_policy_from_section() {
        let config: ValidationConfig = toml::from_str(
            r#"
            primitive_failures = "abort"
            message_rule_policy = "first_match"
            "#,
        )
        .unwrap();
        let policy = config.policy();
        assert_eq!(policy.primitive_failures, FailureAction::Abort);
        assert_eq!(policy.message_failures, FailureAction::Report);
        assert_eq!(policy.message_rule_policy, MessageRulePolicy::FirstMatch);
    }

    #[test]
    fn test_registry_config_duplicate_version() {
        let config: RegistryConfig = toml::from_str(
            r#"
            [[versions]]
            package = "acme.v26"
            version = "2.6"

            [[versions]]
            package = "other.v26"
            version = " 2.6 "
            "#,
        )
        .unwrap();
        assert!(config.validate().unwrap_err().contains("more than once"));
    }

    #[test]
    fn test_registry_config_needs_package() {
        let config = RegistryConfig {
            event_map_dir: None,
            versions: vec![VersionConfig {
                package: String::new(),
                version: "2.6".to_string(),
                model_pack: None,
            }],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_config_validation() {
        let mut config = LoggingConfig::default();
        assert!(config.validate().is_ok());

        config.local_rotation = "size".to_string();
        assert!(config.validate().is_err());

        config.local_rotation = "hourly".to_string();
        config.local_enabled = true;
        config.local_path = String::new();
        assert!(config.validate().is_err());
    }
}
