//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::PipehatConfig;
use crate::domain::errors::PipehatError;
use crate::domain::result::Result;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into PipehatConfig
/// 4. Applies environment variable overrides (PIPEHAT_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read, a referenced
/// environment variable is not set, the TOML is invalid or validation fails.
///
/// # Examples
///
/// ```no_run
/// use pipehat::config::loader::load_config;
///
/// let config = load_config("pipehat.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PipehatConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PipehatError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        PipehatError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_str(&contents)
}

/// Loads configuration from TOML text; see [`load_config`]
pub fn load_config_str(contents: &str) -> Result<PipehatConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: PipehatConfig = toml::from_str(&contents)
        .map_err(|e| PipehatError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        PipehatError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied unchanged.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| PipehatError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(PipehatError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Applies environment variable overrides using PIPEHAT_* prefix
///
/// Environment variables follow the pattern: PIPEHAT_<SECTION>_<KEY>
/// For example: PIPEHAT_PARSER_DEFAULT_VERSION, PIPEHAT_VALIDATION_PROFILE
fn apply_env_overrides(config: &mut PipehatConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("PIPEHAT_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Parser overrides
    if let Ok(val) = std::env::var("PIPEHAT_PARSER_UNEXPECTED_SEGMENTS") {
        config.parser.unexpected_segments =
            parse_choice("PIPEHAT_PARSER_UNEXPECTED_SEGMENTS", val)?;
    }
    if let Ok(val) = std::env::var("PIPEHAT_PARSER_DEFAULT_VERSION") {
        config.parser.default_version = val;
    }

    // Validation overrides
    if let Ok(val) = std::env::var("PIPEHAT_VALIDATION_PROFILE") {
        config.validation.profile = parse_choice("PIPEHAT_VALIDATION_PROFILE", val)?;
    }
    if let Ok(val) = std::env::var("PIPEHAT_VALIDATION_PRIMITIVE_FAILURES") {
        config.validation.primitive_failures =
            parse_choice("PIPEHAT_VALIDATION_PRIMITIVE_FAILURES", val)?;
    }
    if let Ok(val) = std::env::var("PIPEHAT_VALIDATION_MESSAGE_FAILURES") {
        config.validation.message_failures =
            parse_choice("PIPEHAT_VALIDATION_MESSAGE_FAILURES", val)?;
    }
    if let Ok(val) = std::env::var("PIPEHAT_VALIDATION_ENCODING_FAILURES") {
        config.validation.encoding_failures =
            parse_choice("PIPEHAT_VALIDATION_ENCODING_FAILURES", val)?;
    }
    if let Ok(val) = std::env::var("PIPEHAT_VALIDATION_MESSAGE_RULE_POLICY") {
        config.validation.message_rule_policy =
            parse_choice("PIPEHAT_VALIDATION_MESSAGE_RULE_POLICY", val)?;
    }

    // Registry overrides
    if let Ok(val) = std::env::var("PIPEHAT_REGISTRY_EVENT_MAP_DIR") {
        config.registry.event_map_dir = Some(val.into());
    }

    // Logging overrides
    if let Ok(val) = std::env::var("PIPEHAT_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("PIPEHAT_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("PIPEHAT_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}

/// Parses an enum-valued override the same way the TOML file spells it
fn parse_choice<T: DeserializeOwned>(var: &str, value: String) -> Result<T> {
    toml::Value::String(value.clone())
        .try_into()
        .map_err(|_| PipehatError::Configuration(format!("Invalid value '{value}' for {var}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ValidationProfile;
    use crate::core::context::UnexpectedSegments;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("PIPEHAT_TEST_PACK_DIR", "/opt/packs");
        let input = "model_pack = \"${PIPEHAT_TEST_PACK_DIR}/v26.toml\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "model_pack = \"/opt/packs/v26.toml\"");
        std::env::remove_var("PIPEHAT_TEST_PACK_DIR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("PIPEHAT_TEST_MISSING_VAR");
        let input = "path = \"${PIPEHAT_TEST_MISSING_VAR}\"";
        let result = substitute_env_vars(input);
        assert!(matches!(result, Err(PipehatError::Configuration(_))));
    }

    #[test]
    fn test_substitute_skips_comments() {
        std::env::remove_var("PIPEHAT_TEST_COMMENTED");
        let input = "# path = \"${PIPEHAT_TEST_COMMENTED}\"\nlog_level = \"info\"";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_parse_choice() {
        let segments: UnexpectedSegments = parse_choice("X", "drop".to_string()).unwrap();
        assert_eq!(segments, UnexpectedSegments::Drop);
        let profile: ValidationProfile = parse_choice("X", "none".to_string()).unwrap();
        assert_eq!(profile, ValidationProfile::None);
        assert!(parse_choice::<UnexpectedSegments>("X", "sometimes".to_string()).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-pipehat.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[parser]
unexpected_segments = "error"
default_version = "2.4"

[validation]
profile = "default"
message_failures = "abort"

[[registry.versions]]
package = "acme.v26"
version = "2.6"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.parser.unexpected_segments, UnexpectedSegments::Error);
        assert_eq!(config.parser.default_version, "2.4");
        assert_eq!(config.registry.versions.len(), 1);
        assert_eq!(config.registry.versions[0].package, "acme.v26");
    }

    #[test]
    fn test_load_config_invalid_values() {
        let result = load_config_str("[logging]\nlocal_rotation = \"weekly\"\n");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("local_rotation"));
    }
}
