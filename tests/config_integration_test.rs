//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables should be run with --test-threads=1
//! to avoid interference between tests.

use pipehat::config::{load_config, ValidationProfile};
use pipehat::core::{Hl7Context, Parser, UnexpectedSegments};
use pipehat::domain::PipehatError;
use pipehat::validation::FailureAction;
use std::fs;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("PIPEHAT_APPLICATION_LOG_LEVEL");
    std::env::remove_var("PIPEHAT_PARSER_UNEXPECTED_SEGMENTS");
    std::env::remove_var("PIPEHAT_PARSER_DEFAULT_VERSION");
    std::env::remove_var("PIPEHAT_VALIDATION_PRIMITIVE_FAILURES");
    std::env::remove_var("TEST_PACK_DIR");
}

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = config_file(
        r#"
[application]
log_level = "debug"

[parser]
unexpected_segments = "drop"
default_version = "2.4"
segment_separator = "\r\n"

[validation]
profile = "default"
primitive_failures = "abort"
message_failures = "report"
encoding_failures = "report"
message_rule_policy = "first_match"
message_rules = ["msh-required-fields"]
encoding_rules = []

[logging]
local_enabled = false
local_rotation = "hourly"
"#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.parser.unexpected_segments, UnexpectedSegments::Drop);
    assert_eq!(config.parser.default_version, "2.4");
    assert_eq!(config.parser.segment_separator, "\r\n");
    assert_eq!(config.validation.profile, ValidationProfile::Default);
    assert_eq!(config.validation.primitive_failures, FailureAction::Abort);
    assert!(config.validation.encoding_rules.is_empty());
    assert_eq!(config.logging.local_rotation, "hourly");

    let context = Hl7Context::from_config(&config).unwrap();
    assert_eq!(context.options.default_version, "2.4");
    assert_eq!(context.options.segment_separator, "\r\n");
    assert_eq!(context.validation.binding_counts().2, 0);
}

#[test]
fn test_env_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    std::env::set_var("PIPEHAT_PARSER_UNEXPECTED_SEGMENTS", "error");
    std::env::set_var("PIPEHAT_VALIDATION_PRIMITIVE_FAILURES", "abort");
    let file = config_file("[parser]\nunexpected_segments = \"drop\"\n");

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.parser.unexpected_segments, UnexpectedSegments::Error);
    assert_eq!(config.validation.primitive_failures, FailureAction::Abort);

    cleanup_env_vars();
}

#[test]
fn test_invalid_env_override() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    std::env::set_var("PIPEHAT_PARSER_UNEXPECTED_SEGMENTS", "sometimes");
    let file = config_file("");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("PIPEHAT_PARSER_UNEXPECTED_SEGMENTS"));

    cleanup_env_vars();
}

#[test]
fn test_invalid_values_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    for content in [
        "[application]\nlog_level = \"loud\"\n",
        "[parser]\nsegment_separator = \"|\"\n",
        "[validation]\nmessage_rules = [\"no-such-rule\"]\n",
        "[logging]\nlocal_rotation = \"weekly\"\n",
        "[parser]\nunexpected_segments = \"sometimes\"\n",
    ] {
        let file = config_file(content);
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, PipehatError::Configuration(_)), "{content}");
    }
}

#[test]
fn test_unsupported_default_version() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = config_file("[parser]\ndefault_version = \"9.9\"\n");
    let config = load_config(file.path()).unwrap();
    let err = Hl7Context::from_config(&config).unwrap_err();
    assert!(err.to_string().contains("default_version"));
}

#[test]
fn test_custom_version_from_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("site.toml"),
        r#"
base = "2.5"

[segments.ZPI]
description = "Site patient information"
fields = [
    { type = "ST", description = "Site Code" },
]

[messages.ADT_Z01]
description = "Site admit"
structure = [
    { segment = "MSH", required = true },
    { segment = "PID", required = true },
    { segment = "ZPI" },
]
"#,
    )
    .unwrap();
    let maps = dir.path().join("eventmap");
    fs::create_dir(&maps).unwrap();
    fs::write(maps.join("2.5-site.properties"), "ADT_Z02 ADT_Z01\n").unwrap();

    std::env::set_var("TEST_PACK_DIR", dir.path());
    let file = config_file(
        r#"
[registry]
event_map_dir = "${TEST_PACK_DIR}/eventmap"

[[registry.versions]]
package = "site.model"
version = "2.5-site"
model_pack = "${TEST_PACK_DIR}/site.toml"
"#,
    );
    let config = load_config(file.path()).unwrap();
    let parser = Parser::new(Arc::new(Hl7Context::from_config(&config).unwrap()));

    let message = parser
        .parse("MSH|^~\\&|A|B|C|D|20240101||ADT^Z02|1|P|2.5-site\rPID|1||12345\rZPI|NORTH\r")
        .unwrap();
    assert_eq!(message.structure(), "ADT_Z01");
    assert_eq!(message.get("ZPI-1").unwrap(), Some("NORTH"));

    cleanup_env_vars();
}
