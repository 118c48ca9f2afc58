//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use super::{DEFAULT_CONFIG_FILE, EXIT_CONFIG};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Pipehat configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Parse a message: pipehat --config {} parse message.hl7", self.output);
                println!("  3. Check a message: pipehat --config {} validate message.hl7", self.output);
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Pipehat Configuration File
# HL7 v2 parser, encoder and validator

[application]
log_level = "info"

[parser]
unexpected_segments = "add_inline"
default_version = "2.5"
segment_separator = "\r"

[validation]
profile = "default"
primitive_failures = "report"
message_failures = "report"
encoding_failures = "report"
message_rule_policy = "all"
message_rules = ["msh-required-fields"]
encoding_rules = ["segment-separator"]

[registry]

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and detailed comments
    fn generate_config_with_examples() -> String {
        r#"# Pipehat Configuration File
# HL7 v2 parser, encoder and validator
#
# Every section is optional. Values can reference environment variables
# with the ${VAR_NAME} syntax, and PIPEHAT_<SECTION>_<KEY> variables
# override individual settings (for example PIPEHAT_PARSER_DEFAULT_VERSION).

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level: trace | debug | info | warn | error
log_level = "info"

# ============================================================================
# Parser Settings
# ============================================================================
[parser]
# Segments the message grammar does not know (Z-segments, misplaced ones):
#   add_inline - keep them in place as nonstandard segments
#   drop       - discard them with a warning
#   error      - fail with a segment sequence error
unexpected_segments = "add_inline"

# Version stamped on acknowledgements when the input carries no usable one
default_version = "2.5"

# Segment terminator written on encode: "\r", "\n" or "\r\n"
segment_separator = "\r"

# ============================================================================
# Validation Settings
# ============================================================================
[validation]
# Starting rule set: default (bundled primitive rules) | none
profile = "default"

# What happens when rules fail: report (log and collect) | abort (fail the call)
primitive_failures = "report"
message_failures = "report"
encoding_failures = "report"

# Message rules to evaluate: all | first_match
message_rule_policy = "all"

# Named rules bound to every version and message type
message_rules = ["msh-required-fields"]
encoding_rules = ["segment-separator"]

# ============================================================================
# Registry Settings
# ============================================================================
[registry]
# Directory of <version>.properties files mapping TYPE_EVENT to a structure,
# consulted before the bundled event maps
# event_map_dir = "./eventmap"

# Additional versions backed by a model pack
# [[registry.versions]]
# package = "site"
# version = "2.5.1"
# model_pack = "./models/v251.toml"

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Write JSON logs to rotating files besides the console
local_enabled = false

# Directory for log files
local_path = "./logs"

# Log rotation: daily | hourly
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipehatConfig;
    use tempfile::TempDir;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: DEFAULT_CONFIG_FILE.to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "pipehat.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generate_minimal_config() {
        let config = InitArgs::generate_minimal_config();
        assert!(config.contains("[parser]"));
        assert!(config.contains("[validation]"));

        let parsed: PipehatConfig = toml::from_str(&config).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.parser.segment_separator, "\r");
    }

    #[test]
    fn test_generate_config_with_examples() {
        let config = InitArgs::generate_config_with_examples();
        assert!(config.contains("# Pipehat Configuration File"));
        assert!(config.contains("unexpected_segments"));

        let parsed: PipehatConfig = toml::from_str(&config).unwrap();
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("pipehat.toml");
        fs::write(&output, "# existing").unwrap();

        let args = InitArgs {
            output: output.to_string_lossy().into_owned(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().unwrap(), EXIT_CONFIG);

        let args = InitArgs { force: true, ..args };
        assert_eq!(args.execute().unwrap(), 0);
        assert!(fs::read_to_string(&output).unwrap().contains("[parser]"));
    }
}
