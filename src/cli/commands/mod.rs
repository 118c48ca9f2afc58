//! CLI command implementations
//!
//! This module contains all CLI command implementations and the helpers
//! they share. Commands return their process exit code:
//!
//! - 0: success
//! - 1: the message failed to parse or has validation issues
//! - 2: configuration error
//! - 5: fatal error (reading the input, writing output)

pub mod ack;
pub mod init;
pub mod parse;
pub mod sniff;
pub mod validate;

use crate::config::load_config;
use crate::core::{Hl7Context, Parser};
use crate::domain::errors::PipehatError;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

/// Configuration file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pipehat.toml";

/// Exit code for a message that failed parsing or validation
pub const EXIT_FAILED: i32 = 1;

/// Exit code for configuration errors
pub const EXIT_CONFIG: i32 = 2;

/// Builds a parser from the configuration file
///
/// Without an explicit path, `pipehat.toml` is used when it exists and the
/// bundled defaults otherwise.
pub fn build_parser(config_path: Option<&str>) -> Result<Parser, PipehatError> {
    let path = match config_path {
        Some(path) => Some(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Some(DEFAULT_CONFIG_FILE),
        None => None,
    };

    let context = match path {
        Some(path) => {
            tracing::debug!(config_path = %path, "Loading configuration");
            let config = load_config(path)?;
            Hl7Context::from_config(&config)?
        }
        None => {
            tracing::debug!("No configuration file, using bundled defaults");
            Hl7Context::with_defaults()?
        }
    };
    Ok(Parser::new(Arc::new(context)))
}

/// Reads a message file
pub fn read_message(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read message file {}", path.display()))
}

/// Builds the parser or prints the configuration error
///
/// Returns the exit code to use when the parser cannot be built.
pub fn parser_or_exit(config_path: Option<&str>) -> Result<Parser, i32> {
    build_parser(config_path).map_err(|e| {
        crate::log_error_with_context!(&e, "Failed to build parser");
        println!("❌ Configuration error");
        println!("   Error: {e}");
        EXIT_CONFIG
    })
}

/// Segments of encoded text, one per line
pub fn display_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\r', '\n']).filter(|line| !line.is_empty())
}
