//! Parse command implementation
//!
//! This module implements the `parse` command, which parses a message file
//! and prints a summary, selected values or the whole tree as JSON.

use super::{parser_or_exit, read_message, EXIT_FAILED};
use crate::model::Message;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the parse command
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Message file to parse
    pub file: PathBuf,

    /// Print the message tree as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the value at a location such as PID-3(1)-1; repeatable
    #[arg(long = "get", value_name = "PATH")]
    pub get: Vec<String>,
}

impl ParseArgs {
    /// Execute the parse command
    pub fn execute(&self, config_path: Option<&str>) -> anyhow::Result<i32> {
        tracing::info!(file = %self.file.display(), "Parsing message");

        let parser = match parser_or_exit(config_path) {
            Ok(parser) => parser,
            Err(code) => return Ok(code),
        };
        let text = read_message(&self.file)?;

        let (message, report) = match parser.parse_with_report(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                let error = e.into_hl7();
                crate::log_hl7_error!(&error, self.file.display());
                println!("❌ Failed to parse {}", self.file.display());
                println!("   Error: {error}");
                return Ok(EXIT_FAILED);
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&message.to_json())?);
        } else if self.get.is_empty() {
            print_summary(&message);
        }

        let mut status = 0;
        for path in &self.get {
            match message.get(path) {
                Ok(value) => println!("{path}={}", value.unwrap_or_default()),
                Err(e) => {
                    println!("❌ {path}: {e}");
                    status = EXIT_FAILED;
                }
            }
        }

        if !report.is_empty() {
            eprintln!("{}", report.format_summary());
        }
        Ok(status)
    }
}

fn print_summary(message: &Message) {
    println!("✅ Parsed {} message", message.structure());
    println!();
    println!("Message Summary:");
    println!("  Version: {}", message.version());
    println!(
        "  Type: {}^{}",
        message.message_type().unwrap_or_default(),
        message.trigger_event().unwrap_or_default()
    );
    println!("  Control ID: {}", message.control_id().unwrap_or_default());
    println!("  Processing ID: {}", message.processing_id().unwrap_or_default());
    println!("  Segments:");
    for segment in message.segments() {
        println!("    {} ({} fields)", segment.name(), segment.field_count());
    }
}
