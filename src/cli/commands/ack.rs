//! Ack command implementation
//!
//! Parses a message and prints the acknowledgement a receiver would send:
//! `AA` when it parsed, `AE` or `AR` with an ERR segment when it did not.

use super::{display_lines, parser_or_exit, read_message, EXIT_FAILED};
use crate::core::ack::{accept_ack, error_ack};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the ack command
#[derive(Args, Debug)]
pub struct AckArgs {
    /// Message file to acknowledge
    pub file: PathBuf,
}

impl AckArgs {
    /// Execute the ack command
    pub fn execute(&self, config_path: Option<&str>) -> anyhow::Result<i32> {
        tracing::info!(file = %self.file.display(), "Acknowledging message");

        let parser = match parser_or_exit(config_path) {
            Ok(parser) => parser,
            Err(code) => return Ok(code),
        };
        let text = read_message(&self.file)?;

        let (reply, status) = match parser.parse(&text) {
            Ok(message) => (accept_ack(&message, parser.context())?, 0),
            Err(e) => {
                let error = e.into_hl7();
                crate::log_hl7_error!(&error, self.file.display());
                (error_ack(&text, &error, parser.context())?, EXIT_FAILED)
            }
        };

        let encoded = parser.encode(&reply)?;
        for line in display_lines(&encoded) {
            println!("{line}");
        }
        Ok(status)
    }
}
