//! Sniff command implementation
//!
//! Reads the encoding, version and critical header values of a message
//! without parsing its structure. Useful for text that fails a full parse.

use super::{parser_or_exit, read_message, EXIT_FAILED};
use crate::core::sniff::{CriticalResponseData, Encoding};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the sniff command
#[derive(Args, Debug)]
pub struct SniffArgs {
    /// Message file to inspect
    pub file: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct SniffOutput {
    encoding: Encoding,
    version: Option<String>,
    header: Option<CriticalResponseData>,
}

impl SniffArgs {
    /// Execute the sniff command
    pub fn execute(&self, config_path: Option<&str>) -> anyhow::Result<i32> {
        tracing::info!(file = %self.file.display(), "Sniffing message");

        let parser = match parser_or_exit(config_path) {
            Ok(parser) => parser,
            Err(code) => return Ok(code),
        };
        let text = read_message(&self.file)?;

        let Some(encoding) = parser.encoding_of(&text) else {
            println!("❌ {} is not an HL7 message", self.file.display());
            return Ok(EXIT_FAILED);
        };

        let version = parser
            .version_of(&text)
            .map_err(|e| tracing::debug!(error = %e, "No version found"))
            .ok();
        let header = parser
            .critical_response_data(&text)
            .map_err(|e| tracing::debug!(error = %e, "No header found"))
            .ok();
        let output = SniffOutput {
            encoding,
            version,
            header,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(0);
        }

        println!("Encoding: {}", output.encoding);
        println!("Version: {}", output.version.as_deref().unwrap_or("(none)"));
        if let Some(header) = &output.header {
            let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "(none)".to_string());
            println!("Encoding Characters: {}", header.encoding);
            println!("Sending Application: {}", show(&header.sending_application));
            println!("Sending Facility: {}", show(&header.sending_facility));
            println!("Receiving Application: {}", show(&header.receiving_application));
            println!("Receiving Facility: {}", show(&header.receiving_facility));
            println!("Trigger Event: {}", show(&header.trigger_event));
            println!("Control ID: {}", show(&header.control_id));
            println!("Processing ID: {}", show(&header.processing_id));
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn run(text: &str, json: bool) -> i32 {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file.flush().unwrap();
        SniffArgs {
            file: file.path().to_path_buf(),
            json,
        }
        .execute(None)
        .unwrap()
    }

    #[test]
    fn test_sniff_truncated_header() {
        assert_eq!(run("MSH|^~\\&|A|B|C|D|20240101||ADT^A01|123", false), 0);
    }

    #[test]
    fn test_sniff_json() {
        assert_eq!(run("MSH|^~\\&|A|B|C|D|20240101||ADT^A01|123|P|2.4\r", true), 0);
    }

    #[test]
    fn test_sniff_not_a_message() {
        assert_eq!(run("hello world", false), EXIT_FAILED);
    }
}
