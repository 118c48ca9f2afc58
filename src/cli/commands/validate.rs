//! Validate command implementation
//!
//! This module implements the `validate` command, which parses a message
//! and lists every validation issue raised along the way.

use super::{parser_or_exit, read_message, EXIT_FAILED};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Message file to validate
    pub file: PathBuf,
}

impl ValidateArgs {
    /// Execute the validate command
    pub fn execute(&self, config_path: Option<&str>) -> anyhow::Result<i32> {
        tracing::info!(file = %self.file.display(), "Validating message");

        println!("🔍 Validating message file: {}", self.file.display());
        println!();

        let parser = match parser_or_exit(config_path) {
            Ok(parser) => parser,
            Err(code) => return Ok(code),
        };
        let text = read_message(&self.file)?;

        match parser.parse_with_report(&text) {
            Ok((message, report)) => {
                println!(
                    "✅ Parsed {} message (version {})",
                    message.structure(),
                    message.version()
                );
                print!("{}", report.format_summary());
                println!();

                if report.is_clean() {
                    println!("✅ Message is valid");
                    Ok(0)
                } else {
                    println!("⚠️  Message has {} validation issue(s)", report.len());
                    Ok(EXIT_FAILED)
                }
            }
            Err(e) => {
                let error = e.into_hl7();
                crate::log_hl7_error!(&error, self.file.display());
                println!("❌ Message validation failed");
                println!("   Error: {}", error.rendered_message());
                println!("   Code: {} ({})", error.code(), error.code().description());
                println!();
                Ok(EXIT_FAILED)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn run(text: &str) -> i32 {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file.flush().unwrap();
        ValidateArgs {
            file: file.path().to_path_buf(),
        }
        .execute(None)
        .unwrap()
    }

    #[test]
    fn test_validate_clean_message() {
        assert_eq!(run("MSH|^~\\&|A|B|C|D|20240101||ADT^A01|123|P|2.4\rPID|1||12345\r"), 0);
    }

    #[test]
    fn test_validate_reported_issue() {
        // line feed separators are reported, not fatal
        assert_eq!(
            run("MSH|^~\\&|A|B|C|D|20240101||ADT^A01|123|P|2.4\nPID|1||12345\n"),
            EXIT_FAILED
        );
    }

    #[test]
    fn test_validate_missing_file() {
        let args = ValidateArgs {
            file: PathBuf::from("/nonexistent/adt.hl7"),
        };
        assert!(args.execute(None).is_err());
    }
}
