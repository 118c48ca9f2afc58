//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Pipehat using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Pipehat - HL7 v2 parser, encoder and validator
#[derive(Parser, Debug)]
#[command(name = "pipehat")]
#[command(version, about, long_about = None)]
#[command(author = "Pipehat Contributors")]
pub struct Cli {
    /// Path to configuration file; bundled defaults are used when omitted
    /// and no pipehat.toml exists
    #[arg(short, long, env = "PIPEHAT_CONFIG")]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PIPEHAT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a message and print its structure
    Parse(commands::parse::ParseArgs),

    /// Parse a message and report every validation issue
    Validate(commands::validate::ValidateArgs),

    /// Read encoding, version and header values without a full parse
    Sniff(commands::sniff::SniffArgs),

    /// Print the acknowledgement for a message
    Ack(commands::ack::AckArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_parse() {
        let cli = Cli::parse_from(["pipehat", "parse", "adt.hl7"]);
        assert_eq!(cli.config, None);
        assert!(matches!(cli.command, Commands::Parse(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["pipehat", "--config", "custom.toml", "validate", "adt.hl7"]);
        assert_eq!(cli.config.as_deref(), Some("custom.toml"));
        assert!(matches!(cli.command, Commands::Validate(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["pipehat", "--log-level", "debug", "sniff", "adt.hl7"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::Sniff(_)));
    }

    #[test]
    fn test_cli_parse_get_paths() {
        let cli = Cli::parse_from([
            "pipehat", "parse", "adt.hl7", "--get", "PID-3", "--get", "MSH-10", "--json",
        ]);
        match cli.command {
            Commands::Parse(args) => {
                assert_eq!(args.get, vec!["PID-3", "MSH-10"]);
                assert!(args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_ack() {
        let cli = Cli::parse_from(["pipehat", "ack", "adt.hl7"]);
        assert!(matches!(cli.command, Commands::Ack(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["pipehat", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
