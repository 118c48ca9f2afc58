// Pipehat - HL7 v2 Parser, Encoder and Validator
// Copyright (c) 2025 Pipehat Contributors
// Licensed under the MIT License

use clap::Parser;
use pipehat::cli::{Cli, Commands};
use pipehat::config::LoggingConfig;
use pipehat::logging::init_logging;
use std::process;

fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Console-only logging for the CLI
    let log_level = cli.log_level.as_deref().unwrap_or("info");
    let _guard = match init_logging(log_level, &LoggingConfig::default()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        "Pipehat - HL7 v2 Parser, Encoder and Validator"
    );

    let exit_code = match execute_command(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e:#}");
            5 // Fatal error exit code
        }
    };

    process::exit(exit_code);
}

/// Execute the CLI command
fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    let config = cli.config.as_deref();
    match &cli.command {
        Commands::Parse(args) => args.execute(config),
        Commands::Validate(args) => args.execute(config),
        Commands::Sniff(args) => args.execute(config),
        Commands::Ack(args) => args.execute(config),
        Commands::Init(args) => args.execute(),
    }
}
