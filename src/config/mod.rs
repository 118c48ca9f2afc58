//! Configuration management for Pipehat.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Pipehat uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PIPEHAT_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pipehat::config::load_config;
//! use pipehat::core::{Hl7Context, Parser};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pipehat.toml")?;
//! let context = Hl7Context::from_config(&config)?;
//! let parser = Parser::new(Arc::new(context));
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application settings (log level)
//! - [`ParserConfig`] - Unexpected segment handling, default version, segment separator
//! - [`ValidationConfig`] - Rule profile, named rules and failure actions
//! - [`RegistryConfig`] - Additional versions, model packs and event map directory
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [parser]
//! unexpected_segments = "add_inline"
//! default_version = "2.5"
//!
//! [validation]
//! profile = "default"
//! primitive_failures = "report"
//! message_failures = "abort"
//!
//! [registry]
//! event_map_dir = "${PIPEHAT_HOME}/eventmaps"
//!
//! [[registry.versions]]
//! package = "acme.v26"
//! version = "2.6"
//! model_pack = "models/acme-v26.toml"
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::{load_config, load_config_str};
pub use schema::{
    ApplicationConfig, LoggingConfig, ParserConfig, PipehatConfig, RegistryConfig,
    ValidationConfig, ValidationProfile, VersionConfig,
};
