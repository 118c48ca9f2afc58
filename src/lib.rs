// Pipehat - HL7 v2 Parser, Encoder and Validator
// Copyright (c) 2025 Pipehat Contributors
// Licensed under the MIT License

//! # Pipehat - HL7 v2 Parser, Encoder and Validator
//!
//! Pipehat reads pipe-delimited HL7 v2.x messages into a typed tree of
//! groups, segments and fields, writes them back out, and validates them
//! along the way.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Sniffing** the encoding, version and critical header values of raw text
//! - **Parsing** messages against version-specific message grammars
//! - **Encoding** message trees back to text with escaping
//! - **Validating** primitive values, whole messages and raw text with pluggable rules
//! - **Acknowledging** messages, including ones that failed to parse
//!
//! ## Architecture
//!
//! Pipehat follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Sniffing, parsing, encoding and acknowledgements
//! - [`model`] - The message tree and its structure definitions
//! - [`registry`] - Versions, event maps and structure lookup
//! - [`validation`] - Rules, bindings and validation reports
//! - [`adapters`] - Event map sources and code table lookups
//! - [`domain`] - Delimiters, versions and error types
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pipehat::core::Parser;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let parser = Parser::with_defaults()?;
//!
//!     let message = parser.parse("MSH|^~\\&|A|B|C|D|20240101||ADT^A01|123|P|2.4\rPID|1||12345\r")?;
//!     println!("{} from {:?}", message.structure(), message.get("MSH-3")?);
//!
//!     let text = parser.encode(&message)?;
//!     println!("{text}");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! ### Structure Resolution
//!
//! The message structure comes from MSH-9-3 when present, otherwise the
//! version's event map translates `TYPE_EVENT` into a structure name:
//!
//! ```rust,no_run
//! use pipehat::registry::StructureRegistry;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = StructureRegistry::with_defaults()?;
//! assert_eq!(registry.resolve_event_structure("ADT_A04", "2.4")?, "ADT_A01");
//! # Ok(())
//! # }
//! ```
//!
//! ### Validation
//!
//! Rules run at four points: before parse on the raw text, on every
//! primitive value while parsing, after parse on the message, and before and
//! after encoding. Failures are reported or abort the call, per hook:
//!
//! ```rust,no_run
//! use pipehat::core::Parser;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let parser = Parser::with_defaults()?;
//! let (_message, report) = parser.parse_with_report("MSH|^~\\&|A|B|C|D|20240101||ADT^A01||P|2.4\rPID|1\r")?;
//! for issue in report.issues() {
//!     println!("{issue}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Message problems are [`domain::Hl7Error`] values carrying an HL7 error
//! code and location; everything else is wrapped in [`domain::PipehatError`]:
//!
//! ```rust,no_run
//! use pipehat::domain::{ErrorCode, PipehatError};
//!
//! fn example(parser: &pipehat::core::Parser) -> Result<(), PipehatError> {
//!     match parser.parse("MSH|^~\\&|A|B|C|D|20240101||ADT^A01|1|P|9.9\r") {
//!         Ok(_) => Ok(()),
//!         Err(e) if e.error_code() == ErrorCode::UnsupportedVersionId => Ok(()),
//!         Err(e) => Err(e),
//!     }
//! }
//! ```
//!
//! ## Logging
//!
//! Pipehat uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(structure = "ADT_A01", "Message parsed");
//! warn!(segment = "ZPI", "Unexpected segment kept inline");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod model;
pub mod registry;
pub mod validation;
