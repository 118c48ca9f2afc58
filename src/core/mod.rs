//! Core parsing and encoding for Pipehat.
//!
//! This module turns raw HL7 v2 text into a [`Message`](crate::model::Message)
//! tree and back.
//!
//! # Modules
//!
//! - [`sniff`] - Encoding, version and critical header data read from raw text
//! - [`escape`] - Escape sequence translation for primitive values
//! - [`context`] - The shared parser context and parser options
//! - [`parser`] - Parse and encode entry points with validation hooks
//! - [`ack`] - Accept and error acknowledgements
//!
//! # Parse Workflow
//!
//! 1. **Sniff**: Detect the encoding and read MSH-12 without a full parse
//! 2. **Check raw text**: Run the encoding rules bound to the version
//! 3. **Resolve structure**: Explicit MSH-9-3, or the version's event map
//! 4. **Decode**: Walk the message grammar over the segment stream
//! 5. **Check message**: Run the message rules bound to the message type
//!
//! # Example
//!
//! ```rust,no_run
//! use pipehat::core::{ack, Parser};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let parser = Parser::with_defaults()?;
//! let raw = "MSH|^~\\&|A|B|C|D|20240101||ADT^A01|123|P|2.4\rPID|1||12345\r";
//!
//! let reply = match parser.parse(raw) {
//!     Ok(message) => ack::accept_ack(&message, parser.context())?,
//!     Err(err) => ack::error_ack(raw, &err.into_hl7(), parser.context())?,
//! };
//! println!("{}", parser.encode(&reply)?);
//! # Ok(())
//! # }
//! ```

pub mod ack;
mod compose;
pub mod context;
mod decode;
pub mod escape;
pub mod parser;
pub mod sniff;

pub use context::{Hl7Context, ParserOptions, UnexpectedSegments};
pub use parser::Parser;
