//! Domain types shared by every Pipehat layer.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Error types** ([`Hl7Error`], [`PipehatError`], [`ErrorCode`])
//! - **Delimiters** ([`EncodingCharacters`])
//! - **Strongly-typed identifiers** ([`Version`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! Parsing failures carry an HL7 table 0357 code and a location:
//!
//! ```rust
//! use pipehat::domain::{ErrorCode, Hl7Error};
//!
//! let err = Hl7Error::new("Required segment PID is missing", ErrorCode::RequiredFieldMissing)
//!     .with_segment("PID");
//! assert_eq!(err.code().code(), 101);
//! ```

pub mod encoding;
pub mod errors;
pub mod ids;
pub mod result;

// Re-export commonly used types for convenience
pub use encoding::EncodingCharacters;
pub use errors::{ErrorCode, Hl7Error, PipehatError};
pub use ids::Version;
pub use result::Result;
