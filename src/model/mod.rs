//! Message object model.
//!
//! # Overview
//!
//! A [`Message`] is a tree: its root [`Group`] holds named child slots, each
//! slot holds repetitions of a [`Segment`] or a nested [`Group`], segments
//! hold numbered fields and every field repetition is a [`Type`].
//!
//! The shape of the tree comes from immutable definitions
//! ([`definition::MessageDefinition`] and friends) served by the structure
//! registry for the message's version.
//!
//! # Example
//!
//! ```rust,no_run
//! use pipehat::core::Parser;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let parser = Parser::with_defaults()?;
//! let message = parser.parse("MSH|^~\\&|A|B|C|D|20240101||ADT^A01|123|P|2.4\rPID|1||12345\r")?;
//!
//! let pid = message.root().get("PID", 0)?.and_then(|s| s.as_segment());
//! assert_eq!(pid.map(|p| p.name()), Some("PID"));
//! # Ok(())
//! # }
//! ```

pub mod datatype;
pub mod definition;
pub mod group;
pub mod message;
pub mod path;
pub mod segment;

pub use datatype::{Composite, Primitive, Type, Varies};
pub use group::{Group, Slot, Structure};
pub use message::Message;
pub use path::Location;
pub use segment::Segment;
