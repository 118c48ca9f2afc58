//! External resource integrations for Pipehat.
//!
//! This module isolates the engine from the places its reference data lives:
//!
//! - [`tables`] - HL7 code table repositories (used for ERR descriptions)
//! - [`resources`] - Event map sources (bundled or read from a directory)
//!
//! # Design Pattern
//!
//! Adapters are trait-based so applications can plug in their own table
//! repository or event map location without touching the parser:
//!
//! ```rust
//! use pipehat::adapters::resources::{BundledEventMaps, EventMapSource};
//!
//! let text = BundledEventMaps.load("2.4").unwrap();
//! assert!(text.is_some());
//! ```

pub mod resources;
pub mod tables;

pub use resources::{BundledEventMaps, DirectoryEventMaps, EventMapSource};
pub use tables::{DisconnectedTables, LookupError, StaticTables, TableLookup};
