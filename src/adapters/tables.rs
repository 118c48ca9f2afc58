//! HL7 code table lookups
//!
//! The engine only needs a table repository for one thing: describing table
//! 0357 codes when an error is written into an ERR segment. Applications that
//! keep their own code tables implement [`TableLookup`] and hand it to the
//! [`Hl7Context`](crate::core::Hl7Context).

use crate::domain::errors::{ErrorCode, ERROR_CODE_TABLE};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Table lookup errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The table is not known to the repository
    #[error("Unknown table: {0}")]
    UnknownTable(u16),

    /// The table exists but does not contain the value
    #[error("Value '{value}' not found in table {table}")]
    UnknownValue { table: u16, value: String },

    /// The repository cannot be reached
    #[error("Table repository unavailable: {0}")]
    Unavailable(String),
}

impl LookupError {
    /// Table 0357 code for this failure
    pub fn error_code(&self) -> ErrorCode {
        match self {
            LookupError::Unavailable(_) => ErrorCode::ApplicationInternalError,
            _ => ErrorCode::TableValueNotFound,
        }
    }
}

/// Source of HL7 and user-defined code tables
pub trait TableLookup: Send + Sync + fmt::Debug {
    /// Returns the description of `value` in `table`
    ///
    /// # Errors
    ///
    /// Returns a [`LookupError`] when the table or value is unknown or the
    /// repository is unavailable.
    fn description(&self, table: u16, value: &str) -> Result<String, LookupError>;

    /// Returns true when `value` is defined in `table`
    fn contains(&self, table: u16, value: &str) -> Result<bool, LookupError> {
        match self.description(table, value) {
            Ok(_) => Ok(true),
            Err(LookupError::UnknownValue { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// In-memory table repository
///
/// # Examples
///
/// ```
/// use pipehat::adapters::tables::{StaticTables, TableLookup};
///
/// let mut tables = StaticTables::hl7_defaults();
/// tables.insert(1, "F", "Female");
/// assert_eq!(tables.description(1, "F").unwrap(), "Female");
/// assert_eq!(tables.description(357, "207").unwrap(), "Application internal error");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticTables {
    tables: HashMap<u16, HashMap<String, String>>,
}

impl StaticTables {
    /// Creates an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository seeded with table 0357
    pub fn hl7_defaults() -> Self {
        let mut tables = Self::new();
        for code in ErrorCode::ALL {
            tables.insert(ERROR_CODE_TABLE, code.code().to_string(), code.description());
        }
        tables
    }

    /// Adds or replaces a table entry
    pub fn insert(&mut self, table: u16, value: impl Into<String>, description: impl Into<String>) {
        self.tables
            .entry(table)
            .or_default()
            .insert(value.into(), description.into());
    }

    /// Number of tables held
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

impl TableLookup for StaticTables {
    fn description(&self, table: u16, value: &str) -> Result<String, LookupError> {
        let entries = self
            .tables
            .get(&table)
            .ok_or(LookupError::UnknownTable(table))?;
        entries
            .get(value)
            .cloned()
            .ok_or_else(|| LookupError::UnknownValue {
                table,
                value: value.to_string(),
            })
    }
}

/// Repository used when no table source is configured
///
/// Every lookup fails with [`LookupError::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedTables;

impl TableLookup for DisconnectedTables {
    fn description(&self, _table: u16, _value: &str) -> Result<String, LookupError> {
        Err(LookupError::Unavailable(
            "no table repository configured".to_string(),
        ))
    }
}
