//! Domain identifier types with validation
//!
//! Newtype wrappers for identifiers that travel through the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HL7 version identifier newtype wrapper
///
/// Holds a trimmed version string such as `2.4` or `2.5.1`. Whether the
/// version is actually supported is decided by the structure registry.
///
/// # Examples
///
/// ```
/// use pipehat::domain::ids::Version;
/// use std::str::FromStr;
///
/// let version = Version::from_str(" 2.5.1 ").unwrap();
/// assert_eq!(version.as_str(), "2.5.1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(String);

impl Version {
    /// Creates a new Version from a string
    ///
    /// # Arguments
    ///
    /// * `version` - The version string; surrounding whitespace is removed
    ///
    /// # Returns
    ///
    /// Returns `Ok(Version)` if the version is not blank, `Err` otherwise
    pub fn new(version: impl Into<String>) -> Result<Self, String> {
        let version = version.into();
        let trimmed = version.trim();
        if trimmed.is_empty() {
            return Err("Version cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the version as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Case-insensitive comparison against a raw version string
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
