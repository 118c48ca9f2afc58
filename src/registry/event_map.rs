//! Event map parsing

use std::collections::HashMap;
use tracing::warn;

/// Mapping from `TYPE_EVENT` codes to message structure names
///
/// Parsed from line-oriented text: blank lines and lines starting with `#`
/// are skipped, every other line holds a code and a structure separated by
/// whitespace.
///
/// # Examples
///
/// ```
/// use pipehat::registry::EventMap;
///
/// let map = EventMap::parse("# ADT\nADT_A04  ADT_A01\n");
/// assert_eq!(map.get("ADT_A04"), Some("ADT_A01"));
/// assert_eq!(map.get("ADT_A02"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventMap {
    entries: HashMap<String, String>,
}

impl EventMap {
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            match (tokens.next(), tokens.next()) {
                (Some(code), Some(structure)) => {
                    entries.insert(code.to_string(), structure.to_string());
                }
                _ => warn!(line = number + 1, content = line, "Skipping malformed event map line"),
            }
        }
        Self { entries }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
