//! Event map resources
//!
//! Event maps translate a `TYPE_EVENT` code into the message structure that
//! carries it, one mapping per line (`ADT_A04 ADT_A01`). Each supported
//! version may ship one map. A version without a map is not an error: the
//! registry simply falls back to the code itself.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Provider of raw event map text for a version
pub trait EventMapSource: Send + Sync + fmt::Debug {
    /// Returns the event map text for `version`, or `None` when the source has
    /// no map for it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the map exists but cannot be read.
    fn load(&self, version: &str) -> io::Result<Option<String>>;
}

/// Event maps compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledEventMaps;

impl EventMapSource for BundledEventMaps {
    fn load(&self, version: &str) -> io::Result<Option<String>> {
        let text = match version {
            "2.3" => include_str!("../../resources/eventmap/2.3.properties"),
            "2.3.1" => include_str!("../../resources/eventmap/2.3.1.properties"),
            "2.4" => include_str!("../../resources/eventmap/2.4.properties"),
            "2.5" => include_str!("../../resources/eventmap/2.5.properties"),
            "2.5.1" => include_str!("../../resources/eventmap/2.5.1.properties"),
            _ => return Ok(None),
        };
        Ok(Some(text.to_string()))
    }
}

/// Event maps read from `<dir>/<version>.properties`
#[derive(Debug, Clone)]
pub struct DirectoryEventMaps {
    dir: PathBuf,
}

impl DirectoryEventMaps {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory searched for map files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, version: &str) -> PathBuf {
        self.dir.join(format!("{version}.properties"))
    }
}

impl EventMapSource for DirectoryEventMaps {
    fn load(&self, version: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(version)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bundled_maps_present() {
        for version in ["2.3", "2.3.1", "2.4", "2.5", "2.5.1"] {
            let text = BundledEventMaps.load(version).unwrap();
            assert!(text.is_some(), "missing bundled map for {version}");
        }
    }

    #[test]
    fn test_bundled_map_missing_for_2_2() {
        assert!(BundledEventMaps.load("2.2").unwrap().is_none());
    }

    #[test]
    fn test_directory_map_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("2.4.properties")).unwrap();
        writeln!(file, "ZZZ_Z01 ADT_A01").unwrap();

        let source = DirectoryEventMaps::new(dir.path());
        let text = source.load("2.4").unwrap().unwrap();
        assert!(text.contains("ZZZ_Z01"));
    }

    #[test]
    fn test_directory_map_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectoryEventMaps::new(dir.path());
        assert!(source.load("2.4").unwrap().is_none());
    }
}
