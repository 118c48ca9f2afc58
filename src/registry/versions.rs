//! Supported versions and their model packages

use serde::{Deserialize, Serialize};

/// Versions whose model packs ship with the crate, oldest first
pub const BUILTIN_VERSIONS: [&str; 6] = ["2.2", "2.3", "2.3.1", "2.4", "2.5", "2.5.1"];

/// A supported version and the name of the package holding its model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPackage {
    pub version: String,
    pub package: String,
}

impl VersionPackage {
    pub fn new(version: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            version: version.into().trim().to_string(),
            package: package.into(),
        }
    }

    /// Package entry for a bundled version (`2.3.1` maps to `pipehat.model.v231`)
    pub fn builtin(version: &str) -> Self {
        let digits: String = version.chars().filter(|c| *c != '.').collect();
        Self::new(version, format!("pipehat.model.v{digits}"))
    }

    pub fn matches(&self, version: &str) -> bool {
        self.version.eq_ignore_ascii_case(version.trim())
    }
}

/// Package entries for every bundled version
pub fn builtin_packages() -> Vec<VersionPackage> {
    BUILTIN_VERSIONS.iter().map(|v| VersionPackage::builtin(v)).collect()
}
