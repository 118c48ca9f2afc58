//! Model factories
//!
//! A [`ModelFactory`] answers "what does structure X look like in version V".
//! The parser never hard-codes a grammar; it asks the factory for message,
//! group, segment and data type definitions by name.

use super::pack::ModelPack;
use crate::model::definition::{
    DatatypeDefinition, GroupDefinition, MessageDefinition, SegmentDefinition,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Kind of structure being looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureKind {
    Message,
    Group,
    Segment,
    Datatype,
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StructureKind::Message => "message",
            StructureKind::Group => "group",
            StructureKind::Segment => "segment",
            StructureKind::Datatype => "data type",
        };
        f.write_str(name)
    }
}

/// Factory lookup failures
#[derive(Debug, Error)]
pub enum ModelLookupError {
    #[error("No {kind} definition named '{name}' for version {version}")]
    NotFound {
        kind: StructureKind,
        name: String,
        version: String,
    },

    #[error("No model pack registered for version {0}")]
    UnknownVersion(String),
}

/// Source of structure definitions, by name and version
pub trait ModelFactory: Send + Sync + fmt::Debug {
    /// Message structure by name
    ///
    /// `is_explicit` is true when the name was read from MSH-9-3 rather than
    /// resolved through the event map.
    fn message(
        &self,
        name: &str,
        version: &str,
        is_explicit: bool,
    ) -> Result<Arc<MessageDefinition>, ModelLookupError>;

    /// Group by full name (`ADT_A01_PROCEDURE`)
    fn group(&self, name: &str, version: &str) -> Result<Arc<GroupDefinition>, ModelLookupError>;

    fn segment(&self, name: &str, version: &str) -> Result<Arc<SegmentDefinition>, ModelLookupError>;

    fn datatype(&self, name: &str, version: &str) -> Result<Arc<DatatypeDefinition>, ModelLookupError>;
}

/// Factory backed by one [`ModelPack`] per version
#[derive(Debug, Clone, Default)]
pub struct PackModelFactory {
    packs: HashMap<String, Arc<ModelPack>>,
}

impl PackModelFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `pack` for `version`, replacing any earlier registration
    pub fn register(&mut self, version: &str, pack: ModelPack) {
        self.packs.insert(key(version), Arc::new(pack));
    }

    pub fn has_version(&self, version: &str) -> bool {
        self.packs.contains_key(&key(version))
    }

    fn pack(&self, version: &str) -> Result<&ModelPack, ModelLookupError> {
        self.packs
            .get(&key(version))
            .map(Arc::as_ref)
            .ok_or_else(|| ModelLookupError::UnknownVersion(version.to_string()))
    }

    fn find<T>(
        &self,
        kind: StructureKind,
        name: &str,
        version: &str,
        get: impl FnOnce(&ModelPack) -> Option<Arc<T>>,
    ) -> Result<Arc<T>, ModelLookupError> {
        get(self.pack(version)?).ok_or_else(|| ModelLookupError::NotFound {
            kind,
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}

impl ModelFactory for PackModelFactory {
    fn message(
        &self,
        name: &str,
        version: &str,
        _is_explicit: bool,
    ) -> Result<Arc<MessageDefinition>, ModelLookupError> {
        self.find(StructureKind::Message, name, version, |p| p.message(name))
    }

    fn group(&self, name: &str, version: &str) -> Result<Arc<GroupDefinition>, ModelLookupError> {
        self.find(StructureKind::Group, name, version, |p| p.group(name))
    }

    fn segment(&self, name: &str, version: &str) -> Result<Arc<SegmentDefinition>, ModelLookupError> {
        self.find(StructureKind::Segment, name, version, |p| p.segment(name))
    }

    fn datatype(&self, name: &str, version: &str) -> Result<Arc<DatatypeDefinition>, ModelLookupError> {
        self.find(StructureKind::Datatype, name, version, |p| p.datatype(name))
    }
}

fn key(version: &str) -> String {
    version.trim().to_ascii_lowercase()
}
