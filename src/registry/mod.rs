//! Structure registry
//!
//! The registry knows which HL7 versions are supported, which package holds
//! each version's model, how trigger events map onto message structures and
//! where to get structure definitions from.
//!
//! # Overview
//!
//! - [`versions`] - Built-in and custom version/package pairs
//! - [`event_map`] - `TYPE_EVENT` to structure maps, loaded once per version
//! - [`factory`] - The [`ModelFactory`] contract and its pack-backed implementation
//! - [`pack`] - TOML model packs, bundled and custom
//!
//! # Example
//!
//! ```rust
//! use pipehat::registry::StructureRegistry;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = StructureRegistry::with_defaults()?;
//! assert!(registry.is_valid_version(" 2.4 "));
//! assert_eq!(registry.resolve_event_structure("ADT_A04", "2.4")?, "ADT_A01");
//! # Ok(())
//! # }
//! ```

pub mod event_map;
pub mod factory;
pub mod pack;
pub mod versions;

pub use event_map::EventMap;
pub use factory::{ModelFactory, ModelLookupError, PackModelFactory, StructureKind};
pub use pack::ModelPack;
pub use versions::VersionPackage;

use crate::adapters::resources::{BundledEventMaps, EventMapSource};
use crate::domain::errors::{ErrorCode, Hl7Error, PipehatError};
use crate::domain::ids::Version;
use crate::model::definition::{
    DatatypeDefinition, GroupDefinition, MessageDefinition, SegmentDefinition,
};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Definition returned by a structure lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Message(Arc<MessageDefinition>),
    Group(Arc<GroupDefinition>),
    Segment(Arc<SegmentDefinition>),
    Datatype(Arc<DatatypeDefinition>),
}

impl TypeDescriptor {
    pub fn kind(&self) -> StructureKind {
        match self {
            TypeDescriptor::Message(_) => StructureKind::Message,
            TypeDescriptor::Group(_) => StructureKind::Group,
            TypeDescriptor::Segment(_) => StructureKind::Segment,
            TypeDescriptor::Datatype(_) => StructureKind::Datatype,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Message(d) => &d.name,
            TypeDescriptor::Group(d) => &d.name,
            TypeDescriptor::Segment(d) => &d.name,
            TypeDescriptor::Datatype(d) => &d.name,
        }
    }
}

/// Version, event map and model lookups for the parser
pub struct StructureRegistry {
    packages: Vec<VersionPackage>,
    event_sources: Vec<Arc<dyn EventMapSource>>,
    event_maps: DashMap<String, Arc<EventMap>>,
    factory: Arc<dyn ModelFactory>,
}

impl fmt::Debug for StructureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructureRegistry")
            .field("packages", &self.packages)
            .field("event_sources", &self.event_sources)
            .field("loaded_event_maps", &self.event_maps.len())
            .field("factory", &self.factory)
            .finish()
    }
}

impl StructureRegistry {
    pub fn builder() -> StructureRegistryBuilder {
        StructureRegistryBuilder::default()
    }

    /// Registry with the bundled versions, event maps and model packs
    pub fn with_defaults() -> Result<Self, PipehatError> {
        Self::builder().build()
    }

    /// Supported versions, custom ones first
    pub fn packages(&self) -> &[VersionPackage] {
        &self.packages
    }

    /// Returns true when `version` (trimmed, case-insensitive) is supported
    pub fn is_valid_version(&self, version: &str) -> bool {
        self.find_package(version).is_some()
    }

    /// Validates `version` and returns it in its registered spelling
    ///
    /// # Errors
    ///
    /// Returns an UNSUPPORTED_VERSION_ID error for unknown versions.
    pub fn version(&self, version: &str) -> Result<Version, Hl7Error> {
        let package = self.find_package(version).ok_or_else(|| {
            Hl7Error::new(
                format!("The HL7 version {} is not recognized", version.trim()),
                ErrorCode::UnsupportedVersionId,
            )
        })?;
        Version::new(package.version.as_str())
            .map_err(|e| Hl7Error::new(e, ErrorCode::UnsupportedVersionId))
    }

    /// Name of the package holding the model for `version`
    pub fn package_name_for(&self, version: &str) -> Option<&str> {
        self.find_package(version).map(|p| p.package.as_str())
    }

    /// Event map for `version`, loaded on first use and cached afterwards
    ///
    /// Sources are asked in order; the first one holding a map wins. A
    /// version without any map gets an empty one.
    pub fn event_map(&self, version: &Version) -> Arc<EventMap> {
        if let Some(map) = self.event_maps.get(version.as_str()) {
            return map.value().clone();
        }

        let map = Arc::new(self.load_event_map(version.as_str()));
        self.event_maps
            .entry(version.as_str().to_string())
            .or_insert(map)
            .value()
            .clone()
    }

    /// Message structure carrying `code` (`TYPE_EVENT`) in `version`
    ///
    /// Returns `code` unchanged when the version's event map has no entry
    /// for it.
    ///
    /// # Errors
    ///
    /// Returns an UNSUPPORTED_VERSION_ID error for unknown versions.
    pub fn resolve_event_structure(&self, code: &str, version: &str) -> Result<String, Hl7Error> {
        let version = self.version(version)?;
        let map = self.event_map(&version);
        let structure = map.get(code).unwrap_or(code).to_string();
        debug!(code, structure = %structure, version = %version, "Resolved event structure");
        Ok(structure)
    }

    /// Looks up a structure definition through the model factory
    ///
    /// # Errors
    ///
    /// Returns an UNSUPPORTED_VERSION_ID error for unknown versions and an
    /// APPLICATION_INTERNAL_ERROR wrapping the [`ModelLookupError`] when the
    /// factory has no such definition.
    pub fn lookup(
        &self,
        kind: StructureKind,
        name: &str,
        version: &str,
    ) -> Result<TypeDescriptor, Hl7Error> {
        let version = self.version(version)?;
        let version = version.as_str();
        let found = match kind {
            StructureKind::Message => {
                self.factory.message(name, version, false).map(TypeDescriptor::Message)
            }
            StructureKind::Group => self.factory.group(name, version).map(TypeDescriptor::Group),
            StructureKind::Segment => self.factory.segment(name, version).map(TypeDescriptor::Segment),
            StructureKind::Datatype => {
                self.factory.datatype(name, version).map(TypeDescriptor::Datatype)
            }
        };
        found.map_err(|e| {
            Hl7Error::internal(
                format!("Can't find the {kind} definition for {name} in version {version}"),
                e,
            )
        })
    }

    /// Message structure definition
    pub fn message_definition(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Arc<MessageDefinition>, Hl7Error> {
        self.find_message(name, version, false)
    }

    /// Message structure named explicitly in MSH-9-3
    pub fn explicit_message_definition(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Arc<MessageDefinition>, Hl7Error> {
        self.find_message(name, version, true)
    }

    fn find_message(
        &self,
        name: &str,
        version: &str,
        is_explicit: bool,
    ) -> Result<Arc<MessageDefinition>, Hl7Error> {
        let version = self.version(version)?;
        self.factory
            .message(name, version.as_str(), is_explicit)
            .map_err(|e| {
                Hl7Error::internal(
                    format!("Can't find the message structure {name} in version {version}"),
                    e,
                )
            })
    }

    /// Segment definition, or `None` when the version does not define `name`
    pub fn segment_definition(&self, name: &str, version: &Version) -> Option<Arc<SegmentDefinition>> {
        self.factory.segment(name, version.as_str()).ok()
    }

    fn find_package(&self, version: &str) -> Option<&VersionPackage> {
        self.packages.iter().find(|p| p.matches(version))
    }

    fn load_event_map(&self, version: &str) -> EventMap {
        for source in &self.event_sources {
            match source.load(version) {
                Ok(Some(text)) => {
                    let map = EventMap::parse(&text);
                    debug!(version, entries = map.len(), "Loaded event map");
                    return map;
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!(version, error = %e, "Failed to read event map, trying next source");
                }
            }
        }
        debug!(version, "No event map available, events resolve to themselves");
        EventMap::default()
    }
}

/// Builder for [`StructureRegistry`]
#[derive(Default)]
pub struct StructureRegistryBuilder {
    custom: Vec<VersionPackage>,
    packs: Vec<(String, ModelPack)>,
    event_sources: Vec<Arc<dyn EventMapSource>>,
    factory: Option<Arc<dyn ModelFactory>>,
}

impl StructureRegistryBuilder {
    /// Registers an additional version ahead of the built-in ones
    ///
    /// When `pack` is given it serves the version's definitions, replacing a
    /// bundled pack of the same version.
    pub fn custom_version(
        mut self,
        version: &str,
        package: &str,
        pack: Option<ModelPack>,
    ) -> Self {
        self.custom.push(VersionPackage::new(version, package));
        if let Some(pack) = pack {
            self.packs.push((version.trim().to_string(), pack));
        }
        self
    }

    /// Adds an event map source consulted before the bundled maps
    pub fn event_map_source(mut self, source: Arc<dyn EventMapSource>) -> Self {
        self.event_sources.push(source);
        self
    }

    /// Replaces the bundled pack factory
    pub fn factory(mut self, factory: Arc<dyn ModelFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn build(self) -> Result<StructureRegistry, PipehatError> {
        let mut packages = self.custom;
        packages.extend(versions::builtin_packages());

        let factory = match self.factory {
            Some(factory) => factory,
            None => {
                let mut factory = PackModelFactory::new();
                for version in versions::BUILTIN_VERSIONS {
                    let pack = ModelPack::bundled(version)
                        .map_err(|e| PipehatError::Configuration(format!("{e:#}")))?;
                    if let Some(pack) = pack {
                        factory.register(version, pack);
                    }
                }
                for (version, pack) in self.packs {
                    factory.register(&version, pack);
                }
                Arc::new(factory) as Arc<dyn ModelFactory>
            }
        };

        let mut event_sources = self.event_sources;
        event_sources.push(Arc::new(BundledEventMaps));

        Ok(StructureRegistry {
            packages,
            event_sources,
            event_maps: DashMap::new(),
            factory,
        })
    }
}
