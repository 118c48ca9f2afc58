//! Model packs
//!
//! A model pack is a TOML document describing the data types, segments and
//! message structures of one HL7 version. Packs are layered: the bundled
//! versions share a common base and add small per-version overlays, and a
//! custom pack may name a bundled version as its `base`.
//!
//! ```toml
//! base = "2.5"
//!
//! [datatypes.ZCE]
//! components = ["ST", "ST"]
//!
//! [segments.ZPI]
//! fields = [{ type = "ZCE", description = "Custom code" }]
//!
//! [messages.ADT_Z01]
//! structure = [
//!     { segment = "MSH", required = true },
//!     { segment = "PID", required = true },
//!     { segment = "ZPI", repeating = true },
//! ]
//! ```

use crate::model::definition::{
    ChildDefinition, DatatypeDefinition, FieldDefinition, GroupDefinition, MessageDefinition,
    SegmentDefinition, VARIES,
};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

const COMMON: &str = include_str!("../../resources/models/common.toml");
const LEGACY_GROUPS: &str = include_str!("../../resources/models/legacy.toml");
const V23: &str = include_str!("../../resources/models/v23.toml");
const V25: &str = include_str!("../../resources/models/v25.toml");

/// Pack document as written in TOML
#[derive(Debug, Clone, Default, Deserialize)]
struct PackDocument {
    /// Bundled version this pack builds on
    base: Option<String>,
    #[serde(default)]
    datatypes: BTreeMap<String, DatatypeSpec>,
    #[serde(default)]
    segments: BTreeMap<String, SegmentSpec>,
    #[serde(default)]
    messages: BTreeMap<String, MessageSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct DatatypeSpec {
    description: Option<String>,
    /// Component data types; empty for a primitive
    #[serde(default)]
    components: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SegmentSpec {
    description: Option<String>,
    #[serde(default)]
    fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldSpec {
    #[serde(rename = "type")]
    datatype: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    required: bool,
    /// Maximum repetitions, 0 for unbounded
    #[serde(default = "default_repeat")]
    repeat: usize,
    #[serde(default)]
    length: usize,
    table: Option<u16>,
}

fn default_repeat() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
struct MessageSpec {
    description: Option<String>,
    structure: Vec<ChildSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChildSpec {
    segment: Option<String>,
    /// Explicit group name; derived from the children when absent
    group: Option<String>,
    #[serde(default)]
    children: Vec<ChildSpec>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    repeating: bool,
}

impl PackDocument {
    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse model pack TOML")
    }

    /// Layers `overlay` on top of this document; overlay entries win
    fn merge(&mut self, overlay: PackDocument) {
        self.datatypes.extend(overlay.datatypes);
        self.segments.extend(overlay.segments);
        self.messages.extend(overlay.messages);
    }
}

/// Resolved definitions for one version
#[derive(Debug, Clone, Default)]
pub struct ModelPack {
    datatypes: HashMap<String, Arc<DatatypeDefinition>>,
    segments: HashMap<String, Arc<SegmentDefinition>>,
    groups: HashMap<String, Arc<GroupDefinition>>,
    messages: HashMap<String, Arc<MessageDefinition>>,
}

impl ModelPack {
    /// Create a model pack from a TOML file
    ///
    /// When the file names a `base`, the bundled pack of that version is
    /// loaded first and the file is layered on top.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read model pack: {}", path.as_ref().display())
        })?;

        Self::from_toml(&content)
            .with_context(|| format!("Invalid model pack: {}", path.as_ref().display()))
    }

    /// Create a model pack from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let document = PackDocument::parse(content)?;
        let mut merged = match &document.base {
            Some(base) => {
                let layers = bundled_layers(base)
                    .with_context(|| format!("Unknown base version '{base}'"))?;
                parse_layers(layers)?
            }
            None => PackDocument::default(),
        };
        merged.merge(document);
        Self::resolve(merged)
    }

    /// Bundled pack for `version`, or `None` when the version is not bundled
    pub fn bundled(version: &str) -> Result<Option<Self>> {
        match bundled_layers(version) {
            Some(layers) => {
                let document = parse_layers(layers)
                    .with_context(|| format!("Invalid bundled model pack for {version}"))?;
                Ok(Some(Self::resolve(document)?))
            }
            None => Ok(None),
        }
    }

    pub fn datatype(&self, name: &str) -> Option<Arc<DatatypeDefinition>> {
        self.datatypes.get(name).cloned()
    }

    pub fn segment(&self, name: &str) -> Option<Arc<SegmentDefinition>> {
        self.segments.get(name).cloned()
    }

    /// Group by full name, e.g. `ADT_A01_PROCEDURE`
    pub fn group(&self, name: &str) -> Option<Arc<GroupDefinition>> {
        self.groups.get(name).cloned()
    }

    pub fn message(&self, name: &str) -> Option<Arc<MessageDefinition>> {
        self.messages.get(name).cloned()
    }

    /// Message structure names, sorted
    pub fn message_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.messages.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn resolve(document: PackDocument) -> Result<Self> {
        let mut pack = Self::default();
        pack.datatypes
            .insert(VARIES.to_string(), Arc::new(DatatypeDefinition::varies()));

        for name in document.datatypes.keys() {
            let mut visiting = Vec::new();
            resolve_datatype(name, &document, &mut pack.datatypes, &mut visiting)?;
        }

        for (name, spec) in &document.segments {
            let fields = spec
                .fields
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    let datatype = pack.datatypes.get(&field.datatype).cloned().with_context(|| {
                        format!(
                            "Unknown data type '{}' for field {}-{}",
                            field.datatype,
                            name,
                            i + 1
                        )
                    })?;
                    Ok(FieldDefinition {
                        description: field.description.clone(),
                        datatype,
                        required: field.required,
                        max_repetitions: field.repeat,
                        length: field.length,
                        table: field.table,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let mut definition = SegmentDefinition::new(name.clone(), fields);
            definition.description = spec.description.clone();
            pack.segments.insert(name.clone(), Arc::new(definition));
        }

        for (name, spec) in &document.messages {
            let children = build_children(name, &spec.structure, &pack.segments, &mut pack.groups)
                .with_context(|| format!("Invalid structure for message {name}"))?;
            let mut definition = MessageDefinition::new(name.clone(), children);
            definition.description = spec.description.clone();
            pack.messages.insert(name.clone(), Arc::new(definition));
        }

        Ok(pack)
    }
}

fn bundled_layers(version: &str) -> Option<&'static [&'static str]> {
    let layers: &'static [&'static str] = match version.trim() {
        "2.2" | "2.3" => &[COMMON, LEGACY_GROUPS, V23],
        "2.3.1" => &[COMMON, LEGACY_GROUPS],
        "2.4" => &[COMMON],
        "2.5" | "2.5.1" => &[COMMON, V25],
        _ => return None,
    };
    Some(layers)
}

fn parse_layers(layers: &[&str]) -> Result<PackDocument> {
    let mut merged = PackDocument::default();
    for layer in layers {
        merged.merge(PackDocument::parse(layer)?);
    }
    Ok(merged)
}

fn resolve_datatype(
    name: &str,
    document: &PackDocument,
    resolved: &mut HashMap<String, Arc<DatatypeDefinition>>,
    visiting: &mut Vec<String>,
) -> Result<Arc<DatatypeDefinition>> {
    if let Some(existing) = resolved.get(name) {
        return Ok(existing.clone());
    }
    if visiting.iter().any(|v| v == name) {
        bail!(
            "Recursive data type definition: {} -> {}",
            visiting.join(" -> "),
            name
        );
    }
    let spec = document
        .datatypes
        .get(name)
        .with_context(|| format!("Unknown data type '{name}'"))?;

    visiting.push(name.to_string());
    let components = spec
        .components
        .iter()
        .map(|component| resolve_datatype(component, document, resolved, visiting))
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Invalid components for data type {name}"))?;
    visiting.pop();

    let mut definition = if components.is_empty() {
        DatatypeDefinition::primitive(name)
    } else {
        DatatypeDefinition::composite(name, components)
    };
    definition.description = spec.description.clone();

    let definition = Arc::new(definition);
    resolved.insert(name.to_string(), definition.clone());
    Ok(definition)
}

fn build_children(
    message: &str,
    specs: &[ChildSpec],
    segments: &HashMap<String, Arc<SegmentDefinition>>,
    groups: &mut HashMap<String, Arc<GroupDefinition>>,
) -> Result<Vec<ChildDefinition>> {
    let mut children = Vec::with_capacity(specs.len());
    let mut names = HashSet::new();

    for spec in specs {
        let child = match (&spec.segment, spec.children.is_empty()) {
            (Some(name), true) => {
                let definition = segments
                    .get(name)
                    .cloned()
                    .with_context(|| format!("Unknown segment '{name}'"))?;
                ChildDefinition::segment(definition, spec.required, spec.repeating)
            }
            (None, false) => {
                let nested = build_children(message, &spec.children, segments, groups)?;
                let (slot, full) =
                    GroupDefinition::derive_names(message, spec.group.as_deref(), &nested);
                let definition = Arc::new(GroupDefinition::new(full.clone(), nested));
                groups.insert(full, definition.clone());
                ChildDefinition::group(slot, definition, spec.required, spec.repeating)
            }
            _ => bail!("Each child must name a segment or list group children"),
        };

        if !names.insert(child.name.clone()) {
            bail!("Duplicate child '{}' in {}", child.name, message);
        }
        children.push(child);
    }

    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::definition::{ChildKind, DatatypeKind};

    #[test]
    fn test_bundled_packs_load() {
        for version in ["2.2", "2.3", "2.3.1", "2.4", "2.5", "2.5.1"] {
            let pack = ModelPack::bundled(version).unwrap().unwrap();
            for message in ["ACK", "ADT_A01", "ADT_A03", "ADT_A05", "ORU_R01"] {
                assert!(pack.message(message).is_some(), "{message} missing in {version}");
            }
        }
    }

    #[test]
    fn test_unbundled_version_is_none() {
        assert!(ModelPack::bundled("9.9").unwrap().is_none());
    }

    #[test]
    fn test_timestamp_component_differs_by_version() {
        let v24 = ModelPack::bundled("2.4").unwrap().unwrap();
        let v25 = ModelPack::bundled("2.5").unwrap().unwrap();

        let first_component = |pack: &ModelPack| match &pack.datatype("TS").unwrap().kind {
            DatatypeKind::Composite(components) => components[0].name.clone(),
            _ => panic!("TS should be composite"),
        };
        assert_eq!(first_component(&v24), "TSComponentOne");
        assert_eq!(first_component(&v25), "DTM");
    }

    #[test]
    fn test_group_names_follow_version_style() {
        let v24 = ModelPack::bundled("2.4").unwrap().unwrap();
        let v231 = ModelPack::bundled("2.3.1").unwrap().unwrap();

        assert!(v24.group("ADT_A01_PROCEDURE").is_some());
        assert!(v231.group("ADT_A01_PR1ROL").is_some());
    }

    #[test]
    fn test_custom_pack_with_base() {
        let pack = ModelPack::from_toml(
            r#"
            base = "2.5"

            [segments.ZPI]
            fields = [{ type = "ST", description = "Custom" }]

            [messages.ADT_Z01]
            structure = [
                { segment = "MSH", required = true },
                { segment = "ZPI", repeating = true },
            ]
            "#,
        )
        .unwrap();

        let message = pack.message("ADT_Z01").unwrap();
        assert_eq!(message.root.children.len(), 2);
        assert!(pack.message("ADT_A01").is_some());
        assert!(matches!(message.root.children[1].kind, ChildKind::Segment(_)));
    }

    #[test]
    fn test_unknown_datatype_rejected() {
        let result = ModelPack::from_toml(
            r#"
            [segments.ZZZ]
            fields = [{ type = "NOPE" }]
            "#,
        );
        let err = format!("{:#}", result.unwrap_err());
        assert!(err.contains("NOPE"));
    }

    #[test]
    fn test_recursive_datatype_rejected() {
        let result = ModelPack::from_toml(
            r#"
            [datatypes.AA]
            components = ["BB"]

            [datatypes.BB]
            components = ["AA"]
            "#,
        );
        let err = format!("{:#}", result.unwrap_err());
        assert!(err.contains("Recursive"));
    }

    #[test]
    fn test_unknown_segment_in_message_rejected() {
        let result = ModelPack::from_toml(
            r#"
            [messages.X_X]
            structure = [{ segment = "MSH" }]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_child_rejected() {
        let result = ModelPack::from_toml(
            r#"
            base = "2.4"

            [messages.X_X]
            structure = [{ segment = "MSH" }, { segment = "MSH" }]
            "#,
        );
        assert!(result.is_err());
    }
}
