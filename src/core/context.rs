//! Parser context
//!
//! Everything a parser needs besides the text itself: the structure
//! registry, the validation rules, the code tables and the parser options.
//! A context is built once at startup and shared by reference between
//! parsers, so differently configured parsers can live side by side.

use crate::adapters::resources::DirectoryEventMaps;
use crate::adapters::tables::{StaticTables, TableLookup};
use crate::config::schema::{PipehatConfig, ValidationProfile};
use crate::domain::errors::PipehatError;
use crate::registry::{ModelPack, StructureRegistry};
use crate::validation::{ValidationContext, ValidationPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// What the parser does with a segment its grammar does not contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnexpectedSegments {
    /// Keep it in place as a nonstandard child of the current group
    #[default]
    AddInline,
    /// Discard it with a warning
    Drop,
    /// Fail with a segment sequence error
    Error,
}

/// Parser behaviour switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    pub unexpected_segments: UnexpectedSegments,
    /// Version stamped on acknowledgements when the input has none
    pub default_version: String,
    /// Segment terminator written on encode
    pub segment_separator: String,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            unexpected_segments: UnexpectedSegments::AddInline,
            default_version: "2.5".to_string(),
            segment_separator: "\r".to_string(),
        }
    }
}

/// Shared parser context
#[derive(Debug)]
pub struct Hl7Context {
    pub registry: StructureRegistry,
    pub validation: ValidationContext,
    pub tables: Arc<dyn TableLookup>,
    pub options: ParserOptions,
}

impl Hl7Context {
    pub fn new(
        registry: StructureRegistry,
        validation: ValidationContext,
        tables: Arc<dyn TableLookup>,
        options: ParserOptions,
    ) -> Self {
        Self {
            registry,
            validation,
            tables,
            options,
        }
    }

    /// Context with the bundled versions, the default rule set and table 0357
    pub fn with_defaults() -> Result<Self, PipehatError> {
        Ok(Self::new(
            StructureRegistry::with_defaults()?,
            ValidationContext::with_default_rules()?,
            Arc::new(StaticTables::hl7_defaults()),
            ParserOptions::default(),
        ))
    }

    /// Context built from a loaded configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a model pack cannot be loaded, a
    /// rule name is unknown or the default version is not supported.
    pub fn from_config(config: &PipehatConfig) -> Result<Self, PipehatError> {
        let mut builder = StructureRegistry::builder();
        for entry in &config.registry.versions {
            let pack = match &entry.model_pack {
                Some(path) => {
                    let pack = ModelPack::from_file(path).map_err(|e| {
                        PipehatError::Configuration(format!(
                            "Failed to load model pack for version {}: {e:#}",
                            entry.version
                        ))
                    })?;
                    debug!(version = %entry.version, path = %path.display(), "Loaded model pack");
                    Some(pack)
                }
                None => None,
            };
            builder = builder.custom_version(&entry.version, &entry.package, pack);
        }
        if let Some(dir) = &config.registry.event_map_dir {
            builder = builder.event_map_source(Arc::new(DirectoryEventMaps::new(dir)));
        }
        let registry = builder.build()?;

        let policy: ValidationPolicy = config.validation.policy();
        let validation = match config.validation.profile {
            ValidationProfile::Default => {
                let message_rules: Vec<&str> =
                    config.validation.message_rules.iter().map(String::as_str).collect();
                let encoding_rules: Vec<&str> =
                    config.validation.encoding_rules.iter().map(String::as_str).collect();
                ValidationContext::with_rules(policy, &message_rules, &encoding_rules)?
            }
            ValidationProfile::None => ValidationContext::new(policy),
        };

        let default_version = registry
            .version(&config.parser.default_version)
            .map_err(|e| PipehatError::Configuration(format!("parser.default_version: {e}")))?;

        let options = ParserOptions {
            unexpected_segments: config.parser.unexpected_segments,
            default_version: default_version.into_inner(),
            segment_separator: config.parser.segment_separator.clone(),
        };

        let (primitive, message, encoding) = validation.binding_counts();
        info!(
            versions = registry.packages().len(),
            primitive_rules = primitive,
            message_rules = message,
            encoding_rules = encoding,
            "Parser context ready"
        );

        Ok(Self::new(
            registry,
            validation,
            Arc::new(StaticTables::hl7_defaults()),
            options,
        ))
    }
}
