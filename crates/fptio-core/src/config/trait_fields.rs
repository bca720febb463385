//! Trait to database-field mapping table
//!
//! Each trait property is filled from the first non-empty field in an
//! ordered list of candidate record fields. Deployments can replace the
//! table in their settings:
//!
//! ```toml
//! [traits."openassetio-mediacreation:content.LocatableContent".location]
//! fields = ["path", "sg_path_to_frames"]
//! kind = "location"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::traits::{
    DISPLAY_NAME_TRAIT, FRAME_RANGED_TRAIT, LOCATABLE_CONTENT_TRAIT, LOCATION_PROPERTY, TraitId,
};

/// How a raw record value is turned into a trait property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    /// File path or URL, normalised to a URL
    Location,
    /// Display text
    Text,
    /// Whole number
    Integer,
    /// Any non-null value, passed through untouched
    #[default]
    Raw,
}

/// Candidate record fields for one trait property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySource {
    /// Record fields in priority order
    pub fields: Vec<String>,
    #[serde(default)]
    pub kind: FieldKind,
}

impl PropertySource {
    pub fn new<I, S>(kind: FieldKind, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            kind,
        }
    }
}

/// Maps trait ids to the record fields that populate their properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraitFieldTable {
    traits: BTreeMap<TraitId, BTreeMap<String, PropertySource>>,
}

impl TraitFieldTable {
    /// An empty table: no trait is resolvable from the database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapping for the stock PublishedFile/Version/Shot schema.
    pub fn defaults() -> Self {
        Self::new()
            .with_property(
                TraitId::new(LOCATABLE_CONTENT_TRAIT),
                LOCATION_PROPERTY,
                PropertySource::new(
                    FieldKind::Location,
                    [
                        // PublishedFile
                        "path",
                        // Version
                        "sg_path_to_frames",
                        "sg_path_to_geometry",
                        "sg_path_to_movie",
                        "sg_uploaded_movie",
                    ],
                ),
            )
            .with_property(
                TraitId::new(DISPLAY_NAME_TRAIT),
                "name",
                PropertySource::new(FieldKind::Text, ["name", "code"]),
            )
            .with_property(
                TraitId::new(FRAME_RANGED_TRAIT),
                "startFrame",
                PropertySource::new(FieldKind::Integer, ["entity.Shot.sg_head_in"]),
            )
            .with_property(
                TraitId::new(FRAME_RANGED_TRAIT),
                "endFrame",
                PropertySource::new(FieldKind::Integer, ["entity.Shot.sg_tail_out"]),
            )
            .with_property(
                TraitId::new(FRAME_RANGED_TRAIT),
                "inFrame",
                PropertySource::new(FieldKind::Integer, ["entity.Shot.sg_cut_in"]),
            )
            .with_property(
                TraitId::new(FRAME_RANGED_TRAIT),
                "outFrame",
                PropertySource::new(FieldKind::Integer, ["entity.Shot.sg_cut_out"]),
            )
    }

    pub fn with_property(
        mut self,
        trait_id: TraitId,
        property: impl Into<String>,
        source: PropertySource,
    ) -> Self {
        self.traits
            .entry(trait_id)
            .or_default()
            .insert(property.into(), source);
        self
    }

    /// Validate the table shape.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (trait_id, properties) in &self.traits {
            let invalid = |reason: &str| ConfigError::InvalidTraitMapping {
                trait_id: trait_id.to_string(),
                reason: reason.to_string(),
            };

            if trait_id.as_str().trim().is_empty() {
                return Err(invalid("trait id must not be empty"));
            }
            if properties.is_empty() {
                return Err(invalid("no properties mapped"));
            }
            for (property, source) in properties {
                if property.trim().is_empty() {
                    return Err(invalid("property name must not be empty"));
                }
                if source.fields.is_empty() {
                    return Err(invalid(&format!(
                        "property '{}' lists no fields",
                        property
                    )));
                }
                if source.fields.iter().any(|field| field.trim().is_empty()) {
                    return Err(invalid(&format!(
                        "property '{}' lists an empty field name",
                        property
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn is_mapped(&self, trait_id: &TraitId) -> bool {
        self.traits.contains_key(trait_id)
    }

    pub fn properties(&self, trait_id: &TraitId) -> Option<&BTreeMap<String, PropertySource>> {
        self.traits.get(trait_id)
    }

    pub fn trait_ids(&self) -> impl Iterator<Item = &TraitId> {
        self.traits.keys()
    }

    /// Record fields needed to populate the given traits, deduplicated
    /// in first-seen order. Unmapped traits contribute nothing.
    pub fn fields_for<'a>(&self, traits: impl IntoIterator<Item = &'a TraitId>) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        for trait_id in traits {
            let Some(properties) = self.traits.get(trait_id) else {
                continue;
            };
            for source in properties.values() {
                for field in &source.fields {
                    if !fields.contains(field) {
                        fields.push(field.clone());
                    }
                }
            }
        }
        fields
    }
}
