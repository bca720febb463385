//! Trait vocabulary and resolved trait data.
//!
//! Traits are named categories of metadata a host can request for an
//! entity. Ids follow the OpenAssetIO media-creation trait ids so hosts
//! speaking that vocabulary can pass them straight through.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ENTITY_TRAIT: &str = "openassetio-mediacreation:usage.Entity";
pub const LOCATABLE_CONTENT_TRAIT: &str = "openassetio-mediacreation:content.LocatableContent";
pub const DISPLAY_NAME_TRAIT: &str = "openassetio-mediacreation:identity.DisplayName";
pub const FRAME_RANGED_TRAIT: &str = "openassetio-mediacreation:timeDomain.FrameRanged";
pub const WORK_TRAIT: &str = "openassetio-mediacreation:application.Work";
pub const MANAGED_TRAIT: &str = "openassetio-mediacreation:managementPolicy.Managed";

/// Property of [`LOCATABLE_CONTENT_TRAIT`] holding the entity's URL.
pub const LOCATION_PROPERTY: &str = "location";

/// Identifier of a trait.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraitId(String);

impl TraitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn entity() -> Self {
        Self::new(ENTITY_TRAIT)
    }

    pub fn locatable_content() -> Self {
        Self::new(LOCATABLE_CONTENT_TRAIT)
    }

    pub fn display_name() -> Self {
        Self::new(DISPLAY_NAME_TRAIT)
    }

    pub fn frame_ranged() -> Self {
        Self::new(FRAME_RANGED_TRAIT)
    }

    pub fn work() -> Self {
        Self::new(WORK_TRAIT)
    }

    pub fn managed() -> Self {
        Self::new(MANAGED_TRAIT)
    }

    /// Expand a short alias (`location`, `name`, `frames`, `work`,
    /// `entity`) to its full id. Anything else is taken verbatim.
    pub fn from_alias(alias: &str) -> Self {
        match alias {
            "location" => Self::locatable_content(),
            "name" => Self::display_name(),
            "frames" => Self::frame_ranged(),
            "work" => Self::work(),
            "entity" => Self::entity(),
            other => Self::new(other),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TraitId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A set of trait ids.
pub type TraitSet = BTreeSet<TraitId>;

/// Build a [`TraitSet`] from anything yielding trait ids.
pub fn trait_set<I, T>(ids: I) -> TraitSet
where
    I: IntoIterator<Item = T>,
    T: Into<TraitId>,
{
    ids.into_iter().map(Into::into).collect()
}

/// Work entities are named by the host, so a request that includes the
/// Work trait never gets a display name from the manager.
pub fn suppresses_display_name(traits: &TraitSet) -> bool {
    traits.contains(&TraitId::work())
}

/// Resolved trait properties for one entity.
///
/// A trait is present only when at least one of its properties was
/// resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TraitsData {
    traits: BTreeMap<TraitId, BTreeMap<String, Value>>,
}

impl TraitsData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_property(&mut self, trait_id: &TraitId, property: impl Into<String>, value: Value) {
        self.traits
            .entry(trait_id.clone())
            .or_default()
            .insert(property.into(), value);
    }

    pub fn has_trait(&self, trait_id: &TraitId) -> bool {
        self.traits.contains_key(trait_id)
    }

    pub fn property(&self, trait_id: &TraitId, property: &str) -> Option<&Value> {
        self.traits.get(trait_id)?.get(property)
    }

    pub fn properties(&self, trait_id: &TraitId) -> Option<&BTreeMap<String, Value>> {
        self.traits.get(trait_id)
    }

    pub fn trait_ids(&self) -> impl Iterator<Item = &TraitId> {
        self.traits.keys()
    }

    /// Location URL from the locatable-content trait, if resolved.
    pub fn location(&self) -> Option<&str> {
        self.property(&TraitId::locatable_content(), LOCATION_PROPERTY)?
            .as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }
}
