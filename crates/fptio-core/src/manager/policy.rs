//! Per-trait support levels reported to hosts before they resolve.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::capability::Capabilities;
use crate::config::TraitFieldTable;
use crate::reference::EntityKind;
use crate::traits::{TraitId, TraitSet, suppresses_display_name};

/// Intent of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    #[default]
    Read,
    /// Publishing; not supported, every entity is read-only
    Write,
}

impl Access {
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read)
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

impl FromStr for Access {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            other => Err(format!("unknown access mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportLevel {
    Unsupported,
    /// Attempted, but may be absent from a successful result
    Partial,
    Supported,
}

impl SupportLevel {
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

impl fmt::Display for SupportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "unsupported"),
            Self::Partial => write!(f, "partial"),
            Self::Supported => write!(f, "supported"),
        }
    }
}

/// Support level of every requested trait, per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManagementPolicy {
    pub database: BTreeMap<TraitId, SupportLevel>,
    pub workfile: BTreeMap<TraitId, SupportLevel>,
}

impl ManagementPolicy {
    /// Derive the policy from the same inputs `resolve` acts on.
    pub fn compute(
        capabilities: &Capabilities,
        table: &TraitFieldTable,
        traits: &TraitSet,
        access: Access,
    ) -> Self {
        let no_display_name = suppresses_display_name(traits);
        let mut policy = Self::default();

        for trait_id in traits {
            let (database, workfile) = if !access.is_read() {
                (SupportLevel::Unsupported, SupportLevel::Unsupported)
            } else {
                (
                    database_level(capabilities, table, trait_id, no_display_name),
                    workfile_level(capabilities, trait_id),
                )
            };
            policy.database.insert(trait_id.clone(), database);
            policy.workfile.insert(trait_id.clone(), workfile);
        }
        policy
    }

    pub fn for_kind(&self, kind: EntityKind) -> &BTreeMap<TraitId, SupportLevel> {
        match kind {
            EntityKind::Database => &self.database,
            EntityKind::Workfile => &self.workfile,
        }
    }

    /// Level for one trait; traits not in the query are unsupported.
    pub fn support(&self, kind: EntityKind, trait_id: &TraitId) -> SupportLevel {
        self.for_kind(kind)
            .get(trait_id)
            .copied()
            .unwrap_or(SupportLevel::Unsupported)
    }

    /// Whether any queried trait is worth requesting for this kind.
    pub fn is_managed(&self, kind: EntityKind) -> bool {
        self.for_kind(kind).values().any(SupportLevel::is_supported)
    }
}

fn database_level(
    capabilities: &Capabilities,
    table: &TraitFieldTable,
    trait_id: &TraitId,
    no_display_name: bool,
) -> SupportLevel {
    if !capabilities.can_resolve_database_entities || !table.is_mapped(trait_id) {
        return SupportLevel::Unsupported;
    }
    if *trait_id == TraitId::display_name() && no_display_name {
        return SupportLevel::Unsupported;
    }
    if *trait_id == TraitId::locatable_content() {
        SupportLevel::Supported
    } else {
        SupportLevel::Partial
    }
}

fn workfile_level(capabilities: &Capabilities, trait_id: &TraitId) -> SupportLevel {
    if capabilities.can_resolve_workfiles && *trait_id == TraitId::locatable_content() {
        SupportLevel::Supported
    } else {
        SupportLevel::Unsupported
    }
}
