//! Entity reference types.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use super::codec::{self, REFERENCE_PREFIX};

/// Reasons a string fails to decode as an entity reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("missing 'fpt://' prefix")]
    MissingPrefix,

    #[error("unknown reference category '{0}'")]
    UnknownCategory(String),

    #[error("'{category}' references expect {expected} path segments, found {found}")]
    SegmentCount {
        category: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("object id '{0}' is not a positive integer")]
    InvalidObjectId(String),

    #[error("{what} '{value}' must be a non-empty token without '/'")]
    InvalidSegment { what: &'static str, value: String },
}

/// Which resolution path a reference takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    /// Record in the production-tracking database
    Database,
    /// File derived from a local path template
    Workfile,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => f.write_str("database"),
            Self::Workfile => f.write_str("workfile"),
        }
    }
}

/// A decoded entity reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityReference {
    /// `fpt://asset/{type}/{id}`
    Database(DatabaseReference),
    /// `fpt://workfile/{template}/{fields...}`
    Workfile(WorkfileReference),
}

impl EntityReference {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Database(_) => EntityKind::Database,
            Self::Workfile(_) => EntityKind::Workfile,
        }
    }

    /// Check if this is a database reference.
    pub fn is_database(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Check if this is a workfile reference.
    pub fn is_workfile(&self) -> bool {
        matches!(self, Self::Workfile(_))
    }

    pub fn as_database(&self) -> Option<&DatabaseReference> {
        match self {
            Self::Database(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn as_workfile(&self) -> Option<&WorkfileReference> {
        match self {
            Self::Workfile(reference) => Some(reference),
            _ => None,
        }
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(reference) => reference.fmt(f),
            Self::Workfile(reference) => reference.fmt(f),
        }
    }
}

impl FromStr for EntityReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        codec::decode(s)
    }
}

impl From<DatabaseReference> for EntityReference {
    fn from(reference: DatabaseReference) -> Self {
        Self::Database(reference)
    }
}

impl From<WorkfileReference> for EntityReference {
    fn from(reference: WorkfileReference) -> Self {
        Self::Workfile(reference)
    }
}

/// Reference to a database record, keyed by entity type and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatabaseReference {
    object_type: String,
    object_id: u64,
}

impl DatabaseReference {
    /// Create a reference, rejecting empty/slashed types and a zero id.
    pub fn new(object_type: impl Into<String>, object_id: u64) -> Result<Self, ReferenceError> {
        let object_type = object_type.into();
        validate_segment("object type", &object_type)?;
        if object_id == 0 {
            return Err(ReferenceError::InvalidObjectId(object_id.to_string()));
        }
        Ok(Self {
            object_type,
            object_id,
        })
    }

    /// Remote schema type name (e.g. "PublishedFile").
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn object_id(&self) -> u64 {
        self.object_id
    }
}

impl fmt::Display for DatabaseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}/{}/{}",
            REFERENCE_PREFIX,
            codec::ASSET_CATEGORY,
            self.object_type,
            self.object_id
        )
    }
}

/// Reference to a workfile: a template name plus positional field values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkfileReference {
    template_name: String,
    field_values: Vec<String>,
}

impl WorkfileReference {
    pub fn new<I, S>(template_name: impl Into<String>, field_values: I) -> Result<Self, ReferenceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let template_name = template_name.into();
        validate_segment("template name", &template_name)?;

        let field_values: Vec<String> = field_values.into_iter().map(Into::into).collect();
        for value in &field_values {
            validate_segment("field value", value)?;
        }

        Ok(Self {
            template_name,
            field_values,
        })
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    /// Field values in template slot order.
    pub fn field_values(&self) -> &[String] {
        &self.field_values
    }
}

impl fmt::Display for WorkfileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}/{}",
            REFERENCE_PREFIX,
            codec::WORKFILE_CATEGORY,
            self.template_name
        )?;
        for value in &self.field_values {
            write!(f, "/{}", value)?;
        }
        Ok(())
    }
}

fn validate_segment(what: &'static str, value: &str) -> Result<(), ReferenceError> {
    if value.is_empty() || value.contains('/') {
        return Err(ReferenceError::InvalidSegment {
            what,
            value: value.to_string(),
        });
    }
    Ok(())
}
