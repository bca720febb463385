//! Per-reference resolution errors.

use serde::Serialize;
use thiserror::Error;

use crate::capability::Capability;
use crate::reference::ReferenceError;
use crate::toolkit::ToolkitError;

/// Stable classification of a [`ResolveError`] for hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedReference,
    InvalidReference,
    CapabilityUnavailable,
    EntityNotFound,
    UnknownTemplate,
    TemplateFieldMismatch,
    ResolutionBackend,
    EntityAccess,
}

/// Failure to resolve one reference of a batch.
///
/// Always reported at that reference's position; never aborts a batch.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Entity identifier is malformed: {source}")]
    MalformedReference {
        reference: String,
        #[source]
        source: ReferenceError,
    },

    #[error("'{0}' is not an entity reference")]
    InvalidReference(String),

    #[error("Cannot resolve '{reference}': {capability} is not available")]
    CapabilityUnavailable {
        reference: String,
        capability: Capability,
    },

    #[error("Entity '{0}' not found")]
    EntityNotFound(String),

    #[error("Unknown template '{template}' in '{reference}'")]
    UnknownTemplate { reference: String, template: String },

    #[error("Fields of '{reference}' do not match template '{template}': {reason}")]
    TemplateFieldMismatch {
        reference: String,
        template: String,
        reason: String,
    },

    #[error("Failed to resolve '{reference}'")]
    ResolutionBackend {
        reference: String,
        #[source]
        source: BackendError,
    },

    #[error("Entities are read-only")]
    EntityAccess { reference: String },
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedReference { .. } => ErrorKind::MalformedReference,
            Self::InvalidReference(_) => ErrorKind::InvalidReference,
            Self::CapabilityUnavailable { .. } => ErrorKind::CapabilityUnavailable,
            Self::EntityNotFound(_) => ErrorKind::EntityNotFound,
            Self::UnknownTemplate { .. } => ErrorKind::UnknownTemplate,
            Self::TemplateFieldMismatch { .. } => ErrorKind::TemplateFieldMismatch,
            Self::ResolutionBackend { .. } => ErrorKind::ResolutionBackend,
            Self::EntityAccess { .. } => ErrorKind::EntityAccess,
        }
    }

    /// The reference text the error refers to.
    pub fn reference(&self) -> &str {
        match self {
            Self::MalformedReference { reference, .. }
            | Self::CapabilityUnavailable { reference, .. }
            | Self::UnknownTemplate { reference, .. }
            | Self::TemplateFieldMismatch { reference, .. }
            | Self::ResolutionBackend { reference, .. }
            | Self::EntityAccess { reference } => reference,
            Self::InvalidReference(reference) | Self::EntityNotFound(reference) => reference,
        }
    }
}

/// Transport, auth or toolkit failure underneath a resolver.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("authentication with {server} failed: {reason}")]
    Authentication { server: String, reason: String },

    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("failed to start I/O runtime")]
    Runtime(#[source] std::io::Error),

    #[error("failed to load project context")]
    Toolkit(#[from] ToolkitError),

    #[error("{0}")]
    Other(String),
}
