//! Capability detection
//!
//! What a manager can resolve depends on the deployment: a standalone
//! process may only have database credentials, a project-bound one also
//! knows its project, and a host launched by the desktop app inherits a
//! delegated session and a pipeline configuration. Detection runs once
//! when the manager is built and the result never changes afterwards.

use std::fmt;

use serde::Serialize;

use crate::config::{Connection, ConfigError, HostEnvironment, ManagerSettings};
use crate::reference::EntityKind;
use crate::toolkit::{ProjectLocator, Toolkit};

/// A resolution path that may or may not be configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    DatabaseEntities,
    Workfiles,
}

impl Capability {
    /// Capability required to resolve references of the given kind.
    pub fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Database => Self::DatabaseEntities,
            EntityKind::Workfile => Self::Workfiles,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DatabaseEntities => write!(f, "database entity resolution"),
            Self::Workfiles => write!(f, "workfile resolution"),
        }
    }
}

/// Immutable snapshot of the usable resolution paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_resolve_database_entities: bool,
    pub can_resolve_workfiles: bool,
    pub has_project_context: bool,
}

impl Capabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::DatabaseEntities => self.can_resolve_database_entities,
            Capability::Workfiles => self.can_resolve_workfiles,
        }
    }

    pub fn supports_kind(&self, kind: EntityKind) -> bool {
        self.supports(Capability::for_kind(kind))
    }
}

/// Outcome of detection: the descriptor plus what it was derived from.
#[derive(Debug, Clone)]
pub struct Detection {
    pub capabilities: Capabilities,
    /// Database connection, when credentials were found
    pub connection: Option<Connection>,
    /// Project scope for workfile resolution
    pub project: ProjectLocator,
}

pub struct CapabilityDetector<'a> {
    settings: &'a ManagerSettings,
    env: &'a HostEnvironment,
}

impl<'a> CapabilityDetector<'a> {
    pub fn new(settings: &'a ManagerSettings, env: &'a HostEnvironment) -> Self {
        Self { settings, env }
    }

    /// Inspect settings, environment and toolkit.
    ///
    /// Missing optional pieces only switch capabilities off. Malformed
    /// settings are the one failure reported here.
    pub fn detect(&self, toolkit: Option<&dyn Toolkit>) -> Result<Detection, ConfigError> {
        self.settings.validate()?;

        let connection = self.settings.connection(self.env)?;
        let project = self.settings.project_locator(self.env)?;

        let toolkit_available = toolkit.is_some_and(|toolkit| toolkit.is_available(&project));
        let has_project_context = project.is_known();

        let capabilities = Capabilities {
            can_resolve_database_entities: connection.is_some(),
            can_resolve_workfiles: toolkit_available && has_project_context,
            has_project_context,
        };

        tracing::info!(
            "Detected capabilities: database={}, workfiles={}, project={}",
            capabilities.can_resolve_database_entities,
            capabilities.can_resolve_workfiles,
            capabilities.has_project_context
        );
        if has_project_context && !toolkit_available {
            tracing::debug!("Project scope known but no template toolkit is available");
        }

        Ok(Detection {
            capabilities,
            connection,
            project,
        })
    }
}
