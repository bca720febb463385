//! fptio Core Library
//!
//! Resolves `fpt://` entity references for Flow Production Tracking:
//! database entities through the production-tracking service, workfiles
//! through the project's path templates, behind one batch-oriented
//! manager facade.

pub mod capability;
pub mod config;
pub mod database;
pub mod error;
pub mod manager;
pub mod reference;
pub mod toolkit;
pub mod traits;
pub mod workfile;

/// Re-exports of commonly used types
pub mod prelude {
    // Manager
    pub use crate::manager::{
        Access, IDENTIFIER, ManagementPolicy, Manager, ManagerBuilder, ManagerInfo, SupportLevel,
    };

    // Configuration
    pub use crate::capability::{Capabilities, Capability};
    pub use crate::config::{ConfigError, HostEnvironment, ManagerSettings, SettingsStore};

    // References
    pub use crate::reference::{DatabaseReference, EntityKind, EntityReference, WorkfileReference};

    // Traits
    pub use crate::traits::{TraitId, TraitSet, TraitsData, trait_set};

    // Errors
    pub use crate::error::{BackendError, ErrorKind, ResolveError};

    // Collaborators
    pub use crate::database::DatabaseClient;
    pub use crate::toolkit::{ProjectContext, ProjectLocator, TemplateRegistry, Toolkit};
}
