//! Manager configuration
//!
//! Settings come from a TOML file (credentials, project, trait mapping)
//! layered with a snapshot of the host process environment, which can
//! supply a delegated session or a project when the manager runs inside
//! a launched host application.

pub mod environment;
pub mod parser;
pub mod schema;
pub mod store;
pub mod trait_fields;

use thiserror::Error;

use crate::error::BackendError;

pub use environment::HostEnvironment;
pub use parser::{parse_settings_toml, parse_settings_toml_str, to_toml};
pub use schema::{Connection, Credentials, ManagerSettings};
pub use store::SettingsStore;
pub use trait_fields::{FieldKind, PropertySource, TraitFieldTable};

/// Deployment misconfiguration detected while constructing a manager.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid trait mapping for '{trait_id}': {reason}")]
    InvalidTraitMapping { trait_id: String, reason: String },

    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("failed to initialise database client")]
    DatabaseClient(#[source] BackendError),
}
