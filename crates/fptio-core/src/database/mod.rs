//! Database-backed entities
//!
//! A `fpt://asset/{type}/{id}` reference names one record in the
//! production-tracking database. Resolution is a single fetch of the
//! fields mapped to the requested traits; nothing is cached.

mod resolver;
mod rest;
mod values;

use serde_json::Value;

use crate::error::BackendError;

pub use resolver::DatabaseResolver;
pub use rest::{RestClient, collection_name};
pub use values::{convert_value, first_mapped_value};

/// A fetched record: field name to value, as returned by the service.
pub type Record = serde_json::Map<String, Value>;

/// Client of the remote production-tracking database.
pub trait DatabaseClient: Send + Sync {
    /// Fetch one record with the given fields.
    ///
    /// Returns `Ok(None)` when the service reports no such record.
    fn find_one(
        &self,
        entity_type: &str,
        entity_id: u64,
        fields: &[String],
    ) -> Result<Option<Record>, BackendError>;
}
