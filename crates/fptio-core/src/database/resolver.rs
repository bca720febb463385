use std::sync::Arc;

use super::{DatabaseClient, Record, values};
use crate::config::TraitFieldTable;
use crate::error::ResolveError;
use crate::reference::DatabaseReference;
use crate::traits::{TraitId, TraitSet, TraitsData, suppresses_display_name};

/// Resolves database references through a [`DatabaseClient`].
///
/// Holds no entity state: every call is one fresh query.
#[derive(Clone)]
pub struct DatabaseResolver {
    client: Arc<dyn DatabaseClient>,
    table: TraitFieldTable,
}

impl DatabaseResolver {
    pub fn new(client: Arc<dyn DatabaseClient>, table: TraitFieldTable) -> Self {
        Self { client, table }
    }

    pub fn table(&self) -> &TraitFieldTable {
        &self.table
    }

    /// Requested traits this resolver will try to populate.
    pub fn resolvable<'t>(&self, traits: &'t TraitSet) -> Vec<&'t TraitId> {
        let skip_display_name = suppresses_display_name(traits);
        traits
            .iter()
            .filter(|trait_id| self.table.is_mapped(trait_id))
            .filter(|trait_id| !(skip_display_name && **trait_id == TraitId::display_name()))
            .collect()
    }

    /// Fetch the record and map it onto the requested traits.
    ///
    /// Mapped fields that are absent or unusable leave their property
    /// out; a trait with no resolved property is left out entirely.
    pub fn resolve(
        &self,
        reference: &DatabaseReference,
        traits: &TraitSet,
    ) -> Result<TraitsData, ResolveError> {
        let requested = self.resolvable(traits);
        let fields = self.table.fields_for(requested.iter().copied());
        let record = self.fetch(reference, &fields)?;

        let mut data = TraitsData::new();
        for trait_id in requested {
            let Some(properties) = self.table.properties(trait_id) else {
                continue;
            };
            for (property, source) in properties {
                if let Some(value) = values::first_mapped_value(&record, source) {
                    data.set_property(trait_id, property.clone(), value);
                }
            }
        }

        tracing::debug!(
            "Resolved {} with {} of {} requested traits",
            reference,
            data.len(),
            traits.len()
        );
        Ok(data)
    }

    /// Check the record exists, fetching no fields.
    pub fn exists(&self, reference: &DatabaseReference) -> Result<(), ResolveError> {
        self.fetch(reference, &[]).map(|_| ())
    }

    fn fetch(&self, reference: &DatabaseReference, fields: &[String]) -> Result<Record, ResolveError> {
        tracing::debug!(
            "Querying {} {} for fields {:?}",
            reference.object_type(),
            reference.object_id(),
            fields
        );
        self.client
            .find_one(reference.object_type(), reference.object_id(), fields)
            .map_err(|source| ResolveError::ResolutionBackend {
                reference: reference.to_string(),
                source,
            })?
            .ok_or_else(|| ResolveError::EntityNotFound(reference.to_string()))
    }
}
