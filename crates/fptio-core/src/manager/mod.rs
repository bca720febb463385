//! Manager facade
//!
//! The single entry point for hosts. A batch of reference strings is
//! classified, decoded and routed to the database or workfile resolver;
//! every reference gets its own result so one failure never aborts the
//! rest of the batch.

mod policy;

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::capability::{Capabilities, Capability, CapabilityDetector};
use crate::config::{ConfigError, HostEnvironment, ManagerSettings, TraitFieldTable};
use crate::database::{DatabaseClient, DatabaseResolver, RestClient};
use crate::error::{BackendError, ResolveError};
use crate::reference::{self, EntityReference, REFERENCE_PREFIX};
use crate::toolkit::{PipelineConfigToolkit, ProjectContext, ProjectLocator, Toolkit, ToolkitError};
use crate::traits::{TraitId, TraitSet, TraitsData};
use crate::workfile::{WorkfileResolver, workfile_traits};

pub use policy::{Access, ManagementPolicy, SupportLevel};

/// Stable identifier hosts use to select this manager.
pub const IDENTIFIER: &str = "org.foundry.fpt";
pub const DISPLAY_NAME: &str = "Flow Production Tracking";

/// Outcome for one reference of a batch.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Static description of a manager instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerInfo {
    pub identifier: &'static str,
    pub display_name: &'static str,
    pub entity_reference_prefix: &'static str,
    pub capabilities: Capabilities,
}

pub struct Manager {
    capabilities: Capabilities,
    project: ProjectLocator,
    database: Option<DatabaseResolver>,
    workfiles: WorkfileResolver,
    table: TraitFieldTable,
    toolkit: Option<Arc<dyn Toolkit>>,
    project_context: Mutex<Option<Arc<ProjectContext>>>,
}

impl Manager {
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }

    pub fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    pub fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    pub fn info(&self) -> ManagerInfo {
        ManagerInfo {
            identifier: IDENTIFIER,
            display_name: DISPLAY_NAME,
            entity_reference_prefix: REFERENCE_PREFIX,
            capabilities: self.capabilities,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn project(&self) -> &ProjectLocator {
        &self.project
    }

    /// Cheap check used by hosts to tell references from plain strings.
    pub fn is_entity_reference_string(&self, text: &str) -> bool {
        reference::is_reference(text)
    }

    /// Resolve a batch of references, one result per input, in order.
    pub fn resolve<S: AsRef<str>>(
        &self,
        references: &[S],
        traits: &TraitSet,
        access: Access,
    ) -> Vec<ResolveResult<TraitsData>> {
        references
            .iter()
            .map(|text| self.resolve_one(text.as_ref(), traits, access))
            .collect()
    }

    /// Traits each referenced entity carries.
    ///
    /// Database entities are checked for existence with one query;
    /// workfiles are not looked up at all.
    pub fn entity_traits<S: AsRef<str>>(
        &self,
        references: &[S],
        access: Access,
    ) -> Vec<ResolveResult<TraitSet>> {
        references
            .iter()
            .map(|text| self.entity_traits_one(text.as_ref(), access))
            .collect()
    }

    /// Support level of each trait, consistent with what `resolve`
    /// would attempt.
    pub fn management_policy(&self, traits: &TraitSet, access: Access) -> ManagementPolicy {
        ManagementPolicy::compute(&self.capabilities, &self.table, traits, access)
    }

    /// Whether the project context has been built yet.
    pub fn has_loaded_project_context(&self) -> bool {
        self.project_context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn resolve_one(&self, text: &str, traits: &TraitSet, access: Access) -> ResolveResult<TraitsData> {
        let entity = self.classify(text, access)?;
        self.require(&entity, text)?;

        match &entity {
            EntityReference::Database(database) => {
                tracing::debug!("Routing {} to database resolver", text);
                self.database_resolver(text)?.resolve(database, traits)
            }
            EntityReference::Workfile(workfile) => {
                tracing::debug!("Routing {} to workfile resolver", text);
                let context = self.project_context(text)?;
                self.workfiles.resolve(workfile, traits, &context)
            }
        }
    }

    fn entity_traits_one(&self, text: &str, access: Access) -> ResolveResult<TraitSet> {
        let entity = self.classify(text, access)?;
        self.require(&entity, text)?;

        match &entity {
            EntityReference::Database(database) => {
                self.database_resolver(text)?.exists(database)?;
                Ok([
                    TraitId::entity(),
                    TraitId::locatable_content(),
                    TraitId::display_name(),
                ]
                .into_iter()
                .collect())
            }
            EntityReference::Workfile(_) => Ok(workfile_traits()),
        }
    }

    /// Steps shared by every operation: shape check, decode, access.
    fn classify(&self, text: &str, access: Access) -> ResolveResult<EntityReference> {
        if !reference::is_reference(text) {
            return Err(ResolveError::InvalidReference(text.to_string()));
        }
        let entity = reference::decode(text).map_err(|source| ResolveError::MalformedReference {
            reference: text.to_string(),
            source,
        })?;
        if !access.is_read() {
            return Err(ResolveError::EntityAccess {
                reference: text.to_string(),
            });
        }
        Ok(entity)
    }

    fn require(&self, entity: &EntityReference, text: &str) -> ResolveResult<()> {
        let capability = Capability::for_kind(entity.kind());
        if self.capabilities.supports(capability) {
            Ok(())
        } else {
            tracing::debug!("{} is not available for {}", capability, text);
            Err(ResolveError::CapabilityUnavailable {
                reference: text.to_string(),
                capability,
            })
        }
    }

    fn database_resolver(&self, text: &str) -> ResolveResult<&DatabaseResolver> {
        self.database
            .as_ref()
            .ok_or_else(|| ResolveError::CapabilityUnavailable {
                reference: text.to_string(),
                capability: Capability::DatabaseEntities,
            })
    }

    /// Build the project context on first use and reuse it afterwards.
    ///
    /// Construction happens under the lock, so concurrent callers wait
    /// for the first attempt instead of building their own. A failed
    /// attempt is not remembered and the next call tries again.
    fn project_context(&self, text: &str) -> ResolveResult<Arc<ProjectContext>> {
        let mut slot = self
            .project_context
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(context) = slot.as_ref() {
            return Ok(Arc::clone(context));
        }

        let backend = |source: BackendError| ResolveError::ResolutionBackend {
            reference: text.to_string(),
            source,
        };
        let toolkit = self
            .toolkit
            .as_ref()
            .ok_or_else(|| backend(ToolkitError::NoPipelineConfig.into()))?;
        let context = toolkit
            .load_context(&self.project)
            .map(Arc::new)
            .map_err(|err| backend(err.into()))?;

        tracing::info!(
            "Project context ready (project {:?}, {} templates)",
            context.project_id(),
            context.templates().template_names().len()
        );
        *slot = Some(Arc::clone(&context));
        Ok(context)
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("capabilities", &self.capabilities)
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`Manager`], running capability detection once.
pub struct ManagerBuilder {
    settings: ManagerSettings,
    environment: HostEnvironment,
    database_client: Option<Arc<dyn DatabaseClient>>,
    toolkit: Option<Arc<dyn Toolkit>>,
}

impl ManagerBuilder {
    /// Empty settings, empty environment, built-in toolkit.
    pub fn new() -> Self {
        Self {
            settings: ManagerSettings::default(),
            environment: HostEnvironment::empty(),
            database_client: None,
            toolkit: Some(Arc::new(PipelineConfigToolkit::new())),
        }
    }

    pub fn settings(mut self, settings: ManagerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn environment(mut self, environment: HostEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Use this client instead of the REST client.
    ///
    /// Still only used when credentials are configured.
    pub fn database_client(mut self, client: Arc<dyn DatabaseClient>) -> Self {
        self.database_client = Some(client);
        self
    }

    pub fn toolkit(mut self, toolkit: Arc<dyn Toolkit>) -> Self {
        self.toolkit = Some(toolkit);
        self
    }

    /// Run as if no template toolkit were installed.
    pub fn without_toolkit(mut self) -> Self {
        self.toolkit = None;
        self
    }

    /// Detect capabilities and build the manager.
    ///
    /// Fails only on malformed configuration.
    pub fn build(self) -> Result<Manager, ConfigError> {
        let detection = CapabilityDetector::new(&self.settings, &self.environment)
            .detect(self.toolkit.as_deref())?;
        let table = self.settings.trait_fields();

        let database = match (detection.connection, self.database_client) {
            (Some(_), Some(client)) => Some(DatabaseResolver::new(client, table.clone())),
            (Some(connection), None) => {
                let client = RestClient::new(connection).map_err(ConfigError::DatabaseClient)?;
                Some(DatabaseResolver::new(Arc::new(client), table.clone()))
            }
            (None, Some(_)) => {
                tracing::debug!("Ignoring database client: no credentials configured");
                None
            }
            (None, None) => None,
        };

        Ok(Manager {
            capabilities: detection.capabilities,
            project: detection.project,
            database,
            workfiles: WorkfileResolver::new(),
            table,
            toolkit: self.toolkit,
            project_context: Mutex::new(None),
        })
    }
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
