//! Local path-template toolkit
//!
//! Workfile references never touch the database. They are resolved by
//! filling a named path template from the project's pipeline
//! configuration. The toolkit is optional: when none is available, or no
//! project scope is known, workfile resolution is reported as
//! unavailable instead of failing the manager.

mod pipeline_config;
mod template;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

pub use pipeline_config::{PipelineConfigToolkit, TEMPLATES_FILE};
pub use template::{KeyKind, Template, TemplateError, TemplateKey};

/// Failure to load a project's template registry.
#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("no pipeline configuration is known for this project")]
    NoPipelineConfig,

    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid template '{name}'")]
    Template {
        name: String,
        #[source]
        source: TemplateError,
    },
}

/// Named path templates of one project.
pub trait TemplateRegistry: Send + Sync {
    /// Look up a template by name.
    fn template(&self, name: &str) -> Option<Arc<Template>>;

    /// Names of all templates, for listings.
    fn template_names(&self) -> Vec<String>;
}

/// Provider of project contexts.
pub trait Toolkit: Send + Sync {
    /// Whether this toolkit can serve the given project in this process.
    fn is_available(&self, project: &ProjectLocator) -> bool;

    /// Build the project context. Called at most once per manager.
    fn load_context(&self, project: &ProjectLocator) -> Result<ProjectContext, ToolkitError>;
}

/// Where to find the project scope for workfile resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectLocator {
    project_id: Option<u64>,
    pipeline_config: Option<PathBuf>,
}

impl ProjectLocator {
    pub fn new(project_id: Option<u64>, pipeline_config: Option<PathBuf>) -> Self {
        Self {
            project_id,
            pipeline_config,
        }
    }

    pub fn project_id(&self) -> Option<u64> {
        self.project_id
    }

    pub fn pipeline_config(&self) -> Option<&Path> {
        self.pipeline_config.as_deref()
    }

    /// Whether any project scope is configured or discoverable.
    pub fn is_known(&self) -> bool {
        self.project_id.is_some() || self.pipeline_config.is_some()
    }
}

/// Resolved project scope owning the template registry handle.
pub struct ProjectContext {
    project_id: Option<u64>,
    templates: Box<dyn TemplateRegistry>,
}

impl ProjectContext {
    pub fn new(project_id: Option<u64>, templates: Box<dyn TemplateRegistry>) -> Self {
        Self {
            project_id,
            templates,
        }
    }

    pub fn project_id(&self) -> Option<u64> {
        self.project_id
    }

    pub fn templates(&self) -> &dyn TemplateRegistry {
        self.templates.as_ref()
    }
}

impl fmt::Debug for ProjectContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectContext")
            .field("project_id", &self.project_id)
            .field("templates", &self.templates.template_names())
            .finish()
    }
}

/// In-memory template registry.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<String, Arc<Template>>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: Template) {
        self.templates
            .insert(template.name().to_string(), Arc::new(template));
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.insert(template);
        self
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateRegistry for TemplateSet {
    fn template(&self, name: &str) -> Option<Arc<Template>> {
        self.templates.get(name).cloned()
    }

    fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.keys().cloned().collect();
        names.sort();
        names
    }
}
