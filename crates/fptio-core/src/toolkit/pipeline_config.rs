//! Toolkit backed by a pipeline configuration on disk.
//!
//! Reads `<pipeline_config>/core/templates.toml`:
//!
//! ```toml
//! [keys.Shot]
//! type = "str"
//!
//! [keys.version]
//! type = "int"
//! format_spec = "03"
//!
//! [roots]
//! primary = "/mnt/projects/demo"
//!
//! [paths]
//! shot_root = "sequences/{Sequence}/{Shot}"
//!
//! [paths.maya_shot_work]
//! definition = "sequences/{Sequence}/{Shot}/work/maya/{name}.v{version}.ma"
//! root_name = "primary"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use super::template::{KeyKind, Template, TemplateError, TemplateKey};
use super::{ProjectContext, ProjectLocator, TemplateSet, Toolkit, ToolkitError};

/// Location of the template file inside a pipeline configuration.
pub const TEMPLATES_FILE: &str = "core/templates.toml";

const DEFAULT_ROOT: &str = "primary";

#[derive(Debug, Deserialize)]
struct TemplatesFile {
    #[serde(default)]
    keys: BTreeMap<String, KeySpec>,
    #[serde(default)]
    roots: BTreeMap<String, PathBuf>,
    #[serde(default)]
    paths: BTreeMap<String, PathSpec>,
}

#[derive(Debug, Deserialize)]
struct KeySpec {
    #[serde(rename = "type")]
    kind: KeyType,
    #[serde(default)]
    format_spec: Option<String>,
    #[serde(default)]
    filter_by: Option<KeyFilter>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum KeyType {
    Str,
    Int,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum KeyFilter {
    Alphanumeric,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PathSpec {
    Definition(String),
    Detailed {
        definition: String,
        #[serde(default)]
        root_name: Option<String>,
    },
}

/// Toolkit reading templates from the project's pipeline configuration.
///
/// Only available when a pipeline configuration path is known; a bare
/// project id gives a project scope but no templates to read.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfigToolkit;

impl PipelineConfigToolkit {
    pub fn new() -> Self {
        Self
    }

    fn templates_path(project: &ProjectLocator) -> Option<PathBuf> {
        project
            .pipeline_config()
            .map(|root| root.join(TEMPLATES_FILE))
    }

    /// Build a template registry from `templates.toml` content.
    pub fn parse_templates(content: &str) -> Result<TemplateSet, ToolkitError> {
        let file: TemplatesFile = toml::from_str(content).map_err(|e| ToolkitError::Parse {
            path: PathBuf::from(TEMPLATES_FILE),
            message: e.message().to_string(),
        })?;
        build_templates(file)
    }
}

impl Toolkit for PipelineConfigToolkit {
    fn is_available(&self, project: &ProjectLocator) -> bool {
        Self::templates_path(project).is_some_and(|path| path.is_file())
    }

    fn load_context(&self, project: &ProjectLocator) -> Result<ProjectContext, ToolkitError> {
        let path = Self::templates_path(project).ok_or(ToolkitError::NoPipelineConfig)?;

        let content = std::fs::read_to_string(&path).map_err(|source| ToolkitError::Read {
            path: path.clone(),
            source,
        })?;
        let templates = Self::parse_templates(&content).map_err(|err| match err {
            ToolkitError::Parse { message, .. } => ToolkitError::Parse {
                path: path.clone(),
                message,
            },
            other => other,
        })?;

        tracing::info!(
            "Loaded {} templates from {}",
            templates.len(),
            path.display()
        );
        Ok(ProjectContext::new(project.project_id(), Box::new(templates)))
    }
}

fn build_templates(file: TemplatesFile) -> Result<TemplateSet, ToolkitError> {
    let mut declared = BTreeMap::new();
    for (name, spec) in &file.keys {
        let key = build_key(name, spec).map_err(|source| ToolkitError::Template {
            name: name.clone(),
            source,
        })?;
        declared.insert(name.clone(), key);
    }

    let mut templates = TemplateSet::new();
    for (name, spec) in file.paths {
        let (definition, root_name) = match spec {
            PathSpec::Definition(definition) => (definition, None),
            PathSpec::Detailed {
                definition,
                root_name,
            } => (definition, root_name),
        };

        let template = resolve_root(&file.roots, root_name.as_deref())
            .and_then(|root| Template::new(name.clone(), definition, &declared, root))
            .map_err(|source| ToolkitError::Template {
                name: name.clone(),
                source,
            })?;
        templates.insert(template);
    }
    Ok(templates)
}

fn build_key(name: &str, spec: &KeySpec) -> Result<TemplateKey, TemplateError> {
    match spec.kind {
        KeyType::Str => Ok(TemplateKey::new(
            name,
            KeyKind::Str {
                alphanumeric: spec.filter_by == Some(KeyFilter::Alphanumeric),
            },
        )),
        KeyType::Int => match spec.format_spec.as_deref() {
            Some(format_spec) => TemplateKey::integer_with_spec(name, format_spec),
            None => Ok(TemplateKey::integer(name, None)),
        },
    }
}

/// An explicit root must exist; otherwise use `primary` when declared.
fn resolve_root(
    roots: &BTreeMap<String, PathBuf>,
    root_name: Option<&str>,
) -> Result<Option<PathBuf>, TemplateError> {
    match root_name {
        Some(name) => roots
            .get(name)
            .cloned()
            .map(Some)
            .ok_or_else(|| TemplateError::UnknownRoot(name.to_string())),
        None => Ok(roots.get(DEFAULT_ROOT).cloned()),
    }
}
