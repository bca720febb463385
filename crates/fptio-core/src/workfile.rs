//! Workfile resolution by template substitution.
//!
//! Never touches the network and never checks that the produced path
//! exists. Capability checks happen in the manager before a context is
//! handed over.

use std::path::Path;

use serde_json::Value;
use url::Url;

use crate::error::ResolveError;
use crate::reference::WorkfileReference;
use crate::toolkit::{ProjectContext, TemplateError};
use crate::traits::{LOCATION_PROPERTY, TraitId, TraitSet, TraitsData};

/// Traits a workfile entity carries.
pub fn workfile_traits() -> TraitSet {
    [TraitId::entity(), TraitId::locatable_content()]
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkfileResolver;

impl WorkfileResolver {
    pub fn new() -> Self {
        Self
    }

    /// Substitute the reference's field values into its template.
    ///
    /// Only the location is produced; it is left out when the caller did
    /// not ask for it, but the substitution is still validated.
    pub fn resolve(
        &self,
        reference: &WorkfileReference,
        traits: &TraitSet,
        context: &ProjectContext,
    ) -> Result<TraitsData, ResolveError> {
        let template_name = reference.template_name();
        let template = context.templates().template(template_name).ok_or_else(|| {
            ResolveError::UnknownTemplate {
                reference: reference.to_string(),
                template: template_name.to_string(),
            }
        })?;

        let path = template
            .apply(reference.field_values())
            .map_err(|err| mismatch(reference, err))?;

        let mut data = TraitsData::new();
        let location = TraitId::locatable_content();
        if traits.contains(&location) {
            match path_url(&path) {
                Some(url) => data.set_property(&location, LOCATION_PROPERTY, Value::String(url)),
                None => tracing::warn!(
                    "Template '{}' produced a relative path {}; no root configured?",
                    template_name,
                    path.display()
                ),
            }
        }

        tracing::debug!("Resolved {} to {}", reference, path.display());
        Ok(data)
    }
}

fn mismatch(reference: &WorkfileReference, err: TemplateError) -> ResolveError {
    ResolveError::TemplateFieldMismatch {
        reference: reference.to_string(),
        template: reference.template_name().to_string(),
        reason: err.to_string(),
    }
}

fn path_url(path: &Path) -> Option<String> {
    Url::from_file_path(path).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::*;
    use crate::error::ErrorKind;
    use crate::toolkit::{Template, TemplateKey, TemplateSet};
    use crate::traits::trait_set;

    fn context() -> ProjectContext {
        let keys: BTreeMap<String, TemplateKey> = [
            TemplateKey::string("Shot"),
            TemplateKey::string("Step"),
            TemplateKey::integer("version", Some(3)),
        ]
        .into_iter()
        .map(|key| (key.name().to_string(), key))
        .collect();

        let templates = TemplateSet::new()
            .with_template(
                Template::new(
                    "maya_shot_work",
                    "shots/{Shot}/{Step}/work/scene.ma",
                    &keys,
                    Some(PathBuf::from("/mnt/projects/demo")),
                )
                .unwrap(),
            )
            .with_template(Template::new("relative", "shots/{Shot}", &keys, None).unwrap());

        ProjectContext::new(Some(85), Box::new(templates))
    }

    fn reference(template: &str, fields: &[&str]) -> WorkfileReference {
        WorkfileReference::new(template, fields.iter().copied()).unwrap()
    }

    #[test]
    fn test_resolves_location() {
        let data = WorkfileResolver::new()
            .resolve(
                &reference("maya_shot_work", &["0010", "compositing"]),
                &trait_set([TraitId::locatable_content()]),
                &context(),
            )
            .unwrap();

        assert_eq!(
            data.location(),
            Some("file:///mnt/projects/demo/shots/0010/compositing/work/scene.ma")
        );
    }

    #[test]
    fn test_location_only_when_requested() {
        let data = WorkfileResolver::new()
            .resolve(
                &reference("maya_shot_work", &["0010", "compositing"]),
                &trait_set([TraitId::display_name()]),
                &context(),
            )
            .unwrap();

        assert!(data.is_empty());
    }

    #[test]
    fn test_unknown_template() {
        let err = WorkfileResolver::new()
            .resolve(
                &reference("nuke_shot_work", &["0010"]),
                &trait_set([TraitId::locatable_content()]),
                &context(),
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnknownTemplate);
    }

    #[test]
    fn test_arity_mismatch() {
        for fields in [&["0010"][..], &[][..], &["0010", "comp", "extra"][..]] {
            let err = WorkfileResolver::new()
                .resolve(
                    &reference("maya_shot_work", fields),
                    &trait_set([TraitId::locatable_content()]),
                    &context(),
                )
                .unwrap_err();

            assert_eq!(err.kind(), ErrorKind::TemplateFieldMismatch);
        }
    }

    #[test]
    fn test_relative_template_yields_no_location() {
        let data = WorkfileResolver::new()
            .resolve(
                &reference("relative", &["0010"]),
                &trait_set([TraitId::locatable_content()]),
                &context(),
            )
            .unwrap();

        assert!(data.location().is_none());
    }

    #[test]
    fn test_workfile_traits() {
        let traits = workfile_traits();
        assert!(traits.contains(&TraitId::entity()));
        assert!(traits.contains(&TraitId::locatable_content()));
        assert_eq!(traits.len(), 2);
    }
}
