//! End-to-end: settings file plus an on-disk pipeline configuration,
//! using the built-in template toolkit.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use fptio_core::config::SettingsStore;
use fptio_core::config::environment::{PIPELINE_CONFIG_VAR, PROJECT_ID_VAR};
use fptio_core::config::HostEnvironment;
use fptio_core::error::ErrorKind;
use fptio_core::manager::{Access, Manager};
use fptio_core::traits::{TraitId, trait_set};

fn write_pipeline_config(root: &Path, project_root: &Path) {
    let core = root.join("core");
    fs::create_dir_all(&core).unwrap();
    fs::write(
        core.join("templates.toml"),
        format!(
            r#"
[keys.Shot]
type = "str"

[keys.Step]
type = "str"
filter_by = "alphanumeric"

[keys.version]
type = "int"
format_spec = "03"

[roots]
primary = '{}'

[paths.nuke_shot_work]
definition = "shots/{{Shot}}/{{Step}}/work/nuke/{{Shot}}_{{Step}}.v{{version}}.nk"
"#,
            project_root.display()
        ),
    )
    .unwrap();
}

#[test]
fn project_bound_settings_resolve_workfiles() {
    let temp = TempDir::new().unwrap();
    let pipeline = temp.path().join("pipeline");
    let project_root = temp.path().join("project");
    write_pipeline_config(&pipeline, &project_root);

    let settings_path = temp.path().join("config.toml");
    fs::write(
        &settings_path,
        format!("project_id = 85\npipeline_config = '{}'\n", pipeline.display()),
    )
    .unwrap();
    let settings = SettingsStore::from_path(settings_path).load().unwrap();

    let manager = Manager::builder().settings(settings).build().unwrap();
    let capabilities = manager.capabilities();
    assert!(capabilities.can_resolve_workfiles);
    assert!(!capabilities.can_resolve_database_entities);

    let results = manager.resolve(
        &["fpt://workfile/nuke_shot_work/sh010/comp/12"],
        &trait_set([TraitId::locatable_content()]),
        Access::Read,
    );

    let expected = url::Url::from_file_path(
        project_root.join("shots/sh010/comp/work/nuke/sh010_comp.v012.nk"),
    )
    .unwrap();
    assert_eq!(results[0].as_ref().unwrap().location(), Some(expected.as_str()));
}

#[test]
fn host_environment_supplies_pipeline_config() {
    let temp = TempDir::new().unwrap();
    let pipeline = temp.path().join("pipeline");
    write_pipeline_config(&pipeline, &temp.path().join("project"));

    let env = HostEnvironment::empty()
        .with_var(PIPELINE_CONFIG_VAR, pipeline.display().to_string())
        .with_var(PROJECT_ID_VAR, "85");
    let manager = Manager::builder().environment(env).build().unwrap();

    assert_eq!(manager.project().project_id(), Some(85));
    let results = manager.resolve(
        &["fpt://workfile/nuke_shot_work/sh010/comp-fix/1"],
        &trait_set([TraitId::locatable_content()]),
        Access::Read,
    );
    assert_eq!(
        results[0].as_ref().unwrap_err().kind(),
        ErrorKind::TemplateFieldMismatch
    );
}

#[test]
fn missing_templates_file_disables_workfiles() {
    let temp = TempDir::new().unwrap();
    let env = HostEnvironment::empty().with_var(PIPELINE_CONFIG_VAR, temp.path().display().to_string());

    let manager = Manager::builder().environment(env).build().unwrap();

    assert!(manager.capabilities().has_project_context);
    assert!(!manager.capabilities().can_resolve_workfiles);
}

#[test]
fn broken_templates_file_fails_per_reference() {
    let temp = TempDir::new().unwrap();
    let core = temp.path().join("core");
    fs::create_dir_all(&core).unwrap();
    fs::write(core.join("templates.toml"), "[paths]\nshot = \"{Shot}\"\n").unwrap();

    let env = HostEnvironment::empty().with_var(PIPELINE_CONFIG_VAR, temp.path().display().to_string());
    let manager = Manager::builder().environment(env).build().unwrap();

    let results = manager.resolve(
        &["fpt://workfile/shot/sh010", "plain"],
        &trait_set([TraitId::locatable_content()]),
        Access::Read,
    );
    assert_eq!(
        results[0].as_ref().unwrap_err().kind(),
        ErrorKind::ResolutionBackend
    );
    assert_eq!(results[1].as_ref().unwrap_err().kind(), ErrorKind::InvalidReference);
}

#[test]
fn malformed_settings_fail_loading() {
    let temp = TempDir::new().unwrap();
    let settings_path = temp.path().join("config.toml");
    fs::write(&settings_path, "server_url = \"not a url\"\n").unwrap();

    let err = SettingsStore::from_path(settings_path).load().unwrap_err();
    assert!(format!("{:#}", err).contains("server_url"));
}

#[test]
fn oversized_padding_fails_per_reference() {
    let temp = TempDir::new().unwrap();
    let core = temp.path().join("core");
    fs::create_dir_all(&core).unwrap();
    fs::write(
        core.join("templates.toml"),
        "[keys.version]\ntype = \"int\"\nformat_spec = \"070000\"\n\n[paths]\nv = \"v{version}\"\n",
    )
    .unwrap();

    let env = HostEnvironment::empty().with_var(PIPELINE_CONFIG_VAR, temp.path().display().to_string());
    let manager = Manager::builder().environment(env).build().unwrap();

    let results = manager.resolve(
        &["fpt://workfile/v/3", "fpt://workfile/v/4"],
        &trait_set([TraitId::locatable_content()]),
        Access::Read,
    );
    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(
            result.as_ref().unwrap_err().kind(),
            ErrorKind::ResolutionBackend
        );
    }
}

#[test]
fn dot_field_values_are_rejected() {
    let temp = TempDir::new().unwrap();
    let pipeline = temp.path().join("pipeline");
    write_pipeline_config(&pipeline, &temp.path().join("project"));

    let env = HostEnvironment::empty().with_var(PIPELINE_CONFIG_VAR, pipeline.display().to_string());
    let manager = Manager::builder().environment(env).build().unwrap();

    let results = manager.resolve(
        &["fpt://workfile/nuke_shot_work/../comp/1"],
        &trait_set([TraitId::locatable_content()]),
        Access::Read,
    );
    assert_eq!(
        results[0].as_ref().unwrap_err().kind(),
        ErrorKind::TemplateFieldMismatch
    );
}
