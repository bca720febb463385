#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

use fptio_core::config::ManagerSettings;
use fptio_core::database::{DatabaseClient, Record};
use fptio_core::error::BackendError;
use fptio_core::manager::Manager;
use fptio_core::toolkit::{
    ProjectContext, ProjectLocator, Template, TemplateKey, TemplateRegistry, Toolkit, ToolkitError,
};

/// In-memory database keyed by (type, id), counting queries.
#[derive(Default)]
pub struct StubDatabase {
    records: HashMap<(String, u64), Record>,
    failure: Option<String>,
    queries: AtomicUsize,
    requested_fields: Mutex<Vec<Vec<String>>>,
}

impl StubDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, entity_type: &str, entity_id: u64, record: Value) -> Self {
        let record = match record {
            Value::Object(map) => map,
            other => panic!("record must be an object, got {other}"),
        };
        self.records
            .insert((entity_type.to_string(), entity_id), record);
        self
    }

    /// Every query fails with a transport-style error.
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn requested_fields(&self) -> Vec<Vec<String>> {
        self.requested_fields.lock().unwrap().clone()
    }
}

impl DatabaseClient for StubDatabase {
    fn find_one(
        &self,
        entity_type: &str,
        entity_id: u64,
        fields: &[String],
    ) -> Result<Option<Record>, BackendError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.requested_fields.lock().unwrap().push(fields.to_vec());
        if let Some(reason) = &self.failure {
            return Err(BackendError::Other(reason.clone()));
        }
        Ok(self
            .records
            .get(&(entity_type.to_string(), entity_id))
            .cloned())
    }
}

/// Template registry counting lookups.
pub struct StubRegistry {
    templates: HashMap<String, Arc<Template>>,
    lookups: Arc<AtomicUsize>,
}

impl TemplateRegistry for StubRegistry {
    fn template(&self, name: &str) -> Option<Arc<Template>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.templates.get(name).cloned()
    }

    fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Toolkit serving the shot templates, counting context loads.
pub struct StubToolkit {
    available: bool,
    fail_first: AtomicUsize,
    loads: AtomicUsize,
    lookups: Arc<AtomicUsize>,
}

impl StubToolkit {
    pub fn new() -> Self {
        Self {
            available: true,
            fail_first: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Fail the first `count` loads.
    pub fn failing_first(count: usize) -> Self {
        Self {
            fail_first: AtomicUsize::new(count),
            ..Self::new()
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Toolkit for StubToolkit {
    fn is_available(&self, _project: &ProjectLocator) -> bool {
        self.available
    }

    fn load_context(&self, project: &ProjectLocator) -> Result<ProjectContext, ToolkitError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ToolkitError::NoPipelineConfig);
        }

        let registry = StubRegistry {
            templates: shot_templates()
                .into_iter()
                .map(|t| (t.name().to_string(), Arc::new(t)))
                .collect(),
            lookups: Arc::clone(&self.lookups),
        };
        Ok(ProjectContext::new(project.project_id(), Box::new(registry)))
    }
}

pub const PROJECT_ROOT: &str = "/mnt/projects/demo";

pub fn shot_templates() -> Vec<Template> {
    let keys: BTreeMap<String, TemplateKey> = [
        TemplateKey::string("Shot"),
        TemplateKey::string("Step"),
        TemplateKey::integer("version", Some(3)),
    ]
    .into_iter()
    .map(|key| (key.name().to_string(), key))
    .collect();

    vec![
        Template::new(
            "maya_shot_work",
            "shots/{Shot}/{Step}/work/maya/scene.v{version}.ma",
            &keys,
            Some(PROJECT_ROOT.into()),
        )
        .unwrap(),
        Template::new(
            "shot_root",
            "shots/{Shot}/{Step}",
            &keys,
            Some(PROJECT_ROOT.into()),
        )
        .unwrap(),
    ]
}

pub fn published_file() -> Value {
    serde_json::json!({
        "id": 123,
        "type": "PublishedFile",
        "code": "comp.v003.exr",
        "path": {
            "local_path": "/mnt/show/comp/comp.v003.exr",
            "url": "file:///mnt/show/comp/comp.v003.exr",
            "link_type": "local"
        }
    })
}

/// Standalone: database credentials only.
pub fn standalone() -> ManagerSettings {
    ManagerSettings {
        server_url: Some("https://studio.example.com".to_string()),
        script_name: Some("openassetio".to_string()),
        api_key: Some("secret".to_string()),
        ..Default::default()
    }
}

/// Project-bound standalone: credentials plus a project.
pub fn project_bound() -> ManagerSettings {
    ManagerSettings {
        project_id: Some(85),
        ..standalone()
    }
}

/// Project known, but no database credentials.
pub fn offline_project() -> ManagerSettings {
    ManagerSettings {
        project_id: Some(85),
        ..Default::default()
    }
}

pub fn build(
    settings: ManagerSettings,
    database: &Arc<StubDatabase>,
    toolkit: &Arc<StubToolkit>,
) -> Manager {
    Manager::builder()
        .settings(settings)
        .database_client(database.clone())
        .toolkit(toolkit.clone())
        .build()
        .unwrap()
}
