//! Settings schema

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use super::environment::{
    HTTP_PROXY_VAR, HostEnvironment, PIPELINE_CONFIG_VAR, PROJECT_ID_VAR, SERVER_URL_VAR,
    SESSION_TOKEN_VAR,
};
use super::{ConfigError, TraitFieldTable};
use crate::toolkit::ProjectLocator;

/// Manager settings, typically loaded from `config.toml`.
///
/// Empty strings and a zero project id count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerSettings {
    /// Site URL, e.g. "https://studio.shotgrid.autodesk.com"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Script-key auth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Legacy login auth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Pre-established session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,

    /// Project used to scope the pipeline configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,

    /// Root of the pipeline configuration holding `core/templates.toml`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_config: Option<PathBuf>,

    /// Trait to field mapping; the built-in table is used when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<TraitFieldTable>,
}

/// How the manager authenticates against the database service.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Script name and application key
    Script { script_name: String, api_key: String },
    /// Human user login
    User { login: String, password: String },
    /// Session delegated by a desktop launcher or configured directly
    Session { session_token: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Script { script_name, .. } => f
                .debug_struct("Script")
                .field("script_name", script_name)
                .finish_non_exhaustive(),
            Self::User { login, .. } => f
                .debug_struct("User")
                .field("login", login)
                .finish_non_exhaustive(),
            Self::Session { .. } => f.debug_struct("Session").finish_non_exhaustive(),
        }
    }
}

/// Everything needed to reach the database service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub server_url: Url,
    pub credentials: Credentials,
    pub http_proxy: Option<String>,
}

impl ManagerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings that would otherwise fail later at resolve time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = non_empty(&self.server_url) {
            parse_server_url(url)?;
        }
        if let Some(table) = &self.traits {
            table.validate()?;
        }
        Ok(())
    }

    /// Effective trait mapping table.
    pub fn trait_fields(&self) -> TraitFieldTable {
        self.traits.clone().unwrap_or_else(TraitFieldTable::defaults)
    }

    /// Work out the database connection, if credentials are available.
    ///
    /// A delegated desktop session in the environment takes precedence
    /// over configured server and proxy.
    pub fn connection(&self, env: &HostEnvironment) -> Result<Option<Connection>, ConfigError> {
        if let (Some(server_url), Some(session_token)) =
            (env.get(SERVER_URL_VAR), env.get(SESSION_TOKEN_VAR))
        {
            tracing::debug!("Using delegated session from {}", SESSION_TOKEN_VAR);
            return Ok(Some(Connection {
                server_url: parse_server_url(server_url)?,
                credentials: Credentials::Session {
                    session_token: session_token.to_string(),
                },
                http_proxy: env.get(HTTP_PROXY_VAR).map(str::to_string),
            }));
        }

        let Some(server_url) = non_empty(&self.server_url) else {
            return Ok(None);
        };
        let Some(credentials) = self.credentials() else {
            tracing::debug!("Server URL configured without credentials");
            return Ok(None);
        };

        Ok(Some(Connection {
            server_url: parse_server_url(server_url)?,
            credentials,
            http_proxy: non_empty(&self.http_proxy).map(str::to_string),
        }))
    }

    /// Locate the project scope from settings, then the environment.
    pub fn project_locator(&self, env: &HostEnvironment) -> Result<ProjectLocator, ConfigError> {
        let project_id = match self.project_id.filter(|id| *id > 0) {
            Some(id) => Some(id),
            None => env
                .get(PROJECT_ID_VAR)
                .map(|raw| {
                    raw.parse::<u64>()
                        .ok()
                        .filter(|id| *id > 0)
                        .ok_or_else(|| ConfigError::InvalidSetting {
                            key: PROJECT_ID_VAR,
                            reason: format!("'{}' is not a positive integer", raw),
                        })
                })
                .transpose()?,
        };

        let pipeline_config = self
            .pipeline_config
            .clone()
            .filter(|path| !path.as_os_str().is_empty())
            .or_else(|| env.get(PIPELINE_CONFIG_VAR).map(PathBuf::from));

        Ok(ProjectLocator::new(project_id, pipeline_config))
    }

    fn credentials(&self) -> Option<Credentials> {
        if let (Some(script_name), Some(api_key)) =
            (non_empty(&self.script_name), non_empty(&self.api_key))
        {
            return Some(Credentials::Script {
                script_name: script_name.to_string(),
                api_key: api_key.to_string(),
            });
        }
        if let (Some(login), Some(password)) = (non_empty(&self.login), non_empty(&self.password))
        {
            return Some(Credentials::User {
                login: login.to_string(),
                password: password.to_string(),
            });
        }
        non_empty(&self.session_token).map(|token| Credentials::Session {
            session_token: token.to_string(),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn parse_server_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidSetting {
        key: "server_url",
        reason: format!("'{}': {}", raw, e),
    })?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidSetting {
            key: "server_url",
            reason: format!("'{}' must be an http(s) URL", raw),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script_settings() -> ManagerSettings {
        ManagerSettings {
            server_url: Some("https://studio.example.com".to_string()),
            script_name: Some("openassetio".to_string()),
            api_key: Some("secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_connection_with_script_key() {
        let connection = script_settings()
            .connection(&HostEnvironment::empty())
            .unwrap()
            .unwrap();

        assert_eq!(connection.server_url.as_str(), "https://studio.example.com/");
        assert!(matches!(
            connection.credentials,
            Credentials::Script { ref script_name, .. } if script_name == "openassetio"
        ));
    }

    #[test]
    fn test_connection_falls_back_to_login() {
        let settings = ManagerSettings {
            server_url: Some("https://studio.example.com".to_string()),
            script_name: Some(String::new()),
            login: Some("artist".to_string()),
            password: Some("hunter2".to_string()),
            ..Default::default()
        };

        let connection = settings
            .connection(&HostEnvironment::empty())
            .unwrap()
            .unwrap();
        assert!(matches!(connection.credentials, Credentials::User { .. }));
    }

    #[test]
    fn test_connection_without_credentials_is_none() {
        let settings = ManagerSettings {
            server_url: Some("https://studio.example.com".to_string()),
            ..Default::default()
        };
        assert!(settings
            .connection(&HostEnvironment::empty())
            .unwrap()
            .is_none());
        assert!(ManagerSettings::new()
            .connection(&HostEnvironment::empty())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delegated_session_overrides_settings() {
        let env = HostEnvironment::empty()
            .with_var(SERVER_URL_VAR, "https://desktop.example.com")
            .with_var(SESSION_TOKEN_VAR, "abc123")
            .with_var(HTTP_PROXY_VAR, "http://proxy:3128");

        let connection = script_settings().connection(&env).unwrap().unwrap();

        assert_eq!(connection.server_url.as_str(), "https://desktop.example.com/");
        assert_eq!(connection.http_proxy.as_deref(), Some("http://proxy:3128"));
        assert!(matches!(connection.credentials, Credentials::Session { .. }));
    }

    #[test]
    fn test_invalid_server_url_is_config_error() {
        let settings = ManagerSettings {
            server_url: Some("not a url".to_string()),
            ..script_settings()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidSetting {
                key: "server_url",
                ..
            })
        ));
    }

    #[test]
    fn test_project_locator_prefers_settings() {
        let settings = ManagerSettings {
            project_id: Some(85),
            ..Default::default()
        };
        let env = HostEnvironment::empty().with_var(PROJECT_ID_VAR, "12");

        let locator = settings.project_locator(&env).unwrap();
        assert_eq!(locator.project_id(), Some(85));
    }

    #[test]
    fn test_project_locator_from_environment() {
        let env = HostEnvironment::empty()
            .with_var(PROJECT_ID_VAR, "12")
            .with_var(PIPELINE_CONFIG_VAR, "/pipeline/demo");

        let locator = ManagerSettings::new().project_locator(&env).unwrap();
        assert_eq!(locator.project_id(), Some(12));
        assert_eq!(
            locator.pipeline_config(),
            Some(std::path::Path::new("/pipeline/demo"))
        );
    }

    #[test]
    fn test_project_locator_rejects_garbage_env_id() {
        let env = HostEnvironment::empty().with_var(PROJECT_ID_VAR, "demo");
        assert!(ManagerSettings::new().project_locator(&env).is_err());
    }

    #[test]
    fn test_zero_project_id_is_unset() {
        let settings = ManagerSettings {
            project_id: Some(0),
            ..Default::default()
        };
        let locator = settings.project_locator(&HostEnvironment::empty()).unwrap();
        assert_eq!(locator.project_id(), None);
        assert!(!locator.is_known());
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let credentials = Credentials::Script {
            script_name: "openassetio".to_string(),
            api_key: "secret".to_string(),
        };
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("openassetio"));
        assert!(!rendered.contains("secret"));
    }
}
