//! Settings store for loading and saving `config.toml`.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{ManagerSettings, parser};

/// File name of the settings file inside the config directory.
pub const SETTINGS_FILE: &str = "config.toml";

#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings_path: PathBuf,
}

impl SettingsStore {
    /// Store at `<config dir>/fptio/config.toml`.
    pub fn from_default_location() -> anyhow::Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("fptio");

        Ok(Self::from_path(config_dir.join(SETTINGS_FILE)))
    }

    pub fn from_path(settings_path: PathBuf) -> Self {
        Self { settings_path }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings; a missing file yields default (unconfigured) settings.
    pub fn load(&self) -> anyhow::Result<ManagerSettings> {
        if !self.settings_path.exists() {
            tracing::debug!(
                "No settings file at {}, using defaults",
                self.settings_path.display()
            );
            return Ok(ManagerSettings::new());
        }
        parser::parse_settings_toml(&self.settings_path)
    }

    pub fn save(&self, settings: &ManagerSettings) -> anyhow::Result<()> {
        let content = parser::to_toml(settings).context("Failed to serialize settings to TOML")?;
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.settings_path, content).with_context(|| {
            format!(
                "Failed to write settings file: {}",
                self.settings_path.display()
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_defaults() {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::from_path(temp.path().join("config.toml"));

        assert_eq!(store.load().unwrap(), ManagerSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::from_path(temp.path().join("nested").join("config.toml"));
        let settings = ManagerSettings {
            server_url: Some("https://studio.example.com".to_string()),
            project_id: Some(4),
            ..Default::default()
        };

        store.save(&settings).unwrap();

        assert_eq!(store.load().unwrap(), settings);
    }
}
