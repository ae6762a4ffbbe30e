//! Settings loader utilities

use crate::{ConfigError, ConfigResult, Settings, SettingsBuilder};
use std::path::{Path, PathBuf};

/// Settings loader with the common loading patterns
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from the first file found in the default locations
    pub fn load_default() -> ConfigResult<Settings> {
        let mut builder = SettingsBuilder::new().add_defaults();
        if let Some(path) = Self::config_exists() {
            builder = builder.add_source_file(path);
        }
        builder.add_default_env().build()
    }

    /// Load settings from a specific file, which must exist
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Settings> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Configuration file not found",
                ),
            });
        }

        SettingsBuilder::new()
            .add_defaults()
            .add_source_file(path)
            .add_default_env()
            .build()
    }

    /// Load from `path` when given, otherwise from the default locations
    pub fn load(path: Option<&Path>) -> ConfigResult<Settings> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load_default(),
        }
    }

    /// Save settings to a file, format chosen by extension
    pub fn save_to_file<P: AsRef<Path>>(settings: &Settings, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::to_string_pretty(settings)?,
            Some("json") => serde_json::to_string_pretty(settings)?,
            _ => serde_yaml::to_string(settings)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write the default settings to `path`
    pub fn generate_default<P: AsRef<Path>>(path: P) -> ConfigResult<()> {
        Self::save_to_file(&Settings::default(), path)
    }

    /// Candidate settings files in order of preference
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("dotvault.yaml"),
            PathBuf::from("dotvault.yml"),
            PathBuf::from("dotvault.toml"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let dotvault_dir = config_dir.join("dotvault");
            paths.push(dotvault_dir.join("config.yaml"));
            paths.push(dotvault_dir.join("config.yml"));
            paths.push(dotvault_dir.join("config.toml"));
        }

        paths
    }

    /// First default settings file that exists
    pub fn config_exists() -> Option<PathBuf> {
        Self::default_config_paths()
            .into_iter()
            .find(|path| path.exists())
    }
}
