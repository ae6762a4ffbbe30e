//! Settings builder layering defaults, files and environment variables

use crate::{ConfigError, ConfigResult, Settings, ENV_PREFIX};
use config::{ConfigBuilder as ConfigBuilderInner, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Builder loading [`Settings`] from multiple sources
#[derive(Debug)]
pub struct SettingsBuilder {
    inner: ConfigBuilderInner<config::builder::DefaultState>,
    sources: Vec<SettingsSource>,
    env_separator: String,
}

#[derive(Debug, Clone)]
enum SettingsSource {
    File { path: PathBuf, format: FileFormat },
    Environment { prefix: String },
}

impl SettingsBuilder {
    /// Create a new settings builder
    pub fn new() -> Self {
        Self {
            inner: config::Config::builder(),
            sources: Vec::new(),
            env_separator: "__".to_string(),
        }
    }

    /// Start from the built-in defaults
    ///
    /// Defaults are always the base layer; this exists for readability at
    /// call sites.
    pub fn add_defaults(self) -> Self {
        self
    }

    /// Add a settings file, format detected from the extension
    ///
    /// A file that does not exist is ignored.
    pub fn add_source_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = Self::detect_format(&path);
        self.sources.push(SettingsSource::File { path, format });
        self
    }

    /// Add environment overrides for `prefix`
    pub fn add_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.sources.push(SettingsSource::Environment {
            prefix: prefix.into(),
        });
        self
    }

    /// Add the standard `DOTVAULT__*` environment overrides
    pub fn add_default_env(self) -> Self {
        self.add_env_prefix(ENV_PREFIX)
    }

    /// Set the environment key separator (default: "__")
    pub fn env_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.env_separator = separator.into();
        self
    }

    /// Layer all sources and validate the result
    pub fn build(mut self) -> ConfigResult<Settings> {
        let defaults_value = serde_yaml::to_value(Settings::default())
            .map_err(|e| ConfigError::other(format!("Failed to serialize defaults: {}", e)))?;
        self.inner = self
            .inner
            .add_source(config::Config::try_from(&defaults_value)?);

        for source in &self.sources {
            match source {
                SettingsSource::File { path, format } => {
                    if path.exists() {
                        self.inner = self
                            .inner
                            .add_source(File::from(path.clone()).format(*format));
                    }
                }
                SettingsSource::Environment { prefix } => {
                    self.inner = self.inner.add_source(
                        Environment::with_prefix(prefix)
                            .separator(&self.env_separator)
                            .list_separator(",")
                            .with_list_parse_key("backup.exclude_patterns")
                            .try_parsing(true),
                    );
                }
            }
        }

        let settings: Settings = self.inner.build()?.try_deserialize()?;
        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Build, falling back to defaults on any error
    pub fn build_or_default(self) -> Settings {
        self.build().unwrap_or_default()
    }

    fn detect_format(path: &Path) -> FileFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }

    /// Check values the type system cannot
    pub fn validate(settings: &Settings) -> ConfigResult<()> {
        if !LOG_LEVELS.contains(&settings.logging.level.as_str()) {
            return Err(ConfigError::validation(
                "Log level must be one of: trace, debug, info, warn, error",
            ));
        }

        if settings.backup.backup_directory.trim().is_empty() {
            return Err(ConfigError::validation("Backup directory must not be empty"));
        }

        if settings
            .backup
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.is_empty())
        {
            return Err(ConfigError::validation("Exclude patterns must not be empty"));
        }

        Ok(())
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotvault_types::{ArchiveFormat, ConflictPolicy};
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn yaml_file(body: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "{}", body).unwrap();
        file
    }

    #[test]
    fn test_builder_defaults() {
        let settings = SettingsBuilder::new().add_defaults().build().unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_builder_yaml_file() {
        let file = yaml_file(
            r#"
backup:
  compress: true
  archive_format: tar_gz
  exclude_patterns: ["*.swp"]
restore:
  conflict_policy: skip
"#,
        );

        let settings = SettingsBuilder::new()
            .add_defaults()
            .add_source_file(file.path())
            .build()
            .unwrap();

        assert!(settings.backup.compress);
        assert_eq!(settings.backup.archive_format, ArchiveFormat::TarGz);
        assert_eq!(settings.backup.exclude_patterns, vec!["*.swp".to_string()]);
        assert_eq!(settings.restore.conflict_policy, ConflictPolicy::Skip);
        assert!(settings.restore.preserve_permissions);
    }

    #[test]
    fn test_builder_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"\njson_format = true").unwrap();

        let settings = SettingsBuilder::new()
            .add_source_file(file.path())
            .build()
            .unwrap();
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json_format);
    }

    #[test]
    fn test_missing_file_is_ignored() {
        let settings = SettingsBuilder::new()
            .add_source_file("/definitely/not/here/dotvault.yaml")
            .build()
            .unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_builder_validation() {
        let file = yaml_file("logging:\n  level: loud\n");
        let result = SettingsBuilder::new().add_source_file(file.path()).build();

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Log level must be one of"));
    }

    #[test]
    fn test_empty_exclude_pattern_rejected() {
        let file = yaml_file("backup:\n  exclude_patterns: [\"\"]\n");
        let result = SettingsBuilder::new().add_source_file(file.path()).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = yaml_file("backup:\n  compress: false\n");
        // Unique prefix keeps parallel tests independent
        std::env::set_var("DVTESTENV__BACKUP__COMPRESS", "true");
        std::env::set_var("DVTESTENV__LOGGING__LEVEL", "warn");

        let settings = SettingsBuilder::new()
            .add_source_file(file.path())
            .add_env_prefix("DVTESTENV")
            .build()
            .unwrap();

        std::env::remove_var("DVTESTENV__BACKUP__COMPRESS");
        std::env::remove_var("DVTESTENV__LOGGING__LEVEL");

        assert!(settings.backup.compress);
        assert_eq!(settings.logging.level, "warn");
    }
}
