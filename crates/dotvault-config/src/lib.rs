//! Layered settings for DotVault
//!
//! Settings come from built-in defaults, an optional YAML/TOML/JSON file and
//! `DOTVAULT__*` environment variables, in that order of precedence.
//!
//! # Examples
//!
//! ```rust
//! use dotvault_config::{Settings, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new()
//!     .add_defaults()
//!     .build()
//!     .expect("defaults are valid");
//!
//! let options = settings.backup_options();
//! assert!(!options.compress);
//! assert_eq!(settings.backup.backup_directory, "~/Backups");
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use dotvault_types::{ArchiveFormat, BackupOptions, ConflictPolicy, RestoreOptions};
use serde::{Deserialize, Serialize};

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::SettingsBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::SettingsLoader;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "DOTVAULT";

/// Complete DotVault settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Backup defaults
    pub backup: BackupSettings,
    /// Restore defaults
    pub restore: RestoreSettings,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Settings {
    /// Per-run backup options derived from these settings
    pub fn backup_options(&self) -> BackupOptions {
        BackupOptions {
            compress: self.backup.compress,
            archive_format: self.backup.archive_format,
            preserve_permissions: self.backup.preserve_permissions,
            follow_symlinks: self.backup.follow_symlinks,
            skip_hidden: self.backup.skip_hidden,
            exclude_patterns: self.backup.exclude_patterns.clone(),
            create_timestamp_subfolder: self.backup.create_timestamp_folder,
        }
    }

    /// Per-run restore options derived from these settings
    pub fn restore_options(&self) -> RestoreOptions {
        RestoreOptions {
            preserve_permissions: self.restore.preserve_permissions,
        }
    }
}

/// Backup section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    /// Default destination, may start with `~`
    pub backup_directory: String,
    /// Write an archive instead of a plain tree
    pub compress: bool,
    /// Archive format when compressing
    pub archive_format: ArchiveFormat,
    /// Keep mode bits and mtimes
    pub preserve_permissions: bool,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
    /// Skip dot-prefixed entries below selections
    pub skip_hidden: bool,
    /// Put plain copies in a timestamped folder
    pub create_timestamp_folder: bool,
    /// Ordered exclude patterns
    pub exclude_patterns: Vec<String>,
}

impl Default for BackupSettings {
    fn default() -> Self {
        let options = BackupOptions::default();
        Self {
            backup_directory: "~/Backups".to_string(),
            compress: options.compress,
            archive_format: options.archive_format,
            preserve_permissions: options.preserve_permissions,
            follow_symlinks: options.follow_symlinks,
            skip_hidden: options.skip_hidden,
            create_timestamp_folder: options.create_timestamp_subfolder,
            exclude_patterns: options.exclude_patterns,
        }
    }
}

/// Restore section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreSettings {
    /// Apply stored modes and mtimes
    pub preserve_permissions: bool,
    /// What to do when a target already exists
    pub conflict_policy: ConflictPolicy,
}

impl Default for RestoreSettings {
    fn default() -> Self {
        Self {
            preserve_permissions: true,
            conflict_policy: ConflictPolicy::Overwrite,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable JSON formatting
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}
