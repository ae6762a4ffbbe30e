//! Error types for settings management

use dotvault_types::Error as DotvaultError;
use std::path::PathBuf;
use thiserror::Error;

/// Settings error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading or writing a settings file
    #[error("I/O error on config file '{path}': {source}")]
    Io {
        /// Path to the settings file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Settings file parsing error
    #[error("Failed to parse config file '{path}': {message}")]
    Parse {
        /// Path to the settings file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Settings validation error
    #[error("Configuration validation failed: {message}")]
    Validation {
        /// Validation error message
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Generic settings error
    #[error("Configuration error: {message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(error: config::ConfigError) -> Self {
        Self::Other {
            message: error.to_string(),
        }
    }
}

impl From<ConfigError> for DotvaultError {
    fn from(error: ConfigError) -> Self {
        DotvaultError::config(error.to_string())
    }
}

/// Result type for settings operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}
