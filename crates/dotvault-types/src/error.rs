//! Error types and handling for DotVault
//!
//! Engines convert these into plain strings inside their result records for
//! per-file failures, so most variants carry a rendered message rather than a
//! source error.

use std::path::{Path, PathBuf};

/// Main error type for DotVault operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found
        path: PathBuf,
    },

    /// Permission denied
    #[error("Permission denied: {path}")]
    PermissionDenied {
        /// Path to the file with permission issues
        path: PathBuf,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Archive container could not be read or written
    #[error("Archive error: {message}")]
    Archive {
        /// Error message describing the archive issue
        message: String,
    },

    /// Restore source is neither a directory nor a known archive
    #[error("Unsupported archive format: {path}")]
    UnsupportedFormat {
        /// Path whose extension was not recognized
        path: PathBuf,
    },

    /// Path does not live below the home directory
    #[error("Path is outside the home directory: {path}")]
    OutsideHome {
        /// Offending path
        path: PathBuf,
    },

    /// Archive entry name would escape the restore root
    #[error("Unsafe entry path: {name}")]
    UnsafeEntry {
        /// Entry name as stored in the archive
        name: String,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O related errors
    Io,
    /// Configuration errors
    Config,
    /// Archive container errors
    Archive,
    /// Path policy violations
    Path,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::FileNotFound { .. } | Self::PermissionDenied { .. } => {
                ErrorKind::Io
            }
            Self::Config { .. } => ErrorKind::Config,
            Self::Archive { .. } | Self::UnsupportedFormat { .. } => ErrorKind::Archive,
            Self::OutsideHome { .. } | Self::UnsafeEntry { .. } => ErrorKind::Path,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Convert an I/O error that happened while touching `path`
    pub fn io_at(path: impl AsRef<Path>, error: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io {
                message: format!("{}: {}", path.display(), error),
            },
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new archive error
    pub fn archive<S: Into<String>>(message: S) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }

    /// Create a new unsupported format error
    pub fn unsupported_format(path: impl Into<PathBuf>) -> Self {
        Self::UnsupportedFormat { path: path.into() }
    }

    /// Create a new outside-home error
    pub fn outside_home(path: impl Into<PathBuf>) -> Self {
        Self::OutsideHome { path: path.into() }
    }

    /// Create a new unsafe entry error
    pub fn unsafe_entry<S: Into<String>>(name: S) -> Self {
        Self::UnsafeEntry { name: name.into() }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_error_kind_consistency(message in ".*") {
            let errors = vec![
                Error::Io { message: message.clone() },
                Error::Config { message: message.clone() },
                Error::Archive { message: message.clone() },
                Error::Other { message: message.clone() },
            ];

            for error in errors {
                let kind = error.kind();
                match error {
                    Error::Io { .. } => prop_assert_eq!(kind, ErrorKind::Io),
                    Error::Config { .. } => prop_assert_eq!(kind, ErrorKind::Config),
                    Error::Archive { .. } => prop_assert_eq!(kind, ErrorKind::Archive),
                    Error::Other { .. } => prop_assert_eq!(kind, ErrorKind::Other),
                    _ => {}
                }
            }
        }
    }

    #[rstest::rstest]
    #[case(Error::PermissionDenied { path: PathBuf::from("/x") }, ErrorKind::Io)]
    #[case(Error::unsupported_format("/x.rar"), ErrorKind::Archive)]
    #[case(Error::outside_home("/etc/hosts"), ErrorKind::Path)]
    #[case(Error::config("bad level"), ErrorKind::Config)]
    fn test_error_kind_grouping(#[case] error: Error, #[case] expected: ErrorKind) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn test_io_at_maps_not_found() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = Error::io_at("/tmp/missing", err);

        assert_eq!(
            error,
            Error::FileNotFound {
                path: PathBuf::from("/tmp/missing")
            }
        );
        assert_eq!(error.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_io_at_keeps_path_in_message() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let error = Error::io_at("/tmp/out", err);

        let rendered = error.to_string();
        assert!(rendered.contains("/tmp/out"));
        assert!(rendered.contains("disk full"));
    }

    #[test]
    fn test_unsupported_format_message() {
        let error = Error::unsupported_format("/backups/dots.rar");
        assert_eq!(
            error.to_string(),
            "Unsupported archive format: /backups/dots.rar"
        );
        assert_eq!(error.kind(), ErrorKind::Archive);
    }

    #[test]
    fn test_unsafe_entry_message() {
        let error = Error::unsafe_entry("../etc/passwd");
        assert_eq!(error.to_string(), "Unsafe entry path: ../etc/passwd");
        assert_eq!(error.kind(), ErrorKind::Path);
    }
}
