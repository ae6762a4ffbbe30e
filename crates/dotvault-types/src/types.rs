//! Core data types for DotVault
//!
//! Inputs supplied by the catalog collaborator, the immutable per-run option
//! records and the result values handed back after a backup or restore.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

/// File size in bytes
pub type FileSize = u64;

/// A filesystem entry chosen for backup
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SelectedEntry {
    /// Absolute or `~`-relative path
    pub path: String,
    /// Whether the entry is a directory
    pub is_directory: bool,
    /// Whether the entry exists on disk
    pub exists: bool,
    /// Size in bytes, recursive for directories
    pub size_bytes: FileSize,
}

impl SelectedEntry {
    /// Create a new selected entry
    pub fn new(path: impl Into<String>, is_directory: bool, exists: bool, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            is_directory,
            exists,
            size_bytes,
        }
    }
}

/// Compressed container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ArchiveFormat {
    /// Zip with DEFLATE entries
    #[default]
    Zip,
    /// Tar stream wrapped in gzip
    TarGz,
}

impl ArchiveFormat {
    /// File extension appended to the destination name, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }

    /// Detect the format of an archive file by its extension
    ///
    /// Matching is case-insensitive and accepts `.zip`, `.tar.gz` and `.tgz`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zip => write!(f, "zip"),
            Self::TarGz => write!(f, "tar_gz"),
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zip" => Ok(Self::Zip),
            "tar_gz" | "tar-gz" | "tar.gz" | "tgz" => Ok(Self::TarGz),
            other => Err(crate::Error::config(format!(
                "Unknown archive format '{}', expected zip or tar_gz",
                other
            ))),
        }
    }
}

/// Options for a single backup run
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BackupOptions {
    /// Write an archive instead of a plain tree
    pub compress: bool,
    /// Archive format used when compressing
    pub archive_format: ArchiveFormat,
    /// Carry POSIX mode bits (and mtimes for plain copies)
    pub preserve_permissions: bool,
    /// Follow symbolic links during directory walks
    pub follow_symlinks: bool,
    /// Skip dot-prefixed files and directories below selected entries
    pub skip_hidden: bool,
    /// Ordered exclude patterns, first match wins
    pub exclude_patterns: Vec<String>,
    /// Put plain copies under a `backup_<timestamp>` folder
    pub create_timestamp_subfolder: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            compress: false,
            archive_format: ArchiveFormat::Zip,
            preserve_permissions: true,
            follow_symlinks: false,
            skip_hidden: false,
            exclude_patterns: vec!["*.log".to_string(), "cache".to_string(), ".cache".to_string()],
            create_timestamp_subfolder: true,
        }
    }
}

impl BackupOptions {
    /// Enable compression with the given format
    pub fn compressed(mut self, format: ArchiveFormat) -> Self {
        self.compress = true;
        self.archive_format = format;
        self
    }

    /// Replace the exclude patterns
    pub fn with_exclude_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Toggle the timestamp subfolder
    pub fn with_timestamp_subfolder(mut self, enabled: bool) -> Self {
        self.create_timestamp_subfolder = enabled;
        self
    }
}

/// Options for a single restore run
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RestoreOptions {
    /// Apply stored mode bits and mtimes to restored files
    pub preserve_permissions: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            preserve_permissions: true,
        }
    }
}

/// A file discovered during directory expansion
///
/// Lives only for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntryRecord {
    /// POSIX-style path relative to the home directory
    pub relative_path: String,
    /// Where the content is read from
    pub source_absolute_path: PathBuf,
    /// Size in bytes at discovery time
    pub size_bytes: FileSize,
    /// Mode bits, present when permissions are preserved
    pub permission_bits: Option<u32>,
    /// Last modification time, when known
    pub modified: Option<SystemTime>,
    /// Whether the record describes a directory
    pub is_directory: bool,
}

/// What happened to the file named in a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProgressStatus {
    /// Copied into a plain backup tree
    Copied,
    /// Added to an archive
    Archived,
    /// Written during restore
    Restored,
    /// Left untouched because of a conflict decision
    Skipped,
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Copied => "Copied",
            Self::Archived => "Archived",
            Self::Restored => "Restored",
            Self::Skipped => "Skipped",
        };
        f.write_str(label)
    }
}

/// Progress snapshot delivered to the caller's callback
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProgressEvent {
    /// File that was just handled
    pub current_path: PathBuf,
    /// Files handled so far
    pub files_processed: u64,
    /// Total files, 0 if unknown
    pub total_files: u64,
    /// Bytes handled so far
    pub bytes_processed: u64,
    /// Total bytes, 0 if unknown
    pub total_bytes: u64,
    /// Outcome for `current_path`
    pub status: ProgressStatus,
}

impl ProgressEvent {
    /// Completion ratio in `0.0..=1.0`, preferring bytes over files
    pub fn fraction(&self) -> f64 {
        if self.total_bytes > 0 {
            (self.bytes_processed as f64 / self.total_bytes as f64).min(1.0)
        } else if self.total_files > 0 {
            (self.files_processed as f64 / self.total_files as f64).min(1.0)
        } else {
            0.0
        }
    }
}

/// Summary of a backup run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BackupResult {
    /// Headline status, see the partial-success rule
    pub success: bool,
    /// Backup tree root or archive file
    pub output_path: PathBuf,
    /// Files written
    pub total_files: u64,
    /// Bytes written
    pub total_bytes: u64,
    /// Wall-clock duration
    pub duration_ms: u64,
    /// Per-file and setup errors
    pub errors: Vec<String>,
    /// Paths left out by policy
    pub skipped_files: Vec<String>,
}

impl BackupResult {
    /// Build an immediate failure carrying a single error
    pub fn failed(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            duration_ms,
            errors: vec![error.into()],
            ..Self::default()
        }
    }
}

/// Kind of restore conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConflictKind {
    /// Something already exists at the target path
    AlreadyExists,
}

/// Decision returned by a conflict resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConflictResolution {
    /// Replace the existing file
    #[default]
    Overwrite,
    /// Keep the existing file and move on
    Skip,
    /// Move the existing file to `<name>.bak`, then write
    Rename,
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => write!(f, "overwrite"),
            Self::Skip => write!(f, "skip"),
            Self::Rename => write!(f, "rename"),
        }
    }
}

/// Conflict handling chosen in settings or on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConflictPolicy {
    /// Always replace existing files
    #[default]
    Overwrite,
    /// Always keep existing files
    Skip,
    /// Always move existing files aside
    Rename,
    /// Ask per conflict, falling back to overwrite without a prompt
    Ask,
}

impl FromStr for ConflictPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            "rename" => Ok(Self::Rename),
            "ask" => Ok(Self::Ask),
            other => Err(crate::Error::config(format!(
                "Unknown conflict policy '{}', expected overwrite, skip, rename or ask",
                other
            ))),
        }
    }
}

/// A restore target that already exists
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConflictInfo {
    /// Where the incoming content comes from (file or archive entry)
    pub source_path: PathBuf,
    /// Target that already exists
    pub destination_path: PathBuf,
    /// Conflict kind
    pub kind: ConflictKind,
    /// Decision taken, filled in once the resolver has answered
    pub resolution: Option<ConflictResolution>,
}

impl ConflictInfo {
    /// Create an unresolved already-exists conflict
    pub fn already_exists(source_path: PathBuf, destination_path: PathBuf) -> Self {
        Self {
            source_path,
            destination_path,
            kind: ConflictKind::AlreadyExists,
            resolution: None,
        }
    }
}

/// Summary of a restore run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RestoreResult {
    /// No errors, or at least one file restored
    pub success: bool,
    /// File entries enumerated from the source
    pub total_files: u64,
    /// Files written
    pub restored_files: u64,
    /// Files left untouched by conflict decisions
    pub skipped_files: u64,
    /// Wall-clock duration
    pub duration_ms: u64,
    /// Per-file and setup errors
    pub errors: Vec<String>,
    /// Non-fatal notes such as renames
    pub warnings: Vec<String>,
    /// Every conflict met, with its resolution
    pub conflicts: Vec<ConflictInfo>,
}

impl RestoreResult {
    /// Build an immediate failure carrying a single error
    pub fn failed(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            duration_ms,
            errors: vec![error.into()],
            ..Self::default()
        }
    }
}

/// Lifecycle of an engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EngineState {
    /// No run has started or the engine was reset
    Idle,
    /// A run is in flight
    Running,
    /// The last run finished normally
    Completed,
    /// The last run stopped early on a cancel request
    Cancelled,
}
