//! Inclusion policy applied while expanding selected entries
//!
//! Exclude patterns use plain name matching, not globs:
//!
//! - `*suffix` matches file names ending in `suffix`
//! - `dir/` matches files whose parent path contains `dir`
//! - anything else must equal the file name
//!
//! The glob matcher in [`crate::glob`] has different semantics and is not
//! consulted here.

use crate::paths::is_hidden;
use dotvault_types::BackupOptions;
use std::fs::FileType;
use std::path::Path;

/// Why a walked entry was left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Matched this exclude pattern
    Excluded(String),
    /// Dot-prefixed while hidden files are skipped
    Hidden,
    /// Symbolic link while links are not followed
    Symlink,
}

/// Per-run inclusion policy built from [`BackupOptions`]
#[derive(Debug, Clone, Default)]
pub struct PathPolicy {
    exclude_patterns: Vec<String>,
    skip_hidden: bool,
    follow_symlinks: bool,
}

impl PathPolicy {
    /// Build the policy for one run
    pub fn from_options(options: &BackupOptions) -> Self {
        Self {
            exclude_patterns: options.exclude_patterns.clone(),
            skip_hidden: options.skip_hidden,
            follow_symlinks: options.follow_symlinks,
        }
    }

    /// Whether symbolic links should be traversed
    pub fn follow_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// First exclude pattern matching a regular file, if any
    pub fn matching_pattern(&self, file_path: &Path) -> Option<&str> {
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        let parent = file_path
            .parent()
            .map(|p| p.to_string_lossy())
            .unwrap_or_default();

        self.exclude_patterns
            .iter()
            .find(|pattern| pattern_matches(pattern, &file_name, &parent))
            .map(String::as_str)
    }

    /// Whether a regular file is excluded by pattern
    pub fn should_skip(&self, file_path: &Path) -> bool {
        self.matching_pattern(file_path).is_some()
    }

    /// Decide whether a walked entry below a selected root is left out
    ///
    /// `file_type` is the type as reported by the walk, which is the link
    /// itself when links are not followed.
    pub fn evaluate(&self, path: &Path, file_type: FileType, is_symlink: bool) -> Option<SkipReason> {
        if self.skip_hidden && is_hidden(path) {
            return Some(SkipReason::Hidden);
        }
        if is_symlink && !self.follow_symlinks {
            return Some(SkipReason::Symlink);
        }
        if file_type.is_file() {
            if let Some(pattern) = self.matching_pattern(path) {
                return Some(SkipReason::Excluded(pattern.to_string()));
            }
        }
        None
    }
}

/// Evaluate exclude patterns for one file
pub fn should_skip(file_path: &Path, options: &BackupOptions) -> bool {
    PathPolicy::from_options(options).should_skip(file_path)
}

fn pattern_matches(pattern: &str, file_name: &str, parent: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix('*') {
        file_name.ends_with(suffix)
    } else if let Some(dir) = pattern.strip_suffix('/') {
        parent.contains(dir)
    } else {
        file_name == pattern
    }
}
