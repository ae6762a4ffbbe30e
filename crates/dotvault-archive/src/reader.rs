//! Restore sources
//!
//! A restore source is either a backup tree or an archive file. Both are
//! exposed as a single-pass visitor over [`SourceEntry`] values so the restore
//! loop does not depend on the container format.

use crate::targz::TarGzArchiveReader;
use crate::tree::TreeReader;
use crate::zipfile::ZipArchiveReader;
use dotvault_types::{ArchiveFormat, Error, Result};
use std::io::Read;
use std::ops::ControlFlow;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// One file or directory read from a restore source
pub struct SourceEntry<'a> {
    /// Where the entry comes from, used in conflict reports
    pub source_path: PathBuf,
    /// Sanitized path relative to the restore root
    pub relative_path: PathBuf,
    /// Whether the entry is a directory
    pub is_directory: bool,
    /// Stored permission bits, if the source carries them
    pub mode: Option<u32>,
    /// Stored modification time, if the source carries it
    pub modified: Option<SystemTime>,
    /// Content length in bytes
    pub size: u64,
    /// Entry content, empty for directories
    pub content: &'a mut dyn Read,
}

impl std::fmt::Debug for SourceEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceEntry")
            .field("source_path", &self.source_path)
            .field("relative_path", &self.relative_path)
            .field("is_directory", &self.is_directory)
            .field("mode", &self.mode)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Visitor called for every entry, or for an entry that failed to read
pub type EntryVisitor<'v> = dyn for<'e> FnMut(Result<SourceEntry<'e>>) -> ControlFlow<()> + 'v;

/// A single-pass reader over a restore source
pub trait ArchiveReader {
    /// Number of file entries, 0 if unknown before reading
    fn total_files(&self) -> u64;

    /// Feed every entry to `visit` in stored order
    ///
    /// Per-entry failures are passed to the visitor and reading continues
    /// unless it breaks. An `Err` return means the container itself could not
    /// be read any further.
    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<()>;
}

/// Open a restore source, dispatching on directory or archive extension
pub fn open_source(path: &Path) -> Result<Box<dyn ArchiveReader>> {
    if path.is_dir() {
        return Ok(Box::new(TreeReader::open(path)?));
    }

    match ArchiveFormat::from_path(path) {
        Some(ArchiveFormat::Zip) => Ok(Box::new(ZipArchiveReader::open(path)?)),
        Some(ArchiveFormat::TarGz) => Ok(Box::new(TarGzArchiveReader::open(path)?)),
        None => Err(Error::unsupported_format(path)),
    }
}

/// Turn a stored entry name into a path that stays below the restore root
///
/// Absolute names, drive prefixes and `..` components are rejected.
pub fn sanitize_entry_name(name: &str) -> Result<PathBuf> {
    let normalized = name.replace('\\', "/");
    let mut relative = PathBuf::new();

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::unsafe_entry(name));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(Error::unsafe_entry(name));
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case(".config/nvim/init.vim", ".config/nvim/init.vim")]
    #[case("./.bashrc", ".bashrc")]
    #[case(".config/app/", ".config/app")]
    fn test_sanitize_accepts(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(sanitize_entry_name(name).unwrap(), PathBuf::from(expected));
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case(".config/../../escape")]
    #[case("/etc/passwd")]
    #[case("")]
    #[case("./")]
    fn test_sanitize_rejects(#[case] name: &str) {
        assert!(matches!(
            sanitize_entry_name(name),
            Err(Error::UnsafeEntry { .. })
        ));
    }

    #[test]
    fn test_open_source_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dots.rar");
        std::fs::write(&path, b"not an archive").unwrap();

        let err = open_source(&path).err().unwrap();
        assert_eq!(err, Error::unsupported_format(&path));
    }

    #[test]
    fn test_open_source_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let reader = open_source(dir.path()).unwrap();
        assert_eq!(reader.total_files(), 1);
    }
}
