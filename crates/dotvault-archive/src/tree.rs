//! Plain directory tree backups

use crate::metadata::{apply_modified, apply_permission_bits, clear_target, permission_bits};
use crate::reader::{ArchiveReader, EntryVisitor, SourceEntry};
use crate::writer::ArchiveWriter;
use dotvault_types::{ArchiveEntryRecord, Error, ProgressStatus, Result};
use std::fs::{self, File};
use std::io::{self, Read};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Writes entries as ordinary files below a root directory
#[derive(Debug)]
pub struct TreeWriter {
    root: PathBuf,
    preserve_permissions: bool,
}

impl TreeWriter {
    /// Create a writer rooted at an existing directory
    pub fn new(root: impl Into<PathBuf>, preserve_permissions: bool) -> Self {
        Self {
            root: root.into(),
            preserve_permissions,
        }
    }

    fn target_for(&self, relative_path: &str) -> PathBuf {
        relative_path
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl ArchiveWriter for TreeWriter {
    fn add_directory(&mut self, relative_path: &str) -> Result<()> {
        let target = self.target_for(relative_path);
        fs::create_dir_all(&target).map_err(|e| Error::io_at(&target, e))
    }

    fn add_entry(&mut self, record: &ArchiveEntryRecord, content: &mut dyn Read) -> Result<u64> {
        let target = self.target_for(&record.relative_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
        }

        clear_target(&target)?;
        let mut out = File::create(&target).map_err(|e| Error::io_at(&target, e))?;
        let written = io::copy(content, &mut out).map_err(|e| Error::io_at(&target, e))?;
        drop(out);

        if self.preserve_permissions {
            if let Some(mode) = record.permission_bits {
                apply_permission_bits(&target, mode)?;
            }
            if let Some(modified) = record.modified {
                apply_modified(&target, modified)?;
            }
        }

        debug!("Copied {} ({} bytes)", target.display(), written);
        Ok(written)
    }

    fn finalize(self: Box<Self>) -> Result<PathBuf> {
        Ok(self.root)
    }

    fn progress_interval(&self) -> u64 {
        1
    }

    fn status(&self) -> ProgressStatus {
        ProgressStatus::Copied
    }

    fn output_path(&self) -> &Path {
        &self.root
    }
}

/// Reads a plain backup tree as a restore source
#[derive(Debug)]
pub struct TreeReader {
    root: PathBuf,
    total_files: u64,
}

impl TreeReader {
    /// Open a backup tree and count its regular files
    pub fn open(root: &Path) -> Result<Self> {
        let metadata = fs::metadata(root).map_err(|e| Error::io_at(root, e))?;
        if !metadata.is_dir() {
            return Err(Error::other(format!(
                "Restore source is not a directory: {}",
                root.display()
            )));
        }

        let total_files = WalkDir::new(root)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .count() as u64;

        Ok(Self {
            root: root.to_path_buf(),
            total_files,
        })
    }
}

impl ArchiveReader for TreeReader {
    fn total_files(&self) -> u64 {
        self.total_files
    }

    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<()> {
        let walker = WalkDir::new(&self.root).min_depth(1).sort_by_file_name();

        for item in walker {
            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let error = Error::other(format!("Failed to read {}: {}", path.display(), e));
                    if visit(Err(error)).is_break() {
                        break;
                    }
                    continue;
                }
            };

            let file_type = entry.file_type();
            if !file_type.is_dir() && !file_type.is_file() {
                debug!("Ignoring non-regular entry {}", entry.path().display());
                continue;
            }

            let relative_path = entry
                .path()
                .strip_prefix(&self.root)
                .map(Path::to_path_buf)
                .map_err(|_| Error::unsafe_entry(entry.path().display().to_string()))?;

            let mut empty = io::empty();
            let flow = if file_type.is_dir() {
                visit(Ok(SourceEntry {
                    source_path: entry.path().to_path_buf(),
                    relative_path,
                    is_directory: true,
                    mode: None,
                    modified: None,
                    size: 0,
                    content: &mut empty,
                }))
            } else {
                match open_with_metadata(entry.path()) {
                    Ok((mut file, metadata)) => visit(Ok(SourceEntry {
                        source_path: entry.path().to_path_buf(),
                        relative_path,
                        is_directory: false,
                        mode: permission_bits(&metadata),
                        modified: metadata.modified().ok(),
                        size: metadata.len(),
                        content: &mut file,
                    })),
                    Err(error) => visit(Err(error)),
                }
            };

            if let ControlFlow::Break(()) = flow {
                break;
            }
        }

        Ok(())
    }
}

fn open_with_metadata(path: &Path) -> Result<(File, fs::Metadata)> {
    let file = File::open(path).map_err(|e| Error::io_at(path, e))?;
    let metadata = file.metadata().map_err(|e| Error::io_at(path, e))?;
    Ok((file, metadata))
}
