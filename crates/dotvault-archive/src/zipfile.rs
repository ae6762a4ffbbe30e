//! Zip backups with DEFLATE entries
//!
//! Mode bits travel in the entry's external attributes. The `zip` crate keeps
//! only the `0o777` permission bits there, so setuid, setgid and sticky bits
//! are lost. Tar and tree backups keep all of `0o7777`.

use crate::metadata::MODE_MASK;
use crate::reader::{sanitize_entry_name, ArchiveReader, EntryVisitor, SourceEntry};
use crate::writer::{read_entry, ArchiveWriter, EntryContent, ARCHIVE_PROGRESS_INTERVAL};
use dotvault_types::{ArchiveEntryRecord, Error, ProgressStatus, Result};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Render a zip error with the archive path
fn zip_error(path: &Path, error: ZipError) -> Error {
    match error {
        ZipError::Io(e) => Error::io_at(path, e),
        other => Error::archive(format!("{}: {}", path.display(), other)),
    }
}

/// Streams entries into a new zip file
///
/// Sources up to [`BUFFERED_ENTRY_LIMIT`](crate::BUFFERED_ENTRY_LIMIT) are read
/// before the entry starts, so a failed read leaves nothing behind. Larger
/// sources are streamed, and a read failure or a size change is reported as
/// an error after the partial entry has been written.
pub struct ZipArchiveWriter {
    path: PathBuf,
    writer: ZipWriter<File>,
    preserve_permissions: bool,
}

impl ZipArchiveWriter {
    /// Create the archive file, truncating any existing one
    pub fn create(path: &Path, preserve_permissions: bool) -> Result<Self> {
        let file = File::create(path).map_err(|e| Error::io_at(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: ZipWriter::new(file),
            preserve_permissions,
        })
    }

    fn options_for(&self, record: &ArchiveEntryRecord) -> FileOptions {
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(record.size_bytes >= u64::from(u32::MAX));

        match record.permission_bits {
            Some(mode) if self.preserve_permissions => options.unix_permissions(mode & MODE_MASK),
            _ => options,
        }
    }
}

impl std::fmt::Debug for ZipArchiveWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipArchiveWriter")
            .field("path", &self.path)
            .field("preserve_permissions", &self.preserve_permissions)
            .finish_non_exhaustive()
    }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn add_entry(&mut self, record: &ArchiveEntryRecord, content: &mut dyn Read) -> Result<u64> {
        let content = read_entry(record, content)?;
        let options = self.options_for(record);
        self.writer
            .start_file(record.relative_path.as_str(), options)
            .map_err(|e| zip_error(&self.path, e))?;

        let written = match content {
            EntryContent::Buffered(buffer) => {
                self.writer
                    .write_all(&buffer)
                    .map_err(|e| Error::io_at(&self.path, e))?;
                buffer.len() as u64
            }
            EntryContent::Streamed(reader) => {
                let written = io::copy(reader, &mut self.writer)
                    .map_err(|e| Error::io_at(&record.source_absolute_path, e))?;
                if written != record.size_bytes {
                    return Err(Error::io_at(
                        &record.source_absolute_path,
                        io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!(
                                "file changed while archiving, {} of {} bytes written",
                                written, record.size_bytes
                            ),
                        ),
                    ));
                }
                written
            }
        };

        debug!("Archived {} ({} bytes)", record.relative_path, written);
        Ok(written)
    }

    fn finalize(self: Box<Self>) -> Result<PathBuf> {
        let Self {
            path, mut writer, ..
        } = *self;
        let file = writer.finish().map_err(|e| zip_error(&path, e))?;
        file.sync_all().map_err(|e| Error::io_at(&path, e))?;
        Ok(path)
    }

    fn progress_interval(&self) -> u64 {
        ARCHIVE_PROGRESS_INTERVAL
    }

    fn status(&self) -> ProgressStatus {
        ProgressStatus::Archived
    }

    fn output_path(&self) -> &Path {
        &self.path
    }
}

/// Reads entries back out of a zip file
pub struct ZipArchiveReader {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl ZipArchiveReader {
    /// Open an existing zip file
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io_at(path, e))?;
        let archive = ZipArchive::new(file).map_err(|e| zip_error(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }
}

impl std::fmt::Debug for ZipArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipArchiveReader")
            .field("path", &self.path)
            .field("entries", &self.archive.len())
            .finish()
    }
}

impl ArchiveReader for ZipArchiveReader {
    fn total_files(&self) -> u64 {
        self.archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .count() as u64
    }

    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<()> {
        for index in 0..self.archive.len() {
            let mut file = match self.archive.by_index(index) {
                Ok(file) => file,
                Err(e) => {
                    if visit(Err(zip_error(&self.path, e))).is_break() {
                        break;
                    }
                    continue;
                }
            };

            let name = file.name().to_string();
            let relative_path = match sanitize_entry_name(&name) {
                Ok(relative) => relative,
                Err(error) => {
                    if visit(Err(error)).is_break() {
                        break;
                    }
                    continue;
                }
            };

            let is_directory = file.is_dir();
            let mode = file.unix_mode().map(|mode| mode & MODE_MASK);
            let size = file.size();

            let flow = visit(Ok(SourceEntry {
                source_path: self.path.join(&relative_path),
                relative_path,
                is_directory,
                mode,
                modified: None,
                size,
                content: &mut file,
            }));
            if flow.is_break() {
                break;
            }
        }

        Ok(())
    }
}
