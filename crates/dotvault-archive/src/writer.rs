//! Backup output sinks
//!
//! Every backup writes through an [`ArchiveWriter`]. The engine feeds it
//! records in traversal order and calls [`ArchiveWriter::finalize`] exactly
//! once, even when some entries failed.

use crate::targz::TarGzArchiveWriter;
use crate::tree::TreeWriter;
use crate::zipfile::ZipArchiveWriter;
use dotvault_types::{ArchiveEntryRecord, ArchiveFormat, Error, ProgressStatus, Result};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Progress cadence for compressed outputs
pub const ARCHIVE_PROGRESS_INTERVAL: u64 = 10;

/// Entries up to this size are read completely before the archive sees them
pub const BUFFERED_ENTRY_LIMIT: u64 = 8 * 1024 * 1024;

/// Content of one entry, either already read or still to be streamed
pub(crate) enum EntryContent<'a> {
    /// The whole file as it was read, whatever its size at walk time
    Buffered(Vec<u8>),
    /// A source larger than [`BUFFERED_ENTRY_LIMIT`]
    Streamed(&'a mut dyn Read),
}

/// Read small sources up front so a failed read never starts an entry
pub(crate) fn read_entry<'a>(
    record: &ArchiveEntryRecord,
    content: &'a mut dyn Read,
) -> Result<EntryContent<'a>> {
    if record.size_bytes > BUFFERED_ENTRY_LIMIT {
        return Ok(EntryContent::Streamed(content));
    }

    let mut buffer = Vec::with_capacity(usize::try_from(record.size_bytes).unwrap_or(0));
    content
        .read_to_end(&mut buffer)
        .map_err(|e| Error::io_at(&record.source_absolute_path, e))?;
    Ok(EntryContent::Buffered(buffer))
}

/// A single-pass sink for backup entries
pub trait ArchiveWriter {
    /// Record a directory met during expansion
    ///
    /// Archives do not store directory entries, so the default does nothing.
    fn add_directory(&mut self, _relative_path: &str) -> Result<()> {
        Ok(())
    }

    /// Write one regular file and return the number of content bytes written
    fn add_entry(&mut self, record: &ArchiveEntryRecord, content: &mut dyn Read) -> Result<u64>;

    /// Flush and close the output, returning its path
    fn finalize(self: Box<Self>) -> Result<PathBuf>;

    /// Emit progress every this many files
    fn progress_interval(&self) -> u64;

    /// Status reported in progress events for written files
    fn status(&self) -> ProgressStatus;

    /// Tree root or archive file being written
    fn output_path(&self) -> &Path;
}

/// Location of the archive file for a destination directory
///
/// `~/Backups/dots` with zip becomes `~/Backups/dots.zip`.
pub fn archive_path_for(destination: &Path, format: ArchiveFormat) -> PathBuf {
    let name = destination
        .file_name()
        .map_or_else(|| "backup".to_string(), |n| n.to_string_lossy().into_owned());
    let file_name = format!("{}.{}", name, format.extension());
    match destination.parent() {
        Some(parent) if destination.file_name().is_some() => parent.join(file_name),
        _ => destination.join(file_name),
    }
}

/// Open a plain directory tree sink rooted at `root`
pub fn create_tree_writer(root: &Path, preserve_permissions: bool) -> Box<dyn ArchiveWriter> {
    Box::new(TreeWriter::new(root, preserve_permissions))
}

/// Open an archive sink of the given format at `path`
pub fn create_archive_writer(
    format: ArchiveFormat,
    path: &Path,
    preserve_permissions: bool,
) -> Result<Box<dyn ArchiveWriter>> {
    let writer: Box<dyn ArchiveWriter> = match format {
        ArchiveFormat::Zip => Box::new(ZipArchiveWriter::create(path, preserve_permissions)?),
        ArchiveFormat::TarGz => Box::new(TarGzArchiveWriter::create(path, preserve_permissions)?),
    };
    Ok(writer)
}
