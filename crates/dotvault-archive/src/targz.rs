//! Tar backups wrapped in gzip
//!
//! Headers are GNU style so long entry names are written as `@LongLink`
//! records instead of being truncated.

use crate::metadata::{unix_seconds, DEFAULT_FILE_MODE, MODE_MASK};
use crate::reader::{sanitize_entry_name, ArchiveReader, EntryVisitor, SourceEntry};
use crate::writer::{read_entry, ArchiveWriter, EntryContent, ARCHIVE_PROGRESS_INTERVAL};
use dotvault_types::{ArchiveEntryRecord, Error, ProgressStatus, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tar::{Archive, Builder, EntryType, Header};
use tracing::debug;

/// Yields exactly `remaining` bytes, zero-padding if the source ends early
///
/// Tar headers carry the size up front, so a file that shrinks between stat
/// and read must still fill its slot for the stream to stay readable.
struct ExactSizeReader<'a> {
    inner: &'a mut dyn Read,
    remaining: u64,
    padded: u64,
}

impl Read for ExactSizeReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let limit = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let mut n = self.inner.read(&mut buf[..limit])?;
        if n == 0 {
            buf[..limit].fill(0);
            self.padded += limit as u64;
            n = limit;
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Streams entries into a new `.tar.gz` file
///
/// Sources up to [`BUFFERED_ENTRY_LIMIT`](crate::BUFFERED_ENTRY_LIMIT) are read
/// before the header is written, so the header carries the size actually read
/// and a failed read leaves nothing behind. Larger sources are streamed
/// against the size recorded at walk time. A short read is zero-padded and
/// reported as an error, but the padded entry stays in the archive.
pub struct TarGzArchiveWriter {
    path: PathBuf,
    builder: Builder<GzEncoder<File>>,
    preserve_permissions: bool,
}

impl TarGzArchiveWriter {
    /// Create the archive file, truncating any existing one
    pub fn create(path: &Path, preserve_permissions: bool) -> Result<Self> {
        let file = File::create(path).map_err(|e| Error::io_at(path, e))?;
        let encoder = GzEncoder::new(file, Compression::default());
        Ok(Self {
            path: path.to_path_buf(),
            builder: Builder::new(encoder),
            preserve_permissions,
        })
    }

    fn header_for(&self, record: &ArchiveEntryRecord) -> Header {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(record.size_bytes);

        let mode = match record.permission_bits {
            Some(bits) if self.preserve_permissions => bits & MODE_MASK,
            _ => DEFAULT_FILE_MODE,
        };
        header.set_mode(mode);
        header.set_mtime(record.modified.map_or(0, unix_seconds));
        header
    }
}

impl std::fmt::Debug for TarGzArchiveWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarGzArchiveWriter")
            .field("path", &self.path)
            .field("preserve_permissions", &self.preserve_permissions)
            .finish_non_exhaustive()
    }
}

impl ArchiveWriter for TarGzArchiveWriter {
    fn add_entry(&mut self, record: &ArchiveEntryRecord, content: &mut dyn Read) -> Result<u64> {
        let mut header = self.header_for(record);
        let name = Path::new(&record.relative_path);

        let written = match read_entry(record, content)? {
            EntryContent::Buffered(buffer) => {
                header.set_size(buffer.len() as u64);
                self.builder
                    .append_data(&mut header, name, buffer.as_slice())
                    .map_err(|e| Error::io_at(&self.path, e))?;
                buffer.len() as u64
            }
            EntryContent::Streamed(reader) => {
                let mut exact = ExactSizeReader {
                    inner: reader,
                    remaining: record.size_bytes,
                    padded: 0,
                };
                self.builder
                    .append_data(&mut header, name, &mut exact)
                    .map_err(|e| Error::io_at(&record.source_absolute_path, e))?;

                if exact.padded > 0 {
                    return Err(Error::io_at(
                        &record.source_absolute_path,
                        io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!("file shrank while archiving, {} bytes padded", exact.padded),
                        ),
                    ));
                }
                record.size_bytes
            }
        };

        debug!("Archived {} ({} bytes)", record.relative_path, written);
        Ok(written)
    }

    fn finalize(self: Box<Self>) -> Result<PathBuf> {
        let Self { path, builder, .. } = *self;
        let encoder = builder.into_inner().map_err(|e| Error::io_at(&path, e))?;
        let file = encoder.finish().map_err(|e| Error::io_at(&path, e))?;
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

/// Reads entries back out of a `.tar.gz` or `.tgz` file
///
/// The gzip stream can only be walked once.
pub struct TarGzArchiveReader {
    path: PathBuf,
    archive: Archive<GzDecoder<File>>,
}

impl TarGzArchiveReader {
    /// Open an existing archive
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io_at(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive: Archive::new(GzDecoder::new(file)),
        })
    }
}

impl std::fmt::Debug for TarGzArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarGzArchiveReader")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ArchiveReader for TarGzArchiveReader {
    fn total_files(&self) -> u64 {
        0
    }

    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<()> {
        let path = self.path.clone();
        let entries = self
            .archive
            .entries()
            .map_err(|e| Error::archive(format!("{}: {}", path.display(), e)))?;

        for item in entries {
            // A broken header leaves the stream position unknown, so stop here
            let mut entry =
                item.map_err(|e| Error::archive(format!("{}: {}", path.display(), e)))?;

            let entry_type = entry.header().entry_type();
            if !entry_type.is_file() && !entry_type.is_dir() {
                debug!("Ignoring tar entry of type {:?}", entry_type);
                continue;
            }

            let name = match entry.path() {
                Ok(name) => name.to_string_lossy().into_owned(),
                Err(e) => {
                    if visit(Err(Error::archive(format!("{}: {}", path.display(), e)))).is_break() {
                        break;
                    }
                    continue;
                }
            };

            let relative_path = match sanitize_entry_name(&name) {
                Ok(relative) => relative,
                Err(error) => {
                    if visit(Err(error)).is_break() {
                        break;
                    }
                    continue;
                }
            };

            let header = entry.header();
            let mode = header.mode().ok().map(|mode| mode & MODE_MASK);
            let modified = header
                .mtime()
                .ok()
                .filter(|secs| *secs > 0)
                .map(|secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs));
            let size = entry.size();

            let flow = visit(Ok(SourceEntry {
                source_path: path.join(&relative_path),
                relative_path,
                is_directory: entry_type.is_dir(),
                mode,
                modified,
                size,
                content: &mut entry,
            }));
            if flow.is_break() {
                break;
            }
        }

        Ok(())
    }
}
