//! Backup engine
//!
//! Expands selected entries depth-first, filters them through [`PathPolicy`]
//! and streams every surviving file into one [`ArchiveWriter`]. Per-file
//! failures are collected into the result and never stop the run.

use crate::paths::{expand_home, home_dir, relative_from_home, timestamped_folder_name};
use crate::policy::{PathPolicy, SkipReason};
use crate::state::RunState;
use dotvault_archive::{
    archive_path_for, create_archive_writer, create_tree_writer, permission_bits, ArchiveWriter,
};
use dotvault_types::{
    ArchiveEntryRecord, BackupOptions, BackupResult, Cancellable, CancellationToken, EngineState,
    Error, ProgressEvent, Result, SelectedEntry,
};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Error reported when the selection is empty
pub const NO_ENTRIES_SELECTED: &str = "No entries selected for backup";
/// Error reported when no selected entry exists
pub const NO_EXISTING_ENTRIES: &str = "No existing files found to backup";
/// Prefix of the timestamped folder holding plain backups
pub const TIMESTAMP_FOLDER_PREFIX: &str = "backup";

/// A complete backup job
#[derive(Debug, Clone)]
pub struct BackupRequest {
    /// Entries chosen by the catalog collaborator
    pub entries: Vec<SelectedEntry>,
    /// Output root directory
    pub destination: PathBuf,
    /// Options for this run
    pub options: BackupOptions,
}

impl BackupRequest {
    /// Create a request with default options
    pub fn new(entries: Vec<SelectedEntry>, destination: impl Into<PathBuf>) -> Self {
        Self {
            entries,
            destination: destination.into(),
            options: BackupOptions::default(),
        }
    }

    /// Replace the options
    pub fn with_options(mut self, options: BackupOptions) -> Self {
        self.options = options;
        self
    }
}

/// Runs one backup at a time
///
/// `backup` must not be called concurrently on the same instance. Cancel
/// through [`Cancellable::cancel`] or a token from
/// [`BackupEngine::cancellation_token`], from any thread.
#[derive(Debug)]
pub struct BackupEngine {
    home: PathBuf,
    run: RunState,
}

impl BackupEngine {
    /// Create an engine naming entries relative to the current user's home
    pub fn new() -> Result<Self> {
        Ok(Self::with_home(home_dir()?))
    }

    /// Create an engine with an explicit home directory
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            run: RunState::new(),
        }
    }

    /// Home directory entry names are relative to
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Lifecycle state of the engine
    pub fn state(&self) -> EngineState {
        self.run.state()
    }

    /// Token that cancels the run in flight
    pub fn cancellation_token(&self) -> CancellationToken {
        self.run.token()
    }

    /// Run a prepared request
    pub fn execute<F>(&self, request: &BackupRequest, on_progress: F) -> BackupResult
    where
        F: FnMut(&ProgressEvent),
    {
        self.backup(
            &request.entries,
            &request.destination,
            &request.options,
            on_progress,
        )
    }

    /// Back up `entries` below `destination`
    pub fn backup<F>(
        &self,
        entries: &[SelectedEntry],
        destination: &Path,
        options: &BackupOptions,
        mut on_progress: F,
    ) -> BackupResult
    where
        F: FnMut(&ProgressEvent),
    {
        let started = Instant::now();

        if entries.is_empty() {
            warn!("{}", NO_ENTRIES_SELECTED);
            return BackupResult::failed(NO_ENTRIES_SELECTED, elapsed_ms(started));
        }

        let valid: Vec<&SelectedEntry> = entries.iter().filter(|entry| entry.exists).collect();
        if valid.is_empty() {
            warn!("{}", NO_EXISTING_ENTRIES);
            return BackupResult::failed(NO_EXISTING_ENTRIES, elapsed_ms(started));
        }

        let total_bytes: u64 = valid.iter().map(|entry| entry.size_bytes).sum();
        info!(
            "Starting backup of {} entries ({} bytes) to {}",
            valid.len(),
            total_bytes,
            destination.display()
        );

        self.run.begin();
        let mut result = self.run_backup(&valid, destination, options, total_bytes, &mut on_progress);
        let state = self.run.finish();
        result.duration_ms = elapsed_ms(started);

        info!(
            "Backup {:?}: {} files, {} bytes, {} errors, {} skipped in {} ms",
            state,
            result.total_files,
            result.total_bytes,
            result.errors.len(),
            result.skipped_files.len(),
            result.duration_ms
        );
        result
    }

    fn run_backup(
        &self,
        valid: &[&SelectedEntry],
        destination: &Path,
        options: &BackupOptions,
        total_bytes: u64,
        on_progress: &mut dyn FnMut(&ProgressEvent),
    ) -> BackupResult {
        if let Err(e) = fs::create_dir_all(destination) {
            let message = format!(
                "Failed to create destination directory {}: {}",
                destination.display(),
                e
            );
            warn!("{}", message);
            return BackupResult::failed(message, 0);
        }

        let writer = match open_writer(destination, options) {
            Ok(writer) => writer,
            Err(e) => {
                let message = format!("Failed to open backup output: {}", e);
                warn!("{}", message);
                return BackupResult::failed(message, 0);
            }
        };
        let output_path = writer.output_path().to_path_buf();
        debug!("Writing backup to {}", output_path.display());

        let mut pass = BackupPass {
            home: &self.home,
            policy: PathPolicy::from_options(options),
            preserve_permissions: options.preserve_permissions,
            token: self.run.token(),
            writer,
            on_progress,
            total_bytes,
            files_processed: 0,
            bytes_processed: 0,
            errors: Vec::new(),
            skipped_files: Vec::new(),
        };

        for entry in valid {
            if pass.token.is_cancelled() {
                info!("Backup cancelled before {}", entry.path);
                break;
            }
            pass.backup_entry(entry);
        }

        let BackupPass {
            writer,
            files_processed,
            bytes_processed,
            mut errors,
            skipped_files,
            ..
        } = pass;

        if let Err(e) = writer.finalize() {
            let message = format!("Failed to finalize {}: {}", output_path.display(), e);
            warn!("{}", message);
            errors.push(message);
        }

        let success = errors.is_empty() || errors.len() < valid.len();
        BackupResult {
            success,
            output_path,
            total_files: files_processed,
            total_bytes: bytes_processed,
            duration_ms: 0,
            errors,
            skipped_files,
        }
    }
}

impl Cancellable for BackupEngine {
    fn cancel(&self) {
        info!("Backup cancellation requested");
        self.run.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.run.is_cancelled()
    }
}

fn open_writer(destination: &Path, options: &BackupOptions) -> Result<Box<dyn ArchiveWriter>> {
    if options.compress {
        let archive_path = archive_path_for(destination, options.archive_format);
        return create_archive_writer(
            options.archive_format,
            &archive_path,
            options.preserve_permissions,
        );
    }

    let root = if options.create_timestamp_subfolder {
        let root = destination.join(timestamped_folder_name(TIMESTAMP_FOLDER_PREFIX));
        fs::create_dir_all(&root).map_err(|e| Error::io_at(&root, e))?;
        root
    } else {
        destination.to_path_buf()
    };
    Ok(create_tree_writer(&root, options.preserve_permissions))
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Mutable state of one backup run
struct BackupPass<'a> {
    home: &'a Path,
    policy: PathPolicy,
    preserve_permissions: bool,
    token: CancellationToken,
    writer: Box<dyn ArchiveWriter>,
    on_progress: &'a mut dyn FnMut(&ProgressEvent),
    total_bytes: u64,
    files_processed: u64,
    bytes_processed: u64,
    errors: Vec<String>,
    skipped_files: Vec<String>,
}

impl BackupPass<'_> {
    fn backup_entry(&mut self, entry: &SelectedEntry) {
        let source = expand_home(&entry.path, self.home);

        let link_metadata = match fs::symlink_metadata(&source) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.fail(&source, &Error::io_at(&source, e));
                return;
            }
        };
        if link_metadata.file_type().is_symlink() && !self.policy.follow_symlinks() {
            self.skip(&source, &SkipReason::Symlink);
            return;
        }

        if source.is_dir() {
            self.backup_directory(&source);
        } else if let Some(pattern) = self.policy.matching_pattern(&source) {
            let reason = SkipReason::Excluded(pattern.to_string());
            self.skip(&source, &reason);
        } else {
            self.backup_file(&source);
        }
    }

    fn backup_directory(&mut self, root: &Path) {
        let mut walker = WalkDir::new(root)
            .follow_links(self.policy.follow_symlinks())
            .sort_by_file_name()
            .into_iter();

        while let Some(item) = walker.next() {
            if self.token.is_cancelled() {
                info!("Backup cancelled inside {}", root.display());
                return;
            }

            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                    let message = format!("Failed to read {}: {}", path.display(), e);
                    warn!("{}", message);
                    self.errors.push(message);
                    continue;
                }
            };

            let path = entry.path();
            let file_type = entry.file_type();

            if entry.depth() == 0 {
                self.add_directory(path);
                continue;
            }

            if let Some(reason) = self.policy.evaluate(path, file_type, entry.path_is_symlink()) {
                if file_type.is_dir() {
                    walker.skip_current_dir();
                }
                self.skip(path, &reason);
                continue;
            }

            if file_type.is_dir() {
                self.add_directory(path);
            } else if file_type.is_file() {
                self.backup_file(path);
            } else {
                debug!("Ignoring special file {}", path.display());
            }
        }
    }

    fn add_directory(&mut self, path: &Path) {
        let result = relative_from_home(path, self.home)
            .and_then(|relative| self.writer.add_directory(&relative));
        if let Err(e) = result {
            self.fail(path, &e);
        }
    }

    fn backup_file(&mut self, path: &Path) {
        if let Err(e) = self.try_backup_file(path) {
            self.fail(path, &e);
        }
    }

    fn try_backup_file(&mut self, path: &Path) -> Result<()> {
        let relative_path = relative_from_home(path, self.home)?;
        let mut file = File::open(path).map_err(|e| Error::io_at(path, e))?;
        let metadata = file.metadata().map_err(|e| Error::io_at(path, e))?;

        let record = ArchiveEntryRecord {
            relative_path,
            source_absolute_path: path.to_path_buf(),
            size_bytes: metadata.len(),
            permission_bits: if self.preserve_permissions {
                permission_bits(&metadata)
            } else {
                None
            },
            modified: metadata.modified().ok(),
            is_directory: false,
        };

        let written = self.writer.add_entry(&record, &mut file)?;
        self.files_processed += 1;
        self.bytes_processed += written;

        if self.files_processed % self.writer.progress_interval() == 0 {
            let event = ProgressEvent {
                current_path: path.to_path_buf(),
                files_processed: self.files_processed,
                total_files: 0,
                bytes_processed: self.bytes_processed,
                total_bytes: self.total_bytes,
                status: self.writer.status(),
            };
            (self.on_progress)(&event);
        }
        Ok(())
    }

    fn skip(&mut self, path: &Path, reason: &SkipReason) {
        debug!("Skipping {} ({:?})", path.display(), reason);
        self.skipped_files.push(path.display().to_string());
    }

    fn fail(&mut self, path: &Path, error: &Error) {
        let message = format!("Failed to backup {}: {}", path.display(), error);
        warn!(kind = ?error.kind(), "{}", message);
        self.errors.push(message);
    }
}
