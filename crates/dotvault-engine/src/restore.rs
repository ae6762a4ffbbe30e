//! Restore engine
//!
//! Reads a backup tree or archive through [`open_source`] and writes every
//! file below a restore root, asking a [`ConflictResolver`] whenever the
//! target already exists.

use crate::conflict::BACKUP_SUFFIX;
use crate::state::RunState;
use dotvault_archive::{
    apply_modified, apply_permission_bits, clear_target, open_source, SourceEntry,
};
use dotvault_types::{
    Cancellable, CancellationToken, ConflictInfo, ConflictResolution, ConflictResolver,
    EngineState, Error, ProgressEvent, ProgressStatus, RestoreOptions, RestoreResult, Result,
};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A complete restore job
#[derive(Debug, Clone)]
pub struct RestoreRequest {
    /// Backup tree or archive file
    pub source: PathBuf,
    /// Directory receiving the restored files
    pub restore_root: PathBuf,
    /// Options for this run
    pub options: RestoreOptions,
}

impl RestoreRequest {
    /// Create a request with default options
    pub fn new(source: impl Into<PathBuf>, restore_root: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            restore_root: restore_root.into(),
            options: RestoreOptions::default(),
        }
    }

    /// Replace the options
    pub fn with_options(mut self, options: RestoreOptions) -> Self {
        self.options = options;
        self
    }
}

/// Runs one restore at a time
#[derive(Debug, Default)]
pub struct RestoreEngine {
    run: RunState,
}

impl RestoreEngine {
    /// Create an idle engine
    pub fn new() -> Self {
        Self::default()
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
    pub fn execute<F>(
        &self,
        request: &RestoreRequest,
        resolver: &dyn ConflictResolver,
        on_progress: F,
    ) -> RestoreResult
    where
        F: FnMut(&ProgressEvent),
    {
        self.restore(
            &request.source,
            &request.restore_root,
            &request.options,
            resolver,
            on_progress,
        )
    }

    /// Restore `source` below `restore_root`
    pub fn restore<F>(
        &self,
        source: &Path,
        restore_root: &Path,
        options: &RestoreOptions,
        resolver: &dyn ConflictResolver,
        mut on_progress: F,
    ) -> RestoreResult
    where
        F: FnMut(&ProgressEvent),
    {
        let started = Instant::now();

        if !source.exists() {
            let message = format!("Restore source does not exist: {}", source.display());
            warn!("{}", message);
            return RestoreResult::failed(message, elapsed_ms(started));
        }

        let mut reader = match open_source(source) {
            Ok(reader) => reader,
            Err(e) => {
                warn!("Cannot open restore source: {}", e);
                return RestoreResult::failed(e.to_string(), elapsed_ms(started));
            }
        };

        info!(
            "Starting restore of {} into {}",
            source.display(),
            restore_root.display()
        );
        self.run.begin();

        let mut pass = RestorePass {
            root: restore_root,
            preserve_permissions: options.preserve_permissions,
            resolver,
            token: self.run.token(),
            on_progress: &mut on_progress,
            total_files: reader.total_files(),
            files_seen: 0,
            restored_files: 0,
            skipped_files: 0,
            bytes_restored: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            conflicts: Vec::new(),
        };

        let walked = reader.for_each_entry(&mut |item: Result<SourceEntry<'_>>| pass.visit(item));
        if let Err(e) = walked {
            let message = format!("Failed to read {}: {}", source.display(), e);
            warn!("{}", message);
            pass.errors.push(message);
        }

        let state = self.run.finish();
        let RestorePass {
            files_seen,
            restored_files,
            skipped_files,
            errors,
            warnings,
            conflicts,
            ..
        } = pass;

        let result = RestoreResult {
            success: errors.is_empty() || restored_files > 0,
            total_files: files_seen,
            restored_files,
            skipped_files,
            duration_ms: elapsed_ms(started),
            errors,
            warnings,
            conflicts,
        };

        info!(
            "Restore {:?}: {} restored, {} skipped, {} conflicts, {} errors in {} ms",
            state,
            result.restored_files,
            result.skipped_files,
            result.conflicts.len(),
            result.errors.len(),
            result.duration_ms
        );
        result
    }
}

impl Cancellable for RestoreEngine {
    fn cancel(&self) {
        info!("Restore cancellation requested");
        self.run.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.run.is_cancelled()
    }
}

/// Path a conflicting file is moved to before being replaced
///
/// `~/.bashrc` becomes `~/.bashrc.bak`.
pub fn renamed_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    name.push(BACKUP_SUFFIX);
    target.with_file_name(name)
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

struct RestorePass<'a> {
    root: &'a Path,
    preserve_permissions: bool,
    resolver: &'a dyn ConflictResolver,
    token: CancellationToken,
    on_progress: &'a mut dyn FnMut(&ProgressEvent),
    total_files: u64,
    files_seen: u64,
    restored_files: u64,
    skipped_files: u64,
    bytes_restored: u64,
    errors: Vec<String>,
    warnings: Vec<String>,
    conflicts: Vec<ConflictInfo>,
}

impl RestorePass<'_> {
    fn visit(&mut self, item: Result<SourceEntry<'_>>) -> ControlFlow<()> {
        if self.token.is_cancelled() {
            info!("Restore cancelled after {} files", self.files_seen);
            return ControlFlow::Break(());
        }

        match item {
            Ok(entry) if entry.is_directory => {
                let target = self.root.join(&entry.relative_path);
                if let Err(e) = fs::create_dir_all(&target) {
                    self.fail(&target, &Error::io_at(&target, e));
                }
            }
            Ok(entry) => self.restore_file(entry),
            Err(e) => {
                let message = format!("Failed to restore entry: {}", e);
                warn!(kind = ?e.kind(), "{}", message);
                self.errors.push(message);
            }
        }
        ControlFlow::Continue(())
    }

    fn restore_file(&mut self, entry: SourceEntry<'_>) {
        self.files_seen += 1;
        let target = self.root.join(&entry.relative_path);

        if fs::symlink_metadata(&target).is_ok() {
            let mut conflict = ConflictInfo::already_exists(entry.source_path.clone(), target.clone());
            let resolution = self.resolver.resolve(&conflict);
            conflict.resolution = Some(resolution);
            self.conflicts.push(conflict);

            match resolution {
                ConflictResolution::Skip => {
                    info!("Keeping existing file {}", target.display());
                    self.skipped_files += 1;
                    self.emit(&target, ProgressStatus::Skipped);
                    return;
                }
                ConflictResolution::Rename => {
                    let aside = renamed_path(&target);
                    if let Err(e) = fs::rename(&target, &aside) {
                        self.fail(&target, &Error::io_at(&target, e));
                        return;
                    }
                    let note = format!(
                        "Renamed existing file: {} -> {}",
                        target.display(),
                        aside.display()
                    );
                    warn!("{}", note);
                    self.warnings.push(note);
                }
                ConflictResolution::Overwrite => {
                    debug!("Overwriting {}", target.display());
                }
            }
        }

        match self.write_file(&target, entry) {
            Ok(written) => {
                self.restored_files += 1;
                self.bytes_restored += written;
                self.emit(&target, ProgressStatus::Restored);
            }
            Err(e) => self.fail(&target, &e),
        }
    }

    fn write_file(&self, target: &Path, entry: SourceEntry<'_>) -> Result<u64> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
        }

        clear_target(target)?;
        let mut out = File::create(target).map_err(|e| Error::io_at(target, e))?;
        let written = io::copy(entry.content, &mut out).map_err(|e| Error::io_at(target, e))?;
        drop(out);

        if self.preserve_permissions {
            if let Some(mode) = entry.mode {
                apply_permission_bits(target, mode)?;
            }
            if let Some(modified) = entry.modified {
                apply_modified(target, modified)?;
            }
        }

        debug!("Restored {} ({} bytes)", target.display(), written);
        Ok(written)
    }

    fn emit(&mut self, path: &Path, status: ProgressStatus) {
        let event = ProgressEvent {
            current_path: path.to_path_buf(),
            files_processed: self.files_seen,
            total_files: self.total_files,
            bytes_processed: self.bytes_restored,
            total_bytes: 0,
            status,
        };
        (self.on_progress)(&event);
    }

    fn fail(&mut self, path: &Path, error: &Error) {
        let message = format!("Failed to restore {}: {}", path.display(), error);
        warn!(kind = ?error.kind(), "{}", message);
        self.errors.push(message);
    }
}
