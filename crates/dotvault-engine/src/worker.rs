//! Background execution of backup and restore runs
//!
//! Each run gets its own named thread so a front end can keep drawing and
//! reacting to Ctrl-C while files are copied. Progress callbacks run on the
//! worker thread.

use crate::backup::{BackupEngine, BackupRequest};
use crate::restore::{RestoreEngine, RestoreRequest};
use dotvault_types::{
    BackupResult, Cancellable, CancellationToken, ConflictResolver, Error, ProgressEvent,
    RestoreResult, Result,
};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Name given to every worker thread
pub const WORKER_THREAD_NAME: &str = "dotvault-worker";

/// Time a worker gets to finish on its own before being cancelled
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a run on a background thread
#[derive(Debug)]
pub struct Worker<T> {
    handle: JoinHandle<T>,
    token: CancellationToken,
}

impl<T: Send + 'static> Worker<T> {
    /// Start `job` on a new worker thread, cancellable through `token`
    pub fn spawn<F>(token: CancellationToken, job: F) -> Result<Self>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(job)
            .map_err(|e| Error::other(format!("Failed to start worker thread: {}", e)))?;
        debug!("Started {}", WORKER_THREAD_NAME);
        Ok(Self { handle, token })
    }

    /// Whether the run has returned
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the run to stop at its next checkpoint
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the run to return
    pub fn join(self) -> Result<T> {
        self.handle
            .join()
            .map_err(|_| Error::other("Worker thread panicked"))
    }

    /// Give the run `grace` to finish, then cancel it and wait
    pub fn shutdown(self, grace: Duration) -> Result<T> {
        let deadline = Instant::now() + grace;
        while !self.is_finished() && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
        }
        if !self.is_finished() {
            warn!("Worker still running after {:?}, cancelling", grace);
            self.cancel();
        }
        self.join()
    }
}

/// Run a backup on a worker thread
pub fn spawn_backup<F>(
    engine: Arc<BackupEngine>,
    request: BackupRequest,
    on_progress: F,
) -> Result<Worker<BackupResult>>
where
    F: FnMut(&ProgressEvent) + Send + 'static,
{
    let token = engine.cancellation_token();
    Worker::spawn(token, move || engine.execute(&request, on_progress))
}

/// Run a restore on a worker thread
pub fn spawn_restore<F>(
    engine: Arc<RestoreEngine>,
    request: RestoreRequest,
    resolver: Arc<dyn ConflictResolver>,
    on_progress: F,
) -> Result<Worker<RestoreResult>>
where
    F: FnMut(&ProgressEvent) + Send + 'static,
{
    let token = engine.cancellation_token();
    Worker::spawn(token, move || {
        engine.execute(&request, resolver.as_ref(), on_progress)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::always_overwrite;
    use dotvault_types::SelectedEntry;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use tempfile::TempDir;

    #[test]
    fn test_worker_runs_on_named_thread() {
        let worker = Worker::spawn(CancellationToken::new(), || {
            thread::current().name().map(str::to_string)
        })
        .unwrap();
        assert_eq!(worker.join().unwrap().as_deref(), Some(WORKER_THREAD_NAME));
    }

    #[test]
    fn test_shutdown_cancels_after_grace() {
        let token = CancellationToken::new();
        let observed = token.clone();
        let worker = Worker::spawn(token, move || {
            while !observed.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            true
        })
        .unwrap();

        assert!(worker.shutdown(Duration::from_millis(50)).unwrap());
    }

    #[test]
    fn test_shutdown_does_not_cancel_finished_work() {
        let token = CancellationToken::new();
        let flag = token.clone();
        let worker = Worker::spawn(token, || 7).unwrap();

        assert_eq!(worker.shutdown(DEFAULT_SHUTDOWN_GRACE).unwrap(), 7);
        assert!(!flag.is_cancelled());
    }

    #[test]
    fn test_panicking_job_is_an_error() {
        let worker = Worker::spawn(CancellationToken::new(), || -> u8 { panic!("boom") }).unwrap();
        assert!(worker.join().is_err());
    }

    #[test]
    fn test_spawn_backup_reports_progress_across_threads() {
        let home = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(home.path().join(".bashrc"), b"alias").unwrap();

        let engine = Arc::new(BackupEngine::with_home(home.path()));
        let request = BackupRequest::new(
            vec![SelectedEntry::new("~/.bashrc", false, true, 5)],
            out.path(),
        )
        .with_options(dotvault_types::BackupOptions::default().with_timestamp_subfolder(false));

        let (tx, rx) = mpsc::channel();
        let worker = spawn_backup(engine, request, move |event| {
            let _ = tx.send(event.files_processed);
        })
        .unwrap();

        let result = worker.join().unwrap();
        assert!(result.success);
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![1]);
        assert!(out.path().join(".bashrc").exists());
    }

    #[test]
    fn test_spawn_restore() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::write(source.path().join(".vimrc"), b"set nu").unwrap();

        let seen = Arc::new(AtomicBool::new(false));
        let seen_in_worker = Arc::clone(&seen);
        let worker = spawn_restore(
            Arc::new(RestoreEngine::new()),
            RestoreRequest::new(source.path(), target.path()),
            Arc::new(always_overwrite()),
            move |_| seen_in_worker.store(true, Ordering::SeqCst),
        )
        .unwrap();

        let result = worker.join().unwrap();
        assert_eq!(result.restored_files, 1);
        assert!(seen.load(Ordering::SeqCst));
    }
}
