//! Core traits for DotVault operations
//!
//! These are the seams the engines are wired through: cooperative
//! cancellation and the conflict policy consulted during restore.

use crate::{ConflictInfo, ConflictResolution};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Trait for cancellable operations
pub trait Cancellable {
    /// Cancel the operation
    fn cancel(&self);

    /// Check if the operation is cancelled
    fn is_cancelled(&self) -> bool;
}

/// Shared cooperative cancellation flag
///
/// Clones observe the same flag, so a token handed to a signal handler or a
/// UI thread can stop a run executing on the worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, unset token
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the flag before a new run
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Cancellable for CancellationToken {
    fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Policy deciding what happens when a restore target already exists
pub trait ConflictResolver: Send + Sync {
    /// Decide how to handle the given conflict
    fn resolve(&self, conflict: &ConflictInfo) -> ConflictResolution;
}

impl<F> ConflictResolver for F
where
    F: Fn(&ConflictInfo) -> ConflictResolution + Send + Sync,
{
    fn resolve(&self, conflict: &ConflictInfo) -> ConflictResolution {
        self(conflict)
    }
}
