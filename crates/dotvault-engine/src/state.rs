//! Engine lifecycle shared by backup and restore

use dotvault_types::{Cancellable, CancellationToken, EngineState};
use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const COMPLETED: u8 = 2;
const CANCELLED: u8 = 3;

/// Lifecycle and cancel flag of one engine instance
#[derive(Debug, Default)]
pub struct RunState {
    state: AtomicU8,
    token: CancellationToken,
}

impl RunState {
    /// Create an idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        match self.state.load(Ordering::SeqCst) {
            RUNNING => EngineState::Running,
            COMPLETED => EngineState::Completed,
            CANCELLED => EngineState::Cancelled,
            _ => EngineState::Idle,
        }
    }

    /// Token that stops the current run when cancelled
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Enter `Running`, clearing any earlier cancel request
    pub fn begin(&self) {
        self.token.reset();
        self.state.store(RUNNING, Ordering::SeqCst);
    }

    /// Leave `Running`, landing in `Cancelled` if a cancel arrived
    pub fn finish(&self) -> EngineState {
        let next = if self.token.is_cancelled() {
            CANCELLED
        } else {
            COMPLETED
        };
        self.state.store(next, Ordering::SeqCst);
        self.state()
    }
}

impl Cancellable for RunState {
    fn cancel(&self) {
        self.token.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_completed() {
        let state = RunState::new();
        assert_eq!(state.state(), EngineState::Idle);

        state.begin();
        assert_eq!(state.state(), EngineState::Running);
        assert_eq!(state.finish(), EngineState::Completed);
    }

    #[test]
    fn test_lifecycle_cancelled() {
        let state = RunState::new();
        state.begin();
        state.token().cancel();
        assert!(state.is_cancelled());
        assert_eq!(state.finish(), EngineState::Cancelled);

        // A new run starts with a clear flag
        state.begin();
        assert!(!state.is_cancelled());
    }
}
