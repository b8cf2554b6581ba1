// Run lifecycle and cross-thread cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed | RunState::Cancelled
        )
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<RunState>,
    changed: Condvar,
    cancel_requested: AtomicBool,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Owner side of the lifecycle, held by the orchestrator.
#[derive(Debug)]
pub struct RunControl {
    shared: Arc<Shared>,
    settle_limit: Duration,
}

impl RunControl {
    /// `settle_limit` bounds how long [`CancelHandle::cancel`] waits for the
    /// run to wind down.
    pub fn new(settle_limit: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RunState::NotStarted),
                changed: Condvar::new(),
                cancel_requested: AtomicBool::new(false),
            }),
            settle_limit,
        }
    }

    pub fn handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
            settle_limit: self.settle_limit,
        }
    }

    pub fn state(&self) -> RunState {
        *self.shared.lock_state()
    }

    pub fn cancel_requested(&self) -> bool {
        self.shared.cancel_requested.load(Ordering::SeqCst)
    }

    /// Enter `Running`. Returns false if a cancel was already requested, in
    /// which case the run is marked `Cancelled` and nothing should be spawned.
    pub fn start(&self) -> bool {
        let mut state = self.shared.lock_state();
        if self.cancel_requested() {
            *state = RunState::Cancelled;
            self.shared.changed.notify_all();
            return false;
        }
        *state = RunState::Running;
        true
    }

    /// Record the terminal state and wake any waiting `cancel()` callers.
    pub fn finish(&self, outcome: RunState) {
        debug_assert!(outcome.is_terminal());
        let mut state = self.shared.lock_state();
        *state = outcome;
        self.shared.changed.notify_all();
    }
}

/// Cloneable handle for cancelling a run from another thread.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
    settle_limit: Duration,
}

impl CancelHandle {
    /// Set the cancel flag without waiting. Safe to call from a signal
    /// handler.
    pub fn request(&self) {
        self.shared.cancel_requested.store(true, Ordering::SeqCst);
    }

    /// Request cancellation and block until both engines are gone or the
    /// settle limit passes. Returns the state observed when it stopped
    /// waiting.
    pub fn cancel(&self) -> RunState {
        self.request();
        self.wait_settled(self.settle_limit)
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel_requested.load(Ordering::SeqCst)
    }

    /// Wait until the run is no longer `Running`, up to `limit`.
    pub fn wait_settled(&self, limit: Duration) -> RunState {
        let deadline = Instant::now() + limit;
        let mut state = self.shared.lock_state();
        while *state == RunState::Running {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            state = match self.shared.changed.wait_timeout(state, deadline - now) {
                Ok((state, _)) => state,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        *state
    }
}
