//! Cooperative shutdown signal.
//!
//! Setting the flag never interrupts a tick in progress. The scheduler polls
//! it before each tick and before sleeping; a sleep in progress is woken
//! early through the condvar.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Thread-safe, one-way shutdown flag with a wakeup for sleepers.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    requested: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag and wakes any waiter. Idempotent.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
        // Taking the lock orders this notify after any waiter's flag check.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.wake.notify_all();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Blocks for up to `timeout`, returning early if shutdown is requested.
    ///
    /// Returns `true` if shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = self
            .wake
            .wait_timeout_while(guard, timeout, |_| !self.is_requested())
            .unwrap_or_else(PoisonError::into_inner);
        self.is_requested()
    }
}
