//! Mutual-exclusion boundary around simulation state.
//!
//! `TickGate` owns the state it protects. The scheduler holds it for one
//! `pre_tick` + `tick` pair at a time; any other thread (network, console)
//! must acquire it before touching the same state. There is no reader/writer
//! split: every holder gets exclusive `&mut` access.
//!
//! The gate is not reentrant. A holder already has `&mut T`, so it never
//! needs to acquire again.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use tracing::warn;

/// Exclusive-access gate owning the simulation state `T`.
#[derive(Debug, Default)]
pub struct TickGate<T> {
    inner: Mutex<T>,
}

/// Proof of holding the gate. Releases on drop.
#[derive(Debug)]
pub struct GateGuard<'a, T> {
    guard: MutexGuard<'a, T>,
}

impl<T> TickGate<T> {
    pub fn new(state: T) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    /// Blocks until exclusive access is granted.
    ///
    /// If a previous holder panicked, the state is handed out as that holder
    /// left it.
    pub fn acquire(&self) -> GateGuard<'_, T> {
        let guard = self.inner.lock().unwrap_or_else(recover);
        GateGuard { guard }
    }

    /// Acquires the gate only if nobody holds it. Poison is recovered the
    /// same way as in [`acquire`](Self::acquire).
    pub fn try_acquire(&self) -> Option<GateGuard<'_, T>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(GateGuard { guard }),
            Err(TryLockError::Poisoned(poisoned)) => Some(GateGuard {
                guard: recover(poisoned),
            }),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Runs `f` with exclusive access and releases immediately after.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.acquire();
        f(&mut guard)
    }

    /// Whether a holder ever panicked while inside the gate.
    pub fn is_poisoned(&self) -> bool {
        self.inner.is_poisoned()
    }

    /// Consumes the gate and returns the state.
    pub fn into_inner(self) -> T {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

fn recover<G>(poisoned: PoisonError<G>) -> G {
    warn!("Tick gate poisoned by a panicked holder; continuing with its state");
    poisoned.into_inner()
}

impl<T> GateGuard<'_, T> {
    /// Hands the gate back. Same as dropping the guard.
    pub fn release(self) {}
}

impl<T> Deref for GateGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for GateGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
