//! Idle time between iterations.
//!
//! Sleep precision is best-effort. Timing correctness comes from the clock
//! and accumulator feedback loop: oversleeping shows up as a larger sample on
//! the next iteration.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::shutdown::ShutdownSignal;

/// Something that can suspend the scheduler thread.
pub trait Sleeper: Send {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps on a [`ShutdownSignal`], waking early when shutdown is requested.
#[derive(Debug, Clone)]
pub struct SignalSleeper {
    signal: Arc<ShutdownSignal>,
}

impl SignalSleeper {
    pub fn new(signal: Arc<ShutdownSignal>) -> Self {
        Self { signal }
    }
}

impl Sleeper for SignalSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.signal.wait_timeout(duration);
    }
}

/// Records requested sleeps without suspending. For tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every duration requested so far, in order.
    pub fn calls(&self) -> Vec<Duration> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}

/// What the sleep controller did at the end of an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// Suspended for the given idle time.
    Slept(Duration),
    /// Ticking used the whole budget (or more); no suspension.
    Behind(Duration),
}

/// Computes residual idle time and suspends for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepController;

impl SleepController {
    /// Idle time left in a `target_delta` budget after `tick_cost`, if any.
    pub fn idle_time(target_delta: Duration, tick_cost: Duration) -> Option<Duration> {
        target_delta
            .checked_sub(tick_cost)
            .filter(|idle| !idle.is_zero())
    }

    /// Sleeps for the residual budget, or returns immediately when behind.
    pub fn settle(
        &self,
        sleeper: &mut dyn Sleeper,
        target_delta: Duration,
        tick_cost: Duration,
    ) -> SleepOutcome {
        match Self::idle_time(target_delta, tick_cost) {
            Some(idle) => {
                sleeper.sleep(idle);
                SleepOutcome::Slept(idle)
            }
            None => SleepOutcome::Behind(tick_cost - target_delta),
        }
    }
}
