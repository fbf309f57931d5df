//! Owed simulation time.

use std::time::Duration;

/// Running balance of simulation time that wall-clock time says we owe.
///
/// Backed by `Duration`, so additions and subtractions are exact to the
/// nanosecond and the balance can never go negative. No upper bound is
/// enforced here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaAccumulator {
    owed: Duration,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance.
    pub fn owed(&self) -> Duration {
        self.owed
    }

    /// Adds a clock sample to the balance.
    pub fn accrue(&mut self, elapsed: Duration) {
        self.owed = self.owed.saturating_add(elapsed);
    }

    /// Pays for one tick of `step` if the balance covers it.
    ///
    /// Returns `false` (and leaves the balance untouched) when it doesn't.
    pub fn try_consume(&mut self, step: Duration) -> bool {
        match self.owed.checked_sub(step) {
            Some(rest) => {
                self.owed = rest;
                true
            }
            None => false,
        }
    }

    /// Drops everything above `keep`, returning the amount dropped.
    pub fn discard_above(&mut self, keep: Duration) -> Duration {
        let excess = self.owed.saturating_sub(keep);
        self.owed -= excess;
        excess
    }
}
