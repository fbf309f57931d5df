//! Elapsed-time measurement.
//!
//! The scheduler only ever asks "how much time passed since I last asked".
//! `MonotonicClock` answers from `Instant`, which never jumps when the wall
//! clock is adjusted. A stalled host shows up as one large sample; bounding
//! that is the catch-up policy's job, not the clock's.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Source of elapsed-time samples.
pub trait Clock: Send {
    /// Returns the time elapsed since the previous sample (or since the last
    /// [`restart`](Clock::restart)).
    fn sample(&mut self) -> Duration;

    /// Resets the zero point to "now".
    fn restart(&mut self);
}

/// Clock backed by `std::time::Instant`.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    last: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn sample(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;
        elapsed
    }

    fn restart(&mut self) {
        self.last = Instant::now();
    }
}

/// Deterministic clock for tests: hands out scripted samples in order, then
/// repeats `fallback` forever.
#[derive(Debug, Clone, Default)]
pub struct ScriptedClock {
    samples: VecDeque<Duration>,
    fallback: Duration,
}

impl ScriptedClock {
    pub fn new(samples: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            fallback: Duration::ZERO,
        }
    }

    /// Sample returned once the script is exhausted.
    pub fn with_fallback(mut self, fallback: Duration) -> Self {
        self.fallback = fallback;
        self
    }
}

impl Clock for ScriptedClock {
    fn sample(&mut self) -> Duration {
        self.samples.pop_front().unwrap_or(self.fallback)
    }

    fn restart(&mut self) {}
}
