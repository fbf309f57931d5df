//! Achieved tick rate.
//!
//! Diagnostic only; nothing in the timing path reads it back.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Counts ticks over a window of clock time.
#[derive(Debug, Clone)]
pub struct TpsMeter {
    window: Duration,
    elapsed: Duration,
    ticks: u64,
    last: u32,
}

impl TpsMeter {
    pub fn new(window: Duration) -> Self {
        Self {
            window: window.max(Duration::from_millis(1)),
            elapsed: Duration::ZERO,
            ticks: 0,
            last: 0,
        }
    }

    /// Feeds one iteration's clock sample and tick count.
    ///
    /// Returns the new rate when a window completes.
    pub fn record(&mut self, elapsed: Duration, ticks: u32) -> Option<u32> {
        self.elapsed += elapsed;
        self.ticks += u64::from(ticks);
        if self.elapsed < self.window {
            return None;
        }

        let rate = (self.ticks as f64 / self.elapsed.as_secs_f64()).round();
        self.last = rate.min(f64::from(u32::MAX)) as u32;
        self.elapsed = Duration::ZERO;
        self.ticks = 0;
        Some(self.last)
    }

    /// Rate measured over the last completed window.
    pub fn last(&self) -> u32 {
        self.last
    }
}

/// Lock-free cell publishing the last measured rate to other threads.
#[derive(Debug, Default)]
pub struct TpsCell(AtomicU32);

impl TpsCell {
    pub fn store(&self, tps: u32) {
        self.0.store(tps, Ordering::Relaxed);
    }

    pub fn load(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}
