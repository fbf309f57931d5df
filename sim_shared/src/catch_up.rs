//! Catch-up policy.
//!
//! When the host falls behind, the owed balance grows past a few nominal
//! steps. Instead of draining it with a burst of small ticks, the effective
//! step is coarsened (multiplied by `growth_factor`) until the balance fits
//! within `threshold` effective steps. Large backlogs therefore turn into
//! fewer, larger simulation steps. This is lossy on purpose.
//!
//! The number of coarsenings per iteration is capped. Whatever still exceeds
//! `threshold` effective steps after the cap is dropped from the balance, so a
//! single iteration never runs more than `threshold` ticks after coarsening.

use std::time::Duration;

use tracing::{debug, warn};

use crate::accumulator::DeltaAccumulator;
use crate::config::CatchUpConfig;

/// Outcome of resolving the catch-up policy for one outer iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchUpPlan {
    /// Step size every tick of this iteration simulates.
    pub effective_delta: Duration,
    /// How many times the nominal step was coarsened.
    pub doublings: u32,
    /// Backlog dropped because the coarsening cap was hit.
    pub discarded: Duration,
}

/// Decides the effective tick duration for a given backlog.
#[derive(Debug, Clone, Copy)]
pub struct CatchUpPolicy {
    threshold: u32,
    growth_factor: u32,
    max_doublings: u32,
}

impl Default for CatchUpPolicy {
    fn default() -> Self {
        Self::new(CatchUpConfig::default())
    }
}

impl CatchUpPolicy {
    pub fn new(config: CatchUpConfig) -> Self {
        Self {
            threshold: config.threshold.max(1),
            growth_factor: config.growth_factor.max(2),
            max_doublings: config.max_doublings,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Picks the effective step for this iteration, dropping backlog from
    /// `acc` if the coarsening cap is reached.
    pub fn resolve(&self, acc: &mut DeltaAccumulator, target_delta: Duration) -> CatchUpPlan {
        let mut effective_delta = target_delta;
        let mut doublings = 0;

        while acc.owed() > effective_delta.saturating_mul(self.threshold)
            && doublings < self.max_doublings
        {
            effective_delta = effective_delta.saturating_mul(self.growth_factor);
            doublings += 1;
        }

        let discarded = acc.discard_above(effective_delta.saturating_mul(self.threshold));

        if doublings > 0 {
            debug!(
                doublings,
                effective_ms = effective_delta.as_secs_f64() * 1000.0,
                owed_ms = acc.owed().as_secs_f64() * 1000.0,
                "Coarsening tick step to catch up"
            );
        }
        if !discarded.is_zero() {
            warn!(
                discarded_ms = discarded.as_secs_f64() * 1000.0,
                max_doublings = self.max_doublings,
                "Backlog beyond catch-up cap dropped"
            );
        }

        CatchUpPlan {
            effective_delta,
            doublings,
            discarded,
        }
    }
}
