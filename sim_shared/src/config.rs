//! Configuration system.
//!
//! Loads scheduler configuration from JSON strings (file IO left to app).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lowest accepted target tick rate.
pub const MIN_TARGET_FPS: f64 = 1.0;
/// Highest accepted target tick rate.
pub const MAX_TARGET_FPS: f64 = 600.0;
/// Rate used whenever the configured one is out of range.
pub const DEFAULT_TARGET_FPS: f64 = 30.0;

/// Returns `fps` if it lies in `[MIN_TARGET_FPS, MAX_TARGET_FPS]`, otherwise
/// `DEFAULT_TARGET_FPS`. NaN and infinities count as out of range.
pub fn clamp_target_fps(fps: f64) -> f64 {
    if (MIN_TARGET_FPS..=MAX_TARGET_FPS).contains(&fps) {
        fps
    } else {
        DEFAULT_TARGET_FPS
    }
}

/// Nominal tick duration for a (possibly out-of-range) target rate.
///
/// Always strictly positive.
pub fn target_delta(fps: f64) -> Duration {
    Duration::from_secs_f64(1.0 / clamp_target_fps(fps))
}

/// Tuning for the catch-up policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchUpConfig {
    /// Backlog, in effective steps, above which the step is coarsened.
    #[serde(default = "default_threshold")]
    pub threshold: u32,
    /// Factor the effective step grows by on each coarsening.
    #[serde(default = "default_growth_factor")]
    pub growth_factor: u32,
    /// Maximum coarsenings per outer iteration. Backlog still above the
    /// threshold after this many is dropped.
    #[serde(default = "default_max_doublings")]
    pub max_doublings: u32,
}

fn default_threshold() -> u32 {
    3
}

fn default_growth_factor() -> u32 {
    2
}

fn default_max_doublings() -> u32 {
    8
}

impl Default for CatchUpConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            growth_factor: default_growth_factor(),
            max_doublings: default_max_doublings(),
        }
    }
}

/// Root configuration for the tick scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Desired ticks per second. Out-of-range values fall back to 30.
    #[serde(default = "default_target_fps")]
    pub target_fps: f64,
    #[serde(default)]
    pub catch_up: CatchUpConfig,
    /// Length of the window the achieved tick rate is measured over.
    #[serde(default = "default_tps_window_ms")]
    pub tps_window_ms: u64,
}

fn default_target_fps() -> f64 {
    DEFAULT_TARGET_FPS
}

fn default_tps_window_ms() -> u64 {
    1000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            catch_up: CatchUpConfig::default(),
            tps_window_ms: default_tps_window_ms(),
        }
    }
}

impl SchedulerConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// TPS measurement window; never zero.
    pub fn tps_window(&self) -> Duration {
        Duration::from_millis(self.tps_window_ms.max(1))
    }
}
