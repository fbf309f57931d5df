//! Demo simulation host.
//!
//! A box of bodies drifting and bouncing off the walls. Each tick can burn a
//! configurable amount of wall time (with random jitter) so the scheduler
//! has something realistic to keep up with.

use std::time::Duration;

use anyhow::bail;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::host::SimulationHost;

/// Demo world parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    #[serde(default = "default_bodies")]
    pub bodies: usize,
    /// Half-width of the square arena.
    #[serde(default = "default_extent")]
    pub extent: f64,
    /// Wall time each tick costs.
    #[serde(default)]
    pub work_us: u64,
    /// Extra random cost in `[0, work_jitter_us]` per tick.
    #[serde(default)]
    pub work_jitter_us: u64,
    #[serde(default)]
    pub seed: u64,
}

fn default_bodies() -> usize {
    64
}

fn default_extent() -> f64 {
    512.0
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            bodies: default_bodies(),
            extent: default_extent(),
            work_us: 0,
            work_jitter_us: 0,
            seed: 0,
        }
    }
}

/// Point body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

/// Snapshot for status output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorldSummary {
    pub ticks: u64,
    pub sim_time: Duration,
    pub bodies: usize,
    pub last_delta: Duration,
}

/// Simulation host used by the `server` binary.
pub struct DemoWorld {
    bodies: Vec<Body>,
    extent: f64,
    ticks: u64,
    sim_time: Duration,
    delta: Duration,
    work: Duration,
    jitter_us: u64,
    rng: StdRng,
}

impl DemoWorld {
    pub fn new(cfg: &WorldConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let extent = cfg.extent.abs().max(1.0);
        let bodies = (0..cfg.bodies)
            .map(|_| Body {
                x: rng.gen_range(-extent..extent),
                y: rng.gen_range(-extent..extent),
                vx: rng.gen_range(-64.0..64.0),
                vy: rng.gen_range(-64.0..64.0),
            })
            .collect();

        Self {
            bodies,
            extent,
            ticks: 0,
            sim_time: Duration::ZERO,
            delta: Duration::ZERO,
            work: Duration::from_micros(cfg.work_us),
            jitter_us: cfg.work_jitter_us,
            rng,
        }
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Adds a body. Callers off the tick thread go through the gate.
    pub fn spawn(&mut self, body: Body) {
        self.bodies.push(body);
    }

    pub fn summary(&self) -> WorldSummary {
        WorldSummary {
            ticks: self.ticks,
            sim_time: self.sim_time,
            bodies: self.bodies.len(),
            last_delta: self.delta,
        }
    }

    fn burn_work(&mut self) {
        let jitter = if self.jitter_us > 0 {
            Duration::from_micros(self.rng.gen_range(0..=self.jitter_us))
        } else {
            Duration::ZERO
        };
        let cost = self.work + jitter;
        if !cost.is_zero() {
            std::thread::sleep(cost);
        }
    }
}

impl SimulationHost for DemoWorld {
    fn pre_tick(&mut self, delta: Duration) -> anyhow::Result<()> {
        self.delta = delta;
        Ok(())
    }

    fn tick(&mut self) -> anyhow::Result<()> {
        let dt = self.delta.as_secs_f64();
        let extent = self.extent;
        for (i, body) in self.bodies.iter_mut().enumerate() {
            body.x += body.vx * dt;
            body.y += body.vy * dt;
            if !(body.x.is_finite() && body.y.is_finite()) {
                bail!("body {i} left the arena with a non-finite position");
            }
            if body.x.abs() > extent {
                body.vx = -body.vx;
                body.x = body.x.clamp(-extent, extent);
            }
            if body.y.abs() > extent {
                body.vy = -body.vy;
                body.y = body.y.clamp(-extent, extent);
            }
        }

        self.burn_work();
        self.ticks += 1;
        self.sim_time += self.delta;
        Ok(())
    }
}
