//! Simulation host abstraction.
//!
//! The scheduler treats the simulation body as an opaque pair of callbacks.
//! Both run only while the tick gate is held.

use std::time::Duration;

/// Simulation driven by the tick scheduler.
pub trait SimulationHost: Send {
    /// Prepares a tick that will advance state by `delta`.
    fn pre_tick(&mut self, delta: Duration) -> anyhow::Result<()>;

    /// Advances the simulation one tick.
    fn tick(&mut self) -> anyhow::Result<()>;
}

impl<H: SimulationHost + ?Sized> SimulationHost for Box<H> {
    fn pre_tick(&mut self, delta: Duration) -> anyhow::Result<()> {
        (**self).pre_tick(delta)
    }

    fn tick(&mut self) -> anyhow::Result<()> {
        (**self).tick()
    }
}
