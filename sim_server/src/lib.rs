//! `sim_server`
//!
//! Server-side tick scheduling:
//! - Fixed-timestep loop with catch-up coarsening
//! - Single gate serializing access to simulation state
//! - Cooperative shutdown and fatal-fault reporting
//! - Operator console and a demo world for the `server` binary
//!
//! Threading model:
//! - One dedicated thread runs `TickScheduler::start` (see `launch`)
//! - Every other thread goes through the `TickGate` or the `SchedulerHandle`

pub mod config;
pub mod console;
pub mod fault;
pub mod host;
pub mod launch;
pub mod scheduler;
pub mod world;

pub use fault::{FaultReport, SchedulerError};
pub use host::SimulationHost;
pub use scheduler::{SchedulerHandle, TickScheduler};
