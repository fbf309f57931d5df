//! `sim_shared`
//!
//! Timing building blocks used by the server tick scheduler.
//!
//! Design goals:
//! - Exact time bookkeeping (integer nanoseconds via `Duration`).
//! - Every piece testable without real time passing (clock and sleeper are traits).
//! - One mutual-exclusion boundary around simulation state.
//! - No `unsafe`.

pub mod accumulator;
pub mod catch_up;
pub mod clock;
pub mod config;
pub mod gate;
pub mod shutdown;
pub mod sleep;
pub mod tps;

