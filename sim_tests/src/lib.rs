//! Shared fixtures for the scheduler integration tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sim_server::SimulationHost;

/// Initialises test logging once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// Marker shared by every party that must hold the tick gate. Entering while
/// someone else is inside means exclusion was broken.
#[derive(Debug, Default)]
pub struct CriticalSection {
    inside: AtomicBool,
    overlaps: AtomicU64,
    entries: AtomicU64,
}

impl CriticalSection {
    pub fn enter(&self) {
        if self.inside.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.entries.fetch_add(1, Ordering::SeqCst);
    }

    pub fn leave(&self) {
        self.inside.store(false, Ordering::SeqCst);
    }

    pub fn overlaps(&self) -> u64 {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn entries(&self) -> u64 {
        self.entries.load(Ordering::SeqCst)
    }
}

/// Host that spends `cost` of wall time per tick inside the critical
/// section and can be told to fail at a given tick.
pub struct WorkHost {
    pub section: Arc<CriticalSection>,
    pub cost: Duration,
    pub fail_at: Option<u64>,
    pub ticks: u64,
    pub deltas: Vec<Duration>,
}

impl WorkHost {
    pub fn new(section: Arc<CriticalSection>, cost: Duration) -> Self {
        Self {
            section,
            cost,
            fail_at: None,
            ticks: 0,
            deltas: Vec::new(),
        }
    }
}

impl SimulationHost for WorkHost {
    fn pre_tick(&mut self, delta: Duration) -> anyhow::Result<()> {
        self.section.enter();
        self.deltas.push(delta);
        Ok(())
    }

    fn tick(&mut self) -> anyhow::Result<()> {
        if !self.cost.is_zero() {
            std::thread::sleep(self.cost);
        }
        let n = self.ticks;
        self.ticks += 1;
        self.section.leave();
        if self.fail_at == Some(n) {
            anyhow::bail!("tick {n} failed");
        }
        Ok(())
    }
}
