//! Fault reporting.
//!
//! A failure raised by `pre_tick`/`tick` (error or panic) is fatal to the
//! scheduler: it is not retried, it is reported exactly once to a
//! [`DiagnosticSink`], and `start()` returns it.

use std::any::Any;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

/// Where in the loop a fault was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TickPhase {
    PreTick,
    Tick,
    /// Outside the simulation callbacks (a scheduler defect).
    Scheduler,
}

impl fmt::Display for TickPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickPhase::PreTick => write!(f, "pre_tick"),
            TickPhase::Tick => write!(f, "tick"),
            TickPhase::Scheduler => write!(f, "scheduler"),
        }
    }
}

/// Crash report for an abnormal scheduler exit.
#[derive(Debug, Clone, Serialize)]
pub struct FaultReport {
    pub phase: TickPhase,
    /// Zero-based index of the tick that failed.
    pub tick: u64,
    pub message: String,
    /// Source chain of the error, outermost first. Empty for panics.
    pub causes: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

impl FaultReport {
    pub fn from_error(phase: TickPhase, tick: u64, err: &anyhow::Error) -> Self {
        Self {
            phase,
            tick,
            message: err.to_string(),
            causes: err.chain().skip(1).map(|cause| cause.to_string()).collect(),
            occurred_at: Utc::now(),
        }
    }

    pub fn from_panic(phase: TickPhase, tick: u64, payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("panicked: {s}")
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("panicked: {s}")
        } else {
            "panicked with a non-string payload".to_string()
        };
        Self {
            phase,
            tick,
            message,
            causes: Vec::new(),
            occurred_at: Utc::now(),
        }
    }
}

impl fmt::Display for FaultReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed at tick {}: {}", self.phase, self.tick, self.message)?;
        for cause in &self.causes {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

/// Errors returned by [`TickScheduler::start`](crate::scheduler::TickScheduler::start).
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("simulation fault: {0}")]
    Fault(FaultReport),
}

impl SchedulerError {
    pub fn report(&self) -> &FaultReport {
        match self {
            SchedulerError::Fault(report) => report,
        }
    }
}

/// Receives the crash report when the scheduler dies.
pub trait DiagnosticSink: Send + Sync {
    fn report_fault(&self, report: &FaultReport);
}

/// Logs fault reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report_fault(&self, report: &FaultReport) {
        error!(
            phase = %report.phase,
            tick = report.tick,
            causes = ?report.causes,
            at = %report.occurred_at,
            "Tick scheduler crashed: {}",
            report.message
        );
    }
}
