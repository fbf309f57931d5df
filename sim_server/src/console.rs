//! Operator console.
//!
//! Commands:
//!   status           - Scheduler and world status
//!   tickrate [fps]   - Show or set the target tick rate
//!   stall <ms>       - Hold the tick gate from the console thread
//!   quit | exit      - Request shutdown
//!   help             - List commands
//!
//! Runs on whatever thread reads operator input. Anything that reads world
//! state goes through the tick gate, like any other non-scheduler thread.

use std::sync::Arc;
use std::time::Duration;

use sim_shared::{config::DEFAULT_TARGET_FPS, gate::TickGate};
use tracing::{info, warn};

use crate::scheduler::SchedulerHandle;
use crate::world::DemoWorld;

/// Longest stall the console will inject.
const MAX_STALL_MS: u64 = 60_000;

/// Console bound to a running scheduler and its world.
pub struct ServerConsole {
    handle: SchedulerHandle,
    gate: Arc<TickGate<DemoWorld>>,
}

impl ServerConsole {
    pub fn new(handle: SchedulerHandle, gate: Arc<TickGate<DemoWorld>>) -> Self {
        Self { handle, gate }
    }

    /// Executes one console line, returning the lines to print.
    pub fn exec(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let line = line.trim();
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() || line.starts_with("//") {
            return Ok(Vec::new());
        }

        match tokens[0] {
            "status" => Ok(self.status()),
            "tickrate" => Ok(self.tickrate(&tokens[1..])),
            "stall" => {
                let Some(ms) = tokens.get(1).and_then(|t| t.parse::<u64>().ok()) else {
                    return Ok(vec!["Usage: stall <ms>".to_string()]);
                };
                let ms = ms.min(MAX_STALL_MS);
                warn!(ms, "Stalling tick gate from console");
                self.gate.with(|_| std::thread::sleep(Duration::from_millis(ms)));
                Ok(vec![format!("Held tick gate for {ms} ms")])
            }
            "quit" | "exit" => {
                info!("Shutdown requested from console");
                self.handle.request_shutdown();
                Ok(vec!["Shutting down".to_string()])
            }
            "help" => Ok(vec![
                "Available commands: status, tickrate [fps], stall <ms>, quit".to_string(),
            ]),
            other => Ok(vec![format!("Unknown command: {other}")]),
        }
    }

    fn status(&self) -> Vec<String> {
        let state = if self.handle.is_running() {
            "Running"
        } else if self.handle.is_finished() {
            "Stopped"
        } else {
            "Starting"
        };
        let world = self.gate.with(|w| w.summary());

        vec![
            format!("Scheduler: {state}"),
            format!(
                "Tick rate: target {} (requested {}), achieved {} tps",
                self.handle.effective_target_fps(),
                self.handle.target_fps(),
                self.handle.current_tps()
            ),
            format!("Ticks: {}", self.handle.ticks_run()),
            format!(
                "World: {} bodies, sim time {:.3}s, last step {:.2}ms",
                world.bodies,
                world.sim_time.as_secs_f64(),
                world.last_delta.as_secs_f64() * 1000.0
            ),
        ]
    }

    fn tickrate(&self, args: &[&str]) -> Vec<String> {
        let Some(arg) = args.first() else {
            return vec![format!(
                "tickrate = {} (default: {})",
                self.handle.effective_target_fps(),
                DEFAULT_TARGET_FPS
            )];
        };
        match arg.parse::<f64>() {
            Ok(fps) => {
                self.handle.set_target_fps(fps);
                let effective = self.handle.effective_target_fps();
                info!(requested = fps, effective, "Tick rate set from console");
                vec![format!("tickrate = {effective}")]
            }
            Err(_) => vec!["Usage: tickrate [fps]".to_string()],
        }
    }
}
