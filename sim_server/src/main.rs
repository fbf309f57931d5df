//! Standalone server binary.
//!
//! Usage:
//!   cargo run -p sim_server -- [--config server.json] [--tick-hz 30] [--bodies 64] [--work-us 0] [--jitter-us 0]
//!
//! The server runs the demo world on a dedicated tick thread and executes
//! operator commands from stdin on a console thread.
//!
//! Console commands:
//!   status          - Show scheduler and world status
//!   tickrate <fps>  - Change the target tick rate
//!   stall <ms>      - Hold the tick gate (provokes catch-up)
//!   quit            - Shutdown server

use std::env;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use sim_server::config::ServerConfig;
use sim_server::console::ServerConsole;
use sim_server::launch::{spawn_console_thread, spawn_tick_thread, supervise};
use sim_server::scheduler::TickScheduler;
use sim_server::world::DemoWorld;
use sim_shared::gate::TickGate;
use tracing::{info, warn};

fn parse_args() -> anyhow::Result<ServerConfig> {
    let args: Vec<String> = env::args().collect();

    // The config file is the base; flags override it.
    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => ServerConfig::load(&PathBuf::from(&args[i + 1]))?,
        _ => ServerConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--config", Some(_)) => i += 2,
            ("--tick-hz", Some(v)) => {
                cfg.scheduler.target_fps = v.parse().context("parse --tick-hz")?;
                i += 2;
            }
            ("--bodies", Some(v)) => {
                cfg.world.bodies = v.parse().context("parse --bodies")?;
                i += 2;
            }
            ("--work-us", Some(v)) => {
                cfg.world.work_us = v.parse().context("parse --work-us")?;
                i += 2;
            }
            ("--jitter-us", Some(v)) => {
                cfg.world.work_jitter_us = v.parse().context("parse --jitter-us")?;
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args()?;
    info!(
        tick_hz = cfg.scheduler.target_fps,
        bodies = cfg.world.bodies,
        work_us = cfg.world.work_us,
        "Starting server"
    );

    let gate = Arc::new(TickGate::new(DemoWorld::new(&cfg.world)));
    let scheduler = TickScheduler::new(Arc::clone(&gate), &cfg.scheduler);
    let handle = scheduler.handle();
    let console = ServerConsole::new(handle.clone(), Arc::clone(&gate));

    println!("Server ready. Type 'status' for info, 'tickrate <fps>' to retune, 'quit' to exit.");
    println!();

    let tick_thread = spawn_tick_thread(scheduler)?;
    // Detached: it may be parked in a read when the scheduler stops.
    spawn_console_thread(
        console,
        handle.clone(),
        BufReader::new(std::io::stdin()),
        std::io::stdout(),
    )?;

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    let result = supervise(tick_thread, &handle, interrupt).await?;

    match result {
        Ok(summary) => {
            info!(
                ticks = summary.ticks,
                iterations = summary.iterations,
                discarded_ms = summary.discarded.as_secs_f64() * 1000.0,
                "Server stopped"
            );
            Ok(())
        }
        Err(err) => {
            let dump = serde_json::to_string_pretty(err.report()).context("serialize fault report")?;
            eprintln!("{dump}");
            Err(err.into())
        }
    }
}
