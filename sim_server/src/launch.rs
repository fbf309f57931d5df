//! Thread layout for the `server` binary.
//!
//! The tick loop and the console each get a named OS thread. The async side
//! only waits: for the tick thread to finish, or for an interrupt, which it
//! turns into a shutdown request. Nothing that can block (gate holds, stdin)
//! runs on the runtime.

use std::future::Future;
use std::io::{BufRead, Write};
use std::thread::{self, JoinHandle};

use anyhow::Context;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::console::ServerConsole;
use crate::host::SimulationHost;
use crate::scheduler::{RunSummary, SchedulerHandle, TickScheduler};
use crate::SchedulerError;

pub type RunResult = Result<RunSummary, SchedulerError>;

/// A scheduler running on its own thread.
pub struct TickThread {
    join: JoinHandle<()>,
    done: oneshot::Receiver<RunResult>,
}

/// Starts `scheduler` on a thread named `sim-tick`.
pub fn spawn_tick_thread<H>(scheduler: TickScheduler<H>) -> anyhow::Result<TickThread>
where
    H: SimulationHost + 'static,
{
    let (tx, done) = oneshot::channel();
    let join = thread::Builder::new()
        .name("sim-tick".into())
        .spawn(move || {
            // The receiver is gone only if the supervisor was dropped.
            let _ = tx.send(scheduler.start());
        })
        .context("spawn tick thread")?;
    Ok(TickThread { join, done })
}

/// Reads console lines from `input` on a thread named `sim-console` and
/// writes each command's output to `output`.
///
/// Commands run on this thread, so a long `stall` blocks only the console.
/// The thread ends at end of input or when the scheduler has finished.
pub fn spawn_console_thread<R, W>(
    mut console: ServerConsole,
    handle: SchedulerHandle,
    mut input: R,
    mut output: W,
) -> anyhow::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    thread::Builder::new()
        .name("sim-console".into())
        .spawn(move || loop {
            let _ = write!(output, "] ");
            let _ = output.flush();
            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            if handle.is_finished() {
                break;
            }
            match console.exec(&line) {
                Ok(out) => {
                    for l in out {
                        let _ = writeln!(output, "{l}");
                    }
                }
                Err(e) => warn!(error = %e, "Console command failed"),
            }
        })
        .context("spawn console thread")
}

/// Waits for the tick thread to finish. The first completion of `interrupt`
/// requests shutdown; the loop then winds down on its own.
pub async fn supervise<F>(
    tick: TickThread,
    handle: &SchedulerHandle,
    interrupt: F,
) -> anyhow::Result<RunResult>
where
    F: Future<Output = ()>,
{
    let TickThread { join, mut done } = tick;
    tokio::pin!(interrupt);
    let mut interrupted = false;

    let result = loop {
        tokio::select! {
            result = &mut done => break result,
            _ = &mut interrupt, if !interrupted => {
                interrupted = true;
                info!("Interrupt received, shutting down");
                handle.request_shutdown();
            }
        }
    };

    let joined = tokio::task::spawn_blocking(move || join.join())
        .await
        .context("join tick thread")?;
    if joined.is_err() {
        anyhow::bail!("tick thread panicked outside the scheduler");
    }
    result.context("tick thread dropped its result")
}
