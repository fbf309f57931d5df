//! Fixed-timestep tick scheduler.
//!
//! One dedicated thread runs the loop top to bottom:
//!
//! ```text
//! Measuring      clock.sample() -> accumulator
//! Accommodating  catch-up policy picks the effective step
//! Ticking        while owed >= step: gate { pre_tick(step); tick() }
//! Sleeping       idle = target_delta - tick_cost (skipped when behind)
//! ```
//!
//! Other threads touch simulation state only through the same [`TickGate`],
//! or stop the loop with [`SchedulerHandle::request_shutdown`]. Shutdown is
//! polled before every tick and before sleeping; a tick in progress always
//! finishes.
//!
//! A fault from `pre_tick`/`tick` (an `Err` or a panic) ends the loop. It is
//! reported once to the [`DiagnosticSink`] and returned from
//! [`TickScheduler::start`]. There is no restart.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sim_shared::{
    accumulator::DeltaAccumulator,
    catch_up::CatchUpPolicy,
    clock::{Clock, MonotonicClock},
    config::{clamp_target_fps, target_delta, SchedulerConfig},
    gate::TickGate,
    shutdown::ShutdownSignal,
    sleep::{SignalSleeper, SleepController, SleepOutcome, Sleeper},
    tps::{TpsCell, TpsMeter},
};
use tracing::{debug, info};

use crate::fault::{DiagnosticSink, FaultReport, SchedulerError, TickPhase, TracingSink};
use crate::host::SimulationHost;

/// Timing state owned by the scheduler thread for one run.
#[derive(Debug, Clone)]
pub struct TickState {
    /// Effective target rate (already clamped).
    pub target_fps: f64,
    /// `1 / target_fps`, re-derived every outer iteration.
    pub target_delta: Duration,
    pub accumulator: DeltaAccumulator,
    /// Last measured achieved rate. Diagnostic only.
    pub current_tps: u32,
    pub shutdown_requested: bool,
    /// Rate as last requested, before clamping.
    requested_fps: f64,
}

/// What [`TickState::refresh_target`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetRefresh {
    /// The effective rate changed.
    pub changed: bool,
    /// A newly requested rate was out of range and replaced by the default.
    pub fell_back: bool,
}

impl TickState {
    pub fn new(requested_fps: f64) -> Self {
        let target_fps = clamp_target_fps(requested_fps);
        Self {
            target_fps,
            target_delta: target_delta(target_fps),
            accumulator: DeltaAccumulator::new(),
            current_tps: 0,
            shutdown_requested: false,
            requested_fps,
        }
    }

    /// Owed simulation time.
    pub fn accumulated_delta(&self) -> Duration {
        self.accumulator.owed()
    }

    /// Re-derives the target from the requested rate.
    ///
    /// An out-of-range request is reported once, when it is first seen.
    pub fn refresh_target(&mut self, requested_fps: f64) -> TargetRefresh {
        // Bit comparison so a repeated NaN request counts as the same request.
        let new_request = requested_fps.to_bits() != self.requested_fps.to_bits();
        self.requested_fps = requested_fps;

        let fps = clamp_target_fps(requested_fps);
        let fell_back = new_request && fps != requested_fps;
        if fell_back {
            debug!(requested = requested_fps, effective = fps, "Target rate out of range");
        }
        if fps == self.target_fps {
            return TargetRefresh {
                changed: false,
                fell_back,
            };
        }
        self.target_fps = fps;
        self.target_delta = target_delta(fps);
        TargetRefresh {
            changed: true,
            fell_back,
        }
    }
}

/// Totals for a run that ended cooperatively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub iterations: u64,
    /// Backlog dropped by the catch-up cap.
    pub discarded: Duration,
}

#[derive(Debug)]
struct Shared {
    shutdown: Arc<ShutdownSignal>,
    target_fps_bits: AtomicU64,
    tps: TpsCell,
    ticks: AtomicU64,
    running: AtomicBool,
    finished: AtomicBool,
}

/// Cloneable, thread-safe handle to a scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    fn new(target_fps: f64) -> Self {
        Self {
            shared: Arc::new(Shared {
                shutdown: Arc::new(ShutdownSignal::new()),
                target_fps_bits: AtomicU64::new(target_fps.to_bits()),
                tps: TpsCell::default(),
                ticks: AtomicU64::new(0),
                running: AtomicBool::new(false),
                finished: AtomicBool::new(false),
            }),
        }
    }

    /// Asks the loop to stop. Callable from any thread, any number of times.
    pub fn request_shutdown(&self) {
        self.shared.shutdown.request();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shared.shutdown.is_requested()
    }

    /// Signal shared with the scheduler's sleeper.
    pub fn shutdown_signal(&self) -> Arc<ShutdownSignal> {
        Arc::clone(&self.shared.shutdown)
    }

    /// Requests a new target rate. Takes effect on the next outer iteration;
    /// out-of-range values fall back to the default rate.
    pub fn set_target_fps(&self, fps: f64) {
        self.shared
            .target_fps_bits
            .store(fps.to_bits(), Ordering::Relaxed);
    }

    /// Rate as last requested, before clamping.
    pub fn target_fps(&self) -> f64 {
        f64::from_bits(self.shared.target_fps_bits.load(Ordering::Relaxed))
    }

    /// Rate the loop actually uses.
    pub fn effective_target_fps(&self) -> f64 {
        clamp_target_fps(self.target_fps())
    }

    /// Achieved ticks per second over the last measurement window.
    ///
    /// Best-effort; may lag the loop by a window.
    pub fn current_tps(&self) -> u32 {
        self.shared.tps.load()
    }

    /// Ticks completed so far.
    pub fn ticks_run(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    /// Whether `start()` is currently executing.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Whether `start()` has returned, cleanly or with a fault.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }
}

struct Batch {
    ticks: u32,
    stopped: bool,
}

/// The main loop.
pub struct TickScheduler<H> {
    gate: Arc<TickGate<H>>,
    handle: SchedulerHandle,
    policy: CatchUpPolicy,
    sleep: SleepController,
    clock: Box<dyn Clock>,
    sleeper: Box<dyn Sleeper>,
    sink: Arc<dyn DiagnosticSink>,
    tps_window: Duration,
    in_flight: TickPhase,
    summary: RunSummary,
}

impl<H: SimulationHost> TickScheduler<H> {
    /// Creates a scheduler driving the host behind `gate`.
    ///
    /// Uses the monotonic clock, a shutdown-aware sleeper and the tracing
    /// sink unless overridden.
    pub fn new(gate: Arc<TickGate<H>>, config: &SchedulerConfig) -> Self {
        let handle = SchedulerHandle::new(config.target_fps);
        let sleeper = SignalSleeper::new(handle.shutdown_signal());
        Self {
            gate,
            handle,
            policy: CatchUpPolicy::new(config.catch_up),
            sleep: SleepController,
            clock: Box::new(MonotonicClock::new()),
            sleeper: Box::new(sleeper),
            sink: Arc::new(TracingSink),
            tps_window: config.tps_window(),
            in_flight: TickPhase::Scheduler,
            summary: RunSummary::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn gate(&self) -> Arc<TickGate<H>> {
        Arc::clone(&self.gate)
    }

    /// Runs the loop on the calling thread until shutdown or a fault.
    pub fn start(mut self) -> Result<RunSummary, SchedulerError> {
        let mut state = TickState::new(self.handle.target_fps());
        info!(
            target_fps = state.target_fps,
            threshold = self.policy.threshold(),
            "Tick scheduler starting"
        );

        self.handle.shared.running.store(true, Ordering::Release);
        self.clock.restart();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_loop(&mut state)));
        let result = match outcome {
            Ok(Ok(())) => Ok(self.summary),
            Ok(Err(report)) => Err(report),
            Err(payload) => Err(FaultReport::from_panic(
                self.in_flight,
                self.summary.ticks,
                payload.as_ref(),
            )),
        };

        self.handle.shared.finished.store(true, Ordering::Release);
        self.handle.shared.running.store(false, Ordering::Release);

        match result {
            Ok(summary) => {
                info!(
                    ticks = summary.ticks,
                    iterations = summary.iterations,
                    "Tick scheduler stopped"
                );
                Ok(summary)
            }
            Err(report) => {
                self.sink.report_fault(&report);
                Err(SchedulerError::Fault(report))
            }
        }
    }

    fn run_loop(&mut self, state: &mut TickState) -> Result<(), FaultReport> {
        let mut tps = TpsMeter::new(self.tps_window);

        loop {
            if self.observe_shutdown(state) {
                return Ok(());
            }

            if state.refresh_target(self.handle.target_fps()).changed {
                info!(target_fps = state.target_fps, "Target tick rate changed");
            }
            let elapsed = self.clock.sample();
            state.accumulator.accrue(elapsed);

            let plan = self
                .policy
                .resolve(&mut state.accumulator, state.target_delta);
            self.summary.discarded += plan.discarded;

            let started = Instant::now();
            let batch = self.run_batch(state, plan.effective_delta)?;
            let tick_cost = started.elapsed();
            self.summary.iterations += 1;

            if let Some(rate) = tps.record(elapsed, batch.ticks) {
                state.current_tps = rate;
                self.handle.shared.tps.store(rate);
                debug!(tps = rate, target_fps = state.target_fps, "Tick rate");
            }

            if batch.stopped || self.observe_shutdown(state) {
                return Ok(());
            }

            match self
                .sleep
                .settle(self.sleeper.as_mut(), state.target_delta, tick_cost)
            {
                SleepOutcome::Slept(_) => {}
                SleepOutcome::Behind(overrun) => debug!(
                    overrun_ms = overrun.as_secs_f64() * 1000.0,
                    ticks = batch.ticks,
                    "Tick batch overran its budget, not sleeping"
                ),
            }
        }
    }

    /// Runs as many ticks of `step` as the balance pays for.
    fn run_batch(&mut self, state: &mut TickState, step: Duration) -> Result<Batch, FaultReport> {
        let mut ticks = 0;
        loop {
            if self.observe_shutdown(state) {
                return Ok(Batch {
                    ticks,
                    stopped: true,
                });
            }
            // `>=`: a backlog of exactly k steps runs k ticks and leaves 0 owed.
            if !state.accumulator.try_consume(step) {
                break;
            }
            self.run_tick(step)?;
            ticks += 1;
        }
        Ok(Batch {
            ticks,
            stopped: false,
        })
    }

    /// One `pre_tick` + `tick` pair under the gate.
    fn run_tick(&mut self, step: Duration) -> Result<(), FaultReport> {
        let tick = self.summary.ticks;
        let mut host = self.gate.acquire();

        self.in_flight = TickPhase::PreTick;
        host.pre_tick(step)
            .map_err(|e| FaultReport::from_error(TickPhase::PreTick, tick, &e))?;

        self.in_flight = TickPhase::Tick;
        host.tick()
            .map_err(|e| FaultReport::from_error(TickPhase::Tick, tick, &e))?;

        self.in_flight = TickPhase::Scheduler;
        host.release();

        self.summary.ticks += 1;
        self.handle.shared.ticks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn observe_shutdown(&self, state: &mut TickState) -> bool {
        state.shutdown_requested = self.handle.is_shutdown_requested();
        state.shutdown_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use anyhow::bail;
    use sim_shared::{clock::ScriptedClock, config::CatchUpConfig, sleep::RecordingSleeper};

    type TickHook = Box<dyn FnMut(u32) -> anyhow::Result<()> + Send>;

    /// Host recording every callback, with an optional per-tick hook.
    #[derive(Default)]
    struct RecordingHost {
        deltas: Vec<Duration>,
        events: Vec<&'static str>,
        ticks: u32,
        on_tick: Option<TickHook>,
    }

    impl SimulationHost for RecordingHost {
        fn pre_tick(&mut self, delta: Duration) -> anyhow::Result<()> {
            self.deltas.push(delta);
            self.events.push("pre_tick");
            Ok(())
        }

        fn tick(&mut self) -> anyhow::Result<()> {
            self.events.push("tick");
            let n = self.ticks;
            self.ticks += 1;
            match self.on_tick.as_mut() {
                Some(hook) => hook(n),
                None => Ok(()),
            }
        }
    }

    fn hook(f: impl FnMut(u32) -> anyhow::Result<()> + Send + 'static) -> Option<TickHook> {
        Some(Box::new(f))
    }

    /// Records sleeps and requests shutdown after `limit` of them.
    struct StopAfterSleeps {
        recorder: RecordingSleeper,
        signal: Arc<ShutdownSignal>,
        limit: usize,
    }

    impl Sleeper for StopAfterSleeps {
        fn sleep(&mut self, duration: Duration) {
            self.recorder.sleep(duration);
            if self.recorder.calls().len() >= self.limit {
                self.signal.request();
            }
        }
    }

    #[derive(Default)]
    struct CountingSink {
        reports: Mutex<Vec<FaultReport>>,
    }

    impl DiagnosticSink for CountingSink {
        fn report_fault(&self, report: &FaultReport) {
            self.reports.lock().unwrap().push(report.clone());
        }
    }

    fn config(fps: f64) -> SchedulerConfig {
        SchedulerConfig {
            target_fps: fps,
            ..SchedulerConfig::default()
        }
    }

    fn td(fps: f64) -> Duration {
        target_delta(fps)
    }

    /// Scheduler over `host` with a scripted clock, stopping after `sleeps`
    /// sleeps.
    fn scripted(
        host: RecordingHost,
        cfg: &SchedulerConfig,
        samples: Vec<Duration>,
        sleeps: usize,
    ) -> (TickScheduler<RecordingHost>, RecordingSleeper) {
        let gate = Arc::new(TickGate::new(host));
        let scheduler = TickScheduler::new(gate, cfg);
        let recorder = RecordingSleeper::new();
        let sleeper = StopAfterSleeps {
            recorder: recorder.clone(),
            signal: scheduler.handle().shutdown_signal(),
            limit: sleeps,
        };
        let scheduler = scheduler
            .with_clock(ScriptedClock::new(samples))
            .with_sleeper(sleeper);
        (scheduler, recorder)
    }

    #[test]
    fn exact_backlog_runs_exact_ticks() {
        for k in 0..=3u32 {
            let (scheduler, _) = scripted(RecordingHost::default(), &config(30.0), vec![td(30.0) * k], 1);
            let gate = scheduler.gate();
            let summary = scheduler.start().unwrap();

            assert_eq!(summary.ticks, u64::from(k));
            assert_eq!(summary.iterations, 1);
            let host = gate.acquire();
            assert_eq!(host.deltas, vec![td(30.0); k as usize]);
        }
    }

    #[test]
    fn pre_tick_always_precedes_tick() {
        let (scheduler, _) = scripted(RecordingHost::default(), &config(30.0), vec![td(30.0) * 2], 1);
        let gate = scheduler.gate();
        scheduler.start().unwrap();
        assert_eq!(gate.acquire().events, vec!["pre_tick", "tick", "pre_tick", "tick"]);
    }

    #[test]
    fn large_backlog_coarsens_and_carries_remainder() {
        let step = td(30.0);
        let (scheduler, _) = scripted(
            RecordingHost::default(),
            &config(30.0),
            vec![step * 10, Duration::ZERO],
            2,
        );
        let gate = scheduler.gate();
        let summary = scheduler.start().unwrap();

        // 10x backlog: two ticks at 4x, then the 2x remainder at 1x.
        assert_eq!(summary.ticks, 4);
        assert_eq!(gate.acquire().deltas, vec![step * 4, step * 4, step, step]);
    }

    #[test]
    fn capped_backlog_is_dropped() {
        let cfg = SchedulerConfig {
            catch_up: CatchUpConfig {
                max_doublings: 1,
                ..CatchUpConfig::default()
            },
            ..config(30.0)
        };
        let step = td(30.0);
        let (scheduler, _) = scripted(RecordingHost::default(), &cfg, vec![step * 100], 1);
        let summary = scheduler.start().unwrap();
        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.discarded, step * 94);
    }

    #[test]
    fn sleeps_remaining_budget() {
        let (scheduler, recorder) = scripted(RecordingHost::default(), &config(30.0), vec![td(30.0)], 3);
        scheduler.start().unwrap();

        let calls = recorder.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|d| *d > Duration::ZERO && *d <= td(30.0)));
    }

    #[test]
    fn no_sleep_when_ticking_overruns_budget() {
        // 600 fps -> ~1.7ms budget, each tick takes 10ms.
        let cfg = config(600.0);
        let gate = Arc::new(TickGate::new(RecordingHost::default()));
        let scheduler = TickScheduler::new(Arc::clone(&gate), &cfg);
        let handle = scheduler.handle();
        gate.with(|h| {
            h.on_tick = hook(move |n| {
                std::thread::sleep(Duration::from_millis(10));
                if n == 2 {
                    handle.request_shutdown();
                }
                Ok(())
            });
        });
        let recorder = RecordingSleeper::new();
        let scheduler = scheduler
            .with_clock(ScriptedClock::new(Vec::new()).with_fallback(td(600.0)))
            .with_sleeper(recorder.clone());

        let summary = scheduler.start().unwrap();
        assert_eq!(summary.ticks, 3);
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn shutdown_mid_batch_finishes_current_tick_only() {
        let gate = Arc::new(TickGate::new(RecordingHost::default()));
        let scheduler = TickScheduler::new(Arc::clone(&gate), &config(30.0));
        let handle = scheduler.handle();
        gate.with(|h| {
            h.on_tick = hook(move |_| {
                handle.request_shutdown();
                Ok(())
            });
        });
        let recorder = RecordingSleeper::new();
        let summary = scheduler
            .with_clock(ScriptedClock::new([td(30.0) * 3]))
            .with_sleeper(recorder.clone())
            .start()
            .unwrap();

        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.iterations, 1);
        assert!(recorder.calls().is_empty());
        assert_eq!(gate.acquire().ticks, 1);
    }

    #[test]
    fn shutdown_before_start_runs_nothing() {
        let (scheduler, recorder) = scripted(RecordingHost::default(), &config(30.0), vec![td(30.0) * 3], 5);
        scheduler.handle().request_shutdown();
        let summary = scheduler.start().unwrap();
        assert_eq!(summary, RunSummary::default());
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn tick_error_is_fatal_and_reported_once() {
        let host = RecordingHost {
            on_tick: hook(|n| {
                if n == 1 {
                    bail!("entity table corrupted");
                }
                Ok(())
            }),
            ..RecordingHost::default()
        };
        let sink = Arc::new(CountingSink::default());
        let (scheduler, _) = scripted(host, &config(30.0), vec![td(30.0) * 3], 10);
        let gate = scheduler.gate();
        let err = scheduler.with_sink(sink.clone()).start().unwrap_err();

        let report = err.report();
        assert_eq!(report.phase, TickPhase::Tick);
        assert_eq!(report.tick, 1);
        assert_eq!(report.message, "entity table corrupted");
        assert_eq!(sink.reports.lock().unwrap().len(), 1);
        // Not retried: the third owed tick never ran.
        assert_eq!(gate.acquire().ticks, 2);
    }

    #[test]
    fn pre_tick_error_skips_tick() {
        struct FailingPreTick {
            ticked: bool,
        }

        impl SimulationHost for FailingPreTick {
            fn pre_tick(&mut self, _delta: Duration) -> anyhow::Result<()> {
                bail!("no spawn points")
            }

            fn tick(&mut self) -> anyhow::Result<()> {
                self.ticked = true;
                Ok(())
            }
        }

        let gate = Arc::new(TickGate::new(FailingPreTick { ticked: false }));
        let sink = Arc::new(CountingSink::default());
        let err = TickScheduler::new(Arc::clone(&gate), &config(30.0))
            .with_clock(ScriptedClock::new([td(30.0)]))
            .with_sleeper(RecordingSleeper::new())
            .with_sink(sink.clone())
            .start()
            .unwrap_err();

        assert_eq!(err.report().phase, TickPhase::PreTick);
        assert!(!gate.acquire().ticked);
        assert_eq!(sink.reports.lock().unwrap().len(), 1);
    }

    #[test]
    fn panic_in_tick_becomes_fault() {
        let host = RecordingHost {
            on_tick: hook(|_| panic!("attempt to divide by zero")),
            ..RecordingHost::default()
        };
        let sink = Arc::new(CountingSink::default());
        let (scheduler, _) = scripted(host, &config(30.0), vec![td(30.0)], 10);
        let gate = scheduler.gate();
        let handle = scheduler.handle();
        let err = scheduler.with_sink(sink.clone()).start().unwrap_err();

        assert_eq!(err.report().phase, TickPhase::Tick);
        assert!(err.report().message.contains("attempt to divide by zero"));
        assert_eq!(sink.reports.lock().unwrap().len(), 1);
        assert!(!handle.is_running());
        // State is left as the failing tick left it.
        assert_eq!(gate.acquire().ticks, 1);
    }

    #[test]
    fn target_rate_change_applies_next_iteration() {
        let gate = Arc::new(TickGate::new(RecordingHost::default()));
        let scheduler = TickScheduler::new(Arc::clone(&gate), &config(30.0));
        let handle = scheduler.handle();
        let h = handle.clone();
        gate.with(|host| {
            host.on_tick = hook(move |n| {
                if n == 0 {
                    h.set_target_fps(60.0);
                }
                Ok(())
            });
        });
        let recorder = RecordingSleeper::new();
        let sleeper = StopAfterSleeps {
            recorder: recorder.clone(),
            signal: handle.shutdown_signal(),
            limit: 2,
        };
        scheduler
            .with_clock(ScriptedClock::new([td(30.0), td(60.0)]))
            .with_sleeper(sleeper)
            .start()
            .unwrap();

        assert_eq!(gate.acquire().deltas, vec![td(30.0), td(60.0)]);
        let calls = recorder.calls();
        assert!(calls[1] <= td(60.0));
        assert_eq!(handle.effective_target_fps(), 60.0);
    }

    #[test]
    fn out_of_range_rate_uses_default() {
        for fps in [0.0, -5.0, 1000.0, f64::NAN] {
            let (scheduler, _) = scripted(RecordingHost::default(), &config(fps), vec![td(30.0)], 1);
            let gate = scheduler.gate();
            scheduler.start().unwrap();
            assert_eq!(gate.acquire().deltas, vec![td(30.0)]);
        }
    }

    #[test]
    fn achieved_rate_is_published() {
        let cfg = SchedulerConfig {
            tps_window_ms: 100,
            ..config(50.0)
        };
        // 20ms per sample -> one tick per iteration -> 50 tps.
        let samples = vec![td(50.0); 10];
        let (scheduler, _) = scripted(RecordingHost::default(), &cfg, samples, 10);
        let handle = scheduler.handle();
        let summary = scheduler.start().unwrap();

        assert_eq!(summary.ticks, 10);
        assert_eq!(handle.ticks_run(), 10);
        assert_eq!(handle.current_tps(), 50);
    }

    #[test]
    fn tick_state_refresh_reports_changes() {
        let mut state = TickState::new(30.0);
        assert_eq!(state.refresh_target(30.0), TargetRefresh::default());
        assert_eq!(
            state.refresh_target(-1.0),
            TargetRefresh {
                changed: false,
                fell_back: true
            }
        );
        assert!(state.refresh_target(120.0).changed);
        assert_eq!(state.target_delta, td(120.0));
        assert_eq!(state.accumulated_delta(), Duration::ZERO);
    }

    #[test]
    fn out_of_range_request_is_reported_once() {
        let mut state = TickState::new(30.0);
        assert!(state.refresh_target(1000.0).fell_back);
        assert!(!state.refresh_target(1000.0).fell_back);
        assert!(!state.refresh_target(1000.0).fell_back);
        assert_eq!(state.target_fps, 30.0);

        assert!(state.refresh_target(f64::NAN).fell_back);
        assert!(!state.refresh_target(f64::NAN).fell_back);

        // A different bad value is a new request.
        assert!(state.refresh_target(0.0).fell_back);
        assert!(!state.refresh_target(60.0).fell_back);
        assert!(state.refresh_target(1000.0).fell_back);
    }

    #[test]
    fn handle_reports_finished_after_fault() {
        let host = RecordingHost {
            on_tick: hook(|_| bail!("boom")),
            ..RecordingHost::default()
        };
        let (scheduler, _) = scripted(host, &config(30.0), vec![td(30.0)], 10);
        let handle = scheduler.handle();
        assert!(!handle.is_finished());
        scheduler
            .with_sink(Arc::new(CountingSink::default()))
            .start()
            .unwrap_err();

        assert!(handle.is_finished());
        assert!(!handle.is_running());
        assert!(!handle.is_shutdown_requested());
    }

    #[test]
    fn exact_backlog_leaves_nothing_owed() {
        let mut state = TickState::new(30.0);
        state.accumulator.accrue(td(30.0) * 3);
        let gate = Arc::new(TickGate::new(RecordingHost::default()));
        let mut scheduler = TickScheduler::new(gate, &config(30.0));

        let batch = scheduler.run_batch(&mut state, td(30.0)).unwrap();
        assert_eq!(batch.ticks, 3);
        assert!(!batch.stopped);
        assert_eq!(state.accumulated_delta(), Duration::ZERO);
    }
}
