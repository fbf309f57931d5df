//! The scheduler's pre_tick/tick pair never interleaves with another gate holder.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sim_server::TickScheduler;
use sim_shared::config::SchedulerConfig;
use sim_shared::gate::TickGate;
use sim_tests::{init_tracing, CriticalSection, WorkHost};

#[test]
fn two_holders_never_overlap() {
    let section = Arc::new(CriticalSection::default());
    let gate = Arc::new(TickGate::new(0u64));

    let workers: Vec<_> = (0..2)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let section = Arc::clone(&section);
            thread::spawn(move || {
                for _ in 0..200 {
                    let mut guard = gate.acquire();
                    section.enter();
                    *guard += 1;
                    thread::yield_now();
                    section.leave();
                    guard.release();
                }
            })
        })
        .collect();

    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(section.overlaps(), 0);
    assert_eq!(*gate.acquire(), 400);
}

#[test]
fn scheduler_ticks_exclude_other_threads() {
    init_tracing();
    let section = Arc::new(CriticalSection::default());
    let host = WorkHost::new(Arc::clone(&section), Duration::from_micros(500));
    let gate = Arc::new(TickGate::new(host));
    let cfg = SchedulerConfig {
        target_fps: 200.0,
        ..SchedulerConfig::default()
    };
    let scheduler = TickScheduler::new(Arc::clone(&gate), &cfg);
    let handle = scheduler.handle();
    let tick_thread = thread::spawn(move || scheduler.start());

    // A "network" thread hammering the same state.
    let intruders: Vec<_> = (0..3)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let section = Arc::clone(&section);
            thread::spawn(move || {
                for _ in 0..100 {
                    gate.with(|host| {
                        section.enter();
                        let _ = host.ticks;
                        thread::sleep(Duration::from_micros(200));
                        section.leave();
                    });
                    thread::sleep(Duration::from_micros(300));
                }
            })
        })
        .collect();

    for i in intruders {
        i.join().unwrap();
    }
    handle.request_shutdown();
    let summary = tick_thread.join().unwrap().unwrap();

    assert!(summary.ticks > 0);
    assert_eq!(section.overlaps(), 0);
    assert_eq!(section.entries(), summary.ticks + 300);
}
