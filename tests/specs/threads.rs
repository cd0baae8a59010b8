//! Thread-runtime specs
//!
//! Registry bookkeeping and the bounded two-phase shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serial_test::serial;

use tandem_threads as threads;

fn wait_for(cond: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

#[test]
#[serial]
fn registry_count_tracks_live_handles() {
    let running = Arc::new(AtomicUsize::new(0));
    for i in 0..10 {
        let tally = Arc::clone(&running);
        threads::create(&format!("spec-worker-{i}"), threads::Priority::Normal, move || {
            tally.fetch_add(1, Ordering::AcqRel);
            loop {
                if threads::msleep(2, true).is_err() {
                    return;
                }
            }
        })
        .unwrap();
    }
    assert!(wait_for(|| running.load(Ordering::Acquire) == 10, Duration::from_secs(2)));
    assert_eq!(threads::count(), 10);
    threads::cancel_all();
    assert!(wait_for(|| threads::count() == 0, Duration::from_secs(2)));
}

#[test]
#[serial]
fn shutdown_bound_on_uncooperative_workers() {
    // Workers that sleep in small slices and only honor the cancel flag.
    for i in 0..50 {
        threads::create(&format!("spec-stubborn-{i}"), threads::Priority::Normal, || loop {
            if threads::msleep(10, true).is_err() {
                return;
            }
        })
        .unwrap();
    }
    assert!(wait_for(|| threads::count() == 50, Duration::from_secs(2)));

    let soft_budget = 3 * threads::idle_msec() as u128;
    let hard_budget = 5u128 * 63;
    let slack = 3_000u128;
    let begin = Instant::now();
    threads::shutdown_all();
    let took = begin.elapsed().as_millis();

    assert_eq!(threads::count(), 0);
    assert!(
        took <= soft_budget + hard_budget + slack,
        "shutdown took {} ms",
        took
    );
}

#[test]
#[serial]
fn current_thread_identity_inside_workers() {
    let name = Arc::new(parking_lot::Mutex::new(None::<String>));
    let out = Arc::clone(&name);
    threads::create("spec-identity", threads::Priority::Normal, move || {
        *out.lock() = threads::current().map(|h| h.name().to_string());
    })
    .unwrap();
    assert!(wait_for(|| name.lock().is_some(), Duration::from_secs(2)));
    assert_eq!(name.lock().as_deref(), Some("spec-identity"));
    assert!(threads::current().is_none());
}
