// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use serial_test::serial;

use super::*;
use crate::bus::MessageBus;

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
fn hook_workers_drain_matching_messages() {
    let seen = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&seen);
    let hook = QueueHook::start(
        "db.query",
        None,
        2,
        Arc::new(move |_msg| {
            sink.fetch_add(1, Ordering::AcqRel);
        }),
        None,
    );
    let bus = MessageBus::new();
    bus.install_hook(Arc::clone(&hook));
    for _ in 0..5 {
        assert!(bus.enqueue(Message::new("db.query", false).into_ref()));
    }
    assert!(wait_for(|| seen.load(Ordering::Acquire) == 5, Duration::from_secs(2)));
    // Matching messages never reach the main queue.
    assert_eq!(bus.queued(), 0);
    bus.uninstall_hook("db.query", None);
}

#[test]
#[serial]
fn non_matching_messages_take_the_main_queue() {
    let hook = QueueHook::start("db.query", None, 1, Arc::new(|_| {}), None);
    let bus = MessageBus::new();
    bus.install_hook(Arc::clone(&hook));
    bus.enqueue(Message::new("call.cdr", false).into_ref());
    assert_eq!(bus.queued(), 1);
    bus.uninstall_hook("db.query", None);
}

#[test]
#[serial]
fn hook_filter_distinguishes_accounts() {
    let seen = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&seen);
    let hook = QueueHook::start(
        "db.query",
        Some(MessageFilter::literal("account", "cdr")),
        1,
        Arc::new(move |_| {
            sink.fetch_add(1, Ordering::AcqRel);
        }),
        None,
    );
    let bus = MessageBus::new();
    bus.install_hook(Arc::clone(&hook));

    let mut hit = Message::new("db.query", false);
    hit.set_param("account", "cdr");
    bus.enqueue(hit.into_ref());

    let mut miss = Message::new("db.query", false);
    miss.set_param("account", "billing");
    bus.enqueue(miss.into_ref());

    assert!(wait_for(|| seen.load(Ordering::Acquire) == 1, Duration::from_secs(2)));
    assert_eq!(bus.queued(), 1);
    bus.uninstall_hook("db.query", Some("cdr"));
}

#[test]
#[serial]
fn trap_fires_once_at_threshold() {
    let traps = Arc::new(AtomicUsize::new(0));
    let trap_sink = Arc::clone(&traps);
    let gate = Arc::new(AtomicUsize::new(0));
    let gate_in_worker = Arc::clone(&gate);
    let hook = QueueHook::start(
        "slow.sink",
        None,
        1,
        Arc::new(move |_| {
            // Stall the single worker so the backlog builds up.
            while gate_in_worker.load(Ordering::Acquire) == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
        }),
        Some((
            Arc::new(move || {
                trap_sink.fetch_add(1, Ordering::AcqRel);
            }) as TrapFn,
            3,
        )),
    );
    for _ in 0..8 {
        hook.push(Message::new("slow.sink", false).into_ref());
    }
    assert!(wait_for(|| traps.load(Ordering::Acquire) == 1, Duration::from_secs(2)));
    // More pushes do not re-fire the trap.
    hook.push(Message::new("slow.sink", false).into_ref());
    assert_eq!(traps.load(Ordering::Acquire), 1);
    gate.store(1, Ordering::Release);
    hook.stop();
}

#[test]
#[serial]
fn stopped_hook_rejects_pushes() {
    let hook = QueueHook::start("db.query", None, 1, Arc::new(|_| {}), None);
    hook.stop();
    assert!(!hook.push(Message::new("db.query", false).into_ref()));
}
