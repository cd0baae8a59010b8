// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The timed-event worker behind `Engine.setInterval`/`setTimeout`.
//!
//! One worker thread per engine binding, started lazily with the first
//! scheduled callback. The pending list is kept sorted by firing time;
//! firing re-enters the interpreter through the worker's own runner.
//! Repeating events re-arm relative to the firing instant. The worker
//! exits when its engine binding is dropped.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

use tandem_core::now_msec;
use tandem_script::{FuncValue, Runner, ScriptContext, Value};
use tandem_threads as threads;

struct TimerEvent {
    id: u32,
    fire_at: u64,
    interval: u64,
    repeat: bool,
    func: FuncValue,
    args: Vec<Value>,
}

struct TimerShared {
    events: Mutex<Vec<TimerEvent>>,
    runner: Mutex<Runner>,
    next_id: AtomicU32,
    started: Mutex<bool>,
}

/// Handle owned by the engine binding; dropping it stops the worker.
pub struct TimerWorker {
    shared: Arc<TimerShared>,
}

impl TimerWorker {
    pub fn new(context: Arc<ScriptContext>) -> TimerWorker {
        TimerWorker {
            shared: Arc::new(TimerShared {
                events: Mutex::new(Vec::new()),
                runner: Mutex::new(Runner::for_context(context, "jsScheduler")),
                next_id: AtomicU32::new(0),
                started: Mutex::new(false),
            }),
        }
    }

    /// Schedule a callback. Intervals below the runtime idle interval are
    /// clamped up to it. Returns the non-zero event handle.
    pub fn add(&self, func: FuncValue, interval_ms: u64, repeat: bool, args: Vec<Value>) -> u32 {
        let interval = interval_ms.max(threads::idle_msec());
        let id = self.shared.next_id.fetch_add(1, Ordering::AcqRel) + 1;
        let event = TimerEvent { id, fire_at: now_msec() + interval, interval, repeat, func, args };
        {
            let mut events = self.shared.events.lock();
            let at = events
                .iter()
                .position(|e| e.fire_at > event.fire_at)
                .unwrap_or(events.len());
            events.insert(at, event);
        }
        self.ensure_worker();
        id
    }

    /// Remove a pending event; the repeat flag must match, so interval and
    /// timeout handles cannot cancel each other.
    pub fn remove(&self, id: u32, repeat: bool) -> bool {
        let mut events = self.shared.events.lock();
        match events.iter().position(|e| e.id == id) {
            Some(at) if events[at].repeat == repeat => {
                events.remove(at);
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.shared.events.lock().len()
    }

    fn ensure_worker(&self) {
        let mut started = self.shared.started.lock();
        if *started {
            return;
        }
        let shared = Arc::downgrade(&self.shared);
        match threads::create("jsScheduler", threads::Priority::Normal, move || {
            worker_loop(shared);
        }) {
            Ok(_) => *started = true,
            Err(e) => warn!(error = %e, "timer worker failed to start"),
        }
    }
}

fn worker_loop(shared: Weak<TimerShared>) {
    loop {
        if threads::check() {
            return;
        }
        // The engine binding holding the events is gone; stop quietly.
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let due = {
            let mut events = shared.events.lock();
            match events.first() {
                Some(head) if head.fire_at <= now_msec() => Some(events.remove(0)),
                _ => None,
            }
        };
        let Some(mut event) = due else {
            drop(shared);
            if threads::idle(true).is_err() {
                return;
            }
            continue;
        };
        fire(&shared, &event);
        if event.repeat {
            event.fire_at = now_msec() + event.interval;
            let mut events = shared.events.lock();
            let at = events
                .iter()
                .position(|e| e.fire_at > event.fire_at)
                .unwrap_or(events.len());
            events.insert(at, event);
        }
    }
}

fn fire(shared: &Arc<TimerShared>, event: &TimerEvent) {
    debug!(event = event.id, repeat = event.repeat, "timer event firing");
    let mut runner = shared.runner.lock();
    runner.reset(false);
    let state = runner.call_value(&event.func, event.args.clone());
    if state != tandem_script::RunState::Succeeded {
        debug!(event = event.id, ?state, "timer callback did not complete");
    }
    runner.pop_value();
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
