// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide thread registry.
//!
//! Owns every live [`ThreadHandle`]. Creation, cancellation and reaping are
//! serialized by the registry mutex, so the registry is always consistent
//! when observed under it.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::ThreadError;
use crate::handle::ThreadHandle;
use crate::priority::Priority;

/// Creation attempts before giving up on transient exhaustion.
const CREATE_ATTEMPTS: u32 = 5;
/// Pause between creation attempts.
const CREATE_RETRY_DELAY: Duration = Duration::from_micros(20);
/// Soft-cancel polls during shutdown before escalating.
const SOFT_WAITS: u32 = 3;
/// Hard-cancel attempts per thread during shutdown.
const HARD_KILLS: u32 = 5;
/// Exponential post-kill waits, ~63 ms per attempt in total.
const KILL_WAIT_STEPS_MS: [u64; 6] = [1, 2, 4, 8, 16, 32];

static IDLE_MSEC: AtomicU64 = AtomicU64::new(5);

/// Idle interval used by `idle()` sleeps and shutdown polling.
pub fn idle_msec() -> u64 {
    IDLE_MSEC.load(Ordering::Relaxed)
}

/// Set the idle interval, clamped to 1–1000 ms.
pub fn set_idle_msec(msec: u64) {
    IDLE_MSEC.store(msec.clamp(1, 1000), Ordering::Relaxed);
}

thread_local! {
    static CURRENT: RefCell<Option<ThreadHandle>> = const { RefCell::new(None) };
}

static REGISTRY: Lazy<Mutex<Vec<ThreadHandle>>> = Lazy::new(|| Mutex::new(Vec::new()));

type Entry = Box<dyn FnOnce() + Send + 'static>;

/// Handle of the calling thread, if it was created through the registry.
pub fn current() -> Option<ThreadHandle> {
    CURRENT.with(|c| c.borrow().clone())
}

/// Number of live registered threads.
pub fn count() -> usize {
    REGISTRY.lock().len()
}

/// Spawn a named thread and register its handle.
///
/// The handle is registered before the OS thread exists; transient spawn
/// failures are retried up to five times with a 20 µs pause. An elevated
/// priority the host refuses falls back to inherited scheduling once. The
/// spawned thread publishes its handle to thread-local storage, waits for
/// the creator to release it, then runs `entry`.
pub fn create(
    name: &str,
    priority: Priority,
    entry: impl FnOnce() + Send + 'static,
) -> Result<ThreadHandle, ThreadError> {
    let mut effective = priority;
    if let Err(e) = apply_priority(priority) {
        warn!(thread = name, priority = %priority, error = %e,
            "priority refused, retrying with inherited scheduling");
        effective = Priority::Normal;
    }
    let handle = ThreadHandle::new(name, effective);
    if let Some(creator) = current() {
        handle.set_counter(creator.counter());
    }
    REGISTRY.lock().push(handle.clone());

    // The entry lives in a shared cell so a failed spawn attempt does not
    // consume it; the thread that finally starts takes it out.
    let entry_cell: Arc<Mutex<Option<Entry>>> = Arc::new(Mutex::new(Some(Box::new(entry))));
    let mut last = String::new();
    for attempt in 1..=CREATE_ATTEMPTS {
        let thread_handle = handle.clone();
        let cell = Arc::clone(&entry_cell);
        let spawned = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                if let Some(body) = cell.lock().take() {
                    run_thread(thread_handle, body);
                }
            });
        match spawned {
            Ok(_join) => {
                // The join handle is dropped on purpose; reaping happens
                // through the registry when the thread unregisters itself.
                handle.state.started.store(true, Ordering::Release);
                return Ok(handle);
            }
            Err(e) => {
                debug!(thread = name, attempt, error = %e, "thread spawn failed");
                last = e.to_string();
                if attempt < CREATE_ATTEMPTS {
                    std::thread::sleep(CREATE_RETRY_DELAY);
                }
            }
        }
    }
    unregister(&handle);
    Err(ThreadError::Exhausted { attempts: CREATE_ATTEMPTS, reason: last })
}

fn run_thread(handle: ThreadHandle, entry: Entry) {
    CURRENT.with(|c| *c.borrow_mut() = Some(handle.clone()));
    handle.state.running.store(true, Ordering::Release);
    // Hold until the creator has finished publishing the handle.
    while !handle.started() {
        std::thread::sleep(Duration::from_micros(10));
    }
    handle.apply_pending_affinity();
    entry();
    handle.state.running.store(false, Ordering::Release);
    if let Some(hook) = handle.state.exit_hook.lock().take() {
        hook();
    }
    unregister(&handle);
    CURRENT.with(|c| *c.borrow_mut() = None);
}

fn unregister(handle: &ThreadHandle) {
    REGISTRY.lock().retain(|h| !h.same_as(handle));
}

fn others() -> Vec<ThreadHandle> {
    let me = current();
    REGISTRY
        .lock()
        .iter()
        .filter(|h| !me.as_ref().map(|m| m.same_as(h)).unwrap_or(false))
        .cloned()
        .collect()
}

/// Soft-cancel every registered thread except the caller.
pub fn cancel_all() {
    for h in others() {
        h.cancel(false);
    }
}

/// Two-phase shutdown of all registered threads.
///
/// Phase one soft-cancels everything except the caller and polls up to
/// three times, sleeping the idle interval between polls. Phase two makes
/// up to five hard-cancel attempts per survivor with an exponential wait of
/// at most ~63 ms each; threads still alive afterwards are detached from
/// the registry and abandoned to process teardown.
pub fn shutdown_all() {
    let survivors = others();
    info!(count = survivors.len(), "soft cancelling running threads");
    for h in &survivors {
        h.cancel(false);
    }
    for _ in 0..SOFT_WAITS {
        std::thread::sleep(Duration::from_millis(idle_msec()));
        if others().is_empty() {
            return;
        }
    }

    let survivors = others();
    warn!(count = survivors.len(), "hard cancelling remaining threads");
    for h in survivors {
        for attempt in 1..=HARD_KILLS {
            debug!(thread = h.name(), attempt, "hard cancel attempt");
            let killed = h.cancel(true);
            // Exponential wait so the thread has a chance to clean up.
            for step in KILL_WAIT_STEPS_MS {
                if !h.running() {
                    break;
                }
                std::thread::sleep(Duration::from_millis(step));
            }
            if killed || !h.running() {
                break;
            }
        }
        if h.running() {
            error!(thread = h.name(), "cannot stop thread on this platform, abandoning it");
            h.state.detached.store(true, Ordering::Release);
        }
        unregister(&h);
    }
}

fn apply_priority(priority: Priority) -> Result<(), ThreadError> {
    if priority.elevated() {
        // No safe per-thread scheduler interface on the supported hosts.
        return Err(ThreadError::PermissionDenied { priority: priority.to_string() });
    }
    Ok(())
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
