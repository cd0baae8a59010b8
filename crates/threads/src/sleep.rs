// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic sleeps with cooperative exit checks.
//!
//! Each sleep takes an `exit_check` flag: when set and a cancellation is
//! pending after the sleep, the call returns [`Cancelled`] so the worker
//! loop can unwind with `?`. Without the flag the result is always `Ok`.

use std::cell::Cell;
use std::time::Duration;

use crate::error::Cancelled;
use crate::registry;

thread_local! {
    static LAST_ERROR: Cell<i32> = const { Cell::new(0) };
}

/// Last host error code recorded by a binding on this thread.
pub fn last_error() -> i32 {
    LAST_ERROR.with(|e| e.get())
}

pub fn set_last_error(code: i32) {
    LAST_ERROR.with(|e| e.set(code));
}

/// True when cancellation of the calling thread is pending.
pub fn check() -> bool {
    registry::current().map(|h| h.cancelled()).unwrap_or(false)
}

fn after_sleep(exit_check: bool) -> Result<(), Cancelled> {
    if let Some(h) = registry::current() {
        h.apply_pending_affinity();
        if exit_check && h.cancelled() {
            return Err(Cancelled);
        }
    }
    Ok(())
}

/// Sleep whole seconds. Values are clamped to `i32::MAX` seconds.
pub fn sleep(secs: u64, exit_check: bool) -> Result<(), Cancelled> {
    let secs = secs.min(i32::MAX as u64);
    std::thread::sleep(Duration::from_secs(secs));
    after_sleep(exit_check)
}

/// Sleep milliseconds.
pub fn msleep(msec: u64, exit_check: bool) -> Result<(), Cancelled> {
    std::thread::sleep(Duration::from_millis(msec));
    after_sleep(exit_check)
}

/// Sleep microseconds.
pub fn usleep(usec: u64, exit_check: bool) -> Result<(), Cancelled> {
    std::thread::sleep(Duration::from_micros(usec));
    after_sleep(exit_check)
}

/// Sleep one idle interval (see [`registry::idle_msec`]).
pub fn idle(exit_check: bool) -> Result<(), Cancelled> {
    msleep(registry::idle_msec(), exit_check)
}

/// Relinquish the rest of the time slice.
pub fn yield_now(exit_check: bool) -> Result<(), Cancelled> {
    std::thread::yield_now();
    after_sleep(exit_check)
}

#[cfg(test)]
#[path = "sleep_tests.rs"]
mod tests;
