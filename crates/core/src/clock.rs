// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time sources.
//!
//! Message stamps and timer deadlines work in epoch milliseconds through
//! [`now_msec`]. The [`Clock`] trait abstracts the source for components
//! that want deterministic time in tests.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Current time in epoch milliseconds.
pub fn now_msec() -> u64 {
    SystemClock.epoch_ms()
}

/// A clock that provides the current time.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> Instant;
    fn epoch_ms(&self) -> u64;

    /// Milliseconds elapsed since an epoch-ms stamp taken from this clock.
    fn age_of(&self, stamp_ms: u64) -> u64 {
        self.epoch_ms().saturating_sub(stamp_ms)
    }
}

/// Real system clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Controllable clock for tests; clones share the same timeline.
#[derive(Clone)]
pub struct FakeClock {
    state: Arc<Mutex<(Instant, u64)>>,
}

impl FakeClock {
    pub fn new(epoch_ms: u64) -> Self {
        FakeClock { state: Arc::new(Mutex::new((Instant::now(), epoch_ms))) }
    }

    /// Advance the timeline by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.0 += duration;
        state.1 += duration.as_millis() as u64;
    }

    /// Jump the epoch component to an absolute value.
    pub fn set_epoch_ms(&self, epoch_ms: u64) {
        self.state.lock().1 = epoch_ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        FakeClock::new(0)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().0
    }

    fn epoch_ms(&self) -> u64 {
        self.state.lock().1
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
