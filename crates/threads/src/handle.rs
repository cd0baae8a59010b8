// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-thread state handles.
//!
//! A [`ThreadHandle`] is created before its OS thread is spawned and lives
//! one-to-one with it. The handle is the unit the registry tracks, the unit
//! cancellation targets, and the carrier of diagnostic state (lock depth,
//! inherited allocation-counter name, affinity mask).

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::affinity::CpuMask;
use crate::error::ThreadError;
use crate::priority::Priority;

/// How long a hard cancel spins waiting for a lock-holding target.
const LOCKED_SPIN: Duration = Duration::from_millis(50);

pub(crate) type ExitHook = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
pub(crate) struct HandleState {
    pub(crate) cancel: AtomicBool,
    pub(crate) started: AtomicBool,
    pub(crate) running: AtomicBool,
    pub(crate) detached: AtomicBool,
    locks: AtomicI32,
    affinity: Mutex<Option<CpuMask>>,
    affinity_pending: AtomicBool,
    counter: Mutex<Option<Arc<str>>>,
    pub(crate) exit_hook: Mutex<Option<ExitHook>>,
}

/// Shared, cloneable reference to one thread's state.
#[derive(Clone)]
pub struct ThreadHandle {
    name: Arc<str>,
    priority: Priority,
    pub(crate) state: Arc<HandleState>,
}

impl ThreadHandle {
    pub(crate) fn new(name: &str, priority: Priority) -> ThreadHandle {
        ThreadHandle {
            name: Arc::from(name),
            priority,
            state: Arc::new(HandleState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// True once the OS thread has entered its entry function.
    pub fn running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// True once the creator has released the thread to run.
    pub fn started(&self) -> bool {
        self.state.started.load(Ordering::Acquire)
    }

    /// Pending-cancellation flag, observed cooperatively by the thread.
    pub fn cancelled(&self) -> bool {
        self.state.cancel.load(Ordering::Acquire)
    }

    /// A handle abandoned by shutdown; must not be poked further.
    pub fn detached(&self) -> bool {
        self.state.detached.load(Ordering::Acquire)
    }

    /// Request cancellation.
    ///
    /// Soft cancellation sets the flag and returns immediately; the thread
    /// exits at its next check point. Hard cancellation escalates: when the
    /// target holds locks the caller spins up to 50 ms for it to release
    /// them and observe the flag. Thread abort has no safe host mechanism,
    /// so a target that stays running reports failure and is left for the
    /// shutdown sequence to detach.
    pub fn cancel(&self, hard: bool) -> bool {
        self.state.cancel.store(true, Ordering::Release);
        if !hard {
            return true;
        }
        if !self.running() {
            return true;
        }
        if self.locks() > 0 {
            let deadline = Instant::now() + LOCKED_SPIN;
            while Instant::now() < deadline {
                if !self.running() {
                    return true;
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        debug!(thread = %self.name, "hard cancel unsupported, target still running");
        !self.running()
    }

    /// Number of tracked lock acquisitions currently held by the thread.
    pub fn locks(&self) -> i32 {
        self.state.locks.load(Ordering::Acquire)
    }

    pub(crate) fn lock_acquired(&self) {
        self.state.locks.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn lock_released(&self) {
        self.state.locks.fetch_sub(1, Ordering::AcqRel);
    }

    /// Name of the allocation counter inherited by objects this thread creates.
    pub fn counter(&self) -> Option<Arc<str>> {
        self.state.counter.lock().clone()
    }

    pub fn set_counter(&self, name: Option<Arc<str>>) {
        *self.state.counter.lock() = name;
    }

    /// Install a hook run by the thread right before it is reaped.
    pub fn set_exit_hook(&self, hook: impl FnOnce() + Send + 'static) {
        *self.state.exit_hook.lock() = Some(Box::new(hook));
    }

    /// Record an affinity mask for the thread.
    ///
    /// Applied immediately when called from the target thread itself;
    /// otherwise stored and applied at the target's next check point.
    pub fn set_affinity(&self, mask: CpuMask) -> Result<(), ThreadError> {
        if mask.is_empty() {
            return Err(ThreadError::EmptyMask);
        }
        let on_self = crate::registry::current()
            .map(|h| Arc::ptr_eq(&h.state, &self.state))
            .unwrap_or(false);
        *self.state.affinity.lock() = Some(mask.clone());
        if on_self {
            mask.apply_to_current()
        } else {
            self.state.affinity_pending.store(true, Ordering::Release);
            Ok(())
        }
    }

    pub fn affinity(&self) -> Option<CpuMask> {
        self.state.affinity.lock().clone()
    }

    /// Apply a mask stored by another thread. Called from check points.
    pub(crate) fn apply_pending_affinity(&self) {
        if self.state.affinity_pending.swap(false, Ordering::AcqRel) {
            if let Some(mask) = self.affinity() {
                if let Err(e) = mask.apply_to_current() {
                    debug!(thread = %self.name, error = %e, "deferred affinity failed");
                }
            }
        }
    }

    pub(crate) fn same_as(&self, other: &ThreadHandle) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl std::fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadHandle")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("running", &self.running())
            .field("cancelled", &self.cancelled())
            .finish()
    }
}

/// RAII guard bumping the current thread's tracked lock depth.
///
/// Wrap acquisitions of long-held engine locks so that hard cancellation
/// knows the thread is inside a critical section.
pub struct LockTracker {
    handle: Option<ThreadHandle>,
}

impl LockTracker {
    pub fn enter() -> LockTracker {
        let handle = crate::registry::current();
        if let Some(h) = &handle {
            h.lock_acquired();
        }
        LockTracker { handle }
    }
}

impl Drop for LockTracker {
    fn drop(&mut self) {
        if let Some(h) = &self.handle {
            h.lock_released();
        }
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
