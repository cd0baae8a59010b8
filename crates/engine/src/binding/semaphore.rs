// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Semaphore` script binding.
//!
//! `wait` is a suspension point: the blocking acquire happens in a
//! work-item on the driving thread, never under an object lock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use tandem_script::native::{arg_int, native_fn, NativeOutcome};
use tandem_script::{ObjKind, ObjRef, ScriptContext, Value, WorkItem};

const TAG: &str = "Semaphore";

struct SemInner {
    count: Mutex<u64>,
    ready: Condvar,
}

#[derive(Clone)]
pub struct Semaphore {
    inner: Arc<SemInner>,
}

impl Semaphore {
    pub fn new(initial: u64) -> Semaphore {
        Semaphore { inner: Arc::new(SemInner { count: Mutex::new(initial), ready: Condvar::new() }) }
    }

    /// Blocking acquire; `None` waits forever.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut count = self.inner.count.lock();
        match timeout {
            None => {
                while *count == 0 {
                    self.inner.ready.wait(&mut count);
                }
            }
            Some(t) => {
                let deadline = std::time::Instant::now() + t;
                while *count == 0 {
                    if self.inner.ready.wait_until(&mut count, deadline).timed_out() {
                        return false;
                    }
                }
            }
        }
        *count -= 1;
        true
    }

    pub fn signal(&self) {
        *self.inner.count.lock() += 1;
        self.inner.ready.notify_one();
    }
}

pub fn install_semaphore(ctx: &Arc<ScriptContext>) {
    let ctor = ctx.make_object_at(ObjKind::Native(TAG), 0, "native:Semaphore");
    ctor.set(
        "__invoke__",
        native_fn(TAG, |r, _this, args| {
            let initial = arg_int(&args, 0).unwrap_or(0).max(0) as u64;
            let obj = r.context().make_object_at(ObjKind::Native(TAG), 0, "native:Semaphore");
            obj.set_native(Semaphore::new(initial));
            install_methods(&obj);
            NativeOutcome::Ret(Value::Object(obj))
        }),
    );
    ctor.freeze();
    ctx.set_global(TAG, Value::Object(ctor));
}

fn install_methods(obj: &ObjRef) {
    let me = ObjRef::downgrade(obj);
    obj.set(
        "wait",
        native_fn("wait", move |_r, _this, args| {
            let Some(sem) =
                me.upgrade().and_then(|o| o.with_native::<Semaphore, Semaphore>(|s| s.clone()))
            else {
                return NativeOutcome::bool(false);
            };
            let timeout = arg_int(&args, 0)
                .filter(|ms| *ms >= 0)
                .map(|ms| Duration::from_millis(ms as u64));
            NativeOutcome::Suspend(WorkItem::new(move || Value::Bool(sem.wait(timeout))))
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "signal",
        native_fn("signal", move |_r, _this, _args| {
            let Some(sem) =
                me.upgrade().and_then(|o| o.with_native::<Semaphore, Semaphore>(|s| s.clone()))
            else {
                return NativeOutcome::bool(false);
            };
            sem.signal();
            NativeOutcome::bool(true)
        }),
    );
}

#[cfg(test)]
#[path = "semaphore_tests.rs"]
mod tests;
