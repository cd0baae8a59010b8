// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script contexts: the shared global namespace of one script or call.
//!
//! A context owns the globals object and the allocation accounting used for
//! leak hunts. Object tracking is a process-wide switch; when it is on,
//! every object created through a context bumps a counter keyed by its
//! creation site and the counter drops again on destruction.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::object::{ObjData, ObjKind, ObjRef};
use crate::value::Value;

static TRACK_OBJECTS: AtomicBool = AtomicBool::new(false);
static NEXT_CTX_ID: AtomicU64 = AtomicU64::new(1);

/// Turn process-wide object allocation tracking on or off.
pub fn enable_tracking(on: bool) {
    TRACK_OBJECTS.store(on, Ordering::Release);
}

pub fn tracking_enabled() -> bool {
    TRACK_OBJECTS.load(Ordering::Acquire)
}

/// Per-context allocation counters, keyed by `"file:line"` creation site.
#[derive(Default)]
pub struct AllocTracker {
    counters: Mutex<IndexMap<String, i64>>,
}

impl AllocTracker {
    fn acquire(self: &Arc<Self>, origin: &str) -> TrackerLink {
        *self.counters.lock().entry(origin.to_string()).or_insert(0) += 1;
        TrackerLink { tracker: Arc::clone(self), origin: origin.to_string() }
    }

    /// The `n` busiest creation sites, descending.
    pub fn top(&self, n: usize) -> Vec<(String, i64)> {
        let mut all: Vec<(String, i64)> =
            self.counters.lock().iter().map(|(k, v)| (k.clone(), *v)).collect();
        all.sort_by(|a, b| b.1.cmp(&a.1));
        all.truncate(n);
        all
    }

    pub fn count(&self, origin: &str) -> i64 {
        self.counters.lock().get(origin).copied().unwrap_or(0)
    }

    /// Live objects across every site.
    pub fn total(&self) -> i64 {
        self.counters.lock().values().sum()
    }
}

/// Link from a live object back to its context's counters.
pub struct TrackerLink {
    tracker: Arc<AllocTracker>,
    origin: String,
}

impl TrackerLink {
    pub(crate) fn release(&self) {
        *self.tracker.counters.lock().entry(self.origin.clone()).or_insert(0) -= 1;
    }
}

pub struct ScriptContext {
    id: u64,
    globals: ObjRef,
    tracker: Arc<AllocTracker>,
}

impl ScriptContext {
    pub fn new() -> Arc<ScriptContext> {
        let id = NEXT_CTX_ID.fetch_add(1, Ordering::AcqRel);
        let tracker = Arc::new(AllocTracker::default());
        let globals = ObjData::create(ObjKind::Plain, 0, id, None);
        Arc::new(ScriptContext { id, globals, tracker })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn globals(&self) -> &ObjRef {
        &self.globals
    }

    pub fn tracker(&self) -> &Arc<AllocTracker> {
        &self.tracker
    }

    pub fn get_global(&self, name: &str) -> Value {
        self.globals.get(name)
    }

    pub fn set_global(&self, name: &str, value: Value) {
        self.globals.set(name, value);
    }

    /// Create an object owned by this context, registered with the
    /// allocation tracker when tracking is on. `origin` is the creation
    /// site key (`"file:line"` for script objects, a class tag for native
    /// ones).
    pub fn make_object_at(&self, kind: ObjKind, line: u32, origin: &str) -> ObjRef {
        let link = tracking_enabled().then(|| self.tracker.acquire(origin));
        ObjData::create(kind, line, self.id, link)
    }

    pub fn make_kind(&self, kind: ObjKind, line: u32) -> ObjRef {
        self.make_object_at(kind, line, "native")
    }

    pub fn make_object(&self) -> ObjRef {
        self.make_object_at(ObjKind::Plain, 0, "native")
    }

    pub fn make_array(&self) -> ObjRef {
        self.make_object_at(ObjKind::Array, 0, "native")
    }

    pub fn make_hashlist(&self) -> ObjRef {
        self.make_object_at(ObjKind::HashList, 0, "native")
    }

    /// Build a script array from a vector of values.
    pub fn array_from(&self, items: Vec<Value>) -> ObjRef {
        let arr = self.make_array();
        arr.set_length(items.len());
        for (i, v) in items.into_iter().enumerate() {
            arr.set(&i.to_string(), v);
        }
        arr
    }

    /// Bring an object into this context: same context passes through,
    /// anything else is deep-copied.
    pub fn adopt(self: &Arc<Self>, value: &Value) -> Value {
        match value {
            Value::Object(o) if o.context_id() != self.id => {
                Value::Object(crate::object::deep_copy(o, self))
            }
            other => other.clone(),
        }
    }
}

impl std::fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptContext")
            .field("id", &self.id)
            .field("live_objects", &self.tracker.total())
            .finish()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
