// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The object graph.
//!
//! Objects are reference-counted property bags. Plain objects and arrays
//! keep properties in insertion order; hash-list objects trade order for an
//! open bucket table. Property lookup walks the `__proto__` chain and falls
//! back to an optional host-backed parameter source. Freezing is one-way
//! and a frozen write is a logged no-op.
//!
//! Ownership must stay acyclic at the binding level; back-references (XML
//! parents and the like) go through weak handles.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::context::TrackerLink;
use crate::value::Value;

pub type ObjRef = Arc<ObjData>;

/// Longest prototype chain walked before giving up.
const MAX_PROTO_DEPTH: usize = 16;

pub const PROTO_KEY: &str = "__proto__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjKind {
    Plain,
    Array,
    HashList,
    /// Host-resource wrapper (file, hasher, XML node, …), tagged by class.
    Native(&'static str),
}

/// Host-backed name/value fallback behind an object's own properties.
///
/// Reads consult it after the prototype chain misses; writes offer values
/// to it first, and a consumed write never lands in the property bag.
pub trait ParamSource: Send + Sync {
    fn get_param(&self, name: &str) -> Option<Value>;

    /// Returns true when the write was consumed.
    fn set_param(&self, _name: &str, _value: &Value) -> bool {
        false
    }

    fn clear_param(&self, _name: &str) -> bool {
        false
    }

    fn param_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any;
}

enum Props {
    Ordered(IndexMap<String, Value>),
    Hashed(HashMap<String, Value>),
}

impl Props {
    fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Props::Ordered(m) => m.get(name),
            Props::Hashed(m) => m.get(name),
        }
    }

    fn insert(&mut self, name: String, value: Value) {
        match self {
            Props::Ordered(m) => {
                m.insert(name, value);
            }
            Props::Hashed(m) => {
                m.insert(name, value);
            }
        }
    }

    fn remove(&mut self, name: &str) {
        match self {
            Props::Ordered(m) => {
                m.shift_remove(name);
            }
            Props::Hashed(m) => {
                m.remove(name);
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        match self {
            Props::Ordered(m) => m.keys().cloned().collect(),
            Props::Hashed(m) => m.keys().cloned().collect(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Props::Ordered(m) => m.len(),
            Props::Hashed(m) => m.len(),
        }
    }
}

struct ObjInner {
    props: Props,
    /// Array length; tracks the highest numeric property plus one.
    length: usize,
    native: Option<Box<dyn Any + Send>>,
    params: Option<Arc<dyn ParamSource>>,
}

pub struct ObjData {
    kind: ObjKind,
    line: u32,
    ctx_id: u64,
    frozen: AtomicBool,
    inner: Mutex<ObjInner>,
    tracker: Option<TrackerLink>,
}

impl ObjData {
    pub(crate) fn create(
        kind: ObjKind,
        line: u32,
        ctx_id: u64,
        tracker: Option<TrackerLink>,
    ) -> ObjRef {
        let props = match kind {
            ObjKind::HashList => Props::Hashed(HashMap::new()),
            _ => Props::Ordered(IndexMap::new()),
        };
        Arc::new(ObjData {
            kind,
            line,
            ctx_id,
            frozen: AtomicBool::new(false),
            inner: Mutex::new(ObjInner { props, length: 0, native: None, params: None }),
            tracker,
        })
    }

    pub fn kind(&self) -> ObjKind {
        self.kind
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn context_id(&self) -> u64 {
        self.ctx_id
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// One-way freeze.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    /// Own property, no prototype walk. Arrays surface `length`.
    pub fn get_own(&self, name: &str) -> Option<Value> {
        let inner = self.inner.lock();
        if self.kind == ObjKind::Array && name == "length" {
            return Some(Value::Int(inner.length as i64));
        }
        inner.props.get(name).cloned()
    }

    /// Full read: own properties, prototype chain, then the parameter
    /// source. Misses read as undefined.
    pub fn get(&self, name: &str) -> Value {
        if let Some(v) = self.get_own(name) {
            return v;
        }
        let mut proto = self.proto();
        for _ in 0..MAX_PROTO_DEPTH {
            let Some(p) = proto else {
                break;
            };
            if let Some(v) = p.get_own(name) {
                return v;
            }
            proto = p.proto();
        }
        let params = self.inner.lock().params.clone();
        if let Some(src) = params {
            if let Some(v) = src.get_param(name) {
                return v;
            }
        }
        Value::Undefined
    }

    /// Assign an own property. Assigning undefined removes it. Returns
    /// false (and logs) when the object is frozen; nothing is raised.
    pub fn set(&self, name: &str, value: Value) -> bool {
        if self.is_frozen() {
            debug!(prop = name, "write to frozen object ignored");
            return false;
        }
        // The prototype slot only accepts objects.
        if name == PROTO_KEY && !matches!(value, Value::Object(_) | Value::Undefined) {
            debug!("non-object prototype assignment ignored");
            return false;
        }
        let mut inner = self.inner.lock();
        if let Some(src) = inner.params.clone() {
            if value.is_undefined() {
                if src.clear_param(name) {
                    return true;
                }
            } else if src.set_param(name, &value) {
                return true;
            }
        }
        if value.is_undefined() {
            inner.props.remove(name);
            return true;
        }
        if self.kind == ObjKind::Array {
            if name == "length" {
                let new_len = value.to_int().max(0) as usize;
                resize_array(&mut inner, new_len);
                return true;
            }
            if let Ok(idx) = name.parse::<usize>() {
                if idx >= inner.length {
                    inner.length = idx + 1;
                }
            }
        }
        inner.props.insert(name.to_string(), value);
        true
    }

    pub fn delete(&self, name: &str) -> bool {
        self.set(name, Value::Undefined)
    }

    pub fn has_own(&self, name: &str) -> bool {
        let inner = self.inner.lock();
        inner.props.get(name).is_some()
    }

    pub fn proto(&self) -> Option<ObjRef> {
        match self.inner.lock().props.get(PROTO_KEY) {
            Some(Value::Object(o)) => Some(Arc::clone(o)),
            _ => None,
        }
    }

    /// Own property names; insertion order for ordered objects, bucket
    /// order for hash lists. The prototype slot is not listed.
    pub fn keys(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut keys: Vec<String> =
            inner.props.keys().into_iter().filter(|k| k.as_str() != PROTO_KEY).collect();
        if let Some(src) = &inner.params {
            for name in src.param_names() {
                if !keys.contains(&name) {
                    keys.push(name);
                }
            }
        }
        keys
    }

    pub fn prop_count(&self) -> usize {
        self.inner.lock().props.len()
    }

    /// Array length (zero for other kinds).
    pub fn length(&self) -> usize {
        self.inner.lock().length
    }

    pub(crate) fn set_length(&self, len: usize) {
        resize_array(&mut self.inner.lock(), len);
    }

    /// Comma-join the array elements' string forms (holes are empty).
    /// Nested objects render as their tag, which also keeps self-referencing
    /// arrays from recursing.
    pub fn join_elements(&self, sep: &str) -> String {
        let len = self.length();
        let mut parts = Vec::with_capacity(len);
        for i in 0..len {
            let v = self.get_own(&i.to_string()).unwrap_or_default();
            parts.push(match v {
                Value::Undefined | Value::Null => String::new(),
                Value::Object(o) if o.kind() == ObjKind::Array => {
                    format!("[array length {}]", o.length())
                }
                Value::Object(_) => "[object Object]".to_string(),
                other => other.to_display(),
            });
        }
        parts.join(sep)
    }

    // -- native state -------------------------------------------------------

    pub fn set_native(&self, data: impl Any + Send) {
        self.inner.lock().native = Some(Box::new(data));
    }

    /// Run `f` over the native payload of type `T`, if it is one.
    pub fn with_native<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut inner = self.inner.lock();
        inner.native.as_mut().and_then(|b| b.downcast_mut::<T>()).map(f)
    }

    pub fn set_param_source(&self, src: Arc<dyn ParamSource>) {
        self.inner.lock().params = Some(src);
    }

    pub fn clear_param_source(&self) {
        self.inner.lock().params = None;
    }

    pub fn param_source(&self) -> Option<Arc<dyn ParamSource>> {
        self.inner.lock().params.clone()
    }
}

impl Drop for ObjData {
    fn drop(&mut self) {
        if let Some(link) = &self.tracker {
            link.release();
        }
    }
}

impl std::fmt::Debug for ObjData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjData")
            .field("kind", &self.kind)
            .field("line", &self.line)
            .field("frozen", &self.is_frozen())
            .field("props", &self.prop_count())
            .finish()
    }
}

fn resize_array(inner: &mut ObjInner, new_len: usize) {
    if new_len < inner.length {
        // Shrinking discards indexed properties past the new end.
        let doomed: Vec<String> = inner
            .props
            .keys()
            .into_iter()
            .filter(|k| k.parse::<usize>().map(|i| i >= new_len).unwrap_or(false))
            .collect();
        for k in doomed {
            inner.props.remove(&k);
        }
    }
    // Growing only reports a bigger length; holes stay holes.
    inner.length = new_len;
}

/// Deep copy: own properties are copied recursively, prototype links are
/// carried by reference, cycles resolve to the already-copied object.
pub fn deep_copy(obj: &ObjRef, ctx: &crate::context::ScriptContext) -> ObjRef {
    let mut seen: HashMap<usize, ObjRef> = HashMap::new();
    copy_rec(obj, ctx, &mut seen)
}

fn copy_rec(
    obj: &ObjRef,
    ctx: &crate::context::ScriptContext,
    seen: &mut HashMap<usize, ObjRef>,
) -> ObjRef {
    let key = Arc::as_ptr(obj) as usize;
    if let Some(done) = seen.get(&key) {
        return Arc::clone(done);
    }
    let copy = ctx.make_kind(obj.kind(), obj.line());
    seen.insert(key, Arc::clone(&copy));
    if obj.kind() == ObjKind::Array {
        copy.set_length(obj.length());
    }
    let inner = obj.inner.lock();
    let keys = inner.props.keys();
    let values: Vec<(String, Value)> = keys
        .into_iter()
        .filter_map(|k| inner.props.get(&k).cloned().map(|v| (k, v)))
        .collect();
    drop(inner);
    for (k, v) in values {
        if k == PROTO_KEY {
            copy.set(&k, v);
            continue;
        }
        let v = match v {
            Value::Object(ref o) => Value::Object(copy_rec(o, ctx, seen)),
            other => other,
        };
        copy.set(&k, v);
    }
    if obj.is_frozen() {
        copy.freeze();
    }
    copy
}

#[cfg(test)]
#[path = "object_tests.rs"]
mod tests;
