// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Array semantics over the object model.
//!
//! Arrays are property bags whose numeric-named properties participate in
//! the list operations; `length` is writable and holes stay holes. `sort`
//! works on a scratch copy, so a comparator failure leaves the array
//! exactly as it was.

use std::cell::Cell;
use std::cmp::Ordering;

use tracing::debug;

use crate::native::NativeOutcome;
use crate::object::ObjRef;
use crate::runner::{call_function, Runner};
use crate::value::{FuncValue, Value};

fn elem(obj: &ObjRef, i: usize) -> Value {
    obj.get_own(&i.to_string()).unwrap_or_default()
}

fn set_elem(obj: &ObjRef, i: usize, v: Value) {
    obj.set(&i.to_string(), v);
}

/// Dense snapshot, holes read as undefined.
fn elems(obj: &ObjRef) -> Vec<Value> {
    (0..obj.length()).map(|i| elem(obj, i)).collect()
}

fn write_back(obj: &ObjRef, values: Vec<Value>) {
    let len = values.len();
    obj.set_length(0);
    obj.set_length(len);
    for (i, v) in values.into_iter().enumerate() {
        set_elem(obj, i, v);
    }
}

/// Normalize a possibly-negative index against `len`.
fn norm_index(idx: i64, len: usize) -> usize {
    if idx < 0 {
        len.saturating_sub(idx.unsigned_abs() as usize)
    } else {
        (idx as usize).min(len)
    }
}

pub fn array_method(
    runner: &mut Runner,
    obj: &ObjRef,
    name: &str,
    args: Vec<Value>,
) -> Option<NativeOutcome> {
    let ret = |v: Value| Some(NativeOutcome::Ret(v));
    match name {
        "push" => {
            let mut len = obj.length();
            for v in args {
                set_elem(obj, len, v);
                len += 1;
            }
            ret(Value::Int(obj.length() as i64))
        }
        "pop" => {
            let len = obj.length();
            if len == 0 {
                return ret(Value::Undefined);
            }
            let v = elem(obj, len - 1);
            obj.set_length(len - 1);
            ret(v)
        }
        "shift" => {
            let mut values = elems(obj);
            if values.is_empty() {
                return ret(Value::Undefined);
            }
            let v = values.remove(0);
            write_back(obj, values);
            ret(v)
        }
        "unshift" => {
            let mut values = elems(obj);
            for (i, v) in args.into_iter().enumerate() {
                values.insert(i, v);
            }
            write_back(obj, values);
            ret(Value::Int(obj.length() as i64))
        }
        "slice" => {
            let values = elems(obj);
            let len = values.len();
            let start = norm_index(args.first().map(Value::to_int).unwrap_or(0), len);
            let end = norm_index(args.get(1).map(Value::to_int).unwrap_or(len as i64), len);
            let out: Vec<Value> =
                if start < end { values[start..end].to_vec() } else { Vec::new() };
            ret(Value::Object(runner.context().array_from(out)))
        }
        "splice" => {
            let mut values = elems(obj);
            let len = values.len();
            let start = norm_index(args.first().map(Value::to_int).unwrap_or(0), len);
            let del = args
                .get(1)
                .map(Value::to_int)
                .unwrap_or((len - start) as i64)
                .max(0) as usize;
            let del = del.min(len - start);
            let removed: Vec<Value> = values.splice(start..start + del, args.into_iter().skip(2)).collect();
            write_back(obj, values);
            ret(Value::Object(runner.context().array_from(removed)))
        }
        "concat" => {
            let mut out = elems(obj);
            for a in args {
                match a {
                    Value::Object(o) if o.kind() == crate::object::ObjKind::Array => {
                        out.extend(elems(&o));
                    }
                    other => out.push(other),
                }
            }
            ret(Value::Object(runner.context().array_from(out)))
        }
        "join" => {
            let sep = args.first().map(Value::to_display).unwrap_or_else(|| ",".to_string());
            ret(Value::Str(obj.join_elements(&sep)))
        }
        "reverse" => {
            let mut values = elems(obj);
            values.reverse();
            write_back(obj, values);
            ret(Value::Object(ObjRef::clone(obj)))
        }
        "indexOf" => {
            let target = args.first().cloned().unwrap_or_default();
            let from = args.get(1).map(Value::to_int).unwrap_or(0).max(0) as usize;
            let found = (from..obj.length())
                .find(|i| elem(obj, *i).strict_eq(&target))
                .map(|i| i as i64)
                .unwrap_or(-1);
            ret(Value::Int(found))
        }
        "lastIndexOf" => {
            let target = args.first().cloned().unwrap_or_default();
            let found = (0..obj.length())
                .rev()
                .find(|i| elem(obj, *i).strict_eq(&target))
                .map(|i| i as i64)
                .unwrap_or(-1);
            ret(Value::Int(found))
        }
        "includes" => {
            let target = args.first().cloned().unwrap_or_default();
            let found = (0..obj.length()).any(|i| elem(obj, i).strict_eq(&target));
            ret(Value::Bool(found))
        }
        "sort" => {
            sort_array(runner, obj, args.first());
            ret(Value::Object(ObjRef::clone(obj)))
        }
        _ => None,
    }
}

/// Sort in place. Without a comparator the order is lexicographic on the
/// string form; with one, every comparison is a fresh interpreter call and
/// any comparator failure abandons the sort.
fn sort_array(runner: &mut Runner, obj: &ObjRef, comparator: Option<&Value>) {
    let mut values = elems(obj);
    match comparator.and_then(Value::as_func) {
        None => {
            values.sort_by(|a, b| a.to_display().cmp(&b.to_display()));
        }
        Some(func) => {
            let failed = Cell::new(false);
            let ctx = runner.context().clone();
            values.sort_by(|a, b| {
                if failed.get() {
                    return Ordering::Equal;
                }
                compare_with(&ctx, func, a, b).unwrap_or_else(|| {
                    failed.set(true);
                    Ordering::Equal
                })
            });
            if failed.get() {
                debug!("sort comparator failed, array left untouched");
                return;
            }
        }
    }
    write_back(obj, values);
}

fn compare_with(
    ctx: &std::sync::Arc<crate::context::ScriptContext>,
    func: &FuncValue,
    a: &Value,
    b: &Value,
) -> Option<Ordering> {
    let result = call_function(ctx, func, vec![a.clone(), b.clone()]).ok()?;
    let n = result.to_number();
    if n.is_nan() {
        return Some(Ordering::Equal);
    }
    Some(if n < 0.0 {
        Ordering::Less
    } else if n > 0.0 {
        Ordering::Greater
    } else {
        Ordering::Equal
    })
}

#[cfg(test)]
#[path = "array_tests.rs"]
mod tests;
