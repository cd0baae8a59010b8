// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Native function plumbing.
//!
//! A native function receives the runner it runs on, the receiver and the
//! argument values, and either returns a value or suspends the runner with
//! a work-item. Argument errors are soft: helpers below default instead of
//! failing, and a binding that cannot proceed returns `false`/`undefined`.

use std::sync::Arc;

use crate::runner::{Runner, WorkItem};
use crate::value::{FuncValue, NativeFunc, Value};

pub enum NativeOutcome {
    Ret(Value),
    Suspend(WorkItem),
}

impl NativeOutcome {
    pub fn undefined() -> NativeOutcome {
        NativeOutcome::Ret(Value::Undefined)
    }

    pub fn bool(b: bool) -> NativeOutcome {
        NativeOutcome::Ret(Value::Bool(b))
    }
}

pub type NativeFn = Arc<dyn Fn(&mut Runner, Value, Vec<Value>) -> NativeOutcome + Send + Sync>;

/// Wrap a closure as a function value scripts can call.
pub fn native_fn(
    name: &str,
    f: impl Fn(&mut Runner, Value, Vec<Value>) -> NativeOutcome + Send + Sync + 'static,
) -> Value {
    Value::Func(FuncValue::Native(NativeFunc { name: Arc::from(name), f: Arc::new(f) }))
}

/// String form of the n-th argument, when present.
pub fn arg_str(args: &[Value], n: usize) -> Option<String> {
    args.get(n).filter(|v| !v.is_undefined()).map(Value::to_display)
}

pub fn arg_int(args: &[Value], n: usize) -> Option<i64> {
    args.get(n).filter(|v| !v.is_undefined()).map(Value::to_int)
}

pub fn arg_bool(args: &[Value], n: usize, default: bool) -> bool {
    args.get(n).filter(|v| !v.is_undefined()).map(Value::to_bool).unwrap_or(default)
}

pub fn arg_obj(args: &[Value], n: usize) -> Option<crate::object::ObjRef> {
    args.get(n).and_then(Value::as_object).cloned()
}

pub fn arg_func(args: &[Value], n: usize) -> Option<FuncValue> {
    args.get(n).and_then(Value::as_func).cloned()
}
