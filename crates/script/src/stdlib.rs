// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Language-level globals and fallback method dispatch.
//!
//! `install` populates a fresh context with the built-ins every script
//! expects before any host binding is added: `JSON`, `Math`, `Object`,
//! the `Array`/`HashList`/`RegExp` constructors and the numeric parsers.

use std::sync::Arc;

use crate::context::ScriptContext;
use crate::json;
use crate::native::{arg_str, native_fn, NativeOutcome};
use crate::object::{ObjKind, ObjRef};
use crate::regex_obj::{self, REGEX_TAG};
use crate::runner::Runner;
use crate::value::Value;

/// Method fallback for calls that did not resolve to a function-valued
/// property: array operations, hash-list accounting, regex tests and the
/// generic object surface.
pub fn builtin_method(
    runner: &mut Runner,
    obj: &ObjRef,
    name: &str,
    args: Vec<Value>,
) -> Option<NativeOutcome> {
    match obj.kind() {
        ObjKind::Array => {
            if let Some(out) = crate::array::array_method(runner, obj, name, args.clone()) {
                return Some(out);
            }
        }
        ObjKind::HashList => {
            if name == "count" {
                return Some(NativeOutcome::Ret(Value::Int(obj.prop_count() as i64)));
            }
        }
        ObjKind::Native(REGEX_TAG) => {
            if let Some(v) = regex_obj::regex_method(obj, name, &args) {
                return Some(NativeOutcome::Ret(v));
            }
        }
        _ => {}
    }
    object_method(obj, name, &args).map(NativeOutcome::Ret)
}

/// Methods every object answers to.
fn object_method(obj: &ObjRef, name: &str, args: &[Value]) -> Option<Value> {
    Some(match name {
        "freeze" => {
            obj.freeze();
            Value::Object(ObjRef::clone(obj))
        }
        "isFrozen" => Value::Bool(obj.is_frozen()),
        "hasOwnProperty" => {
            let key = args.first().map(Value::to_display).unwrap_or_default();
            Value::Bool(obj.has_own(&key))
        }
        "toJSON" => {
            let spaces = args.first().map(Value::to_int).unwrap_or(0).max(0) as usize;
            json::stringify(&Value::Object(ObjRef::clone(obj)), spaces)
                .map(Value::Str)
                .unwrap_or_default()
        }
        "toString" => Value::Str(Value::Object(ObjRef::clone(obj)).to_display()),
        _ => return None,
    })
}

/// Install the language built-ins into a context.
pub fn install(ctx: &Arc<ScriptContext>) {
    install_json(ctx);
    install_math(ctx);
    install_object(ctx);
    install_constructors(ctx);

    ctx.set_global(
        "parseInt",
        native_fn("parseInt", |_r, _this, args| {
            let Some(text) = arg_str(&args, 0) else {
                return NativeOutcome::Ret(Value::Num(f64::NAN));
            };
            let radix = args.get(1).map(Value::to_int).unwrap_or(10).clamp(2, 36) as u32;
            let t = text.trim();
            let parsed = if radix == 16 {
                let t = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")).unwrap_or(t);
                i64::from_str_radix(t, 16).ok()
            } else {
                i64::from_str_radix(t, radix).ok()
            };
            NativeOutcome::Ret(parsed.map(Value::Int).unwrap_or(Value::Num(f64::NAN)))
        }),
    );
    ctx.set_global(
        "parseFloat",
        native_fn("parseFloat", |_r, _this, args| {
            let parsed = arg_str(&args, 0).and_then(|t| t.trim().parse::<f64>().ok());
            NativeOutcome::Ret(parsed.map(Value::Num).unwrap_or(Value::Num(f64::NAN)))
        }),
    );
    ctx.set_global(
        "isNaN",
        native_fn("isNaN", |_r, _this, args| {
            let n = args.first().map(Value::to_number).unwrap_or(f64::NAN);
            NativeOutcome::bool(n.is_nan())
        }),
    );
}

fn install_json(ctx: &Arc<ScriptContext>) {
    let json_obj = ctx.make_object();
    json_obj.set(
        "parse",
        native_fn("parse", |r, _this, args| {
            let Some(text) = arg_str(&args, 0) else {
                return NativeOutcome::undefined();
            };
            NativeOutcome::Ret(json::parse(r.context(), &text))
        }),
    );
    json_obj.set(
        "stringify",
        native_fn("stringify", |_r, _this, args| {
            let value = args.first().cloned().unwrap_or_default();
            // Argument two is the ignored replacer slot.
            let spaces = args.get(2).map(Value::to_int).unwrap_or(0).max(0) as usize;
            NativeOutcome::Ret(
                json::stringify(&value, spaces).map(Value::Str).unwrap_or_default(),
            )
        }),
    );
    ctx.set_global("JSON", Value::Object(json_obj));
}

fn install_math(ctx: &Arc<ScriptContext>) {
    let math = ctx.make_object();
    math.set(
        "abs",
        native_fn("abs", |_r, _this, args| {
            NativeOutcome::Ret(match args.first() {
                Some(Value::Int(n)) => Value::Int(n.wrapping_abs()),
                Some(v) => Value::Num(v.to_number().abs()),
                None => Value::Num(f64::NAN),
            })
        }),
    );
    math.set(
        "max",
        native_fn("max", |_r, _this, args| {
            let best = args
                .iter()
                .map(Value::to_number)
                .fold(f64::NEG_INFINITY, f64::max);
            NativeOutcome::Ret(number_value(best))
        }),
    );
    math.set(
        "min",
        native_fn("min", |_r, _this, args| {
            let best = args.iter().map(Value::to_number).fold(f64::INFINITY, f64::min);
            NativeOutcome::Ret(number_value(best))
        }),
    );
    math.set(
        "floor",
        native_fn("floor", |_r, _this, args| {
            let n = args.first().map(Value::to_number).unwrap_or(f64::NAN);
            NativeOutcome::Ret(number_value(n.floor()))
        }),
    );
    math.set(
        "ceil",
        native_fn("ceil", |_r, _this, args| {
            let n = args.first().map(Value::to_number).unwrap_or(f64::NAN);
            NativeOutcome::Ret(number_value(n.ceil()))
        }),
    );
    math.set(
        "random",
        native_fn("random", |_r, _this, _args| {
            NativeOutcome::Ret(Value::Num(rand::random::<f64>()))
        }),
    );
    ctx.set_global("Math", Value::Object(math));
}

fn install_object(ctx: &Arc<ScriptContext>) {
    let object = ctx.make_object();
    object.set(
        "keys",
        native_fn("keys", |r, _this, args| {
            let keys = match args.first() {
                Some(Value::Object(o)) => o.keys(),
                _ => Vec::new(),
            };
            let arr = r.context().array_from(keys.into_iter().map(Value::Str).collect());
            NativeOutcome::Ret(Value::Object(arr))
        }),
    );
    object.set(
        "isArray",
        native_fn("isArray", |_r, _this, args| {
            NativeOutcome::bool(matches!(
                args.first(),
                Some(Value::Object(o)) if o.kind() == ObjKind::Array
            ))
        }),
    );
    ctx.set_global("Object", Value::Object(object));
}

fn install_constructors(ctx: &Arc<ScriptContext>) {
    ctx.set_global(
        "Array",
        native_fn("Array", |r, _this, args| {
            let arr = r.context().array_from(args);
            NativeOutcome::Ret(Value::Object(arr))
        }),
    );
    ctx.set_global(
        "HashList",
        native_fn("HashList", |r, _this, _args| {
            // The bucket-count argument is accepted and irrelevant here.
            NativeOutcome::Ret(Value::Object(r.context().make_hashlist()))
        }),
    );
    ctx.set_global(
        "RegExp",
        native_fn("RegExp", |r, _this, args| {
            let pattern = arg_str(&args, 0).unwrap_or_default();
            let ignore_case = args.get(1).map(Value::to_bool).unwrap_or(false);
            let basic = args.get(2).map(Value::to_bool).unwrap_or(false);
            let obj = regex_obj::make_regex(r.context(), &pattern, ignore_case, basic);
            NativeOutcome::Ret(Value::Object(obj))
        }),
    );
}

fn number_value(n: f64) -> Value {
    if n.is_finite() && n == n.trunc() && n.abs() < i64::MAX as f64 {
        Value::Int(n as i64)
    } else {
        Value::Num(n)
    }
}

#[cfg(test)]
#[path = "stdlib_tests.rs"]
mod tests;
