// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON round-trip for script values.
//!
//! Emission follows the engine's rules rather than a generic serializer:
//! undefined values, functions and the prototype slot are skipped, array
//! holes emit `null`, and only integer-shaped numbers survive — a finite
//! non-integer float also emits `null`. Parsing is delegated to
//! `serde_json` and rejects trailing content; failure yields undefined,
//! never a partial tree.

use std::collections::HashSet;
use std::sync::Arc;

use crate::context::ScriptContext;
use crate::object::{ObjKind, ObjRef, PROTO_KEY};
use crate::value::Value;

/// Serialize a value. `spaces` > 0 pretty-prints with that indent width.
/// Returns `None` when the top-level value has no JSON form.
pub fn stringify(value: &Value, spaces: usize) -> Option<String> {
    let mut out = String::new();
    let mut seen = HashSet::new();
    emit(value, spaces, 0, &mut seen, &mut out)?;
    Some(out)
}

fn emit(
    value: &Value,
    spaces: usize,
    depth: usize,
    seen: &mut HashSet<usize>,
    out: &mut String,
) -> Option<()> {
    match value {
        Value::Undefined | Value::Func(_) => None,
        Value::Null => {
            out.push_str("null");
            Some(())
        }
        Value::Bool(b) => {
            out.push_str(if *b { "true" } else { "false" });
            Some(())
        }
        Value::Int(n) => {
            out.push_str(&n.to_string());
            Some(())
        }
        Value::Num(n) => {
            // Only integer-shaped numbers have a JSON rendition.
            if n.is_finite() && *n == n.trunc() && n.abs() < i64::MAX as f64 {
                out.push_str(&(*n as i64).to_string());
            } else {
                out.push_str("null");
            }
            Some(())
        }
        Value::Str(s) => {
            emit_string(s, out);
            Some(())
        }
        Value::Object(obj) => {
            let key = Arc::as_ptr(obj) as usize;
            if !seen.insert(key) {
                out.push_str("null");
                return Some(());
            }
            let result = if obj.kind() == ObjKind::Array {
                emit_array(obj, spaces, depth, seen, out)
            } else {
                emit_object(obj, spaces, depth, seen, out)
            };
            seen.remove(&key);
            result
        }
    }
}

fn emit_array(
    obj: &ObjRef,
    spaces: usize,
    depth: usize,
    seen: &mut HashSet<usize>,
    out: &mut String,
) -> Option<()> {
    let len = obj.length();
    if len == 0 {
        out.push_str("[]");
        return Some(());
    }
    out.push('[');
    for i in 0..len {
        if i > 0 {
            out.push(',');
        }
        newline_indent(spaces, depth + 1, out);
        let item = obj.get_own(&i.to_string()).unwrap_or_default();
        let mut piece = String::new();
        match emit(&item, spaces, depth + 1, seen, &mut piece) {
            // Holes, functions and undefined emit as null inside arrays.
            None => out.push_str("null"),
            Some(()) => out.push_str(&piece),
        }
    }
    newline_indent(spaces, depth, out);
    out.push(']');
    Some(())
}

fn emit_object(
    obj: &ObjRef,
    spaces: usize,
    depth: usize,
    seen: &mut HashSet<usize>,
    out: &mut String,
) -> Option<()> {
    out.push('{');
    let mut first = true;
    for key in obj.keys() {
        if key == PROTO_KEY {
            continue;
        }
        let Some(v) = obj.get_own(&key) else {
            continue;
        };
        let mut piece = String::new();
        if emit(&v, spaces, depth + 1, seen, &mut piece).is_none() {
            // Skipped property.
            continue;
        }
        if !first {
            out.push(',');
        }
        first = false;
        newline_indent(spaces, depth + 1, out);
        emit_string(&key, out);
        out.push(':');
        if spaces > 0 {
            out.push(' ');
        }
        out.push_str(&piece);
    }
    if !first {
        newline_indent(spaces, depth, out);
    }
    out.push('}');
    Some(())
}

fn newline_indent(spaces: usize, depth: usize, out: &mut String) {
    if spaces > 0 {
        out.push('\n');
        for _ in 0..spaces * depth {
            out.push(' ');
        }
    }
}

fn emit_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Parse JSON text into script values. Any error (including trailing
/// content) yields undefined.
pub fn parse(ctx: &Arc<ScriptContext>, text: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(v) => convert(ctx, &v),
        Err(_) => Value::Undefined,
    }
}

fn convert(ctx: &Arc<ScriptContext>, v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Num(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(|i| convert(ctx, i)).collect();
            Value::Object(ctx.array_from(values))
        }
        serde_json::Value::Object(map) => {
            let obj = ctx.make_object();
            for (k, v) in map {
                obj.set(k, convert(ctx, v));
            }
            Value::Object(obj)
        }
    }
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
