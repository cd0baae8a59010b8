// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Engine` script binding.
//!
//! Exposes the host process to scripts: logging through the debug-level
//! ladder, cooperative sleeps, the base64/hex codecs, shared variables,
//! configuration paths, timed callbacks and the module loader surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use parking_lot::Mutex;
use tracing::info;

use tandem_core::replace_params;
use tandem_script::native::{arg_bool, arg_int, arg_str, native_fn, NativeOutcome};
use tandem_script::{ObjRef, Runner, ScriptContext, Value};
use tandem_threads as threads;

use crate::binding::dump;
use crate::host::{AcceptState, EngineHost};
use crate::levels::{self, DebugLevel};
use crate::timer::TimerWorker;

/// Per-binding logger state.
pub struct EngineState {
    debug_name: Mutex<String>,
    debug_level: Mutex<DebugLevel>,
    debug_enabled: AtomicBool,
}

impl EngineState {
    fn new() -> Arc<EngineState> {
        Arc::new(EngineState {
            debug_name: Mutex::new("js".to_string()),
            debug_level: Mutex::new(DebugLevel::Info),
            debug_enabled: AtomicBool::new(true),
        })
    }

    pub fn debug_name(&self) -> String {
        self.debug_name.lock().clone()
    }

    pub fn debug_level(&self) -> DebugLevel {
        *self.debug_level.lock()
    }
}

/// Install the `Engine` object into a context. Returns the timer worker so
/// the caller can keep it alive with the context; dropping it retires the
/// scheduler thread.
pub fn install_engine(host: &Arc<EngineHost>, ctx: &Arc<ScriptContext>) -> Arc<TimerWorker> {
    let state = EngineState::new();
    let timer = Arc::new(TimerWorker::new(Arc::clone(ctx)));
    let engine = ctx.make_object_at(tandem_script::ObjKind::Native("Engine"), 0, "native:Engine");

    install_logging(&engine, host, &state);
    install_sleeps(&engine);
    install_dumpers(&engine, &state);
    install_lifecycle(&engine, host);
    install_timers(&engine, &timer);
    install_codecs(&engine);
    install_shared(ctx, &engine);
    install_loader(&engine, host);

    for (i, name) in [
        "DebugFail", "DebugTest", "DebugCrit", "DebugGoOn", "DebugConf", "DebugStub",
        "DebugWarn", "DebugMild", "DebugNote", "DebugCall", "DebugInfo", "DebugAll",
    ]
    .iter()
    .enumerate()
    {
        engine.set(name, Value::Int(i as i64));
    }
    engine.freeze();
    ctx.set_global("Engine", Value::Object(engine));
    timer
}

fn join_args(args: &[Value]) -> String {
    args.iter().map(Value::to_display).collect::<Vec<_>>().join(" ")
}

fn install_logging(engine: &ObjRef, host: &Arc<EngineHost>, state: &Arc<EngineState>) {
    engine.set(
        "output",
        native_fn("output", |_r, _this, args| {
            info!(target: "script", "{}", join_args(&args));
            NativeOutcome::undefined()
        }),
    );

    let debug_fn = |tagged: bool| {
        let host = Arc::clone(host);
        let state = Arc::clone(state);
        move |r: &mut Runner, _this: Value, args: Vec<Value>| {
            if !state.debug_enabled.load(Ordering::Acquire) {
                return NativeOutcome::undefined();
            }
            let mut args = args;
            let mut level = DebugLevel::Info;
            if args.first().map(Value::is_integer_shaped).unwrap_or(false) {
                let lo = if host.config().allow_abort { DebugLevel::Fail } else { DebugLevel::Conf };
                level = DebugLevel::from_index(args.remove(0).to_int())
                    .clamp_band(lo, DebugLevel::All);
            }
            if level <= state.debug_level() {
                let trace = tagged.then(|| r.trace_id().map(str::to_string)).flatten();
                levels::emit(level, &state.debug_name(), trace.as_deref(), &join_args(&args));
            }
            NativeOutcome::undefined()
        }
    };
    engine.set("debug", native_fn("debug", debug_fn(false)));
    engine.set("trace", native_fn("trace", debug_fn(true)));
    engine.set("traceDebug", native_fn("traceDebug", debug_fn(true)));

    let alarm_fn = |tagged: bool| {
        let state = Arc::clone(state);
        move |r: &mut Runner, _this: Value, args: Vec<Value>| {
            let mut args = args;
            let mut level = DebugLevel::Warn;
            if args.first().map(Value::is_integer_shaped).unwrap_or(false) {
                level = DebugLevel::from_index(args.remove(0).to_int())
                    .clamp_band(DebugLevel::Fail, DebugLevel::All);
            }
            let trace = tagged.then(|| r.trace_id().map(str::to_string)).flatten();
            levels::emit(level, &state.debug_name(), trace.as_deref(), &join_args(&args));
            NativeOutcome::undefined()
        }
    };
    engine.set("alarm", native_fn("alarm", alarm_fn(false)));
    engine.set("traceAlarm", native_fn("traceAlarm", alarm_fn(true)));

    engine.set(
        "setTraceId",
        native_fn("setTraceId", |r, _this, args| {
            r.set_trace_id(arg_str(&args, 0));
            NativeOutcome::undefined()
        }),
    );

    let s = Arc::clone(state);
    engine.set(
        "debugName",
        native_fn("debugName", move |_r, _this, args| {
            if let Some(name) = arg_str(&args, 0) {
                *s.debug_name.lock() = name;
            }
            NativeOutcome::Ret(Value::Str(s.debug_name()))
        }),
    );
    let s = Arc::clone(state);
    engine.set(
        "debugLevel",
        native_fn("debugLevel", move |_r, _this, args| {
            if let Some(n) = arg_int(&args, 0) {
                *s.debug_level.lock() = DebugLevel::from_index(n);
            }
            NativeOutcome::Ret(Value::Int(s.debug_level().index() as i64))
        }),
    );
    let s = Arc::clone(state);
    engine.set(
        "debugEnabled",
        native_fn("debugEnabled", move |_r, _this, args| {
            if let Some(v) = args.first().filter(|v| !v.is_undefined()) {
                s.debug_enabled.store(v.to_bool(), Ordering::Release);
            }
            NativeOutcome::bool(s.debug_enabled.load(Ordering::Acquire))
        }),
    );
    let s = Arc::clone(state);
    engine.set(
        "debugAt",
        native_fn("debugAt", move |_r, _this, args| {
            let level = DebugLevel::from_index(args.first().map(Value::to_int).unwrap_or(10));
            NativeOutcome::bool(
                s.debug_enabled.load(Ordering::Acquire) && level <= s.debug_level(),
            )
        }),
    );
    let s = Arc::clone(state);
    engine.set(
        "setDebug",
        native_fn("setDebug", move |_r, _this, args| {
            match args.first() {
                Some(Value::Bool(on)) => s.debug_enabled.store(*on, Ordering::Release),
                Some(v) if v.is_integer_shaped() => {
                    *s.debug_level.lock() = DebugLevel::from_index(v.to_int())
                }
                Some(Value::Str(name)) => {
                    if let Some(level) = DebugLevel::parse(name) {
                        *s.debug_level.lock() = level;
                    }
                }
                _ => return NativeOutcome::bool(false),
            }
            NativeOutcome::bool(true)
        }),
    );
}

fn install_sleeps(engine: &ObjRef) {
    engine.set(
        "sleep",
        native_fn("sleep", |_r, _this, args| {
            let secs = args.first().map(Value::to_int).unwrap_or(0).max(0) as u64;
            NativeOutcome::Suspend(tandem_script::WorkItem::new(move || {
                let _ = threads::sleep(secs, false);
                Value::Undefined
            }))
        }),
    );
    engine.set(
        "usleep",
        native_fn("usleep", |_r, _this, args| {
            let usec = args.first().map(Value::to_int).unwrap_or(0).max(0) as u64;
            NativeOutcome::Suspend(tandem_script::WorkItem::new(move || {
                let _ = threads::usleep(usec, false);
                Value::Undefined
            }))
        }),
    );
    engine.set(
        "yield",
        native_fn("yield", |_r, _this, _args| {
            NativeOutcome::Suspend(tandem_script::WorkItem::new(|| {
                let _ = threads::yield_now(false);
                Value::Undefined
            }))
        }),
    );
    engine.set(
        "idle",
        native_fn("idle", |_r, _this, _args| {
            NativeOutcome::Suspend(tandem_script::WorkItem::new(|| {
                let _ = threads::idle(false);
                Value::Undefined
            }))
        }),
    );
}

fn install_dumpers(engine: &ObjRef, state: &Arc<EngineState>) {
    engine.set(
        "dump_r",
        native_fn("dump_r", |_r, _this, args| {
            let v = args.first().cloned().unwrap_or_default();
            NativeOutcome::Ret(Value::Str(dump::dump_recursive(&v)))
        }),
    );
    let s = Arc::clone(state);
    engine.set(
        "print_r",
        native_fn("print_r", move |_r, _this, args| {
            let v = args.first().cloned().unwrap_or_default();
            levels::emit(DebugLevel::Info, &s.debug_name(), None, &dump::dump_recursive(&v));
            NativeOutcome::undefined()
        }),
    );
    engine.set(
        "dump_var_r",
        native_fn("dump_var_r", |_r, _this, args| {
            let v = args.first().cloned().unwrap_or_default();
            NativeOutcome::Ret(Value::Str(dump::dump_recursive(&v)))
        }),
    );
    let s = Arc::clone(state);
    engine.set(
        "print_var_r",
        native_fn("print_var_r", move |_r, _this, args| {
            let v = args.first().cloned().unwrap_or_default();
            levels::emit(DebugLevel::Info, &s.debug_name(), None, &dump::dump_recursive(&v));
            NativeOutcome::undefined()
        }),
    );
    engine.set(
        "dump_root_r",
        native_fn("dump_root_r", |r, _this, _args| {
            let globals = Value::Object(ObjRef::clone(r.context().globals()));
            NativeOutcome::Ret(Value::Str(dump::dump_recursive(&globals)))
        }),
    );
    let s = Arc::clone(state);
    engine.set(
        "print_root_r",
        native_fn("print_root_r", move |r, _this, _args| {
            let globals = Value::Object(ObjRef::clone(r.context().globals()));
            levels::emit(DebugLevel::Info, &s.debug_name(), None, &dump::dump_recursive(&globals));
            NativeOutcome::undefined()
        }),
    );
    engine.set(
        "dump_t",
        native_fn("dump_t", |_r, _this, args| {
            let v = args.first().cloned().unwrap_or_default();
            NativeOutcome::Ret(Value::Str(dump::dump_table(&v)))
        }),
    );
    let s = Arc::clone(state);
    engine.set(
        "print_t",
        native_fn("print_t", move |_r, _this, args| {
            let v = args.first().cloned().unwrap_or_default();
            levels::emit(DebugLevel::Info, &s.debug_name(), None, &dump::dump_table(&v));
            NativeOutcome::undefined()
        }),
    );
}

fn install_lifecycle(engine: &ObjRef, host: &Arc<EngineHost>) {
    let h = Arc::clone(host);
    engine.set(
        "uptime",
        native_fn("uptime", move |_r, _this, args| {
            let kind = match args.first() {
                Some(Value::Str(s)) => s.clone(),
                Some(v) if v.is_integer_shaped() => v.to_int().to_string(),
                _ => "0".to_string(),
            };
            let wall = h.uptime();
            // User and kernel CPU clocks have no safe host interface.
            let value = match kind.as_str() {
                "0" | "wall" | "walltime" => wall,
                _ => std::time::Duration::ZERO,
            };
            let msec = arg_bool(&args, 1, false);
            NativeOutcome::Ret(Value::Int(if msec {
                value.as_millis() as i64
            } else {
                value.as_secs() as i64
            }))
        }),
    );
    let h = Arc::clone(host);
    engine.set(
        "started",
        native_fn("started", move |_r, _this, _args| NativeOutcome::bool(h.started())),
    );
    let h = Arc::clone(host);
    engine.set(
        "exiting",
        native_fn("exiting", move |_r, _this, _args| NativeOutcome::bool(h.exiting())),
    );
    let h = Arc::clone(host);
    engine.set(
        "accepting",
        native_fn("accepting", move |_r, _this, args| {
            if let Some(name) = arg_str(&args, 0) {
                match AcceptState::parse(&name) {
                    Some(state) => h.set_accepting(state),
                    None => return NativeOutcome::bool(false),
                }
            }
            NativeOutcome::Ret(Value::str(h.accepting().name()))
        }),
    );
    let h = Arc::clone(host);
    engine.set(
        "runParams",
        native_fn("runParams", move |r, _this, args| {
            match arg_str(&args, 0) {
                Some(key) => NativeOutcome::Ret(
                    h.run_param(&key).map(Value::Str).unwrap_or_default(),
                ),
                None => {
                    let obj = r.context().make_object();
                    for (k, v) in h.run_params() {
                        obj.set(&k, Value::Str(v));
                    }
                    NativeOutcome::Ret(Value::Object(obj))
                }
            }
        }),
    );
    let h = Arc::clone(host);
    engine.set(
        "configFile",
        native_fn("configFile", move |_r, _this, args| {
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::undefined();
            };
            let user = arg_bool(&args, 1, false);
            NativeOutcome::Ret(Value::str(h.config_file(&name, user).display().to_string()))
        }),
    );
    let h = Arc::clone(host);
    engine.set(
        "restart",
        native_fn("restart", move |_r, _this, args| {
            let code = arg_int(&args, 0).unwrap_or(0);
            let graceful = arg_bool(&args, 1, false);
            NativeOutcome::bool(h.request_restart(code, graceful))
        }),
    );
    let h = Arc::clone(host);
    engine.set(
        "init",
        native_fn("init", move |_r, _this, args| {
            let module = arg_str(&args, 0).unwrap_or_default();
            NativeOutcome::bool(h.notify("engine.init", &[("module", &module)]))
        }),
    );
    let h = Arc::clone(host);
    engine.set(
        "pluginLoaded",
        native_fn("pluginLoaded", move |_r, _this, args| {
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            NativeOutcome::bool(h.plugin_loaded(&name))
        }),
    );
    engine.set(
        "replaceParams",
        native_fn("replaceParams", |_r, _this, args| {
            let Some(text) = arg_str(&args, 0) else {
                return NativeOutcome::undefined();
            };
            let Some(Value::Object(src)) = args.get(1) else {
                return NativeOutcome::Ret(Value::Str(text));
            };
            let sql = arg_bool(&args, 2, false);
            let extra = arg_str(&args, 3).and_then(|s| s.chars().next());
            let mut params = indexmap::IndexMap::new();
            for key in src.keys() {
                params.insert(key.clone(), src.get(&key).to_display());
            }
            NativeOutcome::Ret(Value::Str(replace_params(&text, &params, sql, extra)))
        }),
    );
}

fn install_timers(engine: &ObjRef, timer: &Arc<TimerWorker>) {
    let t = Arc::clone(timer);
    engine.set(
        "setInterval",
        native_fn("setInterval", move |_r, _this, args| {
            let Some(func) = args.first().and_then(Value::as_func).cloned() else {
                return NativeOutcome::undefined();
            };
            let ms = args.get(1).map(Value::to_int).unwrap_or(0).max(0) as u64;
            let extra: Vec<Value> = args.iter().skip(2).cloned().collect();
            NativeOutcome::Ret(Value::Int(t.add(func, ms, true, extra) as i64))
        }),
    );
    let t = Arc::clone(timer);
    engine.set(
        "setTimeout",
        native_fn("setTimeout", move |_r, _this, args| {
            let Some(func) = args.first().and_then(Value::as_func).cloned() else {
                return NativeOutcome::undefined();
            };
            let ms = args.get(1).map(Value::to_int).unwrap_or(0).max(0) as u64;
            let extra: Vec<Value> = args.iter().skip(2).cloned().collect();
            NativeOutcome::Ret(Value::Int(t.add(func, ms, false, extra) as i64))
        }),
    );
    let t = Arc::clone(timer);
    engine.set(
        "clearInterval",
        native_fn("clearInterval", move |_r, _this, args| {
            let id = args.first().map(Value::to_int).unwrap_or(0);
            NativeOutcome::bool(id > 0 && t.remove(id as u32, true))
        }),
    );
    let t = Arc::clone(timer);
    engine.set(
        "clearTimeout",
        native_fn("clearTimeout", move |_r, _this, args| {
            let id = args.first().map(Value::to_int).unwrap_or(0);
            NativeOutcome::bool(id > 0 && t.remove(id as u32, false))
        }),
    );
}

/// Script strings carry bytes one char per octet; code points above 0xFF
/// spill their UTF-8 bytes.
fn string_bytes(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        let cp = c as u32;
        if cp <= 0xFF {
            out.push(cp as u8);
        } else {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }
    out
}

fn bytes_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}

fn hex_encode(bytes: &[u8], sep: Option<char>, upper: bool) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            if let Some(c) = sep {
                out.push(c);
            }
        }
        let piece =
            if upper { format!("{:02X}", b) } else { format!("{:02x}", b) };
        out.push_str(&piece);
    }
    out
}

fn hex_decode(text: &str, sep: Option<char>) -> Option<Vec<u8>> {
    let cleaned: String = match sep {
        Some(c) => text.chars().filter(|x| *x != c).collect(),
        None => text.to_string(),
    };
    if cleaned.len() % 2 != 0 {
        return None;
    }
    hex::decode(cleaned).ok()
}

fn install_codecs(engine: &ObjRef) {
    engine.set(
        "btoa",
        native_fn("btoa", |_r, _this, args| {
            let Some(text) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            NativeOutcome::Ret(Value::Str(BASE64.encode(string_bytes(&text))))
        }),
    );
    engine.set(
        "atob",
        native_fn("atob", |_r, _this, args| {
            let Some(text) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            match BASE64.decode(text.trim()) {
                Ok(bytes) => NativeOutcome::Ret(Value::Str(bytes_string(&bytes))),
                Err(_) => NativeOutcome::bool(false),
            }
        }),
    );
    engine.set(
        "btoh",
        native_fn("btoh", |_r, _this, args| {
            let Some(text) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            let sep = arg_str(&args, 1).and_then(|s| s.chars().next());
            let upper = arg_bool(&args, 2, false);
            NativeOutcome::Ret(Value::Str(hex_encode(&string_bytes(&text), sep, upper)))
        }),
    );
    engine.set(
        "htob",
        native_fn("htob", |_r, _this, args| {
            let Some(text) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            let sep = arg_str(&args, 1).and_then(|s| s.chars().next());
            match hex_decode(&text, sep) {
                Some(bytes) => NativeOutcome::Ret(Value::Str(bytes_string(&bytes))),
                None => NativeOutcome::bool(false),
            }
        }),
    );
    engine.set(
        "atoh",
        native_fn("atoh", |_r, _this, args| {
            let Some(text) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            let sep = arg_str(&args, 1).and_then(|s| s.chars().next());
            let upper = arg_bool(&args, 2, false);
            match BASE64.decode(text.trim()) {
                Ok(bytes) => NativeOutcome::Ret(Value::Str(hex_encode(&bytes, sep, upper))),
                Err(_) => NativeOutcome::bool(false),
            }
        }),
    );
    engine.set(
        "htoa",
        native_fn("htoa", |_r, _this, args| {
            let Some(text) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            let Some(bytes) = hex_decode(&text, None) else {
                return NativeOutcome::bool(false);
            };
            let encoded = BASE64.encode(bytes);
            let line_len = arg_int(&args, 1).unwrap_or(0).max(0) as usize;
            let add_eol = arg_bool(&args, 2, false);
            let mut out = String::new();
            if line_len > 0 {
                let mut rest = encoded.as_str();
                while rest.len() > line_len {
                    out.push_str(&rest[..line_len]);
                    out.push_str("\r\n");
                    rest = &rest[line_len..];
                }
                out.push_str(rest);
            } else {
                out = encoded;
            }
            if add_eol {
                out.push_str("\r\n");
            }
            NativeOutcome::Ret(Value::Str(out))
        }),
    );
}

fn install_shared(ctx: &Arc<ScriptContext>, engine: &ObjRef) {
    let shared = ctx.make_object_at(tandem_script::ObjKind::Native("SharedVars"), 0, "native:SharedVars");
    let vars = tandem_core::SharedVars;
    shared.set(
        "get",
        native_fn("get", move |_r, _this, args| {
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::undefined();
            };
            NativeOutcome::Ret(vars.get(&name).map(Value::Str).unwrap_or_default())
        }),
    );
    shared.set(
        "set",
        native_fn("set", move |_r, _this, args| {
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            let value = args.get(1).map(Value::to_display).unwrap_or_default();
            vars.set(&name, &value);
            NativeOutcome::bool(true)
        }),
    );
    shared.set(
        "inc",
        native_fn("inc", move |_r, _this, args| {
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::undefined();
            };
            let modulus = arg_int(&args, 1).filter(|m| *m > 1).map(|m| m as u64);
            NativeOutcome::Ret(Value::Int(vars.inc(&name, modulus) as i64))
        }),
    );
    shared.set(
        "dec",
        native_fn("dec", move |_r, _this, args| {
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::undefined();
            };
            let modulus = arg_int(&args, 1).filter(|m| *m > 1).map(|m| m as u64);
            NativeOutcome::Ret(Value::Int(vars.dec(&name, modulus) as i64))
        }),
    );
    shared.set(
        "clear",
        native_fn("clear", move |_r, _this, args| {
            if let Some(name) = arg_str(&args, 0) {
                vars.clear(&name);
            }
            NativeOutcome::undefined()
        }),
    );
    shared.set(
        "exists",
        native_fn("exists", move |_r, _this, args| {
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            NativeOutcome::bool(vars.exists(&name))
        }),
    );
    engine.set("shared", Value::Object(shared));
}

fn install_loader(engine: &ObjRef, host: &Arc<EngineHost>) {
    let load = |kind: &'static str| {
        let host = Arc::clone(host);
        move |_r: &mut Runner, _this: Value, args: Vec<Value>| {
            if !host.config().allow_load {
                return NativeOutcome::bool(false);
            }
            if args.is_empty() {
                return NativeOutcome::bool(false);
            }
            let mut ok = true;
            for arg in &args {
                let name = arg.to_display();
                ok &= host.notify("script.init", &[("type", kind), ("name", &name)]);
            }
            NativeOutcome::bool(ok)
        }
    };
    engine.set("loadLibrary", native_fn("loadLibrary", load("library")));
    engine.set("loadObject", native_fn("loadObject", load("object")));
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
