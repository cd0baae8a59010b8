// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Message` script binding.
//!
//! A message wrapper is a native object whose parameter source is the bus
//! message itself: property reads see the live parameters and property
//! assignment is `setParam`. The `Message` global is a constructor object
//! carrying the handler-management statics (`install`, `installHook`,
//! `handlers`, `trackName`).

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use regex::Regex;
use tracing::debug;

use tandem_core::{
    HandlerId, Message, MessageBus, MessageFilter, MessageRef, QueueHook, Tabular,
};
use tandem_script::native::{arg_bool, arg_func, arg_int, arg_str, native_fn, NativeOutcome};
use tandem_script::runner::call_function;
use tandem_script::{
    FuncValue, ObjKind, ObjRef, ParamSource, Runner, ScriptContext, Value, WorkItem,
};

use crate::host::EngineHost;
use crate::levels::{self, DebugLevel};

pub const MESSAGE_TAG: &str = "Message";

/// Live view of a message's parameters behind the wrapper object.
struct MessageParams {
    msg: MessageRef,
}

impl ParamSource for MessageParams {
    fn get_param(&self, name: &str) -> Option<Value> {
        self.msg.lock().param(name).map(Value::str)
    }

    fn set_param(&self, name: &str, value: &Value) -> bool {
        match value {
            // Structured values stay on the wrapper itself.
            Value::Object(_) | Value::Func(_) => false,
            v => {
                self.msg.lock().set_param(name, &v.to_display());
                true
            }
        }
    }

    fn clear_param(&self, name: &str) -> bool {
        let mut msg = self.msg.lock();
        if msg.param(name).is_some() {
            msg.clear_param(name);
            true
        } else {
            false
        }
    }

    fn param_names(&self) -> Vec<String> {
        self.msg.lock().params().keys().cloned().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Wrap a bus message for one script's use.
pub fn make_message_object(
    ctx: &Arc<ScriptContext>,
    host: &Arc<EngineHost>,
    msg: &MessageRef,
) -> ObjRef {
    let obj = ctx.make_object_at(ObjKind::Native(MESSAGE_TAG), 0, "native:Message");
    obj.set_param_source(Arc::new(MessageParams { msg: MessageRef::clone(msg) }));
    install_instance_methods(&obj, host, msg);
    obj
}

/// Detach the wrapper from its message after a handler delivery.
pub fn detach_message_object(obj: &ObjRef) {
    obj.clear_param_source();
}

/// The message behind a wrapper, when it still has one.
pub fn wrapped_message(obj: &ObjRef) -> Option<MessageRef> {
    let src = obj.param_source()?;
    let params = src.as_any().downcast_ref::<MessageParams>()?;
    Some(MessageRef::clone(&params.msg))
}

fn install_instance_methods(obj: &ObjRef, host: &Arc<EngineHost>, msg: &MessageRef) {
    let m = MessageRef::clone(msg);
    let bus = Arc::clone(host.bus());
    let wrapper_check = ObjRef::downgrade(obj);
    obj.set(
        "enqueue",
        native_fn("enqueue", move |_r, _this, _args| {
            // Ownership moves to the bus; the wrapper freezes.
            if let Some(wrapper) = wrapper_check.upgrade() {
                wrapper.freeze();
            }
            NativeOutcome::bool(bus.enqueue(MessageRef::clone(&m)))
        }),
    );

    let m = MessageRef::clone(msg);
    let bus = Arc::clone(host.bus());
    obj.set(
        "dispatch",
        native_fn("dispatch", move |_r, _this, args| {
            if arg_bool(&args, 0, false) {
                let bus = Arc::clone(&bus);
                let m = MessageRef::clone(&m);
                NativeOutcome::Suspend(WorkItem::new(move || Value::Bool(bus.dispatch(&m))))
            } else {
                NativeOutcome::bool(bus.dispatch(&m))
            }
        }),
    );

    let m = MessageRef::clone(msg);
    obj.set(
        "name",
        native_fn("name", move |_r, _this, _args| {
            NativeOutcome::Ret(Value::str(m.lock().name()))
        }),
    );
    let m = MessageRef::clone(msg);
    obj.set(
        "broadcast",
        native_fn("broadcast", move |_r, _this, _args| {
            NativeOutcome::bool(m.lock().broadcast())
        }),
    );

    let m = MessageRef::clone(msg);
    let wrapper_check = ObjRef::downgrade(obj);
    obj.set(
        "retValue",
        native_fn("retValue", move |_r, _this, args| {
            let frozen =
                wrapper_check.upgrade().map(|w| w.is_frozen()).unwrap_or(true);
            if let Some(v) = args.first().filter(|v| !v.is_undefined()) {
                if !frozen {
                    m.lock().set_ret_value(&v.to_display());
                }
            }
            NativeOutcome::Ret(Value::str(m.lock().ret_value()))
        }),
    );

    let m = MessageRef::clone(msg);
    let wrapper_check = ObjRef::downgrade(obj);
    obj.set(
        "msgTime",
        native_fn("msgTime", move |_r, _this, args| {
            let frozen =
                wrapper_check.upgrade().map(|w| w.is_frozen()).unwrap_or(true);
            match args.first() {
                Some(Value::Bool(true)) if !frozen => m.lock().touch(),
                Some(v) if v.is_integer_shaped() && !frozen => {
                    m.lock().set_msec(v.to_int().max(0) as u64)
                }
                _ => {}
            }
            NativeOutcome::Ret(Value::Int(m.lock().msec() as i64))
        }),
    );
    let m = MessageRef::clone(msg);
    obj.set(
        "msgAge",
        native_fn("msgAge", move |_r, _this, _args| {
            NativeOutcome::Ret(Value::Int(m.lock().age_msec() as i64))
        }),
    );

    let m = MessageRef::clone(msg);
    obj.set(
        "getParam",
        native_fn("getParam", move |_r, _this, args| {
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::undefined();
            };
            let auto_num = arg_bool(&args, 2, false);
            match m.lock().param(&name) {
                Some(v) if auto_num => match v.trim().parse::<i64>() {
                    Ok(n) => NativeOutcome::Ret(Value::Int(n)),
                    Err(_) => NativeOutcome::Ret(Value::str(v)),
                },
                Some(v) => NativeOutcome::Ret(Value::str(v)),
                None => NativeOutcome::Ret(args.get(1).cloned().unwrap_or_default()),
            }
        }),
    );

    let m = MessageRef::clone(msg);
    let wrapper_check = ObjRef::downgrade(obj);
    obj.set(
        "setParam",
        native_fn("setParam", move |_r, _this, args| {
            if wrapper_check.upgrade().map(|w| w.is_frozen()).unwrap_or(true) {
                return NativeOutcome::bool(false);
            }
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            match args.get(1) {
                None | Some(Value::Undefined) => m.lock().clear_param(&name),
                Some(v) => m.lock().set_param(&name, &v.to_display()),
            }
            NativeOutcome::bool(true)
        }),
    );

    let m = MessageRef::clone(msg);
    let wrapper_check = ObjRef::downgrade(obj);
    obj.set(
        "clearParam",
        native_fn("clearParam", move |_r, _this, args| {
            if wrapper_check.upgrade().map(|w| w.is_frozen()).unwrap_or(true) {
                return NativeOutcome::bool(false);
            }
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            match arg_str(&args, 1).and_then(|s| s.chars().next()) {
                Some(sep) => m.lock().clear_param_prefix(&name, sep),
                None => m.lock().clear_param(&name),
            }
            NativeOutcome::bool(true)
        }),
    );

    let m = MessageRef::clone(msg);
    let wrapper_check = ObjRef::downgrade(obj);
    obj.set(
        "copyParams",
        native_fn("copyParams", move |_r, _this, args| {
            if wrapper_check.upgrade().map(|w| w.is_frozen()).unwrap_or(true) {
                return NativeOutcome::bool(false);
            }
            let Some(Value::Object(src)) = args.first() else {
                return NativeOutcome::bool(false);
            };
            let prefix = arg_str(&args, 1).unwrap_or_default();
            let skip = arg_bool(&args, 2, true);
            let mut msg = m.lock();
            for key in src.keys() {
                if !prefix.is_empty() && !key.starts_with(&prefix) {
                    continue;
                }
                let v = src.get(&key);
                match v {
                    Value::Undefined | Value::Null if skip => continue,
                    Value::Func(_) | Value::Object(_) => continue,
                    v => msg.set_param(&key, &v.to_display()),
                }
            }
            NativeOutcome::bool(true)
        }),
    );

    install_tabular_methods(obj, msg);

    let m = MessageRef::clone(msg);
    obj.set(
        "trace",
        native_fn("trace", move |r, _this, args| {
            let ret = args.first().cloned().unwrap_or_default();
            // Lenient by long-standing behavior: a non-numeric or
            // out-of-band level silently drops the line.
            let level = args.get(1).filter(|v| v.is_integer_shaped()).map(Value::to_int);
            if let Some(n) = level {
                if (0..=11).contains(&n) {
                    let text = args
                        .iter()
                        .skip(2)
                        .map(Value::to_display)
                        .collect::<Vec<_>>()
                        .join(" ");
                    let trace_id =
                        m.lock().trace_id().map(str::to_string).or_else(|| {
                            r.trace_id().map(str::to_string)
                        });
                    levels::emit(DebugLevel::from_index(n), "message", trace_id.as_deref(), &text);
                    let mut msg = m.lock();
                    if msg.trace_id().is_some() {
                        let seq = msg.params().keys().filter(|k| k.starts_with("trace_msg_")).count();
                        msg.set_param(&format!("trace_msg_{}", seq), &text);
                    }
                }
            }
            NativeOutcome::Ret(ret)
        }),
    );
}

fn install_tabular_methods(obj: &ObjRef, msg: &MessageRef) {
    let m = MessageRef::clone(msg);
    obj.set(
        "getColumn",
        native_fn("getColumn", move |r, _this, args| {
            let msg = m.lock();
            let Some(data) = msg.tabular() else {
                return NativeOutcome::undefined();
            };
            let index = column_index(data, args.first());
            let Some(col) = index else {
                // Without an argument: the column name list.
                if args.first().map(|v| !v.is_undefined()).unwrap_or(false) {
                    return NativeOutcome::undefined();
                }
                let names = data.columns.iter().cloned().map(Value::Str).collect();
                return NativeOutcome::Ret(Value::Object(r.context().array_from(names)));
            };
            let cells = data
                .rows
                .iter()
                .map(|row| cell_value(row.get(col).cloned().flatten()))
                .collect();
            NativeOutcome::Ret(Value::Object(r.context().array_from(cells)))
        }),
    );

    let m = MessageRef::clone(msg);
    obj.set(
        "getRow",
        native_fn("getRow", move |r, _this, args| {
            let msg = m.lock();
            let Some(data) = msg.tabular() else {
                return NativeOutcome::undefined();
            };
            let index = args.first().map(Value::to_int).unwrap_or(0);
            let Some(row) = (index >= 0).then(|| data.rows.get(index as usize)).flatten() else {
                return NativeOutcome::undefined();
            };
            let out = r.context().make_object();
            for (i, name) in data.columns.iter().enumerate() {
                out.set(name, cell_value(row.get(i).cloned().flatten()));
            }
            NativeOutcome::Ret(Value::Object(out))
        }),
    );

    let m = MessageRef::clone(msg);
    obj.set(
        "getResult",
        native_fn("getResult", move |_r, _this, args| {
            let msg = m.lock();
            let Some(data) = msg.tabular() else {
                return NativeOutcome::undefined();
            };
            let row = args.first().map(Value::to_int).unwrap_or(-1);
            let Some(col) = column_index(data, args.get(1)) else {
                return NativeOutcome::undefined();
            };
            let Some(row) = (row >= 0).then(|| data.rows.get(row as usize)).flatten() else {
                return NativeOutcome::undefined();
            };
            NativeOutcome::Ret(cell_value(row.get(col).cloned().flatten()))
        }),
    );
}

fn column_index(data: &Tabular, arg: Option<&Value>) -> Option<usize> {
    match arg {
        Some(v) if v.is_integer_shaped() => {
            let n = v.to_int();
            (n >= 0 && (n as usize) < data.columns.len()).then_some(n as usize)
        }
        Some(Value::Str(name)) => data.column_index(name),
        _ => None,
    }
}

fn cell_value(cell: Option<String>) -> Value {
    cell.map(Value::Str).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// The Message constructor object and handler statics
// ---------------------------------------------------------------------------

/// Per-context bookkeeping for handlers installed by scripts.
struct JsHandlers {
    bus: Arc<MessageBus>,
    ids: Mutex<HashMap<String, Vec<HandlerId>>>,
    hooks: Mutex<Vec<(String, Option<String>)>>,
    track: Mutex<Option<String>>,
}

/// Install the `Message` constructor object into a context.
pub fn install_message(host: &Arc<EngineHost>, ctx: &Arc<ScriptContext>) {
    let ctor = ctx.make_object_at(ObjKind::Native(MESSAGE_TAG), 0, "native:Message");
    let handlers = Arc::new(JsHandlers {
        bus: Arc::clone(host.bus()),
        ids: Mutex::new(HashMap::new()),
        hooks: Mutex::new(Vec::new()),
        track: Mutex::new(None),
    });

    let h = Arc::clone(host);
    ctor.set(
        "__invoke__",
        native_fn(MESSAGE_TAG, move |r, _this, args| {
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::undefined();
            };
            let broadcast = arg_bool(&args, 1, false);
            let mut msg = Message::new(&name, broadcast);
            if let Some(trace) = r.trace_id() {
                msg.set_trace_id(Some(trace));
                msg.set_param("trace_id", trace);
            }
            if let Some(Value::Object(init)) = args.get(2) {
                for key in init.keys() {
                    match init.get(&key) {
                        Value::Undefined | Value::Func(_) | Value::Object(_) => continue,
                        v => msg.set_param(&key, &v.to_display()),
                    }
                }
            }
            let wrapper = make_message_object(r.context(), &h, &msg.into_ref());
            NativeOutcome::Ret(Value::Object(wrapper))
        }),
    );

    install_handler_statics(&ctor, host, &handlers);
    ctor.freeze();
    ctx.set_global(MESSAGE_TAG, Value::Object(ctor));
}

fn parse_filter(name: Option<String>, value: Option<String>) -> Option<MessageFilter> {
    let (name, value) = (name?, value?);
    // A value shaped ^…$ (or containing an unescaped alternation or class)
    // is compiled; everything else matches literally.
    let looks_regex = value.starts_with('^')
        || value.ends_with('$')
        || value.contains("\\b")
        || value.contains('|')
        || value.contains('[');
    if looks_regex {
        match Regex::new(&value) {
            Ok(re) => return Some(MessageFilter::pattern(&name, re)),
            Err(e) => {
                debug!(filter = %value, error = %e, "filter regex rejected, matching literally");
            }
        }
    }
    Some(MessageFilter::literal(&name, &value))
}

/// A bus callback delivering messages to a script function.
///
/// Every delivery runs on a fresh runner over the owning context, so
/// handler state never leaks between invocations. The wrapper is detached
/// from the message as the delivery ends.
fn script_handler(
    host: &Arc<EngineHost>,
    ctx: &Arc<ScriptContext>,
    func: FuncValue,
) -> impl Fn(&MessageRef) -> bool + Send + Sync {
    let host = Arc::clone(host);
    let ctx = Arc::clone(ctx);
    move |msg| {
        let mut runner = Runner::for_context(Arc::clone(&ctx), "handler");
        if let Some(id) = msg.lock().trace_id() {
            runner.set_trace_id(Some(id.to_string()));
        }
        let wrapper = make_message_object(&ctx, &host, msg);
        let state = runner.call_value(&func, vec![Value::Object(ObjRef::clone(&wrapper))]);
        detach_message_object(&wrapper);
        if state != tandem_script::RunState::Succeeded {
            debug!(?state, "message handler did not complete");
            return false;
        }
        runner.pop_value().map(|v| v.to_bool()).unwrap_or(false)
    }
}

fn install_handler_statics(ctor: &ObjRef, host: &Arc<EngineHost>, handlers: &Arc<JsHandlers>) {
    let h = Arc::clone(host);
    let hs = Arc::clone(handlers);
    ctor.set(
        "install",
        native_fn("install", move |r, _this, args| {
            let Some(func) = arg_func(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            let Some(name) = arg_str(&args, 1) else {
                return NativeOutcome::bool(false);
            };
            let priority = arg_int(&args, 2).unwrap_or(100).max(0) as u32;
            let filter = parse_filter(arg_str(&args, 3), arg_str(&args, 4));
            let track = hs.track.lock().clone();
            let callback = script_handler(&h, r.context(), func);
            let id = hs.bus.install(&name, priority, filter, track, Arc::new(callback));
            hs.ids.lock().entry(name).or_default().push(id);
            NativeOutcome::bool(true)
        }),
    );

    let hs = Arc::clone(handlers);
    ctor.set(
        "uninstall",
        native_fn("uninstall", move |_r, _this, args| {
            match arg_str(&args, 0) {
                Some(name) => {
                    let ids = hs.ids.lock().remove(&name).unwrap_or_default();
                    let mut any = false;
                    for id in ids {
                        any |= hs.bus.uninstall(id);
                    }
                    NativeOutcome::bool(any)
                }
                None => {
                    // No name removes everything this context installed.
                    let all: Vec<HandlerId> =
                        hs.ids.lock().drain().flat_map(|(_, v)| v).collect();
                    for id in &all {
                        hs.bus.uninstall(*id);
                    }
                    NativeOutcome::bool(!all.is_empty())
                }
            }
        }),
    );

    let hs = Arc::clone(handlers);
    ctor.set(
        "handlers",
        native_fn("handlers", move |r, _this, args| {
            let pattern = arg_str(&args, 0).and_then(|p| Regex::new(&p).ok());
            let infos = hs.bus.handlers(pattern.as_ref());
            let out: Vec<Value> = infos
                .into_iter()
                .map(|info| {
                    let o = r.context().make_object();
                    o.set("name", Value::Str(info.message));
                    o.set("priority", Value::Int(info.priority as i64));
                    if let Some(t) = info.track {
                        o.set("trackName", Value::Str(t));
                    }
                    if let Some(p) = info.filter_param {
                        o.set("filter", Value::Str(p));
                    }
                    Value::Object(o)
                })
                .collect();
            NativeOutcome::Ret(Value::Object(r.context().array_from(out)))
        }),
    );

    let hs = Arc::clone(handlers);
    ctor.set(
        "trackName",
        native_fn("trackName", move |_r, _this, args| {
            match arg_str(&args, 0) {
                Some(name) if !name.is_empty() => *hs.track.lock() = Some(name),
                Some(_) => *hs.track.lock() = None,
                None => {}
            }
            NativeOutcome::Ret(
                hs.track.lock().clone().map(Value::Str).unwrap_or_default(),
            )
        }),
    );

    let h = Arc::clone(host);
    let hs = Arc::clone(handlers);
    ctor.set(
        "installHook",
        native_fn("installHook", move |r, _this, args| {
            let Some(received) = arg_func(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            let Some(name) = arg_str(&args, 1) else {
                return NativeOutcome::bool(false);
            };
            let threads = arg_int(&args, 2).unwrap_or(1).max(1) as usize;
            // Optional trap callback with threshold, then optional filter.
            let (trap, rest) = match arg_func(&args, 3) {
                Some(f) => {
                    let threshold = arg_int(&args, 4).unwrap_or(0).max(0) as usize;
                    (Some((f, threshold)), 5)
                }
                None => (None, 3),
            };
            let filter = parse_filter(arg_str(&args, rest), arg_str(&args, rest + 1));
            let filter_value = filter.as_ref().and_then(|f| match &f.value {
                tandem_core::FilterValue::Literal(v) => Some(v.clone()),
                _ => None,
            });

            let ctx = Arc::clone(r.context());
            let host_rx = Arc::clone(&h);
            let on_received = Arc::new(move |msg: &MessageRef| {
                let wrapper = make_message_object(&ctx, &host_rx, msg);
                let mut runner = Runner::for_context(Arc::clone(&ctx), "queue");
                let _ = runner.call_value(&received, vec![Value::Object(ObjRef::clone(&wrapper))]);
                detach_message_object(&wrapper);
            });
            let trap = trap.map(|(f, threshold)| {
                let ctx = Arc::clone(r.context());
                let trap_fn: tandem_core::TrapFn = Arc::new(move || {
                    let _ = call_function(&ctx, &f, Vec::new());
                });
                (trap_fn, threshold)
            });
            let hook = QueueHook::start(&name, filter, threads, on_received, trap);
            h.bus().install_hook(hook);
            hs.hooks.lock().push((name, filter_value));
            NativeOutcome::bool(true)
        }),
    );

    let h = Arc::clone(host);
    let hs = Arc::clone(handlers);
    ctor.set(
        "uninstallHook",
        native_fn("uninstallHook", move |_r, _this, args| {
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            let filter_value = arg_str(&args, 1);
            let removed = h.bus().uninstall_hook(&name, filter_value.as_deref());
            hs.hooks.lock().retain(|(n, v)| {
                !(n == &name
                    && filter_value.as_ref().map(|f| v.as_ref() == Some(f)).unwrap_or(true))
            });
            NativeOutcome::bool(removed > 0)
        }),
    );
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
