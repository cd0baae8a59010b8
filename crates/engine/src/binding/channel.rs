// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Channel` script binding: the per-call control surface.
//!
//! Bound into an assistant's context at creation. `callTo`/`callJust`
//! change meaning with the assistant state: while routing they answer the
//! pending route message in place; on a re-route they launch a fresh
//! `call.execute` on the live channel, carrying the old parameters forward.

use std::sync::{Arc, Weak};

use tracing::debug;

use tandem_core::Message;
use tandem_script::native::{arg_str, native_fn, NativeOutcome};
use tandem_script::{ObjKind, Runner, ScriptContext, Value};

use crate::assist::{AssistState, Assistant};

/// Install the `Channel` object bound to one assistant.
///
/// The binding holds a weak reference; a channel that went away turns every
/// operation into a logged no-op.
pub fn install_channel(ctx: &Arc<ScriptContext>, assist: &Weak<Assistant>) {
    let channel = ctx.make_object_at(ObjKind::Native("Channel"), 0, "native:Channel");

    let a = Weak::clone(assist);
    channel.set(
        "id",
        native_fn("id", move |_r, _this, _args| {
            match a.upgrade() {
                Some(a) => NativeOutcome::Ret(Value::str(a.id())),
                None => NativeOutcome::undefined(),
            }
        }),
    );
    let a = Weak::clone(assist);
    channel.set(
        "peerid",
        native_fn("peerid", move |_r, _this, _args| {
            match a.upgrade().and_then(|a| a.peer_id()) {
                Some(peer) => NativeOutcome::Ret(Value::Str(peer)),
                None => NativeOutcome::undefined(),
            }
        }),
    );
    let a = Weak::clone(assist);
    channel.set(
        "status",
        native_fn("status", move |_r, _this, _args| {
            match a.upgrade() {
                Some(a) => NativeOutcome::Ret(Value::Str(a.status())),
                None => NativeOutcome::undefined(),
            }
        }),
    );
    let a = Weak::clone(assist);
    channel.set(
        "direction",
        native_fn("direction", move |_r, _this, _args| {
            match a.upgrade() {
                Some(a) => NativeOutcome::Ret(Value::Str(a.direction())),
                None => NativeOutcome::undefined(),
            }
        }),
    );
    let a = Weak::clone(assist);
    channel.set(
        "answered",
        native_fn("answered", move |_r, _this, _args| {
            NativeOutcome::bool(a.upgrade().map(|a| a.answered()).unwrap_or(false))
        }),
    );

    let a = Weak::clone(assist);
    channel.set(
        "answer",
        native_fn("answer", move |_r, _this, _args| {
            let Some(a) = a.upgrade() else {
                return NativeOutcome::bool(false);
            };
            let mut msg = Message::new("call.answered", false);
            msg.set_param("id", a.id());
            if let Some(peer) = a.peer_id() {
                msg.set_param("targetid", &peer);
            }
            NativeOutcome::bool(a.host().enqueue(msg.into_ref()))
        }),
    );

    let a = Weak::clone(assist);
    channel.set(
        "hangup",
        native_fn("hangup", move |r, _this, args| {
            let Some(a) = a.upgrade() else {
                return NativeOutcome::bool(false);
            };
            let reason = arg_str(&args, 0);
            let peer = args.get(2).map(Value::to_bool).unwrap_or(false);
            let target = if peer { a.peer_id().unwrap_or_else(|| a.id().to_string()) } else { a.id().to_string() };
            // While a route hangs up its own call, the pending message
            // reports the reason back to the router.
            if let (Some(reason), Some(msg)) = (&reason, a.current_msg()) {
                let key = if a.state() == AssistState::Routing { "error" } else { "reason" };
                msg.lock().set_param(key, reason);
            }
            let mut drop = Message::new("call.drop", false);
            drop.set_param("id", &target);
            if let Some(reason) = &reason {
                drop.set_param("reason", reason);
            }
            if let Some(Value::Object(extra)) = args.get(1) {
                copy_obj_params(&mut drop, extra);
            }
            let ok = a.host().enqueue(drop.into_ref());
            if !peer {
                a.raise_state(AssistState::Hangup);
                a.mark_handled();
                r.pause();
            }
            NativeOutcome::bool(ok)
        }),
    );

    let a = Weak::clone(assist);
    channel.set(
        "callTo",
        native_fn("callTo", move |r, _this, args| {
            call_to(&a, r, &args, false)
        }),
    );
    let a = Weak::clone(assist);
    channel.set(
        "callJust",
        native_fn("callJust", move |r, _this, args| {
            call_to(&a, r, &args, true)
        }),
    );

    let a = Weak::clone(assist);
    channel.set(
        "playFile",
        native_fn("playFile", move |_r, _this, args| {
            let Some(a) = a.upgrade() else {
                return NativeOutcome::bool(false);
            };
            let Some(source) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            let mut msg = Message::new("chan.attach", false);
            msg.set_param("id", a.id());
            msg.set_param("source", &format!("wave/play/{}", source));
            NativeOutcome::bool(a.host().enqueue(msg.into_ref()))
        }),
    );
    let a = Weak::clone(assist);
    channel.set(
        "recFile",
        native_fn("recFile", move |_r, _this, args| {
            let Some(a) = a.upgrade() else {
                return NativeOutcome::bool(false);
            };
            let Some(dest) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            let mut msg = Message::new("chan.attach", false);
            msg.set_param("id", a.id());
            msg.set_param("consumer", &format!("wave/record/{}", dest));
            if let Some(maxlen) = arg_str(&args, 1) {
                msg.set_param("maxlen", &maxlen);
            }
            NativeOutcome::bool(a.host().enqueue(msg.into_ref()))
        }),
    );

    channel.freeze();
    ctx.set_global("Channel", Value::Object(channel));
}

fn copy_obj_params(msg: &mut Message, obj: &tandem_script::ObjRef) {
    for key in obj.keys() {
        match obj.get(&key) {
            Value::Undefined | Value::Null | Value::Func(_) | Value::Object(_) => continue,
            v => msg.set_param(&key, &v.to_display()),
        }
    }
}

fn call_to(
    assist: &Weak<Assistant>,
    runner: &mut Runner,
    args: &[Value],
    just: bool,
) -> NativeOutcome {
    let Some(a) = assist.upgrade() else {
        return NativeOutcome::bool(false);
    };
    let target = match arg_str(args, 0).map(|t| t.trim().to_string()) {
        Some(t) if !t.is_empty() => t,
        _ => {
            debug!(channel = a.id(), "callTo with no target");
            return NativeOutcome::bool(false);
        }
    };
    let params = match args.get(1) {
        Some(Value::Object(o)) => Some(o.clone()),
        _ => None,
    };
    let ok = match a.state() {
        AssistState::Routing => {
            let Some(msg) = a.current_msg() else {
                debug!(channel = a.id(), "routing callTo without a message");
                return NativeOutcome::bool(false);
            };
            {
                let mut msg = msg.lock();
                if let Some(p) = &params {
                    copy_obj_params(&mut msg, p);
                }
                msg.set_ret_value(&target);
            }
            a.mark_handled();
            runner.pause();
            true
        }
        AssistState::ReRoute => {
            let mut execute = Message::new("call.execute", false);
            execute.set_param("id", a.id());
            execute.set_param("callto", &target);
            if let Some(p) = &params {
                copy_obj_params(&mut execute, p);
            }
            // Parameters of the message being handled carry forward unless
            // explicitly overridden.
            if let Some(msg) = a.current_msg() {
                execute.fill_params(msg.lock().params());
            }
            let ok = a.host().enqueue(execute.into_ref());
            a.mark_handled();
            runner.pause();
            ok
        }
        state => {
            debug!(channel = a.id(), ?state, "callTo in inapplicable state");
            false
        }
    };
    if just {
        a.end();
    }
    NativeOutcome::bool(ok)
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
