// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-call assistants and their manager.
//!
//! One assistant per channel id, created on the first preroute/route event.
//! Each assistant owns a fresh context (with the full binding surface and a
//! `Channel` object bound to itself) and a runner over the shared routing
//! script. Entries (`onRoute`, `onHangup`, …) run on short-lived runners
//! over the same context, so entry state never leaks between deliveries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use tandem_core::{MessageRef, PostHook};
use tandem_script::{CodeBlock, ObjRef, RunState, Runner, ScriptContext, Value};

use crate::binding::channel::install_channel;
use crate::binding::message::{detach_message_object, make_message_object};
use crate::binding::{self};
use crate::host::EngineHost;
use crate::timer::TimerWorker;

/// Assistant lifecycle; transitions are monotonically non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssistState {
    NotStarted,
    Routing,
    ReRoute,
    Ended,
    Hangup,
}

pub struct Assistant {
    id: String,
    host: Arc<EngineHost>,
    context: Arc<ScriptContext>,
    state: Mutex<AssistState>,
    handled: AtomicBool,
    runner: Mutex<Runner>,
    current_msg: Mutex<Option<MessageRef>>,
    peer_id: Mutex<Option<String>>,
    answered: AtomicBool,
    status: Mutex<String>,
    direction: Mutex<String>,
    /// Keeps the engine binding's scheduler alive with the call.
    _timer: Arc<TimerWorker>,
}

impl Assistant {
    fn new(host: &Arc<EngineHost>, code: &Arc<CodeBlock>, id: &str) -> Arc<Assistant> {
        let context = ScriptContext::new();
        let timer = binding::install_bindings(host, &context);
        let runner = Runner::new(Arc::clone(code), Arc::clone(&context), id);
        let assist = Arc::new(Assistant {
            id: id.to_string(),
            host: Arc::clone(host),
            context,
            state: Mutex::new(AssistState::NotStarted),
            handled: AtomicBool::new(false),
            runner: Mutex::new(runner),
            current_msg: Mutex::new(None),
            peer_id: Mutex::new(None),
            answered: AtomicBool::new(false),
            status: Mutex::new("incoming".to_string()),
            direction: Mutex::new("incoming".to_string()),
            _timer: timer,
        });
        install_channel(&assist.context, &Arc::downgrade(&assist));
        // The top-level body runs once at creation so the entry points are
        // defined before any event is delivered.
        let state = assist.runner.lock().run();
        if state != RunState::Succeeded {
            debug!(channel = id, ?state, "routing script startup run failed");
        }
        assist
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host(&self) -> &Arc<EngineHost> {
        &self.host
    }

    pub fn context(&self) -> &Arc<ScriptContext> {
        &self.context
    }

    pub fn state(&self) -> AssistState {
        *self.state.lock()
    }

    /// Raise the state; downgrades are ignored.
    pub fn raise_state(&self, next: AssistState) {
        let mut state = self.state.lock();
        if next > *state {
            *state = next;
        }
    }

    /// Force the assistant out of routing for good.
    pub fn end(&self) {
        self.raise_state(AssistState::Ended);
    }

    pub fn mark_handled(&self) {
        self.handled.store(true, Ordering::Release);
    }

    pub fn current_msg(&self) -> Option<MessageRef> {
        self.current_msg.lock().clone()
    }

    pub fn peer_id(&self) -> Option<String> {
        self.peer_id.lock().clone()
    }

    pub fn answered(&self) -> bool {
        self.answered.load(Ordering::Acquire)
    }

    pub fn status(&self) -> String {
        self.status.lock().clone()
    }

    pub fn direction(&self) -> String {
        self.direction.lock().clone()
    }

    fn note_channel_info(&self, msg: &MessageRef) {
        let msg = msg.lock();
        if let Some(peer) = msg.param("peerid").or_else(|| msg.param("targetid")) {
            *self.peer_id.lock() = Some(peer.to_string());
        }
        if let Some(dir) = msg.param("direction") {
            *self.direction.lock() = dir.to_string();
        }
        if let Some(status) = msg.param("status") {
            *self.status.lock() = status.to_string();
        }
    }

    /// Run one entry function on a fresh runner. Returns the entry's
    /// boolean result (false when undefined or failed).
    fn run_function(&self, name: &str, msg: &MessageRef, handled: Option<bool>) -> bool {
        if !self.runner.lock().callable(name) {
            return false;
        }
        debug!(channel = %self.id, entry = name, "running entry");
        let wrapper = make_message_object(&self.context, &self.host, msg);
        let mut args = vec![Value::Object(ObjRef::clone(&wrapper))];
        if let Some(h) = handled {
            wrapper.freeze();
            args.push(Value::Bool(h));
        }
        let previous = self.current_msg.lock().replace(MessageRef::clone(msg));
        let mut runner = Runner::for_context(Arc::clone(&self.context), &self.id);
        if let Some(trace) = msg.lock().trace_id() {
            runner.set_trace_id(Some(trace.to_string()));
        }
        let state = runner.call(name, args);
        *self.current_msg.lock() = previous;
        detach_message_object(&wrapper);
        if state != RunState::Succeeded {
            debug!(channel = %self.id, entry = name, ?state, "entry did not complete");
            return false;
        }
        runner.pop_value().map(|v| v.to_bool()).unwrap_or(false)
    }

    /// Re-run the routing script body against a message, driving the main
    /// runner through its suspension points. Returns the handled flag.
    fn run_script(&self, msg: &MessageRef, new_state: AssistState) -> bool {
        if self.state() >= AssistState::Ended {
            return false;
        }
        self.raise_state(new_state);
        self.handled.store(false, Ordering::Release);
        *self.current_msg.lock() = Some(MessageRef::clone(msg));
        {
            let mut runner = self.runner.lock();
            if let Some(trace) = msg.lock().trace_id() {
                runner.set_trace_id(Some(trace.to_string()));
            }
            runner.reset(true);
            let state = runner.run();
            if state == RunState::Failed {
                debug!(channel = %self.id, "routing script failed");
            }
        }
        let handled = self.handled.load(Ordering::Acquire);
        *self.current_msg.lock() = None;
        if self.state() == AssistState::Routing {
            self.raise_state(AssistState::ReRoute);
        }
        handled
    }

    fn msg_route(&self, msg: &MessageRef) -> bool {
        if self.state() >= AssistState::Ended {
            return false;
        }
        self.raise_state(AssistState::Routing);
        self.note_channel_info(msg);
        if self.runner.lock().callable("onRoute") {
            self.handled.store(false, Ordering::Release);
            let returned = self.run_function("onRoute", msg, None);
            let handled = returned || self.handled.load(Ordering::Acquire);
            if self.state() == AssistState::Routing {
                self.raise_state(AssistState::ReRoute);
            }
            handled
        } else {
            self.run_script(msg, AssistState::Routing)
        }
    }

    fn msg_disconnect(&self, msg: &MessageRef) -> bool {
        self.run_function("onDisconnected", msg, None)
            || self.run_script(msg, AssistState::ReRoute)
    }

    fn unload(&self) {
        if self.runner.lock().callable("onUnload") {
            let mut runner = Runner::for_context(Arc::clone(&self.context), &self.id);
            let _ = runner.call("onUnload", Vec::new());
        }
    }
}

/// Owns the channel-id → assistant map and drives the state machines.
pub struct AssistManager {
    host: Arc<EngineHost>,
    code: Arc<CodeBlock>,
    assistants: Mutex<HashMap<String, Arc<Assistant>>>,
    priority: u32,
}

impl AssistManager {
    pub fn new(host: &Arc<EngineHost>, code: Arc<CodeBlock>, priority: u32) -> Arc<AssistManager> {
        Arc::new(AssistManager {
            host: Arc::clone(host),
            code,
            assistants: Mutex::new(HashMap::new()),
            priority,
        })
    }

    pub fn assistant(&self, id: &str) -> Option<Arc<Assistant>> {
        self.assistants.lock().get(id).cloned()
    }

    pub fn count(&self) -> usize {
        self.assistants.lock().len()
    }

    fn get_or_create(&self, id: &str, msg: &MessageRef, may_create: bool) -> Option<Arc<Assistant>> {
        if let Some(found) = self.assistants.lock().get(id) {
            return Some(Arc::clone(found));
        }
        if !may_create {
            return None;
        }
        info!(channel = id, "creating call assistant");
        let assist = Assistant::new(&self.host, &self.code, id);
        assist.note_channel_info(msg);
        assist.run_function("onStartup", msg, None);
        self.assistants.lock().insert(id.to_string(), Arc::clone(&assist));
        Some(assist)
    }

    fn remove(&self, id: &str) -> Option<Arc<Assistant>> {
        self.assistants.lock().remove(id)
    }

    /// Install the bus relays driving the assistants.
    pub fn install(self: &Arc<Self>, track: &str) {
        let bus = self.host.bus();
        let relay = |mgr: &Arc<AssistManager>,
                     event: fn(&AssistManager, &str, &MessageRef) -> bool| {
            let mgr = Arc::clone(mgr);
            Arc::new(move |msg: &MessageRef| {
                let id = match msg.lock().param("id") {
                    Some(id) => id.to_string(),
                    None => return false,
                };
                event(&mgr, &id, msg)
            }) as tandem_core::HandlerFn
        };

        bus.install("call.preroute", self.priority, None, Some(track.to_string()),
            relay(self, |mgr, id, msg| {
                mgr.get_or_create(id, msg, true)
                    .map(|a| a.run_function("onPreroute", msg, None))
                    .unwrap_or(false)
            }));
        bus.install("call.route", self.priority, None, Some(track.to_string()),
            relay(self, |mgr, id, msg| {
                mgr.get_or_create(id, msg, true).map(|a| a.msg_route(msg)).unwrap_or(false)
            }));
        bus.install("call.execute", self.priority, None, Some(track.to_string()),
            relay(self, |mgr, id, msg| {
                if let Some(a) = mgr.get_or_create(id, msg, false) {
                    a.note_channel_info(msg);
                    a.run_function("onExecute", msg, None);
                }
                false
            }));
        bus.install("call.ringing", self.priority, None, Some(track.to_string()),
            relay(self, |mgr, id, msg| {
                mgr.get_or_create(id, msg, false)
                    .map(|a| a.run_function("onRinging", msg, None))
                    .unwrap_or(false)
            }));
        bus.install("call.answered", self.priority, None, Some(track.to_string()),
            relay(self, |mgr, id, msg| {
                mgr.get_or_create(id, msg, false)
                    .map(|a| {
                        a.answered.store(true, Ordering::Release);
                        *a.status.lock() = "answered".to_string();
                        a.run_function("onAnswered", msg, None)
                    })
                    .unwrap_or(false)
            }));
        bus.install("chan.disconnected", self.priority, None, Some(track.to_string()),
            relay(self, |mgr, id, msg| {
                mgr.get_or_create(id, msg, false).map(|a| a.msg_disconnect(msg)).unwrap_or(false)
            }));
        bus.install("chan.hangup", self.priority, None, Some(track.to_string()),
            relay(self, |mgr, id, msg| {
                if let Some(a) = mgr.remove(id) {
                    a.raise_state(AssistState::Hangup);
                    *a.status.lock() = "hangup".to_string();
                    a.run_function("onHangup", msg, None);
                    a.unload();
                }
                false
            }));

        // call.execute observers run after the dispatch settles.
        let mgr = Arc::clone(self);
        let post: PostHook = Arc::new(move |msg: &MessageRef, handled: bool| {
            if msg.lock().name() != "call.execute" {
                return;
            }
            let Some(id) = msg.lock().param("id").map(str::to_string) else {
                return;
            };
            if let Some(a) = mgr.assistant(&id) {
                a.run_function("onPostExecute", msg, Some(handled));
            }
        });
        bus.add_post_hook(post);
    }
}

#[cfg(test)]
#[path = "assist_tests.rs"]
mod tests;
