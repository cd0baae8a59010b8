// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message dispatcher.
//!
//! Handlers are installed per message name with a priority and an optional
//! parameter filter (literal or regex). Dispatch walks matching handlers in
//! ascending priority order until one consumes the message, then runs the
//! post-dispatch hooks. Enqueued messages either land in a matching
//! threaded queue hook or in the main queue drained by the engine's pump.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};
use regex::Regex;
use tracing::{debug, trace};

use crate::message::{Message, MessageRef};
use crate::queue::QueueHook;

/// Identity of an installed handler, for targeted uninstall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Parameter filter attached to a handler.
#[derive(Debug, Clone)]
pub struct MessageFilter {
    pub param: String,
    pub value: FilterValue,
}

#[derive(Debug, Clone)]
pub enum FilterValue {
    Literal(String),
    Pattern(Regex),
}

impl MessageFilter {
    pub fn literal(param: &str, value: &str) -> MessageFilter {
        MessageFilter {
            param: param.to_string(),
            value: FilterValue::Literal(value.to_string()),
        }
    }

    pub fn pattern(param: &str, regex: Regex) -> MessageFilter {
        MessageFilter { param: param.to_string(), value: FilterValue::Pattern(regex) }
    }

    pub fn matches(&self, msg: &Message) -> bool {
        let Some(actual) = msg.param(&self.param) else {
            return false;
        };
        match &self.value {
            FilterValue::Literal(want) => want == actual,
            FilterValue::Pattern(re) => re.is_match(actual),
        }
    }
}

pub type HandlerFn = Arc<dyn Fn(&MessageRef) -> bool + Send + Sync>;
pub type PostHook = Arc<dyn Fn(&MessageRef, bool) + Send + Sync>;

struct Handler {
    id: HandlerId,
    message: String,
    priority: u32,
    filter: Option<MessageFilter>,
    /// Diagnostic tag shown by `handlers()`.
    track: Option<String>,
    func: HandlerFn,
}

/// Summary of an installed handler, for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    pub id: HandlerId,
    pub message: String,
    pub priority: u32,
    pub track: Option<String>,
    pub filter_param: Option<String>,
}

#[derive(Default)]
pub struct MessageBus {
    next_id: AtomicU64,
    handlers: RwLock<Vec<Handler>>,
    post_hooks: RwLock<Vec<PostHook>>,
    queue: Mutex<VecDeque<MessageRef>>,
    queue_wakeup: Condvar,
    hooks: RwLock<Vec<Arc<QueueHook>>>,
}

impl MessageBus {
    pub fn new() -> Arc<MessageBus> {
        Arc::new(MessageBus::default())
    }

    /// Install a handler for `message`, returning its identity.
    pub fn install(
        &self,
        message: &str,
        priority: u32,
        filter: Option<MessageFilter>,
        track: Option<String>,
        func: HandlerFn,
    ) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::AcqRel) + 1);
        let mut handlers = self.handlers.write();
        let at = handlers
            .iter()
            .position(|h| h.priority > priority)
            .unwrap_or(handlers.len());
        handlers.insert(
            at,
            Handler { id, message: message.to_string(), priority, filter, track, func },
        );
        debug!(message, priority, "installed message handler");
        id
    }

    pub fn uninstall(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| h.id != id);
        handlers.len() != before
    }

    /// Remove every handler whose tag matches `track`.
    pub fn uninstall_tracked(&self, track: &str) -> usize {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| h.track.as_deref() != Some(track));
        before - handlers.len()
    }

    /// Installed-handler summaries, optionally filtered by message name.
    pub fn handlers(&self, matching: Option<&Regex>) -> Vec<HandlerInfo> {
        self.handlers
            .read()
            .iter()
            .filter(|h| matching.map(|re| re.is_match(&h.message)).unwrap_or(true))
            .map(|h| HandlerInfo {
                id: h.id,
                message: h.message.clone(),
                priority: h.priority,
                track: h.track.clone(),
                filter_param: h.filter.as_ref().map(|f| f.param.clone()),
            })
            .collect()
    }

    /// Run a post-dispatch hook after every dispatch, with the handled flag.
    pub fn add_post_hook(&self, hook: PostHook) {
        self.post_hooks.write().push(hook);
    }

    /// Synchronously deliver the message. Returns the handled flag.
    pub fn dispatch(&self, msg: &MessageRef) -> bool {
        let (name, broadcast) = {
            let m = msg.lock();
            (m.name().to_string(), m.broadcast())
        };
        trace!(message = %name, "dispatching");
        // Snapshot matching handlers so callbacks can install/uninstall
        // without deadlocking against the table lock.
        let matching: Vec<(HandlerId, Option<MessageFilter>, HandlerFn)> = self
            .handlers
            .read()
            .iter()
            .filter(|h| h.message == name)
            .map(|h| (h.id, h.filter.clone(), Arc::clone(&h.func)))
            .collect();
        let mut handled = false;
        for (_id, filter, func) in matching {
            if let Some(f) = &filter {
                if !f.matches(&msg.lock()) {
                    continue;
                }
            }
            if func(msg) {
                handled = true;
                if !broadcast {
                    break;
                }
            }
        }
        let post: Vec<PostHook> = self.post_hooks.read().iter().cloned().collect();
        for hook in post {
            hook(msg, handled);
        }
        handled
    }

    /// Hand the message over for asynchronous delivery.
    ///
    /// A matching threaded queue hook takes it first; otherwise it joins the
    /// main queue for the engine pump.
    pub fn enqueue(&self, msg: MessageRef) -> bool {
        {
            let hooks = self.hooks.read();
            if let Some(hook) = hooks.iter().find(|h| h.matches(&msg.lock())) {
                return hook.push(msg);
            }
        }
        self.queue.lock().push_back(msg);
        self.queue_wakeup.notify_one();
        true
    }

    /// Wait up to `timeout` for a queued message.
    pub fn dequeue_wait(&self, timeout: Duration) -> Option<MessageRef> {
        let mut queue = self.queue.lock();
        if queue.is_empty() {
            self.queue_wakeup.wait_for(&mut queue, timeout);
        }
        queue.pop_front()
    }

    /// Queued messages not yet dispatched.
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    /// Attach a threaded queue hook.
    pub fn install_hook(&self, hook: Arc<QueueHook>) {
        self.hooks.write().push(hook);
    }

    /// Detach hooks by name (and matching filter value, when given); the
    /// workers of each removed hook are stopped. Returns how many matched.
    pub fn uninstall_hook(&self, name: &str, filter_value: Option<&str>) -> usize {
        let mut hooks = self.hooks.write();
        let mut removed = 0;
        hooks.retain(|h| {
            let gone = h.message() == name
                && filter_value.map(|v| h.filter_value() == Some(v)).unwrap_or(true);
            if gone {
                h.stop();
                removed += 1;
            }
            !gone
        });
        removed
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
