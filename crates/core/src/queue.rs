// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Threaded message-queue hooks.
//!
//! A hook captures enqueued messages matching its name/filter into a private
//! channel drained by a pool of registry threads. An optional trap callback
//! fires once when the backlog first reaches the configured threshold.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use tandem_threads as threads;
use threads::Priority;

use crate::bus::MessageFilter;
use crate::message::{Message, MessageRef};

pub type ReceivedFn = Arc<dyn Fn(&MessageRef) + Send + Sync>;
pub type TrapFn = Arc<dyn Fn() + Send + Sync>;

pub struct QueueHook {
    message: String,
    filter: Option<MessageFilter>,
    sender: Mutex<Option<Sender<MessageRef>>>,
    receiver: Receiver<MessageRef>,
    trap: Option<(TrapFn, usize)>,
    trap_fired: AtomicBool,
    workers: Mutex<Vec<threads::ThreadHandle>>,
}

impl QueueHook {
    /// Build a hook and start its worker pool.
    pub fn start(
        message: &str,
        filter: Option<MessageFilter>,
        thread_count: usize,
        received: ReceivedFn,
        trap: Option<(TrapFn, usize)>,
    ) -> Arc<QueueHook> {
        let (tx, rx) = unbounded();
        let hook = Arc::new(QueueHook {
            message: message.to_string(),
            filter,
            sender: Mutex::new(Some(tx)),
            receiver: rx,
            trap,
            trap_fired: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        });
        let count = thread_count.max(1);
        let mut workers = hook.workers.lock();
        for i in 0..count {
            let rx = hook.receiver.clone();
            let received = Arc::clone(&received);
            let name = format!("MsgQueue:{}:{}", message, i);
            match threads::create(&name, Priority::Normal, move || {
                worker_loop(&rx, &received);
            }) {
                Ok(handle) => workers.push(handle),
                Err(e) => warn!(queue = message, error = %e, "queue worker failed to start"),
            }
        }
        drop(workers);
        hook
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn filter_value(&self) -> Option<&str> {
        match &self.filter {
            Some(MessageFilter { value: crate::bus::FilterValue::Literal(v), .. }) => {
                Some(v.as_str())
            }
            _ => None,
        }
    }

    pub fn matches(&self, msg: &Message) -> bool {
        msg.name() == self.message
            && self.filter.as_ref().map(|f| f.matches(msg)).unwrap_or(true)
    }

    /// Queue a message for the pool. Fails after `stop()`.
    pub fn push(&self, msg: MessageRef) -> bool {
        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            return false;
        };
        if tx.send(msg).is_err() {
            return false;
        }
        if let Some((trap, threshold)) = &self.trap {
            if tx.len() >= *threshold && !self.trap_fired.swap(true, Ordering::AcqRel) {
                debug!(queue = %self.message, threshold, "queue trap threshold reached");
                trap();
            }
        }
        true
    }

    /// Current backlog depth.
    pub fn depth(&self) -> usize {
        self.receiver.len()
    }

    /// Stop the pool: close the channel and cancel the workers.
    pub fn stop(&self) {
        *self.sender.lock() = None;
        for w in self.workers.lock().drain(..) {
            w.cancel(false);
        }
    }
}

fn worker_loop(rx: &Receiver<MessageRef>, received: &ReceivedFn) {
    loop {
        if threads::check() {
            return;
        }
        match rx.recv_timeout(Duration::from_millis(threads::idle_msec())) {
            Ok(msg) => {
                let _guard = threads::LockTracker::enter();
                received(&msg);
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
