// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine host: process-wide state every binding hangs off.
//!
//! One [`EngineHost`] per process under normal operation. It owns the
//! message bus, the run-parameter block, lifecycle flags, call-admission
//! state and the paths configuration files resolve against. The host also
//! answers the config loader's `$enabled` probes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{info, warn};

use tandem_core::{Message, MessageBus, MessageRef};
use tandem_threads as threads;

/// Call-admission states scripts can read and set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptState {
    #[default]
    Accept,
    Partial,
    Congestion,
    Reject,
}

impl AcceptState {
    pub fn parse(s: &str) -> Option<AcceptState> {
        Some(match s {
            "accept" => AcceptState::Accept,
            "partial" => AcceptState::Partial,
            "congestion" => AcceptState::Congestion,
            "reject" => AcceptState::Reject,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            AcceptState::Accept => "accept",
            AcceptState::Partial => "partial",
            AcceptState::Congestion => "congestion",
            AcceptState::Reject => "reject",
        }
    }
}

/// Static host configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub config_dir: PathBuf,
    pub user_dir: PathBuf,
    pub script_dir: PathBuf,
    pub libs_dir: PathBuf,
    /// Permit `Engine.restart` / abort-on-failure behavior.
    pub allow_restart: bool,
    /// Permit scripts to log below the configuration band (debug aborts).
    pub allow_abort: bool,
    /// Permit `Engine.loadLibrary` / `Engine.loadObject`.
    pub allow_load: bool,
    /// Keep a previously loaded global script when its rebuild fails.
    pub keep_old_on_fail: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            config_dir: PathBuf::from("conf.d"),
            user_dir: PathBuf::from("."),
            script_dir: PathBuf::from("scripts"),
            libs_dir: PathBuf::from("scripts/libs"),
            allow_restart: false,
            allow_abort: false,
            allow_load: true,
            keep_old_on_fail: true,
        }
    }
}

pub struct EngineHost {
    config: EngineConfig,
    bus: Arc<MessageBus>,
    run_params: Mutex<IndexMap<String, String>>,
    plugins: Mutex<Vec<String>>,
    started: AtomicBool,
    exiting: AtomicBool,
    accepting: Mutex<AcceptState>,
    start: Instant,
    restart_request: Mutex<Option<(i64, bool)>>,
    pump: Mutex<Option<threads::ThreadHandle>>,
}

impl EngineHost {
    pub fn new(config: EngineConfig) -> Arc<EngineHost> {
        // Every run carries a unique identity for log correlation.
        let mut run_params = IndexMap::new();
        run_params.insert("runid".to_string(), uuid::Uuid::new_v4().to_string());
        Arc::new(EngineHost {
            config,
            bus: MessageBus::new(),
            run_params: Mutex::new(run_params),
            plugins: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            exiting: AtomicBool::new(false),
            accepting: Mutex::new(AcceptState::Accept),
            start: Instant::now(),
            restart_request: Mutex::new(None),
            pump: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    // -- lifecycle ----------------------------------------------------------

    pub fn started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn set_started(&self) {
        self.started.store(true, Ordering::Release);
    }

    pub fn exiting(&self) -> bool {
        self.exiting.load(Ordering::Acquire)
    }

    pub fn set_exiting(&self) {
        self.exiting.store(true, Ordering::Release);
    }

    pub fn accepting(&self) -> AcceptState {
        *self.accepting.lock()
    }

    pub fn set_accepting(&self, state: AcceptState) {
        *self.accepting.lock() = state;
    }

    /// Seconds since the host came up.
    pub fn uptime(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record a restart request; honored only when the host allows it.
    pub fn request_restart(&self, code: i64, graceful: bool) -> bool {
        if !self.config.allow_restart {
            warn!("script restart request denied");
            return false;
        }
        info!(code, graceful, "restart requested");
        *self.restart_request.lock() = Some((code, graceful));
        self.exiting.store(true, Ordering::Release);
        true
    }

    pub fn restart_requested(&self) -> Option<(i64, bool)> {
        *self.restart_request.lock()
    }

    // -- run parameters and plugins -----------------------------------------

    pub fn run_param(&self, name: &str) -> Option<String> {
        self.run_params.lock().get(name).cloned()
    }

    pub fn set_run_param(&self, name: &str, value: &str) {
        self.run_params.lock().insert(name.to_string(), value.to_string());
    }

    pub fn run_params(&self) -> IndexMap<String, String> {
        self.run_params.lock().clone()
    }

    pub fn plugin_loaded(&self, name: &str) -> bool {
        self.plugins.lock().iter().any(|p| p == name)
    }

    pub fn register_plugin(&self, name: &str) {
        let mut plugins = self.plugins.lock();
        if !plugins.iter().any(|p| p == name) {
            plugins.push(name.to_string());
        }
    }

    // -- configuration paths ------------------------------------------------

    /// Resolve a configuration file name against the host directories.
    pub fn config_file(&self, name: &str, user: bool) -> PathBuf {
        let base: &Path = if user { &self.config.user_dir } else { &self.config.config_dir };
        let mut file = name.to_string();
        if !file.ends_with(".conf") {
            file.push_str(".conf");
        }
        base.join(file)
    }

    // -- messaging ----------------------------------------------------------

    pub fn dispatch(&self, msg: &MessageRef) -> bool {
        self.bus.dispatch(msg)
    }

    pub fn enqueue(&self, msg: MessageRef) -> bool {
        self.bus.enqueue(msg)
    }

    /// Build and synchronously dispatch a simple named message.
    pub fn notify(&self, name: &str, params: &[(&str, &str)]) -> bool {
        let mut msg = Message::new(name, false);
        for (k, v) in params {
            msg.set_param(k, v);
        }
        self.bus.dispatch(&msg.into_ref())
    }

    /// Start the queue pump draining enqueued messages on its own thread.
    pub fn start_pump(self: &Arc<Self>) {
        let mut pump = self.pump.lock();
        if pump.is_some() {
            return;
        }
        let host = Arc::clone(self);
        let handle = threads::create("EnginePump", threads::Priority::Normal, move || loop {
            if threads::check() || host.exiting() {
                return;
            }
            let wait = Duration::from_millis(threads::idle_msec());
            if let Some(msg) = host.bus.dequeue_wait(wait) {
                host.bus.dispatch(&msg);
            }
        });
        match handle {
            Ok(h) => *pump = Some(h),
            Err(e) => warn!(error = %e, "queue pump failed to start"),
        }
    }

    /// Stop the pump and every registry thread; bounded two-phase shutdown.
    pub fn shutdown(&self) {
        self.set_exiting();
        threads::shutdown_all();
        *self.pump.lock() = None;
    }
}

impl tandem_config::ConfigContext for EngineHost {
    fn plugin_loaded(&self, name: &str) -> bool {
        EngineHost::plugin_loaded(self, name)
    }

    fn run_param(&self, name: &str) -> Option<String> {
        EngineHost::run_param(self, name)
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
