// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The script binding surface.
//!
//! `install_bindings` turns a fresh context into a full scripting
//! environment: the language built-ins plus the host-facing objects.

use std::sync::Arc;

use tandem_script::ScriptContext;

use crate::host::EngineHost;
use crate::timer::TimerWorker;

pub mod channel;
pub mod config;
pub mod dns;
pub mod dump;
pub mod engine;
pub mod file;
pub mod hasher;
pub mod message;
pub mod semaphore;
pub mod uri;
pub mod xml;

/// Install everything except `Channel` (which is per-assistant) into a
/// context. The returned timer worker must live as long as the context;
/// dropping it retires the context's scheduler thread.
pub fn install_bindings(host: &Arc<EngineHost>, ctx: &Arc<ScriptContext>) -> Arc<TimerWorker> {
    tandem_script::stdlib::install(ctx);
    let timer = engine::install_engine(host, ctx);
    message::install_message(host, ctx);
    config::install_config(host, ctx);
    file::install_file(ctx);
    xml::install_xml(ctx);
    dns::install_dns(ctx);
    hasher::install_hasher(ctx);
    uri::install_uri(ctx);
    semaphore::install_semaphore(ctx);
    timer
}
