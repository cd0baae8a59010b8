// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the binding tests.

use std::sync::Arc;

use tandem_script::{RunState, Runner, ScriptContext, ScriptParser, Value};

use crate::binding::install_bindings;
use crate::host::{EngineConfig, EngineHost};
use crate::timer::TimerWorker;

pub(crate) struct Fixture {
    pub host: Arc<EngineHost>,
    pub ctx: Arc<ScriptContext>,
    #[allow(dead_code)]
    pub timer: Arc<TimerWorker>,
}

pub(crate) fn fixture() -> Fixture {
    fixture_with(EngineConfig::default())
}

pub(crate) fn fixture_with(config: EngineConfig) -> Fixture {
    // Surface tracing output when a test runs with RUST_LOG set.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let host = EngineHost::new(config);
    let ctx = ScriptContext::new();
    let timer = install_bindings(&host, &ctx);
    Fixture { host, ctx, timer }
}

/// Run a source snippet in the fixture context to completion.
pub(crate) fn run(fx: &Fixture, src: &str) -> RunState {
    let parsed = ScriptParser::new().parse_source(src, "fixture.js").unwrap();
    let mut runner = Runner::new(parsed.code, Arc::clone(&fx.ctx), "fixture");
    runner.run()
}

/// Run a snippet and read back its `result` global.
pub(crate) fn eval(fx: &Fixture, src: &str) -> Value {
    let state = run(fx, src);
    assert_eq!(state, RunState::Succeeded, "script failed: {}", src);
    fx.ctx.get_global("result")
}
