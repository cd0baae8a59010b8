//! Timed-callback specs
//!
//! `setInterval` clamps below the runtime idle interval and `clearInterval`
//! before the first firing means zero invocations.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serial_test::serial;

use tandem_engine::{install_bindings, EngineConfig, EngineHost, TimerWorker};
use tandem_script::{RunState, Runner, ScriptContext, ScriptParser, Value};

fn eval(src: &str) -> (Arc<ScriptContext>, Arc<TimerWorker>) {
    let host = EngineHost::new(EngineConfig::default());
    let ctx = ScriptContext::new();
    let timer = install_bindings(&host, &ctx);
    let parsed = ScriptParser::new().parse_source(src, "timer.js").unwrap();
    let mut runner = Runner::new(parsed.code, Arc::clone(&ctx), "timer");
    assert_eq!(runner.run(), RunState::Succeeded);
    (ctx, timer)
}

fn wait_for(cond: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

fn settle() {
    // Give a retiring scheduler thread time to unregister.
    let _ = wait_for(|| tandem_threads::count() == 0, Duration::from_secs(2));
}

#[test]
#[serial]
fn interval_drift_is_capped_by_the_minimum() {
    let (ctx, timer) = eval(
        "ticks = 0; Engine.setInterval(function () { ticks = ticks + 1; }, 1);",
    );
    std::thread::sleep(Duration::from_millis(300));
    let observed = ctx.get_global("ticks").to_int();
    let ceiling = 300 / tandem_threads::idle_msec() as i64 + 2;
    assert!(observed >= 1, "interval never fired");
    assert!(observed <= ceiling, "fired {} times, ceiling {}", observed, ceiling);
    drop(timer);
    settle();
}

#[test]
#[serial]
fn cleared_interval_never_fires() {
    let (ctx, timer) = eval(
        "fired = 0; var h = Engine.setInterval(function () { fired = 1; }, 100); \
         cleared = Engine.clearInterval(h);",
    );
    assert_eq!(ctx.get_global("cleared"), Value::Bool(true));
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(ctx.get_global("fired").to_int(), 0);
    drop(timer);
    settle();
}

#[test]
#[serial]
fn timeout_fires_exactly_once_with_arguments() {
    let (ctx, timer) = eval(
        "notes = \"\"; Engine.setTimeout(function (tag) { notes += tag; }, 10, \"ding\");",
    );
    assert!(wait_for(|| ctx.get_global("notes").to_display() == "ding", Duration::from_secs(2)));
    std::thread::sleep(Duration::from_millis(40));
    assert_eq!(ctx.get_global("notes"), Value::str("ding"));
    drop(timer);
    settle();
}

#[test]
#[serial]
fn interval_and_timeout_handles_do_not_cross() {
    let (ctx, timer) = eval(
        "var t = Engine.setTimeout(function () {}, 5000); \
         var i = Engine.setInterval(function () {}, 5000); \
         a = Engine.clearInterval(t); b = Engine.clearTimeout(i); \
         c = Engine.clearTimeout(t); d = Engine.clearInterval(i);",
    );
    assert_eq!(ctx.get_global("a"), Value::Bool(false));
    assert_eq!(ctx.get_global("b"), Value::Bool(false));
    assert_eq!(ctx.get_global("c"), Value::Bool(true));
    assert_eq!(ctx.get_global("d"), Value::Bool(true));
    drop(timer);
    settle();
}
