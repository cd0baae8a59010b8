//! Asynchronous dispatch specs
//!
//! `Message.dispatch(true)` pauses the runner exactly once and resumes it
//! with the bus verdict; the message stays readable afterwards.

use std::sync::Arc;

use tandem_core::MessageRef;
use tandem_engine::{install_bindings, EngineConfig, EngineHost};
use tandem_script::{RunState, Runner, ScriptContext, ScriptParser, Value};

struct World {
    host: Arc<EngineHost>,
    ctx: Arc<ScriptContext>,
    #[allow(dead_code)]
    timer: Arc<tandem_engine::TimerWorker>,
}

fn world() -> World {
    let host = EngineHost::new(EngineConfig::default());
    let ctx = ScriptContext::new();
    let timer = install_bindings(&host, &ctx);
    World { host, ctx, timer }
}

fn runner(world: &World, src: &str) -> Runner {
    let parsed = ScriptParser::new().parse_source(src, "spec.js").unwrap();
    Runner::new(parsed.code, Arc::clone(&world.ctx), "spec")
}

#[test]
fn async_dispatch_pauses_once_and_reports_handler_verdict() {
    let world = world();
    world.host.bus().install(
        "foo",
        50,
        None,
        None,
        Arc::new(|m: &MessageRef| m.lock().param("param") == Some("42")),
    );
    let mut r = runner(
        &world,
        "var m = new Message(\"foo\"); m.param = 42; var ok = m.dispatch(true); \
         result = ok; kept = m.param; named = m.name();",
    );

    // Running -> Incomplete (one pending work-item) -> Running -> done.
    assert_eq!(r.execute(), RunState::Incomplete);
    assert_eq!(r.service_async(), 1);
    assert_eq!(r.execute(), RunState::Succeeded);

    assert_eq!(world.ctx.get_global("result"), Value::Bool(true));
    assert_eq!(world.ctx.get_global("kept"), Value::str("42"));
    assert_eq!(world.ctx.get_global("named"), Value::str("foo"));
}

#[test]
fn async_dispatch_without_handler_is_false() {
    let world = world();
    let mut r = runner(&world, "result = new Message(\"nobody.home\").dispatch(true);");
    assert_eq!(r.run(), RunState::Succeeded);
    assert_eq!(world.ctx.get_global("result"), Value::Bool(false));
}

#[test]
fn filtered_handler_never_sees_mismatches() {
    let world = world();
    let mut r = runner(
        &world,
        "hits = 0; \
         Message.install(function (m) { hits = hits + 1; return true; }, \"sel\", 50, \"driver\", \"sip\"); \
         var a = new Message(\"sel\"); a.driver = \"sip\"; first = a.dispatch(); \
         var b = new Message(\"sel\"); b.driver = \"h323\"; second = b.dispatch(); \
         var c = new Message(\"sel\"); third = c.dispatch();",
    );
    assert_eq!(r.run(), RunState::Succeeded);
    assert_eq!(world.ctx.get_global("first"), Value::Bool(true));
    assert_eq!(world.ctx.get_global("second"), Value::Bool(false));
    assert_eq!(world.ctx.get_global("third"), Value::Bool(false));
    assert_eq!(world.ctx.get_global("hits"), Value::Int(1));
}

#[test]
fn semaphore_wait_is_a_suspension_point() {
    let world = world();
    let mut r = runner(
        &world,
        "var s = new Semaphore(1); result = s.wait(100) + \"/\" + s.wait(5);",
    );
    assert_eq!(r.execute(), RunState::Incomplete);
    assert_eq!(r.service_async(), 1);
    assert_eq!(r.execute(), RunState::Incomplete);
    assert_eq!(r.service_async(), 1);
    assert_eq!(r.execute(), RunState::Succeeded);
    assert_eq!(world.ctx.get_global("result"), Value::str("true/false"));
}
