//! Call-routing specs
//!
//! A routing script answers `call.route` events through the assistant
//! state machine.

use std::sync::Arc;

use serial_test::serial;

use tandem_core::{Message, MessageRef};
use tandem_engine::{AssistManager, AssistState, EngineConfig, EngineHost};
use tandem_script::ScriptParser;

fn setup(script: &str) -> (Arc<EngineHost>, Arc<AssistManager>) {
    let host = EngineHost::new(EngineConfig::default());
    let parsed = ScriptParser::new().parse_source(script, "route.js").unwrap();
    let mgr = AssistManager::new(&host, parsed.code, 80);
    mgr.install("js");
    (host, mgr)
}

fn route_event(id: &str, caller: &str) -> MessageRef {
    let mut msg = Message::new("call.route", false);
    msg.set_param("id", id);
    msg.set_param("caller", caller);
    msg.into_ref()
}

#[test]
#[serial]
fn route_with_channel_call_to() {
    let (host, mgr) = setup(
        "function onRoute(msg) { return Channel.callTo(\"sip/alice\"); }",
    );
    let msg = route_event("ch-1", "bob");
    let handled = host.bus().dispatch(&msg);

    assert!(handled);
    assert_eq!(msg.lock().ret_value(), "sip/alice");
    // The assistant went through Routing and now waits for a re-route.
    assert_eq!(mgr.assistant("ch-1").map(|a| a.state()), Some(AssistState::ReRoute));
}

#[test]
#[serial]
fn routing_consults_message_parameters() {
    let (host, _mgr) = setup(
        "function onRoute(msg) { \
            if (msg.caller == \"bob\") return Channel.callTo(\"sip/\" + msg.caller); \
            return false; }",
    );
    let vip = route_event("ch-2", "bob");
    assert!(host.bus().dispatch(&vip));
    assert_eq!(vip.lock().ret_value(), "sip/bob");

    let other = route_event("ch-3", "mallory");
    assert!(!host.bus().dispatch(&other));
    assert_eq!(other.lock().ret_value(), "");
}

#[test]
#[serial]
fn one_assistant_per_channel() {
    let (host, mgr) = setup("function onRoute(msg) { return false; }");
    host.bus().dispatch(&route_event("ch-4", "a"));
    host.bus().dispatch(&route_event("ch-4", "a"));
    host.bus().dispatch(&route_event("ch-5", "b"));
    assert_eq!(mgr.count(), 2);
}

#[test]
#[serial]
fn hangup_retires_the_assistant() {
    let (host, mgr) = setup("function onRoute(msg) { return Channel.callTo(\"sip/x\"); }");
    host.bus().dispatch(&route_event("ch-6", "a"));
    assert_eq!(mgr.count(), 1);
    let mut hangup = Message::new("chan.hangup", false);
    hangup.set_param("id", "ch-6");
    host.bus().dispatch(&hangup.into_ref());
    assert_eq!(mgr.count(), 0);
}
