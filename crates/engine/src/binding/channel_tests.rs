// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;

use crate::assist::AssistManager;
use crate::host::{EngineConfig, EngineHost};
use tandem_core::{Message, MessageRef};
use tandem_script::ScriptParser;

fn manager(script: &str) -> (Arc<EngineHost>, Arc<AssistManager>) {
    let host = EngineHost::new(EngineConfig::default());
    let parsed = ScriptParser::new().parse_source(script, "chan.js").unwrap();
    let mgr = AssistManager::new(&host, parsed.code, 80);
    mgr.install("js");
    (host, mgr)
}

fn route(host: &Arc<EngineHost>, id: &str) -> MessageRef {
    let mut msg = Message::new("call.route", false);
    msg.set_param("id", id);
    msg.set_param("direction", "incoming");
    let msg = msg.into_ref();
    host.bus().dispatch(&msg);
    msg
}

fn execute(host: &Arc<EngineHost>, id: &str, peer: Option<&str>) {
    let mut msg = Message::new("call.execute", false);
    msg.set_param("id", id);
    if let Some(peer) = peer {
        msg.set_param("peerid", peer);
    }
    host.bus().dispatch(&msg.into_ref());
}

fn next_queued(host: &Arc<EngineHost>) -> MessageRef {
    host.bus().dequeue_wait(Duration::from_millis(100)).unwrap()
}

#[test]
#[serial]
fn identity_accessors() {
    let (host, mgr) = manager(
        "function onRoute(msg) { \
            ident = Channel.id(); dir = Channel.direction(); was = Channel.answered(); \
            return Channel.callTo(\"sip/x\"); }",
    );
    route(&host, "ch-a");
    let ctx = Arc::clone(mgr.assistant("ch-a").unwrap().context());
    assert_eq!(ctx.get_global("ident").to_display(), "ch-a");
    assert_eq!(ctx.get_global("dir").to_display(), "incoming");
    assert!(!ctx.get_global("was").to_bool());
}

#[test]
#[serial]
fn peer_id_follows_the_executing_leg() {
    let (host, mgr) = manager("function onRoute(msg) { return Channel.callTo(\"sip/x\"); }");
    route(&host, "ch-b");
    execute(&host, "ch-b", Some("sip/77"));
    assert_eq!(mgr.assistant("ch-b").unwrap().peer_id().as_deref(), Some("sip/77"));
}

#[test]
#[serial]
fn answer_enqueues_call_answered() {
    let (host, _mgr) = manager(
        "function onRoute(msg) { return Channel.callTo(\"sip/x\"); } \
         function onExecute(msg) { Channel.answer(); }",
    );
    route(&host, "ch-c");
    execute(&host, "ch-c", Some("sip/88"));
    let queued = next_queued(&host);
    let queued = queued.lock();
    assert_eq!(queued.name(), "call.answered");
    assert_eq!(queued.param("id"), Some("ch-c"));
    assert_eq!(queued.param("targetid"), Some("sip/88"));
}

#[test]
#[serial]
fn play_and_record_enqueue_attach_messages() {
    let (host, _mgr) = manager(
        "function onRoute(msg) { return Channel.callTo(\"sip/x\"); } \
         function onExecute(msg) { \
            Channel.playFile(\"welcome.au\"); \
            Channel.recFile(\"inbox/1.au\", 60000); }",
    );
    route(&host, "ch-e");
    execute(&host, "ch-e", None);

    let play = next_queued(&host);
    assert_eq!(play.lock().name(), "chan.attach");
    assert_eq!(play.lock().param("source"), Some("wave/play/welcome.au"));
    let rec = next_queued(&host);
    assert_eq!(rec.lock().name(), "chan.attach");
    assert_eq!(rec.lock().param("consumer"), Some("wave/record/inbox/1.au"));
    assert_eq!(rec.lock().param("maxlen"), Some("60000"));
}

#[test]
#[serial]
fn hangup_peer_targets_the_peer_leg() {
    let (host, _mgr) = manager(
        "function onRoute(msg) { return Channel.callTo(\"sip/x\"); } \
         function onExecute(msg) { Channel.hangup(\"done\", undefined, true); }",
    );
    route(&host, "ch-f");
    execute(&host, "ch-f", Some("sip/99"));
    let drop_msg = next_queued(&host);
    let drop_msg = drop_msg.lock();
    assert_eq!(drop_msg.name(), "call.drop");
    assert_eq!(drop_msg.param("id"), Some("sip/99"));
    assert_eq!(drop_msg.param("reason"), Some("done"));
}

#[test]
#[serial]
fn call_to_without_target_fails_soft() {
    let (host, mgr) = manager(
        "function onRoute(msg) { routed = Channel.callTo(\"\"); return routed; }",
    );
    let msg = route(&host, "ch-g");
    assert!(!host.bus().dispatch(&msg));
    let ctx = Arc::clone(mgr.assistant("ch-g").unwrap().context());
    assert!(!ctx.get_global("routed").to_bool());
}
