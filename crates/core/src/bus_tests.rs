// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::message::Message;

fn counter_handler(hits: &Arc<AtomicUsize>, result: bool) -> HandlerFn {
    let hits = Arc::clone(hits);
    Arc::new(move |_msg| {
        hits.fetch_add(1, Ordering::AcqRel);
        result
    })
}

#[test]
fn dispatch_stops_at_first_consumer() {
    let bus = MessageBus::new();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    bus.install("call.route", 10, None, None, counter_handler(&first, true));
    bus.install("call.route", 20, None, None, counter_handler(&second, true));
    let handled = bus.dispatch(&Message::new("call.route", false).into_ref());
    assert!(handled);
    assert_eq!(first.load(Ordering::Acquire), 1);
    assert_eq!(second.load(Ordering::Acquire), 0);
}

#[test]
fn dispatch_respects_priority_order() {
    let bus = MessageBus::new();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    for (prio, tag) in [(50u32, "late"), (5, "early"), (20, "mid")] {
        let order = Arc::clone(&order);
        bus.install(
            "test.order",
            prio,
            None,
            None,
            Arc::new(move |_| {
                order.lock().push(tag);
                false
            }),
        );
    }
    assert!(!bus.dispatch(&Message::new("test.order", false).into_ref()));
    assert_eq!(*order.lock(), vec!["early", "mid", "late"]);
}

#[test]
fn broadcast_reaches_all_handlers() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicUsize::new(0));
    bus.install("engine.halt", 10, None, None, counter_handler(&hits, true));
    bus.install("engine.halt", 20, None, None, counter_handler(&hits, true));
    assert!(bus.dispatch(&Message::new("engine.halt", true).into_ref()));
    assert_eq!(hits.load(Ordering::Acquire), 2);
}

#[test]
fn literal_filter_blocks_mismatch() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicUsize::new(0));
    bus.install(
        "call.route",
        10,
        Some(MessageFilter::literal("driver", "sip")),
        None,
        counter_handler(&hits, true),
    );
    let mut msg = Message::new("call.route", false);
    msg.set_param("driver", "h323");
    assert!(!bus.dispatch(&msg.into_ref()));
    assert_eq!(hits.load(Ordering::Acquire), 0);

    let mut msg = Message::new("call.route", false);
    msg.set_param("driver", "sip");
    assert!(bus.dispatch(&msg.into_ref()));
    assert_eq!(hits.load(Ordering::Acquire), 1);
}

#[test]
fn regex_filter_matches_pattern() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicUsize::new(0));
    bus.install(
        "chan.hangup",
        10,
        Some(MessageFilter::pattern("id", Regex::new("^sip/").unwrap())),
        None,
        counter_handler(&hits, true),
    );
    let mut msg = Message::new("chan.hangup", false);
    msg.set_param("id", "sip/42");
    assert!(bus.dispatch(&msg.into_ref()));

    let mut msg = Message::new("chan.hangup", false);
    msg.set_param("id", "iax/42");
    assert!(!bus.dispatch(&msg.into_ref()));
    assert_eq!(hits.load(Ordering::Acquire), 1);
}

#[test]
fn filter_requires_the_parameter() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicUsize::new(0));
    bus.install(
        "call.route",
        10,
        Some(MessageFilter::literal("driver", "sip")),
        None,
        counter_handler(&hits, true),
    );
    assert!(!bus.dispatch(&Message::new("call.route", false).into_ref()));
    assert_eq!(hits.load(Ordering::Acquire), 0);
}

#[test]
fn uninstall_by_id_and_track() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let id = bus.install("a", 10, None, None, counter_handler(&hits, true));
    bus.install("b", 10, None, Some("probe".into()), counter_handler(&hits, true));
    bus.install("c", 10, None, Some("probe".into()), counter_handler(&hits, true));
    assert!(bus.uninstall(id));
    assert!(!bus.uninstall(id));
    assert_eq!(bus.uninstall_tracked("probe"), 2);
    assert!(bus.handlers(None).is_empty());
}

#[test]
fn handlers_lists_with_pattern() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicUsize::new(0));
    bus.install("call.route", 80, None, Some("js".into()), counter_handler(&hits, false));
    bus.install("engine.timer", 90, None, None, counter_handler(&hits, false));
    let all = bus.handlers(None);
    assert_eq!(all.len(), 2);
    let only_call = bus.handlers(Some(&Regex::new("^call").unwrap()));
    assert_eq!(only_call.len(), 1);
    assert_eq!(only_call[0].message, "call.route");
    assert_eq!(only_call[0].priority, 80);
    assert_eq!(only_call[0].track.as_deref(), Some("js"));
}

#[test]
fn post_hook_sees_handled_flag() {
    let bus = MessageBus::new();
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.add_post_hook(Arc::new(move |msg, handled| {
        sink.lock().push((msg.lock().name().to_string(), handled));
    }));
    let hits = Arc::new(AtomicUsize::new(0));
    bus.install("call.execute", 10, None, None, counter_handler(&hits, true));
    bus.dispatch(&Message::new("call.execute", false).into_ref());
    bus.dispatch(&Message::new("call.other", false).into_ref());
    assert_eq!(
        *seen.lock(),
        vec![("call.execute".to_string(), true), ("call.other".to_string(), false)]
    );
}

#[test]
fn enqueue_then_dequeue_in_order() {
    let bus = MessageBus::new();
    bus.enqueue(Message::new("first", false).into_ref());
    bus.enqueue(Message::new("second", false).into_ref());
    assert_eq!(bus.queued(), 2);
    let a = bus.dequeue_wait(Duration::from_millis(10)).unwrap();
    assert_eq!(a.lock().name(), "first");
    let b = bus.dequeue_wait(Duration::from_millis(10)).unwrap();
    assert_eq!(b.lock().name(), "second");
    assert!(bus.dequeue_wait(Duration::from_millis(1)).is_none());
}

#[test]
fn handler_can_install_another_handler() {
    let bus = MessageBus::new();
    let inner_bus = Arc::clone(&bus);
    let hits = Arc::new(AtomicUsize::new(0));
    let inner_hits = Arc::clone(&hits);
    bus.install(
        "boot",
        10,
        None,
        None,
        Arc::new(move |_| {
            inner_bus.install("late", 10, None, None, counter_handler(&inner_hits, true));
            true
        }),
    );
    assert!(bus.dispatch(&Message::new("boot", false).into_ref()));
    assert!(bus.dispatch(&Message::new("late", false).into_ref()));
    assert_eq!(hits.load(Ordering::Acquire), 1);
}
