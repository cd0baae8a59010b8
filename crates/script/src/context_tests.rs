// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serial_test::serial;

use super::*;

#[test]
fn contexts_have_distinct_ids() {
    let a = ScriptContext::new();
    let b = ScriptContext::new();
    assert_ne!(a.id(), b.id());
}

#[test]
fn globals_are_per_context() {
    let a = ScriptContext::new();
    let b = ScriptContext::new();
    a.set_global("x", Value::Int(1));
    assert_eq!(a.get_global("x"), Value::Int(1));
    assert_eq!(b.get_global("x"), Value::Undefined);
}

#[test]
#[serial]
fn tracking_counts_creation_sites() {
    enable_tracking(true);
    let ctx = ScriptContext::new();
    let kept: Vec<_> = (0..3).map(|_| ctx.make_object_at(ObjKind::Plain, 7, "route.js:7")).collect();
    let dropped = ctx.make_object_at(ObjKind::Plain, 9, "route.js:9");
    assert_eq!(ctx.tracker().count("route.js:7"), 3);
    assert_eq!(ctx.tracker().count("route.js:9"), 1);
    drop(dropped);
    assert_eq!(ctx.tracker().count("route.js:9"), 0);
    assert_eq!(ctx.tracker().total(), 3);
    let top = ctx.tracker().top(1);
    assert_eq!(top[0].0, "route.js:7");
    assert_eq!(top[0].1, 3);
    drop(kept);
    enable_tracking(false);
}

#[test]
#[serial]
fn tracking_disabled_records_nothing() {
    enable_tracking(false);
    let ctx = ScriptContext::new();
    let _o = ctx.make_object_at(ObjKind::Plain, 1, "x.js:1");
    assert_eq!(ctx.tracker().total(), 0);
}

#[test]
fn array_from_builds_dense_arrays() {
    let ctx = ScriptContext::new();
    let arr = ctx.array_from(vec![Value::Int(1), Value::str("two")]);
    assert_eq!(arr.length(), 2);
    assert_eq!(arr.get("0"), Value::Int(1));
    assert_eq!(arr.get("1"), Value::str("two"));
}

#[test]
fn adopt_deep_copies_foreign_objects() {
    let home = ScriptContext::new();
    let away = ScriptContext::new();
    let foreign = away.make_object();
    foreign.set("k", Value::Int(1));

    let adopted = home.adopt(&Value::Object(foreign.clone()));
    let local = adopted.as_object().unwrap();
    assert!(!std::sync::Arc::ptr_eq(local, &foreign));
    assert_eq!(local.context_id(), home.id());

    // Same-context values pass through untouched.
    let own = home.make_object();
    let same = home.adopt(&Value::Object(own.clone()));
    assert!(std::sync::Arc::ptr_eq(same.as_object().unwrap(), &own));
}
