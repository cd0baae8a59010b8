// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;
use crate::context::ScriptContext;
use crate::native::{native_fn, NativeOutcome};
use crate::parser::ScriptParser;

fn runner_for(src: &str) -> Runner {
    let parsed = ScriptParser::new().parse_source(src, "test.js").unwrap();
    let ctx = ScriptContext::new();
    crate::stdlib::install(&ctx);
    Runner::new(parsed.code, ctx, "test")
}

/// Run a script to completion and return its `result` global.
fn eval(src: &str) -> Value {
    let mut r = runner_for(src);
    assert_eq!(r.run(), RunState::Succeeded, "script failed: {}", src);
    r.context().get_global("result")
}

#[test]
fn arithmetic_and_variables() {
    assert_eq!(eval("var a = 2; var b = 3; result = a * b + 1;"), Value::Int(7));
    assert_eq!(eval("result = \"call/\" + 42;"), Value::str("call/42"));
    assert_eq!(eval("var x = 10; x += 5; result = x;"), Value::Int(15));
    assert_eq!(eval("var i = 3; result = i++ * 10 + i;"), Value::Int(34));
    assert_eq!(eval("var i = 3; result = ++i * 10 + i;"), Value::Int(44));
}

#[test]
fn control_flow() {
    assert_eq!(eval("if (1 < 2) result = \"yes\"; else result = \"no\";"), Value::str("yes"));
    assert_eq!(
        eval("var s = 0; for (var i = 1; i <= 10; i++) s += i; result = s;"),
        Value::Int(55)
    );
    assert_eq!(
        eval("var n = 0; while (n < 5) { n++; if (n == 3) continue; } result = n;"),
        Value::Int(5)
    );
    assert_eq!(
        eval("var n = 0; do { n++; } while (n < 4); result = n;"),
        Value::Int(4)
    );
    assert_eq!(
        eval("var s = 0; for (var i = 0; ; i++) { if (i == 4) break; s += i; } result = s;"),
        Value::Int(6)
    );
}

#[test]
fn ternary_and_short_circuit() {
    assert_eq!(eval("result = 5 > 3 ? \"a\" : \"b\";"), Value::str("a"));
    assert_eq!(eval("result = false && explode();"), Value::Bool(false));
    assert_eq!(eval("result = true || explode();"), Value::Bool(true));
    assert_eq!(eval("result = undefined || \"fallback\";"), Value::str("fallback"));
}

#[test]
fn functions_and_returns() {
    assert_eq!(
        eval("function add(a, b) { return a + b; } result = add(2, 40);"),
        Value::Int(42)
    );
    assert_eq!(
        eval("function f() { return; } result = f() === undefined;"),
        Value::Bool(true)
    );
    assert_eq!(
        eval("function f(a) { return a; } result = f();"),
        Value::Undefined
    );
    // Recursion
    assert_eq!(
        eval("function fib(n) { if (n < 2) return n; return fib(n-1) + fib(n-2); } result = fib(10);"),
        Value::Int(55)
    );
}

#[test]
fn function_expressions_capture_scope() {
    assert_eq!(
        eval(
            "function outer() { var base = 10; var f = function (n) { return base + n; }; return f(5); } result = outer();"
        ),
        Value::Int(15)
    );
}

#[test]
fn objects_and_arrays() {
    assert_eq!(eval("var o = { a: 1, b: { c: 2 } }; result = o.b.c;"), Value::Int(2));
    assert_eq!(eval("var a = [1, 2, 3]; result = a[1];"), Value::Int(2));
    assert_eq!(eval("var a = [1, 2, 3]; result = a.length;"), Value::Int(3));
    assert_eq!(eval("var o = {}; o[\"k\" + 1] = \"v\"; result = o.k1;"), Value::str("v"));
    assert_eq!(eval("var a = []; a.push(7); a.push(8); result = a.pop() + a.length;"), Value::Int(9));
}

#[test]
fn for_in_iterates_keys() {
    assert_eq!(
        eval("var o = { x: 1, y: 2, z: 3 }; var ks = \"\"; for (k in o) ks += k; result = ks;"),
        Value::str("xyz")
    );
    assert_eq!(
        eval("var a = [10, 20]; var s = 0; for (var i in a) s += a[i]; result = s;"),
        Value::Int(30)
    );
    assert_eq!(
        eval("var o = { a: 1, b: 2 }; var n = 0; for (k in o) { if (k == \"b\") break; n++; } result = n;"),
        Value::Int(1)
    );
}

#[test]
fn this_binding_in_methods() {
    assert_eq!(
        eval(
            "var o = { tag: \"pbx\" }; o.name = function () { return this.tag; }; result = o.name();"
        ),
        Value::str("pbx")
    );
}

#[test]
fn constructor_calls() {
    assert_eq!(
        eval(
            "function Call(id) { this.id = id; } var c = new Call(\"ch-9\"); result = c.id;"
        ),
        Value::str("ch-9")
    );
}

#[test]
fn typeof_operator() {
    assert_eq!(eval("result = typeof \"x\";"), Value::str("string"));
    assert_eq!(eval("result = typeof 1;"), Value::str("number"));
    assert_eq!(eval("result = typeof missing;"), Value::str("undefined"));
    assert_eq!(eval("function f() {} result = typeof f;"), Value::str("function"));
}

#[test]
fn missing_field_reads_undefined() {
    assert_eq!(eval("var o = {}; result = o.nothing === undefined;"), Value::Bool(true));
}

#[test]
fn calling_missing_method_pushes_undefined() {
    assert_eq!(eval("var o = {}; result = o.nothing2() === undefined;"), Value::Bool(true));
}

#[test]
fn null_dereference_fails_the_runner() {
    let mut r = runner_for("var x; var y = x.field;");
    assert_eq!(r.run(), RunState::Failed);
}

#[test]
fn calling_undefined_global_is_soft() {
    assert_eq!(eval("result = nothing_here() === undefined;"), Value::Bool(true));
}

#[test]
fn reset_reruns_top_level() {
    let mut r = runner_for("counter = counter + 1;");
    r.context().set_global("counter", Value::Int(0));
    assert_eq!(r.run(), RunState::Succeeded);
    r.reset(true);
    assert_eq!(r.run(), RunState::Succeeded);
    assert_eq!(r.context().get_global("counter"), Value::Int(2));
}

#[test]
fn call_invokes_a_defined_function() {
    let mut r = runner_for("function greet(who) { return \"hi \" + who; }");
    assert_eq!(r.run(), RunState::Succeeded);
    assert!(r.callable("greet"));
    assert!(!r.callable("missing"));
    assert_eq!(r.call("greet", vec![Value::str("ops")]), RunState::Succeeded);
    assert_eq!(r.pop_value(), Some(Value::str("hi ops")));
}

#[test]
fn call_of_unknown_function_fails() {
    let mut r = runner_for("var x = 1;");
    assert_eq!(r.run(), RunState::Succeeded);
    assert_eq!(r.call("ghost", vec![]), RunState::Failed);
}

#[test]
fn native_function_round_trip() {
    let mut r = runner_for("result = double(21);");
    r.context().set_global(
        "double",
        native_fn("double", |_r, _this, args| {
            NativeOutcome::Ret(Value::Int(args.first().map(Value::to_int).unwrap_or(0) * 2))
        }),
    );
    assert_eq!(r.run(), RunState::Succeeded);
    assert_eq!(r.context().get_global("result"), Value::Int(42));
}

#[test]
fn suspension_pauses_and_resumes_once_per_primitive() {
    let mut r = runner_for("result = wait(5) + wait(10);");
    let resumes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&resumes);
    r.context().set_global(
        "wait",
        native_fn("wait", move |_r, _this, args| {
            let n = args.first().map(Value::to_int).unwrap_or(0);
            let counter = Arc::clone(&counter);
            NativeOutcome::Suspend(WorkItem::new(move || {
                counter.fetch_add(1, Ordering::AcqRel);
                Value::Int(n)
            }))
        }),
    );

    // Running -> Incomplete -> Running -> Incomplete -> Succeeded.
    assert_eq!(r.execute(), RunState::Incomplete);
    assert_eq!(resumes.load(Ordering::Acquire), 0);
    assert_eq!(r.service_async(), 1);
    assert_eq!(r.execute(), RunState::Incomplete);
    assert_eq!(r.service_async(), 1);
    assert_eq!(r.execute(), RunState::Succeeded);
    assert_eq!(resumes.load(Ordering::Acquire), 2);
    assert_eq!(r.context().get_global("result"), Value::Int(15));
}

#[test]
fn bare_pause_yields_and_resumes() {
    let mut r = runner_for("checkpoint(); result = \"after\";");
    r.context().set_global(
        "checkpoint",
        native_fn("checkpoint", |r, _this, _args| {
            r.pause();
            NativeOutcome::undefined()
        }),
    );
    assert_eq!(r.execute(), RunState::Incomplete);
    assert_eq!(r.execute(), RunState::Succeeded);
    assert_eq!(r.context().get_global("result"), Value::str("after"));
}

#[test]
fn trace_id_is_per_runner() {
    let mut r = runner_for("var x = 1;");
    assert_eq!(r.trace_id(), None);
    r.set_trace_id(Some("t-77".to_string()));
    assert_eq!(r.trace_id(), Some("t-77"));
    r.set_trace_id(Some(String::new()));
    assert_eq!(r.trace_id(), None);
}

#[test]
fn isolated_function_call_helper() {
    let mut r = runner_for("function triple(n) { return 3 * n; }");
    assert_eq!(r.run(), RunState::Succeeded);
    let func = match r.context().get_global("triple") {
        Value::Func(f) => f,
        other => panic!("expected function, got {:?}", other),
    };
    let out = call_function(r.context(), &func, vec![Value::Int(14)]).unwrap();
    assert_eq!(out, Value::Int(42));
}

#[test]
fn cross_context_assignment_deep_copies() {
    let mut r = runner_for("holder.item = payload; result = \"done\";");
    let away = ScriptContext::new();
    let foreign = away.make_object();
    foreign.set("n", Value::Int(1));
    let holder = r.context().make_object();
    r.context().set_global("holder", Value::Object(holder.clone()));
    r.context().set_global("payload", Value::Object(foreign.clone()));
    assert_eq!(r.run(), RunState::Succeeded);
    let stored = holder.get("item");
    let stored = stored.as_object().unwrap();
    assert!(!Arc::ptr_eq(stored, &foreign));
    assert_eq!(stored.context_id(), r.context().id());
}
