// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::parser::ScriptParser;
use crate::runner::{RunState, Runner};

fn eval(src: &str) -> Value {
    let parsed = ScriptParser::new().parse_source(src, "stdlib_test.js").unwrap();
    let ctx = ScriptContext::new();
    install(&ctx);
    let mut r = Runner::new(parsed.code, ctx, "test");
    assert_eq!(r.run(), RunState::Succeeded, "script failed: {}", src);
    r.context().get_global("result")
}

#[test]
fn json_global() {
    assert_eq!(
        eval("result = JSON.stringify({ a: 1, b: [true, null] });"),
        Value::str("{\"a\":1,\"b\":[true,null]}")
    );
    assert_eq!(eval("result = JSON.parse(\"[1,2]\")[1];"), Value::Int(2));
    assert_eq!(eval("result = JSON.parse(\"{bad\") === undefined;"), Value::Bool(true));
}

#[test]
fn math_global() {
    assert_eq!(eval("result = Math.abs(-5);"), Value::Int(5));
    assert_eq!(eval("result = Math.max(1, 9, 4);"), Value::Int(9));
    assert_eq!(eval("result = Math.min(3, -2, 8);"), Value::Int(-2));
    assert_eq!(eval("result = Math.floor(3.9);"), Value::Int(3));
    assert_eq!(eval("result = Math.ceil(3.1);"), Value::Int(4));
    assert_eq!(
        eval("var r = Math.random(); result = r >= 0 && r < 1;"),
        Value::Bool(true)
    );
}

#[test]
fn object_statics() {
    assert_eq!(
        eval("result = Object.keys({ x: 1, y: 2 }).join();"),
        Value::str("x,y")
    );
    assert_eq!(eval("result = Object.isArray([1]);"), Value::Bool(true));
    assert_eq!(eval("result = Object.isArray({});"), Value::Bool(false));
}

#[test]
fn constructors() {
    assert_eq!(eval("result = new Array(1, 2, 3).length;"), Value::Int(3));
    assert_eq!(
        eval("var h = new HashList(64); h.a = 1; h.b = 2; result = h.count();"),
        Value::Int(2)
    );
    assert_eq!(
        eval("var re = new RegExp(\"^ch-[0-9]+$\"); result = re.test(\"ch-42\");"),
        Value::Bool(true)
    );
    assert_eq!(
        eval("var re = new RegExp(\"^A$\", true); result = re.test(\"a\");"),
        Value::Bool(true)
    );
}

#[test]
fn numeric_parsers() {
    assert_eq!(eval("result = parseInt(\"42\");"), Value::Int(42));
    assert_eq!(eval("result = parseInt(\"ff\", 16);"), Value::Int(255));
    assert_eq!(eval("result = isNaN(parseInt(\"zzz\"));"), Value::Bool(true));
    assert_eq!(eval("result = parseFloat(\"2.5\");"), Value::Num(2.5));
}

#[test]
fn generic_object_methods() {
    assert_eq!(
        eval("var o = { a: 1 }; o.freeze(); o.a = 9; result = o.a;"),
        Value::Int(1)
    );
    assert_eq!(eval("var o = {}; result = o.isFrozen();"), Value::Bool(false));
    assert_eq!(
        eval("var o = { a: 1 }; result = o.hasOwnProperty(\"a\");"),
        Value::Bool(true)
    );
    assert_eq!(
        eval("var o = { a: 1 }; result = o.toJSON();"),
        Value::str("{\"a\":1}")
    );
}

#[test]
fn frozen_state_is_fully_opaque() {
    // No binding operation changes observable state after freeze.
    assert_eq!(
        eval(
            "var o = { a: 1, b: 2 }; o.freeze(); o.c = 3; o.b = undefined; \
             result = JSON.stringify(o) + o.isFrozen();"
        ),
        Value::str("{\"a\":1,\"b\":2}true")
    );
}
