//! JSON specs
//!
//! Structural round-trips through the script-level JSON surface.

use std::sync::Arc;

use tandem_script::{stdlib, RunState, Runner, ScriptContext, ScriptParser, Value};

fn eval(src: &str) -> Value {
    let ctx = ScriptContext::new();
    stdlib::install(&ctx);
    let parsed = ScriptParser::new().parse_source(src, "json.js").unwrap();
    let mut runner = Runner::new(parsed.code, Arc::clone(&ctx), "json");
    assert_eq!(runner.run(), RunState::Succeeded);
    ctx.get_global("result")
}

#[test]
fn array_round_trip_is_structural() {
    assert_eq!(
        eval(
            "var v = [1, 2, [3, \"a\"], { k: true }]; \
             var back = JSON.parse(JSON.stringify(v)); \
             result = back[0] + \"/\" + back[2][1] + \"/\" + back[3].k + \"/\" + back.length;"
        ),
        Value::str("1/a/true/4")
    );
}

#[test]
fn functions_become_null_in_arrays() {
    assert_eq!(
        eval("result = JSON.stringify([1, function () {}, 3]);"),
        Value::str("[1,null,3]")
    );
}

#[test]
fn non_integer_numbers_round_trip_as_null() {
    assert_eq!(eval("result = JSON.stringify([1.5, 2]);"), Value::str("[null,2]"));
    assert_eq!(
        eval("result = JSON.parse(JSON.stringify({ n: 2.25 })).n === null;"),
        Value::Bool(true)
    );
}

#[test]
fn parse_rejects_trailing_content_entirely() {
    assert_eq!(eval("result = JSON.parse(\"[1] [2]\") === undefined;"), Value::Bool(true));
    assert_eq!(eval("result = JSON.parse(\"{\\\"a\\\":}\") === undefined;"), Value::Bool(true));
}

#[test]
fn stringify_emits_well_formed_json() {
    let text = eval(
        "result = JSON.stringify({ id: \"ch-1\", legs: [1, 2], active: true });",
    )
    .to_display();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["id"], serde_json::json!("ch-1"));
    assert_eq!(parsed["legs"][1], serde_json::json!(2));
    assert_eq!(parsed["active"], serde_json::json!(true));
}

#[test]
fn nested_objects_preserve_key_order() {
    assert_eq!(
        eval(
            "var text = \"{\\\"z\\\":1,\\\"a\\\":{\\\"m\\\":2,\\\"b\\\":3}}\"; \
             result = JSON.stringify(JSON.parse(text));"
        ),
        Value::str("{\"z\":1,\"a\":{\"m\":2,\"b\":3}}")
    );
}
