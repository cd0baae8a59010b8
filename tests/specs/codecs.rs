//! Codec specs
//!
//! Base64 and hex conversions are inverses of each other wherever the
//! input is well-formed.

use std::sync::Arc;

use tandem_engine::{install_bindings, EngineConfig, EngineHost};
use tandem_script::{RunState, Runner, ScriptContext, ScriptParser, Value};

fn eval(src: &str) -> Value {
    let host = EngineHost::new(EngineConfig::default());
    let ctx = ScriptContext::new();
    let _timer = install_bindings(&host, &ctx);
    let parsed = ScriptParser::new().parse_source(src, "codec.js").unwrap();
    let mut runner = Runner::new(parsed.code, Arc::clone(&ctx), "codec");
    assert_eq!(runner.run(), RunState::Succeeded);
    ctx.get_global("result")
}

#[test]
fn base64_idempotence_over_byte_strings() {
    // Binary-ish strings survive a btoa/atob round trip byte for byte.
    assert_eq!(
        eval(
            "var b = Engine.htob(\"00010203fdfeff\"); \
             result = Engine.btoh(Engine.atob(Engine.btoa(b)));"
        ),
        Value::str("00010203fdfeff")
    );
    assert_eq!(
        eval("result = Engine.atob(Engine.btoa(\"plain text stays\"));"),
        Value::str("plain text stays")
    );
}

#[test]
fn hex_idempotence_lower_case() {
    assert_eq!(
        eval("result = Engine.btoh(Engine.htob(\"deadbeef\"));"),
        Value::str("deadbeef")
    );
    assert_eq!(
        eval("result = Engine.btoh(Engine.htob(\"DEADBEEF\"));"),
        Value::str("deadbeef")
    );
}

#[test]
fn hex_rejects_odd_length() {
    assert_eq!(eval("result = Engine.htob(\"abc\");"), Value::Bool(false));
}

#[test]
fn base64_hex_composition() {
    assert_eq!(eval("result = Engine.atoh(Engine.htoa(\"0a0b0c\"));"), Value::str("0a0b0c"));
    assert_eq!(eval("result = Engine.atoh(Engine.btoa(\"A\"));"), Value::str("41"));
}

#[test]
fn hasher_agrees_with_codec_path() {
    assert_eq!(
        eval(
            "var h = new Hasher(\"md5\"); h.update(\"abc\"); \
             result = h.hexDigest().length;"
        ),
        Value::Int(32)
    );
}
