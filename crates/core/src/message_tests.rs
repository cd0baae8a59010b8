// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use indexmap::IndexMap;

use super::*;

fn params(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn new_message_is_stamped() {
    let msg = Message::new("call.route", false);
    assert_eq!(msg.name(), "call.route");
    assert!(!msg.broadcast());
    assert!(msg.msec() > 0);
    assert_eq!(msg.ret_value(), "");
}

#[test]
fn params_preserve_insertion_order() {
    let mut msg = Message::new("test", false);
    msg.set_param("zulu", "1");
    msg.set_param("alpha", "2");
    msg.set_param("mike", "3");
    let names: Vec<&String> = msg.params().keys().collect();
    assert_eq!(names, ["zulu", "alpha", "mike"]);
}

#[test]
fn clear_param_prefix_drops_subkeys() {
    let mut msg = Message::new("test", false);
    msg.set_param("media", "yes");
    msg.set_param("media.audio", "alaw");
    msg.set_param("mediator", "keep");
    msg.clear_param_prefix("media", '.');
    assert_eq!(msg.param("media"), None);
    assert_eq!(msg.param("media.audio"), None);
    assert_eq!(msg.param("mediator"), Some("keep"));
}

#[test]
fn fill_params_does_not_overwrite() {
    let mut msg = Message::new("call.execute", false);
    msg.set_param("callto", "sip/alice");
    msg.fill_params(&params(&[("callto", "sip/bob"), ("caller", "carol")]));
    assert_eq!(msg.param("callto"), Some("sip/alice"));
    assert_eq!(msg.param("caller"), Some("carol"));
}

#[test]
fn trace_id_empty_clears() {
    let mut msg = Message::new("test", false);
    msg.set_trace_id(Some("t-1"));
    assert_eq!(msg.trace_id(), Some("t-1"));
    msg.set_trace_id(Some(""));
    assert_eq!(msg.trace_id(), None);
}

#[test]
fn messages_serialize_for_status_dumps() {
    let mut msg = Message::new("call.route", false);
    msg.set_param("caller", "bob");
    let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["name"], "call.route");
    assert_eq!(json["params"]["caller"], "bob");
    assert_eq!(json["broadcast"], false);
}

#[test]
fn tabular_lookup_by_column_name() {
    let data = Tabular {
        columns: vec!["user".into(), "location".into()],
        rows: vec![vec![Some("alice".into()), None]],
    };
    assert_eq!(data.column_index("location"), Some(1));
    assert_eq!(data.column_index("missing"), None);
}

#[test]
fn replace_params_substitutes_known_names() {
    let src = params(&[("caller", "bob"), ("called", "alice")]);
    assert_eq!(
        replace_params("${caller} -> ${called}", &src, false, None),
        "bob -> alice"
    );
}

#[test]
fn replace_params_unknown_names_vanish() {
    let src = params(&[]);
    assert_eq!(replace_params("x${nope}y", &src, false, None), "xy");
}

#[test]
fn replace_params_keeps_unterminated_reference() {
    let src = params(&[("a", "1")]);
    assert_eq!(replace_params("ok ${a} ${broken", &src, false, None), "ok 1 ${broken");
}

#[test]
fn replace_params_sql_escapes() {
    let src = params(&[("name", "o'brien\\x")]);
    assert_eq!(
        replace_params("${name}", &src, true, None),
        "o''brien\\\\x"
    );
}

#[test]
fn replace_params_extra_escape_doubles_char() {
    let src = params(&[("col", "a;b")]);
    assert_eq!(replace_params("${col}", &src, false, Some(';')), "a;;b");
}

#[yare::parameterized(
    spaced = { "${ caller }", "bob" },
    tight = { "${caller}", "bob" },
    doubled = { "${caller}${caller}", "bobbob" },
    empty_name = { "${}", "" },
)]
fn replace_params_name_trimming(template: &str, expected: &str) {
    let src = params(&[("caller", "bob")]);
    assert_eq!(replace_params(template, &src, false, None), expected);
}

proptest::proptest! {
    #[test]
    fn prop_text_without_references_is_untouched(text in "[a-zA-Z0-9 .,;:!-]{0,40}") {
        let src = params(&[("a", "1")]);
        proptest::prop_assert_eq!(replace_params(&text, &src, false, None), text);
    }

    #[test]
    fn prop_substitution_never_leaves_markers(name in "[a-z]{1,8}", value in "[a-z0-9]{0,12}") {
        let src = params(&[(name.as_str(), value.as_str())]);
        let out = replace_params(&format!("x${{{}}}y", name), &src, false, None);
        proptest::prop_assert_eq!(out, format!("x{}y", value));
    }
}
