// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::test_util::{eval, fixture};
use tandem_script::Value;

const DOC: &str = "<presence from=\\\"alice\\\"><status busy=\\\"no\\\">online</status><note/></presence>";

#[test]
fn parse_and_navigate() {
    let fx = fixture();
    assert_eq!(
        eval(&fx, &format!("var x = new XML(\"{}\"); result = x.name();", DOC)),
        Value::str("presence")
    );
    assert_eq!(
        eval(&fx, &format!("var x = new XML(\"{}\"); result = x.attribute(\"from\");", DOC)),
        Value::str("alice")
    );
    assert_eq!(
        eval(
            &fx,
            &format!("var x = new XML(\"{}\"); result = x.getChild(\"status\").getText();", DOC)
        ),
        Value::str("online")
    );
    assert_eq!(
        eval(&fx, &format!("var x = new XML(\"{}\"); result = x.getChildren().length;", DOC)),
        Value::Int(2)
    );
    assert_eq!(
        eval(&fx, &format!("var x = new XML(\"{}\"); result = x.getChild(\"gone\") === null;", DOC)),
        Value::Bool(true)
    );
}

#[test]
fn parent_links_navigate_upward() {
    let fx = fixture();
    assert_eq!(
        eval(
            &fx,
            &format!(
                "var x = new XML(\"{}\"); result = x.getChild(\"status\").getParent().name();",
                DOC
            )
        ),
        Value::str("presence")
    );
    assert_eq!(
        eval(&fx, &format!("var x = new XML(\"{}\"); result = x.getParent() === null;", DOC)),
        Value::Bool(true)
    );
}

#[test]
fn build_and_serialize() {
    let fx = fixture();
    assert_eq!(
        eval(
            &fx,
            "var x = new XML(\"message\"); x.setAttribute(\"to\", \"bob\"); \
             x.addChild(\"body\", \"hi & bye\"); result = x.xmlText();"
        ),
        Value::str("<message to=\"bob\"><body>hi &amp; bye</body></message>")
    );
}

#[test]
fn mutate_attributes_and_text() {
    let fx = fixture();
    assert_eq!(
        eval(
            &fx,
            &format!(
                "var x = new XML(\"{}\"); var s = x.getChild(\"status\"); \
                 s.setText(\"away\"); s.setAttribute(\"busy\", \"yes\"); \
                 result = s.getText() + \"/\" + s.attribute(\"busy\");",
                DOC
            )
        ),
        Value::str("away/yes")
    );
    assert_eq!(
        eval(
            &fx,
            &format!(
                "var x = new XML(\"{}\"); var s = x.getChild(\"status\"); \
                 s.setAttribute(\"busy\", undefined); result = s.attribute(\"busy\") === undefined;",
                DOC
            )
        ),
        Value::Bool(true)
    );
}

#[test]
fn attributes_object_snapshot() {
    let fx = fixture();
    assert_eq!(
        eval(&fx, &format!("var x = new XML(\"{}\"); result = x.attributes().from;", DOC)),
        Value::str("alice")
    );
}

#[test]
fn malformed_documents_are_null() {
    let fx = fixture();
    assert_eq!(eval(&fx, "result = new XML(\"<a><b></a>\") === null;"), Value::Bool(true));
    assert_eq!(eval(&fx, "result = new XML(\"<never closed\") === null;"), Value::Bool(true));
}

#[test]
fn empty_elements_round_trip() {
    let fx = fixture();
    assert_eq!(
        eval(&fx, &format!("var x = new XML(\"{}\"); result = x.getChild(\"note\").xmlText();", DOC)),
        Value::str("<note/>")
    );
}
