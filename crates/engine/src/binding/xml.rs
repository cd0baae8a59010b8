// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `XML` script binding.
//!
//! Parsing uses the host XML reader to build a small mutable node tree.
//! Child links own their nodes; parent links are weak, so releasing a
//! document never chases a cycle.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use quick_xml::events::Event;
use quick_xml::Reader;

use tandem_script::native::{arg_int, arg_str, native_fn, NativeOutcome};
use tandem_script::{ObjKind, ObjRef, Runner, ScriptContext, Value};

const TAG: &str = "XML";

type NodeRef = Arc<Mutex<XmlNode>>;
type NodeWeak = Weak<Mutex<XmlNode>>;

struct XmlNode {
    name: String,
    attributes: IndexMap<String, String>,
    text: String,
    children: Vec<NodeRef>,
    parent: NodeWeak,
}

impl XmlNode {
    fn new(name: &str) -> NodeRef {
        Arc::new(Mutex::new(XmlNode {
            name: name.to_string(),
            attributes: IndexMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: Weak::new(),
        }))
    }
}

fn parse_xml(text: &str) -> Option<NodeRef> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<NodeRef> = Vec::new();
    let mut root: Option<NodeRef> = None;
    loop {
        match reader.read_event().ok()? {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
                let node = XmlNode::new(&name);
                for attr in start.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                    let value = attr.unescape_value().ok()?.to_string();
                    node.lock().attributes.insert(key, value);
                }
                if let Some(parent) = stack.last() {
                    node.lock().parent = Arc::downgrade(parent);
                    parent.lock().children.push(Arc::clone(&node));
                } else if root.is_some() {
                    // Trailing second root is malformed.
                    return None;
                }
                stack.push(Arc::clone(&node));
                if root.is_none() {
                    root = Some(node);
                }
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
                let node = XmlNode::new(&name);
                for attr in start.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                    let value = attr.unescape_value().ok()?.to_string();
                    node.lock().attributes.insert(key, value);
                }
                match stack.last() {
                    Some(parent) => {
                        node.lock().parent = Arc::downgrade(parent);
                        parent.lock().children.push(node);
                    }
                    None if root.is_none() => root = Some(node),
                    None => return None,
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last() {
                    top.lock().text.push_str(&t.unescape().ok()?);
                }
            }
            Event::End(_) => {
                if stack.pop().is_none() {
                    return None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !stack.is_empty() {
        return None;
    }
    root
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn serialize(node: &NodeRef, out: &mut String) {
    let node = node.lock();
    out.push('<');
    out.push_str(&node.name);
    for (k, v) in &node.attributes {
        out.push(' ');
        out.push_str(k);
        out.push_str("=\"");
        out.push_str(&escape(v));
        out.push('"');
    }
    if node.text.is_empty() && node.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    out.push_str(&escape(&node.text));
    for child in &node.children {
        serialize(child, out);
    }
    out.push_str("</");
    out.push_str(&node.name);
    out.push('>');
}

/// Wrap a node for script use.
fn make_node_object(runner: &mut Runner, node: NodeRef) -> ObjRef {
    let ctx = Arc::clone(runner.context());
    make_node_object_in(&ctx, node)
}

fn make_node_object_in(ctx: &Arc<ScriptContext>, node: NodeRef) -> ObjRef {
    let obj = ctx.make_object_at(ObjKind::Native(TAG), 0, "native:XML");
    obj.set_native(Arc::clone(&node));
    install_methods(&obj);
    obj
}

fn node_of(obj: &ObjRef) -> Option<NodeRef> {
    obj.with_native::<NodeRef, NodeRef>(|n| Arc::clone(n))
}

pub fn install_xml(ctx: &Arc<ScriptContext>) {
    let ctor = ctx.make_object_at(ObjKind::Native(TAG), 0, "native:XML");
    ctor.set(
        "__invoke__",
        native_fn(TAG, |r, _this, args| {
            // Either parse a document or start a fresh element.
            let Some(text) = arg_str(&args, 0) else {
                return NativeOutcome::Ret(Value::Null);
            };
            let trimmed = text.trim();
            let node = if trimmed.starts_with('<') {
                match parse_xml(trimmed) {
                    Some(n) => n,
                    None => return NativeOutcome::Ret(Value::Null),
                }
            } else {
                XmlNode::new(trimmed)
            };
            NativeOutcome::Ret(Value::Object(make_node_object(r, node)))
        }),
    );
    ctor.freeze();
    ctx.set_global(TAG, Value::Object(ctor));
}

fn install_methods(obj: &ObjRef) {
    let me = ObjRef::downgrade(obj);
    obj.set(
        "name",
        native_fn("name", move |_r, _this, _args| {
            match me.upgrade().and_then(|o| node_of(&o)) {
                Some(n) => NativeOutcome::Ret(Value::str(n.lock().name.clone())),
                None => NativeOutcome::undefined(),
            }
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "getText",
        native_fn("getText", move |_r, _this, _args| {
            match me.upgrade().and_then(|o| node_of(&o)) {
                Some(n) => NativeOutcome::Ret(Value::str(n.lock().text.clone())),
                None => NativeOutcome::undefined(),
            }
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "setText",
        native_fn("setText", move |_r, _this, args| {
            let Some(n) = me.upgrade().and_then(|o| node_of(&o)) else {
                return NativeOutcome::bool(false);
            };
            n.lock().text = arg_str(&args, 0).unwrap_or_default();
            NativeOutcome::bool(true)
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "attribute",
        native_fn("attribute", move |_r, _this, args| {
            let Some(n) = me.upgrade().and_then(|o| node_of(&o)) else {
                return NativeOutcome::undefined();
            };
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::undefined();
            };
            let result = match n.lock().attributes.get(&name) {
                Some(v) => NativeOutcome::Ret(Value::str(v.clone())),
                None => NativeOutcome::undefined(),
            };
            result
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "setAttribute",
        native_fn("setAttribute", move |_r, _this, args| {
            let Some(n) = me.upgrade().and_then(|o| node_of(&o)) else {
                return NativeOutcome::bool(false);
            };
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            match args.get(1) {
                None | Some(Value::Undefined) => {
                    n.lock().attributes.shift_remove(&name);
                }
                Some(v) => {
                    n.lock().attributes.insert(name, v.to_display());
                }
            }
            NativeOutcome::bool(true)
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "attributes",
        native_fn("attributes", move |r, _this, _args| {
            let Some(n) = me.upgrade().and_then(|o| node_of(&o)) else {
                return NativeOutcome::undefined();
            };
            let out = r.context().make_object();
            for (k, v) in &n.lock().attributes {
                out.set(k, Value::str(v.clone()));
            }
            NativeOutcome::Ret(Value::Object(out))
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "addChild",
        native_fn("addChild", move |r, _this, args| {
            let Some(parent) = me.upgrade().and_then(|o| node_of(&o)) else {
                return NativeOutcome::Ret(Value::Null);
            };
            let child = match args.first() {
                Some(Value::Object(o)) if o.kind() == ObjKind::Native(TAG) => {
                    match node_of(o) {
                        Some(n) => n,
                        None => return NativeOutcome::Ret(Value::Null),
                    }
                }
                Some(Value::Str(name)) => {
                    let node = XmlNode::new(name);
                    if let Some(text) = arg_str(&args, 1) {
                        node.lock().text = text;
                    }
                    node
                }
                _ => return NativeOutcome::Ret(Value::Null),
            };
            child.lock().parent = Arc::downgrade(&parent);
            parent.lock().children.push(Arc::clone(&child));
            NativeOutcome::Ret(Value::Object(make_node_object(r, child)))
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "getChild",
        native_fn("getChild", move |r, _this, args| {
            let Some(n) = me.upgrade().and_then(|o| node_of(&o)) else {
                return NativeOutcome::Ret(Value::Null);
            };
            let want = arg_str(&args, 0);
            let found = n
                .lock()
                .children
                .iter()
                .find(|c| want.as_ref().map(|w| &c.lock().name == w).unwrap_or(true))
                .cloned();
            match found {
                Some(c) => NativeOutcome::Ret(Value::Object(make_node_object(r, c))),
                None => NativeOutcome::Ret(Value::Null),
            }
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "getChildren",
        native_fn("getChildren", move |r, _this, args| {
            let Some(n) = me.upgrade().and_then(|o| node_of(&o)) else {
                return NativeOutcome::Ret(Value::Null);
            };
            let want = arg_str(&args, 0);
            let children: Vec<NodeRef> = n
                .lock()
                .children
                .iter()
                .filter(|c| want.as_ref().map(|w| &c.lock().name == w).unwrap_or(true))
                .cloned()
                .collect();
            let items: Vec<Value> = children
                .into_iter()
                .map(|c| Value::Object(make_node_object(r, c)))
                .collect();
            NativeOutcome::Ret(Value::Object(r.context().array_from(items)))
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "getParent",
        native_fn("getParent", move |r, _this, _args| {
            let parent = me
                .upgrade()
                .and_then(|o| node_of(&o))
                .and_then(|n| n.lock().parent.upgrade());
            match parent {
                Some(p) => NativeOutcome::Ret(Value::Object(make_node_object(r, p))),
                None => NativeOutcome::Ret(Value::Null),
            }
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "xmlText",
        native_fn("xmlText", move |_r, _this, args| {
            let Some(n) = me.upgrade().and_then(|o| node_of(&o)) else {
                return NativeOutcome::undefined();
            };
            let _indent = arg_int(&args, 0);
            let mut out = String::new();
            serialize(&n, &mut out);
            NativeOutcome::Ret(Value::Str(out))
        }),
    );
}

#[cfg(test)]
#[path = "xml_tests.rs"]
mod tests;
