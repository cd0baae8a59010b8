// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `URI` script binding over the host URL parser.

use std::sync::Arc;

use url::Url;

use tandem_script::native::{arg_str, native_fn, NativeOutcome};
use tandem_script::{ObjKind, ObjRef, ScriptContext, Value};

const TAG: &str = "URI";

pub fn install_uri(ctx: &Arc<ScriptContext>) {
    let ctor = ctx.make_object_at(ObjKind::Native(TAG), 0, "native:URI");
    ctor.set(
        "__invoke__",
        native_fn(TAG, |r, _this, args| {
            let Some(text) = arg_str(&args, 0) else {
                return NativeOutcome::Ret(Value::Null);
            };
            let Ok(url) = Url::parse(text.trim()) else {
                return NativeOutcome::Ret(Value::Null);
            };
            let obj = r.context().make_object_at(ObjKind::Native(TAG), 0, "native:URI");
            obj.set_native(url);
            install_methods(&obj);
            NativeOutcome::Ret(Value::Object(obj))
        }),
    );
    ctor.freeze();
    ctx.set_global(TAG, Value::Object(ctor));
}

fn getter(
    obj: &ObjRef,
    name: &str,
    read: fn(&Url) -> Option<String>,
) {
    let me = ObjRef::downgrade(obj);
    obj.set(
        name,
        native_fn(name, move |_r, _this, _args| {
            let found = me
                .upgrade()
                .and_then(|o| o.with_native::<Url, Option<String>>(|u| read(u)))
                .flatten();
            match found {
                Some(v) => NativeOutcome::Ret(Value::Str(v)),
                None => NativeOutcome::undefined(),
            }
        }),
    );
}

fn install_methods(obj: &ObjRef) {
    getter(obj, "protocol", |u| Some(u.scheme().to_string()));
    getter(obj, "host", |u| u.host_str().map(str::to_string));
    getter(obj, "path", |u| Some(u.path().to_string()));
    getter(obj, "query", |u| u.query().map(str::to_string));
    getter(obj, "user", |u| {
        let user = u.username();
        (!user.is_empty()).then(|| user.to_string())
    });
    getter(obj, "toString", |u| Some(u.to_string()));

    let me = ObjRef::downgrade(obj);
    obj.set(
        "port",
        native_fn("port", move |_r, _this, _args| {
            match me.upgrade().and_then(|o| o.with_native::<Url, Option<u16>>(|u| u.port())) {
                Some(Some(port)) => NativeOutcome::Ret(Value::Int(port as i64)),
                _ => NativeOutcome::undefined(),
            }
        }),
    );
}

#[cfg(test)]
#[path = "uri_tests.rs"]
mod tests;
