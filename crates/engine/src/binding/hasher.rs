// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Hasher` script binding.
//!
//! `new Hasher("md5"|"sha1"|"sha256")`; `update` feeds text, `hexDigest`
//! reads the current digest without disturbing the running state.

use std::sync::Arc;

use md5::Md5;
use sha1::Sha1;
use sha2::digest::Digest as _;
use sha2::Sha256;

use tandem_script::native::{arg_str, native_fn, NativeOutcome};
use tandem_script::{ObjKind, ObjRef, ScriptContext, Value};

const TAG: &str = "Hasher";

#[derive(Clone)]
enum HasherState {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
}

impl HasherState {
    fn new(kind: &str) -> Option<HasherState> {
        Some(match kind {
            "md5" => HasherState::Md5(Md5::new()),
            "sha1" => HasherState::Sha1(Sha1::new()),
            "sha256" => HasherState::Sha256(Sha256::new()),
            _ => return None,
        })
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            HasherState::Md5(h) => h.update(data),
            HasherState::Sha1(h) => h.update(data),
            HasherState::Sha256(h) => h.update(data),
        }
    }

    fn hex_digest(&self) -> String {
        match self {
            HasherState::Md5(h) => hex::encode(h.clone().finalize()),
            HasherState::Sha1(h) => hex::encode(h.clone().finalize()),
            HasherState::Sha256(h) => hex::encode(h.clone().finalize()),
        }
    }

    fn hash_length(&self) -> usize {
        match self {
            HasherState::Md5(_) => 16,
            HasherState::Sha1(_) => 20,
            HasherState::Sha256(_) => 32,
        }
    }

    fn clear(&mut self) {
        *self = match self {
            HasherState::Md5(_) => HasherState::Md5(Md5::new()),
            HasherState::Sha1(_) => HasherState::Sha1(Sha1::new()),
            HasherState::Sha256(_) => HasherState::Sha256(Sha256::new()),
        };
    }
}

pub fn install_hasher(ctx: &Arc<ScriptContext>) {
    let ctor = ctx.make_object_at(ObjKind::Native(TAG), 0, "native:Hasher");
    ctor.set(
        "__invoke__",
        native_fn(TAG, |r, _this, args| {
            let kind = arg_str(&args, 0).unwrap_or_else(|| "md5".to_string());
            let Some(state) = HasherState::new(&kind.to_ascii_lowercase()) else {
                return NativeOutcome::Ret(Value::Null);
            };
            let obj = r.context().make_object_at(ObjKind::Native(TAG), 0, "native:Hasher");
            obj.set_native(state);
            install_methods(&obj);
            NativeOutcome::Ret(Value::Object(obj))
        }),
    );
    ctor.freeze();
    ctx.set_global(TAG, Value::Object(ctor));
}

fn install_methods(obj: &ObjRef) {
    let me = ObjRef::downgrade(obj);
    obj.set(
        "update",
        native_fn("update", move |_r, _this, args| {
            let Some(data) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            let ok = me
                .upgrade()
                .and_then(|o| {
                    o.with_native::<HasherState, ()>(|h| h.update(data.as_bytes()))
                })
                .is_some();
            NativeOutcome::bool(ok)
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "hexDigest",
        native_fn("hexDigest", move |_r, _this, _args| {
            match me
                .upgrade()
                .and_then(|o| o.with_native::<HasherState, String>(|h| h.hex_digest()))
            {
                Some(hex) => NativeOutcome::Ret(Value::Str(hex)),
                None => NativeOutcome::undefined(),
            }
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "clear",
        native_fn("clear", move |_r, _this, _args| {
            let ok = me
                .upgrade()
                .and_then(|o| o.with_native::<HasherState, ()>(|h| h.clear()))
                .is_some();
            NativeOutcome::bool(ok)
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "hashLength",
        native_fn("hashLength", move |_r, _this, _args| {
            let len = me
                .upgrade()
                .and_then(|o| o.with_native::<HasherState, usize>(|h| h.hash_length()))
                .unwrap_or(0);
            NativeOutcome::Ret(Value::Int(len as i64))
        }),
    );
}

#[cfg(test)]
#[path = "hasher_tests.rs"]
mod tests;
