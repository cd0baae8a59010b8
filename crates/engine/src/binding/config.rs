// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `ConfigFile` script binding: a pass-through to the configuration
//! store. A relative name resolves through the host's config directories.

use std::sync::Arc;

use tandem_config::ConfigFile;
use tandem_script::native::{arg_bool, arg_int, arg_str, native_fn, NativeOutcome};
use tandem_script::{ObjKind, ObjRef, ScriptContext, Value};

use crate::host::EngineHost;

const TAG: &str = "ConfigFile";

pub fn install_config(host: &Arc<EngineHost>, ctx: &Arc<ScriptContext>) {
    let ctor = ctx.make_object_at(ObjKind::Native(TAG), 0, "native:ConfigFile");
    let h = Arc::clone(host);
    ctor.set(
        "__invoke__",
        native_fn(TAG, move |r, _this, args| {
            let Some(name) = arg_str(&args, 0) else {
                return NativeOutcome::undefined();
            };
            let user = arg_bool(&args, 1, false);
            // Bare names resolve through the host directories; anything
            // with a separator is taken as a literal path.
            let path = if name.contains(std::path::MAIN_SEPARATOR) {
                std::path::PathBuf::from(&name)
            } else {
                h.config_file(&name, user)
            };
            let obj = r.context().make_object_at(ObjKind::Native(TAG), 0, "native:ConfigFile");
            obj.set_native(ConfigFile::new(path));
            install_methods(&obj, &h);
            NativeOutcome::Ret(Value::Object(obj))
        }),
    );
    ctor.freeze();
    ctx.set_global(TAG, Value::Object(ctor));
}

fn install_methods(obj: &ObjRef, host: &Arc<EngineHost>) {
    let me = ObjRef::downgrade(obj);
    let h = Arc::clone(host);
    obj.set(
        "load",
        native_fn("load", move |_r, _this, _args| {
            let Some(obj) = me.upgrade() else {
                return NativeOutcome::bool(false);
            };
            let h = Arc::clone(&h);
            let ok = obj
                .with_native::<ConfigFile, bool>(move |cfg| cfg.load_with(&*h).is_ok())
                .unwrap_or(false);
            NativeOutcome::bool(ok)
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "save",
        native_fn("save", move |_r, _this, _args| {
            let ok = me
                .upgrade()
                .and_then(|o| o.with_native::<ConfigFile, bool>(|cfg| cfg.save().is_ok()))
                .unwrap_or(false);
            NativeOutcome::bool(ok)
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "name",
        native_fn("name", move |_r, _this, _args| {
            let name = me.upgrade().and_then(|o| {
                o.with_native::<ConfigFile, Option<String>>(|cfg| {
                    cfg.path().map(|p| p.display().to_string())
                })
            });
            match name.flatten() {
                Some(n) => NativeOutcome::Ret(Value::Str(n)),
                None => NativeOutcome::undefined(),
            }
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "getValue",
        native_fn("getValue", move |_r, _this, args| {
            let (Some(section), Some(key)) = (arg_str(&args, 0), arg_str(&args, 1)) else {
                return NativeOutcome::undefined();
            };
            let found = me.upgrade().and_then(|o| {
                o.with_native::<ConfigFile, Option<String>>(|cfg| {
                    cfg.get(&section, &key).map(str::to_string)
                })
            });
            match found.flatten() {
                Some(v) => NativeOutcome::Ret(Value::Str(v)),
                None => NativeOutcome::Ret(args.get(2).cloned().unwrap_or_default()),
            }
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "getIntValue",
        native_fn("getIntValue", move |_r, _this, args| {
            let (Some(section), Some(key)) = (arg_str(&args, 0), arg_str(&args, 1)) else {
                return NativeOutcome::undefined();
            };
            let default = arg_int(&args, 2).unwrap_or(0);
            let v = me
                .upgrade()
                .and_then(|o| {
                    o.with_native::<ConfigFile, i64>(|cfg| cfg.int_value(&section, &key, default))
                })
                .unwrap_or(default);
            NativeOutcome::Ret(Value::Int(v))
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "getBoolValue",
        native_fn("getBoolValue", move |_r, _this, args| {
            let (Some(section), Some(key)) = (arg_str(&args, 0), arg_str(&args, 1)) else {
                return NativeOutcome::bool(false);
            };
            let default = arg_bool(&args, 2, false);
            let v = me
                .upgrade()
                .and_then(|o| {
                    o.with_native::<ConfigFile, bool>(|cfg| cfg.bool_value(&section, &key, default))
                })
                .unwrap_or(default);
            NativeOutcome::bool(v)
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "setValue",
        native_fn("setValue", move |_r, _this, args| {
            let (Some(section), Some(key)) = (arg_str(&args, 0), arg_str(&args, 1)) else {
                return NativeOutcome::bool(false);
            };
            let value = args.get(2).map(Value::to_display).unwrap_or_default();
            let ok = me
                .upgrade()
                .and_then(|o| {
                    o.with_native::<ConfigFile, ()>(|cfg| cfg.set_value(&section, &key, &value))
                })
                .is_some();
            NativeOutcome::bool(ok)
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "clearSection",
        native_fn("clearSection", move |_r, _this, args| {
            let Some(section) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            let ok = me
                .upgrade()
                .and_then(|o| o.with_native::<ConfigFile, bool>(|cfg| cfg.clear_section(&section)))
                .unwrap_or(false);
            NativeOutcome::bool(ok)
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "clearKey",
        native_fn("clearKey", move |_r, _this, args| {
            let (Some(section), Some(key)) = (arg_str(&args, 0), arg_str(&args, 1)) else {
                return NativeOutcome::bool(false);
            };
            let ok = me
                .upgrade()
                .and_then(|o| {
                    o.with_native::<ConfigFile, ()>(|cfg| cfg.clear_key(&section, &key))
                })
                .is_some();
            NativeOutcome::bool(ok)
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "sections",
        native_fn("sections", move |r, _this, _args| {
            let names = me
                .upgrade()
                .and_then(|o| {
                    o.with_native::<ConfigFile, Vec<String>>(|cfg| {
                        cfg.sections().map(str::to_string).collect()
                    })
                })
                .unwrap_or_default();
            let arr = r.context().array_from(names.into_iter().map(Value::Str).collect());
            NativeOutcome::Ret(Value::Object(arr))
        }),
    );
    let me = ObjRef::downgrade(obj);
    obj.set(
        "keys",
        native_fn("keys", move |r, _this, args| {
            let Some(section) = arg_str(&args, 0) else {
                return NativeOutcome::undefined();
            };
            let names = me
                .upgrade()
                .and_then(|o| {
                    o.with_native::<ConfigFile, Vec<String>>(|cfg| {
                        cfg.section(&section)
                            .map(|s| s.keys().map(str::to_string).collect())
                            .unwrap_or_default()
                    })
                })
                .unwrap_or_default();
            let arr = r.context().array_from(names.into_iter().map(Value::Str).collect());
            NativeOutcome::Ret(Value::Object(arr))
        }),
    );
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
