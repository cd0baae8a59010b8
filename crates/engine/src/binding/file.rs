// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `File` script binding: basic filesystem operations.
//!
//! Every operation fails soft — `false` or `null` comes back and the host
//! error code is parked in the thread runtime's `lastError` slot.

use std::sync::Arc;

use tandem_script::native::{arg_int, arg_str, native_fn, NativeOutcome};
use tandem_script::{ObjKind, ScriptContext, Value};
use tandem_threads as threads;

fn note_error(err: &std::io::Error) {
    threads::set_last_error(err.raw_os_error().unwrap_or(-1));
}

pub fn install_file(ctx: &Arc<ScriptContext>) {
    let file = ctx.make_object_at(ObjKind::Native("File"), 0, "native:File");

    file.set(
        "exists",
        native_fn("exists", |_r, _this, args| {
            let Some(path) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            NativeOutcome::bool(std::path::Path::new(&path).exists())
        }),
    );
    file.set(
        "remove",
        native_fn("remove", |_r, _this, args| {
            let Some(path) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            match std::fs::remove_file(&path) {
                Ok(()) => NativeOutcome::bool(true),
                Err(e) => {
                    note_error(&e);
                    NativeOutcome::bool(false)
                }
            }
        }),
    );
    file.set(
        "rename",
        native_fn("rename", |_r, _this, args| {
            let (Some(from), Some(to)) = (arg_str(&args, 0), arg_str(&args, 1)) else {
                return NativeOutcome::bool(false);
            };
            match std::fs::rename(&from, &to) {
                Ok(()) => NativeOutcome::bool(true),
                Err(e) => {
                    note_error(&e);
                    NativeOutcome::bool(false)
                }
            }
        }),
    );
    file.set(
        "mkdir",
        native_fn("mkdir", |_r, _this, args| {
            let Some(path) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            match std::fs::create_dir_all(&path) {
                Ok(()) => NativeOutcome::bool(true),
                Err(e) => {
                    note_error(&e);
                    NativeOutcome::bool(false)
                }
            }
        }),
    );
    file.set(
        "rmdir",
        native_fn("rmdir", |_r, _this, args| {
            let Some(path) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            match std::fs::remove_dir(&path) {
                Ok(()) => NativeOutcome::bool(true),
                Err(e) => {
                    note_error(&e);
                    NativeOutcome::bool(false)
                }
            }
        }),
    );
    file.set(
        "getContent",
        native_fn("getContent", |_r, _this, args| {
            let Some(path) = arg_str(&args, 0) else {
                return NativeOutcome::Ret(Value::Null);
            };
            let max_len = arg_int(&args, 1).unwrap_or(65536).max(0) as usize;
            match std::fs::read_to_string(&path) {
                Ok(mut text) => {
                    if text.len() > max_len {
                        text.truncate(max_len);
                    }
                    NativeOutcome::Ret(Value::Str(text))
                }
                Err(e) => {
                    note_error(&e);
                    NativeOutcome::Ret(Value::Null)
                }
            }
        }),
    );
    file.set(
        "setContent",
        native_fn("setContent", |_r, _this, args| {
            let Some(path) = arg_str(&args, 0) else {
                return NativeOutcome::bool(false);
            };
            let content = arg_str(&args, 1).unwrap_or_default();
            match std::fs::write(&path, content) {
                Ok(()) => NativeOutcome::bool(true),
                Err(e) => {
                    note_error(&e);
                    NativeOutcome::bool(false)
                }
            }
        }),
    );
    file.set(
        "listDirectory",
        native_fn("listDirectory", |r, _this, args| {
            let Some(path) = arg_str(&args, 0) else {
                return NativeOutcome::Ret(Value::Null);
            };
            match std::fs::read_dir(&path) {
                Ok(entries) => {
                    let mut names: Vec<String> = entries
                        .filter_map(|e| e.ok())
                        .filter_map(|e| e.file_name().into_string().ok())
                        .collect();
                    names.sort();
                    let arr =
                        r.context().array_from(names.into_iter().map(Value::Str).collect());
                    NativeOutcome::Ret(Value::Object(arr))
                }
                Err(e) => {
                    note_error(&e);
                    NativeOutcome::Ret(Value::Null)
                }
            }
        }),
    );
    file.set(
        "getFileTime",
        native_fn("getFileTime", |_r, _this, args| {
            let Some(path) = arg_str(&args, 0) else {
                return NativeOutcome::Ret(Value::Int(-1));
            };
            let secs = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(-1);
            NativeOutcome::Ret(Value::Int(secs))
        }),
    );

    file.freeze();
    ctx.set_global("File", Value::Object(file));
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
