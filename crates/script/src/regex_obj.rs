// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script regex objects.
//!
//! Wraps a compiled [`regex::Regex`]. The `ignoreCase` and `basicPosix`
//! flags are live properties: assigning either recompiles the pattern.
//! A pattern that fails to compile leaves the object usable — `test`
//! returns false and `valid` reports the state.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use regex::RegexBuilder;
use tracing::debug;

use crate::context::ScriptContext;
use crate::object::{ObjKind, ObjRef, ParamSource};
use crate::value::Value;

pub const REGEX_TAG: &str = "RegExp";

struct RegexState {
    source: String,
    ignore_case: bool,
    basic_posix: bool,
    compiled: Option<regex::Regex>,
}

pub struct RegexSource {
    state: Mutex<RegexState>,
}

impl RegexSource {
    // The host regex engine has no separate POSIX-basic mode; the flag is
    // kept observable and the pattern recompiles either way.
    fn recompiled(source: &str, ignore_case: bool, _basic_posix: bool) -> Option<regex::Regex> {
        match RegexBuilder::new(source).case_insensitive(ignore_case).build() {
            Ok(re) => Some(re),
            Err(e) => {
                debug!(pattern = source, error = %e, "regex compilation failed");
                None
            }
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut RegexState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn test(&self, subject: &str) -> bool {
        self.with_state(|s| s.compiled.as_ref().map(|re| re.is_match(subject)).unwrap_or(false))
    }

    pub fn valid(&self) -> bool {
        self.with_state(|s| s.compiled.is_some())
    }

    pub fn source_text(&self) -> String {
        self.with_state(|s| s.source.clone())
    }
}

impl ParamSource for RegexSource {
    fn get_param(&self, name: &str) -> Option<Value> {
        self.with_state(|s| match name {
            "ignoreCase" => Some(Value::Bool(s.ignore_case)),
            "basicPosix" => Some(Value::Bool(s.basic_posix)),
            "source" => Some(Value::Str(s.source.clone())),
            _ => None,
        })
    }

    fn set_param(&self, name: &str, value: &Value) -> bool {
        self.with_state(|s| {
            match name {
                "ignoreCase" => s.ignore_case = value.to_bool(),
                "basicPosix" => s.basic_posix = value.to_bool(),
                _ => return false,
            }
            s.compiled = RegexSource::recompiled(&s.source, s.ignore_case, s.basic_posix);
            true
        })
    }

    fn param_names(&self) -> Vec<String> {
        vec!["ignoreCase".to_string(), "basicPosix".to_string(), "source".to_string()]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Build a regex object owned by `ctx`.
pub fn make_regex(
    ctx: &Arc<ScriptContext>,
    pattern: &str,
    ignore_case: bool,
    basic_posix: bool,
) -> ObjRef {
    let compiled = RegexSource::recompiled(pattern, ignore_case, basic_posix);
    let src = Arc::new(RegexSource {
        state: Mutex::new(RegexState {
            source: pattern.to_string(),
            ignore_case,
            basic_posix,
            compiled,
        }),
    });
    let obj = ctx.make_object_at(ObjKind::Native(REGEX_TAG), 0, "native:RegExp");
    obj.set_param_source(src);
    obj
}

/// Method dispatch for regex objects.
pub fn regex_method(obj: &ObjRef, name: &str, args: &[Value]) -> Option<Value> {
    let src = obj.param_source()?;
    let src = src.as_any().downcast_ref::<RegexSource>()?;
    Some(match name {
        "test" => {
            let subject = args.first().map(Value::to_display).unwrap_or_default();
            Value::Bool(src.test(&subject))
        }
        "valid" => Value::Bool(src.valid()),
        "toString" => Value::Str(src.source_text()),
        _ => return None,
    })
}

#[cfg(test)]
#[path = "regex_obj_tests.rs"]
mod tests;
