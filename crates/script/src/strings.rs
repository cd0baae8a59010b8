// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Native methods on primitive strings.

use crate::runner::Runner;
use crate::value::Value;

/// Dispatch a method call on a string receiver. `None` means no such
/// method; the caller treats that as a soft miss.
pub fn string_method(
    runner: &mut Runner,
    s: &str,
    name: &str,
    args: &[Value],
) -> Option<Value> {
    let chars: Vec<char> = s.chars().collect();
    Some(match name {
        "length" => Value::Int(chars.len() as i64),
        "toString" => Value::Str(s.to_string()),
        "charAt" => {
            let i = args.first().map(Value::to_int).unwrap_or(0);
            let ch = (i >= 0)
                .then(|| chars.get(i as usize))
                .flatten()
                .map(|c| c.to_string())
                .unwrap_or_default();
            Value::Str(ch)
        }
        "indexOf" => {
            let needle = args.first().map(Value::to_display).unwrap_or_default();
            let from = args.get(1).map(Value::to_int).unwrap_or(0).max(0) as usize;
            Value::Int(char_index_of(&chars, &needle, from))
        }
        "lastIndexOf" => {
            let needle = args.first().map(Value::to_display).unwrap_or_default();
            let mut found = -1i64;
            let mut from = 0usize;
            loop {
                match char_index_of(&chars, &needle, from) {
                    -1 => break,
                    at => {
                        found = at;
                        from = at as usize + 1;
                    }
                }
            }
            Value::Int(found)
        }
        "includes" => {
            let needle = args.first().map(Value::to_display).unwrap_or_default();
            Value::Bool(s.contains(&needle))
        }
        "startsWith" => {
            let needle = args.first().map(Value::to_display).unwrap_or_default();
            Value::Bool(s.starts_with(&needle))
        }
        "endsWith" => {
            let needle = args.first().map(Value::to_display).unwrap_or_default();
            Value::Bool(s.ends_with(&needle))
        }
        "substr" => {
            let len = chars.len() as i64;
            let mut start = args.first().map(Value::to_int).unwrap_or(0);
            if start < 0 {
                start = (len + start).max(0);
            }
            let start = start.min(len) as usize;
            let count = args
                .get(1)
                .map(Value::to_int)
                .unwrap_or(len)
                .max(0) as usize;
            Value::Str(chars[start..].iter().take(count).collect())
        }
        "split" => {
            let parts: Vec<Value> = match args.first().map(Value::to_display) {
                None => vec![Value::Str(s.to_string())],
                Some(sep) if sep.is_empty() => {
                    chars.iter().map(|c| Value::Str(c.to_string())).collect()
                }
                Some(sep) => s.split(&sep).map(Value::str).collect(),
            };
            Value::Object(runner.context().array_from(parts))
        }
        "toLowerCase" => Value::Str(s.to_lowercase()),
        "toUpperCase" => Value::Str(s.to_uppercase()),
        "trim" => Value::Str(s.trim().to_string()),
        "replace" => {
            let from = args.first().map(Value::to_display).unwrap_or_default();
            let to = args.get(1).map(Value::to_display).unwrap_or_default();
            if from.is_empty() {
                Value::Str(s.to_string())
            } else {
                Value::Str(s.replacen(&from, &to, 1))
            }
        }
        _ => return None,
    })
}

fn char_index_of(haystack: &[char], needle: &str, from: usize) -> i64 {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return from.min(haystack.len()) as i64;
    }
    if haystack.len() < needle.len() {
        return -1;
    }
    for at in from..=(haystack.len() - needle.len()) {
        if haystack[at..at + needle.len()] == needle[..] {
            return at as i64;
        }
    }
    -1
}

#[cfg(test)]
#[path = "strings_tests.rs"]
mod tests;
