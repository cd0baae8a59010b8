// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus messages.
//!
//! A message is a named, insertion-ordered bag of string parameters plus a
//! return value, a creation timestamp and a broadcast flag. Messages are
//! shared between the dispatcher, script wrappers and queue workers, so the
//! canonical form is [`MessageRef`], an `Arc<Mutex<Message>>`.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::clock::now_msec;

/// Shared handle to one message.
pub type MessageRef = Arc<Mutex<Message>>;

/// Tabular user-data a producer may attach to a message (query results).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Tabular {
    pub columns: Vec<String>,
    /// Row-major cells; `None` marks a NULL cell.
    pub rows: Vec<Vec<Option<String>>>,
}

impl Tabular {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Serialized form feeds status dumps and the admin surface.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Message {
    name: String,
    broadcast: bool,
    msec: u64,
    params: IndexMap<String, String>,
    ret_value: String,
    trace_id: Option<String>,
    tabular: Option<Tabular>,
}

impl Message {
    pub fn new(name: &str, broadcast: bool) -> Message {
        Message {
            name: name.to_string(),
            broadcast,
            msec: now_msec(),
            ..Message::default()
        }
    }

    /// Wrap into the shared form the bus works with.
    pub fn into_ref(self) -> MessageRef {
        Arc::new(Mutex::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn broadcast(&self) -> bool {
        self.broadcast
    }

    /// Message creation (or last re-stamp) time, epoch milliseconds.
    pub fn msec(&self) -> u64 {
        self.msec
    }

    pub fn set_msec(&mut self, msec: u64) {
        self.msec = msec;
    }

    /// Re-stamp with the current time.
    pub fn touch(&mut self) {
        self.msec = now_msec();
    }

    /// Milliseconds elapsed since the message time.
    pub fn age_msec(&self) -> u64 {
        now_msec().saturating_sub(self.msec)
    }

    pub fn ret_value(&self) -> &str {
        &self.ret_value
    }

    pub fn set_ret_value(&mut self, value: &str) {
        self.ret_value = value.to_string();
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn set_trace_id(&mut self, id: Option<&str>) {
        self.trace_id = id.filter(|s| !s.is_empty()).map(str::to_string);
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn set_param(&mut self, name: &str, value: &str) {
        self.params.insert(name.to_string(), value.to_string());
    }

    pub fn clear_param(&mut self, name: &str) {
        self.params.shift_remove(name);
    }

    /// Remove every parameter whose name matches up to a separator char:
    /// `clear_param_prefix("media", '.')` drops `media` and `media.audio`.
    pub fn clear_param_prefix(&mut self, name: &str, sep: char) {
        self.params.retain(|k, _| {
            k != name && !(k.starts_with(name) && k[name.len()..].starts_with(sep))
        });
    }

    pub fn params(&self) -> &IndexMap<String, String> {
        &self.params
    }

    pub fn set_params(&mut self, params: IndexMap<String, String>) {
        self.params = params;
    }

    /// Copy `src` parameters into this message, overwriting collisions.
    pub fn copy_params(&mut self, src: &IndexMap<String, String>) {
        for (k, v) in src {
            self.params.insert(k.clone(), v.clone());
        }
    }

    /// Copy parameters absent from this message (used by re-routing, which
    /// carries forward everything not explicitly overridden).
    pub fn fill_params(&mut self, src: &IndexMap<String, String>) {
        for (k, v) in src {
            if !self.params.contains_key(k) {
                self.params.insert(k.clone(), v.clone());
            }
        }
    }

    pub fn tabular(&self) -> Option<&Tabular> {
        self.tabular.as_ref()
    }

    pub fn set_tabular(&mut self, data: Option<Tabular>) {
        self.tabular = data;
    }
}

/// Substitute `${name}` references in `text` from a parameter map.
///
/// Unknown names substitute as empty. With `sql_escape`, substituted values
/// double their single quotes and backslashes; `extra_esc` doubles one more
/// caller-chosen character (column separators in query builders).
pub fn replace_params(
    text: &str,
    params: &IndexMap<String, String>,
    sql_escape: bool,
    extra_esc: Option<char>,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            None => {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            }
            Some(end) => {
                let name = after[..end].trim();
                if let Some(value) = params.get(name) {
                    if sql_escape || extra_esc.is_some() {
                        for ch in value.chars() {
                            match ch {
                                '\'' | '\\' if sql_escape => {
                                    out.push(ch);
                                    out.push(ch);
                                }
                                c if Some(c) == extra_esc => {
                                    out.push(c);
                                    out.push(c);
                                }
                                c => out.push(c),
                            }
                        }
                    } else {
                        out.push_str(value);
                    }
                }
                rest = &after[end + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
