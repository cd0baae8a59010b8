// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide shared string variables.
//!
//! One flat namespace of name → string, shared by every script context and
//! native module. `inc`/`dec` treat the stored string as an unsigned counter
//! and support an optional wrap-around modulus.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

static VARS: Lazy<RwLock<IndexMap<String, String>>> = Lazy::new(|| RwLock::new(IndexMap::new()));

/// Facade over the process-wide store.
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedVars;

impl SharedVars {
    pub fn get(&self, name: &str) -> Option<String> {
        VARS.read().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: &str) {
        VARS.write().insert(name.to_string(), value.to_string());
    }

    pub fn exists(&self, name: &str) -> bool {
        VARS.read().contains_key(name)
    }

    pub fn clear(&self, name: &str) {
        VARS.write().shift_remove(name);
    }

    pub fn clear_all(&self) {
        VARS.write().clear();
    }

    /// Increment a counter variable, returning the new value.
    ///
    /// A missing or non-numeric value counts as zero. With a modulus `m > 1`
    /// the result wraps into `0..m`.
    pub fn inc(&self, name: &str, modulus: Option<u64>) -> u64 {
        self.add(name, 1, modulus)
    }

    /// Decrement a counter variable, returning the new value (saturating at
    /// zero without a modulus, wrapping with one).
    pub fn dec(&self, name: &str, modulus: Option<u64>) -> u64 {
        let mut vars = VARS.write();
        let current = vars.get(name).and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);
        let next = match modulus.filter(|m| *m > 1) {
            Some(m) => {
                let cur = current % m;
                if cur == 0 {
                    m - 1
                } else {
                    cur - 1
                }
            }
            None => current.saturating_sub(1),
        };
        vars.insert(name.to_string(), next.to_string());
        next
    }

    fn add(&self, name: &str, amount: u64, modulus: Option<u64>) -> u64 {
        let mut vars = VARS.write();
        let current = vars.get(name).and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);
        let mut next = current.wrapping_add(amount);
        if let Some(m) = modulus.filter(|m| *m > 1) {
            next %= m;
        }
        vars.insert(name.to_string(), next.to_string());
        next
    }

    /// Snapshot of every variable, for diagnostics.
    pub fn snapshot(&self) -> IndexMap<String, String> {
        VARS.read().clone()
    }
}

#[cfg(test)]
#[path = "shared_tests.rs"]
mod tests;
