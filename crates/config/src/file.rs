// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The configuration object: ordered sections of ordered key/value pairs.
//!
//! Duplicate keys are legal and kept in file order; lookups return the first
//! match, like the engine they serve.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::warn;

use crate::error::ConfigError;
use crate::loader::{ConfigContext, Loader, NullContext};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    values: Vec<(String, String)>,
}

impl Section {
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn add(&mut self, key: &str, value: &str) {
        self.values.push((key.to_string(), value.to_string()));
    }

    /// Replace every binding of `key` with a single value.
    pub fn set(&mut self, key: &str, value: &str) {
        self.values.retain(|(k, _)| k != key);
        self.values.push((key.to_string(), value.to_string()));
    }

    pub fn remove(&mut self, key: &str) {
        self.values.retain(|(k, _)| k != key);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(k, _)| k.as_str())
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    path: Option<PathBuf>,
    sections: IndexMap<String, Section>,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> ConfigFile {
        ConfigFile { path: Some(path.into()), sections: IndexMap::new() }
    }

    /// In-memory configuration with no backing file.
    pub fn detached() -> ConfigFile {
        ConfigFile::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load (or re-load) from the backing file with no host context:
    /// `$enabled` predicates that need the host resolve as plain booleans.
    pub fn load(&mut self) -> Result<(), ConfigError> {
        self.load_with(&NullContext)
    }

    /// Load with a host context for `$loaded`/`$unloaded` predicates and
    /// `${param}` substitution in section headers and directives.
    pub fn load_with(&mut self, ctx: &dyn ConfigContext) -> Result<(), ConfigError> {
        let path = self.path.clone().ok_or(ConfigError::NoPath)?;
        self.sections.clear();
        Loader::new(self, ctx).load_file(&path, 0)?;
        Ok(())
    }

    /// Write the current content back to the backing file.
    ///
    /// Values ending in a backslash get a trailing space so a re-load does
    /// not mistake them for line continuations.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = self.path.clone().ok_or(ConfigError::NoPath)?;
        let mut out = String::new();
        for (i, (name, section)) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "[{}]", name);
            for (k, v) in section.pairs() {
                let guard = if v.ends_with('\\') { " " } else { "" };
                let _ = writeln!(out, "{}={}{}", k, v, guard);
            }
        }
        std::fs::write(&path, out).map_err(|e| {
            warn!(path = %path.display(), error = %e, "failed to save config file");
            ConfigError::Save { path: path.clone(), source: e }
        })
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        self.sections.entry(name.to_string()).or_default()
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn clear_section(&mut self, name: &str) -> bool {
        self.sections.shift_remove(name).is_some()
    }

    /// First value of `key` in `section`, or `default`.
    pub fn value<'a>(&'a self, section: &str, key: &str, default: &'a str) -> &'a str {
        self.sections.get(section).and_then(|s| s.value(key)).unwrap_or(default)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section).and_then(|s| s.value(key))
    }

    pub fn int_value(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get(section, key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
    }

    pub fn bool_value(&self, section: &str, key: &str, default: bool) -> bool {
        self.get(section, key).map(|v| parse_bool(v, default)).unwrap_or(default)
    }

    pub fn set_value(&mut self, section: &str, key: &str, value: &str) {
        self.section_mut(section).set(key, value);
    }

    pub fn clear_key(&mut self, section: &str, key: &str) {
        if let Some(s) = self.sections.get_mut(section) {
            s.remove(key);
        }
    }

    pub(crate) fn create_section(&mut self, name: &str) {
        self.sections.entry(name.to_string()).or_default();
    }

    pub(crate) fn add_value(&mut self, section: &str, key: &str, value: &str) {
        self.section_mut(section).add(key, value);
    }
}

/// Boolean strings as the engine reads them.
pub fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim() {
        "yes" | "true" | "on" | "enable" | "t" | "1" => true,
        "no" | "false" | "off" | "disable" | "f" | "0" => false,
        _ => default,
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
