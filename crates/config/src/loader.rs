// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The file reader behind [`ConfigFile::load`].
//!
//! Section state (current section, `$enabled` flag) is per file; the
//! current section carries across an include so included fragments can
//! extend it.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::file::{parse_bool, ConfigFile};

/// Maximum include nesting.
const MAX_DEPTH: usize = 3;

/// Host state the loader may consult from `$enabled` directives.
pub trait ConfigContext {
    fn plugin_loaded(&self, _name: &str) -> bool {
        false
    }

    /// Runtime parameter used for `${name}` substitution in headers.
    fn run_param(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Context with no loaded plugins and no runtime parameters.
pub struct NullContext;

impl ConfigContext for NullContext {}

pub(crate) struct Loader<'a> {
    cfg: &'a mut ConfigFile,
    ctx: &'a dyn ConfigContext,
    current: Option<String>,
}

impl<'a> Loader<'a> {
    pub(crate) fn new(cfg: &'a mut ConfigFile, ctx: &'a dyn ConfigContext) -> Loader<'a> {
        Loader { cfg, ctx, current: None }
    }

    pub(crate) fn load_file(&mut self, path: &Path, depth: usize) -> Result<(), ConfigError> {
        if depth > MAX_DEPTH {
            warn!(path = %path.display(), "include depth limit exceeded");
            return Err(ConfigError::TooDeep { path: path.to_path_buf() });
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            debug!(path = %path.display(), depth, error = %e, "cannot open config file");
            ConfigError::Open { path: path.to_path_buf(), source: e }
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

        let mut enabled = true;
        let mut lines = text.lines().peekable();
        while let Some(raw) = lines.next() {
            let line = raw.trim_start_matches([' ', '\t']);
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            if let Some(rest) = line.strip_prefix('[') {
                let Some(end) = rest.find(']') else {
                    continue;
                };
                let header = rest[..end].trim();
                if header.is_empty() {
                    continue;
                }
                if let Some(cond) = strip_directive(header, "$enabled") {
                    enabled = self.eval_enabled(cond, enabled);
                    continue;
                }
                if !enabled {
                    continue;
                }
                let require = strip_directive(header, "$require");
                let include = strip_directive(header, "$include");
                if let Some(target) = require.or(include) {
                    let target = self.substitute(target);
                    let resolved = resolve(path, &target);
                    let optional = require.is_none();
                    match self.load_tree(&resolved, depth, optional) {
                        Ok(()) => {}
                        Err(_) if optional => {
                            debug!(path = %resolved.display(), "optional include skipped")
                        }
                        Err(e) => {
                            warn!(path = %resolved.display(), "required include failed");
                            return Err(e);
                        }
                    }
                    continue;
                }
                let name = self.substitute(header);
                self.cfg.create_section(&name);
                self.current = Some(name);
                continue;
            }
            if !enabled {
                continue;
            }
            let (key, mut value) = match line.split_once('=') {
                Some((k, v)) => (k.trim(), v.to_string()),
                None => (line.trim(), String::new()),
            };
            if key.is_empty() {
                continue;
            }
            // Backslash continuation joins the next line, sans leading blanks.
            while value.ends_with('\\') {
                value.pop();
                match lines.next() {
                    Some(next) => value.push_str(next.trim_start_matches([' ', '\t'])),
                    None => break,
                }
            }
            let section = self.current.clone().unwrap_or_default();
            if section.is_empty() {
                debug!(key, "key outside any section ignored");
                continue;
            }
            self.cfg.add_value(&section, key, value.trim());
        }
        Ok(())
    }

    /// Include a file, or every eligible file of a directory in sorted
    /// order. With `optional` set, a failing entry is logged and skipped.
    fn load_tree(
        &mut self,
        path: &Path,
        depth: usize,
        optional: bool,
    ) -> Result<(), ConfigError> {
        if path.is_dir() {
            let mut names: Vec<PathBuf> = std::fs::read_dir(path)
                .map_err(|e| ConfigError::Open { path: path.to_path_buf(), source: e })?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| !skip_name(p))
                .collect();
            names.sort();
            for file in names {
                match self.load_file(&file, depth + 1) {
                    Ok(()) => {}
                    Err(_) if optional => {
                        debug!(path = %file.display(), "optional include skipped")
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        } else {
            match self.load_file(path, depth + 1) {
                Ok(()) => Ok(()),
                Err(_) if optional => {
                    debug!(path = %path.display(), "optional include skipped");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
    }

    fn eval_enabled(&self, cond: &str, enabled: bool) -> bool {
        let cond = cond.trim();
        if cond == "else" || cond == "toggle" {
            return !enabled;
        }
        let cond = match strip_directive(cond, "elseif") {
            Some(rest) => {
                if enabled {
                    return false;
                }
                rest
            }
            None => cond,
        };
        let cond = self.substitute(cond);
        if let Some(plugin) = strip_directive(&cond, "$loaded") {
            return self.ctx.plugin_loaded(plugin.trim());
        }
        if let Some(plugin) = strip_directive(&cond, "$unloaded") {
            return !self.ctx.plugin_loaded(plugin.trim());
        }
        parse_bool(&cond, true)
    }

    /// `${name}` substitution from the host's runtime parameters.
    fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            match rest[start + 2..].find('}') {
                None => {
                    out.push_str(&rest[start..]);
                    return out;
                }
                Some(end) => {
                    let name = rest[start + 2..start + 2 + end].trim();
                    if let Some(v) = self.ctx.run_param(name) {
                        out.push_str(&v);
                    }
                    rest = &rest[start + 2 + end + 1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// `"$require path"` → `Some("path")`; also matches the bare directive.
fn strip_directive<'t>(text: &'t str, directive: &str) -> Option<&'t str> {
    let rest = text.strip_prefix(directive)?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.starts_with([' ', '\t']).then(|| rest.trim_start_matches([' ', '\t']))
}

fn resolve(including: &Path, target: &str) -> PathBuf {
    let target_path = Path::new(target);
    if target_path.is_absolute() {
        target_path.to_path_buf()
    } else {
        including.parent().unwrap_or(Path::new("")).join(target_path)
    }
}

/// Editor leftovers and hidden files are never included from a directory.
fn skip_name(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    name.starts_with('.') || name.ends_with('~') || name.ends_with(".bak") || name.ends_with(".tmp")
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
