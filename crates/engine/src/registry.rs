// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The global-script registry.
//!
//! Long-lived top-level scripts, keyed by name. Identity of the loaded
//! source is a SHA-256 digest; a re-init with an unchanged digest only
//! refreshes the in-use mark, a changed one rebuilds the script. Rebuilds
//! swap atomically under the registry lock and a failed parse keeps the old
//! script alive when the host says so.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use tandem_script::{ParseError, Runner, ScriptContext, ScriptParser, Value};

use crate::binding;
use crate::host::EngineHost;
use crate::timer::TimerWorker;

struct GlobalScript {
    path: PathBuf,
    digest: [u8; 32],
    context: Arc<ScriptContext>,
    in_use: bool,
    from_config: bool,
    _timer: Arc<TimerWorker>,
}

impl GlobalScript {
    fn run_hook(&self, name: &str) {
        let has = matches!(self.context.get_global(name), Value::Func(_));
        if has {
            let mut runner = Runner::for_context(Arc::clone(&self.context), name);
            let _ = runner.call(name, Vec::new());
        }
    }
}

pub struct ScriptRegistry {
    host: Arc<EngineHost>,
    scripts: Mutex<IndexMap<String, GlobalScript>>,
}

impl ScriptRegistry {
    pub fn new(host: &Arc<EngineHost>) -> Arc<ScriptRegistry> {
        Arc::new(ScriptRegistry { host: Arc::clone(host), scripts: Mutex::new(IndexMap::new()) })
    }

    pub fn count(&self) -> usize {
        self.scripts.lock().len()
    }

    pub fn names(&self) -> Vec<String> {
        self.scripts.lock().keys().cloned().collect()
    }

    /// Context of a loaded script, for diagnostics and tests.
    pub fn context_of(&self, name: &str) -> Option<Arc<ScriptContext>> {
        self.scripts.lock().get(name).map(|s| Arc::clone(&s.context))
    }

    fn parser(&self) -> ScriptParser {
        let mut parser = ScriptParser::new();
        parser.set_libs_path(&self.host.config().libs_dir);
        parser
    }

    fn resolve(&self, file: &str, relative: bool) -> PathBuf {
        let path = Path::new(file);
        if !relative || path.is_absolute() {
            path.to_path_buf()
        } else {
            self.host.config().script_dir.join(path)
        }
    }

    /// Load or refresh a named script.
    ///
    /// An already-loaded script with an unchanged file digest is only
    /// marked in use; anything else is built anew.
    pub fn init_script(
        &self,
        name: &str,
        file: &str,
        relative: bool,
        from_config: bool,
    ) -> Result<(), ParseError> {
        let path = self.resolve(file, relative);
        let digest = file_digest(&path)?;
        {
            let mut scripts = self.scripts.lock();
            if let Some(existing) = scripts.get_mut(name) {
                if existing.digest == digest && existing.path == path {
                    debug!(script = name, "unchanged, marking in use");
                    existing.in_use = true;
                    existing.from_config |= from_config;
                    return Ok(());
                }
            }
        }
        self.build_new_script(name, &path, digest, from_config)
    }

    /// Force a rebuild from the known path.
    pub fn reload_script(&self, name: &str) -> Result<(), ParseError> {
        let (path, from_config) = {
            let scripts = self.scripts.lock();
            let Some(s) = scripts.get(name) else {
                return Err(ParseError::Unreadable {
                    file: name.to_string(),
                    reason: "not loaded".to_string(),
                });
            };
            (s.path.clone(), s.from_config)
        };
        let digest = file_digest(&path)?;
        self.build_new_script(name, &path, digest, from_config)
    }

    /// Rebuild every dynamically loaded (non config-declared) script.
    pub fn reload_dynamic(&self) {
        let dynamic: Vec<String> = self
            .scripts
            .lock()
            .iter()
            .filter(|(_, s)| !s.from_config)
            .map(|(n, _)| n.clone())
            .collect();
        for name in dynamic {
            if let Err(e) = self.reload_script(&name) {
                warn!(script = %name, error = %e, "dynamic reload failed");
            }
        }
    }

    /// Clear the in-use mark of config-declared scripts; called before a
    /// configuration reload re-declares the live set.
    pub fn mark_unused(&self) {
        for (_, script) in self.scripts.lock().iter_mut() {
            if script.from_config {
                script.in_use = false;
            }
        }
    }

    /// Retire config-declared scripts the reload did not re-declare.
    /// Dynamically loaded scripts are kept regardless.
    pub fn free_unused(&self) {
        let doomed: Vec<GlobalScript> = {
            let mut scripts = self.scripts.lock();
            let names: Vec<String> = scripts
                .iter()
                .filter(|(_, s)| s.from_config && !s.in_use)
                .map(|(n, _)| n.clone())
                .collect();
            names
                .iter()
                .filter_map(|n| {
                    info!(script = %n, "retiring global script");
                    scripts.shift_remove(n)
                })
                .collect()
        };
        for script in doomed {
            script.run_hook("onUnload");
        }
    }

    /// Parse, run and swap in a new incarnation of the script.
    fn build_new_script(
        &self,
        name: &str,
        path: &Path,
        digest: [u8; 32],
        from_config: bool,
    ) -> Result<(), ParseError> {
        let parsed = match self.parser().parse_file(path) {
            Ok(p) => p,
            Err(e) => {
                if self.host.config().keep_old_on_fail && self.scripts.lock().contains_key(name) {
                    warn!(script = name, error = %e, "parse failed, keeping old script");
                } else {
                    warn!(script = name, error = %e, "parse failed");
                    self.retire(name);
                }
                return Err(e);
            }
        };

        let context = ScriptContext::new();
        let timer = binding::install_bindings(&self.host, &context);
        let mut runner = Runner::new(Arc::clone(&parsed.code), Arc::clone(&context), name);
        let state = runner.run();
        if state != tandem_script::RunState::Succeeded {
            debug!(script = name, ?state, "top-level run did not succeed");
        }
        let fresh = GlobalScript {
            path: path.to_path_buf(),
            digest,
            context,
            in_use: true,
            from_config,
            _timer: timer,
        };
        // The new script announces itself before the old one goes away.
        fresh.run_hook("onLoad");
        let old = self.scripts.lock().insert(name.to_string(), fresh);
        if let Some(old) = old {
            old.run_hook("onUnload");
        }
        info!(script = name, path = %path.display(), "global script loaded");
        Ok(())
    }

    fn retire(&self, name: &str) {
        if let Some(old) = self.scripts.lock().shift_remove(name) {
            old.run_hook("onUnload");
        }
    }
}

fn file_digest(path: &Path) -> Result<[u8; 32], ParseError> {
    let bytes = std::fs::read(path).map_err(|e| ParseError::Unreadable {
        file: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(Sha256::digest(&bytes).into())
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
