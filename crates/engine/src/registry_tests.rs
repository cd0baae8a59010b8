// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use tempfile::TempDir;

use super::*;
use crate::host::{EngineConfig, EngineHost};
use tandem_script::Value;

fn host_for(dir: &Path) -> Arc<EngineHost> {
    EngineHost::new(EngineConfig {
        script_dir: dir.to_path_buf(),
        libs_dir: dir.join("libs"),
        ..EngineConfig::default()
    })
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[test]
fn init_runs_top_level_and_on_load() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "greet.js", "phase = \"main\"; function onLoad() { phase = \"loaded\"; }");
    let host = host_for(dir.path());
    let registry = ScriptRegistry::new(&host);
    registry.init_script("greet", "greet.js", true, true).unwrap();
    assert_eq!(registry.count(), 1);
    let ctx = registry.context_of("greet").unwrap();
    assert_eq!(ctx.get_global("phase"), Value::str("loaded"));
}

#[test]
fn unchanged_digest_skips_rebuild() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "stable.js", "boots = (boots ? boots : 0) + 1;");
    let host = host_for(dir.path());
    let registry = ScriptRegistry::new(&host);
    registry.init_script("stable", "stable.js", true, true).unwrap();
    let ctx = registry.context_of("stable").unwrap();
    registry.init_script("stable", "stable.js", true, true).unwrap();
    // Same context, same single boot.
    let again = registry.context_of("stable").unwrap();
    assert!(Arc::ptr_eq(&ctx, &again));
    assert_eq!(ctx.get_global("boots"), Value::Int(1));
}

#[test]
fn changed_file_rebuilds_with_fresh_context() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "evolve.js", "version = 1;");
    let host = host_for(dir.path());
    let registry = ScriptRegistry::new(&host);
    registry.init_script("evolve", "evolve.js", true, true).unwrap();
    let first = registry.context_of("evolve").unwrap();

    write(dir.path(), "evolve.js", "version = 2;");
    registry.init_script("evolve", "evolve.js", true, true).unwrap();
    let second = registry.context_of("evolve").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.get_global("version"), Value::Int(2));
}

#[test]
fn reload_swaps_and_runs_unload_hooks() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "hooks.js",
        "tag = \"v1\"; function onUnload() { Engine.shared.set(\"unloaded\", tag); }",
    );
    let host = host_for(dir.path());
    let registry = ScriptRegistry::new(&host);
    registry.init_script("hooks", "hooks.js", true, false).unwrap();

    write(dir.path(), "hooks.js", "tag = \"v2\";");
    registry.reload_script("hooks").unwrap();
    assert_eq!(tandem_core::SharedVars.get("unloaded").as_deref(), Some("v1"));
    assert_eq!(registry.context_of("hooks").unwrap().get_global("tag"), Value::str("v2"));
    tandem_core::SharedVars.clear("unloaded");
}

#[test]
fn parse_failure_keeps_old_script() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "frail.js", "ok = 1;");
    let host = host_for(dir.path());
    let registry = ScriptRegistry::new(&host);
    registry.init_script("frail", "frail.js", true, true).unwrap();

    write(dir.path(), "frail.js", "function ( { broken");
    assert!(registry.reload_script("frail").is_err());
    // The old incarnation survives.
    assert_eq!(registry.count(), 1);
    assert_eq!(registry.context_of("frail").unwrap().get_global("ok"), Value::Int(1));
}

#[test]
fn missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let host = host_for(dir.path());
    let registry = ScriptRegistry::new(&host);
    assert!(registry.init_script("ghost", "ghost.js", true, true).is_err());
    assert_eq!(registry.count(), 0);
}

#[test]
fn unused_config_scripts_are_retired_dynamic_kept() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "conf.js", "x = 1;");
    write(dir.path(), "dyn.js", "y = 1;");
    let host = host_for(dir.path());
    let registry = ScriptRegistry::new(&host);
    registry.init_script("conf", "conf.js", true, true).unwrap();
    registry.init_script("dyn", "dyn.js", true, false).unwrap();

    // A reload cycle that no longer declares "conf".
    registry.mark_unused();
    registry.free_unused();
    assert_eq!(registry.names(), vec!["dyn".to_string()]);

    // A cycle that re-declares keeps the script.
    registry.init_script("dyn2", "dyn.js", true, true).unwrap();
    registry.mark_unused();
    registry.init_script("dyn2", "dyn.js", true, true).unwrap();
    registry.free_unused();
    assert!(registry.names().contains(&"dyn2".to_string()));
}

#[test]
fn reload_dynamic_rebuilds_only_dynamic() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.js", "marker = \"a1\";");
    write(dir.path(), "b.js", "marker = \"b1\";");
    let host = host_for(dir.path());
    let registry = ScriptRegistry::new(&host);
    registry.init_script("a", "a.js", true, true).unwrap();
    registry.init_script("b", "b.js", true, false).unwrap();
    let a_ctx = registry.context_of("a").unwrap();
    let b_ctx = registry.context_of("b").unwrap();

    registry.reload_dynamic();
    assert!(Arc::ptr_eq(&a_ctx, &registry.context_of("a").unwrap()));
    assert!(!Arc::ptr_eq(&b_ctx, &registry.context_of("b").unwrap()));
}

#[test]
fn relative_paths_resolve_against_script_dir() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "rel.js", "z = 1;");
    let host = host_for(dir.path());
    let registry = ScriptRegistry::new(&host);
    registry.init_script("rel", "rel.js", true, true).unwrap();
    let abs = dir.path().join("rel.js");
    registry.init_script("abs", abs.to_str().unwrap(), false, true).unwrap();
    assert_eq!(registry.count(), 2);
}
