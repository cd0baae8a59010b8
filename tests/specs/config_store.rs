//! Configuration persistence specs
//!
//! Loading a saved configuration into a fresh object reproduces the
//! section and key sets.

use tempfile::TempDir;

use tandem_config::ConfigFile;

#[test]
fn load_save_load_is_stable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pbx.conf");
    std::fs::write(
        &path,
        "; main engine config\n\
         [general]\n\
         maxcalls=20\n\
         idle = 5\n\
         greeting=hello \\\n\
           operator\n\
         \n\
         [routes]\n\
         default=sip/gateway\n\
         match=^1\n\
         match=^2\n",
    )
    .unwrap();

    let mut first = ConfigFile::new(&path);
    first.load().unwrap();
    first.save().unwrap();

    let mut second = ConfigFile::new(&path);
    second.load().unwrap();

    let sections_a: Vec<&str> = first.sections().collect();
    let sections_b: Vec<&str> = second.sections().collect();
    assert_eq!(sections_a, sections_b);
    for section in sections_a {
        let keys_a: Vec<&str> = first.section(section).unwrap().keys().collect();
        let keys_b: Vec<&str> = second.section(section).unwrap().keys().collect();
        assert_eq!(keys_a, keys_b, "keys differ in [{}]", section);
    }
    // Values survive normalization too.
    assert_eq!(second.get("general", "greeting"), Some("hello operator"));
    assert_eq!(second.get("routes", "match"), Some("^1"));
}

#[test]
fn scripted_config_edit_persists() {
    use std::sync::Arc;
    use tandem_engine::{install_bindings, EngineConfig, EngineHost};
    use tandem_script::{RunState, Runner, ScriptContext, ScriptParser};

    let dir = TempDir::new().unwrap();
    let host = EngineHost::new(EngineConfig {
        config_dir: dir.path().to_path_buf(),
        ..EngineConfig::default()
    });
    let ctx = ScriptContext::new();
    let _timer = install_bindings(&host, &ctx);
    let parsed = ScriptParser::new()
        .parse_source(
            "var c = new ConfigFile(\"written\"); \
             c.setValue(\"general\", \"codec\", \"alaw\"); \
             saved = c.save();",
            "edit.js",
        )
        .unwrap();
    let mut runner = Runner::new(parsed.code, Arc::clone(&ctx), "edit");
    assert_eq!(runner.run(), RunState::Succeeded);

    let mut reread = ConfigFile::new(dir.path().join("written.conf"));
    reread.load().unwrap();
    assert_eq!(reread.get("general", "codec"), Some("alaw"));
}
