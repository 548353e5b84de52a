//! Request/response flows through the line protocol.

use std::path::{Path, PathBuf};

use linguist_core::config::CoreConfig;
use linguist_core::protocol::handle;
use serde_json::{json, Value};

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("croftengine_de_DE.ts")
}

fn config_in(dir: &Path) -> CoreConfig {
    CoreConfig {
        tm_path: dir.join("tm.json"),
        ..CoreConfig::default()
    }
}

fn call(config: &CoreConfig, cmd: &str, payload: Value) -> Value {
    let req = json!({ "id": cmd, "cmd": cmd, "payload": payload });
    let out = handle(&req.to_string(), config);
    let resp: Value = serde_json::from_str(&out).expect("response should be json");
    assert_eq!(resp["id"], cmd);
    resp
}

fn ok_payload(resp: Value) -> Value {
    assert_eq!(resp["status"], "ok", "unexpected error: {}", resp["message"]);
    resp["payload"].clone()
}

#[test]
fn harvest_update_and_pretranslate() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let path = fixture_path().to_string_lossy().to_string();

    let harvested = ok_payload(call(&config, "tm.harvest", json!({ "path": path })));
    assert!(harvested["entries"].as_u64().unwrap() > 0);
    assert!(config.tm_path.exists());

    let parsed = ok_payload(call(&config, "ts.parse", json!({ "path": path })));
    let doc = parsed["document"].clone();

    let updated = ok_payload(call(
        &config,
        "ts.update",
        json!({
            "document": doc,
            "messages": [
                {
                    "context": "launcher::SetupWizard",
                    "source": "Initial Setup",
                    "locations": [{ "filename": "setupwizard.cpp", "line": { "absolute": 42 } }]
                }
            ]
        }),
    ));
    assert_eq!(updated["report"]["added"], 1);
    assert_eq!(updated["report"]["kept"], 0);

    let pre = ok_payload(call(
        &config,
        "ts.pretranslate",
        json!({ "document": updated["document"] }),
    ));
    assert_eq!(pre["report"]["used_tm"], 1);

    let looked_up = ok_payload(call(
        &config,
        "ts.translate",
        json!({
            "document": pre["document"],
            "context": "launcher::SetupWizard",
            "source": "Initial Setup"
        }),
    ));
    assert_eq!(looked_up["translation"], "Initiales Setup");
}

#[test]
fn validate_and_stats_by_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let path = fixture_path().to_string_lossy().to_string();

    let validated = ok_payload(call(&config, "ts.validate", json!({ "path": path })));
    assert_eq!(validated["valid"], true);
    assert_eq!(validated["issues"].as_array().unwrap().len(), 2);

    let strict = ok_payload(call(
        &config,
        "ts.validate",
        json!({ "path": path, "strict": true }),
    ));
    assert_eq!(strict["issues"].as_array().unwrap().len(), 4);

    let stats = ok_payload(call(&config, "ts.stats", json!({ "path": path })));
    assert_eq!(stats["stats"]["total"]["finished"], 67);
    assert_eq!(
        stats["summary"],
        "Generated 67 translation(s) (67 finished and 0 unfinished)\nIgnored 6 untranslated source text(s)"
    );
}

#[test]
fn write_and_detect_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let out = dir.path().join("copy.ts");

    let written = ok_payload(call(
        &config,
        "ts.write",
        json!({ "path": fixture_path(), "output": out }),
    ));
    assert_eq!(written["messages"], 125);

    let original = std::fs::read_to_string(fixture_path()).unwrap();
    assert_eq!(std::fs::read_to_string(&out).unwrap(), original);

    let detected = ok_payload(call(&config, "encoding.detect", json!({ "path": out })));
    assert_eq!(detected["best"], "utf-8");
}

#[test]
fn write_requires_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let resp = call(&config, "ts.write", json!({ "path": fixture_path() }));
    assert_eq!(resp["status"], "error");
    assert_eq!(resp["message"], "payload.output is required");
}
