use assert_cmd::prelude::*;
use serde_json::Value;
use std::path::Path;
use std::process::Command;

fn scorebridge(config_dir: &Path) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("scorebridge");
    let mut cmd = Command::new(bin);
    cmd.env("SCOREBRIDGE_STORAGE_PATH", config_dir.join("storage.json"))
        .env_remove("RUST_LOG")
        .args([
            "--log-level",
            "warn",
            "--config",
            config_dir.join("missing.yaml").to_str().unwrap(),
        ]);
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("utf8 output");
    serde_json::from_str(stdout.trim()).expect("valid json")
}

#[test]
fn probe_reports_document_tier() {
    let dir = tempfile::tempdir().unwrap();
    let assert = scorebridge(dir.path())
        .args(["probe", "--page", "tests/fixtures/match_page.html", "--json"])
        .assert()
        .success();

    let value = stdout_json(assert.get_output());
    assert_eq!(value["found"], Value::Bool(true));
    assert_eq!(value["team_a"].as_str(), Some("13"));
    assert_eq!(value["team_b"].as_str(), Some("11"));
    assert_eq!(value["tier"].as_str(), Some("document"));
    assert_eq!(
        value["observe"].as_str(),
        Some(r#"[class*="FactionsDetails__Container"]"#)
    );
}

#[test]
fn probe_falls_back_to_heuristic_tier() {
    let dir = tempfile::tempdir().unwrap();
    let assert = scorebridge(dir.path())
        .args(["probe", "--page", "tests/fixtures/renamed_classes.html", "--json"])
        .assert()
        .success();

    let value = stdout_json(assert.get_output());
    assert_eq!(value["tier"].as_str(), Some("heuristic"));
    assert_eq!(value["team_a"].as_str(), Some("9"));
    assert_eq!(value["team_b"].as_str(), Some("7"));
    assert_eq!(value["observe"].as_str(), Some("body"));
}

#[test]
fn settings_persist_between_invocations() {
    let dir = tempfile::tempdir().unwrap();
    scorebridge(dir.path())
        .args(["settings", "set", "--font-size", "80", "--sound", "off"])
        .assert()
        .success();

    let assert = scorebridge(dir.path())
        .args(["settings", "show", "--json"])
        .assert()
        .success();
    let value = stdout_json(assert.get_output());
    assert_eq!(value["settings"]["font_size_px"].as_u64(), Some(80));
    assert_eq!(value["settings"]["sound_enabled"], Value::Bool(false));
    assert_eq!(value["settings"]["auto_reload_seconds"].as_u64(), Some(600));
    assert!(value["last_score"].is_null());
}

#[test]
fn watch_records_last_score() {
    let dir = tempfile::tempdir().unwrap();
    scorebridge(dir.path())
        .args([
            "watch",
            "--page",
            "tests/fixtures/match_page.html",
            "--duration",
            "400ms",
        ])
        .assert()
        .success();

    let assert = scorebridge(dir.path())
        .args(["settings", "show", "--json"])
        .assert()
        .success();
    let value = stdout_json(assert.get_output());
    assert_eq!(value["last_score"]["scoreTeam1"].as_str(), Some("13"));
    assert_eq!(value["last_score"]["scoreTeam2"].as_str(), Some("11"));
    assert_eq!(value["last_score"]["fontSize"].as_u64(), Some(60));
}

#[test]
fn info_reflects_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        "channel:\n  enabled: false\nscheduler:\n  update_interval: 250\n",
    )
    .unwrap();

    let bin = assert_cmd::cargo::cargo_bin!("scorebridge");
    let assert = Command::new(bin)
        .env("SCOREBRIDGE_STORAGE_PATH", dir.path().join("storage.json"))
        .env_remove("RUST_LOG")
        .args(["--config", config_path.to_str().unwrap(), "info"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output");
    assert!(stdout.contains("- Broadcast Channel: disabled"));
    assert!(stdout.contains("- Poll Interval: 250ms"));
    assert!(stdout.contains(&format!("- Config File: {}", config_path.display())));
}
