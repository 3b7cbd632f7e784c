//! Integration tests for the smartblock binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Isolated data dir and empty config for one test
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty.toml"), "").unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("smartblock").unwrap();
        cmd.env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.path().join("empty.toml"))
            .arg("--data-dir")
            .arg(self.path().join("data"))
            .arg("--offline")
            .arg("-q");
        cmd
    }
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("smartblock")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("shorten"));
}

#[test]
fn test_completions() {
    Command::cargo_bin("smartblock")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("smartblock"));
}

#[test]
fn test_refresh_installs_static_list_then_noop() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .arg("refresh")
        .assert()
        .success()
        .stdout(predicate::str::contains("10 domains compiled"))
        .stdout(predicate::str::contains("added 10"));

    sandbox
        .cmd()
        .arg("refresh")
        .assert()
        .success()
        .stdout(predicate::str::contains("already up to date"));

    sandbox
        .cmd()
        .args(["rules", "installed", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("||doubleclick.net"))
        .stdout(predicate::str::contains("9anime.to"));

    assert!(sandbox.path().join("data").join("rules.json").exists());
}

#[test]
fn test_paused_blocking_leaves_rules() {
    let sandbox = Sandbox::new();
    sandbox.cmd().arg("refresh").assert().success();

    sandbox
        .cmd()
        .args(["settings", "set", "blockingEnabled", "false"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Blocking paused"));

    sandbox
        .cmd()
        .arg("refresh")
        .assert()
        .success()
        .stdout(predicate::str::contains("Blocking is disabled"));

    sandbox
        .cmd()
        .args(["rules", "installed", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("||doubleclick.net"));
}

#[test]
fn test_unknown_setting_fails() {
    Sandbox::new()
        .cmd()
        .args(["settings", "set", "turboMode", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting"));
}

#[test]
fn test_allow_add_and_check() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["allow", "add", "https://www.news.test/story"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Blocking disabled on"));

    sandbox
        .cmd()
        .args(["allow", "check", "https://www.news.test/other"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is allowed"));

    sandbox
        .cmd()
        .args(["rules", "installed", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("news.test"));
}

#[test]
fn test_allow_after_install_reports_pending_change() {
    let sandbox = Sandbox::new();

    sandbox.cmd().arg("refresh").assert().success();

    sandbox
        .cmd()
        .args(["allow", "add", "https://www.news.test/story"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added to the allow list"))
        .stdout(predicate::str::contains("by-id"))
        .stdout(predicate::str::contains("Blocking disabled on").not());

    sandbox
        .cmd()
        .args(["rules", "installed", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("news.test").not());
}

#[test]
fn test_shorten_then_resolve() {
    let sandbox = Sandbox::new();

    let output = sandbox
        .cmd()
        .args(["shorten", "https://example.com/a/long/path"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let short = String::from_utf8(output.stdout).unwrap().trim().to_string();
    assert!(short.starts_with("https://sb.link/"));

    sandbox
        .cmd()
        .args(["resolve", &short])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.com/a/long/path"));

    sandbox
        .cmd()
        .args(["urls", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("URLs accessed:       1"));
}

#[test]
fn test_resolve_unknown_hash_fails() {
    Sandbox::new()
        .cmd()
        .args(["resolve", "deadbeef"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No live short link"));
}

#[test]
fn test_message_protocol() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["message", r#"{"type":"trackerDetected","hostname":"criteo.com"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"success":true}"#));

    sandbox
        .cmd()
        .args(["message", r#"{"type":"getPerformanceStats"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""totalBlocked":1"#));

    sandbox
        .cmd()
        .arg("message")
        .write_stdin(r#"{"type":"resolveShortUrl","hash":"00000000"}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("null"));
}

#[test]
fn test_observe_reports_trackers() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args([
            "observe",
            "https://news.test/",
            "https://www.google-analytics.com/collect",
            "https://cdn.news.test/app.js",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 2 resources were trackers"));

    sandbox
        .cmd()
        .args(["stats", "trackers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("www.google-analytics.com"));
}

#[test]
fn test_config_generate_and_validate() {
    let sandbox = Sandbox::new();
    let path = sandbox.path().join("generated.toml");

    Command::cargo_bin("smartblock")
        .unwrap()
        .env("NO_COLOR", "1")
        .arg("config")
        .arg("generate")
        .arg("--output")
        .arg(&path)
        .assert()
        .success();

    Command::cargo_bin("smartblock")
        .unwrap()
        .env("NO_COLOR", "1")
        .arg("config")
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_invalid_config_rejected() {
    let sandbox = Sandbox::new();
    let path = sandbox.path().join("bad.toml");
    std::fs::write(&path, "[host]\nmax_rules = 0\n").unwrap();

    Command::cargo_bin("smartblock")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("--offline")
        .arg("refresh")
        .assert()
        .failure();
}
