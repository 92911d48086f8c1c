use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

/// A command isolated from the user's configuration and usage database
fn cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("interlinear").unwrap();
    cmd.current_dir(dir)
        .env_remove("INTERLINEAR_API_KEY")
        .env_remove("INTERLINEAR_CONFIG")
        .env_remove("INTERLINEAR_QUOTA_DB")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(dir.join("config.toml"))
        .arg("--quota-db")
        .arg(dir.join("quota.redb"));
    cmd
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("page"))
        .stdout(contains("usage"))
        .stdout(contains("set-key"));
}

#[test]
fn fresh_usage_is_zero() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path())
        .arg("usage")
        .assert()
        .success()
        .stdout(contains("0/500000"));
}

#[test]
fn usage_persists_between_runs() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path())
        .args(["message", r#"{"action":"updateCharacterCount","count":7}"#])
        .assert()
        .success()
        .stdout(contains(r#"{"success":true}"#));

    cmd(dir.path())
        .arg("usage")
        .assert()
        .success()
        .stdout(contains("7/500000"));
}

#[test]
fn invalid_message_reports_error() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path())
        .args(["message", "{not json"])
        .assert()
        .success()
        .stdout(contains("error"));
}

#[test]
fn set_key_writes_config_file() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path()).args(["set-key", "secret-key"]).assert().success();

    let saved = fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(saved.contains(r#"api_key = "secret-key""#), "{saved}");
}

#[test]
fn text_without_key_fails() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path())
        .args(["text", "Hello", "world"])
        .assert()
        .failure()
        .stderr(contains("API key is not configured"));
}

#[test]
fn page_without_eligible_text_is_copied() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.html");
    let output = dir.path().join("output.html");
    fs::write(&input, "<html><body><p>42%</p><code>let value</code></body></html>").unwrap();

    cmd(dir.path())
        .arg("page")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stderr(contains("No translatable text found"));

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("<p>42%</p>"));
    assert!(!written.contains("translation-container"));
}

#[test]
fn hover_needs_an_existing_element() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.html");
    fs::write(&input, "<html><body><p id=\"intro\">Hello world</p></body></html>").unwrap();

    cmd(dir.path())
        .arg("hover")
        .arg(&input)
        .args(["--id", "missing"])
        .assert()
        .failure()
        .stderr(contains("no element with id 'missing'"));
}

#[test]
fn missing_input_file_fails() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path())
        .args(["page", "does-not-exist.html"])
        .assert()
        .failure()
        .stderr(contains("could not read does-not-exist.html"));
}
