//! Binary-level tests that need no backend.

use assert_cmd::Command;
use predicates::prelude::*;

fn gateway() -> Command {
    let mut cmd = Command::cargo_bin("llm-gateway").unwrap_or_else(|e| unreachable!("{e}"));
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("GATEWAY_API_KEY")
        .env_remove("GATEWAY_PROVIDER")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_templates_lists_catalog() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("{e}"));
    gateway()
        .args(["templates", "--template-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("4 template(s)"))
        .stdout(predicate::str::contains("code-review"))
        .stdout(predicate::str::contains("rewrite"));
}

#[test]
fn test_templates_json_output() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("{e}"));
    gateway()
        .args(["--format", "json", "templates", "learning-plan", "--template-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id": "learning-plan""#));
}

#[test]
fn test_template_override_file_is_used() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("{e}"));
    std::fs::write(dir.path().join("rewrite.st"), "Say {text} like a {tone} pirate in {length} words.")
        .unwrap_or_else(|e| unreachable!("{e}"));
    gateway()
        .args([
            "templates",
            "rewrite",
            "--var",
            "tone=jolly",
            "--var",
            "length=10",
            "--var",
            "text=hello",
            "--template-dir",
        ])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Say hello like a jolly pirate in 10 words."));
}

#[test]
fn test_render_missing_required_variable_fails() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("{e}"));
    gateway()
        .args(["templates", "rewrite", "--var", "tone=calm", "--template-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid request"));
}

#[test]
fn test_openai_chat_without_api_key_fails() {
    gateway()
        .args(["--provider", "openai", "chat", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key missing"));
}

#[test]
fn test_unknown_structured_shape_fails() {
    gateway()
        .args(["structured", "hello", "--shape", "table"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown shape"));
}
