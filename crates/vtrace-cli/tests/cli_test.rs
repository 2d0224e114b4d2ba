//! Integration tests for the `vtrace` binary.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

// ==================== Helper Functions ====================

fn demos() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

fn vtrace() -> Command {
    let mut cmd = Command::cargo_bin("vtrace").expect("binary builds");
    cmd.env_remove("VTRACE_PATTERN")
        .env_remove("VTRACE_DELIMITER")
        .env_remove("VTRACE_CATALOG")
        .env_remove("RUST_LOG");
    cmd
}

// ==================== Layout ====================

#[test]
fn test_layout_demo_log_as_table() {
    vtrace()
        .arg("layout")
        .arg(demos().join("request_reply.log"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Hosts:     client, server"))
        .stdout(predicate::str::contains("Max rank:  5"))
        .stdout(predicate::str::contains("1 (client) -> 2 (server)"))
        .stdout(predicate::str::contains("3 (server) -> 4 (client)"));
}

#[test]
fn test_layout_json_output_parses() {
    let output = vtrace()
        .args(["--format", "json", "layout"])
        .arg(demos().join("request_reply.log"))
        .output()
        .expect("runs");
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let execution = &parsed["executions"][0];
    assert_eq!(execution["max_rank"], 5);
    assert_eq!(execution["edges"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_layout_from_catalog_example() {
    vtrace()
        .args(["layout", "--example", "Two-phase commit", "--execution", "abort"])
        .arg("--catalog")
        .arg(demos().join("catalog.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Execution: abort"))
        .stdout(predicate::str::contains("worker votes no"))
        .stdout(predicate::str::contains("Execution: commit").not());
}

#[test]
fn test_catalog_from_environment() {
    vtrace()
        .args(["layout", "--example", "request_reply.log", "--host", "server"])
        .env("VTRACE_CATALOG", demos().join("catalog.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("server receives request"))
        .stdout(predicate::str::contains("client starts").not())
        .stdout(predicate::str::contains("Edges: 0"));
}

#[test]
fn test_pattern_flag_overrides_default() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("govector.log");
    fs::write(&path, "a {\"a\": 1}\nhello\nb {\"a\": 1, \"b\": 1}\nworld\n").expect("write");

    vtrace()
        .arg("layout")
        .arg(&path)
        .args(["--pattern", r"(?P<host>\S*) (?P<clock>\{.*\})\n(?P<event>.*)"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"))
        .stdout(predicate::str::contains("Edges: 1"));
}

// ==================== Failures ====================

#[test]
fn test_missing_file_fails_with_message() {
    vtrace()
        .args(["layout", "/nonexistent/vtrace/run.log"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_bad_clock_reports_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.log");
    fs::write(&path, "ok\na {\"a\": 1}\nbroken\na {\"a\": x}\n").expect("write");

    vtrace()
        .arg("layout")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 3"));
}

#[test]
fn test_lenient_flag_accepts_truncated_log() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("cut.log");
    fs::write(&path, "recv\nb {\"a\": 4, \"b\": 1}\n").expect("write");

    vtrace().arg("layout").arg(&path).assert().failure();
    vtrace()
        .arg("layout")
        .arg(&path)
        .arg("--lenient")
        .assert()
        .success()
        .stdout(predicate::str::contains("Edges: 0"));
}

// ==================== Examples ====================

#[test]
fn test_examples_lists_catalog_in_order() {
    vtrace()
        .arg("examples")
        .arg("--catalog")
        .arg(demos().join("catalog.json"))
        .assert()
        .success()
        .stdout(
            predicate::str::is_match(r"(?s)Request/reply.*Two-phase commit").expect("regex"),
        )
        .stdout(predicate::str::contains("Total: 2 example(s)"));
}

#[test]
fn test_examples_without_catalog_fails() {
    vtrace()
        .arg("examples")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no catalog given"));
}
