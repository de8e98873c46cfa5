//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against a throwaway data
//! directory and verify outputs.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "timeblock-cli", "--"])
        .args(args)
        .env("TIMEBLOCK_DATA_DIR", data_dir)
        .env_remove("TIMEBLOCK_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let stdout = run_ok(data_dir, args);
    serde_json::from_str(&stdout).expect("stdout is not JSON")
}

const HORIZON: [&str; 4] = ["--start", "2024-01-01", "--days", "21"];

fn with_horizon<'a>(op: &'a str) -> Vec<&'a str> {
    let mut args = vec![op];
    args.extend(HORIZON);
    args
}

#[test]
fn test_task_add_and_list() {
    let dir = TempDir::new().unwrap();
    let out = run_ok(
        dir.path(),
        &["task", "add", "essay", "Essay", "--minutes", "90", "--zone", "deep"],
    );
    assert!(out.contains("Task added: essay"));

    let tasks = run_json(dir.path(), &["task", "list"]);
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], "essay");
    assert_eq!(tasks[0]["energy"], "high");
    assert!(tasks[0]["status"].is_null());
}

#[test]
fn test_task_add_rejects_invalid_task() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(
        dir.path(),
        &["task", "add", "zero", "Zero", "--minutes", "0", "--zone", "deep"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_task_remove_unknown_fails() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["task", "remove", "ghost"]);
    assert_ne!(code, 0);
}

#[test]
fn test_schedule_then_clean() {
    let dir = TempDir::new().unwrap();
    run_ok(
        dir.path(),
        &["task", "add", "essay", "Essay", "--minutes", "90", "--zone", "deep"],
    );
    run_ok(
        dir.path(),
        &[
            "event", "add", "standup", "Standup",
            "--start", "2024-01-01T13:00", "--end", "2024-01-01T13:15",
        ],
    );

    let report = run_json(dir.path(), &with_horizon("schedule"));
    assert_eq!(report["operation"], "schedule");
    assert_eq!(report["counts"]["placed"], 1);
    assert_eq!(report["created"].as_array().unwrap().len(), 1);

    let managed = run_json(dir.path(), &["event", "list", "--managed"]);
    assert_eq!(managed.as_array().unwrap().len(), 1);
    assert_eq!(managed[0]["start"], "2024-01-01T08:00:00Z");

    let tasks = run_json(dir.path(), &["task", "list"]);
    assert_eq!(tasks[0]["status"], "scheduled");

    let cleaned = run_json(dir.path(), &with_horizon("clean"));
    assert_eq!(cleaned["deleted"].as_array().unwrap().len(), 1);
    let left = run_json(dir.path(), &["event", "list"]);
    assert_eq!(left.as_array().unwrap().len(), 1);
    assert_eq!(left[0]["id"], "standup");
}

#[test]
fn test_reschedule_replaces_managed_events() {
    let dir = TempDir::new().unwrap();
    run_ok(
        dir.path(),
        &[
            "task", "add", "report", "Report", "--minutes", "360", "--zone", "deep",
            "--min-chunk", "120", "--max-splits", "3",
        ],
    );

    let first = run_json(dir.path(), &with_horizon("schedule"));
    assert_eq!(first["counts"]["split"], 1);
    let second = run_json(dir.path(), &with_horizon("reschedule"));
    assert_eq!(second["deleted"], first["created"]);
    assert_eq!(second["outcomes"], first["outcomes"]);

    let events = run_json(dir.path(), &["event", "list"]);
    assert_eq!(events.as_array().unwrap().len(), 3);
}

#[test]
fn test_second_schedule_names_already_scheduled_tasks() {
    let dir = TempDir::new().unwrap();
    run_ok(
        dir.path(),
        &["task", "add", "essay", "Essay", "--minutes", "90", "--zone", "deep"],
    );
    run_ok(dir.path(), &with_horizon("schedule"));

    let (stdout, stderr, code) = run_cli(dir.path(), &with_horizon("schedule"));
    assert_eq!(code, 0);
    assert!(stderr.contains("already scheduled: essay"));
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["already_scheduled"][0], "essay");
}

#[test]
fn test_sync_reports_cycle() {
    let dir = TempDir::new().unwrap();
    run_ok(
        dir.path(),
        &["task", "add", "a", "A", "--minutes", "60", "--zone", "deep", "--depends-on", "b"],
    );
    run_ok(
        dir.path(),
        &["task", "add", "b", "B", "--minutes", "60", "--zone", "deep", "--depends-on", "a"],
    );
    let (_, stderr, code) = run_cli(dir.path(), &with_horizon("sync"));
    assert_ne!(code, 0);
    assert!(stderr.to_lowercase().contains("cycle"));
}

#[test]
fn test_partial_run_is_reported_on_stderr() {
    let dir = TempDir::new().unwrap();
    run_ok(
        dir.path(),
        &["task", "add", "huge", "Huge", "--minutes", "600", "--zone", "deep"],
    );
    let (stdout, stderr, code) = run_cli(dir.path(), &with_horizon("schedule"));
    assert_eq!(code, 0);
    assert!(stderr.contains("1 of 1 tasks could not be placed"));
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        report["outcomes"][0]["outcome"]["reason"],
        "no_window"
    );
}

#[test]
fn test_config_get_and_set() {
    let dir = TempDir::new().unwrap();
    let out = run_ok(dir.path(), &["config", "get", "planning.horizon_days"]);
    assert_eq!(out.trim(), "21");

    run_ok(dir.path(), &["config", "set", "planning.horizon_days", "28"]);
    let out = run_ok(dir.path(), &["config", "get", "planning.horizon_days"]);
    assert_eq!(out.trim(), "28");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "planning.horizon_days", "40"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_zones() {
    let dir = TempDir::new().unwrap();
    let zones = run_json(dir.path(), &["config", "zones"]);
    let zones = zones.as_array().unwrap();
    assert_eq!(zones.len(), 3);
    assert_eq!(zones[0]["zone_type"], "deep");
}
