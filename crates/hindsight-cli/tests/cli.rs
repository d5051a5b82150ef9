use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn hindsight(memory: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hindsight").unwrap();
    cmd.env_remove("HINDSIGHT_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--memory")
        .arg(memory);
    cmd
}

fn write_run(dir: &Path, id: &str, failing: &str, fix: &str) -> PathBuf {
    let path = dir.join(format!("{id}.json"));
    let json = serde_json::json!({
        "instance_id": id,
        "repo": "org/calc",
        "success": true,
        "problem_statement": "Fix TypeError in add()",
        "steps": [
            {"action": "open", "observation": "opened calc.py"},
            {"action": failing, "observation": "TypeError: can only concatenate str (not \"int\") to str"},
            {"action": fix, "observation": "edited"},
            {"action": "submit", "observation": "submitted"}
        ]
    });
    std::fs::write(&path, json.to_string()).unwrap();
    path
}

#[test]
fn test_learn_then_stats() {
    let tmp = TempDir::new().unwrap();
    let memory = tmp.path().join("memory.json");
    let run = write_run(tmp.path(), "calc-1", "run", "edit");

    hindsight(&memory)
        .arg("learn")
        .arg(&run)
        .assert()
        .success()
        .stdout(predicate::str::contains("Learned calc-1: 3 fragment(s)"));
    assert!(memory.exists());

    hindsight(&memory)
        .arg("learn")
        .arg(&run)
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped calc-1 (already learned)"));

    hindsight(&memory)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Trajectories:   1"))
        .stdout(predicate::str::contains("TypeError: 1"));
}

#[test]
fn test_scheduled_consolidation_creates_methodology() {
    let tmp = TempDir::new().unwrap();
    let memory = tmp.path().join("memory.json");
    let config = tmp.path().join("hindsight.json");
    std::fs::write(&config, r#"{"consolidate_every": 2}"#).unwrap();

    hindsight(&memory)
        .arg("--config")
        .arg(&config)
        .arg("learn")
        .arg(write_run(tmp.path(), "calc-1", "run", "edit"))
        .arg(write_run(tmp.path(), "calc-2", "pytest", "patch"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Methodologies created: 1"));

    hindsight(&memory)
        .args(["query", "--task", "fix add", "--phase", "fixing"])
        .args(["--error", "TypeError: unsupported operand"])
        .assert()
        .success()
        .stdout(predicate::str::contains("when encountering TypeError"));
}

#[test]
fn test_query_empty_memory() {
    let tmp = TempDir::new().unwrap();
    let memory = tmp.path().join("missing.json");

    hindsight(&memory)
        .args(["query", "--task", "add a flag"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No relevant memories."));
    assert!(!memory.exists());

    hindsight(&memory)
        .args(["query", "--task", "fix", "--error", "KeyError: 'name'"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Warnings:"));
}

#[test]
fn test_invalid_phase_is_rejected() {
    let tmp = TempDir::new().unwrap();
    hindsight(&tmp.path().join("memory.json"))
        .args(["query", "--task", "fix", "--phase", "napping"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --phase"));
}

#[test]
fn test_check_loop() {
    let tmp = TempDir::new().unwrap();
    let memory = tmp.path().join("memory.json");
    let state = serde_json::json!({
        "task_description": "fix import",
        "phase": "fixing",
        "last_action": "edit",
        "current_error": "ImportError: cannot import name 'quux' from 'pkg'"
    });
    let states = tmp.path().join("states.json");
    std::fs::write(&states, serde_json::json!([state, state, state, state]).to_string()).unwrap();

    hindsight(&memory)
        .arg("check-loop")
        .arg(&states)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Loop detected"));

    hindsight(&memory)
        .args(["--format", "json", "check-loop"])
        .arg(&states)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"repeat_count\": 4"));
}

#[test]
fn test_consolidate_json() {
    let tmp = TempDir::new().unwrap();
    hindsight(&tmp.path().join("memory.json"))
        .args(["--format", "json", "consolidate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"methodologies_created\": 0"));
}

#[test]
fn test_learn_rejects_unknown_format() {
    let tmp = TempDir::new().unwrap();
    let bogus = tmp.path().join("notes.json");
    std::fs::write(&bogus, r#"{"hello": "world"}"#).unwrap();

    hindsight(&tmp.path().join("memory.json"))
        .arg("learn")
        .arg(&bogus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to import"));
}
