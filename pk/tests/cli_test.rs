//! CLI tests for the `pk` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn pk(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pk").unwrap();
    // Keep logs and history out of the real home directory
    cmd.env("HOME", home.path())
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .current_dir(home.path());
    cmd
}

#[test]
fn test_initials_command() {
    let home = TempDir::new().unwrap();
    pk(&home)
        .args(["initials", "Jane Q. Public"])
        .assert()
        .success()
        .stdout("J.Q.P\n");
}

#[test]
fn test_initials_blank_name_fails() {
    let home = TempDir::new().unwrap();
    pk(&home)
        .args(["initials", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Name is blank"));
}

#[test]
fn test_config_command_prints_defaults() {
    let home = TempDir::new().unwrap();
    pk(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("tick-interval-ms: 100"))
        .stdout(predicate::str::contains("restore-mode: all"));
}

#[test]
fn test_config_command_reads_local_file() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".pinkeep.yml"), "pins:\n  tick-interval-ms: 42\n").unwrap();
    pk(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("tick-interval-ms: 42"));
}

#[test]
fn test_simulate_command() {
    let home = TempDir::new().unwrap();
    pk(&home)
        .args(["simulate", "--step-ms", "250", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("retargeted"))
        .stdout(predicate::str::contains("backup captured"))
        .stdout(predicate::str::contains("\"initials\": \"J.Q.P\""));
}

#[test]
fn test_history_for_unknown_pin() {
    let home = TempDir::new().unwrap();
    pk(&home)
        .args(["history", "0192f0a4-5b6c-7d8e-9f01-23456789abcd", "--dir"])
        .arg(home.path().join("pins"))
        .assert()
        .success()
        .stdout(predicate::str::contains("No events recorded"));
}

#[test]
fn test_history_for_global_log() {
    let home = TempDir::new().unwrap();
    pk(&home)
        .args(["history", "_global", "--dir"])
        .arg(home.path().join("pins"))
        .assert()
        .success()
        .stdout(predicate::str::contains("No events recorded for _global"));
}

#[test]
fn test_history_rejects_path_outside_history_dir() {
    let home = TempDir::new().unwrap();
    std::fs::create_dir_all(home.path().join("x")).unwrap();
    std::fs::write(home.path().join("x").join("events.jsonl"), "").unwrap();

    for pin in ["../x", "nope", "/etc"] {
        pk(&home)
            .args(["history", pin, "--dir"])
            .arg(home.path().join("pins"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid pin id"));
    }
}
