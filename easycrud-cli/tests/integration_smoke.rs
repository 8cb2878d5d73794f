//! Smoke tests to verify command wiring (no database needed)

use assert_cmd::Command;
use predicates::prelude::*;

fn easycrud() -> Command {
    let mut cmd = Command::cargo_bin("easycrud").unwrap();
    cmd.env_remove("EASYCRUD_CONFIG");
    cmd
}

#[test]
fn test_top_level_help_lists_commands() {
    easycrud()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("exists"))
        .stdout(predicate::str::contains("demo"));
}

// === Table Command Tests ===

#[test]
fn test_get_help() {
    easycrud()
        .arg("get")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--per-page"))
        .stdout(predicate::str::contains("--order"));
}

#[test]
fn test_update_help_warns_about_all_rows() {
    easycrud()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("no filter updates ALL rows"));
}

#[test]
fn test_insert_requires_set() {
    easycrud()
        .arg("insert")
        .arg("Users")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--set"));
}

#[test]
fn test_get_requires_table() {
    easycrud()
        .arg("get")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<TABLE>"));
}

#[test]
fn test_bad_where_is_rejected_before_connecting() {
    easycrud()
        .arg("count")
        .arg("Users")
        .arg("--where")
        .arg("novalue")
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected COL=VALUE"));
}

#[test]
fn test_bad_order_is_rejected() {
    easycrud()
        .arg("get")
        .arg("Users")
        .arg("--order")
        .arg("id:sideways")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown direction"));
}

// === Raw Query Tests ===

#[test]
fn test_query_help() {
    easycrud()
        .arg("query")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("placeholders"));
}

// === Connection Tests ===

#[test]
fn test_missing_config_file_fails() {
    easycrud()
        .arg("--config")
        .arg("/nonexistent/easycrud.toml")
        .arg("count")
        .arg("Users")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_unreachable_server_fails_cleanly() {
    easycrud()
        .env("EASYCRUD_ACQUIRE_TIMEOUT_SECS", "1")
        .args(["--host", "127.0.0.1", "--port", "1", "exists", "Users"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to acquire a database connection"));
}
