//! CLI integration tests for dbmv.
//!
//! These tests verify argument parsing, help output, the offline
//! subcommands and exit codes for error conditions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn cmd() -> Command {
    Command::cargo_bin("dbmv").unwrap()
}

fn config_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

const VALID: &str = r#"
source:
  dialect: mssql
  host: 127.0.0.1
  port: 1
  user: sa
  password: hunter2
  schema: dbo
target:
  dialect: postgres
  host: 127.0.0.1
  port: 1
"#;

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("mapping"))
        .stdout(predicate::str::contains("check-config"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--create-all"))
        .stdout(predicate::str::contains("--apply-ddl"))
        .stdout(predicate::str::contains("--load-data"))
        .stdout(predicate::str::contains("--unload"))
        .stdout(predicate::str::contains("--trial"))
        .stdout(predicate::str::contains("--max-rows"))
        .stdout(predicate::str::contains("--translation"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dbmv"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flags_and_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"))
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

#[test]
fn test_short_config_flag() {
    cmd().args(["-c", "some_config.yaml", "--help"]).assert().success();
}

#[test]
fn test_no_subcommand_shows_usage() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_bad_load_method_is_a_usage_error() {
    cmd()
        .args(["run", "--load-method", "turbo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("turbo"));
}

// =============================================================================
// Offline Subcommands
// =============================================================================

#[test]
fn test_check_config_masks_password() {
    let file = config_file(VALID);
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "check-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("batch_size: 500"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_check_config_json() {
    let file = config_file(VALID);
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "--output-json", "check-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"max_rows\": 100000"));
}

#[test]
fn test_mapping_lists_types() {
    let file = config_file(VALID);
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "mapping"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mssql -> postgres"))
        .stdout(predicate::str::contains("VARCHAR(<PRECISION>)"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // A missing file is an IO error, not a config error
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "check-config"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let file = config_file("invalid: yaml: content: [\n");
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "check-config"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_required_fields_exits_with_code_1() {
    let file = config_file("source:\n  dialect: mssql\n");
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "check-config"])
        .assert()
        .code(1);
}

#[test]
fn test_unsupported_pair_exits_with_code_1() {
    let file = config_file(&VALID.replace("dialect: mssql", "dialect: vector"));
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "mapping"])
        .assert()
        .code(1);
}

#[test]
fn test_out_of_range_override_exits_with_code_1() {
    let file = config_file(VALID);
    cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "run",
            "--create-tables",
            "--batch-size",
            "0",
        ])
        .assert()
        .code(1);
}

#[test]
fn test_run_without_actions_exits_with_code_1() {
    let file = config_file(VALID);
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nothing to do"));
}

#[test]
fn test_unreachable_source_exits_with_code_2() {
    let file = config_file(VALID);
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run", "--create-tables"])
        .assert()
        .code(2);
}
