//! Integration tests for the parcheck CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn parcheck() -> Command {
    Command::cargo_bin("parcheck").unwrap()
}

/// Test CLI binary exists and responds to --help
#[test]
fn test_cli_help() {
    parcheck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("many files at once"))
        .stdout(predicate::str::contains("worker").not());
}

/// Test CLI responds to --version
#[test]
fn test_cli_version() {
    parcheck()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("parcheck"));
}

/// Test diagnostics go to stderr and status lines to stdout
#[test]
fn test_check_reports_to_stderr() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("bad.c"), "int i = *((int*)0);\n").unwrap();
    fs::write(temp_dir.path().join("good.c"), "int j;\n").unwrap();

    parcheck()
        .current_dir(temp_dir.path())
        .args(["check", "-j", "2", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Checking "))
        .stdout(predicate::str::contains("2/2 files checked 100% done"))
        .stderr(predicate::str::contains("bad.c:1:11]: (error) Null pointer dereference: (int*)0 [nullPointer]"));
}

/// Test --error-exitcode only applies when something was reported
#[test]
fn test_error_exitcode() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("bad.c"), "int x = 1 / 0;\n").unwrap();
    fs::write(temp_dir.path().join("good.c"), "int y;\n").unwrap();

    parcheck()
        .current_dir(temp_dir.path())
        .args(["check", "-q", "--error-exitcode", "3", "bad.c"])
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("[zerodiv]"));

    parcheck()
        .current_dir(temp_dir.path())
        .args(["check", "-q", "--error-exitcode", "3", "good.c"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

/// Test --suppress and --template presets
#[test]
fn test_suppress_and_template() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("both.c"),
        "int i = *((int*)0);\nint x = 1 / 0;\n",
    )
    .unwrap();

    parcheck()
        .current_dir(temp_dir.path())
        .args(["check", "-q", "--suppress", "nullPointer", "--template", "gcc", "both.c"])
        .assert()
        .success()
        .stderr(predicate::str::contains("both.c:2:11: warning: Division by zero. [zerodiv]"))
        .stderr(predicate::str::contains("nullPointer").not());
}

/// Test an invalid job count fails before any work
#[test]
fn test_zero_jobs_rejected() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.c"), "int a;\n").unwrap();

    parcheck()
        .current_dir(temp_dir.path())
        .args(["check", "-j", "0", "a.c"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid job count 0"));
}

/// Test a missing path is an error
#[test]
fn test_missing_path() {
    parcheck()
        .args(["check", "/no/such/dir/parcheck-input.c"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path not found"));
}

/// Test the showtime summary goes to stdout once
#[test]
fn test_showtime_summary() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.c"), "int a;\n").unwrap();
    fs::write(temp_dir.path().join("b.c"), "int b;\n").unwrap();

    parcheck()
        .current_dir(temp_dir.path())
        .args(["check", "-q", "-j", "2", "--showtime", "summary", "a.c", "b.c"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nullPointer: ").count(1))
        .stdout(predicate::str::contains("Overall time: ").count(1));
}

/// Test compile database entries are checked
#[test]
fn test_project_file() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("db.c"), "int x = 4 / 0;\n").unwrap();
    let db = format!(
        r#"[{{"directory": "{}", "file": "db.c", "command": "cc -DX=1 -c db.c"}}]"#,
        temp_dir.path().display()
    );
    fs::write(temp_dir.path().join("compile_commands.json"), db).unwrap();

    parcheck()
        .current_dir(temp_dir.path())
        .args(["check", "-q", "--project", "compile_commands.json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("db.c:1:11]: (error) Division by zero. [zerodiv]"));
}

/// Test configuration file values apply to `check`
#[test]
fn test_repo_config_file() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.c"), "int x = 1 / 0;\n").unwrap();
    fs::write(
        temp_dir.path().join("parcheck.toml"),
        "jobs = 2\nsuppressions = [\"zerodiv:a.c\"]\n",
    )
    .unwrap();

    parcheck()
        .current_dir(temp_dir.path())
        .args(["check", "-q", "a.c"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

/// Test configuration commands
#[test]
fn test_config_operations() {
    let temp_dir = TempDir::new().unwrap();

    parcheck()
        .current_dir(temp_dir.path())
        .args(["config", "init"])
        .assert()
        .success();
    assert!(temp_dir.path().join("parcheck.toml").is_file());

    parcheck()
        .current_dir(temp_dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    parcheck()
        .current_dir(temp_dir.path())
        .args(["config", "validate"])
        .assert()
        .success();

    parcheck()
        .current_dir(temp_dir.path())
        .args(["config", "show", "--format", "json"])
        .env("PARCHECK_JOBS", "6")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"jobs\": 6"));
}

/// Test validate catches a bad suppression
#[test]
fn test_config_validate_bad_suppression() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("parcheck.toml"),
        "suppressions = [\"nullPointer:a.c:notanumber\"]\n",
    )
    .unwrap();

    parcheck()
        .current_dir(temp_dir.path())
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unparsable suppression"));
}

/// Test inline suppression comments apply only with --inline-suppr
#[test]
fn test_inline_suppr_flag() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("3.cpp"),
        "int f()\n{\n  // parcheck-suppress zerodiv\n  return 1 / 0;\n}\n",
    )
    .unwrap();
    fs::write(temp_dir.path().join("4.cpp"), "int g;\n").unwrap();

    for jobs in ["1", "2"] {
        parcheck()
            .current_dir(temp_dir.path())
            .args(["check", "-q", "-j", jobs, "--template", "simple", "3.cpp", "4.cpp"])
            .assert()
            .success()
            .stderr(predicate::str::contains("3.cpp:4:12: error: Division by zero. [zerodiv]"));

        parcheck()
            .current_dir(temp_dir.path())
            .args(["check", "-q", "-j", jobs, "--inline-suppr", "3.cpp", "4.cpp"])
            .assert()
            .success()
            .stderr(predicate::str::is_empty());
    }
}

/// Test an unmatched suppression alone triggers --error-exitcode
#[test]
fn test_unmatched_suppression_sets_error_exitcode() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("2.c"), "int x;\nint y;\n").unwrap();

    parcheck()
        .current_dir(temp_dir.path())
        .args([
            "check",
            "-q",
            "--template",
            "simple",
            "--report-unmatched-suppressions",
            "--suppress",
            "some_warning_id:2.c:2",
            "--error-exitcode",
            "1",
            "2.c",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "2.c:2:0: information: Unmatched suppression: some_warning_id",
        ));

    parcheck()
        .current_dir(temp_dir.path())
        .args(["check", "-q", "--suppress", "some_warning_id:2.c:2", "--error-exitcode", "1", "2.c"])
        .assert()
        .success();
}
