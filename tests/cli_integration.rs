// CLI integration tests: real case directories, real dynamic loading of the echo solver fixture.
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

const RECORD_SEPARATOR: char = '\u{1e}';

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_solver-harness");
    let mut command = Command::new(exe);
    command.env_remove("RUST_LOG");
    command
}

fn write_cases(dir: &Path, cases: &[(&str, &str)]) {
    fs::create_dir_all(dir).expect("cases dir");
    for (name, content) in cases {
        fs::write(dir.join(name), content).expect("write case");
    }
}

fn last_stderr_json(output: &Output) -> Value {
    let text = String::from_utf8_lossy(&output.stderr);
    let line = text
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .expect("stderr line");
    serde_json::from_str(line).expect("valid json")
}

/// Contents the fixture received, in call order. Empty when it was never called.
fn submissions(log: &Path) -> Vec<String> {
    let Ok(text) = fs::read_to_string(log) else {
        return Vec::new();
    };
    text.split(RECORD_SEPARATOR)
        .filter(|record| !record.is_empty())
        .map(str::to_string)
        .collect()
}

fn progress_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| line.starts_with("Processing: "))
        .map(str::to_string)
        .collect()
}

macro_rules! fixture_or_skip {
    ($var:literal) => {
        match option_env!($var) {
            Some(path) => path,
            None => {
                eprintln!("{} not built; skipping", $var);
                return;
            }
        }
    };
}

#[test]
fn two_cases_are_submitted_in_order_with_exact_content() {
    let library = fixture_or_skip!("SOLVER_HARNESS_ECHO_SOLVER");
    let temp = tempfile::tempdir().expect("tempdir");
    let cases = temp.path().join("cases");
    let log = temp.path().join("calls.log");
    write_cases(&cases, &[("case2.json", "{\"x\":2}"), ("case1.json", "{\"x\":1}")]);

    let output = cmd()
        .args(["--cases-dir", cases.to_str().unwrap(), "--library", library])
        .args(["--color", "never"])
        .env("ECHO_SOLVER_LOG", &log)
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(submissions(&log), vec!["{\"x\":1}", "{\"x\":2}"]);
    assert_eq!(
        progress_lines(&output),
        vec!["Processing: case1.json", "Processing: case2.json"]
    );

    // Each solver line follows the progress line of its own case.
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().filter(|line| !line.is_empty()).collect();
    assert!(lines[0].starts_with("=== Running cases with "));
    assert_eq!(
        &lines[1..],
        &[
            "Processing: case1.json",
            "{\"received_bytes\": 7}",
            "Processing: case2.json",
            "{\"received_bytes\": 7}",
        ]
    );
}

#[test]
fn missing_library_prints_hint_and_exits_one() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cases = temp.path().join("cases");
    let log = temp.path().join("calls.log");
    write_cases(&cases, &[("case1.json", "{\"x\":1}")]);
    let library = temp.path().join("build").join("libgradesolver_api.so");

    let output = cmd()
        .args(["--cases-dir", cases.to_str().unwrap()])
        .args(["--library", library.to_str().unwrap()])
        .env("ECHO_SOLVER_LOG", &log)
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(1));
    assert!(progress_lines(&output).is_empty());
    assert!(submissions(&log).is_empty());

    let err = last_stderr_json(&output);
    let inner = err.get("error").expect("error object");
    assert_eq!(inner["kind"], "LibraryLoad");
    assert!(inner["hint"].as_str().expect("hint").contains("not be built"));
    assert!(inner["path"].as_str().expect("path").ends_with("libgradesolver_api.so"));
}

#[test]
fn missing_case_directory_exits_after_loading_library() {
    let library = fixture_or_skip!("SOLVER_HARNESS_ECHO_SOLVER");
    let temp = tempfile::tempdir().expect("tempdir");
    let log = temp.path().join("calls.log");
    let missing = temp.path().join("no-cases");

    let output = cmd()
        .args(["--cases-dir", missing.to_str().unwrap(), "--library", library])
        .args(["--color", "never"])
        .env("ECHO_SOLVER_LOG", &log)
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(3));
    // Banner proves the library was loaded first; nothing was submitted.
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== Running cases with "));
    assert!(progress_lines(&output).is_empty());
    assert!(submissions(&log).is_empty());

    let err = last_stderr_json(&output);
    assert_eq!(err["error"]["kind"], "DirectoryNotFound");
    assert!(err["error"]["hint"].as_str().expect("hint").contains("--cases-dir"));
}

#[test]
fn missing_export_is_load_error_and_alternate_symbol_works() {
    let library = fixture_or_skip!("SOLVER_HARNESS_ALT_SYMBOL_SOLVER");
    let temp = tempfile::tempdir().expect("tempdir");
    let cases = temp.path().join("cases");
    let log = temp.path().join("calls.log");
    write_cases(&cases, &[("case1.json", "{\"x\":1}")]);

    let output = cmd()
        .args(["--cases-dir", cases.to_str().unwrap(), "--library", library])
        .env("ECHO_SOLVER_LOG", &log)
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    let err = last_stderr_json(&output);
    assert_eq!(err["error"]["kind"], "LibraryLoad");
    assert!(err["error"]["hint"].as_str().expect("hint").contains("--symbol"));
    assert!(submissions(&log).is_empty());

    let output = cmd()
        .args(["--cases-dir", cases.to_str().unwrap(), "--library", library])
        .args(["--symbol", "solve_json_api", "--color", "never"])
        .env("ECHO_SOLVER_LOG", &log)
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(submissions(&log), vec!["{\"x\":1}"]);
}

#[cfg(unix)]
#[test]
fn faulting_case_ends_the_run_without_isolation() {
    let library = fixture_or_skip!("SOLVER_HARNESS_ECHO_SOLVER");
    let temp = tempfile::tempdir().expect("tempdir");
    let cases = temp.path().join("cases");
    let log = temp.path().join("calls.log");
    write_cases(
        &cases,
        &[("a.json", "{}"), ("b.json", "{\"__abort__\":1}"), ("c.json", "{}")],
    );

    let output = cmd()
        .args(["--cases-dir", cases.to_str().unwrap(), "--library", library])
        .args(["--color", "never"])
        .env("ECHO_SOLVER_LOG", &log)
        .output()
        .expect("run");

    assert!(!output.status.success());
    assert_eq!(submissions(&log), vec!["{}", "{\"__abort__\":1}"]);
}

#[cfg(unix)]
#[test]
fn isolated_run_reports_fault_and_finishes_remaining_cases() {
    let library = fixture_or_skip!("SOLVER_HARNESS_ECHO_SOLVER");
    let temp = tempfile::tempdir().expect("tempdir");
    let cases = temp.path().join("cases");
    let log = temp.path().join("calls.log");
    write_cases(
        &cases,
        &[("a.json", "{}"), ("b.json", "{\"__abort__\":1}"), ("c.json", "{}")],
    );

    let output = cmd()
        .args(["--cases-dir", cases.to_str().unwrap(), "--library", library])
        .args(["--isolate", "--color", "never"])
        .env("ECHO_SOLVER_LOG", &log)
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(4));
    assert_eq!(submissions(&log), vec!["{}", "{\"__abort__\":1}", "{}"]);
    assert_eq!(
        progress_lines(&output),
        vec!["Processing: a.json", "Processing: b.json", "Processing: c.json"]
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("fault: b.json"));
    assert!(stdout.contains("Submitted 3 of 3 cases, 1 faulted"));

    let err = last_stderr_json(&output);
    assert_eq!(err["error"]["kind"], "BoundaryFault");
    assert_eq!(err["error"]["message"], "1 of 3 cases faulted: b.json");

    // The fault warning is logged, but stderr is not a terminal.
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("WARN"));
    assert!(!stderr.contains('\u{1b}'));
}

#[test]
fn isolated_run_accepts_cases_dir_starting_with_hyphen() {
    let library = fixture_or_skip!("SOLVER_HARNESS_ECHO_SOLVER");
    let temp = tempfile::tempdir().expect("tempdir");
    let log = temp.path().join("calls.log");
    write_cases(&temp.path().join("-c"), &[("a.json", "{\"x\":1}")]);

    let output = cmd()
        .current_dir(temp.path())
        .args(["--cases-dir=-c", "--library", library])
        .args(["--isolate", "--color", "never"])
        .env("ECHO_SOLVER_LOG", &log)
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(submissions(&log), vec!["{\"x\":1}"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Submitted 1 of 1 cases, 0 faulted"));
}

#[test]
fn nul_byte_case_is_boundary_fault_and_stops_the_run() {
    let library = fixture_or_skip!("SOLVER_HARNESS_ECHO_SOLVER");
    let temp = tempfile::tempdir().expect("tempdir");
    let cases = temp.path().join("cases");
    let log = temp.path().join("calls.log");
    write_cases(
        &cases,
        &[("a.json", "{}"), ("nul.json", "{\"x\":\u{0}}"), ("z.json", "{}")],
    );

    let output = cmd()
        .args(["--cases-dir", cases.to_str().unwrap(), "--library", library])
        .args(["--color", "never"])
        .env("ECHO_SOLVER_LOG", &log)
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(4));
    assert_eq!(submissions(&log), vec!["{}"]);
    let err = last_stderr_json(&output);
    assert_eq!(err["error"]["kind"], "BoundaryFault");
    assert_eq!(err["error"]["case"], "nul.json");
    assert!(err["error"]["hint"].as_str().expect("hint").contains("--isolate"));
}

#[test]
fn list_prints_sorted_cases_without_loading_library() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cases = temp.path().join("cases");
    write_cases(&cases, &[("b.json", "{}"), ("a.json", "{}"), ("c.txt", "")]);

    let output = cmd()
        .args(["--cases-dir", cases.to_str().unwrap()])
        .args(["--library", temp.path().join("missing.so").to_str().unwrap()])
        .arg("--list")
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a.json\nb.json\n");
}

#[test]
fn filter_selects_matching_cases() {
    let library = fixture_or_skip!("SOLVER_HARNESS_ECHO_SOLVER");
    let temp = tempfile::tempdir().expect("tempdir");
    let cases = temp.path().join("cases");
    let log = temp.path().join("calls.log");
    write_cases(
        &cases,
        &[("grades_a.json", "{\"a\":1}"), ("other.json", "{}"), ("grades_b.json", "{\"b\":1}")],
    );

    let output = cmd()
        .args(["--cases-dir", cases.to_str().unwrap(), "--library", library])
        .args(["--filter", "grades", "--color", "never"])
        .env("ECHO_SOLVER_LOG", &log)
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(submissions(&log), vec!["{\"a\":1}", "{\"b\":1}"]);
}

#[test]
fn unknown_flag_is_usage_error() {
    let output = cmd().arg("--bogus").output().expect("run");
    assert_eq!(output.status.code(), Some(2));
    let err = last_stderr_json(&output);
    assert_eq!(err["error"]["kind"], "Usage");
}
