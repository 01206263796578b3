//! End-to-end tests for the `dbbrowse` binary.

use std::io::Write;
use std::process::{Command, Stdio};

fn run_dbbrowse(args: &[&str], stdin: Option<&str>) -> (i32, String, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_dbbrowse"))
        .args(args)
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");

    {
        let mut pipe = child.stdin.take().expect("stdin is piped");
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).expect("Failed to write stdin");
        }
    }

    let output = child.wait_with_output().expect("Failed to wait for command");
    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (exit_code, stdout, stderr)
}

#[test]
fn test_execute_select_text() {
    let (code, stdout, _) = run_dbbrowse(&["sqlite::memory:", "-e", "SELECT 1 AS X"], None);

    assert_eq!(code, 0);
    assert_eq!(stdout, "X\n─\n1\n(1 row)\n");
}

#[test]
fn test_execute_select_json() {
    let (code, stdout, _) = run_dbbrowse(
        &[
            "sqlite::memory:",
            "--format",
            "json",
            "-e",
            "SELECT 1 AS X, NULL AS Y",
        ],
        None,
    );

    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), r#"{"columns":["X","Y"],"rows":[["1","NULL"]]}"#);
}

#[test]
fn test_statements_from_stdin() {
    let script = "\
-- seed
CREATE TABLE dept (deptno SMALLINT, deptname VARCHAR(36))
INSERT INTO dept VALUES (20, 'PLANNING'), (10, 'SPIFFY COMPUTER SERVICE DIV.')

SELECT deptno FROM dept ORDER BY deptno
";
    let (code, stdout, stderr) =
        run_dbbrowse(&["sqlite::memory:", "--format", "json"], Some(script));

    assert_eq!(code, 0, "stderr: {stderr}");
    let last = stdout.lines().last().unwrap_or_default();
    assert_eq!(last, r#"{"columns":["deptno"],"rows":[["10"],["20"]]}"#);
}

#[test]
fn test_failed_statement_continues_and_exits_nonzero() {
    let (code, stdout, stderr) = run_dbbrowse(
        &[
            "sqlite::memory:",
            "--format",
            "json",
            "-e",
            "SELEKT 1",
            "-e",
            "SELECT 2 AS Y",
        ],
        None,
    );

    assert_eq!(code, 1);
    assert!(stderr.contains("Query error:"), "stderr: {stderr}");
    assert_eq!(stdout.trim(), r#"{"columns":["Y"],"rows":[["2"]]}"#);
}

#[test]
fn test_unavailable_driver_exits_nonzero() {
    let (code, stdout, stderr) =
        run_dbbrowse(&["db2://localhost:50000/sample", "-e", "SELECT 1"], None);

    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("No driver available"), "stderr: {stderr}");
}

#[test]
fn test_mock_db() {
    let (code, stdout, _) = run_dbbrowse(&["--mock-db", "-e", "SELECT 1"], None);

    assert_eq!(code, 0);
    assert!(stdout.contains("Mock result for: SELECT 1"));
}
