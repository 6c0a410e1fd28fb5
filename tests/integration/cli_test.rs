//! Command-line contract tests.
//!
//! These spawn the built binary, which locks itself down. On Linux hosts
//! without Landlock the binary must fail closed, so success-path assertions
//! are only made where enforcement is available or not attempted at all.

use pretty_assertions::assert_eq;
use sqlite_unsafe::sandbox;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

const BIN: &str = env!("CARGO_BIN_EXE_sqlite-unsafe");

fn run(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn run_on(path: &Path, sql: &str) -> Output {
    Command::new(BIN)
        .arg(path)
        .arg(sql)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

/// True if the binary is expected to get past lockdown on this host.
fn lockdown_succeeds() -> bool {
    sandbox::enforcement_available() || !cfg!(any(target_os = "linux", target_os = "openbsd"))
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// The diagnostic line; any log lines come before it.
fn diagnostic(output: &Output) -> String {
    stderr(output).lines().last().unwrap_or_default().to_string()
}

#[test]
fn test_wrong_argument_counts_print_usage() {
    for args in [vec![], vec!["only.db"], vec!["a.db", "SELECT 1", "extra"]] {
        let output = run(&args);

        assert_eq!(output.status.code(), Some(1), "args: {args:?}");
        assert!(output.stdout.is_empty());
        let err = stderr(&output);
        assert!(err.starts_with("usage: "), "stderr: {err}");
        assert!(err.trim_end().ends_with("file sql"), "stderr: {err}");
        assert_eq!(err.lines().count(), 1);
    }
}

#[test]
fn test_usage_does_not_create_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("untouched.db");

    let output = run(&[path.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!path.exists());
}

#[test]
fn test_help_exits_zero() {
    let output = run(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("FILE"));
}

#[test]
fn test_select_literals() {
    let dir = tempdir().unwrap();
    let output = run_on(&dir.path().join("mydb.sqlite"), "SELECT 1,NULL,'x'");

    if lockdown_succeeds() {
        assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
        assert_eq!(String::from_utf8_lossy(&output.stdout), "1||x\n");
    } else {
        assert_eq!(output.status.code(), Some(1));
        assert!(output.stdout.is_empty());
        assert!(!dir.path().join("mydb.sqlite").exists());
    }
}

#[test]
fn test_missing_table() {
    let dir = tempdir().unwrap();
    let output = run_on(&dir.path().join("mydb.sqlite"), "SELECT * FROM nosuchtable");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let err = diagnostic(&output);
    assert!(err.starts_with("sqlite-unsafe: "), "stderr: {err}");
    if lockdown_succeeds() {
        assert!(err.contains("no such table: nosuchtable"), "stderr: {err}");
    }
}

#[test]
fn test_missing_directory() {
    let output = run_on(Path::new("/no/such/dir/mydb.sqlite"), "SELECT 1");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(diagnostic(&output).starts_with("sqlite-unsafe: "));
}

#[test]
fn test_rows_persist_across_runs() {
    if !lockdown_succeeds() {
        eprintln!("Skipping test: lockdown not enforceable on this host");
        return;
    }
    let dir = tempdir().unwrap();
    let path = dir.path().join("persist.db");

    let output = run_on(&path, "CREATE TABLE t(a, b); INSERT INTO t VALUES ('a', 'b'), (NULL, 'c');");
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let output = run_on(&path, "SELECT a, b FROM t ORDER BY rowid");
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a|b\n|c\n");
}

#[test]
fn test_query_cannot_attach_outside_directory() {
    if !sandbox::enforcement_available() {
        eprintln!("Skipping test: lockdown not enforceable on this host");
        return;
    }
    // The granted temp dir would make anything under /tmp reachable.
    let other = tempfile::tempdir_in(env!("CARGO_TARGET_TMPDIR")).unwrap();
    if other.path().starts_with(sandbox::TEMP_DIR) {
        eprintln!("Skipping test: target dir is inside the granted temp dir");
        return;
    }
    let dir = tempdir().unwrap();
    let outside = other.path().join("outside.db");
    let sql = format!("ATTACH DATABASE '{}' AS o; CREATE TABLE o.t(x);", outside.display());

    let output = run_on(&dir.path().join("inside.db"), &sql);

    assert_eq!(output.status.code(), Some(1));
    assert!(!outside.exists());
}
