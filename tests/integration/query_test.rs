//! Query execution integration tests.
//!
//! Drives the full open → harden → execute → close cycle against temporary
//! database files.

use pretty_assertions::assert_eq;
use sqlite_unsafe::app;
use sqlite_unsafe::cli::Invocation;
use sqlite_unsafe::db::{Database, HardeningState};
use sqlite_unsafe::query::{run_query, RowFormatter, RowVisitor};
use sqlite_unsafe::sandbox::{Lockdown, NoopRestrictor, RestrictionSet};
use std::path::Path;
use tempfile::tempdir;

fn lockdown(path: &Path) -> Lockdown {
    RestrictionSet::for_database(path)
        .unwrap()
        .commit(&mut NoopRestrictor::new())
        .unwrap()
}

/// Runs `sql` through the app entry point and returns stdout.
fn run_sql(path: &Path, sql: &str) -> Result<String, String> {
    let invocation = Invocation {
        file: path.to_path_buf(),
        sql: sql.to_string(),
    };
    let mut out = Vec::new();
    let result = app::run(&invocation, &mut NoopRestrictor::new(), &mut out);
    let stdout = String::from_utf8(out).unwrap();
    result.map(|_| stdout).map_err(|e| e.to_string())
}

#[test]
fn test_rows_and_nulls_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rt.db");

    let out = run_sql(
        &path,
        "CREATE TABLE t(a TEXT, b TEXT);
         INSERT INTO t VALUES ('a', 'b'), (NULL, 'c');
         SELECT a, b FROM t ORDER BY rowid;",
    )
    .unwrap();

    assert_eq!(out, "a|b\n|c\n");
}

#[test]
fn test_select_literals() {
    let dir = tempdir().unwrap();
    let out = run_sql(&dir.path().join("mydb.sqlite"), "SELECT 1,NULL,'x'").unwrap();
    assert_eq!(out, "1||x\n");
}

#[test]
fn test_value_rendering() {
    let dir = tempdir().unwrap();
    let out = run_sql(
        &dir.path().join("v.db"),
        "SELECT 0.5, -3, x'4142', ''",
    )
    .unwrap();
    assert_eq!(out, "0.5|-3|AB|\n");
}

#[test]
fn test_statements_without_rows_print_nothing() {
    let dir = tempdir().unwrap();
    let out = run_sql(&dir.path().join("ddl.db"), "CREATE TABLE t(x); DROP TABLE t;").unwrap();
    assert_eq!(out, "");
}

#[test]
fn test_missing_table_reports_engine_message() {
    let dir = tempdir().unwrap();
    let err = run_sql(&dir.path().join("mydb.sqlite"), "SELECT * FROM nosuchtable").unwrap_err();
    assert_eq!(err, "no such table: nosuchtable");
}

#[test]
fn test_syntax_error_reports_engine_message() {
    let dir = tempdir().unwrap();
    let err = run_sql(&dir.path().join("s.db"), "SELEC 1").unwrap_err();
    assert!(err.contains("syntax error"), "unexpected error: {err}");
}

#[test]
fn test_not_a_database() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("junk.db");
    std::fs::write(&path, vec![0x5a_u8; 4096]).unwrap();

    let err = run_sql(&path, "SELECT * FROM sqlite_master").unwrap_err();
    assert!(err.contains("not a database"), "unexpected error: {err}");
}

#[test]
fn test_missing_directory_fails_to_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("no").join("such").join("mydb.sqlite");

    let err = run_sql(&path, "SELECT 1").unwrap_err();
    assert!(err.starts_with(&path.display().to_string()), "unexpected error: {err}");
}

#[test]
fn test_constraint_violation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("c.db");
    run_sql(&path, "CREATE TABLE u(id INTEGER PRIMARY KEY, name TEXT UNIQUE); INSERT INTO u(name) VALUES ('a')").unwrap();

    let err = run_sql(&path, "INSERT INTO u(name) VALUES ('a')").unwrap_err();
    assert!(err.contains("UNIQUE constraint failed"), "unexpected error: {err}");
}

#[test]
fn test_schema_edits_allowed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("schema.db");
    run_sql(&path, "CREATE TABLE t(x)").unwrap();

    let out = run_sql(
        &path,
        "UPDATE sqlite_master SET sql = 'CREATE TABLE t(x, y)' WHERE name = 't'; SELECT sql FROM sqlite_master WHERE name = 't';",
    )
    .unwrap();
    assert_eq!(out, "CREATE TABLE t(x, y)\n");
}

struct Names(Vec<String>);

impl RowVisitor for Names {
    fn visit_row(&mut self, columns: &[&str], _fields: &[Option<&[u8]>]) {
        self.0 = columns.iter().map(|c| c.to_string()).collect();
    }
}

#[tokio::test]
async fn test_visitor_receives_column_names() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("n.db");
    let mut names = Names(Vec::new());

    run_query(&path, "SELECT 1 AS one, 2 AS two", &lockdown(&path), &mut names)
        .await
        .unwrap();

    assert_eq!(names.0, vec!["one", "two"]);
}

#[tokio::test]
async fn test_run_query_reports_row_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("count.db");
    let mut formatter = RowFormatter::new(Vec::new());

    let rows = run_query(
        &path,
        "WITH RECURSIVE c(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM c WHERE n < 5) SELECT n FROM c",
        &lockdown(&path),
        &mut formatter,
    )
    .await
    .unwrap();

    assert_eq!(rows, 5);
    assert_eq!(formatter.finish().unwrap(), b"1\n2\n3\n4\n5\n");
}

#[tokio::test]
async fn test_hardening_flags_on_open_handle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flags.db");
    let mut db = Database::open(&path, &lockdown(&path)).await.unwrap();

    db.harden().await.unwrap();
    let state = db.hardening_state().await.unwrap();

    assert_eq!(
        state,
        HardeningState {
            defensive: false,
            writable_schema: true,
        }
    );
    db.close().await.unwrap();
}
