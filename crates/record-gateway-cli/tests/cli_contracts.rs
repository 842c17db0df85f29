#![allow(clippy::single_match_else)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;
use serde_json::Value;

fn rgw_binary_path() -> PathBuf {
    match std::env::var("CARGO_BIN_EXE_rgw") {
        Ok(value) => PathBuf::from(value),
        Err(_) => Path::new(env!("CARGO_MANIFEST_DIR")).join("../../target/debug/rgw"),
    }
}

fn fixture_path(label: &str, extension: &str) -> PathBuf {
    let nanos = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(value) => value.as_nanos(),
        Err(err) => panic!("clock before epoch: {err}"),
    };
    std::env::temp_dir().join(format!(
        "rgw-{label}-{}-{nanos}.{extension}",
        std::process::id()
    ))
}

fn fixture_db(label: &str) -> PathBuf {
    let db_path = fixture_path(label, "sqlite3");
    let output = rgw_output(&db_path, &["schema", "init"]);
    assert!(
        output.status.success(),
        "schema init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    db_path
}

fn rgw_output(db_path: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(rgw_binary_path());
    command.arg("--db").arg(db_path);
    for arg in args {
        command.arg(arg);
    }

    match command.output() {
        Ok(output) => output,
        Err(err) => panic!("failed to run rgw command {args:?}: {err}"),
    }
}

fn stdout_json(output: &Output) -> Value {
    match serde_json::from_slice::<Value>(&output.stdout) {
        Ok(value) => value,
        Err(err) => panic!(
            "failed to parse stdout as JSON: {err}\nstdout={}\nstderr={}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ),
    }
}

fn rgw_json(db_path: &Path, args: &[&str]) -> Value {
    let output = rgw_output(db_path, args);
    assert!(
        output.status.success(),
        "rgw {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    stdout_json(&output)
}

#[test]
fn help_lists_expected_subcommands() {
    let output = match Command::new(rgw_binary_path()).arg("--help").output() {
        Ok(value) => value,
        Err(err) => panic!("failed to run help command: {err}"),
    };

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for required in ["schema", "subs", "events", "workflows", "xdw", "idmap", "template"] {
        assert!(stdout.contains(required), "missing subcommand {required}");
    }
}

#[test]
fn idmap_add_then_resolve_both_directions() {
    let db_path = fixture_db("idmap");

    let added = rgw_json(&db_path, &["idmap", "add", "--user", "bob", "--lid", "A", "--mid", "B"]);
    assert!(added["id"].as_i64().unwrap_or_default() > 0);

    let mapped = rgw_json(&db_path, &["idmap", "mapped", "--user", "bob", "--lid", "A"]);
    assert_eq!(mapped["resolved"], "B");

    let local = rgw_json(&db_path, &["idmap", "local", "--user", "bob", "--mid", "B"]);
    assert_eq!(local["resolved"], "A");

    let unknown = rgw_json(&db_path, &["idmap", "mapped", "--user", "bob", "--lid", "Z"]);
    assert_eq!(unknown["resolved"], "Z");
}

#[test]
fn subscriptions_add_list_and_cancel() {
    let db_path = fixture_db("subs");
    for pathway in ["P1", "P2"] {
        let added = rgw_json(
            &db_path,
            &[
                "subs", "add", "--pathway", pathway, "--user", "ann", "--org", "RCH", "--role",
                "nurse", "--broker-ref", "ref-1",
            ],
        );
        assert!(added["id"].as_i64().unwrap_or_default() > 0);
    }

    let listed = rgw_json(&db_path, &["subs", "list", "--user", "ann"]);
    assert_eq!(listed["count"], 2);
    assert_eq!(listed["action"], "select");
    assert_eq!(listed["records"][0]["brokerref"], "ref-1");

    let remaining = rgw_json(
        &db_path,
        &[
            "subs", "cancel", "--pathway", "P1", "--user", "ann", "--org", "RCH", "--role", "nurse",
        ],
    );
    let remaining = match remaining.as_array() {
        Some(values) => values.clone(),
        None => panic!("cancel output is not an array: {remaining}"),
    };
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["pathway"], "P2");
}

#[test]
fn xdw_put_show_and_pathways() {
    let db_path = fixture_db("xdw");
    let body_path = fixture_path("xdw-body", "xml");
    if let Err(err) = std::fs::write(&body_path, "<definition/>") {
        panic!("failed to write fixture body: {err}");
    }
    let body_arg = body_path.display().to_string();

    rgw_json(&db_path, &["xdw", "put", "--name", "P1", "--file", &body_arg]);
    rgw_json(&db_path, &["xdw", "put", "--name", "P1", "--file", &body_arg, "--meta"]);
    rgw_json(&db_path, &["idmap", "add", "--lid", "P1", "--mid", "Chest Pain"]);

    let shown = rgw_json(&db_path, &["xdw", "show", "--name", "P1"]);
    assert_eq!(shown["xdw"], "<definition/>");
    assert_eq!(shown["isxdsmeta"], false);

    let meta = rgw_json(&db_path, &["xdw", "meta", "--name", "P1"]);
    assert_eq!(meta["isxdsmeta"], true);

    let pathways = rgw_json(&db_path, &["xdw", "pathways", "--user", "ann"]);
    assert_eq!(pathways["P1"], "Chest Pain");

    let missing = rgw_output(&db_path, &["xdw", "show", "--name", "P9"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("no xdw registered for P9"));
}

#[test]
fn workflows_list_filters_by_pathway() {
    let db_path = fixture_db("workflows");
    let conn = match Connection::open(&db_path) {
        Ok(conn) => conn,
        Err(err) => panic!("failed to open fixture db: {err}"),
    };
    for (pathway, version) in [("P1", 1), ("P1", 2), ("P2", 1)] {
        let inserted = conn.execute(
            "INSERT INTO workflows (pathway, nhsid, xdw_key, version) VALUES (?1, '9999999468', ?1 || '9999999468', ?2)",
            rusqlite::params![pathway, version],
        );
        if let Err(err) = inserted {
            panic!("failed to seed workflow: {err}");
        }
    }
    drop(conn);

    let listed = rgw_json(&db_path, &["workflows", "list", "--pathway", "P1"]);
    assert_eq!(listed["count"], 2);

    rgw_json(&db_path, &["workflows", "deprecate", "--xdw-key", "P29999999468"]);
    let bumped = rgw_json(&db_path, &["workflows", "list", "--pathway", "P2", "--version", "2"]);
    assert_eq!(bumped["count"], 1);
}

#[test]
fn task_notes_join_comments() {
    let db_path = fixture_db("notes");
    let conn = match Connection::open(&db_path) {
        Ok(conn) => conn,
        Err(err) => panic!("failed to open fixture db: {err}"),
    };
    for comment in ["triage done", "bloods sent"] {
        let inserted = conn.execute(
            "INSERT INTO events (pathway, nhsid, taskid, comments) VALUES ('P1', '9999999468', 0, ?1)",
            [comment],
        );
        if let Err(err) = inserted {
            panic!("failed to seed event: {err}");
        }
    }
    drop(conn);

    let notes = rgw_json(
        &db_path,
        &["events", "notes", "--pathway", "P1", "--nhs-id", "9999999468", "--task-id", "0"],
    );
    assert_eq!(notes["notes"], "triage done\nbloods sent\n");
}

#[test]
fn zero_statement_timeout_is_rejected() {
    let db_path = fixture_path("bad-config", "sqlite3");
    let output = rgw_output(&db_path, &["--statement-timeout-ms", "0", "schema", "init"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("statement_timeout"));
}
