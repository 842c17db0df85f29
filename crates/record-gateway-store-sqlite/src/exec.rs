use std::os::raw::c_int;
use std::time::{Duration, Instant};

use record_gateway_core::{Action, ParamValue};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Rows, Statement};
use tracing::debug;

// VM instructions between deadline checks.
const PROGRESS_CHECK_OPS: c_int = 1_000;

/// Interrupts statements on `conn` once `timeout` has elapsed.
///
/// The handler is removed when the guard drops, on every exit path.
pub(crate) struct Deadline<'c> {
    conn: &'c Connection,
}

impl<'c> Deadline<'c> {
    pub(crate) fn arm(conn: &'c Connection, timeout: Duration) -> Self {
        let expires_at = Instant::now() + timeout;
        conn.progress_handler(
            PROGRESS_CHECK_OPS,
            Some(move || Instant::now() >= expires_at),
        );
        Self { conn }
    }
}

impl Drop for Deadline<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

pub(crate) fn to_sql_value(value: &ParamValue) -> Value {
    match value {
        ParamValue::Null => Value::Null,
        ParamValue::Int(value) => Value::Integer(*value),
        ParamValue::Bool(value) => Value::Integer(i64::from(*value)),
        ParamValue::Text(value) => Value::Text(value.clone()),
    }
}

/// Runs a prepared read and hands back its row cursor.
pub(crate) fn query<'s>(
    prepared: &'s mut Statement<'_>,
    args: &[ParamValue],
) -> rusqlite::Result<Rows<'s>> {
    prepared.query(params_from_iter(args.iter().map(to_sql_value)))
}

/// Runs a prepared write and returns the generated row id.
///
/// Only inserts report an id; other writes, and statements without
/// arguments, report 0. A statement without arguments is not executed.
pub(crate) fn execute(
    conn: &Connection,
    prepared: &mut Statement<'_>,
    action: Action,
    args: &[ParamValue],
) -> rusqlite::Result<i64> {
    if args.is_empty() {
        debug!(action = %action, "no arguments bound, skipping execution");
        return Ok(0);
    }

    let affected = prepared.execute(params_from_iter(args.iter().map(to_sql_value)))?;
    let last_insert_id = if action == Action::Insert {
        conn.last_insert_rowid()
    } else {
        0
    };
    debug!(action = %action, affected, last_insert_id, "executed statement");
    Ok(last_insert_id)
}
