//! Named-parameter statement execution over scoped connections.
//!
//! # Responsibility
//! - Acquire one connection per call (one per transaction) and release it.
//! - Bind parameter maps by placeholder name.
//! - Return result rows as column-name maps.
//!
//! # Invariants
//! - Every placeholder must resolve to a key; extra keys are ignored.
//! - A transaction either commits every statement or none of them.
//! - Failures are logged with the operation name and returned as `Err`.

use super::store::Store;
use super::{DbError, DbResult};
use crate::logging::sanitize_message;
use crate::model::row::{Params, Row, SqlStatement};
use log::{debug, error};
use rusqlite::types::Value;
use rusqlite::{Connection, Statement, TransactionBehavior};
use std::collections::HashSet;
use std::time::Instant;

const MAX_LOGGED_ERROR_CHARS: usize = 240;

impl Store {
    /// Executes one write statement and commits it immediately.
    ///
    /// Returns the number of rows changed by that statement.
    pub fn execute_write(&self, sql: &str, params: &Params) -> DbResult<usize> {
        let started_at = Instant::now();
        let result = self
            .acquire()
            .and_then(|conn| execute_on(&conn, sql, params));
        observe("execute_write", started_at, result)
    }

    /// Executes one insert and returns the new row identifier.
    ///
    /// The identifier is read on the same connection as the insert, since
    /// SQLite tracks it per connection.
    pub fn execute_insert(&self, sql: &str, params: &Params) -> DbResult<i64> {
        let started_at = Instant::now();
        let result = self.acquire().and_then(|conn| {
            execute_on(&conn, sql, params)?;
            Ok(conn.last_insert_rowid())
        });
        observe("execute_insert", started_at, result)
    }

    /// Runs a read statement and returns every row in result order.
    pub fn fetch_all(&self, sql: &str, params: &Params) -> DbResult<Vec<Row>> {
        let started_at = Instant::now();
        let result = self
            .acquire()
            .and_then(|conn| query_on(&conn, sql, params, None));
        observe("fetch_all", started_at, result)
    }

    /// Runs a read statement and returns its first row, if any.
    pub fn fetch_one(&self, sql: &str, params: &Params) -> DbResult<Option<Row>> {
        let started_at = Instant::now();
        let result = self
            .acquire()
            .and_then(|conn| query_on(&conn, sql, params, Some(1)))
            .map(|rows| rows.into_iter().next());
        observe("fetch_one", started_at, result)
    }

    /// Executes statements in order on one connection and commits once.
    ///
    /// Any failing statement rolls back the whole sequence.
    pub fn run_transaction(&self, statements: &[SqlStatement]) -> DbResult<()> {
        let started_at = Instant::now();
        let result = self
            .acquire()
            .and_then(|mut conn| transaction_on(&mut conn, statements));
        observe("run_transaction", started_at, result)
    }
}

fn execute_on(conn: &Connection, sql: &str, params: &Params) -> DbResult<usize> {
    let mut stmt = conn.prepare(sql)?;
    bind_named(&mut stmt, params)?;
    Ok(stmt.raw_execute()?)
}

fn query_on(
    conn: &Connection,
    sql: &str,
    params: &Params,
    limit: Option<usize>,
) -> DbResult<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    bind_named(&mut stmt, params)?;

    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    ensure_unique_columns(&columns)?;

    let mut rows = stmt.raw_query();
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (index, name) in columns.iter().enumerate() {
            record.insert(name.clone(), row.get::<_, Value>(index)?);
        }
        records.push(record);
        if limit.is_some_and(|limit| records.len() >= limit) {
            break;
        }
    }

    Ok(records)
}

fn transaction_on(conn: &mut Connection, statements: &[SqlStatement]) -> DbResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    for (index, statement) in statements.iter().enumerate() {
        if let Err(err) = execute_on(&tx, &statement.sql, &statement.params) {
            debug!(
                "event=db_transaction module=db status=rollback statement_index={} statement_count={}",
                index,
                statements.len()
            );
            return Err(err);
        }
    }
    tx.commit()?;
    Ok(())
}

/// Binds every placeholder of `stmt` from `params` by name.
///
/// Placeholder sigils (`:`, `@`, `$`) are stripped before lookup.
fn bind_named(stmt: &mut Statement<'_>, params: &Params) -> DbResult<()> {
    for index in 1..=stmt.parameter_count() {
        let key = match stmt.parameter_name(index) {
            Some(name) if !name.starts_with('?') => name[1..].to_string(),
            _ => return Err(DbError::UnnamedParameter { index }),
        };
        let value = params
            .get(&key)
            .ok_or_else(|| DbError::MissingParameter { name: key.clone() })?;
        stmt.raw_bind_parameter(index, value)?;
    }
    Ok(())
}

fn ensure_unique_columns(columns: &[String]) -> DbResult<()> {
    let mut seen = HashSet::with_capacity(columns.len());
    for name in columns {
        if !seen.insert(name.as_str()) {
            return Err(DbError::DuplicateColumn(name.clone()));
        }
    }
    Ok(())
}

fn observe<T>(op: &'static str, started_at: Instant, result: DbResult<T>) -> DbResult<T> {
    match &result {
        Ok(_) => debug!(
            "event=db_execute module=db status=ok op={} duration_ms={}",
            op,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_execute module=db status=error op={} duration_ms={} error={}",
            op,
            started_at.elapsed().as_millis(),
            sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
        ),
    }
    result
}
