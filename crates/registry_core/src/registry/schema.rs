//! Versioned registry schema, tracked through `PRAGMA user_version`.
//!
//! # Invariants
//! - Migration versions are strictly increasing.
//! - All pending migrations apply in one transaction, or none do.

use crate::db::{DbError, DbResult, Store};
use crate::model::row::{Params, SqlStatement};
use log::info;
use rusqlite::types::Value;

/// Tables and views created by the registry schema.
pub const REGISTRY_TABLES: [&str; 6] = [
    "invoices",
    "credits_debits_notes",
    "outstanding_table",
    "logs",
    "roles",
    "daily_summary",
];

struct Migration {
    version: u32,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    statements: &[
        "CREATE TABLE IF NOT EXISTS invoices (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            invoice_number TEXT,
            vendor_name TEXT,
            date TEXT,
            due_date TEXT,
            price INTEGER
        );",
        "CREATE TABLE IF NOT EXISTS credits_debits_notes (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            invoice_id INTEGER,
            note_number TEXT,
            note_type TEXT,
            transaction_mode TEXT,
            price INTEGER,
            reason TEXT,
            FOREIGN KEY (invoice_id) REFERENCES invoices(ID) ON DELETE CASCADE
        );",
        "CREATE TABLE IF NOT EXISTS outstanding_table (
            invoice_id INTEGER,
            invoice_number TEXT,
            initial_price INTEGER,
            total_credits INTEGER DEFAULT 0,
            total_debits INTEGER DEFAULT 0,
            due_date TEXT,
            payment INTEGER,
            outstanding INTEGER
        );",
        "CREATE TABLE IF NOT EXISTS logs (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT,
            role TEXT,
            event TEXT,
            event_type TEXT,
            date INTEGER
        );",
        "CREATE TABLE IF NOT EXISTS roles (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT,
            role TEXT,
            date_of_creation TEXT,
            last_active TEXT,
            total_insertions INTEGER,
            total_deletions INTEGER,
            total_modifications INTEGER
        );",
        "CREATE VIEW IF NOT EXISTS daily_summary AS
            SELECT
                invoices.due_date AS due_date,
                COALESCE(SUM(outstanding_table.outstanding), 0) AS total_outstanding,
                COALESCE(SUM(outstanding_table.payment), 0) AS total_payment,
                COUNT(invoices.ID) AS total_invoices
            FROM invoices
            LEFT JOIN outstanding_table
                ON invoices.due_date = outstanding_table.due_date
            GROUP BY invoices.due_date;",
    ],
}];

/// Latest registry schema version known by this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies every pending registry migration to `store`.
///
/// # Errors
/// - `DbError::UnsupportedSchemaVersion` when the store is newer than this build.
/// - Any storage error; the store is then left at its previous version.
pub fn ensure_registry_schema(store: &Store) -> DbResult<()> {
    let current = current_user_version(store)?;
    let latest = latest_version();

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    if current == latest {
        return Ok(());
    }

    let mut statements = Vec::new();
    for migration in MIGRATIONS.iter().filter(|migration| migration.version > current) {
        statements.extend(
            migration
                .statements
                .iter()
                .map(|sql| SqlStatement::bare(*sql)),
        );
        statements.push(SqlStatement::bare(format!(
            "PRAGMA user_version = {};",
            migration.version
        )));
    }
    store.run_transaction(&statements)?;

    info!(
        "event=registry_migrate module=registry status=ok from_version={} to_version={}",
        current, latest
    );
    Ok(())
}

fn current_user_version(store: &Store) -> DbResult<u32> {
    let row = store.fetch_one("PRAGMA user_version;", &Params::new())?;
    match row.and_then(|row| row.get("user_version").cloned()) {
        // Out-of-range values are treated as newer than any known version.
        Some(Value::Integer(version)) => Ok(u32::try_from(version).unwrap_or(u32::MAX)),
        _ => Ok(0),
    }
}
