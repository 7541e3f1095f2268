//! Generic CRUD contract and SQLite implementation.
//!
//! # Responsibility
//! - Offer create/read/update/delete over any table, driven by column maps.
//! - Introspect live table schema and derive primary keys.
//!
//! # Invariants
//! - Inputs are validated before any statement is built: empty maps,
//!   malformed identifiers and unknown tables/columns are rejected.
//! - Schema is fetched on every call and never cached.
//! - Storage failures surface as `CrudError::Db`, distinct from "no rows".

use super::sql_builder::{ensure_identifier, StatementBuilder};
use crate::db::{DbError, Store};
use crate::logging::sanitize_message;
use crate::model::row::{Params, Row, SqlStatement};
use crate::model::schema::{ColumnDescriptor, PrimaryKey};
use log::{debug, warn};
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

const TABLE_INFO_SQL: &str = "SELECT
    cid AS position,
    name,
    type AS declared_type,
    \"notnull\" AS not_null,
    dflt_value AS default_value,
    pk AS primary_key_position
FROM pragma_table_info(:table)
ORDER BY cid;";

const MAX_LOGGED_ERROR_CHARS: usize = 240;

pub type CrudResult<T> = Result<T, CrudError>;

/// Caller input rejected before statement construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrudValidationError {
    /// `create` needs at least one column value.
    EmptyData,
    /// `update` needs at least one column to set.
    EmptyUpdates,
    /// `update`/`delete` refuse to touch every row.
    EmptyConditions,
    InvalidIdentifier(String),
    /// Two keys name the same column.
    DuplicateColumn(String),
}

impl Display for CrudValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyData => write!(f, "insert data must contain at least one column"),
            Self::EmptyUpdates => write!(f, "update must set at least one column"),
            Self::EmptyConditions => {
                write!(f, "conditions must contain at least one column")
            }
            Self::InvalidIdentifier(name) => write!(f, "invalid identifier `{name}`"),
            Self::DuplicateColumn(name) => write!(f, "column `{name}` given more than once"),
        }
    }
}

impl Error for CrudValidationError {}

/// Error for generic CRUD and schema operations.
#[derive(Debug)]
pub enum CrudError {
    Validation(CrudValidationError),
    UnknownTable(String),
    UnknownColumn { table: String, column: String },
    /// Introspection row could not be decoded.
    InvalidData(String),
    Db(DbError),
}

impl Display for CrudError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UnknownTable(table) => write!(f, "unknown table `{table}`"),
            Self::UnknownColumn { table, column } => {
                write!(f, "table `{table}` has no column `{column}`")
            }
            Self::InvalidData(message) => write!(f, "invalid schema data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CrudError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::UnknownTable(_) => None,
            Self::UnknownColumn { .. } => None,
            Self::InvalidData(_) => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<CrudValidationError> for CrudError {
    fn from(value: CrudValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for CrudError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Table-agnostic data access surface for application callers.
pub trait CrudRepository {
    /// Inserts one row and returns its row identifier.
    fn create(&self, table: &str, data: &Row) -> CrudResult<i64>;
    /// Returns rows whose columns equal every filter value.
    fn read(&self, table: &str, filters: Option<&Row>) -> CrudResult<Vec<Row>>;
    /// Sets `updates` on rows matching every condition; returns the count.
    fn update(&self, table: &str, updates: &Row, conditions: &Row) -> CrudResult<usize>;
    /// Deletes rows matching every condition; returns the count.
    fn delete(&self, table: &str, conditions: &Row) -> CrudResult<usize>;
    /// Live column descriptors in column order.
    fn table_schema(&self, table: &str) -> CrudResult<Vec<ColumnDescriptor>>;
    fn primary_key(&self, table: &str) -> CrudResult<PrimaryKey>;
}

/// CRUD over one `Store`.
pub struct SqliteCrud<'store> {
    store: &'store Store,
}

impl<'store> SqliteCrud<'store> {
    pub fn new(store: &'store Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'store Store {
        self.store
    }

    /// Builds, without executing, the insert `create` would run.
    pub fn insert_statement(&self, table: &str, data: &Row) -> CrudResult<SqlStatement> {
        if data.is_empty() {
            return Err(CrudValidationError::EmptyData.into());
        }
        let columns = load_schema(self.store, table)?;
        StatementBuilder::new(table, &columns)?.insert(data)
    }

    /// Builds, without executing, the statement `update` would run.
    pub fn update_statement(
        &self,
        table: &str,
        updates: &Row,
        conditions: &Row,
    ) -> CrudResult<SqlStatement> {
        if updates.is_empty() {
            return Err(CrudValidationError::EmptyUpdates.into());
        }
        if conditions.is_empty() {
            return Err(CrudValidationError::EmptyConditions.into());
        }
        let columns = load_schema(self.store, table)?;
        StatementBuilder::new(table, &columns)?.update(updates, conditions)
    }

    /// Builds, without executing, the statement `delete` would run.
    pub fn delete_statement(&self, table: &str, conditions: &Row) -> CrudResult<SqlStatement> {
        if conditions.is_empty() {
            return Err(CrudValidationError::EmptyConditions.into());
        }
        let columns = load_schema(self.store, table)?;
        StatementBuilder::new(table, &columns)?.delete(conditions)
    }

    /// Runs previously built statements as one all-or-nothing transaction.
    pub fn apply_batch(&self, statements: &[SqlStatement]) -> CrudResult<()> {
        let result = self.store.run_transaction(statements).map_err(CrudError::from);
        observe("apply_batch", "*", result)
    }
}

impl CrudRepository for SqliteCrud<'_> {
    fn create(&self, table: &str, data: &Row) -> CrudResult<i64> {
        let result = self.insert_statement(table, data).and_then(|statement| {
            Ok(self
                .store
                .execute_insert(&statement.sql, &statement.params)?)
        });
        observe("create", table, result)
    }

    fn read(&self, table: &str, filters: Option<&Row>) -> CrudResult<Vec<Row>> {
        let result = load_schema(self.store, table).and_then(|columns| {
            let statement = StatementBuilder::new(table, &columns)?.select(filters)?;
            Ok(self.store.fetch_all(&statement.sql, &statement.params)?)
        });
        observe("read", table, result)
    }

    fn update(&self, table: &str, updates: &Row, conditions: &Row) -> CrudResult<usize> {
        let result = self
            .update_statement(table, updates, conditions)
            .and_then(|statement| {
                Ok(self
                    .store
                    .execute_write(&statement.sql, &statement.params)?)
            });
        observe("update", table, result)
    }

    fn delete(&self, table: &str, conditions: &Row) -> CrudResult<usize> {
        let result = self
            .delete_statement(table, conditions)
            .and_then(|statement| {
                Ok(self
                    .store
                    .execute_write(&statement.sql, &statement.params)?)
            });
        observe("delete", table, result)
    }

    fn table_schema(&self, table: &str) -> CrudResult<Vec<ColumnDescriptor>> {
        observe("table_schema", table, load_schema(self.store, table))
    }

    fn primary_key(&self, table: &str) -> CrudResult<PrimaryKey> {
        let result =
            load_schema(self.store, table).map(|columns| PrimaryKey::from_columns(&columns));
        observe("primary_key", table, result)
    }
}

fn load_schema(store: &Store, table: &str) -> CrudResult<Vec<ColumnDescriptor>> {
    ensure_identifier(table)?;
    let mut params = Params::new();
    params.insert("table".to_string(), Value::Text(table.to_string()));

    let rows = store.fetch_all(TABLE_INFO_SQL, &params)?;
    if rows.is_empty() {
        return Err(CrudError::UnknownTable(table.to_string()));
    }
    rows.iter().map(parse_column_row).collect()
}

fn parse_column_row(row: &Row) -> CrudResult<ColumnDescriptor> {
    let primary_key_position = integer_field(row, "primary_key_position")?;
    let primary_key_position = u32::try_from(primary_key_position).map_err(|_| {
        CrudError::InvalidData(format!(
            "invalid primary key position `{primary_key_position}`"
        ))
    })?;

    let default_value = match row.get("default_value") {
        None | Some(Value::Null) => None,
        Some(Value::Text(text)) => Some(text.clone()),
        Some(Value::Integer(value)) => Some(value.to_string()),
        Some(Value::Real(value)) => Some(value.to_string()),
        Some(Value::Blob(_)) => {
            return Err(CrudError::InvalidData(
                "blob default value in table_info".to_string(),
            ))
        }
    };

    Ok(ColumnDescriptor {
        position: integer_field(row, "position")?,
        name: text_field(row, "name")?,
        declared_type: text_field(row, "declared_type")?,
        not_null: integer_field(row, "not_null")? != 0,
        default_value,
        primary_key_position,
    })
}

fn integer_field(row: &Row, name: &str) -> CrudResult<i64> {
    match row.get(name) {
        Some(Value::Integer(value)) => Ok(*value),
        other => Err(CrudError::InvalidData(format!(
            "expected integer `{name}`, got {other:?}"
        ))),
    }
}

fn text_field(row: &Row, name: &str) -> CrudResult<String> {
    match row.get(name) {
        Some(Value::Text(value)) => Ok(value.clone()),
        other => Err(CrudError::InvalidData(format!(
            "expected text `{name}`, got {other:?}"
        ))),
    }
}

fn observe<T>(op: &'static str, table: &str, result: CrudResult<T>) -> CrudResult<T> {
    match &result {
        Ok(_) => {}
        // Storage failures are already logged at error level by the executor.
        Err(CrudError::Db(err)) => debug!(
            "event=crud_op module=repo status=error op={} table={} error={}",
            op,
            sanitize_message(table, MAX_LOGGED_ERROR_CHARS),
            sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
        ),
        Err(err) => warn!(
            "event=crud_op module=repo status=rejected op={} table={} error={}",
            op,
            sanitize_message(table, MAX_LOGGED_ERROR_CHARS),
            sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
        ),
    }
    result
}
