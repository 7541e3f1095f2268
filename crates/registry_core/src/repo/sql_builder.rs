//! Statement builder driven by live table schema.
//!
//! # Responsibility
//! - Turn table names and column maps into insert/select/update/delete text.
//! - Resolve every identifier against the table's live columns.
//!
//! # Invariants
//! - Only plain identifiers (`[A-Za-z_][A-Za-z0-9_]*`) reach statement text,
//!   always double-quoted.
//! - Values only travel as bound named parameters.
//! - Insert/select placeholders are `:<col>`, update SET placeholders are
//!   `:set_<col>`, WHERE placeholders for update/delete are `:cond_<col>`.

use super::crud_repo::{CrudError, CrudResult, CrudValidationError};
use crate::model::row::{Params, Row, SqlStatement};
use crate::model::schema::ColumnDescriptor;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use std::collections::HashSet;

static PLAIN_IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

const SET_PREFIX: &str = "set_";
const COND_PREFIX: &str = "cond_";

/// Rejects anything that is not a plain SQL identifier.
pub(crate) fn ensure_identifier(name: &str) -> CrudResult<()> {
    if PLAIN_IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(CrudValidationError::InvalidIdentifier(name.to_string()).into())
    }
}

/// Builder bound to one table and the columns it had when introspected.
pub(crate) struct StatementBuilder<'a> {
    table: &'a str,
    columns: &'a [ColumnDescriptor],
}

/// Column resolved against the live schema, paired with its value.
struct Binding<'a> {
    column: &'a str,
    value: &'a Value,
}

impl<'a> StatementBuilder<'a> {
    pub(crate) fn new(table: &'a str, columns: &'a [ColumnDescriptor]) -> CrudResult<Self> {
        ensure_identifier(table)?;
        if columns.is_empty() {
            return Err(CrudError::UnknownTable(table.to_string()));
        }
        Ok(Self { table, columns })
    }

    pub(crate) fn insert(&self, data: &'a Row) -> CrudResult<SqlStatement> {
        if data.is_empty() {
            return Err(CrudValidationError::EmptyData.into());
        }
        let bindings = self.resolve(data)?;

        let column_list = bindings
            .iter()
            .map(|binding| quote(binding.column))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = bindings
            .iter()
            .map(|binding| format!(":{}", binding.column))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(SqlStatement::new(
            format!(
                "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
                quote(self.table)
            ),
            collect_params(&bindings, ""),
        ))
    }

    pub(crate) fn select(&self, filters: Option<&'a Row>) -> CrudResult<SqlStatement> {
        let mut sql = format!("SELECT * FROM {}", quote(self.table));
        let bindings = match filters {
            Some(filters) if !filters.is_empty() => self.resolve(filters)?,
            _ => Vec::new(),
        };
        if !bindings.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&equality_list(&bindings, "", " AND "));
        }
        Ok(SqlStatement::new(sql, collect_params(&bindings, "")))
    }

    pub(crate) fn update(&self, updates: &'a Row, conditions: &'a Row) -> CrudResult<SqlStatement> {
        if updates.is_empty() {
            return Err(CrudValidationError::EmptyUpdates.into());
        }
        if conditions.is_empty() {
            return Err(CrudValidationError::EmptyConditions.into());
        }
        let set_bindings = self.resolve(updates)?;
        let cond_bindings = self.resolve(conditions)?;

        let mut params = collect_params(&set_bindings, SET_PREFIX);
        params.extend(collect_params(&cond_bindings, COND_PREFIX));

        Ok(SqlStatement::new(
            format!(
                "UPDATE {} SET {} WHERE {}",
                quote(self.table),
                equality_list(&set_bindings, SET_PREFIX, ", "),
                equality_list(&cond_bindings, COND_PREFIX, " AND ")
            ),
            params,
        ))
    }

    pub(crate) fn delete(&self, conditions: &'a Row) -> CrudResult<SqlStatement> {
        if conditions.is_empty() {
            return Err(CrudValidationError::EmptyConditions.into());
        }
        let bindings = self.resolve(conditions)?;
        Ok(SqlStatement::new(
            format!(
                "DELETE FROM {} WHERE {}",
                quote(self.table),
                equality_list(&bindings, COND_PREFIX, " AND ")
            ),
            collect_params(&bindings, COND_PREFIX),
        ))
    }

    fn resolve(&self, values: &'a Row) -> CrudResult<Vec<Binding<'a>>> {
        let mut seen = HashSet::with_capacity(values.len());
        let mut bindings = Vec::with_capacity(values.len());
        for (key, value) in values {
            let column = self.resolve_column(key)?;
            if !seen.insert(column.to_ascii_lowercase()) {
                return Err(CrudValidationError::DuplicateColumn(column.to_string()).into());
            }
            bindings.push(Binding { column, value });
        }
        Ok(bindings)
    }

    /// SQLite matches column names case-insensitively; so does this.
    fn resolve_column(&self, key: &str) -> CrudResult<&'a str> {
        ensure_identifier(key)?;
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(key))
            .map(|column| column.name.as_str())
            .ok_or_else(|| CrudError::UnknownColumn {
                table: self.table.to_string(),
                column: key.to_string(),
            })
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}

fn equality_list(bindings: &[Binding<'_>], prefix: &str, separator: &str) -> String {
    bindings
        .iter()
        .map(|binding| format!("{} = :{prefix}{}", quote(binding.column), binding.column))
        .collect::<Vec<_>>()
        .join(separator)
}

fn collect_params(bindings: &[Binding<'_>], prefix: &str) -> Params {
    bindings
        .iter()
        .map(|binding| (format!("{prefix}{}", binding.column), binding.value.clone()))
        .collect()
}
