//! Map-typed rows, named parameter sets and executable statements.

use rusqlite::types::Value;
use std::collections::BTreeMap;

/// One store record keyed by column name.
pub type Row = BTreeMap<String, Value>;

/// Named parameter values keyed by placeholder name without its sigil.
///
/// Keys not referenced by a statement are ignored at bind time.
pub type Params = BTreeMap<String, Value>;

/// Builds a `Row`/`Params` map from `(name, value)` pairs.
pub fn row<K, V, I>(pairs: I) -> Row
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// Statement text plus the named parameters it binds.
///
/// The unit handed to `Store::run_transaction`.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Params,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Statement without parameters, e.g. DDL.
    pub fn bare(sql: impl Into<String>) -> Self {
        Self::new(sql, Params::new())
    }
}
