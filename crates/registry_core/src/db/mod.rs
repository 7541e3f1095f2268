//! SQLite store ownership and dictionary-parameterized statement execution.
//!
//! # Responsibility
//! - Own the store path and its one-time durability configuration.
//! - Hand out scoped connections that close on every exit path.
//! - Execute statements bound by named parameters and return rows as maps.
//!
//! # Invariants
//! - Values are always bound, never interpolated into statement text.
//! - Storage failures are returned as `DbError` and logged with the
//!   operation name; "no rows" is never reported as an error.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod config;
mod executor;
mod store;

pub use config::{JournalMode, StoreConfig, Synchronous};
pub use store::{ScopedConnection, Store};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Statement placeholder has no matching key in the parameter map.
    MissingParameter {
        name: String,
    },
    /// Positional `?` placeholders cannot be bound from a named map.
    UnnamedParameter {
        index: usize,
    },
    /// Result set exposes the same column name twice.
    DuplicateColumn(String),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::MissingParameter { name } => {
                write!(f, "no value supplied for named parameter `{name}`")
            }
            Self::UnnamedParameter { index } => write!(
                f,
                "positional parameter at index {index} cannot be bound by name"
            ),
            Self::DuplicateColumn(name) => {
                write!(f, "result set contains duplicate column `{name}`")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::MissingParameter { .. } => None,
            Self::UnnamedParameter { .. } => None,
            Self::DuplicateColumn(_) => None,
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
