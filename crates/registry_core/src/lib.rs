//! Storage core for the invoice registry.
//! Generic, dictionary-driven CRUD over a single SQLite store.

pub mod db;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;

pub use db::{DbError, DbResult, JournalMode, ScopedConnection, Store, StoreConfig, Synchronous};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::row::{row, Params, Row, SqlStatement};
pub use model::schema::{ColumnDescriptor, PrimaryKey};
pub use registry::{ensure_registry_schema, REGISTRY_TABLES};
pub use repo::crud_repo::{
    CrudError, CrudRepository, CrudResult, CrudValidationError, SqliteCrud,
};
pub use rusqlite::types::Value;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
