//! Invoice registry storage layout.
//!
//! # Responsibility
//! - Own the table and view definitions of the invoice registry.
//! - Bring a store up to the latest registry schema version.
//!
//! # See also
//! - `repo::crud_repo` for the generic access layer over these tables.

mod schema;

pub use schema::{ensure_registry_schema, latest_version, REGISTRY_TABLES};
