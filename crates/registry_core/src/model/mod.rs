//! Store-neutral data shapes shared by executor and CRUD callers.
//!
//! # Responsibility
//! - Define the map-typed row and parameter shapes.
//! - Define schema read models returned by introspection.
//!
//! # Invariants
//! - Column names are unique within a `Row`.
//! - Values are SQLite primitives (integer, real, text, blob, null).

pub mod row;
pub mod schema;
