//! Repository layer: generic, dictionary-driven table access.
//!
//! # Responsibility
//! - Expose the table-agnostic CRUD contract consumed by application layers.
//! - Keep statement construction behind the repository boundary.
//!
//! # Invariants
//! - Callers pass table names and column maps, never statement text.
//! - Identifiers are resolved against live schema before execution.

pub mod crud_repo;
mod sql_builder;
