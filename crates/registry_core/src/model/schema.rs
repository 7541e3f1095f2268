//! Live table schema read models.
//!
//! # Invariants
//! - Descriptors are ordered by column position.
//! - `primary_key_position` is `0` for non-key columns and the 1-based
//!   position within the key otherwise.

use serde::{Deserialize, Serialize};

/// One column as reported by SQLite table introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Zero-based column position in the table.
    pub position: i64,
    pub name: String,
    /// Declared type text; empty when the column has no declared type.
    pub declared_type: String,
    pub not_null: bool,
    /// Default value expression as written in the DDL.
    pub default_value: Option<String>,
    pub primary_key_position: u32,
}

impl ColumnDescriptor {
    pub fn is_primary_key(&self) -> bool {
        self.primary_key_position > 0
    }
}

/// Primary key of a table.
///
/// `Single` is returned when exactly one column forms the key; otherwise
/// `Columns` holds the ordered key columns, empty when the table declares
/// no primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Single(String),
    Columns(Vec<String>),
}

impl PrimaryKey {
    /// Derives the key from column descriptors, ordered by key position.
    pub fn from_columns(columns: &[ColumnDescriptor]) -> Self {
        let mut key_columns: Vec<&ColumnDescriptor> =
            columns.iter().filter(|column| column.is_primary_key()).collect();
        key_columns.sort_by_key(|column| column.primary_key_position);

        let mut names: Vec<String> = key_columns
            .into_iter()
            .map(|column| column.name.clone())
            .collect();
        if names.len() == 1 {
            if let Some(name) = names.pop() {
                return Self::Single(name);
            }
        }
        Self::Columns(names)
    }

    /// Uniform view over both shapes.
    pub fn columns(&self) -> &[String] {
        match self {
            Self::Single(name) => std::slice::from_ref(name),
            Self::Columns(names) => names,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnDescriptor, PrimaryKey};

    fn column(position: i64, name: &str, pk: u32) -> ColumnDescriptor {
        ColumnDescriptor {
            position,
            name: name.to_string(),
            declared_type: "TEXT".to_string(),
            not_null: false,
            default_value: None,
            primary_key_position: pk,
        }
    }

    #[test]
    fn single_key_column_is_scalar() {
        let key = PrimaryKey::from_columns(&[column(0, "id", 1), column(1, "vendor", 0)]);
        assert_eq!(key, PrimaryKey::Single("id".to_string()));
        assert_eq!(key.columns(), ["id".to_string()]);
    }

    #[test]
    fn composite_key_follows_key_position_not_column_position() {
        let key = PrimaryKey::from_columns(&[
            column(0, "line", 2),
            column(1, "invoice_id", 1),
            column(2, "note", 0),
        ]);
        assert_eq!(
            key,
            PrimaryKey::Columns(vec!["invoice_id".to_string(), "line".to_string()])
        );
    }

    #[test]
    fn missing_key_is_empty_sequence() {
        let key = PrimaryKey::from_columns(&[column(0, "payment", 0)]);
        assert_eq!(key, PrimaryKey::Columns(Vec::new()));
        assert!(key.is_empty());
    }
}
