//! Live schema metadata, as reported by introspection.
//!
//! These types describe what actually exists in the database right now.
//! The declarative counterparts live in [`super::descriptor`]; the diff
//! engine compares the two.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::value::Value;

/// Introspected table structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,

    /// Column definitions, in ordinal position order.
    pub columns: IndexMap<String, ColumnSchema>,
}

impl TableSchema {
    /// Whether any column is auto-incrementing.
    pub fn has_auto_increment(&self) -> bool {
        self.columns.values().any(|c| c.auto_increment)
    }

    /// The first auto-increment column, if any.
    pub fn auto_increment_column(&self) -> Option<&ColumnSchema> {
        self.columns.values().find(|c| c.auto_increment)
    }
}

/// Introspected column metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,

    /// Raw type string as reported by the engine (e.g. "int(11)", "varchar(255)").
    pub db_type: String,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Default value, if any.
    pub default: Option<Value>,

    /// Whether the column is unsigned (MySQL family; always false elsewhere).
    pub unsigned: bool,

    /// Whether the column auto-increments.
    pub auto_increment: bool,
}

/// Introspected index metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name.
    pub name: String,

    /// Indexed column names, in key order.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    pub unique: bool,
}

/// Introspected primary key definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKeyDef {
    /// Constraint name ("PRIMARY" on MySQL).
    pub name: String,

    /// Key column names.
    pub columns: Vec<String>,
}

/// Introspected foreign key reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Constraint name.
    pub name: String,

    /// Referenced table name.
    pub ref_table: String,

    /// Local column to referenced column pairs.
    pub column_map: Vec<(String, String)>,
}

impl ForeignKeyRef {
    /// Whether this constraint maps `local` onto `referenced`.
    pub fn maps(&self, local: &str, referenced: &str) -> bool {
        self.column_map
            .iter()
            .any(|(l, r)| l == local && r == referenced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_increment_lookup() {
        let mut columns = IndexMap::new();
        columns.insert(
            "id".to_string(),
            ColumnSchema {
                name: "id".to_string(),
                db_type: "int(11)".to_string(),
                nullable: false,
                default: None,
                unsigned: true,
                auto_increment: true,
            },
        );
        let table = TableSchema {
            name: "widget".to_string(),
            columns,
        };
        assert!(table.has_auto_increment());
        assert_eq!(table.auto_increment_column().unwrap().name, "id");
    }

    #[test]
    fn test_foreign_key_maps() {
        let fk = ForeignKeyRef {
            name: "fk_widget_owner".to_string(),
            ref_table: "owner".to_string(),
            column_map: vec![("owner_id".to_string(), "id".to_string())],
        };
        assert!(fk.maps("owner_id", "id"));
        assert!(!fk.maps("owner_id", "uuid"));
    }
}
