//! In-memory driver.
//!
//! Applies every operation to an in-memory catalog and records the executed
//! statement labels. Backs the test suite and dry runs; no database needed.

use std::sync::Mutex;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::core::descriptor::{ColumnSpec, ForeignKeySpec, IndexSpec};
use crate::core::schema::{ColumnSchema, ForeignKeyRef, IndexDef, PrimaryKeyDef, TableSchema};
use crate::core::traits::{Dialect, SchemaExecutor, SchemaIntrospector};
use crate::core::value::Value;
use crate::dialect::{DialectImpl, MysqlDialect};
use crate::error::{ImportError, Result};

#[derive(Debug, Default, Clone)]
struct MemTable {
    columns: IndexMap<String, ColumnSchema>,
    indexes: IndexMap<String, IndexDef>,
    primary_keys: Vec<PrimaryKeyDef>,
    foreign_keys: Vec<ForeignKeyRef>,
    rows: Vec<IndexMap<String, Value>>,
    sequence: i64,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: IndexMap<String, MemTable>,
    operations: Vec<String>,
}

/// Driver over an in-memory catalog.
pub struct MemoryDriver {
    dialect: DialectImpl,
    state: Mutex<MemoryState>,
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDriver {
    /// Create a driver speaking the MySQL dialect.
    pub fn new() -> Self {
        Self::with_dialect(DialectImpl::Mysql(MysqlDialect::new()))
    }

    /// Create a driver speaking the given dialect.
    pub fn with_dialect(dialect: DialectImpl) -> Self {
        Self {
            dialect,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Statement labels executed so far, in order.
    pub fn operations(&self) -> Vec<String> {
        self.state.lock().unwrap().operations.clone()
    }

    /// Forget recorded statement labels (catalog state is kept).
    pub fn clear_operations(&self) {
        self.state.lock().unwrap().operations.clear();
    }

    /// Rows inserted into a table so far.
    pub fn rows(&self, table: &str) -> Vec<IndexMap<String, Value>> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Current sequence watermark of a table.
    pub fn sequence(&self, table: &str) -> Option<i64> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map(|t| t.sequence)
    }

    /// Install an extra live primary key definition, bypassing the executor.
    /// Scaffolding for drift scenarios the executor itself cannot produce.
    pub fn seed_primary_key(&self, table: &str, def: PrimaryKeyDef) {
        if let Some(t) = self.state.lock().unwrap().tables.get_mut(table) {
            t.primary_keys.push(def);
        }
    }

    fn column_schema(&self, name: &str, spec: &ColumnSpec) -> ColumnSchema {
        ColumnSchema {
            name: name.to_string(),
            db_type: self.dialect.column_type(spec),
            nullable: !spec.not_null,
            default: spec.default.clone(),
            unsigned: spec.unsigned && self.dialect.supports_unsigned(),
            auto_increment: spec.auto_increment,
        }
    }
}

#[async_trait]
impl SchemaIntrospector for MemoryDriver {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().tables.contains_key(table))
    }

    async fn table_schema(&self, table: &str) -> Result<Option<TableSchema>> {
        let state = self.state.lock().unwrap();
        Ok(state.tables.get(table).map(|t| TableSchema {
            name: table.to_string(),
            columns: t.columns.clone(),
        }))
    }

    async fn table_indexes(&self, table: &str) -> Result<Vec<IndexDef>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tables
            .get(table)
            .map(|t| t.indexes.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn table_primary_keys(&self, table: &str) -> Result<Vec<PrimaryKeyDef>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tables
            .get(table)
            .map(|t| t.primary_keys.clone())
            .unwrap_or_default())
    }

    async fn table_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyRef>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tables
            .get(table)
            .map(|t| t.foreign_keys.clone())
            .unwrap_or_default())
    }

    async fn refresh_schema(&self) -> Result<()> {
        // nothing cached
        Ok(())
    }
}

#[async_trait]
impl SchemaExecutor for MemoryDriver {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn create_table(
        &self,
        table: &str,
        columns: &IndexMap<String, ColumnSpec>,
        _options: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.tables.contains_key(table) {
            return Err(ImportError::Driver(format!(
                "table '{}' already exists",
                table
            )));
        }
        let mut mem = MemTable::default();
        for (name, spec) in columns {
            mem.columns
                .insert(name.clone(), self.column_schema(name, spec));
            if spec.auto_increment {
                // the inline PRIMARY KEY clause of auto columns
                mem.primary_keys.push(PrimaryKeyDef {
                    name: "PRIMARY".to_string(),
                    columns: vec![name.clone()],
                });
            }
        }
        state.tables.insert(table.to_string(), mem);
        state.operations.push(format!("CREATE TABLE {}", table));
        Ok(())
    }

    async fn add_column(&self, table: &str, column: &str, spec: &ColumnSpec) -> Result<()> {
        let schema = self.column_schema(column, spec);
        let mut state = self.state.lock().unwrap();
        let mem = state
            .tables
            .get_mut(table)
            .ok_or_else(|| ImportError::Driver(format!("no such table '{}'", table)))?;
        if mem.columns.contains_key(column) {
            return Err(ImportError::Driver(format!(
                "column '{}.{}' already exists",
                table, column
            )));
        }
        mem.columns.insert(column.to_string(), schema);
        state
            .operations
            .push(format!("ADD COLUMN {}.{}", table, column));
        Ok(())
    }

    async fn alter_column(&self, table: &str, column: &str, spec: &ColumnSpec) -> Result<()> {
        let schema = self.column_schema(column, spec);
        let mut state = self.state.lock().unwrap();
        let mem = state
            .tables
            .get_mut(table)
            .ok_or_else(|| ImportError::Driver(format!("no such table '{}'", table)))?;
        if !mem.columns.contains_key(column) {
            return Err(ImportError::Driver(format!(
                "no such column '{}.{}'",
                table, column
            )));
        }
        mem.columns.insert(column.to_string(), schema);
        state
            .operations
            .push(format!("ALTER COLUMN {}.{}", table, column));
        Ok(())
    }

    async fn create_index(&self, table: &str, index: &IndexSpec) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mem = state
            .tables
            .get_mut(table)
            .ok_or_else(|| ImportError::Driver(format!("no such table '{}'", table)))?;
        if mem.indexes.contains_key(&index.name) {
            return Err(ImportError::Driver(format!(
                "index '{}' already exists on '{}'",
                index.name, table
            )));
        }
        mem.indexes.insert(
            index.name.clone(),
            IndexDef {
                name: index.name.clone(),
                columns: index.columns.clone(),
                unique: index.unique,
            },
        );
        state
            .operations
            .push(format!("CREATE INDEX {} ON {}", index.name, table));
        Ok(())
    }

    async fn drop_index(&self, table: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mem = state
            .tables
            .get_mut(table)
            .ok_or_else(|| ImportError::Driver(format!("no such table '{}'", table)))?;
        if mem.indexes.shift_remove(name).is_none() {
            return Err(ImportError::Driver(format!(
                "no such index '{}' on '{}'",
                name, table
            )));
        }
        state
            .operations
            .push(format!("DROP INDEX {} ON {}", name, table));
        Ok(())
    }

    async fn add_primary_key(&self, table: &str, name: &str, columns: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mem = state
            .tables
            .get_mut(table)
            .ok_or_else(|| ImportError::Driver(format!("no such table '{}'", table)))?;
        if !mem.primary_keys.is_empty() {
            return Err(ImportError::Driver(format!(
                "multiple primary keys defined for '{}'",
                table
            )));
        }
        mem.primary_keys.push(PrimaryKeyDef {
            name: name.to_string(),
            columns: columns.to_vec(),
        });
        state
            .operations
            .push(format!("ADD PRIMARY KEY {}.{}", table, name));
        Ok(())
    }

    async fn drop_primary_key(&self, table: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mem = state
            .tables
            .get_mut(table)
            .ok_or_else(|| ImportError::Driver(format!("no such table '{}'", table)))?;
        let before = mem.primary_keys.len();
        mem.primary_keys.retain(|k| k.name != name);
        if mem.primary_keys.len() == before {
            return Err(ImportError::Driver(format!(
                "no such primary key '{}' on '{}'",
                name, table
            )));
        }
        state
            .operations
            .push(format!("DROP PRIMARY KEY {}.{}", table, name));
        Ok(())
    }

    async fn add_foreign_key(&self, fk: &ForeignKeySpec) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.tables.contains_key(&fk.ref_table) {
            return Err(ImportError::Driver(format!(
                "referenced table '{}' does not exist",
                fk.ref_table
            )));
        }
        let mem = state
            .tables
            .get_mut(&fk.table)
            .ok_or_else(|| ImportError::Driver(format!("no such table '{}'", fk.table)))?;
        if mem.foreign_keys.iter().any(|f| f.name == fk.name) {
            return Err(ImportError::Driver(format!(
                "constraint '{}' already exists on '{}'",
                fk.name, fk.table
            )));
        }
        mem.foreign_keys.push(ForeignKeyRef {
            name: fk.name.clone(),
            ref_table: fk.ref_table.clone(),
            column_map: fk
                .column_pairs()
                .map(|(l, r)| (l.to_string(), r.to_string()))
                .collect(),
        });
        state
            .operations
            .push(format!("ADD FOREIGN KEY {} ON {}", fk.name, fk.table));
        Ok(())
    }

    async fn insert(&self, table: &str, columns: &[String], row: &[Value]) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        let mem = state
            .tables
            .get_mut(table)
            .ok_or_else(|| ImportError::Driver(format!("no such table '{}'", table)))?;
        if columns.len() != row.len() {
            return Err(ImportError::Driver(format!(
                "column count {} does not match value count {} for '{}'",
                columns.len(),
                row.len(),
                table
            )));
        }
        for column in columns {
            if !mem.columns.contains_key(column) {
                return Err(ImportError::Driver(format!(
                    "no such column '{}.{}'",
                    table, column
                )));
            }
        }
        let keyed: IndexMap<String, Value> = columns
            .iter()
            .cloned()
            .zip(row.iter().cloned())
            .collect();
        mem.rows.push(keyed);
        state.operations.push(format!("INSERT INTO {}", table));
        Ok(1)
    }

    async fn reset_sequence(&self, table: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mem = state
            .tables
            .get_mut(table)
            .ok_or_else(|| ImportError::Driver(format!("no such table '{}'", table)))?;
        let auto_col = mem
            .columns
            .values()
            .find(|c| c.auto_increment)
            .map(|c| c.name.clone())
            .ok_or_else(|| {
                ImportError::Driver(format!("table '{}' has no auto-increment column", table))
            })?;
        let max = mem
            .rows
            .iter()
            .filter_map(|r| match r.get(&auto_col) {
                Some(Value::Int(v)) => Some(*v),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        mem.sequence = max + 1;
        state.operations.push(format!("RESET SEQUENCE {}", table));
        Ok(())
    }

    async fn rename_table(&self, old: &str, new: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mem = state
            .tables
            .shift_remove(old)
            .ok_or_else(|| ImportError::Driver(format!("no such table '{}'", old)))?;
        state.tables.insert(new.to_string(), mem);
        state
            .operations
            .push(format!("RENAME TABLE {} TO {}", old, new));
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.tables.shift_remove(table).is_none() {
            return Err(ImportError::Driver(format!("no such table '{}'", table)));
        }
        state.operations.push(format!("DROP TABLE {}", table));
        Ok(())
    }

    async fn rename_column(&self, table: &str, old: &str, new: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mem = state
            .tables
            .get_mut(table)
            .ok_or_else(|| ImportError::Driver(format!("no such table '{}'", table)))?;
        let mut schema = mem
            .columns
            .shift_remove(old)
            .ok_or_else(|| ImportError::Driver(format!("no such column '{}.{}'", table, old)))?;
        schema.name = new.to_string();
        mem.columns.insert(new.to_string(), schema);
        state
            .operations
            .push(format!("RENAME COLUMN {}.{} TO {}", table, old, new));
        Ok(())
    }

    async fn drop_column(&self, table: &str, column: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mem = state
            .tables
            .get_mut(table)
            .ok_or_else(|| ImportError::Driver(format!("no such table '{}'", table)))?;
        if mem.columns.shift_remove(column).is_none() {
            return Err(ImportError::Driver(format!(
                "no such column '{}.{}'",
                table, column
            )));
        }
        state
            .operations
            .push(format!("DROP COLUMN {}.{}", table, column));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor::ColumnSpec;

    #[tokio::test]
    async fn test_create_and_introspect() {
        let driver = MemoryDriver::new();
        let mut columns = IndexMap::new();
        columns.insert(
            "id".to_string(),
            ColumnSpec::integer(10).unsigned().not_null().auto_increment(),
        );
        columns.insert("name".to_string(), ColumnSpec::string(255).not_null());
        driver.create_table("widget", &columns, None).await.unwrap();

        assert!(driver.table_exists("widget").await.unwrap());
        let schema = driver.table_schema("widget").await.unwrap().unwrap();
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.columns["id"].db_type, "int(10)");
        assert!(schema.has_auto_increment());

        // auto column registers an implicit PRIMARY key
        let pks = driver.table_primary_keys("widget").await.unwrap();
        assert_eq!(pks.len(), 1);
        assert_eq!(pks[0].name, "PRIMARY");
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() {
        let driver = MemoryDriver::new();
        let columns = IndexMap::new();
        driver.create_table("widget", &columns, None).await.unwrap();
        assert!(driver.create_table("widget", &columns, None).await.is_err());
    }

    #[tokio::test]
    async fn test_insert_and_reset_sequence() {
        let driver = MemoryDriver::new();
        let mut columns = IndexMap::new();
        columns.insert(
            "id".to_string(),
            ColumnSpec::integer(10).not_null().auto_increment(),
        );
        driver.create_table("widget", &columns, None).await.unwrap();
        driver
            .insert("widget", &["id".to_string()], &[Value::Int(7)])
            .await
            .unwrap();
        driver.reset_sequence("widget").await.unwrap();
        assert_eq!(driver.sequence("widget"), Some(8));
    }
}
