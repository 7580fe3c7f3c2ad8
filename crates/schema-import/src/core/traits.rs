//! Core traits for driver-agnostic schema reconciliation.
//!
//! - [`Dialect`]: SQL syntax strategy for different database engines
//! - [`SchemaIntrospector`]: reads live schema metadata
//! - [`SchemaExecutor`]: issues physical DDL/DML operations
//!
//! Drivers implement introspector and executor over one shared connection
//! handle; the handle is always passed in explicitly, never fetched from
//! global state.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::Result;

use super::descriptor::{ColumnSpec, ForeignKeySpec, IndexSpec, TableOptions};
use super::schema::{ForeignKeyRef, IndexDef, PrimaryKeyDef, TableSchema};
use super::value::Value;

/// SQL syntax strategy for a database engine.
///
/// Pure functions only; no connection and no side effects.
pub trait Dialect: Send + Sync {
    /// Dialect identifier (e.g. "mysql", "postgres").
    fn name(&self) -> &str;

    /// Quote an identifier.
    ///
    /// - MySQL: `` `identifier` ``
    /// - PostgreSQL: `"identifier"`
    fn quote_ident(&self, name: &str) -> String;

    /// Render the bare engine type for a column spec (e.g. "varchar(255)",
    /// "int(11)"). Honors the raw escape hatch. The first whitespace token
    /// of this string is the equivalence comparison unit.
    fn column_type(&self, spec: &ColumnSpec) -> String;

    /// Render the full column DDL fragment: type, signedness, nullability,
    /// default and auto-increment clause.
    fn column_definition(&self, spec: &ColumnSpec) -> String;

    /// Engine-specific options fragment appended to CREATE TABLE, or `None`
    /// for engines without the concept.
    fn table_options(&self, options: &TableOptions) -> Option<String>;

    /// Parameter placeholder for the given 1-based index.
    fn placeholder(&self, index: usize) -> String;

    /// Whether the engine has unsigned integer types. Engines without them
    /// never participate in unsigned-flag comparison.
    fn supports_unsigned(&self) -> bool;
}

/// Reads live database metadata for comparison against descriptors.
///
/// Read-only. Table schema lookups may be served from a per-run cache;
/// the cache is only invalidated by an explicit [`refresh_schema`] call.
/// Index lookups are always fetched fresh per call.
///
/// [`refresh_schema`]: SchemaIntrospector::refresh_schema
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Whether the table exists.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Column structure of the table, or `None` if it does not exist.
    async fn table_schema(&self, table: &str) -> Result<Option<TableSchema>>;

    /// Secondary (non primary key) indexes of the table.
    async fn table_indexes(&self, table: &str) -> Result<Vec<IndexDef>>;

    /// Primary key definitions of the table.
    async fn table_primary_keys(&self, table: &str) -> Result<Vec<PrimaryKeyDef>>;

    /// Foreign key constraints owned by the table.
    async fn table_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyRef>>;

    /// Invalidate any cached schema metadata. Callers invoke this after a
    /// batch of changes; it is never triggered automatically.
    async fn refresh_schema(&self) -> Result<()>;
}

/// Issues physical DDL/DML operations.
///
/// One statement per call, committed independently; there is no retry and
/// no surrounding transaction, so a mid-batch failure can leave a table
/// partially migrated. Failure policy is the caller's concern.
#[async_trait]
pub trait SchemaExecutor: Send + Sync {
    /// The dialect this executor speaks.
    fn dialect(&self) -> &dyn Dialect;

    /// Create a table with the given resolved columns and options fragment.
    async fn create_table(
        &self,
        table: &str,
        columns: &IndexMap<String, ColumnSpec>,
        options: Option<&str>,
    ) -> Result<()>;

    /// Add a column to an existing table.
    async fn add_column(&self, table: &str, column: &str, spec: &ColumnSpec) -> Result<()>;

    /// Change an existing column to match the spec.
    async fn alter_column(&self, table: &str, column: &str, spec: &ColumnSpec) -> Result<()>;

    /// Create a secondary index.
    async fn create_index(&self, table: &str, index: &IndexSpec) -> Result<()>;

    /// Drop a secondary index.
    async fn drop_index(&self, table: &str, name: &str) -> Result<()>;

    /// Add a primary key constraint.
    async fn add_primary_key(&self, table: &str, name: &str, columns: &[String]) -> Result<()>;

    /// Drop a primary key constraint.
    async fn drop_primary_key(&self, table: &str, name: &str) -> Result<()>;

    /// Add a foreign key constraint.
    async fn add_foreign_key(&self, fk: &ForeignKeySpec) -> Result<()>;

    /// Insert one keyed row.
    async fn insert(&self, table: &str, columns: &[String], row: &[Value]) -> Result<u64>;

    /// Reset the auto-increment sequence to the current maximum.
    async fn reset_sequence(&self, table: &str) -> Result<()>;

    /// Rename a table.
    async fn rename_table(&self, old: &str, new: &str) -> Result<()>;

    /// Drop a table.
    async fn drop_table(&self, table: &str) -> Result<()>;

    /// Rename a column.
    async fn rename_column(&self, table: &str, old: &str, new: &str) -> Result<()>;

    /// Drop a column.
    async fn drop_column(&self, table: &str, column: &str) -> Result<()>;
}
