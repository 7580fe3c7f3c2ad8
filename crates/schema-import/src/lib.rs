//! # schema-import
//!
//! Declarative database schema import and reconciliation engine.
//!
//! Descriptors state target structure (tables, columns, indexes, primary
//! keys, foreign keys, seed data); the engine creates it on a fresh
//! database or diffs and patches an existing one:
//!
//! - **Fresh import**: create every declared structure unconditionally
//! - **Update**: introspect the live schema, then add or alter only what
//!   drifted; idempotent on re-run
//! - **Foreign key post-pass**: constraints are applied after all tables
//!   across all descriptors exist, and are only ever added
//! - **Run log**: a structured, append-only transcript of every operation
//!   for audit and failure diagnosis
//!
//! ## Example
//!
//! ```rust,no_run
//! use schema_import::{Config, Importer, LogOutput, MysqlDriver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.yaml")?;
//!     let driver = MysqlDriver::connect(&config.database).await?;
//!     let mut importer = Importer::new(driver, config.importer);
//!     importer.load_descriptors(None)?;
//!     importer.update_schema().await?;
//!     importer.post_update().await?;
//!     importer.flush_log(&LogOutput::Stdout)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod diff;
pub mod drivers;
pub mod error;
pub mod importer;
pub mod report;

// Re-exports for convenient access
pub use crate::config::{Config, DbConfig, ImporterOptions};
pub use crate::core::{
    ColumnSpec, ColumnType, DescriptorUnit, FileProvider, ForeignKeySpec, ImportBatch, IndexSpec,
    PrimaryKeySpec, ReferenceAction, SchemaExecutor, SchemaIntrospector, SchemaProvider, SeedData,
    TableDescriptor, Value,
};
pub use crate::dialect::{DialectImpl, MysqlDialect, PostgresDialect};
pub use crate::drivers::MemoryDriver;
#[cfg(feature = "mysql")]
pub use crate::drivers::MysqlDriver;
#[cfg(feature = "postgres")]
pub use crate::drivers::PostgresDriver;
pub use crate::error::{ImportError, Result};
pub use crate::importer::Importer;
pub use crate::report::{ImportLog, LogEvent, LogOutput, OpCode, StepOutcome};
