//! Database driver implementations.
//!
//! Each driver implements both core traits over one shared pool:
//!
//! - [`SchemaIntrospector`]: reads live metadata
//! - [`SchemaExecutor`]: issues DDL/DML
//!
//! Live drivers are gated behind Cargo features so consumers only compile
//! the engines they target. The [`memory`] driver is always available and
//! backs the test suite.
//!
//! # Adding New Databases
//!
//! 1. Add a dialect under `crate::dialect` and a `DialectImpl` variant
//! 2. Create a module here implementing both core traits
//! 3. Gate the module with a feature flag in `Cargo.toml`
//!
//! [`SchemaIntrospector`]: crate::core::traits::SchemaIntrospector
//! [`SchemaExecutor`]: crate::core::traits::SchemaExecutor

pub mod memory;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryDriver;

#[cfg(feature = "mysql")]
pub use mysql::MysqlDriver;

#[cfg(feature = "postgres")]
pub use postgres::PostgresDriver;
