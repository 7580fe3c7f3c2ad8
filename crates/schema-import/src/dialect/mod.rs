//! SQL dialect implementations.
//!
//! Dialects are pure syntax strategies with no connection attached, so they
//! compile regardless of which drivers are enabled. Static dispatch goes
//! through [`DialectImpl`]: the compiler generates a match statement instead
//! of using vtable dispatch.

pub mod mysql;
pub mod postgres;

pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;

use crate::core::descriptor::{ColumnSpec, TableOptions};
use crate::core::traits::Dialect;
use crate::error::{ImportError, Result};

/// Enum-based static dispatch for dialects.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Mysql(MysqlDialect),
    Postgres(PostgresDialect),
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        match self {
            DialectImpl::Mysql(d) => d.name(),
            DialectImpl::Postgres(d) => d.name(),
        }
    }

    fn quote_ident(&self, name: &str) -> String {
        match self {
            DialectImpl::Mysql(d) => d.quote_ident(name),
            DialectImpl::Postgres(d) => d.quote_ident(name),
        }
    }

    fn column_type(&self, spec: &ColumnSpec) -> String {
        match self {
            DialectImpl::Mysql(d) => d.column_type(spec),
            DialectImpl::Postgres(d) => d.column_type(spec),
        }
    }

    fn column_definition(&self, spec: &ColumnSpec) -> String {
        match self {
            DialectImpl::Mysql(d) => d.column_definition(spec),
            DialectImpl::Postgres(d) => d.column_definition(spec),
        }
    }

    fn table_options(&self, options: &TableOptions) -> Option<String> {
        match self {
            DialectImpl::Mysql(d) => d.table_options(options),
            DialectImpl::Postgres(d) => d.table_options(options),
        }
    }

    fn placeholder(&self, index: usize) -> String {
        match self {
            DialectImpl::Mysql(d) => d.placeholder(index),
            DialectImpl::Postgres(d) => d.placeholder(index),
        }
    }

    fn supports_unsigned(&self) -> bool {
        match self {
            DialectImpl::Mysql(d) => d.supports_unsigned(),
            DialectImpl::Postgres(d) => d.supports_unsigned(),
        }
    }
}

impl DialectImpl {
    /// Create a dialect implementation from an engine identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not recognized.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DialectImpl::Mysql(MysqlDialect::new())),
            "postgres" | "postgresql" | "pg" => Ok(DialectImpl::Postgres(PostgresDialect::new())),
            other => Err(ImportError::Config(format!(
                "Unknown database type: '{}'. Supported types: mysql, postgres",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(DialectImpl::from_name("mysql").unwrap().name(), "mysql");
        assert_eq!(DialectImpl::from_name("mariadb").unwrap().name(), "mysql");
        assert_eq!(DialectImpl::from_name("pg").unwrap().name(), "postgres");
        assert!(DialectImpl::from_name("oracle").is_err());
    }

    #[test]
    fn test_enum_dispatch() {
        let dialect = DialectImpl::Postgres(PostgresDialect::new());
        assert_eq!(dialect.quote_ident("t"), "\"t\"");
        assert_eq!(dialect.placeholder(1), "$1");

        let dialect = DialectImpl::Mysql(MysqlDialect::new());
        assert_eq!(dialect.quote_ident("t"), "`t`");
        assert_eq!(dialect.placeholder(1), "?");
    }
}
