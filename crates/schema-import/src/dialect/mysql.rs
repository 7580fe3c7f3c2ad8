//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.

use crate::core::descriptor::{ColumnSpec, ColumnType, TableOptions};
use crate::core::traits::Dialect;

/// MySQL/MariaDB dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // MySQL uses backticks; double embedded backticks
        format!("`{}`", name.replace('`', "``"))
    }

    fn column_type(&self, spec: &ColumnSpec) -> String {
        if let Some(raw) = &spec.raw {
            return raw.clone();
        }
        match &spec.col_type {
            ColumnType::SmallInt(w) => format!("smallint({})", w.unwrap_or(6)),
            ColumnType::Integer(w) => format!("int({})", w.unwrap_or(11)),
            ColumnType::BigInt(w) => format!("bigint({})", w.unwrap_or(20)),
            ColumnType::Boolean => "tinyint(1)".to_string(),
            ColumnType::Decimal(p, s) => format!("decimal({},{})", p, s),
            ColumnType::Float => "float".to_string(),
            ColumnType::Double => "double".to_string(),
            ColumnType::Char(w) => format!("char({})", w.unwrap_or(1)),
            ColumnType::String(w) => format!("varchar({})", w.unwrap_or(255)),
            ColumnType::Text => "text".to_string(),
            ColumnType::Binary(w) => match w {
                Some(n) => format!("varbinary({})", n),
                None => "blob".to_string(),
            },
            ColumnType::Date => "date".to_string(),
            ColumnType::Time => "time".to_string(),
            ColumnType::DateTime => "datetime".to_string(),
            ColumnType::Timestamp => "timestamp".to_string(),
        }
    }

    fn column_definition(&self, spec: &ColumnSpec) -> String {
        let mut def = self.column_type(spec);
        if spec.unsigned {
            def.push_str(" UNSIGNED");
        }
        if spec.not_null {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &spec.default {
            def.push_str(&format!(" DEFAULT {}", default.to_sql_literal()));
        }
        if spec.auto_increment {
            // the PRIMARY KEY clause MySQL requires for auto columns is
            // appended by the executor at CREATE TABLE time
            def.push_str(" AUTO_INCREMENT");
        }
        def
    }

    fn table_options(&self, options: &TableOptions) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(engine) = &options.engine {
            parts.push(format!("ENGINE={}", engine));
        }
        if let Some(charset) = &options.charset {
            parts.push(format!("DEFAULT CHARSET={}", charset));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn supports_unsigned(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        let d = MysqlDialect::new();
        assert_eq!(d.quote_ident("widget"), "`widget`");
        assert_eq!(d.quote_ident("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_column_types() {
        let d = MysqlDialect::new();
        assert_eq!(d.column_type(&ColumnSpec::integer(10)), "int(10)");
        assert_eq!(d.column_type(&ColumnSpec::string(255)), "varchar(255)");
        assert_eq!(d.column_type(&ColumnSpec::text()), "text");
        assert_eq!(d.column_type(&ColumnSpec::boolean()), "tinyint(1)");
        assert_eq!(
            d.column_type(&ColumnSpec::new(ColumnType::Decimal(10, 2))),
            "decimal(10,2)"
        );
    }

    #[test]
    fn test_raw_type_wins() {
        let d = MysqlDialect::new();
        let spec = ColumnSpec::text().raw_type("mediumtext");
        assert_eq!(d.column_type(&spec), "mediumtext");
    }

    #[test]
    fn test_column_definition() {
        let d = MysqlDialect::new();
        let spec = ColumnSpec::string(20).not_null().default_value("new");
        assert_eq!(
            d.column_definition(&spec),
            "varchar(20) NOT NULL DEFAULT 'new'"
        );

        let id = ColumnSpec::integer(10).unsigned().not_null().auto_increment();
        assert_eq!(
            d.column_definition(&id),
            "int(10) UNSIGNED NOT NULL AUTO_INCREMENT"
        );
    }

    #[test]
    fn test_table_options() {
        let d = MysqlDialect::new();
        let options = TableOptions {
            engine: Some("InnoDB".to_string()),
            charset: Some("utf8mb4".to_string()),
        };
        assert_eq!(
            d.table_options(&options).as_deref(),
            Some("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4")
        );
        assert_eq!(d.table_options(&TableOptions::default()), None);
    }
}
