//! PostgreSQL SQL dialect (Strategy pattern).

use crate::core::descriptor::{ColumnSpec, ColumnType, TableOptions};
use crate::core::traits::Dialect;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn column_type(&self, spec: &ColumnSpec) -> String {
        if let Some(raw) = &spec.raw {
            return raw.clone();
        }
        // Display widths are a MySQL concept and are dropped here
        match &spec.col_type {
            ColumnType::SmallInt(_) => "smallint".to_string(),
            ColumnType::Integer(_) => "integer".to_string(),
            ColumnType::BigInt(_) => "bigint".to_string(),
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::Decimal(p, s) => format!("decimal({},{})", p, s),
            ColumnType::Float => "real".to_string(),
            ColumnType::Double => "double precision".to_string(),
            ColumnType::Char(w) => format!("char({})", w.unwrap_or(1)),
            ColumnType::String(w) => format!("varchar({})", w.unwrap_or(255)),
            ColumnType::Text => "text".to_string(),
            ColumnType::Binary(_) => "bytea".to_string(),
            ColumnType::Date => "date".to_string(),
            ColumnType::Time => "time".to_string(),
            ColumnType::DateTime => "timestamp".to_string(),
            ColumnType::Timestamp => "timestamp".to_string(),
        }
    }

    fn column_definition(&self, spec: &ColumnSpec) -> String {
        let mut def = self.column_type(spec);
        if spec.not_null {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &spec.default {
            def.push_str(&format!(" DEFAULT {}", default.to_sql_literal()));
        }
        if spec.auto_increment {
            def.push_str(" GENERATED BY DEFAULT AS IDENTITY");
        }
        def
    }

    fn table_options(&self, _options: &TableOptions) -> Option<String> {
        // PostgreSQL has no engine/charset table options
        None
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn supports_unsigned(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        let d = PostgresDialect::new();
        assert_eq!(d.quote_ident("widget"), "\"widget\"");
        assert_eq!(d.quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_column_types_drop_display_width() {
        let d = PostgresDialect::new();
        assert_eq!(d.column_type(&ColumnSpec::integer(10)), "integer");
        assert_eq!(d.column_type(&ColumnSpec::string(255)), "varchar(255)");
        assert_eq!(
            d.column_type(&ColumnSpec::new(ColumnType::Double)),
            "double precision"
        );
    }

    #[test]
    fn test_unsigned_is_ignored() {
        let d = PostgresDialect::new();
        let spec = ColumnSpec::integer(10).unsigned().not_null();
        assert_eq!(d.column_definition(&spec), "integer NOT NULL");
        assert!(!d.supports_unsigned());
    }

    #[test]
    fn test_no_table_options() {
        let d = PostgresDialect::new();
        let options = TableOptions {
            engine: Some("InnoDB".to_string()),
            charset: Some("utf8mb4".to_string()),
        };
        assert_eq!(d.table_options(&options), None);
    }

    #[test]
    fn test_placeholders() {
        let d = PostgresDialect::new();
        assert_eq!(d.placeholder(1), "$1");
        assert_eq!(d.placeholder(7), "$7");
    }
}
