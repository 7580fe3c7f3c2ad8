//! MySQL DDL/DML execution.

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::mysql::MySqlRow;
use sqlx::Row;

use crate::core::descriptor::{ColumnSpec, ForeignKeySpec, IndexSpec};
use crate::core::traits::{Dialect, SchemaExecutor};
use crate::core::value::Value;
use crate::error::{ImportError, Result};

use super::MysqlDriver;

#[async_trait]
impl SchemaExecutor for MysqlDriver {
    fn dialect(&self) -> &dyn Dialect {
        self.dialect_impl()
    }

    async fn create_table(
        &self,
        table: &str,
        columns: &IndexMap<String, ColumnSpec>,
        options: Option<&str>,
    ) -> Result<()> {
        let d = self.dialect();
        let mut defs: Vec<String> = columns
            .iter()
            .map(|(name, spec)| format!("{} {}", d.quote_ident(name), d.column_definition(spec)))
            .collect();
        // auto columns must be keyed
        if let Some((name, _)) = columns.iter().find(|(_, s)| s.auto_increment) {
            defs.push(format!("PRIMARY KEY ({})", d.quote_ident(name)));
        }

        let mut sql = format!(
            "CREATE TABLE {} (\n    {}\n)",
            d.quote_ident(table),
            defs.join(",\n    ")
        );
        if let Some(options) = options {
            sql.push(' ');
            sql.push_str(options);
        }
        self.execute(&sql).await?;
        Ok(())
    }

    async fn add_column(&self, table: &str, column: &str, spec: &ColumnSpec) -> Result<()> {
        let d = self.dialect();
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            d.quote_ident(table),
            d.quote_ident(column),
            d.column_definition(spec)
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn alter_column(&self, table: &str, column: &str, spec: &ColumnSpec) -> Result<()> {
        let d = self.dialect();
        let sql = format!(
            "ALTER TABLE {} MODIFY COLUMN {} {}",
            d.quote_ident(table),
            d.quote_ident(column),
            d.column_definition(spec)
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn create_index(&self, table: &str, index: &IndexSpec) -> Result<()> {
        let d = self.dialect();
        let cols = index
            .columns
            .iter()
            .map(|c| d.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let unique = if index.unique { "UNIQUE " } else { "" };
        let sql = format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            d.quote_ident(&index.name),
            d.quote_ident(table),
            cols
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn drop_index(&self, table: &str, name: &str) -> Result<()> {
        let d = self.dialect();
        let sql = format!(
            "DROP INDEX {} ON {}",
            d.quote_ident(name),
            d.quote_ident(table)
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn add_primary_key(&self, table: &str, _name: &str, columns: &[String]) -> Result<()> {
        // MySQL does not name primary key constraints
        let d = self.dialect();
        let cols = columns
            .iter()
            .map(|c| d.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            d.quote_ident(table),
            cols
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn drop_primary_key(&self, table: &str, _name: &str) -> Result<()> {
        let d = self.dialect();
        let sql = format!("ALTER TABLE {} DROP PRIMARY KEY", d.quote_ident(table));
        self.execute(&sql).await?;
        Ok(())
    }

    async fn add_foreign_key(&self, fk: &ForeignKeySpec) -> Result<()> {
        let d = self.dialect();
        let cols = fk
            .columns
            .iter()
            .map(|c| d.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let ref_cols = fk
            .ref_columns
            .iter()
            .map(|c| d.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            d.quote_ident(&fk.table),
            d.quote_ident(&fk.name),
            cols,
            d.quote_ident(&fk.ref_table),
            ref_cols
        );
        if let Some(action) = fk.on_delete {
            sql.push_str(&format!(" ON DELETE {}", action.as_sql()));
        }
        if let Some(action) = fk.on_update {
            sql.push_str(&format!(" ON UPDATE {}", action.as_sql()));
        }
        self.execute(&sql).await?;
        Ok(())
    }

    async fn insert(&self, table: &str, columns: &[String], row: &[Value]) -> Result<u64> {
        let d = self.dialect();
        let cols = columns
            .iter()
            .map(|c| d.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let values = row
            .iter()
            .map(Value::to_sql_literal)
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            d.quote_ident(table),
            cols,
            values
        );
        self.execute(&sql).await
    }

    async fn reset_sequence(&self, table: &str) -> Result<()> {
        let d = self.dialect();
        let query = r#"
            SELECT CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
              AND EXTRA LIKE '%auto_increment%'
            LIMIT 1
        "#;
        let row: Option<MySqlRow> = sqlx::query(query)
            .bind(self.database())
            .bind(table)
            .fetch_optional(self.pool())
            .await?;
        let column: String = row
            .map(|r| r.get::<String, _>("COLUMN_NAME"))
            .ok_or_else(|| {
                ImportError::Driver(format!("table '{}' has no auto-increment column", table))
            })?;

        let max_row: MySqlRow = sqlx::query(&format!(
            "SELECT COALESCE(MAX({}), 0) AS max_id FROM {}",
            d.quote_ident(&column),
            d.quote_ident(table)
        ))
        .fetch_one(self.pool())
        .await?;
        let next = max_row.get::<i64, _>("max_id") + 1;

        let sql = format!(
            "ALTER TABLE {} AUTO_INCREMENT = {}",
            d.quote_ident(table),
            next
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn rename_table(&self, old: &str, new: &str) -> Result<()> {
        let d = self.dialect();
        let sql = format!(
            "RENAME TABLE {} TO {}",
            d.quote_ident(old),
            d.quote_ident(new)
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        let sql = format!("DROP TABLE {}", self.dialect().quote_ident(table));
        self.execute(&sql).await?;
        Ok(())
    }

    async fn rename_column(&self, table: &str, old: &str, new: &str) -> Result<()> {
        let d = self.dialect();
        let sql = format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            d.quote_ident(table),
            d.quote_ident(old),
            d.quote_ident(new)
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn drop_column(&self, table: &str, column: &str) -> Result<()> {
        let d = self.dialect();
        let sql = format!(
            "ALTER TABLE {} DROP COLUMN {}",
            d.quote_ident(table),
            d.quote_ident(column)
        );
        self.execute(&sql).await?;
        Ok(())
    }
}
