//! PostgreSQL DDL/DML execution.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::core::descriptor::{ColumnSpec, ForeignKeySpec, IndexSpec};
use crate::core::traits::{Dialect, SchemaExecutor};
use crate::core::value::Value;
use crate::error::{ImportError, Result};

use super::PostgresDriver;

impl PostgresDriver {
    fn qualify(&self, table: &str) -> String {
        let d = self.dialect_impl();
        format!("{}.{}", d.quote_ident(self.schema()), d.quote_ident(table))
    }
}

#[async_trait]
impl SchemaExecutor for PostgresDriver {
    fn dialect(&self) -> &dyn Dialect {
        self.dialect_impl()
    }

    async fn create_table(
        &self,
        table: &str,
        columns: &IndexMap<String, ColumnSpec>,
        _options: Option<&str>,
    ) -> Result<()> {
        let d = self.dialect();
        let mut defs: Vec<String> = columns
            .iter()
            .map(|(name, spec)| format!("{} {}", d.quote_ident(name), d.column_definition(spec)))
            .collect();
        if let Some((name, _)) = columns.iter().find(|(_, s)| s.auto_increment) {
            defs.push(format!("PRIMARY KEY ({})", d.quote_ident(name)));
        }

        let sql = format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.qualify(table),
            defs.join(",\n    ")
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn add_column(&self, table: &str, column: &str, spec: &ColumnSpec) -> Result<()> {
        let d = self.dialect();
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.qualify(table),
            d.quote_ident(column),
            d.column_definition(spec)
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn alter_column(&self, table: &str, column: &str, spec: &ColumnSpec) -> Result<()> {
        // PostgreSQL has no single MODIFY COLUMN; combine the alterations
        // into one statement so the change stays one executor call
        let d = self.dialect();
        let col = d.quote_ident(column);
        let mut actions = vec![format!(
            "ALTER COLUMN {} TYPE {} USING {}::{}",
            col,
            d.column_type(spec),
            col,
            d.column_type(spec)
        )];
        if spec.not_null {
            actions.push(format!("ALTER COLUMN {} SET NOT NULL", col));
        } else {
            actions.push(format!("ALTER COLUMN {} DROP NOT NULL", col));
        }
        match &spec.default {
            Some(default) => actions.push(format!(
                "ALTER COLUMN {} SET DEFAULT {}",
                col,
                default.to_sql_literal()
            )),
            None => actions.push(format!("ALTER COLUMN {} DROP DEFAULT", col)),
        }

        let sql = format!(
            "ALTER TABLE {} {}",
            self.qualify(table),
            actions.join(", ")
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
            self.qualify(table),
            cols
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn drop_index(&self, _table: &str, name: &str) -> Result<()> {
        // indexes are schema-scoped objects in PostgreSQL
        let d = self.dialect();
        let sql = format!(
            "DROP INDEX {}.{}",
            d.quote_ident(self.schema()),
            d.quote_ident(name)
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn add_primary_key(&self, table: &str, name: &str, columns: &[String]) -> Result<()> {
        let d = self.dialect();
        let cols = columns
            .iter()
            .map(|c| d.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            self.qualify(table),
            d.quote_ident(name),
            cols
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn drop_primary_key(&self, table: &str, name: &str) -> Result<()> {
        let d = self.dialect();
        let sql = format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.qualify(table),
            d.quote_ident(name)
        );
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
            self.qualify(&fk.table),
            d.quote_ident(&fk.name),
            cols,
            self.qualify(&fk.ref_table),
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
            self.qualify(table),
            cols,
            values
        );
        self.execute(&sql).await
    }

    async fn reset_sequence(&self, table: &str) -> Result<()> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT column_name
                 FROM information_schema.columns
                 WHERE table_schema = $1 AND table_name = $2
                   AND (is_identity = 'YES'
                        OR COALESCE(column_default LIKE 'nextval(%', false))
                 LIMIT 1",
                &[&self.schema(), &table],
            )
            .await?;
        let column: String = row
            .map(|r| r.get::<_, String>("column_name"))
            .ok_or_else(|| {
                ImportError::Driver(format!("table '{}' has no auto-increment column", table))
            })?;

        let d = self.dialect();
        let qualified = self.qualify(table);
        let sql = format!(
            "SELECT setval(pg_get_serial_sequence('{}', '{}'), COALESCE((SELECT MAX({}) FROM {}), 1), true)",
            qualified,
            column,
            d.quote_ident(&column),
            qualified
        );
        client.simple_query(&sql).await?;
        Ok(())
    }

    async fn rename_table(&self, old: &str, new: &str) -> Result<()> {
        let d = self.dialect();
        let sql = format!(
            "ALTER TABLE {} RENAME TO {}",
            self.qualify(old),
            d.quote_ident(new)
        );
        self.execute(&sql).await?;
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        let sql = format!("DROP TABLE {}", self.qualify(table));
        self.execute(&sql).await?;
        Ok(())
    }

    async fn rename_column(&self, table: &str, old: &str, new: &str) -> Result<()> {
        let d = self.dialect();
        let sql = format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.qualify(table),
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
            self.qualify(table),
            d.quote_ident(column)
        );
        self.execute(&sql).await?;
        Ok(())
    }
}
