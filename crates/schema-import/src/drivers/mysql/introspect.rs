//! MySQL schema introspection over `INFORMATION_SCHEMA`.

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::mysql::MySqlRow;
use sqlx::Row;

use crate::core::schema::{
    ColumnSchema, ForeignKeyRef, IndexDef, PrimaryKeyDef, TableSchema,
};
use crate::core::traits::SchemaIntrospector;
use crate::core::value::Value;
use crate::error::Result;

use super::MysqlDriver;

impl MysqlDriver {
    async fn load_table_schema(&self, table: &str) -> Result<Option<TableSchema>> {
        // CAST to CHAR to handle collation differences where information_schema
        // columns use utf8mb3 collations the client may not expect
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(COLUMN_TYPE AS CHAR(255)) AS COLUMN_TYPE,
                IF(IS_NULLABLE = 'YES', 1, 0) AS is_nullable,
                CAST(COLUMN_DEFAULT AS CHAR(255)) AS column_default,
                IF(EXTRA LIKE '%auto_increment%', 1, 0) AS is_auto_increment
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(self.database())
            .bind(table)
            .fetch_all(self.pool())
            .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut columns = IndexMap::new();
        for row in rows {
            let name: String = row.get("COLUMN_NAME");
            let db_type: String = row.get("COLUMN_TYPE");
            let default: Option<String> = row.get("column_default");
            let column = ColumnSchema {
                unsigned: db_type.contains("unsigned"),
                nullable: row.get::<i32, _>("is_nullable") == 1,
                auto_increment: row.get::<i32, _>("is_auto_increment") == 1,
                default: default.map(Value::Text),
                db_type,
                name: name.clone(),
            };
            columns.insert(name, column);
        }

        Ok(Some(TableSchema {
            name: table.to_string(),
            columns,
        }))
    }
}

#[async_trait]
impl SchemaIntrospector for MysqlDriver {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let query = r#"
            SELECT COUNT(*) AS cnt
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        "#;
        let row: MySqlRow = sqlx::query(query)
            .bind(self.database())
            .bind(table)
            .fetch_one(self.pool())
            .await?;
        Ok(row.get::<i64, _>("cnt") > 0)
    }

    async fn table_schema(&self, table: &str) -> Result<Option<TableSchema>> {
        if let Some(cached) = self.cache_get(table) {
            return Ok(cached);
        }
        let schema = self.load_table_schema(table).await?;
        self.cache_put(table, schema.clone());
        Ok(schema)
    }

    async fn table_indexes(&self, table: &str) -> Result<Vec<IndexDef>> {
        // always fetched fresh; index comparisons must see the live state
        let query = r#"
            SELECT
                CAST(INDEX_NAME AS CHAR(255)) AS INDEX_NAME,
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                NON_UNIQUE
            FROM INFORMATION_SCHEMA.STATISTICS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND INDEX_NAME <> 'PRIMARY'
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;
        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(self.database())
            .bind(table)
            .fetch_all(self.pool())
            .await?;

        let mut indexes: IndexMap<String, IndexDef> = IndexMap::new();
        for row in rows {
            let name: String = row.get("INDEX_NAME");
            let column: String = row.get("COLUMN_NAME");
            let non_unique: i64 = row.get("NON_UNIQUE");
            indexes
                .entry(name.clone())
                .or_insert_with(|| IndexDef {
                    name,
                    columns: Vec::new(),
                    unique: non_unique == 0,
                })
                .columns
                .push(column);
        }
        Ok(indexes.into_values().collect())
    }

    async fn table_primary_keys(&self, table: &str) -> Result<Vec<PrimaryKeyDef>> {
        let query = r#"
            SELECT CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
            FROM INFORMATION_SCHEMA.STATISTICS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND INDEX_NAME = 'PRIMARY'
            ORDER BY SEQ_IN_INDEX
        "#;
        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(self.database())
            .bind(table)
            .fetch_all(self.pool())
            .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let columns = rows
            .iter()
            .map(|r| r.get::<String, _>("COLUMN_NAME"))
            .collect();
        Ok(vec![PrimaryKeyDef {
            name: "PRIMARY".to_string(),
            columns,
        }])
    }

    async fn table_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyRef>> {
        let query = r#"
            SELECT
                CAST(CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(REFERENCED_TABLE_NAME AS CHAR(255)) AS REFERENCED_TABLE_NAME,
                CAST(REFERENCED_COLUMN_NAME AS CHAR(255)) AS REFERENCED_COLUMN_NAME
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
              AND REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
        "#;
        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(self.database())
            .bind(table)
            .fetch_all(self.pool())
            .await?;

        let mut keys: IndexMap<String, ForeignKeyRef> = IndexMap::new();
        for row in rows {
            let name: String = row.get("CONSTRAINT_NAME");
            let local: String = row.get("COLUMN_NAME");
            let ref_table: String = row.get("REFERENCED_TABLE_NAME");
            let referenced: String = row.get("REFERENCED_COLUMN_NAME");
            keys.entry(name.clone())
                .or_insert_with(|| ForeignKeyRef {
                    name,
                    ref_table,
                    column_map: Vec::new(),
                })
                .column_map
                .push((local, referenced));
        }
        Ok(keys.into_values().collect())
    }

    async fn refresh_schema(&self) -> Result<()> {
        self.cache_clear();
        Ok(())
    }
}
