//! PostgreSQL schema introspection over `information_schema`/`pg_catalog`.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::core::schema::{
    ColumnSchema, ForeignKeyRef, IndexDef, PrimaryKeyDef, TableSchema,
};
use crate::core::traits::SchemaIntrospector;
use crate::core::value::Value;
use crate::error::Result;

use super::PostgresDriver;

/// Normalize an information_schema type to the form the dialect renders
/// (e.g. "character varying" + length 255 becomes "varchar(255)").
fn format_pg_type(data_type: &str, max_length: i32, precision: i32, scale: i32) -> String {
    match data_type {
        "character varying" => {
            if max_length > 0 {
                format!("varchar({})", max_length)
            } else {
                "varchar".to_string()
            }
        }
        "character" => format!("char({})", max_length.max(1)),
        "timestamp without time zone" => "timestamp".to_string(),
        "timestamp with time zone" => "timestamptz".to_string(),
        "time without time zone" => "time".to_string(),
        "numeric" => {
            if precision > 0 {
                format!("decimal({},{})", precision, scale)
            } else {
                "decimal".to_string()
            }
        }
        other => other.to_string(),
    }
}

/// Strip the cast suffix and quoting PostgreSQL adds to stored defaults:
/// `'new'::character varying` becomes `new`. Sequence defaults are not user
/// defaults and map to `None`.
fn parse_pg_default(raw: &str) -> Option<Value> {
    if raw.starts_with("nextval(") || raw == "NULL" {
        return None;
    }
    let base = raw.split("::").next().unwrap_or(raw).trim();
    let unquoted = base
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .map(|s| s.replace("''", "'"))
        .unwrap_or_else(|| base.to_string());
    Some(Value::Text(unquoted))
}

#[async_trait]
impl SchemaIntrospector for PostgresDriver {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "SELECT COUNT(*)::int8 AS cnt
                 FROM information_schema.tables
                 WHERE table_schema = $1 AND table_name = $2",
                &[&self.schema(), &table],
            )
            .await?;
        Ok(row.get::<_, i64>("cnt") > 0)
    }

    async fn table_schema(&self, table: &str) -> Result<Option<TableSchema>> {
        if let Some(cached) = self.cache_get(table) {
            return Ok(cached);
        }

        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT column_name,
                        data_type,
                        COALESCE(character_maximum_length, 0)::int4 AS max_length,
                        COALESCE(numeric_precision, 0)::int4 AS num_precision,
                        COALESCE(numeric_scale, 0)::int4 AS num_scale,
                        (is_nullable = 'YES') AS is_nullable,
                        column_default,
                        (is_identity = 'YES'
                         OR COALESCE(column_default LIKE 'nextval(%', false)) AS is_auto_increment
                 FROM information_schema.columns
                 WHERE table_schema = $1 AND table_name = $2
                 ORDER BY ordinal_position",
                &[&self.schema(), &table],
            )
            .await?;

        if rows.is_empty() {
            self.cache_put(table, None);
            return Ok(None);
        }

        let mut columns = IndexMap::new();
        for row in rows {
            let name: String = row.get("column_name");
            let data_type: String = row.get("data_type");
            let default: Option<String> = row.get("column_default");
            let column = ColumnSchema {
                name: name.clone(),
                db_type: format_pg_type(
                    &data_type,
                    row.get("max_length"),
                    row.get("num_precision"),
                    row.get("num_scale"),
                ),
                nullable: row.get("is_nullable"),
                default: default.as_deref().and_then(parse_pg_default),
                unsigned: false,
                auto_increment: row.get("is_auto_increment"),
            };
            columns.insert(name, column);
        }

        let schema = Some(TableSchema {
            name: table.to_string(),
            columns,
        });
        self.cache_put(table, schema.clone());
        Ok(schema)
    }

    async fn table_indexes(&self, table: &str) -> Result<Vec<IndexDef>> {
        // always fetched fresh; index comparisons must see the live state
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT i.relname AS index_name,
                        a.attname AS column_name,
                        ix.indisunique AS is_unique
                 FROM pg_catalog.pg_index ix
                 JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
                 JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
                 JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
                 CROSS JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord)
                 JOIN pg_catalog.pg_attribute a
                   ON a.attrelid = t.oid AND a.attnum = k.attnum
                 WHERE n.nspname = $1 AND t.relname = $2 AND NOT ix.indisprimary
                 ORDER BY i.relname, k.ord",
                &[&self.schema(), &table],
            )
            .await?;

        let mut indexes: IndexMap<String, IndexDef> = IndexMap::new();
        for row in rows {
            let name: String = row.get("index_name");
            let column: String = row.get("column_name");
            let unique: bool = row.get("is_unique");
            indexes
                .entry(name.clone())
                .or_insert_with(|| IndexDef {
                    name,
                    columns: Vec::new(),
                    unique,
                })
                .columns
                .push(column);
        }
        Ok(indexes.into_values().collect())
    }

    async fn table_primary_keys(&self, table: &str) -> Result<Vec<PrimaryKeyDef>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT c.conname AS name,
                        a.attname AS column_name
                 FROM pg_catalog.pg_constraint c
                 JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
                 JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
                 CROSS JOIN LATERAL unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord)
                 JOIN pg_catalog.pg_attribute a
                   ON a.attrelid = t.oid AND a.attnum = k.attnum
                 WHERE n.nspname = $1 AND t.relname = $2 AND c.contype = 'p'
                 ORDER BY c.conname, k.ord",
                &[&self.schema(), &table],
            )
            .await?;

        let mut keys: IndexMap<String, PrimaryKeyDef> = IndexMap::new();
        for row in rows {
            let name: String = row.get("name");
            let column: String = row.get("column_name");
            keys.entry(name.clone())
                .or_insert_with(|| PrimaryKeyDef {
                    name,
                    columns: Vec::new(),
                })
                .columns
                .push(column);
        }
        Ok(keys.into_values().collect())
    }

    async fn table_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyRef>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT tc.constraint_name,
                        kcu.column_name,
                        ccu.table_name AS ref_table,
                        ccu.column_name AS ref_column
                 FROM information_schema.table_constraints tc
                 JOIN information_schema.key_column_usage kcu
                   ON kcu.constraint_name = tc.constraint_name
                  AND kcu.table_schema = tc.table_schema
                 JOIN information_schema.constraint_column_usage ccu
                   ON ccu.constraint_name = tc.constraint_name
                  AND ccu.table_schema = tc.table_schema
                 WHERE tc.table_schema = $1 AND tc.table_name = $2
                   AND tc.constraint_type = 'FOREIGN KEY'
                 ORDER BY tc.constraint_name, kcu.ordinal_position",
                &[&self.schema(), &table],
            )
            .await?;

        let mut keys: IndexMap<String, ForeignKeyRef> = IndexMap::new();
        for row in rows {
            let name: String = row.get("constraint_name");
            let local: String = row.get("column_name");
            let ref_table: String = row.get("ref_table");
            let referenced: String = row.get("ref_column");
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pg_type() {
        assert_eq!(format_pg_type("character varying", 255, 0, 0), "varchar(255)");
        assert_eq!(format_pg_type("integer", 0, 32, 0), "integer");
        assert_eq!(format_pg_type("numeric", 0, 10, 2), "decimal(10,2)");
        assert_eq!(
            format_pg_type("timestamp without time zone", 0, 0, 0),
            "timestamp"
        );
    }

    #[test]
    fn test_parse_pg_default() {
        assert_eq!(
            parse_pg_default("'new'::character varying"),
            Some(Value::Text("new".to_string()))
        );
        assert_eq!(parse_pg_default("0"), Some(Value::Text("0".to_string())));
        assert_eq!(parse_pg_default("nextval('widget_id_seq'::regclass)"), None);
        assert_eq!(
            parse_pg_default("'O''Brien'::text"),
            Some(Value::Text("O'Brien".to_string()))
        );
    }
}
