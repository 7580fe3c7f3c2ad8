//! PostgreSQL driver.
//!
//! Uses deadpool-postgres for connection pooling. Introspects through
//! `information_schema`/`pg_catalog` and executes DDL/DML one statement at
//! a time. Connects without TLS; the import tool is meant for local or
//! trusted-network administration connections.

mod execute;
mod introspect;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tokio_postgres::Config as PgConfig;
use tracing::{debug, info, warn};

use crate::config::DbConfig;
use crate::core::schema::TableSchema;
use crate::dialect::{DialectImpl, PostgresDialect};
use crate::error::{ImportError, Result};

/// Connection timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL driver implementation.
pub struct PostgresDriver {
    pool: Pool,
    schema: String,
    dialect: DialectImpl,
    /// Per-run table schema cache, invalidated only by `refresh_schema`.
    schema_cache: Mutex<HashMap<String, Option<TableSchema>>>,
}

impl PostgresDriver {
    /// Connect to a PostgreSQL database.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.resolved_port());
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.connect_timeout(POOL_CONNECTION_TIMEOUT);

        warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(1)
            .build()
            .map_err(|e| ImportError::pool(e, "creating PostgreSQL pool"))?;

        // Test connection
        let client = pool
            .get()
            .await
            .map_err(|e| ImportError::pool(e, "testing PostgreSQL connection"))?;
        client.simple_query("SELECT 1").await?;

        info!(
            "Connected to PostgreSQL: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            pool,
            schema: config
                .schema
                .clone()
                .unwrap_or_else(|| "public".to_string()),
            dialect: DialectImpl::Postgres(PostgresDialect::new()),
            schema_cache: Mutex::new(HashMap::new()),
        })
    }

    pub(crate) fn schema(&self) -> &str {
        &self.schema
    }

    pub(crate) fn dialect_impl(&self) -> &DialectImpl {
        &self.dialect
    }

    pub(crate) async fn client(&self) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| ImportError::pool(e, "acquiring PostgreSQL connection"))
    }

    pub(crate) fn cache_get(&self, table: &str) -> Option<Option<TableSchema>> {
        self.schema_cache.lock().unwrap().get(table).cloned()
    }

    pub(crate) fn cache_put(&self, table: &str, schema: Option<TableSchema>) {
        self.schema_cache
            .lock()
            .unwrap()
            .insert(table.to_string(), schema);
    }

    pub(crate) fn cache_clear(&self) {
        self.schema_cache.lock().unwrap().clear();
    }

    /// Run one statement.
    pub(crate) async fn execute(&self, sql: &str) -> Result<u64> {
        debug!(sql, "executing");
        let client = self.client().await?;
        Ok(client.execute(sql, &[]).await?)
    }
}
