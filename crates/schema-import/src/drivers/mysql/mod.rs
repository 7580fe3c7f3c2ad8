//! MySQL/MariaDB driver.
//!
//! Uses SQLx for connection pooling and async query execution. Introspects
//! through `INFORMATION_SCHEMA` and executes DDL/DML one statement at a
//! time.

mod execute;
mod introspect;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::core::schema::TableSchema;
use crate::dialect::{DialectImpl, MysqlDialect};
use crate::error::{ImportError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// MySQL/MariaDB driver implementation.
pub struct MysqlDriver {
    pool: MySqlPool,
    database: String,
    dialect: DialectImpl,
    /// Per-run table schema cache, invalidated only by `refresh_schema`.
    schema_cache: Mutex<HashMap<String, Option<TableSchema>>>,
}

impl MysqlDriver {
    /// Connect to a MySQL/MariaDB database.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.resolved_port())
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(MySqlSslMode::Preferred);

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| ImportError::pool(e, "creating MySQL pool"))?;

        // Test connection
        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| ImportError::pool(e, "testing MySQL connection"))?;

        info!(
            "Connected to MySQL: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            pool,
            database: config.database.clone(),
            dialect: DialectImpl::Mysql(MysqlDialect::new()),
            schema_cache: Mutex::new(HashMap::new()),
        })
    }

    pub(crate) fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub(crate) fn database(&self) -> &str {
        &self.database
    }

    pub(crate) fn dialect_impl(&self) -> &DialectImpl {
        &self.dialect
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
        let result = sqlx::query(sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
