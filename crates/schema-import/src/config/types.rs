//! Configuration type definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection configuration.
    pub database: DbConfig,

    /// Importer behavior configuration.
    #[serde(default)]
    pub importer: ImporterOptions,
}

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Database engine ("mysql", "mariadb", "postgres").
    #[serde(default = "default_db_type")]
    pub r#type: String,

    /// Database host.
    pub host: String,

    /// Database port. 0 means the engine default (3306 / 5432).
    #[serde(default)]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Schema for engines with schema namespaces (PostgreSQL; default
    /// "public"). Ignored by MySQL, where schema and database coincide.
    #[serde(default)]
    pub schema: Option<String>,
}

impl DbConfig {
    /// Port with the engine default applied.
    pub fn resolved_port(&self) -> u16 {
        if self.port != 0 {
            return self.port;
        }
        match self.r#type.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => 5432,
            _ => 3306,
        }
    }
}

/// Importer behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImporterOptions {
    /// Directory holding descriptor unit files.
    #[serde(default = "default_descriptor_path")]
    pub path: PathBuf,

    /// Abort the whole run on the first failed operation. The default is
    /// log-and-continue.
    #[serde(default)]
    pub die_on_error: bool,

    /// Flag legacy `<table>_seq` naming collisions during data import.
    #[serde(default)]
    pub redundant_tables: bool,

    /// Log file the transcript is appended to when not written to stdout.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for ImporterOptions {
    fn default() -> Self {
        Self {
            path: default_descriptor_path(),
            die_on_error: false,
            redundant_tables: false,
            log_file: default_log_file(),
        }
    }
}

fn default_db_type() -> String {
    "mysql".to_string()
}

fn default_descriptor_path() -> PathBuf {
    PathBuf::from("install/schema")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("cache/logs/importer.log")
}
