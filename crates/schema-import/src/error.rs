//! Error types for the import library.

use thiserror::Error;

use crate::report::OpCode;

/// Main error type for import and reconciliation operations.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A descriptor unit failed to load or parse.
    #[error("Descriptor error: {0}")]
    Descriptor(String),

    /// MySQL driver error.
    #[cfg(feature = "mysql")]
    #[error("MySQL driver error: {0}")]
    Mysql(#[from] sqlx::Error),

    /// PostgreSQL driver error.
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL driver error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Connection pool error with context.
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Generic driver error (in-memory driver, statement-level failures).
    #[error("Driver error: {0}")]
    Driver(String),

    /// A DDL operation failed.
    #[error("Schema operation failed for {target}: {op:?}")]
    SchemaOperation {
        op: OpCode,
        target: String,
        #[source]
        source: Box<ImportError>,
    },

    /// A seed data row insert failed.
    #[error("Insert failed for table {table}")]
    DataInsert {
        table: String,
        #[source]
        source: Box<ImportError>,
    },

    /// An auto-increment sequence reset failed.
    #[error("Sequence reset failed for table {table}")]
    SequenceReset {
        table: String,
        #[source]
        source: Box<ImportError>,
    },

    /// A foreign key operation failed.
    #[error("Foreign key {name} failed")]
    ForeignKey {
        name: String,
        #[source]
        source: Box<ImportError>,
    },

    /// IO error (descriptor discovery, log flushing).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A run was aborted because `die_on_error` is set. Carries the
    /// operation category code and the original cause chain.
    #[error("Importer error: {message}")]
    Aborted {
        code: u8,
        message: String,
        #[source]
        source: Box<ImportError>,
    },
}

impl ImportError {
    /// Create a Pool error with context about where it occurred.
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        ImportError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Wrap a failed DDL operation.
    pub fn schema_op(op: OpCode, target: impl Into<String>, source: ImportError) -> Self {
        ImportError::SchemaOperation {
            op,
            target: target.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an error into the fatal `Aborted` variant raised under
    /// `die_on_error`.
    pub fn aborted(code: OpCode, source: ImportError) -> Self {
        ImportError::Aborted {
            code: code.code(),
            message: source.to_string(),
            source: Box::new(source),
        }
    }

    /// Format error with full details including the cause chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for CLI consumers.
    pub fn exit_code(&self) -> u8 {
        match self {
            ImportError::Config(_) | ImportError::Yaml(_) => 2,
            ImportError::Aborted { .. } => 3,
            _ => 1,
        }
    }
}

/// Result type alias for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aborted_keeps_cause_chain() {
        let cause = ImportError::Driver("duplicate table".to_string());
        let err = ImportError::aborted(OpCode::CreateTable, cause);
        match &err {
            ImportError::Aborted { code, message, .. } => {
                assert_eq!(*code, 1);
                assert!(message.contains("duplicate table"));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
        let detailed = err.format_detailed();
        assert!(detailed.contains("Caused by"));
        assert!(detailed.contains("duplicate table"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ImportError::Config("x".into()).exit_code(), 2);
        assert_eq!(
            ImportError::aborted(
                OpCode::CreateTable,
                ImportError::Driver("x".into())
            )
            .exit_code(),
            3
        );
        assert_eq!(ImportError::Driver("x".into()).exit_code(), 1);
    }
}
