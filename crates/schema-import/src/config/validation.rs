//! Configuration validation.

use crate::dialect::DialectImpl;
use crate::error::{ImportError, Result};

use super::types::Config;

/// Validate a loaded configuration.
pub fn validate(config: &Config) -> Result<()> {
    // unknown engines are rejected here, before any connection attempt
    DialectImpl::from_name(&config.database.r#type)?;

    if config.database.host.is_empty() {
        return Err(ImportError::Config("database.host must not be empty".into()));
    }
    if config.database.database.is_empty() {
        return Err(ImportError::Config(
            "database.database must not be empty".into(),
        ));
    }
    if config.database.user.is_empty() {
        return Err(ImportError::Config("database.user must not be empty".into()));
    }
    if config.importer.path.as_os_str().is_empty() {
        return Err(ImportError::Config("importer.path must not be empty".into()));
    }
    Ok(())
}
