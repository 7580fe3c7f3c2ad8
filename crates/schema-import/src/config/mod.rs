//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use crate::error::Result;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_with_defaults() {
        let config = Config::from_yaml(
            r#"
database:
  type: mysql
  host: localhost
  database: crm
  user: root
"#,
        )
        .unwrap();
        assert_eq!(config.database.resolved_port(), 3306);
        assert!(!config.importer.die_on_error);
        assert_eq!(
            config.importer.path.to_str().unwrap(),
            "install/schema"
        );
    }

    #[test]
    fn test_postgres_default_port() {
        let config = Config::from_yaml(
            r#"
database:
  type: postgres
  host: localhost
  database: crm
  user: crm
"#,
        )
        .unwrap();
        assert_eq!(config.database.resolved_port(), 5432);
    }

    #[test]
    fn test_unknown_engine_rejected() {
        let err = Config::from_yaml(
            r#"
database:
  type: oracle
  host: localhost
  database: crm
  user: crm
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unknown database type"));
    }

    #[test]
    fn test_empty_host_rejected() {
        assert!(Config::from_yaml(
            r#"
database:
  type: mysql
  host: ""
  database: crm
  user: root
"#,
        )
        .is_err());
    }
}
