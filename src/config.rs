use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Loader settings with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Initial capacity of the result set when the caller gives no size hint
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Expected size must be between 1 and 1000000"
    ))]
    pub default_expected_size: usize,

    /// Maximum number of identifiers bound in one `IN (...)` clause
    #[validate(range(
        min = 1,
        max = 10_000,
        message = "IN operator size must be between 1 and 10000"
    ))]
    pub in_operator_max_size: usize,

    /// Log every executed statement at debug level
    pub log_sql: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            default_expected_size: 16,
            in_operator_max_size: 1000,
            log_sql: false,
        }
    }
}

impl LoaderConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            default_expected_size: parse_env_var("ENTITYGRAPH_EXPECTED_SIZE", "16")?,
            in_operator_max_size: parse_env_var("ENTITYGRAPH_IN_MAX_SIZE", "1000")?,
            log_sql: parse_env_var("ENTITYGRAPH_LOG_SQL", "false")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file; missing keys keep their defaults
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
