use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::extractor::TableFilter;
use crate::pipeline::ExecutionMode;
use crate::resolver::{DriverTypeMap, NameResolverKind};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Run settings with validation
#[derive(Clone, Debug, Default, PartialEq, Validate, Serialize, Deserialize)]
#[validate(schema(function = "validate_table_lists"))]
pub struct RunConfig {
    /// `naive` keeps join tables as vertices, `naive-aggregate` collapses them
    pub execution_mode: ExecutionMode,

    pub name_resolver: NameResolverKind,

    /// Selects the source-type lookup table
    pub driver: DriverTypeMap,

    /// Only these tables are read (empty means all)
    #[validate(custom(function = "no_blank_entries"))]
    pub include_tables: Vec<String>,

    /// These tables are skipped
    #[validate(custom(function = "no_blank_entries"))]
    pub exclude_tables: Vec<String>,
}

/// Partial settings from a YAML file or the command line; set fields
/// override the layer below.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunOverrides {
    pub execution_mode: Option<ExecutionMode>,
    pub name_resolver: Option<NameResolverKind>,
    pub driver: Option<DriverTypeMap>,
    pub include_tables: Option<Vec<String>>,
    pub exclude_tables: Option<Vec<String>>,
}

impl RunConfig {
    /// Create configuration from `RELGRAPH_*` environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            execution_mode: parse_env_var("RELGRAPH_MODE", "naive")?,
            name_resolver: parse_env_var("RELGRAPH_NAME_RESOLVER", "java")?,
            driver: parse_env_var("RELGRAPH_DRIVER", "generic")?,
            include_tables: list_env_var("RELGRAPH_INCLUDE"),
            exclude_tables: list_env_var("RELGRAPH_EXCLUDE"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Read overrides from a YAML settings file
    pub fn overrides_from_yaml_file<P: AsRef<Path>>(path: P) -> Result<RunOverrides, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })
    }

    /// Environment, then the settings file, then the command line
    pub fn load(settings_file: Option<&Path>, cli: RunOverrides) -> Result<Self, ConfigError> {
        let mut config = Self::from_env()?;
        if let Some(path) = settings_file {
            config.merge(Self::overrides_from_yaml_file(path)?);
        }
        config.merge(cli);

        config.validate()?;
        Ok(config)
    }

    pub fn merge(&mut self, other: RunOverrides) {
        if let Some(mode) = other.execution_mode {
            self.execution_mode = mode;
        }
        if let Some(resolver) = other.name_resolver {
            self.name_resolver = resolver;
        }
        if let Some(driver) = other.driver {
            self.driver = driver;
        }
        if let Some(include) = other.include_tables {
            self.include_tables = include;
        }
        if let Some(exclude) = other.exclude_tables {
            self.exclude_tables = exclude;
        }
    }

    pub fn table_filter(&self) -> TableFilter {
        TableFilter::new(self.include_tables.clone(), self.exclude_tables.clone())
    }
}

fn validate_table_lists(config: &RunConfig) -> Result<(), ValidationError> {
    if !config.include_tables.is_empty() && !config.exclude_tables.is_empty() {
        let mut error = ValidationError::new("include_and_exclude");
        error.message = Some("include and exclude table lists cannot both be set".into());
        return Err(error);
    }
    Ok(())
}

fn no_blank_entries(tables: &[String]) -> Result<(), ValidationError> {
    if tables.iter().any(|t| t.trim().is_empty()) {
        let mut error = ValidationError::new("blank_table_name");
        error.message = Some("table names cannot be empty".into());
        return Err(error);
    }
    Ok(())
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

/// Comma-separated list, empty when unset
fn list_env_var(key: &str) -> Vec<String> {
    env::var(key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
