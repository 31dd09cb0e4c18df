//! # Mapping Error Types
//!
//! Error handling for schema extraction, hierarchy resolution and the
//! application of mapping configurations.
//!
//! ## Error Categories
//!
//! - **Metadata Errors**: failures while reading the source catalog (fatal)
//! - **Configuration Errors**: missing fields, invalid enum values, join tables
//!   under a non-aggregating execution mode (fatal)
//! - **Descriptor Errors**: malformed inheritance descriptors (fatal)
//!
//! Recoverable conditions (missing primary keys, unknown source types, skipped
//! aggregations) are not errors: they are recorded as warnings on the
//! [`MappingContext`](crate::pipeline::MappingContext).
//!
//! ## Usage Patterns
//!
//! ```ignore
//! // Provides what and where
//! MappingError::metadata_error_with_context(
//!     "EMPLOYEE",
//!     "While reading imported keys",
//!     err,
//! )
//!
//! MappingError::missing_field("tableName", "Employee")
//! ```

use thiserror::Error;

/// Boxed cause kept alongside metadata failures
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Metadata access failed: {context}: {source}")]
    Metadata {
        context: String,
        #[source]
        source: BoxedCause,
    },
    #[error("Configuration error: missing mandatory field '{field}' in '{class}'")]
    MissingConfigField { field: String, class: String },
    #[error("Configuration error: invalid value '{value}' for '{field}' in '{class}'")]
    InvalidConfigValue {
        field: String,
        value: String,
        class: String,
    },
    #[error(
        "Configuration error: edge '{edge}' is backed by join table '{join_table}', \
         which requires an aggregating execution mode"
    )]
    JoinTableInNaiveMode { edge: String, join_table: String },
    #[error("Configuration error: ambiguous mapping: {message}")]
    AmbiguousMapping { message: String },
    #[error("Table '{table}' not found in source schema ({context})")]
    UnknownTable { table: String, context: String },
    #[error("Column '{column}' not found in table '{table}'")]
    UnknownColumn { column: String, table: String },
    #[error("Failed to read configuration file '{path}': {error}")]
    ConfigRead { path: String, error: String },
    #[error("Failed to parse configuration: {error}")]
    ConfigParse { error: String },
    #[error("Invalid inheritance descriptor: {message}")]
    InvalidDescriptor { message: String },
}

pub type Result<T> = std::result::Result<T, MappingError>;

/// Helper methods for creating errors with context information
impl MappingError {
    /// Wrap a metadata-provider failure with the table and phase it happened in
    ///
    /// # Example
    /// ```ignore
    /// MappingError::metadata_error_with_context("EMPLOYEE", "While reading columns", err)
    /// ```
    pub fn metadata_error_with_context(
        table: impl Into<String>,
        context: impl Into<String>,
        source: impl Into<BoxedCause>,
    ) -> Self {
        MappingError::Metadata {
            context: format!("table '{}'\n  Context: {}", table.into(), context.into()),
            source: source.into(),
        }
    }

    /// Create a configuration error for a field that must be present
    pub fn missing_field(field: impl Into<String>, class: impl Into<String>) -> Self {
        MappingError::MissingConfigField {
            field: field.into(),
            class: class.into(),
        }
    }

    /// Create a configuration error for an unsupported enum value
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        MappingError::InvalidConfigValue {
            field: field.into(),
            value: value.into(),
            class: class.into(),
        }
    }

    /// Create a configuration error with context information
    ///
    /// # Example
    /// ```ignore
    /// MappingError::config_error_with_context(
    ///     "mapping.json",
    ///     "While parsing the edge list"
    /// )
    /// ```
    pub fn config_error_with_context(
        config_path: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        MappingError::ConfigParse {
            error: format!(
                "Configuration error in '{}'\n  Context: {}",
                config_path.into(),
                context.into()
            ),
        }
    }

    /// True for errors that come from the user-supplied configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            MappingError::MissingConfigField { .. }
                | MappingError::InvalidConfigValue { .. }
                | MappingError::JoinTableInNaiveMode { .. }
                | MappingError::AmbiguousMapping { .. }
                | MappingError::ConfigRead { .. }
                | MappingError::ConfigParse { .. }
        )
    }
}

impl From<rusqlite::Error> for MappingError {
    fn from(err: rusqlite::Error) -> Self {
        MappingError::Metadata {
            context: "sqlite catalog query".to_string(),
            source: Box::new(err),
        }
    }
}
