//! Error types for the rental pricer

use thiserror::Error;

/// Result type alias for pricer operations
pub type Result<T> = std::result::Result<T, PricerError>;

/// Main error type for cleaning, encoding and prediction
#[derive(Error, Debug)]
pub enum PricerError {
    #[error("Data error: {0}")]
    DataError(String),

    /// Fatal for the dataset being cleaned: unsupported coercion type,
    /// a declared column that is absent or never coerces, or a schema that
    /// cannot be built.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// A categorical selection (or a vector column) has no counterpart in the
    /// schema the model was trained against.
    #[error("Schema violation: column '{column}' has no entry for value '{value}'")]
    SchemaViolation { column: String, value: String },

    #[error("Model unavailable for city '{city}': {reason}")]
    UpstreamUnavailable { city: String, reason: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },
}

impl PricerError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        PricerError::ConfigError(msg.into())
    }

    pub(crate) fn schema_violation(column: impl Into<String>, value: impl Into<String>) -> Self {
        PricerError::SchemaViolation {
            column: column.into(),
            value: value.into(),
        }
    }
}

impl From<polars::error::PolarsError> for PricerError {
    fn from(err: polars::error::PolarsError) -> Self {
        PricerError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PricerError {
    fn from(err: serde_json::Error) -> Self {
        PricerError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PricerError {
    fn from(err: ndarray::ShapeError) -> Self {
        PricerError::ShapeError {
            expected: "single feature row".to_string(),
            actual: err.to_string(),
        }
    }
}
