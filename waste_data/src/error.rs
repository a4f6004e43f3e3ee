//! Error types for the waste_data crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while loading or reading the cleaned dataset
#[derive(Debug, Error)]
pub enum DataError {
    /// A required column is absent from the dataset
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A column exists but holds values of an unusable type
    #[error("Column '{column}' has unsupported type {dtype}")]
    UnsupportedType { column: String, dtype: String },

    /// A value could not be interpreted (e.g. an unparseable date)
    #[error("Invalid value in column '{column}' at row {row}: {value}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, DataError>;

impl From<PolarsError> for DataError {
    fn from(err: PolarsError) -> Self {
        DataError::PolarsError(err.to_string())
    }
}
