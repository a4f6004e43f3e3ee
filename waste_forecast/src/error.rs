//! Error types for the waste_forecast crate

use crate::selector::FallbackReason;
use crate::store::StoreError;
use thiserror::Error;
use waste_data::DataError;

/// Errors surfaced to callers of the forecasting engine
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Rejected invocation parameters or an unusable series
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error while reading the cleaned dataset
    #[error("Data error: {0}")]
    DataError(#[from] DataError),

    /// Both the primary and the fallback model failed on this series
    #[error("Forecast exhausted: primary model rejected ({primary}), fallback failed: {source}")]
    Exhausted {
        primary: FallbackReason,
        #[source]
        source: ModelFitFault,
    },

    /// Error from the model store
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error while writing forecast tables
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Faults raised while fitting a single model.
///
/// These never reach callers directly: the selector turns a primary fault into
/// a fallback and wraps a fallback fault in [`ForecastError::Exhausted`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelFitFault {
    #[error("{model} needs at least {needed} observations, got {got}")]
    InsufficientData {
        model: String,
        needed: usize,
        got: usize,
    },

    #[error("non-finite values in {0}")]
    NonFinite(String),

    #[error("singular estimation system in {0}")]
    Singular(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
