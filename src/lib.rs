//! # Food Waste Insights
//!
//! Forecasting and country clustering over a cleaned food-waste dataset.
//!
//! The workspace is split by concern:
//!
//! - [`waste_data`] loads the cleaned dataset and exposes typed columns.
//! - [`waste_forecast`] builds monthly series and forecasts them with an
//!   ARIMA primary model and an exponential smoothing fallback.
//! - [`waste_cluster`] aggregates per-country features and clusters them.
//!
//! This crate ties them together behind a TOML [`AnalysisConfig`] and the
//! `food-waste-insights` binary.
//!
//! ## Example
//!
//! ```no_run
//! use food_waste_insights::{AnalysisConfig, Pipeline};
//!
//! let config = AnalysisConfig::from_file("config/insights.toml")?;
//! let report = Pipeline::new(config)?.run_all()?;
//! println!("silhouette {:.2}", report.clustering.silhouette());
//! # Ok::<(), food_waste_insights::InsightsError>(())
//! ```

use thiserror::Error;

pub mod config;
pub mod pipeline;

pub use crate::config::{AnalysisConfig, ConfigError};
pub use crate::pipeline::{AnalysisReport, Pipeline};
pub use waste_cluster;
pub use waste_data;
pub use waste_forecast;

/// Errors surfaced by a pipeline run
#[derive(Debug, Error)]
pub enum InsightsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] waste_data::DataError),

    #[error(transparent)]
    Forecast(#[from] waste_forecast::ForecastError),

    #[error(transparent)]
    Cluster(#[from] waste_cluster::ClusterError),
}

/// Result type of the pipeline
pub type Result<T> = std::result::Result<T, InsightsError>;
