//! # Waste Forecast
//!
//! Monthly forecasting of total food waste with an explicit fallback chain.
//!
//! The engine builds one monthly series per scope (global, country, category
//! or both), fits an ARIMA(1,1,1) primary model and falls back to
//! exponential smoothing with additive trend when the primary fit fails or
//! its forecast is unusable. Fitted primary models are persisted through a
//! [`ModelStore`] and reused until invalidated.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use waste_data::{ColumnMap, DataLoader};
//! use waste_forecast::{FileModelStore, ForecastEngine, ForecastScope};
//!
//! let dataset = DataLoader::from_csv("food_waste_clean.csv", ColumnMap::default())?;
//! let store = FileModelStore::new("models")?;
//! let engine = ForecastEngine::new(Arc::new(store));
//!
//! let run = engine.run(&dataset, &ForecastScope::country("France"), 12)?;
//! println!("{} forecast with {}", run.method(), run.result.model_name());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod artifact;
pub mod engine;
pub mod error;
pub mod export;
pub mod models;
pub mod scope;
pub mod selector;
pub mod series;
pub mod store;
pub mod utils;

pub use crate::engine::{ForecastEngine, ForecastOptions, ForecastRun};
pub use crate::error::{ForecastError, ModelFitFault, Result};
pub use crate::export::{save_forecast_csv, write_forecast_csv};
pub use crate::models::{
    ArimaModel, ExponentialSmoothing, FittedModel, ForecastMethod, ForecastModel, ForecastPoint,
    ForecastResult, TrainedForecastModel, Trend,
};
pub use crate::scope::ForecastScope;
pub use crate::selector::{FallbackReason, ForecastSelector, SelectorState};
pub use crate::series::{GapFill, SeriesBuilder, TimeSeries};
pub use crate::store::{FileModelStore, MemoryModelStore, ModelStore, NullModelStore, StoreError};
pub use crate::utils::{forecast_accuracy, ForecastAccuracy};
