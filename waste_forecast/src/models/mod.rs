//! Forecasting models for monthly waste series

use crate::error::{ForecastError, ModelFitFault, Result};
use crate::utils::future_month_starts;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

pub mod arima;
pub mod exponential_smoothing;

pub use arima::{ArimaModel, ArimaOrder, TrainedArimaModel};
pub use exponential_smoothing::{ExponentialSmoothing, TrainedExponentialSmoothing, Trend};

/// Which link of the fallback chain produced a forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    Primary,
    Fallback,
}

impl ForecastMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMethod::Primary => "primary",
            ForecastMethod::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One forecasted month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Forecast of a fixed number of months following the last observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    /// Forecasted months, contiguous and ascending
    points: Vec<ForecastPoint>,
    /// Link of the fallback chain that produced the values
    method: ForecastMethod,
    /// Name of the fitted model, e.g. `ARIMA(1,1,1)`
    model: String,
}

impl ForecastResult {
    /// Attach month-start dates to `values`, starting one month after `last_observed`
    pub fn new(
        last_observed: NaiveDate,
        values: Vec<f64>,
        horizon: usize,
        method: ForecastMethod,
        model: impl Into<String>,
    ) -> Result<Self> {
        if values.len() != horizon {
            return Err(ForecastError::InvalidInput(format!(
                "Values length ({}) doesn't match horizon ({})",
                values.len(),
                horizon
            )));
        }

        let dates = future_month_starts(last_observed, horizon)?;
        let points = dates
            .into_iter()
            .zip(values)
            .map(|(date, value)| ForecastPoint { date, value })
            .collect();

        Ok(Self {
            points,
            method,
            model: model.into(),
        })
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.value).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|point| point.date).collect()
    }

    /// Number of months forecasted
    pub fn horizon(&self) -> usize {
        self.points.len()
    }

    pub fn method(&self) -> ForecastMethod {
        self.method
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

/// Forecast model that can be fitted to a dense series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Fit the model to the observations, oldest first
    fn fit(&self, series: &[f64]) -> std::result::Result<Self::Trained, ModelFitFault>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Fitted model able to extend its training series
pub trait TrainedForecastModel: Debug {
    /// Values for the next `horizon` periods
    fn forecast(&self, horizon: usize) -> Vec<f64>;

    /// One-step-ahead in-sample predictions for `series`
    fn predict(&self, series: &[f64]) -> Vec<f64>;

    /// Leading predictions that only repeat observations
    fn warm_up(&self) -> usize;

    /// Number of observations the model was fitted on
    fn training_len(&self) -> usize;

    /// Name of the model
    fn name(&self) -> &str;
}

/// A fitted model of either family, in the shape it is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedModel {
    Arima(TrainedArimaModel),
    ExponentialSmoothing(TrainedExponentialSmoothing),
}

impl FittedModel {
    /// Parameter vectors match the declared order and every number is finite
    pub fn is_consistent(&self) -> bool {
        match self {
            FittedModel::Arima(model) => model.is_consistent(),
            FittedModel::ExponentialSmoothing(model) => model.is_consistent(),
        }
    }
}

impl TrainedForecastModel for FittedModel {
    fn forecast(&self, horizon: usize) -> Vec<f64> {
        match self {
            FittedModel::Arima(model) => model.forecast(horizon),
            FittedModel::ExponentialSmoothing(model) => model.forecast(horizon),
        }
    }

    fn predict(&self, series: &[f64]) -> Vec<f64> {
        match self {
            FittedModel::Arima(model) => model.predict(series),
            FittedModel::ExponentialSmoothing(model) => model.predict(series),
        }
    }

    fn warm_up(&self) -> usize {
        match self {
            FittedModel::Arima(model) => model.warm_up(),
            FittedModel::ExponentialSmoothing(model) => model.warm_up(),
        }
    }

    fn training_len(&self) -> usize {
        match self {
            FittedModel::Arima(model) => model.training_len(),
            FittedModel::ExponentialSmoothing(model) => model.training_len(),
        }
    }

    fn name(&self) -> &str {
        match self {
            FittedModel::Arima(model) => model.name(),
            FittedModel::ExponentialSmoothing(model) => model.name(),
        }
    }
}

impl From<TrainedArimaModel> for FittedModel {
    fn from(model: TrainedArimaModel) -> Self {
        FittedModel::Arima(model)
    }
}

impl From<TrainedExponentialSmoothing> for FittedModel {
    fn from(model: TrainedExponentialSmoothing) -> Self {
        FittedModel::ExponentialSmoothing(model)
    }
}

/// Reject series containing NaN or infinities
pub(crate) fn ensure_finite(series: &[f64], model: &str) -> std::result::Result<(), ModelFitFault> {
    if series.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(ModelFitFault::NonFinite(format!("{} input series", model)))
    }
}
