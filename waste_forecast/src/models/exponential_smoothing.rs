//! Exponential smoothing models for time series forecasting

use crate::error::{ForecastError, ModelFitFault, Result};
use crate::models::{ensure_finite, ForecastModel, TrainedForecastModel};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse grid step for the smoothing parameters
const GRID_STEP: f64 = 0.05;
/// Refinement step around the best coarse point
const REFINE_STEP: f64 = 0.01;
/// Refinement reaches this far on either side of the coarse optimum
const REFINE_SPAN: i32 = 4;
const PARAM_MIN: f64 = 0.01;
const PARAM_MAX: f64 = 0.99;

/// Trend component of the smoothing recursion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Level only (simple exponential smoothing)
    None,
    /// Level plus additive slope (Holt's linear method)
    #[default]
    Additive,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::None => f.write_str("none"),
            Trend::Additive => f.write_str("additive"),
        }
    }
}

/// Exponential smoothing model.
///
/// Without fixed parameters, alpha (and beta for the additive trend) are
/// chosen by minimizing the one-step-ahead squared error over a grid.
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    /// Name of the model
    name: String,
    trend: Trend,
    /// Fixed `(alpha, beta)`; searched when absent
    params: Option<(f64, f64)>,
}

/// Trained exponential smoothing model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedExponentialSmoothing {
    /// Name of the model
    name: String,
    trend: Trend,
    /// Level smoothing parameter
    alpha: f64,
    /// Slope smoothing parameter, zero without trend
    beta: f64,
    /// Final level
    level: f64,
    /// Final slope
    slope: f64,
    /// One-step-ahead sum of squared errors
    sse: f64,
    training_len: usize,
}

/// Final state of one pass of the recursion
#[derive(Debug, Clone, Copy)]
struct Smoothed {
    level: f64,
    slope: f64,
    sse: f64,
}

impl ExponentialSmoothing {
    /// Create a new exponential smoothing model with searched parameters
    pub fn new(trend: Trend) -> Self {
        Self {
            name: model_name(trend),
            trend,
            params: None,
        }
    }

    /// Create a model with fixed smoothing parameters.
    ///
    /// `beta` is only checked for [`Trend::Additive`].
    pub fn with_params(trend: Trend, alpha: f64, beta: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ForecastError::InvalidInput(
                "Alpha must be between 0 and 1".to_string(),
            ));
        }
        let beta = match trend {
            Trend::None => 0.0,
            Trend::Additive if beta > 0.0 && beta < 1.0 => beta,
            Trend::Additive => {
                return Err(ForecastError::InvalidInput(
                    "Beta must be between 0 and 1".to_string(),
                ))
            }
        };

        Ok(Self {
            name: model_name(trend),
            trend,
            params: Some((alpha, beta)),
        })
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    /// Smallest series the recursion can be initialized from
    pub fn min_observations(&self) -> usize {
        match self.trend {
            Trend::None => 1,
            Trend::Additive => 2,
        }
    }

    fn search(&self, series: &[f64]) -> (f64, f64, Smoothed) {
        let has_trend = self.trend == Trend::Additive;
        let coarse: Vec<f64> = (1..=19).map(|i| i as f64 * GRID_STEP).collect();
        let betas = if has_trend { coarse.clone() } else { vec![0.0] };

        let mut best = (coarse[0], betas[0], smooth(series, self.trend, coarse[0], betas[0]));
        self.improve(series, &mut best, &coarse, &betas);

        let refine = |center: f64| -> Vec<f64> {
            (-REFINE_SPAN..=REFINE_SPAN)
                .map(|step| (center + step as f64 * REFINE_STEP).clamp(PARAM_MIN, PARAM_MAX))
                .collect()
        };
        let fine_alphas = refine(best.0);
        let fine_betas = if has_trend { refine(best.1) } else { vec![0.0] };
        self.improve(series, &mut best, &fine_alphas, &fine_betas);

        best
    }

    fn improve(
        &self,
        series: &[f64],
        best: &mut (f64, f64, Smoothed),
        alphas: &[f64],
        betas: &[f64],
    ) {
        for &alpha in alphas {
            for &beta in betas {
                let candidate = smooth(series, self.trend, alpha, beta);
                // Ties keep the earlier, smaller parameters
                if candidate.sse < best.2.sse {
                    *best = (alpha, beta, candidate);
                }
            }
        }
    }
}

impl ForecastModel for ExponentialSmoothing {
    type Trained = TrainedExponentialSmoothing;

    fn fit(
        &self,
        series: &[f64],
    ) -> std::result::Result<TrainedExponentialSmoothing, ModelFitFault> {
        let needed = self.min_observations();
        if series.len() < needed {
            return Err(ModelFitFault::InsufficientData {
                model: self.name.clone(),
                needed,
                got: series.len(),
            });
        }
        ensure_finite(series, &self.name)?;

        let (alpha, beta, state) = match self.params {
            Some((alpha, beta)) => (alpha, beta, smooth(series, self.trend, alpha, beta)),
            None => self.search(series),
        };

        if !(state.level.is_finite() && state.slope.is_finite() && state.sse.is_finite()) {
            return Err(ModelFitFault::NonFinite(format!("{} state", self.name)));
        }

        log::debug!(
            "{} fitted on {} observations: alpha={:.2} beta={:.2} sse={:.4}",
            self.name,
            series.len(),
            alpha,
            beta,
            state.sse
        );

        Ok(TrainedExponentialSmoothing {
            name: self.name.clone(),
            trend: self.trend,
            alpha,
            beta,
            level: state.level,
            slope: state.slope,
            sse: state.sse,
            training_len: series.len(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedExponentialSmoothing {
    pub fn trend(&self) -> Trend {
        self.trend
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn sse(&self) -> f64 {
        self.sse
    }

    pub(crate) fn is_consistent(&self) -> bool {
        let alpha_ok = self.alpha > 0.0 && self.alpha < 1.0;
        let beta_ok = match self.trend {
            Trend::None => self.beta == 0.0 && self.slope == 0.0,
            Trend::Additive => self.beta > 0.0 && self.beta < 1.0,
        };
        alpha_ok
            && beta_ok
            && self.level.is_finite()
            && self.slope.is_finite()
            && self.sse.is_finite()
    }
}

impl TrainedForecastModel for TrainedExponentialSmoothing {
    fn forecast(&self, horizon: usize) -> Vec<f64> {
        (1..=horizon)
            .map(|step| self.level + step as f64 * self.slope)
            .collect()
    }

    fn predict(&self, series: &[f64]) -> Vec<f64> {
        let Some(&first) = series.first() else {
            return Vec::new();
        };

        // First prediction is just the first observation
        let mut predictions = Vec::with_capacity(series.len());
        predictions.push(first);

        let mut level = first;
        let mut slope = initial_slope(series, self.trend);
        for &value in &series[1..] {
            predictions.push(level + slope);
            (level, slope) = step(level, slope, value, self.trend, self.alpha, self.beta);
        }
        predictions
    }

    fn warm_up(&self) -> usize {
        1
    }

    fn training_len(&self) -> usize {
        self.training_len
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn model_name(trend: Trend) -> String {
    match trend {
        Trend::None => "SimpleExponentialSmoothing".to_string(),
        Trend::Additive => "Holt".to_string(),
    }
}

fn initial_slope(series: &[f64], trend: Trend) -> f64 {
    match (trend, series) {
        (Trend::Additive, [first, second, ..]) => second - first,
        _ => 0.0,
    }
}

/// One update of the level and slope after observing `value`
fn step(level: f64, slope: f64, value: f64, trend: Trend, alpha: f64, beta: f64) -> (f64, f64) {
    let next_level = alpha * value + (1.0 - alpha) * (level + slope);
    let next_slope = match trend {
        Trend::None => 0.0,
        Trend::Additive => beta * (next_level - level) + (1.0 - beta) * slope,
    };
    (next_level, next_slope)
}

/// Run the recursion from `l0 = y0`, `b0 = y1 - y0`; `series` must be non-empty
fn smooth(series: &[f64], trend: Trend, alpha: f64, beta: f64) -> Smoothed {
    let mut level = series.first().copied().unwrap_or(0.0);
    let mut slope = initial_slope(series, trend);
    let mut sse = 0.0;

    for &value in series.iter().skip(1) {
        let error = value - (level + slope);
        sse += error * error;
        (level, slope) = step(level, slope, value, trend, alpha, beta);
    }

    Smoothed { level, slope, sse }
}
