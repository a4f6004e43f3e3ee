//! Utility functions for the waste_forecast crate

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use waste_data::dates::{add_months, month_start};

/// Month starts for the `horizon` months following `last_observed`
pub fn future_month_starts(last_observed: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>> {
    let base = month_start(last_observed);
    (1..=horizon)
        .map(|offset| {
            u32::try_from(offset)
                .ok()
                .and_then(|months| add_months(base, months))
                .ok_or_else(|| {
                    ForecastError::InvalidInput(format!(
                        "Forecast month {} after {} is out of range",
                        offset, last_observed
                    ))
                })
        })
        .collect()
}

/// One-step-ahead accuracy of `predictions` against `actual`.
///
/// The first `warm_up` predictions only repeat observations and are left out
/// of every metric. MAPE is taken over non-zero actuals.
pub fn forecast_accuracy(
    predictions: &[f64],
    actual: &[f64],
    warm_up: usize,
) -> Result<ForecastAccuracy> {
    if predictions.len() != actual.len() {
        return Err(ForecastError::InvalidInput(format!(
            "Predictions ({}) and actual values ({}) differ in length",
            predictions.len(),
            actual.len()
        )));
    }
    let scored: Vec<(f64, f64)> = predictions
        .iter()
        .zip(actual)
        .skip(warm_up)
        .map(|(&p, &a)| (p, a))
        .collect();
    if scored.is_empty() {
        return Err(ForecastError::InvalidInput(format!(
            "No predictions left after {} warm-up values",
            warm_up
        )));
    }

    let n = scored.len() as f64;
    let mut abs_error = 0.0;
    let mut sq_error = 0.0;
    let mut pct_error = 0.0;
    let mut pct_count = 0usize;
    let mut sym_error = 0.0;
    for &(p, a) in &scored {
        let error = (a - p).abs();
        abs_error += error;
        sq_error += error * error;
        if a != 0.0 {
            pct_error += error / a.abs();
            pct_count += 1;
        }
        let magnitude = a.abs() + p.abs();
        if magnitude > 0.0 {
            sym_error += 2.0 * error / magnitude;
        }
    }

    Ok(ForecastAccuracy {
        scored: scored.len(),
        mae: abs_error / n,
        rmse: (sq_error / n).sqrt(),
        mape: if pct_count == 0 {
            0.0
        } else {
            100.0 * pct_error / pct_count as f64
        },
        smape: 100.0 * sym_error / n,
    })
}

/// In-sample accuracy of a fitted model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastAccuracy {
    /// Months the metrics were computed over
    pub scored: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Percent
    pub mape: f64,
    /// Percent
    pub smape: f64,
}

impl std::fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "In-sample accuracy over {} months: MAE {:.4}, RMSE {:.4}, MAPE {:.2}%, SMAPE {:.2}%",
            self.scored, self.mae, self.rmse, self.mape, self.smape
        )
    }
}
