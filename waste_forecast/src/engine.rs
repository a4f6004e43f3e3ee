//! Forecast orchestration: dataset → series → selector → dated result

use crate::error::{ForecastError, Result};
use crate::models::{ForecastMethod, ForecastResult, TrainedForecastModel};
use crate::scope::ForecastScope;
use crate::selector::{FallbackReason, ForecastSelector};
use crate::series::{GapFill, SeriesBuilder, TimeSeries};
use crate::store::{ModelStore, NullModelStore};
use crate::utils::ForecastAccuracy;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use waste_data::WasteDataset;

/// Tunables of the engine that do not change per invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastOptions {
    /// Policy for months without rows inside the observed span
    #[serde(default)]
    pub gap_fill: GapFill,
}

/// Everything one forecast invocation produced
#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub scope: ForecastScope,
    pub result: ForecastResult,
    /// Why the primary model was rejected, for fallback forecasts
    pub fallback_reason: Option<FallbackReason>,
    /// The primary model was loaded from the store
    pub reused_artifact: bool,
    /// Observations in the trimmed input series
    pub training_len: usize,
    pub accuracy: Option<ForecastAccuracy>,
    /// Trimmed input series, gaps still explicit
    pub history: TimeSeries,
}

impl ForecastRun {
    pub fn method(&self) -> ForecastMethod {
        self.result.method()
    }
}

/// Builds series per scope and forecasts them through the fallback chain
#[derive(Clone)]
pub struct ForecastEngine {
    store: Arc<dyn ModelStore>,
    options: ForecastOptions,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new(Arc::new(NullModelStore))
    }
}

impl ForecastEngine {
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self {
            store,
            options: ForecastOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ForecastOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ForecastOptions {
        &self.options
    }

    /// Forecast `horizon` months of total waste for `scope`
    pub fn run(
        &self,
        dataset: &WasteDataset,
        scope: &ForecastScope,
        horizon: i64,
    ) -> Result<ForecastRun> {
        let horizon = validate_horizon(horizon)?;
        let series = SeriesBuilder::new(scope.clone()).build(dataset)?;
        self.forecast_series(scope, &series, horizon)
    }

    /// Forecast an already built monthly series
    pub fn run_series(
        &self,
        scope: &ForecastScope,
        series: &TimeSeries,
        horizon: i64,
    ) -> Result<ForecastRun> {
        let horizon = validate_horizon(horizon)?;
        self.forecast_series(scope, series, horizon)
    }

    /// Forecast several scopes in parallel.
    ///
    /// Results come back in the order of `scopes`; one failing scope does not
    /// affect the others.
    pub fn run_many(
        &self,
        dataset: &WasteDataset,
        scopes: &[ForecastScope],
        horizon: i64,
    ) -> Vec<(ForecastScope, Result<ForecastRun>)> {
        scopes
            .par_iter()
            .map(|scope| (scope.clone(), self.run(dataset, scope, horizon)))
            .collect()
    }

    /// Drop the stored primary model of `scope` so the next run refits
    pub fn invalidate(&self, scope: &ForecastScope) -> Result<()> {
        self.store.invalidate(&scope.key())?;
        log::info!("Invalidated stored model for {}", scope);
        Ok(())
    }

    fn forecast_series(
        &self,
        scope: &ForecastScope,
        series: &TimeSeries,
        horizon: usize,
    ) -> Result<ForecastRun> {
        let history = series.trim_missing();
        let Some(last_observed) = history.last_date() else {
            return Err(ForecastError::InvalidInput(format!(
                "No observations for {}",
                scope
            )));
        };

        if history.missing_count() > 0 {
            log::debug!(
                "{}: filling {} missing months ({:?})",
                scope,
                history.missing_count(),
                self.options.gap_fill
            );
        }
        let dense = history.filled(self.options.gap_fill);

        let mut selector = ForecastSelector::new(self.store.as_ref());
        let selection = selector.select(&scope.key(), &dense, horizon)?;

        let result = ForecastResult::new(
            last_observed,
            selection.values,
            horizon,
            selection.method,
            selection.model.name(),
        )?;

        Ok(ForecastRun {
            scope: scope.clone(),
            result,
            fallback_reason: selection.fallback_reason,
            reused_artifact: selection.reused_artifact,
            training_len: dense.len(),
            accuracy: selection.accuracy,
            history,
        })
    }
}

fn validate_horizon(horizon: i64) -> Result<usize> {
    if horizon <= 0 {
        return Err(ForecastError::InvalidInput(format!(
            "Forecast horizon must be positive, got {}",
            horizon
        )));
    }
    usize::try_from(horizon).map_err(|_| {
        ForecastError::InvalidInput(format!("Forecast horizon {} is too large", horizon))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_horizon() {
        assert_eq!(validate_horizon(12).unwrap(), 12);
        assert!(matches!(validate_horizon(0), Err(ForecastError::InvalidInput(_))));
        assert!(matches!(validate_horizon(-3), Err(ForecastError::InvalidInput(_))));
    }
}
