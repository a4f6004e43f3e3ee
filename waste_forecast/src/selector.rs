//! Primary/fallback model selection.
//!
//! [`ForecastSelector`] walks an explicit state machine: the primary ARIMA
//! model is loaded from the store or fitted, its forecast is checked by the
//! predicates in this module, and exponential smoothing takes over when any
//! of them reports a [`FallbackReason`].

use crate::artifact;
use crate::error::{ForecastError, ModelFitFault, Result};
use crate::models::{
    ArimaModel, ArimaOrder, ExponentialSmoothing, FittedModel, ForecastMethod, ForecastModel,
    TrainedArimaModel, TrainedForecastModel, Trend,
};
use crate::store::{ModelStore, StoreError};
use crate::utils::{forecast_accuracy, ForecastAccuracy};
use std::fmt;

/// Order of the primary model
pub const PRIMARY_ORDER: ArimaOrder = ArimaOrder { p: 1, d: 1, q: 1 };

/// Relative tolerance under which two forecast values count as identical
const DEGENERATE_TOLERANCE: f64 = 1e-9;

/// Position of a selector in the fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorState {
    NoModel,
    PrimaryAttempted,
    PrimaryOk,
    PrimaryFailed,
    FallbackAttempted,
    FallbackOk,
    FallbackFailed,
}

impl SelectorState {
    /// No further transitions leave this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SelectorState::PrimaryOk | SelectorState::FallbackOk | SelectorState::FallbackFailed
        )
    }
}

/// Why the primary model was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// Fitting or loading the primary model failed
    FitFault(ModelFitFault),
    /// The forecast is empty or has no finite value
    MissingForecast,
    /// Some forecast values are NaN or infinite
    NonFinite,
    /// Every forecast value is the same
    Degenerate,
    LengthMismatch { expected: usize, got: usize },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::FitFault(fault) => write!(f, "fit fault: {}", fault),
            FallbackReason::MissingForecast => write!(f, "missing forecast"),
            FallbackReason::NonFinite => write!(f, "non-finite forecast values"),
            FallbackReason::Degenerate => write!(f, "degenerate (constant) forecast"),
            FallbackReason::LengthMismatch { expected, got } => {
                write!(f, "forecast has {} values, expected {}", got, expected)
            }
        }
    }
}

/// Forecast is empty or entirely non-finite
pub fn is_missing(values: &[f64]) -> bool {
    values.iter().all(|value| !value.is_finite())
}

/// Every value equals the first, up to a relative tolerance.
///
/// A single value carries no variation to judge, so it is never degenerate
/// here; a one-month forecast is judged on the model through
/// [`TrainedArimaModel::is_constant`].
pub fn is_degenerate(values: &[f64]) -> bool {
    match values {
        [first, rest @ ..] if !rest.is_empty() => {
            let tolerance = DEGENERATE_TOLERANCE * first.abs().max(1.0);
            rest.iter().all(|value| (value - first).abs() <= tolerance)
        }
        _ => false,
    }
}

/// First reason the primary forecast is unusable, if any
pub fn check_primary_forecast(values: &[f64], horizon: usize) -> Option<FallbackReason> {
    if is_missing(values) {
        Some(FallbackReason::MissingForecast)
    } else if values.len() != horizon {
        Some(FallbackReason::LengthMismatch {
            expected: horizon,
            got: values.len(),
        })
    } else if values.iter().any(|value| !value.is_finite()) {
        Some(FallbackReason::NonFinite)
    } else if is_degenerate(values) {
        Some(FallbackReason::Degenerate)
    } else {
        None
    }
}

/// Outcome of one selection
#[derive(Debug, Clone)]
pub struct Selection {
    /// Forecast values, one per month of the horizon
    pub values: Vec<f64>,
    pub method: ForecastMethod,
    /// Model that produced `values`
    pub model: FittedModel,
    /// The primary model came from the store instead of a fresh fit
    pub reused_artifact: bool,
    /// Set when the fallback produced the forecast
    pub fallback_reason: Option<FallbackReason>,
    /// In-sample one-step-ahead accuracy of `model` on the input series
    pub accuracy: Option<ForecastAccuracy>,
}

/// Fallback chain for one forecast invocation
pub struct ForecastSelector<'a> {
    store: &'a dyn ModelStore,
    primary: ArimaModel,
    fallback: ExponentialSmoothing,
    state: SelectorState,
    trail: Vec<SelectorState>,
}

impl<'a> ForecastSelector<'a> {
    /// ARIMA(1,1,1) primary with additive-trend exponential smoothing fallback
    pub fn new(store: &'a dyn ModelStore) -> Self {
        Self::with_models(
            store,
            ArimaModel::new(PRIMARY_ORDER.p, PRIMARY_ORDER.d, PRIMARY_ORDER.q),
            ExponentialSmoothing::new(Trend::Additive),
        )
    }

    pub fn with_models(
        store: &'a dyn ModelStore,
        primary: ArimaModel,
        fallback: ExponentialSmoothing,
    ) -> Self {
        Self {
            store,
            primary,
            fallback,
            state: SelectorState::NoModel,
            trail: vec![SelectorState::NoModel],
        }
    }

    /// Current state
    pub fn state(&self) -> SelectorState {
        self.state
    }

    /// States visited by the last selection, in order
    pub fn trail(&self) -> &[SelectorState] {
        &self.trail
    }

    /// Forecast `horizon` values from `series` (dense, oldest first).
    ///
    /// `key` names the scope's entry in the model store.
    pub fn select(&mut self, key: &str, series: &[f64], horizon: usize) -> Result<Selection> {
        if horizon == 0 {
            return Err(ForecastError::InvalidInput(
                "Forecast horizon must be positive".to_string(),
            ));
        }
        if series.is_empty() {
            return Err(ForecastError::InvalidInput(format!(
                "No observations to forecast for {}",
                key
            )));
        }

        self.state = SelectorState::NoModel;
        self.trail = vec![SelectorState::NoModel];

        self.enter(SelectorState::PrimaryAttempted);
        let reason = match self.primary_model(key, series) {
            Ok((model, reused)) => {
                let values = model.forecast(horizon);
                let rejected = check_primary_forecast(&values, horizon)
                    .or_else(|| model.is_constant().then_some(FallbackReason::Degenerate));
                match rejected {
                    None => {
                        self.enter(SelectorState::PrimaryOk);
                        let model = FittedModel::from(model);
                        if !reused {
                            self.persist(key, &model);
                        }
                        log::info!("{}: forecast {} months with {}", key, horizon, model.name());
                        return Ok(self.finish(
                            values,
                            ForecastMethod::Primary,
                            model,
                            reused,
                            None,
                            series,
                        ));
                    }
                    Some(reason) => reason,
                }
            }
            Err(fault) => FallbackReason::FitFault(fault),
        };

        self.enter(SelectorState::PrimaryFailed);
        log::info!("{}: primary model rejected ({}), using fallback", key, reason);

        self.enter(SelectorState::FallbackAttempted);
        let fitted = self.fallback.fit(series).and_then(|model| {
            let values = model.forecast(horizon);
            if values.iter().all(|value| value.is_finite()) {
                Ok((model, values))
            } else {
                Err(ModelFitFault::NonFinite(format!("{} forecast", model.name())))
            }
        });

        match fitted {
            Ok((model, values)) => {
                self.enter(SelectorState::FallbackOk);
                log::info!("{}: forecast {} months with {}", key, horizon, model.name());
                Ok(self.finish(
                    values,
                    ForecastMethod::Fallback,
                    model.into(),
                    false,
                    Some(reason),
                    series,
                ))
            }
            Err(fault) => {
                self.enter(SelectorState::FallbackFailed);
                Err(ForecastError::Exhausted {
                    primary: reason,
                    source: fault,
                })
            }
        }
    }

    fn enter(&mut self, state: SelectorState) {
        log::trace!("selector: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.trail.push(state);
    }

    /// Stored primary model for `key` re-anchored on `series`, or a fresh fit.
    ///
    /// Unreadable or incompatible artifacts are discarded and refitted.
    fn primary_model(
        &self,
        key: &str,
        series: &[f64],
    ) -> std::result::Result<(TrainedArimaModel, bool), ModelFitFault> {
        let stored = self.load_primary(key).and_then(|stored| {
            stored
                .map(|model| {
                    model.reanchor(series).map_err(|fault| StoreError::Corrupt {
                        key: key.to_string(),
                        reason: format!(
                            "stored {} does not fit the series: {}",
                            model.name(),
                            fault
                        ),
                    })
                })
                .transpose()
        });

        match stored {
            Ok(Some(model)) => {
                log::debug!(
                    "{}: reusing stored {} on {} observations",
                    key,
                    model.name(),
                    model.training_len()
                );
                return Ok((model, true));
            }
            Ok(None) => {}
            Err(e @ StoreError::Corrupt { .. }) => {
                log::warn!("{}; discarding it and refitting", e);
                if let Err(e) = self.store.invalidate(key) {
                    log::warn!("Could not invalidate artifact for {}: {}", key, e);
                }
            }
            Err(e) => log::warn!("Could not read artifact for {}: {}; refitting", key, e),
        }

        self.primary.fit(series).map(|model| (model, false))
    }

    fn load_primary(
        &self,
        key: &str,
    ) -> std::result::Result<Option<TrainedArimaModel>, StoreError> {
        let Some(blob) = self.store.load(key)? else {
            return Ok(None);
        };
        match artifact::decode(key, &blob)? {
            FittedModel::Arima(arima) if arima.order() == self.primary.order() => Ok(Some(arima)),
            other => Err(StoreError::Corrupt {
                key: key.to_string(),
                reason: format!("expected {}, found {}", self.primary.order(), other.name()),
            }),
        }
    }

    fn persist(&self, key: &str, model: &FittedModel) {
        let saved = artifact::encode(key, model).and_then(|blob| self.store.save(key, &blob));
        if let Err(e) = saved {
            log::warn!("Could not save model artifact for {}: {}", key, e);
        }
    }

    fn finish(
        &self,
        values: Vec<f64>,
        method: ForecastMethod,
        model: FittedModel,
        reused_artifact: bool,
        fallback_reason: Option<FallbackReason>,
        series: &[f64],
    ) -> Selection {
        let accuracy = forecast_accuracy(&model.predict(series), series, model.warm_up()).ok();
        if let Some(accuracy) = &accuracy {
            log::debug!(
                "{} in-sample accuracy: mae={:.4} rmse={:.4}",
                model.name(),
                accuracy.mae,
                accuracy.rmse
            );
        }
        Selection {
            values,
            method,
            model,
            reused_artifact,
            fallback_reason,
            accuracy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_degenerate() {
        assert!(is_degenerate(&[5.0, 5.0, 5.0]));
        assert!(is_degenerate(&[1e6, 1e6 + 1e-4]));
        assert!(!is_degenerate(&[5.0, 5.1]));
        assert!(!is_degenerate(&[5.0]));
        assert!(!is_degenerate(&[]));
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing(&[]));
        assert!(is_missing(&[f64::NAN, f64::INFINITY]));
        assert!(!is_missing(&[f64::NAN, 1.0]));
    }

    #[test]
    fn test_check_primary_forecast_order() {
        assert_eq!(check_primary_forecast(&[], 3), Some(FallbackReason::MissingForecast));
        assert_eq!(
            check_primary_forecast(&[1.0, 2.0], 3),
            Some(FallbackReason::LengthMismatch { expected: 3, got: 2 })
        );
        assert_eq!(
            check_primary_forecast(&[1.0, f64::NAN, 2.0], 3),
            Some(FallbackReason::NonFinite)
        );
        assert_eq!(
            check_primary_forecast(&[2.0, 2.0, 2.0], 3),
            Some(FallbackReason::Degenerate)
        );
        assert_eq!(check_primary_forecast(&[1.0, 2.0, 3.0], 3), None);
        assert_eq!(check_primary_forecast(&[7.0], 1), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(SelectorState::PrimaryOk.is_terminal());
        assert!(SelectorState::FallbackFailed.is_terminal());
        assert!(!SelectorState::PrimaryFailed.is_terminal());
    }
}
