//! ARIMA models for time series forecasting

use crate::error::ModelFitFault;
use crate::models::{ensure_finite, ForecastModel, TrainedForecastModel};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coefficient vectors are shrunk until their absolute sum stays below this,
/// which keeps the AR part stationary and the MA part invertible.
const MAX_COEFFICIENT_SUM: f64 = 0.99;

/// Differenced series with less relative variance than this carry no
/// AR/MA structure; only the drift is kept.
const FLAT_TOLERANCE: f64 = 1e-12;

/// Extra lags of the long autoregression used to estimate innovations
const LONG_AR_EXTRA_LAGS: usize = 2;

/// Singular values below this fraction of the largest one count as zero
const RANK_TOLERANCE: f64 = 1e-10;

/// Relative tolerance under which the drift of a static model is zero
const CONSTANT_TOLERANCE: f64 = 1e-9;

/// `(p, d, q)` order of an ARIMA model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// ARIMA model (AutoRegressive Integrated Moving Average) with drift.
///
/// Estimation follows Hannan–Rissanen: a long autoregression on the
/// differenced, demeaned series supplies innovation estimates, then the
/// AR and MA coefficients come from one least-squares regression on lagged
/// values and lagged innovations.
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    order: ArimaOrder,
}

/// Trained ARIMA model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedArimaModel {
    /// Name of the model
    name: String,
    order: ArimaOrder,
    /// Fitted AR coefficients
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients
    ma_coefficients: Vec<f64>,
    /// Mean of the differenced series
    drift: f64,
    /// Innovation variance
    sigma2: f64,
    /// Last `p` demeaned differenced values
    recent_deviations: Vec<f64>,
    /// Last `q` residuals
    recent_residuals: Vec<f64>,
    /// Last observation at each differencing level, level 0 first
    last_levels: Vec<f64>,
    training_len: usize,
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        let order = ArimaOrder { p, d, q };
        Self {
            name: order.to_string(),
            order,
        }
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Smallest series this order can be estimated on
    pub fn min_observations(&self) -> usize {
        min_observations(self.order)
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn fit(&self, series: &[f64]) -> Result<TrainedArimaModel, ModelFitFault> {
        let ArimaOrder { p, d, q } = self.order;

        let needed = self.min_observations();
        if series.len() < needed {
            return Err(ModelFitFault::InsufficientData {
                model: self.name.clone(),
                needed,
                got: series.len(),
            });
        }
        ensure_finite(series, &self.name)?;

        let (stationary, _) = difference(series, d);
        let n = stationary.len();
        let drift = stationary.iter().sum::<f64>() / n as f64;
        let deviations: Vec<f64> = stationary.iter().map(|w| w - drift).collect();
        let variance = deviations.iter().map(|z| z * z).sum::<f64>() / n as f64;

        let (ar_coefficients, ma_coefficients) =
            if variance <= FLAT_TOLERANCE * (1.0 + drift * drift) {
                log::debug!("{}: differenced series is flat, keeping drift only", self.name);
                (vec![0.0; p], vec![0.0; q])
            } else {
                let (ar, ma) = hannan_rissanen(&deviations, p, q, &self.name)?;
                (shrink(ar), shrink(ma))
            };

        let parameters_finite = ar_coefficients
            .iter()
            .chain(&ma_coefficients)
            .chain([&drift])
            .all(|value| value.is_finite());
        if !parameters_finite {
            return Err(ModelFitFault::NonFinite(format!("{} parameters", self.name)));
        }

        let model = TrainedArimaModel::anchored(
            self.name.clone(),
            self.order,
            ar_coefficients,
            ma_coefficients,
            drift,
            series,
        );
        if !model.sigma2.is_finite() {
            return Err(ModelFitFault::NonFinite(format!("{} parameters", self.name)));
        }

        log::debug!(
            "{} fitted on {} observations: ar={:?} ma={:?} drift={:.4} sigma2={:.4}",
            self.name,
            series.len(),
            model.ar_coefficients,
            model.ma_coefficients,
            model.drift,
            model.sigma2
        );

        Ok(model)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    /// Model with the given parameters whose forecast state is taken from
    /// the end of `series`. The series must be finite and at least as long
    /// as the order's minimum.
    fn anchored(
        name: String,
        order: ArimaOrder,
        ar_coefficients: Vec<f64>,
        ma_coefficients: Vec<f64>,
        drift: f64,
        series: &[f64],
    ) -> Self {
        let ArimaOrder { p, d, q } = order;
        let (stationary, last_levels) = difference(series, d);
        let n = stationary.len();
        let deviations: Vec<f64> = stationary.iter().map(|w| w - drift).collect();

        let residuals = residuals(&deviations, &ar_coefficients, &ma_coefficients);
        let scored = &residuals[p.min(n)..];
        let sigma2 = if scored.is_empty() {
            0.0
        } else {
            scored.iter().map(|e| e * e).sum::<f64>() / scored.len() as f64
        };

        Self {
            name,
            order,
            recent_deviations: deviations[n - p..].to_vec(),
            recent_residuals: residuals[n - q..].to_vec(),
            ar_coefficients,
            ma_coefficients,
            drift,
            sigma2,
            last_levels,
            training_len: series.len(),
        }
    }

    /// Same coefficients and drift, with the forecast state rebuilt from
    /// `series` so forecasts continue from its last observation.
    pub fn reanchor(&self, series: &[f64]) -> Result<Self, ModelFitFault> {
        let needed = min_observations(self.order);
        if series.len() < needed {
            return Err(ModelFitFault::InsufficientData {
                model: self.name.clone(),
                needed,
                got: series.len(),
            });
        }
        ensure_finite(series, &self.name)?;

        Ok(Self::anchored(
            self.name.clone(),
            self.order,
            self.ar_coefficients.clone(),
            self.ma_coefficients.clone(),
            self.drift,
            series,
        ))
    }

    /// Forecasts repeat one value whatever the horizon: no AR or MA terms and
    /// nothing left to integrate but a zero drift.
    pub fn is_constant(&self) -> bool {
        let static_terms = self
            .ar_coefficients
            .iter()
            .chain(&self.ma_coefficients)
            .all(|c| *c == 0.0);
        if !static_terms || self.order.d == 0 {
            return static_terms;
        }
        let scale = self.last_levels.first().map_or(1.0, |level| level.abs().max(1.0));
        let tolerance = CONSTANT_TOLERANCE * scale;
        self.drift.abs() <= tolerance
            && self.last_levels.iter().skip(1).all(|slope| slope.abs() <= tolerance)
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    pub fn drift(&self) -> f64 {
        self.drift
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub(crate) fn is_consistent(&self) -> bool {
        let ArimaOrder { p, d, q } = self.order;
        self.ar_coefficients.len() == p
            && self.ma_coefficients.len() == q
            && self.recent_deviations.len() == p
            && self.recent_residuals.len() == q
            && self.last_levels.len() == d
            && self
                .ar_coefficients
                .iter()
                .chain(&self.ma_coefficients)
                .chain(&self.recent_deviations)
                .chain(&self.recent_residuals)
                .chain(&self.last_levels)
                .chain([&self.drift, &self.sigma2])
                .all(|value| value.is_finite())
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizon: usize) -> Vec<f64> {
        let mut deviations = self.recent_deviations.clone();
        let mut innovations = self.recent_residuals.clone();
        let mut differenced = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let next = lagged_sum(&deviations, &self.ar_coefficients)
                + lagged_sum(&innovations, &self.ma_coefficients);
            deviations.push(next);
            // Future innovations have zero expectation
            innovations.push(0.0);
            differenced.push(next + self.drift);
        }

        integrate(differenced, &self.last_levels)
    }

    fn predict(&self, series: &[f64]) -> Vec<f64> {
        let d = self.order.d;
        if series.len() <= d {
            return series.to_vec();
        }

        let (stationary, _) = difference(series, d);
        let deviations: Vec<f64> = stationary.iter().map(|w| w - self.drift).collect();
        let errors = residuals(&deviations, &self.ar_coefficients, &self.ma_coefficients);

        let mut predictions = series[..d].to_vec();
        for (offset, (w, e)) in stationary.iter().zip(&errors).enumerate() {
            // y_t minus its d-th difference depends only on earlier observations
            let carried = series[offset + d] - w;
            predictions.push(carried + (w - e));
        }
        predictions
    }

    fn warm_up(&self) -> usize {
        self.order.d
    }

    fn training_len(&self) -> usize {
        self.training_len
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn min_observations(order: ArimaOrder) -> usize {
    let ArimaOrder { p, d, q } = order;
    d + regression_start(p, q) + p + q + 2
}

/// Index of the first observation usable in the second-stage regression
fn regression_start(p: usize, q: usize) -> usize {
    if q > 0 {
        (p + q + LONG_AR_EXTRA_LAGS + q).max(p)
    } else {
        p
    }
}

/// Apply `d` rounds of first differencing, remembering the last value of
/// every level for integration.
fn difference(series: &[f64], d: usize) -> (Vec<f64>, Vec<f64>) {
    let mut working = series.to_vec();
    let mut last_levels = Vec::with_capacity(d);
    for _ in 0..d {
        last_levels.push(working.last().copied().unwrap_or(0.0));
        working = working.windows(2).map(|w| w[1] - w[0]).collect();
    }
    (working, last_levels)
}

/// Undo differencing, starting from the last observation of each level
fn integrate(mut values: Vec<f64>, last_levels: &[f64]) -> Vec<f64> {
    for &level in last_levels.iter().rev() {
        let mut current = level;
        for value in values.iter_mut() {
            current += *value;
            *value = current;
        }
    }
    values
}

/// `sum(coefficients[i] * history[len - 1 - i])`, ignoring lags before the start
fn lagged_sum(history: &[f64], coefficients: &[f64]) -> f64 {
    history
        .iter()
        .rev()
        .zip(coefficients)
        .map(|(value, coefficient)| value * coefficient)
        .sum()
}

/// Conditional residuals with pre-sample values set to zero
fn residuals(deviations: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut errors: Vec<f64> = Vec::with_capacity(deviations.len());
    for (t, z) in deviations.iter().enumerate() {
        let prediction = lagged_sum(&deviations[..t], ar) + lagged_sum(&errors, ma);
        errors.push(z - prediction);
    }
    errors
}

fn shrink(coefficients: Vec<f64>) -> Vec<f64> {
    let total: f64 = coefficients.iter().map(|c| c.abs()).sum();
    if total < MAX_COEFFICIENT_SUM {
        return coefficients;
    }
    let factor = MAX_COEFFICIENT_SUM / total;
    coefficients.into_iter().map(|c| c * factor).collect()
}

fn hannan_rissanen(
    deviations: &[f64],
    p: usize,
    q: usize,
    model: &str,
) -> Result<(Vec<f64>, Vec<f64>), ModelFitFault> {
    if p + q == 0 {
        return Ok((Vec::new(), Vec::new()));
    }
    let n = deviations.len();

    // Stage 1: innovations from a long autoregression
    let innovations = if q > 0 {
        let m = p + q + LONG_AR_EXTRA_LAGS;
        let rows: Vec<Vec<f64>> = (m..n)
            .map(|t| (1..=m).map(|lag| deviations[t - lag]).collect())
            .collect();
        let targets: Vec<f64> = deviations[m..].to_vec();
        let long_ar = least_squares(&rows, &targets, model)?;
        (0..n)
            .map(|t| {
                if t < m {
                    0.0
                } else {
                    deviations[t] - lagged_sum(&deviations[..t], &long_ar)
                }
            })
            .collect()
    } else {
        vec![0.0; n]
    };

    // Stage 2: regress on lagged values and lagged innovations
    let start = regression_start(p, q);
    let rows: Vec<Vec<f64>> = (start..n)
        .map(|t| {
            (1..=p)
                .map(|lag| deviations[t - lag])
                .chain((1..=q).map(|lag| innovations[t - lag]))
                .collect()
        })
        .collect();
    let targets: Vec<f64> = deviations[start..].to_vec();
    let mut coefficients = least_squares(&rows, &targets, model)?;
    let ma = coefficients.split_off(p);

    Ok((coefficients, ma))
}

/// Ordinary least squares, solved through an SVD of the design matrix.
/// A rank-deficient design is reported as singular.
fn least_squares(
    rows: &[Vec<f64>],
    targets: &[f64],
    model: &str,
) -> Result<Vec<f64>, ModelFitFault> {
    let singular = || ModelFitFault::Singular(format!("{} regression", model));
    let k = rows.first().map(Vec::len).unwrap_or(0);
    if k == 0 || rows.len() < k || rows.len() != targets.len() {
        return Err(singular());
    }

    let design = DMatrix::from_fn(rows.len(), k, |r, c| rows[r][c]);
    let response = DVector::from_column_slice(targets);
    let svd = design.svd(true, true);

    let eps = RANK_TOLERANCE * svd.singular_values.max().max(f64::MIN_POSITIVE);
    if svd.rank(eps) < k {
        return Err(singular());
    }
    let solution = svd.solve(&response, eps).map_err(|_| singular())?;

    if solution.iter().all(|value| value.is_finite()) {
        Ok(solution.iter().copied().collect())
    } else {
        Err(ModelFitFault::NonFinite(format!("{} regression", model)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difference_and_integrate_round_trip() {
        let series = [3.0, 5.0, 9.0, 15.0];
        let (stationary, levels) = difference(&series, 2);
        assert_eq!(stationary, vec![2.0, 2.0]);
        assert_eq!(levels, vec![15.0, 6.0]);

        // Second differences of 2 continue the quadratic: 23, 33
        assert_eq!(integrate(vec![2.0, 2.0], &levels), vec![23.0, 33.0]);
    }

    #[test]
    fn test_least_squares_recovers_coefficients() {
        let rows: Vec<Vec<f64>> = (0..10)
            .map(|i| vec![i as f64, (i * i) as f64 % 7.0])
            .collect();
        let targets: Vec<f64> = rows.iter().map(|r| 2.0 * r[0] - 0.5 * r[1]).collect();

        let solution = least_squares(&rows, &targets, "test").unwrap();
        assert!((solution[0] - 2.0).abs() < 1e-9);
        assert!((solution[1] + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_least_squares_singular() {
        let rows = vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]];
        let targets = vec![1.0, 2.0, 3.0];
        assert!(matches!(
            least_squares(&rows, &targets, "test"),
            Err(ModelFitFault::Singular(_))
        ));
    }

    #[test]
    fn test_shrink_bounds_coefficient_sum() {
        let shrunk = shrink(vec![1.5, -0.5]);
        let total: f64 = shrunk.iter().map(|c| c.abs()).sum();
        assert!((total - MAX_COEFFICIENT_SUM).abs() < 1e-12);
        assert_eq!(shrink(vec![0.3]), vec![0.3]);
    }

    #[test]
    fn test_flat_differences_keep_drift_only() {
        let series: Vec<f64> = (0..24).map(|t| 50.0 + 4.0 * t as f64).collect();
        let model = ArimaModel::new(1, 1, 1).fit(&series).unwrap();

        assert_eq!(model.ar_coefficients(), &[0.0]);
        assert_eq!(model.ma_coefficients(), &[0.0]);
        assert!((model.drift() - 4.0).abs() < 1e-12);

        let forecast = model.forecast(3);
        assert!((forecast[0] - 146.0).abs() < 1e-9);
        assert!((forecast[2] - 154.0).abs() < 1e-9);
    }

    #[test]
    fn test_reanchor_continues_from_new_data() {
        let series: Vec<f64> = (0..36).map(|t| 50.0 + 4.0 * t as f64).collect();
        let stored = ArimaModel::new(1, 1, 1).fit(&series[..24]).unwrap();
        assert!((stored.forecast(1)[0] - 146.0).abs() < 1e-9);

        let current = stored.reanchor(&series).unwrap();
        assert_eq!(current.ar_coefficients(), stored.ar_coefficients());
        assert_eq!(current.drift(), stored.drift());
        assert_eq!(current.training_len(), 36);
        assert!((current.forecast(1)[0] - 194.0).abs() < 1e-9);

        assert!(matches!(
            stored.reanchor(&series[..5]),
            Err(ModelFitFault::InsufficientData { needed: 10, got: 5, .. })
        ));
    }

    #[test]
    fn test_is_constant() {
        let flat = ArimaModel::new(1, 1, 1).fit(&[100.0; 24]).unwrap();
        assert!(flat.is_constant());

        let trend: Vec<f64> = (0..24).map(|t| 50.0 + 4.0 * t as f64).collect();
        assert!(!ArimaModel::new(1, 1, 1).fit(&trend).unwrap().is_constant());
    }

    #[test]
    fn test_min_observations() {
        assert_eq!(ArimaModel::new(1, 1, 1).min_observations(), 10);
        assert_eq!(ArimaModel::new(1, 0, 0).min_observations(), 4);
    }
}
