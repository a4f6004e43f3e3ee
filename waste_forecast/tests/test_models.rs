use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use waste_forecast::models::ArimaOrder;
use waste_forecast::{
    ArimaModel, ExponentialSmoothing, FittedModel, ForecastModel, ModelFitFault,
    TrainedForecastModel, Trend,
};

fn noisy_trend(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|t| 1000.0 + 12.0 * t as f64 + rng.gen_range(-40.0..40.0))
        .collect()
}

#[test]
fn test_arima_forecast_follows_trend() {
    let series = noisy_trend(48, 7);
    let model = ArimaModel::new(1, 1, 1).fit(&series).unwrap();

    assert_eq!(model.order(), ArimaOrder { p: 1, d: 1, q: 1 });
    assert_eq!(model.training_len(), 48);
    assert_eq!(model.name(), "ARIMA(1,1,1)");

    let forecast = model.forecast(12);
    assert_eq!(forecast.len(), 12);
    assert!(forecast.iter().all(|v| v.is_finite()));
    // Drift carries the upward trend past the last observation
    assert!(forecast[11] > series[47] - 100.0);
    assert!(forecast[11] > forecast[0]);

    let stationary: f64 = model.ar_coefficients().iter().map(|c| c.abs()).sum();
    assert!(stationary < 1.0);
}

#[test]
fn test_arima_predict_is_one_step_ahead() {
    let series = noisy_trend(36, 11);
    let model = ArimaModel::new(1, 1, 1).fit(&series).unwrap();
    let predictions = model.predict(&series);

    assert_eq!(predictions.len(), series.len());
    // The first d values have no history and are echoed back
    assert_eq!(predictions[0], series[0]);
    assert!(predictions.iter().all(|v| v.is_finite()));
}

#[test]
fn test_arima_insufficient_data() {
    let err = ArimaModel::new(1, 1, 1).fit(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap_err();
    assert_eq!(
        err,
        ModelFitFault::InsufficientData {
            model: "ARIMA(1,1,1)".to_string(),
            needed: 10,
            got: 5
        }
    );
}

#[test]
fn test_arima_rejects_non_finite_input() {
    let mut series = noisy_trend(30, 3);
    series[10] = f64::NAN;
    assert!(matches!(
        ArimaModel::new(1, 1, 1).fit(&series),
        Err(ModelFitFault::NonFinite(_))
    ));
}

#[test]
fn test_arima_constant_series_gives_constant_forecast() {
    let series = vec![100.0; 36];
    let model = ArimaModel::new(1, 1, 1).fit(&series).unwrap();
    let forecast = model.forecast(6);

    for value in forecast {
        assert_relative_eq!(value, 100.0, epsilon = 1e-9);
    }
}

#[test]
fn test_pure_autoregression() {
    let series = noisy_trend(40, 5);
    let model = ArimaModel::new(2, 0, 0).fit(&series).unwrap();

    assert_eq!(model.ar_coefficients().len(), 2);
    assert!(model.ma_coefficients().is_empty());
    assert_eq!(model.forecast(4).len(), 4);
}

#[test]
fn test_holt_tracks_noisy_trend() {
    let series = noisy_trend(36, 9);
    let model = ExponentialSmoothing::new(Trend::Additive).fit(&series).unwrap();

    assert!(model.alpha() > 0.0 && model.alpha() < 1.0);
    assert!(model.beta() > 0.0 && model.beta() < 1.0);

    let forecast = model.forecast(3);
    assert_relative_eq!(forecast[1] - forecast[0], model.slope(), epsilon = 1e-9);
}

#[test]
fn test_fixed_parameters_are_kept() {
    let series = noisy_trend(24, 2);
    let model = ExponentialSmoothing::with_params(Trend::Additive, 0.3, 0.1)
        .unwrap()
        .fit(&series)
        .unwrap();

    assert_eq!(model.alpha(), 0.3);
    assert_eq!(model.beta(), 0.1);
}

#[test]
fn test_fitted_model_serialization_tag() {
    let series = noisy_trend(24, 4);
    let model: FittedModel = ExponentialSmoothing::new(Trend::None).fit(&series).unwrap().into();

    let value = serde_json::to_value(&model).unwrap();
    assert_eq!(value["kind"], "exponential_smoothing");
    assert_eq!(value["trend"], "none");

    let back: FittedModel = serde_json::from_value(value).unwrap();
    assert_eq!(back, model);
    assert!(back.is_consistent());
}
