use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::sync::Arc;
use tempfile::{tempdir, NamedTempFile};
use waste_data::{ColumnMap, DataLoader, WasteDataset};
use waste_forecast::{
    save_forecast_csv, FileModelStore, ForecastEngine, ForecastError, ForecastMethod,
    ForecastOptions, ForecastScope, GapFill, MemoryModelStore, NullModelStore, SeriesBuilder,
    TimeSeries,
};

const HEADER: &str = "country,food_category,date,year,total_waste_(tons),economic_loss_(million_$),population_(million),per_capita_waste_kg,household_waste_(%)";

fn month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

/// 36 months for France (noisy trend, split over two categories) and Japan
/// (constant), starting January 2020.
fn sample_dataset() -> (NamedTempFile, WasteDataset) {
    let mut rng = StdRng::seed_from_u64(17);
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();

    for t in 0..36u32 {
        let year = 2020 + (t / 12) as i32;
        let date = format!("{}-{:02}-15", year, t % 12 + 1);
        let france = 2000.0 + 25.0 * t as f64 + rng.gen_range(-60.0..60.0);
        let dairy = france * 0.6;
        let produce = france * 0.4;
        writeln!(file, "France,Dairy,{},{},{:.3},10.0,67.0,1.2,40.0", date, year, dairy).unwrap();
        writeln!(file, "France,Produce,{},{},{:.3},8.0,67.0,0.8,45.0", date, year, produce)
            .unwrap();
        writeln!(file, "Japan,Grain,{},{},500.0,5.0,125.0,0.4,30.0", date, year).unwrap();
    }
    file.flush().unwrap();

    let dataset = DataLoader::from_csv(file.path(), ColumnMap::default()).unwrap();
    (file, dataset)
}

#[test]
fn test_forecast_dates_continue_monthly_cadence() {
    let (_file, dataset) = sample_dataset();
    let engine = ForecastEngine::default();

    let run = engine.run(&dataset, &ForecastScope::country("France"), 12).unwrap();

    assert_eq!(run.result.horizon(), 12);
    assert_eq!(run.training_len, 36);
    assert_eq!(run.history.last_date(), Some(month(2022, 12)));

    let dates = run.result.dates();
    assert_eq!(dates[0], month(2023, 1));
    assert_eq!(dates[11], month(2023, 12));
    for pair in dates.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    assert!(run.result.values().iter().all(|v| v.is_finite()));
}

#[test]
fn test_trending_country_uses_primary() {
    let (_file, dataset) = sample_dataset();
    let run = ForecastEngine::default()
        .run(&dataset, &ForecastScope::country("France"), 6)
        .unwrap();

    assert_eq!(run.method(), ForecastMethod::Primary);
    assert_eq!(run.result.model_name(), "ARIMA(1,1,1)");
    assert!(run.fallback_reason.is_none());
    assert!(run.accuracy.is_some());
}

#[test]
fn test_constant_country_uses_fallback() {
    let (_file, dataset) = sample_dataset();
    let run = ForecastEngine::default()
        .run(&dataset, &ForecastScope::country("Japan"), 6)
        .unwrap();

    assert_eq!(run.method(), ForecastMethod::Fallback);
    assert!(run.fallback_reason.is_some());
}

#[test]
fn test_non_positive_horizon_is_input_error() {
    let (_file, dataset) = sample_dataset();
    let engine = ForecastEngine::default();

    for horizon in [0, -1] {
        let err = engine.run(&dataset, &ForecastScope::global(), horizon).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }
}

#[test]
fn test_unknown_scope_is_input_error() {
    let (_file, dataset) = sample_dataset();
    let err = ForecastEngine::default()
        .run(&dataset, &ForecastScope::country("Atlantis"), 3)
        .unwrap_err();
    assert!(matches!(err, ForecastError::InvalidInput(_)));
}

#[test]
fn test_persisted_model_gives_identical_forecast() {
    let (_file, dataset) = sample_dataset();
    let dir = tempdir().unwrap();
    let scope = ForecastScope::country("France");

    let stored = ForecastEngine::new(Arc::new(FileModelStore::new(dir.path()).unwrap()));
    let first = stored.run(&dataset, &scope, 9).unwrap();
    assert!(!first.reused_artifact);
    assert!(dir.path().join("country-France.model.json").exists());

    // A new engine over the same directory, as in a later invocation
    let reopened = ForecastEngine::new(Arc::new(FileModelStore::new(dir.path()).unwrap()));
    let second = reopened.run(&dataset, &scope, 9).unwrap();
    assert!(second.reused_artifact);

    let unpersisted = ForecastEngine::new(Arc::new(NullModelStore))
        .run(&dataset, &scope, 9)
        .unwrap();

    assert_eq!(second.result, first.result);
    assert_eq!(second.result.values(), unpersisted.result.values());
}

#[test]
fn test_reused_model_follows_new_months() {
    let mut rng = StdRng::seed_from_u64(42);
    let values: Vec<f64> = (0..36)
        .map(|t| 500.0 + 8.0 * t as f64 + rng.gen_range(-25.0..25.0))
        .collect();
    let scope = ForecastScope::country("France");
    let engine = ForecastEngine::new(Arc::new(MemoryModelStore::new()));

    let early = TimeSeries::from_values(month(2020, 1), &values[..24]);
    let stored = engine.run_series(&scope, &early, 3).unwrap();
    assert_eq!(stored.method(), ForecastMethod::Primary);

    let full = TimeSeries::from_values(month(2020, 1), &values);
    let run = engine.run_series(&scope, &full, 3).unwrap();
    let fresh = ForecastEngine::default().run_series(&scope, &full, 3).unwrap();

    assert!(run.reused_artifact);
    assert_eq!(run.result.dates()[0], month(2023, 1));
    let gap = (run.result.values()[0] - fresh.result.values()[0]).abs();
    assert!(gap < 60.0, "reused {:?}, fresh {:?}", run.result.values(), fresh.result.values());
}

#[test]
fn test_invalidate_forces_refit() {
    let (_file, dataset) = sample_dataset();
    let store = Arc::new(MemoryModelStore::new());
    let engine = ForecastEngine::new(store.clone());
    let scope = ForecastScope::country("France");

    engine.run(&dataset, &scope, 3).unwrap();
    assert!(store.contains("country-France"));

    engine.invalidate(&scope).unwrap();
    assert!(!store.contains("country-France"));

    let run = engine.run(&dataset, &scope, 3).unwrap();
    assert!(!run.reused_artifact);
}

#[test]
fn test_run_many_keeps_scope_order() {
    let (_file, dataset) = sample_dataset();
    let engine = ForecastEngine::new(Arc::new(MemoryModelStore::new()));
    let mut scopes = ForecastScope::all_countries(&dataset).unwrap();
    scopes.push(ForecastScope::country("Atlantis"));

    let runs = engine.run_many(&dataset, &scopes, 4);

    let names: Vec<String> = runs.iter().map(|(scope, _)| scope.to_string()).collect();
    assert_eq!(names, vec!["country=France", "country=Japan", "country=Atlantis"]);
    assert!(runs[0].1.is_ok());
    assert!(runs[1].1.is_ok());
    assert!(runs[2].1.is_err());
}

#[test]
fn test_category_scope_sums_one_category() {
    let (_file, dataset) = sample_dataset();
    let scope = ForecastScope::country("France").with_category("Dairy");

    let dairy = SeriesBuilder::new(scope).build(&dataset).unwrap();
    let total = SeriesBuilder::new(ForecastScope::country("France"))
        .build(&dataset)
        .unwrap();

    assert_eq!(dairy.len(), 36);
    let first_dairy = dairy.values()[0].unwrap();
    let first_total = total.values()[0].unwrap();
    assert!((first_dairy - 0.6 * first_total).abs() < 0.01);
}

#[test]
fn test_gap_policy_changes_training_values() {
    let mut values: Vec<Option<f64>> = (0..30).map(|t| Some(100.0 + 3.0 * t as f64)).collect();
    values[10] = None;
    values[11] = None;
    let series = TimeSeries::monthly(month(2021, 1), values);
    let scope = ForecastScope::global();

    let interpolated = ForecastEngine::default()
        .run_series(&scope, &series, 3)
        .unwrap();
    let zeroed = ForecastEngine::default()
        .with_options(ForecastOptions { gap_fill: GapFill::Zero })
        .run_series(&scope, &series, 3)
        .unwrap();

    assert_eq!(interpolated.history.missing_count(), 2);
    assert_ne!(interpolated.result.values(), zeroed.result.values());
    assert_eq!(interpolated.result.dates()[0], month(2023, 7));
}

#[test]
fn test_save_forecast_csv() {
    let (_file, dataset) = sample_dataset();
    let run = ForecastEngine::default()
        .run(&dataset, &ForecastScope::country("Japan"), 2)
        .unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("out").join("forecast.csv");
    save_forecast_csv(&path, &run.result).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "date,fallback_forecast");
    assert!(lines[1].starts_with("2023-01-01,"));
    assert_eq!(lines.len(), 3);
}
