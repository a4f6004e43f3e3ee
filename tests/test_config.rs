use food_waste_insights::{AnalysisConfig, ConfigError};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use waste_forecast::{ForecastScope, GapFill};

#[test]
fn test_example_config_parses() {
    let config = AnalysisConfig::from_file("config/insights.example.toml").unwrap();
    assert_eq!(config, AnalysisConfig::default());
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config = AnalysisConfig::from_toml_str(
        r#"
        [forecast]
        horizon = 6
        country = "France"
        gap_fill = "zero"

        [data.columns]
        country = "nation"
        "#,
    )
    .unwrap();

    assert_eq!(config.forecast.horizon, 6);
    assert_eq!(config.forecast.gap_fill, GapFill::Zero);
    assert_eq!(config.forecast.scope(), ForecastScope::country("France"));
    assert_eq!(config.data.columns.country, "nation");
    assert_eq!(config.data.columns.category, "food_category");
    assert_eq!(config.clustering.committed_k, 4);
}

#[test]
fn test_non_positive_horizon_is_rejected() {
    for horizon in ["0", "-6"] {
        let text = format!("[forecast]\nhorizon = {}\n", horizon);
        let err = AnalysisConfig::from_toml_str(&text).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}

#[test]
fn test_invalid_clustering_values() {
    for text in [
        "[clustering]\nk_range = []\n",
        "[clustering]\nk_range = [1, 2]\n",
        "[clustering]\ncommitted_k = 1\n",
        "[clustering]\nn_init = 0\n",
    ] {
        assert!(matches!(
            AnalysisConfig::from_toml_str(text),
            Err(ConfigError::Invalid(_))
        ));
    }
}

#[test]
fn test_malformed_toml() {
    assert!(matches!(
        AnalysisConfig::from_toml_str("[forecast\nhorizon = 3"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[data]\ninput = \"waste.csv\"").unwrap();

    let config = AnalysisConfig::from_file(file.path()).unwrap();
    assert_eq!(config.data.input, PathBuf::from("waste.csv"));

    assert!(matches!(
        AnalysisConfig::from_file("/nonexistent/insights.toml"),
        Err(ConfigError::Io { .. })
    ));
}
