//! TOML configuration of an analysis run

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use waste_cluster::ClusterOptions;
use waste_data::ColumnMap;
use waste_forecast::{ForecastOptions, ForecastScope, GapFill};

/// Errors while reading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Full configuration; every section has defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub data: DataConfig,
    pub forecast: ForecastConfig,
    pub clustering: ClusteringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Cleaned dataset in CSV form
    pub input: PathBuf,
    /// Column name overrides
    pub columns: ColumnMap,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/processed/food_waste_clean.csv"),
            columns: ColumnMap::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Months to forecast; must be positive
    pub horizon: i64,
    pub country: Option<String>,
    pub category: Option<String>,
    /// Forecast every country separately instead of the configured scope
    pub all_countries: bool,
    /// Directory of persisted models; fitting from scratch every run when absent
    pub model_dir: Option<PathBuf>,
    pub output: PathBuf,
    pub gap_fill: GapFill,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 12,
            country: None,
            category: None,
            all_countries: false,
            model_dir: Some(PathBuf::from("models")),
            output: PathBuf::from("outputs/forecast_results.csv"),
            gap_fill: GapFill::default(),
        }
    }
}

impl ForecastConfig {
    pub fn scope(&self) -> ForecastScope {
        ForecastScope::new(self.country.as_deref(), self.category.as_deref())
    }

    pub fn options(&self) -> ForecastOptions {
        ForecastOptions {
            gap_fill: self.gap_fill,
        }
    }

    /// Output path of one scope when forecasting every country
    pub fn output_for(&self, scope: &ForecastScope) -> PathBuf {
        let stem = self
            .output
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "forecast".to_string());
        self.output.with_file_name(format!("{}_{}.csv", stem, scope.key()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Candidate k values for the elbow sweep
    pub k_range: Vec<usize>,
    /// k used for the committed clustering
    pub committed_k: usize,
    pub seed: u64,
    pub n_init: usize,
    pub output: PathBuf,
    pub elbow_output: PathBuf,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        let options = ClusterOptions::default();
        Self {
            k_range: (2..=10).collect(),
            committed_k: 4,
            seed: options.seed,
            n_init: options.n_init,
            output: PathBuf::from("outputs/country_clusters.csv"),
            elbow_output: PathBuf::from("outputs/elbow.csv"),
        }
    }
}

impl ClusteringConfig {
    pub fn options(&self) -> ClusterOptions {
        ClusterOptions {
            seed: self.seed,
            n_init: self.n_init,
        }
    }
}

impl AnalysisConfig {
    /// Read and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invocation parameters before any data is read
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.forecast.horizon <= 0 {
            return Err(ConfigError::Invalid(format!(
                "forecast.horizon must be positive, got {}",
                self.forecast.horizon
            )));
        }
        if self.clustering.k_range.is_empty() {
            return Err(ConfigError::Invalid("clustering.k_range is empty".to_string()));
        }
        if let Some(k) = self.clustering.k_range.iter().find(|&&k| k < 2) {
            return Err(ConfigError::Invalid(format!(
                "clustering.k_range values must be at least 2, got {}",
                k
            )));
        }
        if self.clustering.committed_k < 2 {
            return Err(ConfigError::Invalid(format!(
                "clustering.committed_k must be at least 2, got {}",
                self.clustering.committed_k
            )));
        }
        if self.clustering.n_init == 0 {
            return Err(ConfigError::Invalid(
                "clustering.n_init must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.forecast.horizon, 12);
        assert_eq!(config.clustering.k_range.first(), Some(&2));
        assert_eq!(config.clustering.seed, 42);
    }

    #[test]
    fn test_output_for_scope() {
        let config = ForecastConfig::default();
        let path = config.output_for(&ForecastScope::country("France"));
        assert_eq!(path, PathBuf::from("outputs/forecast_results_country-France.csv"));
    }
}
