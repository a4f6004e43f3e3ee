//! End-to-end runs driven by an [`AnalysisConfig`]

use crate::config::AnalysisConfig;
use crate::Result;
use std::sync::Arc;
use waste_cluster::{
    save_clusters_csv, save_elbow_csv, ClusterSelector, ClusteringRun, ElbowPoint,
    FeatureAggregator,
};
use waste_data::{DataLoader, WasteDataset};
use waste_forecast::{
    save_forecast_csv, FileModelStore, ForecastEngine, ForecastRun, ForecastScope, ModelStore,
    NullModelStore,
};

/// Results of [`Pipeline::run_all`]
#[derive(Debug)]
pub struct AnalysisReport {
    pub forecasts: Vec<ForecastRun>,
    pub elbow: Vec<ElbowPoint>,
    pub clustering: ClusteringRun,
}

/// Loads the dataset once per step and writes every configured table
pub struct Pipeline {
    config: AnalysisConfig,
    engine: ForecastEngine,
}

impl Pipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let store: Arc<dyn ModelStore> = match &config.forecast.model_dir {
            Some(dir) => {
                let store = FileModelStore::new(dir).map_err(waste_forecast::ForecastError::from)?;
                Arc::new(store)
            }
            None => Arc::new(NullModelStore),
        };
        let engine = ForecastEngine::new(store).with_options(config.forecast.options());
        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn load_dataset(&self) -> Result<WasteDataset> {
        let data = &self.config.data;
        log::info!("Loading dataset from {}", data.input.display());
        Ok(DataLoader::from_csv(&data.input, data.columns.clone())?)
    }

    /// Forecast the configured scope, or every country, and write the tables
    pub fn forecast(&self, dataset: &WasteDataset) -> Result<Vec<ForecastRun>> {
        let forecast = &self.config.forecast;

        if !forecast.all_countries {
            let run = self.engine.run(dataset, &forecast.scope(), forecast.horizon)?;
            save_forecast_csv(&forecast.output, &run.result)?;
            return Ok(vec![run]);
        }

        let scopes: Vec<ForecastScope> = ForecastScope::all_countries(dataset)?
            .into_iter()
            .map(|scope| match &forecast.category {
                Some(category) => scope.with_category(category),
                None => scope,
            })
            .collect();

        let mut runs = Vec::with_capacity(scopes.len());
        for (scope, outcome) in self.engine.run_many(dataset, &scopes, forecast.horizon) {
            match outcome {
                Ok(run) => {
                    save_forecast_csv(forecast.output_for(&scope), &run.result)?;
                    runs.push(run);
                }
                Err(e) => log::warn!("Skipping {}: {}", scope, e),
            }
        }
        Ok(runs)
    }

    /// Inertia per configured candidate k, written as the elbow table
    pub fn elbow(&self, dataset: &WasteDataset) -> Result<Vec<ElbowPoint>> {
        let clustering = &self.config.clustering;
        let features = FeatureAggregator::new().aggregate(dataset)?;
        let points = ClusterSelector::new(clustering.options())
            .elbow_sweep(&features, &clustering.k_range)?;
        save_elbow_csv(&clustering.elbow_output, &points)?;
        Ok(points)
    }

    /// Commit the configured k and write the cluster table
    pub fn cluster(&self, dataset: &WasteDataset) -> Result<ClusteringRun> {
        let clustering = &self.config.clustering;
        let features = FeatureAggregator::new().aggregate(dataset)?;
        let run = ClusterSelector::new(clustering.options())
            .commit(&features, clustering.committed_k)?;
        save_clusters_csv(&clustering.output, &run)?;
        Ok(run)
    }

    pub fn run_all(&self) -> Result<AnalysisReport> {
        let dataset = self.load_dataset()?;
        Ok(AnalysisReport {
            forecasts: self.forecast(&dataset)?,
            elbow: self.elbow(&dataset)?,
            clustering: self.cluster(&dataset)?,
        })
    }

    /// Drop the stored model of the configured scope
    pub fn invalidate(&self) -> Result<()> {
        self.engine.invalidate(&self.config.forecast.scope())?;
        Ok(())
    }
}
