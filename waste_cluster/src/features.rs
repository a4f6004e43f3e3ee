//! Per-country feature vectors

use crate::{ClusterError, Result};
use serde::Serialize;
use std::collections::HashSet;
use waste_data::{Aggregation, WasteDataset};

/// Column names of the four features, in vector order
pub const FEATURE_NAMES: [&str; 4] = [
    "total_waste",
    "economic_loss",
    "per_capita_waste_kg",
    "household_waste_pct",
];

/// Aggregate indicators of one country
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityFeatureVector {
    pub country: String,
    /// Sum of total waste in tons
    pub total_waste: f64,
    /// Sum of economic loss in million USD
    pub economic_loss: f64,
    /// Mean per-capita waste in kg
    pub per_capita_waste_kg: f64,
    /// Mean household share of waste in percent
    pub household_waste_pct: f64,
}

impl EntityFeatureVector {
    pub fn new(country: impl Into<String>, features: [f64; 4]) -> Self {
        let [total_waste, economic_loss, per_capita_waste_kg, household_waste_pct] = features;
        Self {
            country: country.into(),
            total_waste,
            economic_loss,
            per_capita_waste_kg,
            household_waste_pct,
        }
    }

    /// Features in [`FEATURE_NAMES`] order
    pub fn features(&self) -> [f64; 4] {
        [
            self.total_waste,
            self.economic_loss,
            self.per_capita_waste_kg,
            self.household_waste_pct,
        ]
    }
}

/// Feature vectors of a batch of countries, one per country
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureTable {
    vectors: Vec<EntityFeatureVector>,
}

impl FeatureTable {
    /// Build a table from vectors; countries must be unique and features finite
    pub fn from_vectors(vectors: Vec<EntityFeatureVector>) -> Result<Self> {
        let mut seen = HashSet::new();
        for vector in &vectors {
            if !seen.insert(vector.country.as_str()) {
                return Err(ClusterError::InvalidInput(format!(
                    "Duplicate country {}",
                    vector.country
                )));
            }
            if vector.features().iter().any(|value| !value.is_finite()) {
                return Err(ClusterError::InvalidInput(format!(
                    "Non-finite feature for {}",
                    vector.country
                )));
            }
        }
        Ok(Self { vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vectors(&self) -> &[EntityFeatureVector] {
        &self.vectors
    }

    pub fn countries(&self) -> Vec<&str> {
        self.vectors.iter().map(|v| v.country.as_str()).collect()
    }

    /// Row-major feature matrix
    pub fn matrix(&self) -> Vec<Vec<f64>> {
        self.vectors.iter().map(|v| v.features().to_vec()).collect()
    }
}

/// Groups dataset rows by country into [`EntityFeatureVector`]s
#[derive(Debug, Clone, Default)]
pub struct FeatureAggregator;

impl FeatureAggregator {
    pub fn new() -> Self {
        Self
    }

    /// One vector per country, sorted by country name.
    ///
    /// Sums skip missing values; a mean with no observed values, or a feature
    /// whose column is absent, is 0 so every country keeps a complete vector.
    /// Rows without a country are ignored.
    pub fn aggregate(&self, dataset: &WasteDataset) -> Result<FeatureTable> {
        let columns = dataset.columns();
        let summary = dataset.country_summary(&[
            (columns.total_waste.as_str(), Aggregation::Sum),
            (columns.economic_loss.as_str(), Aggregation::Sum),
            (columns.per_capita_waste.as_str(), Aggregation::Mean),
            (columns.household_share.as_str(), Aggregation::Mean),
        ])?;

        let vectors = summary
            .into_iter()
            .map(|(country, values)| {
                let mut features = [0.0; 4];
                for (feature, value) in features.iter_mut().zip(values) {
                    *feature = value;
                }
                EntityFeatureVector::new(country, features)
            })
            .collect();

        let table = FeatureTable::from_vectors(vectors)?;
        log::debug!("Aggregated {} rows into {} countries", dataset.len(), table.len());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vectors_rejects_duplicates() {
        let vectors = vec![
            EntityFeatureVector::new("France", [1.0, 2.0, 3.0, 4.0]),
            EntityFeatureVector::new("France", [1.0, 2.0, 3.0, 4.0]),
        ];
        assert!(FeatureTable::from_vectors(vectors).is_err());
    }

    #[test]
    fn test_from_vectors_rejects_nan() {
        let vectors = vec![EntityFeatureVector::new("France", [1.0, f64::NAN, 3.0, 4.0])];
        assert!(FeatureTable::from_vectors(vectors).is_err());
    }
}
