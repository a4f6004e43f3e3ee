//! k sweep and committed clustering runs

use crate::features::{EntityFeatureVector, FeatureTable};
use crate::kmeans::{KMeans, DEFAULT_N_INIT, DEFAULT_SEED};
use crate::metrics::silhouette_score;
use crate::scaling::StandardScaler;
use crate::{ClusterError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Reproducibility knobs shared by the sweep and the commit step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    pub seed: u64,
    /// K-means restarts per fit
    pub n_init: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            n_init: DEFAULT_N_INIT,
        }
    }
}

/// Inertia of one candidate k
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElbowPoint {
    pub k: usize,
    pub inertia: f64,
}

/// Cluster label of one country
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterAssignment {
    pub country: String,
    pub label: usize,
}

/// A committed clustering; read-only once created
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringRun {
    k: usize,
    features: FeatureTable,
    labels: Vec<usize>,
    /// Centroids in standardized feature space
    centroids: Vec<Vec<f64>>,
    inertia: f64,
    silhouette: f64,
}

impl ClusteringRun {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }

    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn silhouette(&self) -> f64 {
        self.silhouette
    }

    pub fn features(&self) -> &FeatureTable {
        &self.features
    }

    pub fn assignments(&self) -> Vec<ClusterAssignment> {
        self.features
            .vectors()
            .iter()
            .zip(&self.labels)
            .map(|(vector, &label)| ClusterAssignment {
                country: vector.country.clone(),
                label,
            })
            .collect()
    }

    /// Feature vectors paired with their label, in table order
    pub fn rows(&self) -> impl Iterator<Item = (&EntityFeatureVector, usize)> {
        self.features.vectors().iter().zip(self.labels.iter().copied())
    }

    /// Number of countries per label
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Standardizes a feature table and fits k-means on it
#[derive(Debug, Clone, Default)]
pub struct ClusterSelector {
    options: ClusterOptions,
}

impl ClusterSelector {
    pub fn new(options: ClusterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Inertia for every candidate k, ascending by k.
    ///
    /// Purely diagnostic: choosing k from the curve is left to the caller.
    pub fn elbow_sweep(&self, table: &FeatureTable, k_range: &[usize]) -> Result<Vec<ElbowPoint>> {
        if k_range.is_empty() {
            return Err(ClusterError::InvalidInput("Empty k range".to_string()));
        }
        let mut ks = k_range.to_vec();
        ks.sort_unstable();
        ks.dedup();
        for &k in &ks {
            check_k(k, table.len())?;
        }

        let scaled = self.standardize(table)?;
        let points = ks
            .par_iter()
            .map(|&k| {
                let fit = self.kmeans(k).fit(&scaled)?;
                Ok(ElbowPoint {
                    k,
                    inertia: fit.inertia,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        log::info!("Elbow sweep over k={:?} on {} countries", ks, table.len());
        Ok(points)
    }

    /// Fit the caller's chosen k and score it
    pub fn commit(&self, table: &FeatureTable, k: usize) -> Result<ClusteringRun> {
        check_k(k, table.len())?;

        let scaled = self.standardize(table)?;
        let fit = self.kmeans(k).fit(&scaled)?;
        let silhouette = silhouette_score(&scaled, &fit.labels)?;

        log::info!(
            "Clustered {} countries into {} groups: inertia {:.4}, silhouette {:.4}",
            table.len(),
            k,
            fit.inertia,
            silhouette
        );

        Ok(ClusteringRun {
            k,
            features: table.clone(),
            labels: fit.labels,
            centroids: fit.centroids,
            inertia: fit.inertia,
            silhouette,
        })
    }

    fn standardize(&self, table: &FeatureTable) -> Result<Vec<Vec<f64>>> {
        let (scaler, scaled) = StandardScaler::fit_transform(&table.matrix())?;
        log::debug!("Feature means {:?}, scales {:?}", scaler.means(), scaler.scales());
        Ok(scaled)
    }

    fn kmeans(&self, k: usize) -> KMeans {
        KMeans::new(k)
            .with_seed(self.options.seed)
            .with_n_init(self.options.n_init)
    }
}

fn check_k(k: usize, entities: usize) -> Result<()> {
    if entities < 2 {
        return Err(ClusterError::TooFewEntities(entities));
    }
    if k < 2 {
        return Err(ClusterError::InvalidInput(format!(
            "k must be at least 2, got {}",
            k
        )));
    }
    if k > entities {
        return Err(ClusterError::Constraint { k, entities });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_k() {
        assert!(check_k(2, 2).is_ok());
        assert!(matches!(check_k(2, 1), Err(ClusterError::TooFewEntities(1))));
        assert!(matches!(check_k(1, 5), Err(ClusterError::InvalidInput(_))));
        assert!(matches!(
            check_k(6, 5),
            Err(ClusterError::Constraint { k: 6, entities: 5 })
        ));
    }
}
