//! # Waste Cluster
//!
//! Groups countries by their aggregate food-waste indicators.
//!
//! Rows of the cleaned dataset are aggregated into one feature vector per
//! country, standardized across the current batch and partitioned with
//! k-means. The elbow sweep is a diagnostic: it reports inertia per candidate
//! k and leaves the choice of k to the caller, who then commits a run and
//! gets labels plus a silhouette score.
//!
//! ## Quick Start
//!
//! ```no_run
//! use waste_cluster::{ClusterSelector, FeatureAggregator};
//! use waste_data::{ColumnMap, DataLoader};
//!
//! let dataset = DataLoader::from_csv("food_waste_clean.csv", ColumnMap::default())?;
//! let features = FeatureAggregator::new().aggregate(&dataset)?;
//!
//! let selector = ClusterSelector::default();
//! for point in selector.elbow_sweep(&features, &[2, 3, 4, 5])? {
//!     println!("k={} inertia={:.2}", point.k, point.inertia);
//! }
//! let run = selector.commit(&features, 4)?;
//! println!("silhouette {:.2}", run.silhouette());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use thiserror::Error;
use waste_data::DataError;

pub mod export;
pub mod features;
pub mod kmeans;
pub mod metrics;
pub mod scaling;
pub mod selector;

pub use crate::export::{save_clusters_csv, save_elbow_csv, write_clusters_csv, write_elbow_csv};
pub use crate::features::{EntityFeatureVector, FeatureAggregator, FeatureTable, FEATURE_NAMES};
pub use crate::kmeans::{KMeans, KMeansFit};
pub use crate::metrics::{inertia, silhouette_score};
pub use crate::scaling::StandardScaler;
pub use crate::selector::{
    ClusterAssignment, ClusterOptions, ClusterSelector, ClusteringRun, ElbowPoint,
};

/// Errors that can occur while clustering
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// More clusters requested than there are entities
    #[error("Cannot form {k} clusters from {entities} entities")]
    Constraint { k: usize, entities: usize },

    #[error("Clustering needs at least 2 entities, got {0}")]
    TooFewEntities(usize),

    #[error("Data error: {0}")]
    DataError(#[from] DataError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Result type for clustering operations
pub type Result<T> = std::result::Result<T, ClusterError>;
