//! Clustering quality measures

use crate::{ClusterError, Result};

pub(crate) fn squared_euclidean_distance(x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| (xi - yi).powi(2))
        .sum()
}

fn euclidean_distance(x: &[f64], y: &[f64]) -> f64 {
    squared_euclidean_distance(x, y).sqrt()
}

/// Sum of squared distances of every row to the centroid of its label
pub fn inertia(data: &[Vec<f64>], labels: &[usize], centroids: &[Vec<f64>]) -> f64 {
    data.iter()
        .zip(labels)
        .filter_map(|(point, &label)| {
            centroids
                .get(label)
                .map(|centroid| squared_euclidean_distance(point, centroid))
        })
        .sum()
}

/// Mean silhouette coefficient over all rows, in `[-1, 1]`.
///
/// For a row with mean intra-cluster distance `a` and mean distance `b` to
/// the nearest other cluster, the coefficient is `(b - a) / max(a, b)`.
/// Rows in singleton clusters score 0. At least two distinct labels are
/// required.
pub fn silhouette_score(data: &[Vec<f64>], labels: &[usize]) -> Result<f64> {
    if data.len() != labels.len() {
        return Err(ClusterError::InvalidInput(format!(
            "{} rows but {} labels",
            data.len(),
            labels.len()
        )));
    }
    let n_clusters = labels.iter().max().map_or(0, |max| max + 1);
    let mut sizes = vec![0usize; n_clusters];
    for &label in labels {
        sizes[label] += 1;
    }
    let used = sizes.iter().filter(|&&size| size > 0).count();
    if used < 2 {
        return Err(ClusterError::InvalidInput(format!(
            "Silhouette needs at least 2 clusters, got {}",
            used
        )));
    }

    let mut total = 0.0;
    for (i, point) in data.iter().enumerate() {
        let own = labels[i];
        if sizes[own] < 2 {
            continue;
        }

        let mut sums = vec![0.0; n_clusters];
        for (j, other) in data.iter().enumerate() {
            if i != j {
                sums[labels[j]] += euclidean_distance(point, other);
            }
        }

        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..n_clusters)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    Ok(total / data.len() as f64)
}
