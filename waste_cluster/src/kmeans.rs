//! K-means with k-means++ initialization and multiple restarts

use crate::metrics::{inertia, squared_euclidean_distance};
use crate::{ClusterError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default number of restarts; the run with the lowest inertia wins
pub const DEFAULT_N_INIT: usize = 10;
/// Default seed of the initialization RNG
pub const DEFAULT_SEED: u64 = 42;
const DEFAULT_MAX_ITER: usize = 300;
const DEFAULT_TOL: f64 = 1e-4;

/// K-means clustering
#[derive(Debug, Clone, PartialEq)]
pub struct KMeans {
    /// Number of clusters
    k: usize,
    max_iter: usize,
    /// Convergence threshold on centroid movement, relative to the data variance
    tol: f64,
    n_init: usize,
    seed: u64,
}

/// Result of fitting [`KMeans`]
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster index of every row, in `[0, k)`
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances of rows to their centroid
    pub inertia: f64,
    /// Lloyd iterations of the winning restart
    pub n_iter: usize,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
            n_init: DEFAULT_N_INIT,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Partition `data` into `k` clusters.
    ///
    /// Every label in `[0, k)` is used: a cluster left empty by an update
    /// takes the point farthest from its centroid.
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<KMeansFit> {
        let n_samples = data.len();
        if self.k < 1 {
            return Err(ClusterError::InvalidInput("k must be positive".to_string()));
        }
        if self.k > n_samples {
            return Err(ClusterError::Constraint {
                k: self.k,
                entities: n_samples,
            });
        }
        let width = data[0].len();
        if data.iter().any(|row| row.len() != width) {
            return Err(ClusterError::InvalidInput(
                "Feature rows have different lengths".to_string(),
            ));
        }

        let tol = self.tol * mean_variance(data);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut best: Option<KMeansFit> = None;
        for run in 0..self.n_init {
            let centroids = self.kmeans_plus_plus_init(data, &mut rng);
            let fit = self.lloyd(data, centroids, tol);
            log::trace!("k={} restart {}: inertia {:.6}", self.k, run, fit.inertia);

            // Ties keep the earlier restart
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        best.ok_or_else(|| ClusterError::InvalidInput("No k-means restart ran".to_string()))
    }

    /// Pick initial centroids with probability proportional to the squared
    /// distance from the nearest centroid chosen so far.
    fn kmeans_plus_plus_init(&self, data: &[Vec<f64>], rng: &mut StdRng) -> Vec<Vec<f64>> {
        let n_samples = data.len();
        let first_idx = rng.gen_range(0..n_samples);
        let mut chosen = vec![first_idx];
        let mut centroids = vec![data[first_idx].clone()];

        for _ in 1..self.k {
            let distances: Vec<f64> = data
                .iter()
                .map(|point| {
                    centroids
                        .iter()
                        .map(|c| squared_euclidean_distance(point, c))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect();
            let sum_distances: f64 = distances.iter().sum();

            let next = if sum_distances > 0.0 {
                let threshold = rng.gen_range(0.0..sum_distances);
                let mut cumsum = 0.0;
                distances
                    .iter()
                    .position(|&dist| {
                        cumsum += dist;
                        cumsum > threshold
                    })
                    .or_else(|| distances.iter().rposition(|&dist| dist > 0.0))
            } else {
                None
            };

            // All remaining points coincide with a centroid
            let next = next
                .or_else(|| (0..n_samples).find(|i| !chosen.contains(i)))
                .unwrap_or(first_idx);
            chosen.push(next);
            centroids.push(data[next].clone());
        }

        centroids
    }

    fn lloyd(&self, data: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, tol: f64) -> KMeansFit {
        let mut n_iter = 0;
        for iter in 0..self.max_iter {
            let mut labels = assign(data, &centroids);
            fill_empty_clusters(data, &mut labels, &centroids, self.k);
            let updated = update_centroids(data, &labels, self.k);

            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| squared_euclidean_distance(old, new))
                .sum();
            centroids = updated;
            n_iter = iter + 1;

            if shift <= tol {
                break;
            }
        }

        let mut labels = assign(data, &centroids);
        fill_empty_clusters(data, &mut labels, &centroids, self.k);
        let centroids = update_centroids(data, &labels, self.k);
        let inertia = inertia(data, &labels, &centroids);

        KMeansFit {
            labels,
            centroids,
            inertia,
            n_iter,
        }
    }
}

/// Mean of the per-feature population variances
fn mean_variance(data: &[Vec<f64>]) -> f64 {
    let width = data.first().map(Vec::len).unwrap_or(0);
    if width == 0 {
        return 0.0;
    }
    let n = data.len() as f64;
    let total: f64 = (0..width)
        .map(|feature| {
            let mean = data.iter().map(|row| row[feature]).sum::<f64>() / n;
            data.iter().map(|row| (row[feature] - mean).powi(2)).sum::<f64>() / n
        })
        .sum();
    total / width as f64
}

/// Nearest centroid of every row; ties go to the lower index
fn assign(data: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    data.iter()
        .map(|point| {
            let mut closest = 0;
            let mut min_dist = f64::INFINITY;
            for (j, centroid) in centroids.iter().enumerate() {
                let dist = squared_euclidean_distance(point, centroid);
                if dist < min_dist {
                    min_dist = dist;
                    closest = j;
                }
            }
            closest
        })
        .collect()
}

/// Move the farthest point of a multi-member cluster into each empty cluster
fn fill_empty_clusters(data: &[Vec<f64>], labels: &mut [usize], centroids: &[Vec<f64>], k: usize) {
    let mut counts = vec![0usize; k];
    for &label in labels.iter() {
        counts[label] += 1;
    }

    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let mut farthest: Option<(usize, f64)> = None;
        for (i, point) in data.iter().enumerate() {
            let label = labels[i];
            if counts[label] < 2 {
                continue;
            }
            let dist = squared_euclidean_distance(point, &centroids[label]);
            if farthest.map_or(true, |(_, best)| dist > best) {
                farthest = Some((i, dist));
            }
        }
        // With k <= rows an empty cluster implies a cluster with spare members
        if let Some((i, _)) = farthest {
            counts[labels[i]] -= 1;
            labels[i] = empty;
            counts[empty] = 1;
        }
    }
}

fn update_centroids(data: &[Vec<f64>], labels: &[usize], k: usize) -> Vec<Vec<f64>> {
    let width = data.first().map(Vec::len).unwrap_or(0);
    let mut centroids = vec![vec![0.0; width]; k];
    let mut counts = vec![0usize; k];

    for (point, &label) in data.iter().zip(labels) {
        counts[label] += 1;
        for (sum, value) in centroids[label].iter_mut().zip(point) {
            *sum += value;
        }
    }

    for (centroid, &count) in centroids.iter_mut().zip(&counts) {
        if count > 0 {
            for value in centroid.iter_mut() {
                *value /= count as f64;
            }
        }
    }

    centroids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_empty_clusters_uses_all_labels() {
        let data = vec![vec![0.0], vec![0.0], vec![0.0]];
        let centroids = vec![vec![0.0], vec![0.0], vec![0.0]];
        let mut labels = assign(&data, &centroids);
        assert_eq!(labels, vec![0, 0, 0]);

        fill_empty_clusters(&data, &mut labels, &centroids, 3);
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn test_update_centroids() {
        let data = vec![vec![0.0, 2.0], vec![2.0, 4.0], vec![10.0, 10.0]];
        let centroids = update_centroids(&data, &[0, 0, 1], 2);
        assert_eq!(centroids, vec![vec![1.0, 3.0], vec![10.0, 10.0]]);
    }

    #[test]
    fn test_k_larger_than_rows_is_constraint() {
        let data = vec![vec![0.0], vec![1.0]];
        assert!(matches!(
            KMeans::new(3).fit(&data),
            Err(ClusterError::Constraint { k: 3, entities: 2 })
        ));
    }

    #[test]
    fn test_two_obvious_groups() {
        let data = vec![vec![0.0], vec![0.1], vec![9.9], vec![10.0]];
        let fit = KMeans::new(2).fit(&data).unwrap();

        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[2], fit.labels[3]);
        assert_ne!(fit.labels[0], fit.labels[2]);
        assert!((fit.inertia - 0.01).abs() < 1e-9);
    }
}
