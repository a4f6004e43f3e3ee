//! Feature standardization

use crate::{ClusterError, Result};
use statrs::statistics::Statistics;

/// Rescales each feature to zero mean and unit population variance.
///
/// Parameters come only from the batch passed to [`StandardScaler::fit`].
/// A feature with zero variance keeps a scale of 1, so it is centered but
/// not stretched.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Estimate per-feature mean and standard deviation of `data`
    pub fn fit(data: &[Vec<f64>]) -> Result<Self> {
        let width = data.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Err(ClusterError::InvalidInput(
                "Cannot scale an empty feature matrix".to_string(),
            ));
        }
        if data.iter().any(|row| row.len() != width) {
            return Err(ClusterError::InvalidInput(
                "Feature rows have different lengths".to_string(),
            ));
        }

        let mut means = Vec::with_capacity(width);
        let mut scales = Vec::with_capacity(width);
        for feature in 0..width {
            let column: Vec<f64> = data.iter().map(|row| row[feature]).collect();
            let std_dev = column.iter().population_std_dev();
            means.push(column.iter().mean());
            scales.push(if std_dev > 0.0 && std_dev.is_finite() { std_dev } else { 1.0 });
        }

        Ok(Self { means, scales })
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn transform(&self, data: &[Vec<f64>]) -> Vec<Vec<f64>> {
        data.iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(value, (mean, scale))| (value - mean) / scale)
                    .collect()
            })
            .collect()
    }

    pub fn fit_transform(data: &[Vec<f64>]) -> Result<(Self, Vec<Vec<f64>>)> {
        let scaler = Self::fit(data)?;
        let scaled = scaler.transform(data);
        Ok((scaler, scaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standardized_columns() {
        let data = vec![vec![1.0, 10.0], vec![2.0, 10.0], vec![3.0, 10.0]];
        let (scaler, scaled) = StandardScaler::fit_transform(&data).unwrap();

        assert_relative_eq!(scaler.means()[0], 2.0);
        assert_relative_eq!(scaler.scales()[0], (2.0f64 / 3.0).sqrt());
        // Constant feature is centered only
        assert_eq!(scaler.scales()[1], 1.0);
        assert!(scaled.iter().all(|row| row[1] == 0.0));

        let column: Vec<f64> = scaled.iter().map(|row| row[0]).collect();
        assert_relative_eq!(column.iter().mean(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(column.iter().population_std_dev(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let data = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(StandardScaler::fit(&data).is_err());
        assert!(StandardScaler::fit(&[]).is_err());
    }
}
