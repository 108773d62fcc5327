use ndarray::{Array2, ArrayViewMut1, Axis};
use serde::{Deserialize, Serialize};

use super::error::ArtifactError;

/// Per-column z-score normalization with frozen training statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<String>,
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit on a matrix whose columns are `columns`, in order.
    ///
    /// Uses the population standard deviation. A constant column gets a
    /// scale of 1.0 so it maps to `x - mean`.
    pub fn fit(columns: &[&str], data: &Array2<f64>) -> Option<Self> {
        if data.ncols() != columns.len() {
            return None;
        }
        let means = data.mean_axis(Axis(0))?;
        let stds = data.std_axis(Axis(0), 0.0);

        Some(Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            means: means.to_vec(),
            stds: stds
                .iter()
                .map(|&s| if s > f64::EPSILON { s } else { 1.0 })
                .collect(),
        })
    }

    #[cfg(test)]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    #[cfg(test)]
    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    pub fn transform_value(&self, idx: usize, value: f64) -> f64 {
        (value - self.means[idx]) / self.stds[idx]
    }

    pub fn transform_row(&self, mut row: ArrayViewMut1<f64>) {
        for (idx, v) in row.iter_mut().enumerate() {
            *v = self.transform_value(idx, *v);
        }
    }

    pub fn transform(&self, data: &mut Array2<f64>) {
        for row in data.rows_mut() {
            self.transform_row(row);
        }
    }

    /// The scaler must have been fitted on exactly `expected`, in that order.
    pub fn check_columns(&self, expected: &[&str]) -> Result<(), ArtifactError> {
        if self.means.len() != self.columns.len() || self.stds.len() != self.columns.len() {
            return Err(ArtifactError::Mismatch(format!(
                "scaler has {} columns but {} means and {} stds",
                self.columns.len(),
                self.means.len(),
                self.stds.len()
            )));
        }
        if self.stds.iter().any(|&s| !(s.is_finite() && s > 0.0)) {
            return Err(ArtifactError::Mismatch(
                "scaler has a non-positive standard deviation".to_string(),
            ));
        }
        if self.columns.len() != expected.len()
            || self.columns.iter().zip(expected).any(|(a, b)| a != b)
        {
            return Err(ArtifactError::Mismatch(format!(
                "scaler columns {:?} do not match feature columns {:?}",
                self.columns, expected
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_population_std() {
        let data = array![[1.0, 10.0], [3.0, 10.0]];
        let scaler = StandardScaler::fit(&["a", "b"], &data).unwrap();
        assert_eq!(scaler.means(), &[2.0, 10.0]);
        assert!((scaler.stds()[0] - 1.0).abs() < 1e-12);
        // constant column falls back to unit scale
        assert_eq!(scaler.stds()[1], 1.0);
    }

    #[test]
    fn test_transform_zero_row_is_neg_mean_over_std() {
        let data = array![[2.0, 100.0], [6.0, 300.0], [4.0, 200.0]];
        let scaler = StandardScaler::fit(&["a", "b"], &data).unwrap();

        let mut zeros = Array2::<f64>::zeros((1, 2));
        scaler.transform(&mut zeros);
        for idx in 0..2 {
            let expected = -scaler.means()[idx] / scaler.stds()[idx];
            assert!((zeros[[0, idx]] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_transform_centers_training_data() {
        let data = array![[2.0], [6.0], [4.0]];
        let scaler = StandardScaler::fit(&["a"], &data).unwrap();
        let mut scaled = data.clone();
        scaler.transform(&mut scaled);
        let mean: f64 = scaled.iter().sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-12);
        assert!((scaler.transform_value(0, 6.0) - scaled[[1, 0]]).abs() < 1e-12);
    }

    #[test]
    fn test_fit_rejects_empty_or_misaligned() {
        let empty = Array2::<f64>::zeros((0, 2));
        assert!(StandardScaler::fit(&["a", "b"], &empty).is_none());
        let data = array![[1.0, 2.0]];
        assert!(StandardScaler::fit(&["a"], &data).is_none());
    }

    #[test]
    fn test_check_columns_order() {
        let data = array![[1.0, 2.0], [3.0, 5.0]];
        let scaler = StandardScaler::fit(&["a", "b"], &data).unwrap();
        assert!(scaler.check_columns(&["a", "b"]).is_ok());
        assert!(scaler.check_columns(&["b", "a"]).is_err());
        assert!(scaler.check_columns(&["a"]).is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let data = array![[1.0, 2.0], [3.0, 5.0]];
        let scaler = StandardScaler::fit(&["a", "b"], &data).unwrap();
        let json = serde_json::to_string(&scaler).unwrap();
        let restored: StandardScaler = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, scaler);
    }
}
