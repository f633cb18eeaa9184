//! Win/loss classifiers
//!
//! The feature pipeline only relies on the [`WinModel`] contract; the
//! logistic baseline is one implementation of it.

pub mod logistic;

pub use logistic::{LogisticConfig, LogisticModel};

use crate::{HoopsError, Result};

/// A classifier over matchup feature rows
pub trait WinModel {
    /// Fit on rows of features and whether the home side won
    fn fit(&mut self, features: &[Vec<f32>], home_wins: &[bool]) -> Result<()>;

    /// P(home win) for each row
    fn predict_proba(&self, features: &[Vec<f32>]) -> Result<Vec<f32>>;

    /// Predicted home win and the probability of the predicted class
    fn predict(&self, features: &[Vec<f32>]) -> Result<Vec<(bool, f32)>> {
        Ok(self
            .predict_proba(features)?
            .into_iter()
            .map(|p| (p >= 0.5, p.max(1.0 - p)))
            .collect())
    }
}

/// Per-column z-score scaling fitted on training rows
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaler {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl FeatureScaler {
    /// Columns with less spread than this are scaled by it instead
    pub const MIN_STD: f32 = 1e-3;

    pub fn fit(rows: &[Vec<f32>]) -> Result<Self> {
        let dim = feature_dim(rows)?;
        let n = rows.len() as f32;

        let mut mean = vec![0.0f32; dim];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }

        let mut std = vec![0.0f32; dim];
        for row in rows {
            for ((s, v), m) in std.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2) / n;
            }
        }
        for s in &mut std {
            *s = s.sqrt().max(Self::MIN_STD);
        }

        Ok(FeatureScaler { mean, std })
    }

    pub fn transform(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// Common width of all rows; errors on empty or ragged input
pub(crate) fn feature_dim(rows: &[Vec<f32>]) -> Result<usize> {
    let first = rows
        .first()
        .ok_or_else(|| HoopsError::Empty("no feature rows".to_string()))?;
    let dim = first.len();
    if dim == 0 {
        return Err(HoopsError::Model("feature rows have no columns".to_string()));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != dim) {
        return Err(HoopsError::Model(format!(
            "row {} has {} features, expected {}",
            i,
            row.len(),
            dim
        )));
    }
    Ok(dim)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<f32>);

    impl WinModel for Fixed {
        fn fit(&mut self, _: &[Vec<f32>], _: &[bool]) -> Result<()> {
            Ok(())
        }

        fn predict_proba(&self, _: &[Vec<f32>]) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_predict_reports_winning_class_probability() {
        let model = Fixed(vec![0.8, 0.3, 0.5]);
        let predictions = model.predict(&[]).unwrap();
        assert_eq!(predictions[0], (true, 0.8));
        assert_eq!(predictions[1].0, false);
        assert!((predictions[1].1 - 0.7).abs() < 1e-6);
        assert_eq!(predictions[2], (true, 0.5));
    }

    #[test]
    fn test_scaler_standardises_columns() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = FeatureScaler::fit(&rows).unwrap();

        assert_eq!(scaler.mean, vec![2.0, 5.0]);
        assert_eq!(scaler.std[0], 1.0);
        assert_eq!(scaler.std[1], FeatureScaler::MIN_STD);
        assert_eq!(scaler.transform(&rows[0]), vec![-1.0, 0.0]);
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        assert!(matches!(feature_dim(&[]), Err(HoopsError::Empty(_))));
        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(feature_dim(&ragged), Err(HoopsError::Model(_))));
    }
}
