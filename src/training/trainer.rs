//! Train/test evaluation of a [`WinModel`] on the feature table

use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::features::matchup::MatchupFeatureRow;
use crate::model::WinModel;
use crate::training::metrics::ClassificationMetrics;
use crate::{HoopsError, Result, TrainingConfig};

/// Row positions of each part of a split, ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    /// Hold out `test_ratio` of each class, shuffled with `seed`
    pub fn stratified(labels: &[bool], test_ratio: f64, seed: u64) -> Self {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut train = Vec::new();
        let mut test = Vec::new();

        for class in [false, true] {
            let mut members: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == class)
                .map(|(i, _)| i)
                .collect();
            members.shuffle(&mut rng);

            let n_test = ((members.len() as f64 * test_ratio).round() as usize).min(members.len());
            test.extend_from_slice(&members[..n_test]);
            train.extend_from_slice(&members[n_test..]);
        }

        train.sort_unstable();
        test.sort_unstable();
        TrainTestSplit { train, test }
    }
}

/// Outcome of a train/test run
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub train_size: usize,
    pub test_size: usize,
    pub train_metrics: ClassificationMetrics,
    pub test_metrics: ClassificationMetrics,
}

/// Fits models on labelled feature rows
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Trainer { config }
    }

    /// Split, fit on the train part and score both parts
    pub fn train_and_evaluate<M: WinModel>(
        &self,
        model: &mut M,
        rows: &[MatchupFeatureRow],
    ) -> Result<EvaluationReport> {
        if !(0.0..1.0).contains(&self.config.test_ratio) {
            return Err(HoopsError::Config(format!(
                "test_ratio must be in [0, 1), got {}",
                self.config.test_ratio
            )));
        }
        let (x, y) = labelled(rows)?;
        let split = TrainTestSplit::stratified(&y, self.config.test_ratio, self.config.seed);
        log::info!(
            "Split {} rows: train={}, test={}",
            y.len(),
            split.train.len(),
            split.test.len()
        );

        let pick = |idx: &[usize]| -> (Vec<Vec<f32>>, Vec<bool>) {
            (
                idx.iter().map(|&i| x[i].clone()).collect(),
                idx.iter().map(|&i| y[i]).collect(),
            )
        };
        let (x_train, y_train) = pick(&split.train);
        let (x_test, y_test) = pick(&split.test);

        model.fit(&x_train, &y_train)?;

        let train_metrics =
            ClassificationMetrics::from_probabilities(&model.predict_proba(&x_train)?, &y_train);
        let test_metrics =
            ClassificationMetrics::from_probabilities(&model.predict_proba(&x_test)?, &y_test);

        log::info!(
            "Train accuracy {:.1}%, test accuracy {:.1}%, test log loss {:.4}",
            train_metrics.accuracy() * 100.0,
            test_metrics.accuracy() * 100.0,
            test_metrics.log_loss()
        );

        Ok(EvaluationReport {
            train_size: split.train.len(),
            test_size: split.test.len(),
            train_metrics,
            test_metrics,
        })
    }

    /// Fit on every labelled row
    pub fn fit_all<M: WinModel>(&self, model: &mut M, rows: &[MatchupFeatureRow]) -> Result<()> {
        let (x, y) = labelled(rows)?;
        model.fit(&x, &y)
    }
}

/// Model inputs and labels of the labelled rows
fn labelled(rows: &[MatchupFeatureRow]) -> Result<(Vec<Vec<f32>>, Vec<bool>)> {
    let (x, y): (Vec<Vec<f32>>, Vec<bool>) = rows
        .iter()
        .filter_map(|r| r.home_win.map(|w| (r.features.to_f32_vec(), w)))
        .unzip();
    if y.is_empty() {
        return Err(HoopsError::Empty("no labelled feature rows".to_string()));
    }
    let skipped = rows.len() - y.len();
    if skipped > 0 {
        log::warn!("Skipping {} unlabelled rows", skipped);
    }
    Ok((x, y))
}
