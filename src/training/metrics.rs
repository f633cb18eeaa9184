//! Classification metrics for home-win predictions

use serde::Serialize;
use std::fmt;

/// Clamp used for log-loss so certain mistakes stay finite
const PROB_EPS: f64 = 1e-7;

/// Confusion counts and log-loss, with "home win" as the positive class
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
    log_loss_sum: f64,
}

impl ClassificationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics for predicted P(home win) against the actual outcomes
    pub fn from_probabilities(probs: &[f32], actual: &[bool]) -> Self {
        let mut metrics = Self::new();
        for (&p, &won) in probs.iter().zip(actual) {
            metrics.update(p, won);
        }
        metrics
    }

    pub fn update(&mut self, prob: f32, won: bool) {
        let predicted = prob >= 0.5;
        match (predicted, won) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
            (false, true) => self.false_negatives += 1,
        }
        let p = (prob as f64).clamp(PROB_EPS, 1.0 - PROB_EPS);
        self.log_loss_sum -= if won { p.ln() } else { (1.0 - p).ln() };
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Mean binary cross-entropy
    pub fn log_loss(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.log_loss_sum / self.total() as f64
        }
    }

    /// [[TN, FP], [FN, TP]]
    pub fn confusion_matrix(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negatives, self.false_positives],
            [self.false_negatives, self.true_positives],
        ]
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for ClassificationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accuracy:  {:.1}% ({} games)", self.accuracy() * 100.0, self.total())?;
        writeln!(f, "Precision: {:.3}", self.precision())?;
        writeln!(f, "Recall:    {:.3}", self.recall())?;
        writeln!(f, "F1:        {:.3}", self.f1())?;
        writeln!(f, "Log loss:  {:.4}", self.log_loss())?;
        let [[tn, fp], [fneg, tp]] = self.confusion_matrix();
        writeln!(f, "Confusion matrix (rows actual, cols predicted; away win / home win):")?;
        writeln!(f, "  {:>6} {:>6}", tn, fp)?;
        write!(f, "  {:>6} {:>6}", fneg, tp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_ratios() {
        let m = ClassificationMetrics::from_probabilities(
            &[0.9, 0.8, 0.3, 0.6, 0.2],
            &[true, true, true, false, false],
        );
        assert_eq!(m.confusion_matrix(), [[1, 1], [1, 2]]);
        assert_eq!(m.total(), 5);
        assert!((m.accuracy() - 0.6).abs() < 1e-12);
        assert!((m.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1() - 2.0 / 3.0).abs() < 1e-12);
        assert!(m.log_loss() > 0.0);
    }

    #[test]
    fn test_zero_denominators() {
        let empty = ClassificationMetrics::new();
        assert_eq!(empty.accuracy(), 0.0);
        assert_eq!(empty.precision(), 0.0);
        assert_eq!(empty.recall(), 0.0);
        assert_eq!(empty.f1(), 0.0);
        assert_eq!(empty.log_loss(), 0.0);

        // Never predicts a home win, and no home side won
        let m = ClassificationMetrics::from_probabilities(&[0.1, 0.2], &[false, false]);
        assert_eq!(m.precision(), 0.0);
        assert_eq!(m.recall(), 0.0);
        assert_eq!(m.f1(), 0.0);
        assert_eq!(m.accuracy(), 1.0);
    }

    #[test]
    fn test_certain_mistake_has_finite_loss() {
        let m = ClassificationMetrics::from_probabilities(&[1.0, 0.0], &[false, true]);
        assert!(m.log_loss().is_finite());
        assert!(m.log_loss() > 10.0);
    }
}
