//! Model training
//!
//! Stratified train/test evaluation and classification metrics.

pub mod metrics;
pub mod trainer;

pub use metrics::ClassificationMetrics;
pub use trainer::{EvaluationReport, TrainTestSplit, Trainer};
