//! Prediction and inference
//!
//! Live feature rows for upcoming games fed to an injected model.

pub mod inference;

pub use inference::{format_prediction, prediction_report, Predictor};
