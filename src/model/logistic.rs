//! Logistic regression baseline
//!
//! A single linear layer with a sigmoid output, trained full-batch with SGD on
//! binary cross-entropy over standardised features.

use burn::nn::{Linear, LinearConfig};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{GradientsParams, Optimizer, Sgd, SgdConfig};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor, TensorData};

use crate::model::{feature_dim, FeatureScaler, WinModel};
use crate::{HoopsError, Result, TrainingConfig};

/// Hyperparameters for [`LogisticModel`]
#[derive(Debug, Clone)]
pub struct LogisticConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for LogisticConfig {
    fn from(config: &TrainingConfig) -> Self {
        LogisticConfig {
            epochs: config.epochs,
            learning_rate: config.learning_rate,
            seed: config.seed,
        }
    }
}

struct Fitted<B: AutodiffBackend> {
    linear: Linear<B>,
    scaler: FeatureScaler,
}

/// Logistic classifier on a burn autodiff backend
pub struct LogisticModel<B: AutodiffBackend> {
    config: LogisticConfig,
    device: B::Device,
    fitted: Option<Fitted<B>>,
}

impl<B: AutodiffBackend> LogisticModel<B> {
    pub fn new(device: B::Device, config: LogisticConfig) -> Self {
        LogisticModel {
            config,
            device,
            fitted: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Scaled rows as a [n, dim] tensor
    fn input_tensor(&self, scaler: &FeatureScaler, rows: &[Vec<f32>], dim: usize) -> Tensor<B, 2> {
        let values: Vec<f32> = rows.iter().flat_map(|r| scaler.transform(r)).collect();
        Tensor::from_data(TensorData::new(values, [rows.len(), dim]), &self.device)
    }

    fn binary_cross_entropy(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        let eps = 1e-7;
        let probs_clamped = probs.clamp(eps, 1.0 - eps);
        let loss = targets.clone().neg() * probs_clamped.clone().log()
            - (targets.neg() + 1.0) * (probs_clamped.neg() + 1.0).log();
        loss.mean()
    }
}

impl<B: AutodiffBackend> WinModel for LogisticModel<B> {
    fn fit(&mut self, features: &[Vec<f32>], home_wins: &[bool]) -> Result<()> {
        let dim = feature_dim(features)?;
        if features.len() != home_wins.len() {
            return Err(HoopsError::Model(format!(
                "{} feature rows but {} labels",
                features.len(),
                home_wins.len()
            )));
        }

        B::seed(self.config.seed);
        let scaler = FeatureScaler::fit(features)?;
        let x = self.input_tensor(&scaler, features, dim);
        let labels: Vec<f32> = home_wins.iter().map(|&w| if w { 1.0 } else { 0.0 }).collect();
        let y: Tensor<B, 2> =
            Tensor::from_data(TensorData::new(labels, [home_wins.len(), 1]), &self.device);

        let mut linear: Linear<B> = LinearConfig::new(dim, 1).init(&self.device);
        let mut optimizer: OptimizerAdaptor<Sgd<B::InnerBackend>, Linear<B>, B> =
            SgdConfig::new().init();

        log::info!(
            "Fitting logistic model on {} rows x {} features for {} epochs",
            features.len(),
            dim,
            self.config.epochs
        );

        let mut last_loss = f32::NAN;
        for epoch in 0..self.config.epochs {
            let probs = sigmoid(linear.forward(x.clone()));
            let loss = Self::binary_cross_entropy(probs, y.clone());
            last_loss = loss.clone().into_scalar().elem();

            let grads = loss.backward();
            let grads_params = GradientsParams::from_grads(grads, &linear);
            linear = optimizer.step(self.config.learning_rate, linear, grads_params);

            if epoch % 50 == 0 {
                log::debug!("Epoch {}/{}: loss={:.4}", epoch + 1, self.config.epochs, last_loss);
            }
        }

        if !last_loss.is_finite() && self.config.epochs > 0 {
            return Err(HoopsError::Model("training loss diverged".to_string()));
        }
        log::info!("Final training loss: {:.4}", last_loss);

        self.fitted = Some(Fitted { linear, scaler });
        Ok(())
    }

    fn predict_proba(&self, features: &[Vec<f32>]) -> Result<Vec<f32>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| HoopsError::Model("model has not been fitted".to_string()))?;
        if features.is_empty() {
            return Ok(Vec::new());
        }
        let dim = feature_dim(features)?;
        if dim != fitted.scaler.mean.len() {
            return Err(HoopsError::Model(format!(
                "model was fitted on {} features, got {}",
                fitted.scaler.mean.len(),
                dim
            )));
        }

        let x = self.input_tensor(&fitted.scaler, features, dim);
        let probs = sigmoid(fitted.linear.forward(x));
        probs
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| HoopsError::Model(format!("failed to read probabilities: {:?}", e)))
    }
}
