//! Prediction model loading and inference

use std::path::Path;

use homeprice_common::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default model artifact file name under the data directory
pub const DEFAULT_MODEL_FILE: &str = "model_abr.json";

/// Anything that maps a feature matrix to per-row price predictions
pub trait Predictor: Send + Sync {
    fn predict_row(&self, features: &[f64]) -> Result<f64>;

    fn predict(&self, matrix: &[Vec<f64>]) -> Result<Vec<f64>> {
        matrix.iter().map(|row| self.predict_row(row)).collect()
    }
}

/// Linear model over the pipeline's feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LinearModel {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let model: LinearModel = serde_json::from_str(&content)?;
        info!(
            features = model.weights.len(),
            "Loaded prediction model from {}",
            path.display()
        );
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Constant-prediction baseline fitted to the mean target
    pub fn mean_baseline(n_features: usize, mean_target: f64) -> Self {
        Self {
            weights: vec![0.0; n_features],
            bias: mean_target,
        }
    }
}

impl Predictor for LinearModel {
    fn predict_row(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.weights.len() {
            return Err(Error::Internal(format!(
                "model expects {} features, pipeline produced {}",
                self.weights.len(),
                features.len()
            )));
        }
        Ok(self
            .weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias)
    }
}
