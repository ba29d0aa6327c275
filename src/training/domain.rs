//! Domain types for the local linear model and its training.

use serde::{Deserialize, Serialize};

use crate::common::config::AppCfg;
use crate::common::error::MemResult;
use crate::data::domain::{FeatureVector, LabeledSample, FEATURE_DIMS};

/// Immutable linear predictor: `bias + sum(weights[i] * x[i])`.
///
/// Retraining always produces a new value; nothing mutates one in place.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    weights: [f64; FEATURE_DIMS],
    bias: f64,
    trained_on: u64,
}

impl Model {
    pub fn new(weights: [f64; FEATURE_DIMS], bias: f64, trained_on: u64) -> Self {
        Self {
            weights,
            bias,
            trained_on,
        }
    }

    /// All-zero model, the result of training on nothing.
    pub fn zero() -> Self {
        Self::new([0.0; FEATURE_DIMS], 0.0, 0)
    }

    pub fn predict(&self, features: &FeatureVector) -> f64 {
        self.predict_raw(&features.to_array())
    }

    pub fn predict_raw(&self, x: &[f64; FEATURE_DIMS]) -> f64 {
        self.weights
            .iter()
            .zip(x.iter())
            .fold(self.bias, |acc, (w, xi)| acc + w * xi)
    }

    /// Copy of the weights; callers never see the live array.
    pub fn weights(&self) -> [f64; FEATURE_DIMS] {
        self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Number of valid samples this model was fitted on.
    pub fn trained_on(&self) -> u64 {
        self.trained_on
    }

    pub fn is_finite(&self) -> bool {
        self.bias.is_finite() && self.weights.iter().all(|w| w.is_finite())
    }
}

/// On-disk record: `{ "weights": [8 numbers], "bias": n, "samples": n }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelFile {
    pub weights: Vec<f64>,
    pub bias: f64,
    #[serde(default)]
    pub samples: u64,
}

impl From<&Model> for ModelFile {
    fn from(model: &Model) -> Self {
        Self {
            weights: model.weights.to_vec(),
            bias: model.bias,
            samples: model.trained_on,
        }
    }
}

impl ModelFile {
    /// Convert back into a model; `None` when the record is not usable.
    pub fn into_model(self) -> Option<Model> {
        let weights: [f64; FEATURE_DIMS] = self.weights.try_into().ok()?;
        let model = Model::new(weights, self.bias, self.samples);
        model.is_finite().then_some(model)
    }
}

/// Fixed hyperparameters for batch gradient descent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainConfig {
    pub learning_rate: f64,
    pub epochs: u32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-5,
            epochs: 8,
        }
    }
}

impl From<&AppCfg> for TrainConfig {
    fn from(cfg: &AppCfg) -> Self {
        Self {
            learning_rate: cfg.learning_rate,
            epochs: cfg.epochs,
        }
    }
}

/// Repository contract for the persisted model.
pub trait ModelRepo: Send + Sync {
    /// Overwrite the stored model.
    fn save(&self, model: &Model) -> MemResult<()>;
    /// `Ok(None)` when nothing usable is stored.
    fn load(&self) -> MemResult<Option<Model>>;
}

/// Interface for components that can fit a model.
pub trait Trainer: Send + Sync {
    fn train(&self, samples: &[LabeledSample]) -> Model;
}
