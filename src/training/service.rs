//! Batch gradient descent over the whole sample set.
//!
//! No shuffling, no randomness, no feature scaling: the same ordered samples
//! and hyperparameters always yield bit-identical weights.

use std::time::Instant;

use tracing::{debug, warn};

use crate::common::time;
use crate::data::domain::{LabeledSample, FEATURE_DIMS};

use super::domain::{Model, TrainConfig, Trainer};

/// Full-batch gradient descent on squared error.
#[derive(Clone, Debug, Default)]
pub struct GradientDescent {
    cfg: TrainConfig,
}

impl GradientDescent {
    pub fn new(cfg: TrainConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> TrainConfig {
        self.cfg
    }
}

impl Trainer for GradientDescent {
    fn train(&self, samples: &[LabeledSample]) -> Model {
        let start = Instant::now();
        let rows: Vec<([f64; FEATURE_DIMS], f64)> = samples
            .iter()
            .filter(|s| s.is_valid())
            .map(|s| (s.features.to_array(), s.label_mb))
            .filter(|(x, _)| x.iter().all(|v| v.is_finite()))
            .collect();
        if rows.is_empty() {
            return Model::zero();
        }

        let inv_n = 1.0 / rows.len() as f64;
        let lr = self.cfg.learning_rate;
        let mut weights = [0.0; FEATURE_DIMS];
        let mut bias = 0.0;

        for epoch in 0..self.cfg.epochs {
            let mut grad_w = [0.0; FEATURE_DIMS];
            let mut grad_b = 0.0;
            for (x, y) in &rows {
                let pred = weights
                    .iter()
                    .zip(x.iter())
                    .fold(bias, |acc, (w, xi)| acc + w * xi);
                let err = pred - y;
                grad_b += err;
                for (g, xi) in grad_w.iter_mut().zip(x.iter()) {
                    *g += err * xi;
                }
            }

            let mut next_w = weights;
            for (w, g) in next_w.iter_mut().zip(grad_w.iter()) {
                *w -= lr * g * inv_n;
            }
            let next_b = bias - lr * grad_b * inv_n;

            // Keep the last finite parameters rather than persist NaN/inf.
            if !next_b.is_finite() || next_w.iter().any(|w| !w.is_finite()) {
                warn!(ev = "train_diverged", epoch, samples = rows.len());
                break;
            }
            weights = next_w;
            bias = next_b;
        }

        debug!(
            ev = "train_done",
            samples = rows.len(),
            bias,
            dur_ms = time::elapsed_ms(start)
        );
        Model::new(weights, bias, rows.len() as u64)
    }
}
