//! Routing decisions and the contract for the remote predictor.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::data::domain::{FeatureVector, FEATURE_DIMS, SENTINEL_MB};

/// Execution path a job is sent to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    StandardPath,
    RouteBigMemory,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::StandardPath => "STANDARD_PATH",
            Decision::RouteBigMemory => "ROUTE_BIG_MEMORY",
        }
    }

    /// Parse the wire form; anything else is not a decision.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "STANDARD_PATH" => Some(Decision::StandardPath),
            "ROUTE_BIG_MEMORY" => Some(Decision::RouteBigMemory),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced a prediction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Local,
    Remote,
    Fallback,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionSource::Local => "local",
            PredictionSource::Remote => "remote",
            PredictionSource::Fallback => "fallback",
        }
    }
}

/// Routing result. Derived per request, never stored.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub decision: Decision,
    pub predicted_peak_mb: f64,
    pub threshold_mb: f64,
    pub source: PredictionSource,
}

impl RouteDecision {
    /// Conservative answer when no prediction could be obtained.
    pub fn fallback(threshold_mb: f64) -> Self {
        Self {
            decision: Decision::StandardPath,
            predicted_peak_mb: SENTINEL_MB,
            threshold_mb,
            source: PredictionSource::Fallback,
        }
    }
}

/// Threshold rule shared by every prediction path.
///
/// Negative predictions (the sentinel included) mean "unknown" and are routed
/// to the standard path: unknown is treated as cheap, not as dangerous.
pub fn decide(predicted_mb: f64, threshold_mb: f64) -> Decision {
    if predicted_mb.is_nan() || predicted_mb < 0.0 {
        return Decision::StandardPath;
    }
    if predicted_mb >= threshold_mb {
        Decision::RouteBigMemory
    } else {
        Decision::StandardPath
    }
}

/// Round to one decimal place for reporting.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Read-only diagnostic copy of the orchestrator state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelSnapshot {
    pub weights: Option<[f64; FEATURE_DIMS]>,
    pub bias: Option<f64>,
    pub trained_on: u64,
    pub samples: u64,
    pub threshold_mb: f64,
}

/// Everything a caller needs to observe one request's effect on the model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessOutcome {
    pub before: RouteDecision,
    pub after: RouteDecision,
    pub used_local_model_before: bool,
    pub used_local_model_after: bool,
    pub samples_before: u64,
    pub samples_after: u64,
    pub measured_peak_mb: Option<f64>,
    pub trained_this_request: bool,
    pub retrained: bool,
    pub threshold_mb: f64,
}

impl ProcessOutcome {
    /// The decision to act on: the one taken after any training.
    pub fn decision(&self) -> Decision {
        self.after.decision
    }
}

/// Result of recording one labeled sample.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TrainOutcome {
    pub samples: u64,
    pub retrained: bool,
}

/// External prediction service consulted while no local model is loaded.
///
/// `threshold_mb` is forwarded as the remote's decision threshold.
/// Implementations never fail: every error becomes [`RouteDecision::fallback`].
#[async_trait]
pub trait RemotePredictor: Send + Sync {
    async fn predict(&self, features: &FeatureVector, threshold_mb: f64) -> RouteDecision;
}
