//! HTTP client for the remote predictor.
//!
//! Sits on the request path, so every call is bounded by a short timeout and
//! never retried here. Any failure becomes the conservative fallback and bumps
//! the error counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::common::config::AppCfg;
use crate::common::error::{MemError, MemResult};
use crate::common::time;
use crate::data::domain::FeatureVector;

use super::domain::{Decision, PredictionSource, RemotePredictor, RouteDecision};

#[derive(Serialize)]
struct PredictRequest<'a> {
    features: &'a FeatureVector,
    big_mem_threshold_mb: f64,
}

#[derive(Deserialize)]
struct PredictResponse {
    predicted_peak_mb: f64,
    decision: String,
    #[serde(default)]
    threshold_mb: Option<f64>,
}

#[derive(Debug, Error)]
enum RemoteError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// `POST {base_url}/predict` with a JSON envelope.
pub struct HttpRemotePredictor {
    client: reqwest::Client,
    endpoint: String,
    errors: AtomicU64,
}

impl HttpRemotePredictor {
    pub fn new(base_url: &str, timeout: Duration) -> MemResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| MemError::config("MEMSPIKE_REMOTE_URL", e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/predict", base_url.trim_end_matches('/')),
            errors: AtomicU64::new(0),
        })
    }

    pub fn from_config(cfg: &AppCfg) -> MemResult<Self> {
        Self::new(&cfg.remote_url, cfg.remote_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Failed calls so far (timeouts, transport errors, bad responses).
    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    async fn call(
        &self,
        features: &FeatureVector,
        threshold_mb: f64,
    ) -> Result<RouteDecision, RemoteError> {
        let body = PredictRequest {
            features,
            big_mem_threshold_mb: threshold_mb,
        };
        let response: PredictResponse = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let decision = Decision::parse(&response.decision)
            .ok_or_else(|| RemoteError::Malformed(format!("decision {:?}", response.decision)))?;
        if !response.predicted_peak_mb.is_finite() {
            return Err(RemoteError::Malformed("non-finite prediction".to_string()));
        }
        Ok(RouteDecision {
            decision,
            predicted_peak_mb: response.predicted_peak_mb,
            threshold_mb: response
                .threshold_mb
                .filter(|t| t.is_finite())
                .unwrap_or(threshold_mb),
            source: PredictionSource::Remote,
        })
    }
}

#[async_trait]
impl RemotePredictor for HttpRemotePredictor {
    async fn predict(&self, features: &FeatureVector, threshold_mb: f64) -> RouteDecision {
        let start = Instant::now();
        match self.call(features, threshold_mb).await {
            Ok(decision) => {
                debug!(
                    ev = "remote_predict",
                    decision = %decision.decision,
                    predicted_peak_mb = decision.predicted_peak_mb,
                    dur_ms = time::elapsed_ms(start)
                );
                decision
            }
            Err(e) => {
                let errors = self.errors.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    ev = "remote_predict_failed",
                    error = %e,
                    errors,
                    dur_ms = time::elapsed_ms(start)
                );
                RouteDecision::fallback(threshold_mb)
            }
        }
    }
}
