//! Runtime configuration loaded from the environment.
//!
//! The core does not own these values; it only reads a snapshot at startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::common::error::{MemError, MemResult};

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug)]
pub struct AppCfg {
    pub data_root: PathBuf,
    pub samples_csv: PathBuf,
    pub model_file: PathBuf,
    pub remote_url: String,
    pub remote_timeout_ms: u64,
    pub retrain_every: u64,
    pub route_threshold_mb: f64,
    pub sample_period_ms: u64,
    pub learning_rate: f64,
    pub epochs: u32,
    pub workers: usize,
    /// Enforced by the upload layer, carried here so both read one snapshot.
    pub max_request_bytes: u64,
    pub log_level: String,
}

impl Default for AppCfg {
    fn default() -> Self {
        let data_root = PathBuf::from("./data");
        Self {
            samples_csv: data_root.join("training.csv"),
            model_file: data_root.join("model.json"),
            data_root,
            remote_url: "http://localhost:18080".to_string(),
            remote_timeout_ms: 2_000,
            retrain_every: 5,
            route_threshold_mb: 3_500.0,
            sample_period_ms: 10,
            learning_rate: 1e-5,
            epochs: 8,
            workers: 2,
            max_request_bytes: 50 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> MemResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a snapshot from an arbitrary key lookup, then validate it.
    pub fn from_lookup<F>(lookup: F) -> MemResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: FromStr>(
            lookup: &dyn Fn(&str) -> Option<String>,
            key: &str,
            default: T,
        ) -> MemResult<T> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| MemError::config(key, format!("cannot parse {raw:?}"))),
                None => Ok(default),
            }
        }

        let defaults = Self::default();
        let data_root = lookup("MEMSPIKE_DATA_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_root);
        let samples_csv = lookup("MEMSPIKE_SAMPLES_CSV")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_root.join("training.csv"));
        let model_file = lookup("MEMSPIKE_MODEL_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_root.join("model.json"));

        let cfg = Self {
            data_root,
            samples_csv,
            model_file,
            remote_url: lookup("MEMSPIKE_REMOTE_URL").unwrap_or(defaults.remote_url),
            remote_timeout_ms: parsed(
                &lookup,
                "MEMSPIKE_REMOTE_TIMEOUT_MS",
                defaults.remote_timeout_ms,
            )?,
            retrain_every: parsed(&lookup, "MEMSPIKE_RETRAIN_EVERY", defaults.retrain_every)?,
            route_threshold_mb: parsed(
                &lookup,
                "MEMSPIKE_ROUTE_THRESHOLD_MB",
                defaults.route_threshold_mb,
            )?,
            sample_period_ms: parsed(
                &lookup,
                "MEMSPIKE_SAMPLE_PERIOD_MS",
                defaults.sample_period_ms,
            )?,
            learning_rate: parsed(&lookup, "MEMSPIKE_LEARNING_RATE", defaults.learning_rate)?,
            epochs: parsed(&lookup, "MEMSPIKE_EPOCHS", defaults.epochs)?,
            workers: parsed(&lookup, "MEMSPIKE_WORKERS", defaults.workers)?,
            max_request_bytes: parsed(
                &lookup,
                "MEMSPIKE_MAX_REQUEST_BYTES",
                defaults.max_request_bytes,
            )?,
            log_level: lookup("MEMSPIKE_LOG_LEVEL").unwrap_or(defaults.log_level),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the core cannot operate with.
    pub fn validate(&self) -> MemResult<()> {
        if self.retrain_every == 0 {
            return Err(MemError::config("MEMSPIKE_RETRAIN_EVERY", "must be >= 1"));
        }
        if !self.route_threshold_mb.is_finite() || self.route_threshold_mb <= 0.0 {
            return Err(MemError::config(
                "MEMSPIKE_ROUTE_THRESHOLD_MB",
                "must be a finite number > 0",
            ));
        }
        if self.remote_timeout_ms == 0 {
            return Err(MemError::config("MEMSPIKE_REMOTE_TIMEOUT_MS", "must be >= 1"));
        }
        if self.sample_period_ms == 0 {
            return Err(MemError::config("MEMSPIKE_SAMPLE_PERIOD_MS", "must be >= 1"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(MemError::config(
                "MEMSPIKE_LEARNING_RATE",
                "must be a finite number > 0",
            ));
        }
        if self.workers == 0 {
            return Err(MemError::config("MEMSPIKE_WORKERS", "must be >= 1"));
        }
        if self.remote_url.trim().is_empty() {
            return Err(MemError::config("MEMSPIKE_REMOTE_URL", "must not be empty"));
        }
        Ok(())
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }
}
