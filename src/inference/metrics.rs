//! In-process counters for routing and retraining.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use super::domain::{Decision, PredictionSource};

#[derive(Debug, Default)]
pub struct RouteMetrics {
    local: AtomicU64,
    remote: AtomicU64,
    fallback: AtomicU64,
    standard_path: AtomicU64,
    route_big_memory: AtomicU64,
    remote_calls: AtomicU64,
    remote_latency_ms: AtomicU64,
    retrains: AtomicU64,
    persist_failures: AtomicU64,
}

/// Point-in-time copy of [`RouteMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub local: u64,
    pub remote: u64,
    pub fallback: u64,
    pub standard_path: u64,
    pub route_big_memory: u64,
    /// Calls made to the remote predictor, fallbacks included.
    pub remote_calls: u64,
    /// Sum of remote call durations; divide by `remote_calls` for the mean.
    pub remote_latency_ms: u64,
    pub retrains: u64,
    pub persist_failures: u64,
}

impl RouteMetrics {
    pub fn record_decision(&self, source: PredictionSource, decision: Decision) {
        let by_source = match source {
            PredictionSource::Local => &self.local,
            PredictionSource::Remote => &self.remote,
            PredictionSource::Fallback => &self.fallback,
        };
        by_source.fetch_add(1, Ordering::Relaxed);
        let by_decision = match decision {
            Decision::StandardPath => &self.standard_path,
            Decision::RouteBigMemory => &self.route_big_memory,
        };
        by_decision.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_call(&self, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
        self.remote_latency_ms.fetch_add(ms, Ordering::Relaxed);
    }

    pub fn record_retrain(&self) {
        self.retrains.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            local: self.local.load(Ordering::Relaxed),
            remote: self.remote.load(Ordering::Relaxed),
            fallback: self.fallback.load(Ordering::Relaxed),
            standard_path: self.standard_path.load(Ordering::Relaxed),
            route_big_memory: self.route_big_memory.load(Ordering::Relaxed),
            remote_calls: self.remote_calls.load(Ordering::Relaxed),
            remote_latency_ms: self.remote_latency_ms.load(Ordering::Relaxed),
            retrains: self.retrains.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_source_and_decision() {
        let m = RouteMetrics::default();
        m.record_decision(PredictionSource::Local, Decision::RouteBigMemory);
        m.record_decision(PredictionSource::Local, Decision::StandardPath);
        m.record_decision(PredictionSource::Fallback, Decision::StandardPath);
        m.record_retrain();
        assert_eq!(
            m.snapshot(),
            MetricsSnapshot {
                local: 2,
                fallback: 1,
                standard_path: 2,
                route_big_memory: 1,
                retrains: 1,
                ..MetricsSnapshot::default()
            }
        );
    }

    #[test]
    fn remote_latency_accumulates() {
        let m = RouteMetrics::default();
        m.record_remote_call(Duration::from_millis(120));
        m.record_remote_call(Duration::from_millis(30));
        let snap = m.snapshot();
        assert_eq!(snap.remote_calls, 2);
        assert_eq!(snap.remote_latency_ms, 150);
    }
}
