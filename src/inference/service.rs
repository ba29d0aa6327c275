//! Prediction orchestrator: local-or-remote routing plus the online learning loop.
//!
//! The live model sits behind a lock that is only ever held for a pointer
//! swap or an `Arc` clone, so readers see the previous model or the new one,
//! never a mix. Retraining (read store, fit, install, persist) is serialized
//! by its own mutex, which predictions never touch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::common::config::AppCfg;
use crate::common::error::{MemError, MemResult};
use crate::common::time;
use crate::data::domain::{is_valid_label, FeatureVector, LabeledSample, SampleRepo, SENTINEL_MB};
use crate::data::repo_fs::FsSampleRepo;
use crate::measure::domain::UsageProbe;
use crate::measure::probe::ProcessRssProbe;
use crate::measure::service::measure;
use crate::training::domain::{Model, ModelRepo, TrainConfig, Trainer};
use crate::training::repo_fs::FsModelRepo;
use crate::training::service::GradientDescent;

use super::domain::{
    decide, round1, ModelSnapshot, PredictionSource, ProcessOutcome, RemotePredictor,
    RouteDecision, TrainOutcome,
};
use super::metrics::{MetricsSnapshot, RouteMetrics};
use super::remote::HttpRemotePredictor;
use super::workers::Pool;

/// Tunables the orchestrator reads on every request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    pub retrain_every: u64,
    pub threshold_mb: f64,
    pub sample_period: Duration,
}

impl From<&AppCfg> for Settings {
    fn from(cfg: &AppCfg) -> Self {
        Self {
            retrain_every: cfg.retrain_every,
            threshold_mb: cfg.route_threshold_mb,
            sample_period: cfg.sample_period(),
        }
    }
}

/// Collaborators behind their seams.
pub struct Parts {
    pub samples: Arc<dyn SampleRepo>,
    pub models: Arc<dyn ModelRepo>,
    pub trainer: Arc<dyn Trainer>,
    pub remote: Arc<dyn RemotePredictor>,
    pub probe: Arc<dyn UsageProbe>,
}

struct Inner {
    settings: Settings,
    samples: Arc<dyn SampleRepo>,
    models: Arc<dyn ModelRepo>,
    trainer: Arc<dyn Trainer>,
    remote: Arc<dyn RemotePredictor>,
    probe: Arc<dyn UsageProbe>,
    model: RwLock<Option<Arc<Model>>>,
    retrain_lock: Mutex<()>,
    metrics: RouteMetrics,
}

/// Cheap to clone; clones share the same model, store and pool.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
    pool: Arc<Pool>,
}

impl Orchestrator {
    pub fn new(settings: Settings, parts: Parts, pool: Pool) -> MemResult<Self> {
        if settings.retrain_every == 0 {
            return Err(MemError::config("retrain_every", "must be >= 1"));
        }
        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                samples: parts.samples,
                models: parts.models,
                trainer: parts.trainer,
                remote: parts.remote,
                probe: parts.probe,
                model: RwLock::new(None),
                retrain_lock: Mutex::new(()),
                metrics: RouteMetrics::default(),
            }),
            pool: Arc::new(pool),
        })
    }

    /// Wire the filesystem repositories, the HTTP remote and the RSS probe.
    pub fn from_config(cfg: &AppCfg) -> MemResult<Self> {
        cfg.validate()?;
        let parts = Parts {
            samples: Arc::new(FsSampleRepo::from_config(cfg)?),
            models: Arc::new(FsModelRepo::from_config(cfg)),
            trainer: Arc::new(GradientDescent::new(TrainConfig::from(cfg))),
            remote: Arc::new(HttpRemotePredictor::from_config(cfg)?),
            probe: Arc::new(ProcessRssProbe::default()),
        };
        Self::new(Settings::from(cfg), parts, Pool::new(cfg.workers)?)
    }

    /// Load the persisted model in the background.
    ///
    /// Requests arriving before this finishes go to the remote predictor. A
    /// model installed by a retrain in the meantime is never replaced. Must be
    /// called from within a Tokio runtime.
    pub fn start(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.load_persisted())
    }

    /// Route `features` without touching the store or the model.
    pub async fn predict_only(&self, features: &FeatureVector) -> MemResult<RouteDecision> {
        features.validate()?;
        let start = Instant::now();
        let threshold_mb = self.inner.settings.threshold_mb;

        let routed = match self.inner.current_model() {
            Some(model) => {
                let raw = model.predict(features);
                let predicted = if raw.is_finite() { raw } else { SENTINEL_MB };
                RouteDecision {
                    decision: decide(predicted, threshold_mb),
                    predicted_peak_mb: round1(predicted),
                    threshold_mb,
                    source: PredictionSource::Local,
                }
            }
            None => {
                let called = Instant::now();
                let routed = self.inner.remote.predict(features, threshold_mb).await;
                self.inner.metrics.record_remote_call(called.elapsed());
                routed
            }
        };

        self.inner.metrics.record_decision(routed.source, routed.decision);
        info!(
            ev = "route",
            decision = %routed.decision,
            predicted_peak_mb = routed.predicted_peak_mb,
            source = routed.source.as_str(),
            pages = features.pages,
            size_mb = features.size_mb,
            producer = %features.producer,
            dur_ms = time::elapsed_ms(start)
        );
        Ok(routed)
    }

    /// Record a measured label; retrain when the valid count hits the cadence.
    pub async fn train(&self, features: FeatureVector, label_mb: f64) -> MemResult<TrainOutcome> {
        features.validate()?;
        if !label_mb.is_finite() {
            return Err(MemError::invalid("label must be finite"));
        }
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            inner.record_sample(LabeledSample::new(features, label_mb))
        })
        .await
        .map_err(|e| MemError::internal(format!("train task: {e}")))?
    }

    /// Predict, optionally measure `workload` and train on its peak, predict again.
    ///
    /// With `workload` set to `None` nothing is measured or recorded and the
    /// two decisions are identical. A failing workload fails the request; a
    /// failing store write only skips training.
    pub async fn process<W>(
        &self,
        features: FeatureVector,
        workload: Option<W>,
    ) -> MemResult<ProcessOutcome>
    where
        W: FnOnce() -> MemResult<()> + Send + 'static,
    {
        features.validate()?;
        let used_local_model_before = self.has_local_model();
        let samples_before = self.sample_count();
        let before = self.predict_only(&features).await?;

        let mut measured_peak_mb = None;
        let mut trained_this_request = false;
        let mut retrained = false;
        if let Some(work) = workload {
            let probe = Arc::clone(&self.inner.probe);
            let period = self.inner.settings.sample_period;
            let measurement = self
                .pool
                .run(move || measure(probe.as_ref(), period, work))
                .await??;
            measured_peak_mb = Some(measurement.peak_mb);

            match self.train(features.clone(), measurement.peak_mb).await {
                Ok(outcome) => {
                    trained_this_request = true;
                    retrained = outcome.retrained;
                }
                Err(e) if e.is_invalid_input() => return Err(e),
                Err(e) => warn!(ev = "train_skipped", error = %e),
            }
        }

        let used_local_model_after = self.has_local_model();
        let samples_after = self.sample_count();
        let after = self.predict_only(&features).await?;

        Ok(ProcessOutcome {
            before,
            after,
            used_local_model_before,
            used_local_model_after,
            samples_before,
            samples_after,
            measured_peak_mb,
            trained_this_request,
            retrained,
            threshold_mb: self.inner.settings.threshold_mb,
        })
    }

    /// Retrain from the whole store right away, outside the cadence.
    pub async fn retrain_now(&self) -> MemResult<ModelSnapshot> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.retrain())
            .await
            .map_err(|e| MemError::internal(format!("retrain task: {e}")))??;
        Ok(self.snapshot())
    }

    pub fn has_local_model(&self) -> bool {
        self.inner.model.read().is_some()
    }

    pub fn threshold(&self) -> f64 {
        self.inner.settings.threshold_mb
    }

    pub fn sample_count(&self) -> u64 {
        self.inner.samples.count()
    }

    /// The model currently answering predictions, if any.
    pub fn model(&self) -> Option<Arc<Model>> {
        self.inner.current_model()
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        let model = self.inner.current_model();
        ModelSnapshot {
            weights: model.as_ref().map(|m| m.weights()),
            bias: model.as_ref().map(|m| m.bias()),
            trained_on: model.as_ref().map_or(0, |m| m.trained_on()),
            samples: self.sample_count(),
            threshold_mb: self.inner.settings.threshold_mb,
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl Inner {
    fn current_model(&self) -> Option<Arc<Model>> {
        self.model.read().clone()
    }

    fn load_persisted(&self) {
        let start = Instant::now();
        match self.models.load() {
            Ok(Some(model)) => {
                let mut slot = self.model.write();
                if slot.is_none() {
                    info!(
                        ev = "model_loaded",
                        samples = model.trained_on(),
                        dur_ms = time::elapsed_ms(start)
                    );
                    *slot = Some(Arc::new(model));
                } else {
                    info!(ev = "model_load_superseded");
                }
            }
            Ok(None) => info!(ev = "model_load_skipped", reason = "no usable model file"),
            Err(e) => warn!(ev = "model_load_failed", error = %e),
        }
    }

    fn record_sample(&self, sample: LabeledSample) -> MemResult<TrainOutcome> {
        let counted = is_valid_label(sample.label_mb);
        let samples = self.samples.append(&sample)?;
        let due = counted && samples > 0 && samples % self.settings.retrain_every == 0;
        // The sample is durable at this point; a failed retrain only keeps the old model.
        let retrained = due
            && match self.retrain() {
                Ok(()) => true,
                Err(e) => {
                    warn!(ev = "retrain_failed", samples, error = %e);
                    false
                }
            };
        Ok(TrainOutcome { samples, retrained })
    }

    /// Read store, fit, install, persist; one at a time.
    fn retrain(&self) -> MemResult<()> {
        let _guard = self.retrain_lock.lock();
        let start = Instant::now();
        let rows = self.samples.load_all()?;
        let model = Arc::new(self.trainer.train(&rows));

        *self.model.write() = Some(Arc::clone(&model));
        self.metrics.record_retrain();

        if let Err(e) = self.models.save(&model) {
            self.metrics.record_persist_failure();
            warn!(ev = "model_persist_failed", error = %e);
        }
        info!(
            ev = "retrain",
            samples = model.trained_on(),
            weights = ?model.weights(),
            bias = model.bias(),
            dur_ms = time::elapsed_ms(start)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::domain::fixtures::features;
    use crate::inference::domain::Decision;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeRemote {
        calls: AtomicUsize,
        reply: RouteDecision,
    }

    impl FakeRemote {
        fn answering(predicted: f64, decision: Decision) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply: RouteDecision {
                    decision,
                    predicted_peak_mb: predicted,
                    threshold_mb: 3500.0,
                    source: PredictionSource::Remote,
                },
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemotePredictor for FakeRemote {
        async fn predict(&self, _: &FeatureVector, _: f64) -> RouteDecision {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
        }
    }

    struct FixedProbe(u64);

    impl UsageProbe for FixedProbe {
        fn used_bytes(&self) -> u64 {
            self.0
        }
    }

    fn build(dir: &Path, retrain_every: u64, remote: Arc<FakeRemote>) -> Orchestrator {
        let parts = Parts {
            samples: Arc::new(FsSampleRepo::open(dir.join("training.csv")).unwrap()),
            models: Arc::new(FsModelRepo::new(dir.join("model.json"))),
            trainer: Arc::new(GradientDescent::default()),
            remote,
            probe: Arc::new(FixedProbe(777 * 1024 * 1024)),
        };
        let settings = Settings {
            retrain_every,
            threshold_mb: 3500.0,
            sample_period: Duration::from_millis(1),
        };
        Orchestrator::new(settings, parts, Pool::new(1).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn without_local_model_remote_answers() {
        let dir = tempfile::tempdir().unwrap();
        let remote = FakeRemote::answering(4200.0, Decision::RouteBigMemory);
        let orch = build(dir.path(), 5, remote.clone());

        let routed = orch.predict_only(&features(3.0, 9)).await.unwrap();
        assert_eq!(routed.decision, Decision::RouteBigMemory);
        assert_eq!(routed.predicted_peak_mb, 4200.0);
        assert_eq!(routed.source, PredictionSource::Remote);
        assert_eq!(remote.calls(), 1);
        let metrics = orch.metrics();
        assert_eq!(metrics.remote, 1);
        assert_eq!(metrics.route_big_memory, 1);
        assert_eq!(metrics.remote_calls, 1);
    }

    /// Parks inside `train` until released, once.
    struct GatedTrainer {
        entered: Mutex<Option<std::sync::mpsc::Sender<()>>>,
        release: Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl Trainer for GatedTrainer {
        fn train(&self, samples: &[LabeledSample]) -> Model {
            if let Some(entered) = self.entered.lock().take() {
                let _ = entered.send(());
                let _ = self.release.lock().recv();
            }
            GradientDescent::default().train(samples)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn predictions_keep_old_model_while_retrain_is_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        FsModelRepo::new(dir.path().join("model.json"))
            .save(&Model::new([0.0; 8], 5000.0, 3))
            .unwrap();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let parts = Parts {
            samples: Arc::new(FsSampleRepo::open(dir.path().join("training.csv")).unwrap()),
            models: Arc::new(FsModelRepo::new(dir.path().join("model.json"))),
            trainer: Arc::new(GatedTrainer {
                entered: Mutex::new(Some(entered_tx)),
                release: Mutex::new(release_rx),
            }),
            remote: FakeRemote::answering(10.0, Decision::StandardPath),
            probe: Arc::new(FixedProbe(0)),
        };
        let settings = Settings {
            retrain_every: 1,
            threshold_mb: 3500.0,
            sample_period: Duration::from_millis(1),
        };
        let orch = Orchestrator::new(settings, parts, Pool::new(1).unwrap()).unwrap();
        orch.start().await.unwrap();

        let trainer_side = orch.clone();
        let training =
            tokio::spawn(async move { trainer_side.train(features(1.0, 1), 10.0).await });
        tokio::task::spawn_blocking(move || entered_rx.recv())
            .await
            .unwrap()
            .unwrap();

        let during = tokio::time::timeout(
            Duration::from_secs(2),
            orch.predict_only(&features(1.0, 1)),
        )
        .await
        .expect("prediction waited on the retrain")
        .unwrap();
        assert_eq!(during.decision, Decision::RouteBigMemory);
        assert_eq!(during.predicted_peak_mb, 5000.0);

        release_tx.send(()).unwrap();
        assert!(training.await.unwrap().unwrap().retrained);

        let after = orch.predict_only(&features(1.0, 1)).await.unwrap();
        assert_eq!(after.decision, Decision::StandardPath);
        assert_eq!(after.source, PredictionSource::Local);
        assert_eq!(orch.model().unwrap().trained_on(), 1);
    }

    #[tokio::test]
    async fn first_retrain_takes_over_from_remote() {
        let dir = tempfile::tempdir().unwrap();
        let remote = FakeRemote::answering(100.0, Decision::StandardPath);
        let orch = build(dir.path(), 1, remote.clone());
        assert!(!orch.has_local_model());

        let outcome = orch.train(features(2.0, 10), 900.0).await.unwrap();
        assert_eq!(outcome, TrainOutcome { samples: 1, retrained: true });
        assert!(orch.has_local_model());

        let routed = orch.predict_only(&features(2.0, 10)).await.unwrap();
        assert_eq!(routed.source, PredictionSource::Local);
        assert_eq!(remote.calls(), 0);
        assert!(dir.path().join("model.json").exists());
    }

    #[tokio::test]
    async fn predict_only_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let orch = build(dir.path(), 1, FakeRemote::answering(10.0, Decision::StandardPath));
        let f = features(5.0, 50);
        assert_eq!(orch.predict_only(&f).await.unwrap(), orch.predict_only(&f).await.unwrap());

        orch.train(f.clone(), 1500.0).await.unwrap();
        let a = orch.predict_only(&f).await.unwrap();
        let b = orch.predict_only(&f).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(orch.sample_count(), 1);
    }

    #[tokio::test]
    async fn retrain_happens_exactly_on_cadence() {
        let dir = tempfile::tempdir().unwrap();
        let orch = build(dir.path(), 3, FakeRemote::answering(10.0, Decision::StandardPath));
        let mut retrained_at = Vec::new();
        for i in 1..=7u32 {
            let before = orch.sample_count();
            let out = orch.train(features(f64::from(i), i), 100.0 * f64::from(i)).await.unwrap();
            assert_eq!(orch.sample_count(), before + 1);
            if out.retrained {
                retrained_at.push(out.samples);
            }
        }
        assert_eq!(retrained_at, vec![3, 6]);
        assert_eq!(orch.metrics().retrains, 2);
        assert_eq!(orch.model().unwrap().trained_on(), 6);
    }

    #[tokio::test]
    async fn sentinel_label_is_recorded_but_never_counted() {
        let dir = tempfile::tempdir().unwrap();
        let orch = build(dir.path(), 1, FakeRemote::answering(10.0, Decision::StandardPath));
        orch.train(features(1.0, 1), 50.0).await.unwrap();
        let out = orch.train(features(1.0, 1), SENTINEL_MB).await.unwrap();
        assert_eq!(out, TrainOutcome { samples: 1, retrained: false });
        assert_eq!(orch.metrics().retrains, 1);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_any_side_effect() {
        let dir = tempfile::tempdir().unwrap();
        let remote = FakeRemote::answering(10.0, Decision::StandardPath);
        let orch = build(dir.path(), 1, remote.clone());
        let mut bad = features(1.0, 1);
        bad.fonts_embedded_pct = 7.0;

        assert!(orch.predict_only(&bad).await.unwrap_err().is_invalid_input());
        assert!(orch.train(bad.clone(), 10.0).await.unwrap_err().is_invalid_input());
        assert!(orch
            .train(features(1.0, 1), f64::NAN)
            .await
            .unwrap_err()
            .is_invalid_input());
        assert_eq!(remote.calls(), 0);
        assert_eq!(orch.sample_count(), 0);
    }

    #[tokio::test]
    async fn process_reports_before_and_after() {
        let dir = tempfile::tempdir().unwrap();
        let remote = FakeRemote::answering(1234.5, Decision::StandardPath);
        let orch = build(dir.path(), 1, remote.clone());

        let out = orch
            .process(features(4.0, 12), Some(|| -> MemResult<()> { Ok(()) }))
            .await
            .unwrap();
        assert!(!out.used_local_model_before);
        assert!(out.used_local_model_after);
        assert_eq!(out.samples_before, 0);
        assert_eq!(out.samples_after, 1);
        assert_eq!(out.measured_peak_mb, Some(777.0));
        assert!(out.trained_this_request);
        assert!(out.retrained);
        assert_eq!(out.before.source, PredictionSource::Remote);
        assert_eq!(out.after.source, PredictionSource::Local);
        assert_eq!(out.threshold_mb, 3500.0);
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn process_without_workload_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let orch = build(dir.path(), 1, FakeRemote::answering(10.0, Decision::StandardPath));
        let out = orch
            .process(features(4.0, 12), None::<fn() -> MemResult<()>>)
            .await
            .unwrap();
        assert_eq!(out.before, out.after);
        assert!(!out.trained_this_request);
        assert_eq!(out.measured_peak_mb, None);
        assert_eq!(orch.sample_count(), 0);
    }

    #[tokio::test]
    async fn failing_workload_fails_request_and_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let orch = build(dir.path(), 1, FakeRemote::answering(10.0, Decision::StandardPath));
        let err = orch
            .process(
                features(4.0, 12),
                Some(|| -> MemResult<()> { Err(MemError::Workload("render failed".into())) }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MemError::Workload(_)));
        assert_eq!(orch.sample_count(), 0);
        assert!(!orch.has_local_model());
    }

    #[tokio::test]
    async fn startup_load_installs_persisted_model() {
        let dir = tempfile::tempdir().unwrap();
        FsModelRepo::new(dir.path().join("model.json"))
            .save(&Model::new([0.0; 8], -50.0, 4))
            .unwrap();
        let remote = FakeRemote::answering(9999.0, Decision::RouteBigMemory);
        let orch = build(dir.path(), 5, remote.clone());

        orch.start().await.unwrap();
        assert!(orch.has_local_model());
        let routed = orch.predict_only(&features(1.0, 1)).await.unwrap();
        // negative means unknown, and unknown routes to the standard path
        assert_eq!(routed.decision, Decision::StandardPath);
        assert_eq!(routed.predicted_peak_mb, -50.0);
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn startup_load_never_replaces_a_fresher_model() {
        let dir = tempfile::tempdir().unwrap();
        FsModelRepo::new(dir.path().join("model.json"))
            .save(&Model::new([9.0; 8], 9.0, 99))
            .unwrap();
        let orch = build(dir.path(), 1, FakeRemote::answering(10.0, Decision::StandardPath));

        orch.train(features(2.0, 2), 300.0).await.unwrap();
        let fresh = orch.model().unwrap();
        orch.start().await.unwrap();
        assert_eq!(*orch.model().unwrap(), *fresh);
        assert_eq!(orch.model().unwrap().trained_on(), 1);
    }

    #[tokio::test]
    async fn corrupt_model_file_leaves_remote_in_charge() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.json"), "{ nope").unwrap();
        let remote = FakeRemote::answering(10.0, Decision::StandardPath);
        let orch = build(dir.path(), 5, remote.clone());
        orch.start().await.unwrap();
        assert!(!orch.has_local_model());
        orch.predict_only(&features(1.0, 1)).await.unwrap();
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn snapshot_copies_model_state() {
        let dir = tempfile::tempdir().unwrap();
        let orch = build(dir.path(), 2, FakeRemote::answering(10.0, Decision::StandardPath));
        let empty = orch.snapshot();
        assert_eq!(empty.weights, None);
        assert_eq!(empty.samples, 0);
        assert_eq!(empty.threshold_mb, 3500.0);

        orch.train(features(1.0, 3), 200.0).await.unwrap();
        orch.train(features(2.0, 6), 400.0).await.unwrap();
        let snap = orch.snapshot();
        assert_eq!(snap.samples, 2);
        assert_eq!(snap.trained_on, 2);
        assert_eq!(snap.weights, Some(orch.model().unwrap().weights()));
    }

    #[tokio::test]
    async fn retrain_now_fits_imported_rows() {
        let dir = tempfile::tempdir().unwrap();
        let orch = build(dir.path(), 100, FakeRemote::answering(10.0, Decision::StandardPath));
        orch.train(features(1.0, 3), 200.0).await.unwrap();
        assert!(!orch.has_local_model());

        let snap = orch.retrain_now().await.unwrap();
        assert_eq!(snap.trained_on, 1);
        assert!(orch.has_local_model());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_training_retrains_once_per_multiple() {
        let dir = tempfile::tempdir().unwrap();
        let orch = build(dir.path(), 5, FakeRemote::answering(10.0, Decision::StandardPath));

        let tasks: Vec<_> = (0..20u32)
            .map(|i| {
                let orch = orch.clone();
                tokio::spawn(async move {
                    orch.train(features(f64::from(i), i), 64.0 + f64::from(i))
                        .await
                        .unwrap()
                })
            })
            .collect();
        let mut retrained = 0;
        for task in tasks {
            if task.await.unwrap().retrained {
                retrained += 1;
            }
        }
        assert_eq!(retrained, 4);
        assert_eq!(orch.sample_count(), 20);
        assert_eq!(orch.metrics().retrains, 4);
    }
}
